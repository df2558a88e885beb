//! Persistent module configuration and packet dispatch
//!
//! Every peripheral module owns a small config block in non-volatile storage. Blocks are laid
//! out back to back in registration order, starting at [`CONFIG_BASE`], and the region ends with
//! a CRC-16 over all of them:
//!
//! ```text
//! | module 0 block | module 1 block | ... | CRC (LE) |
//! ```
//!
//! On startup a valid CRC hands each module its block; a bad one (first boot, layout change)
//! hands each module `None`, which is the module's cue to persist its defaults.

use crc::{CRC_16_MODBUS, Crc};
use heapless::Vec;

use crate::{
    Error,
    log::{debug, error, info, warn},
};

/// Storage address of the first config block
pub const CONFIG_BASE: u16 = 0x20;

/// Largest config block a module may claim
pub const MAX_BLOCK: usize = 64;

pub const MAX_MODULES: usize = 16;

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Module ids, the first byte of every packet payload
pub mod module_id {
    pub const DONOTUSE: u8 = 0;
    pub const NET: u8 = 1;
    pub const LOG: u8 = 2;
    pub const NTPTIME: u8 = 3;
    pub const OWTEMP: u8 = 4;
    pub const OWRELAY: u8 = 5;
    pub const OWSCAN: u8 = 6;
    pub const WATERLEVEL: u8 = 7;
    pub const GW_RSSI: u8 = 8;
    pub const THERMOCOUPLE: u8 = 9;
}

/// Byte-addressed non-volatile storage, e.g. EEPROM
pub trait Storage {
    fn read(&mut self, addr: u16, buf: &mut [u8]);
    fn write(&mut self, addr: u16, data: &[u8]);

    /// Size in bytes; nothing at or past it is ever touched
    fn capacity(&self) -> usize;
}

/// Storage held in RAM, starting out erased (0xFF)
pub struct MemStorage<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> MemStorage<N> {
    pub const fn new() -> Self {
        Self { bytes: [0xFF; N] }
    }

    pub fn bytes(&self) -> &[u8; N] {
        &self.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8; N] {
        &mut self.bytes
    }
}

impl<const N: usize> Default for MemStorage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Storage for MemStorage<N> {
    fn read(&mut self, addr: u16, buf: &mut [u8]) {
        let start = addr as usize;
        buf.copy_from_slice(&self.bytes[start..start + buf.len()]);
    }

    fn write(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        self.bytes[start..start + data.len()].copy_from_slice(data);
    }

    fn capacity(&self) -> usize {
        N
    }
}

/// Lets a module persist its own config block
pub trait ConfigWrite {
    fn write(&mut self, module_id: u8, data: &[u8]) -> Result<(), Error>;
}

/// A peripheral module: owns a config block and handles packets carrying its module id
pub trait Module {
    fn module_id(&self) -> u8;

    /// Size of the config block in bytes, 0 for none
    fn config_size(&self) -> usize;

    /// Applies the stored config block, or initializes defaults (and persists them through
    /// `store`) when there is no valid one
    fn apply_config(&mut self, config: Option<&[u8]>, store: &mut dyn ConfigWrite);

    /// Handles a packet addressed to this module, module id already stripped
    fn receive(&mut self, data: &[u8]);
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    module_id: u8,
    addr: u16,
    size: u8,
}

pub struct ConfigStore<S> {
    storage: S,
    slots: Vec<Slot, MAX_MODULES>,
    /// Bytes of config blocks, CRC excluded
    blocks_len: u16,
}

impl<S: Storage> ConfigStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            slots: Vec::new(),
            blocks_len: 0,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Lays out the modules' blocks and hands each module its config.
    ///
    /// Returns whether the stored config was valid.
    pub fn init(&mut self, modules: &mut [&mut dyn Module]) -> bool {
        self.layout(modules);
        info!(
            "Config: {} modules, {} bytes",
            self.slots.len(),
            self.blocks_len + 2
        );

        let valid = self.check_crc();
        if !valid {
            info!("Config: CRC does not match, applying defaults");
        }

        let mut block = [0u8; MAX_BLOCK];
        for module in modules.iter_mut() {
            let slot = self.slot(module.module_id());
            match slot {
                Some(slot) if valid => {
                    let block = &mut block[..slot.size as usize];
                    self.storage.read(slot.addr, block);
                    module.apply_config(Some(&*block), &mut *self);
                }
                _ => module.apply_config(None, &mut *self),
            }
        }
        valid
    }

    /// Copies a module's stored block into `block`. Fails if the stored config is invalid, the
    /// module is unknown, or `block` is too short.
    pub fn read(&mut self, module_id: u8, block: &mut [u8]) -> bool {
        let Some(slot) = self.slot(module_id) else {
            return false;
        };
        let size = slot.size as usize;
        if block.len() < size || !self.check_crc() {
            return false;
        }
        self.storage.read(slot.addr, &mut block[..size]);
        true
    }

    fn layout(&mut self, modules: &[&mut dyn Module]) {
        self.slots.clear();
        let mut addr = CONFIG_BASE;
        for module in modules {
            let size = module.config_size();
            if size > MAX_BLOCK {
                error!(
                    "Config: module {} block too large ({} vs {} max)",
                    module.module_id(),
                    size,
                    MAX_BLOCK
                );
                continue;
            }
            if size == 0 {
                continue;
            }
            if addr as usize + size + 2 > self.storage.capacity() {
                error!(
                    "Config: no room for module {} ({} bytes @{})",
                    module.module_id(),
                    size,
                    addr
                );
                continue;
            }
            let slot = Slot {
                module_id: module.module_id(),
                addr,
                size: size as u8,
            };
            if self.slots.push(slot).is_err() {
                error!("Config: too many modules");
                break;
            }
            addr += size as u16;
        }
        self.blocks_len = addr - CONFIG_BASE;
    }

    fn slot(&self, module_id: u8) -> Option<Slot> {
        self.slots.iter().find(|s| s.module_id == module_id).copied()
    }

    /// Whether the blocks and their CRC lie inside the storage
    fn region_fits(&self) -> bool {
        (CONFIG_BASE + self.blocks_len) as usize + 2 <= self.storage.capacity()
    }

    /// CRC over blocks plus stored CRC comes out as zero when intact
    fn check_crc(&mut self) -> bool {
        if !self.region_fits() {
            return false;
        }
        let mut digest = CRC16.digest();
        let mut chunk = [0u8; 16];
        let end = CONFIG_BASE + self.blocks_len + 2;
        let mut addr = CONFIG_BASE;
        while addr < end {
            let n = ((end - addr) as usize).min(chunk.len());
            self.storage.read(addr, &mut chunk[..n]);
            digest.update(&chunk[..n]);
            addr += n as u16;
        }
        digest.finalize() == 0
    }

    fn write_crc(&mut self) {
        if !self.region_fits() {
            return;
        }
        let mut digest = CRC16.digest();
        let mut chunk = [0u8; 16];
        let end = CONFIG_BASE + self.blocks_len;
        let mut addr = CONFIG_BASE;
        while addr < end {
            let n = ((end - addr) as usize).min(chunk.len());
            self.storage.read(addr, &mut chunk[..n]);
            digest.update(&chunk[..n]);
            addr += n as u16;
        }
        self.storage.write(end, &digest.finalize().to_le_bytes());
    }
}

impl<S: Storage> ConfigWrite for ConfigStore<S> {
    fn write(&mut self, module_id: u8, data: &[u8]) -> Result<(), Error> {
        let Some(slot) = self.slot(module_id) else {
            warn!("Config: module {} not found", module_id);
            return Err(Error::UnknownModule(module_id));
        };
        if data.len() > slot.size as usize {
            return Err(Error::ConfigTooLarge(module_id));
        }
        debug!(
            "Config: writing {} bytes @{} for module {}",
            data.len(),
            slot.addr,
            module_id
        );
        self.storage.write(slot.addr, data);
        self.write_crc();
        Ok(())
    }
}

/// Hands a received packet to the module named by its first byte
pub fn dispatch(modules: &mut [&mut dyn Module], data: &[u8]) -> Result<(), Error> {
    let Some((&id, rest)) = data.split_first() else {
        return Ok(());
    };
    match modules.iter_mut().find(|m| m.module_id() == id) {
        Some(module) => {
            module.receive(rest);
            Ok(())
        }
        None => {
            debug!("Config: no module {} for packet", id);
            Err(Error::UnknownModule(id))
        }
    }
}
