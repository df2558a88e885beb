//! Node identity
//!
//! A node's id and group are fixed at boot: either handed over by the bootloader in memory that
//! the runtime does not zero, or taken from compiled-in defaults. Changing either takes a reboot.

use crate::config::{DEFAULT_GROUP, GATEWAY_NODE};

/// A node id usable on the air, `1..=30`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NodeId(u8);

impl NodeId {
    pub const GATEWAY: NodeId = NodeId(GATEWAY_NODE);

    /// Returns `None` for the reserved ids 0 and 31 and anything that doesn't fit in 5 bits
    pub const fn new(id: u8) -> Option<Self> {
        if id >= 1 && id <= 30 {
            Some(Self(id))
        } else {
            None
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

/// The two bytes a bootloader leaves behind: group id followed by node id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootOverride {
    pub group: u8,
    pub node: u8,
}

impl BootOverride {
    /// Reads the override from a fixed memory location.
    ///
    /// # Safety
    ///
    /// `addr` and `addr + 1` must be readable. Call this once at startup, before anything else
    /// reuses that memory.
    pub unsafe fn read(addr: *const u8) -> Self {
        unsafe {
            Self {
                group: core::ptr::read_volatile(addr),
                node: core::ptr::read_volatile(addr.add(1)),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NodeIdentity {
    node: NodeId,
    group: u8,
}

impl NodeIdentity {
    pub const fn new(node: NodeId, group: u8) -> Self {
        Self { node, group }
    }

    /// Picks the bootloader override when it names a non-zero group and a usable node id,
    /// the defaults otherwise.
    pub fn resolve(boot: Option<BootOverride>, default_node: NodeId, default_group: u8) -> Self {
        match boot {
            Some(BootOverride { group, node }) if group != 0 => match NodeId::new(node) {
                Some(node) => Self::new(node, group),
                None => Self::new(default_node, default_group),
            },
            _ => Self::new(default_node, default_group),
        }
    }

    pub const fn node(&self) -> NodeId {
        self.node
    }

    pub const fn group(&self) -> u8 {
        self.group
    }
}

impl Default for NodeIdentity {
    fn default() -> Self {
        Self::new(NodeId::GATEWAY, DEFAULT_GROUP)
    }
}
