//! nRF52 RADIO backend
//!
//! Polled, no interrupts. The radio sits in RX whenever it is not transmitting; `recv_done`
//! notices completed transfers through the END / DISABLED events and re-arms the receiver.
//!
//! # Packet
//!
//! ```text
//! Packet: | PREAMBLE | BASE   | PREFIX | S0     | LENGTH | PAYLOAD     | CRC    |
//!         | 1byte    | 4bytes | 1byte  | 1byte  | 8bit   | LENGTH byte | 2bytes |
//! Memory: |          | BASE   | GROUP  | HEADER | LENGTH | PAYLOAD     |        |
//!         | ×        | 4bytes | 1byte  | 1byte  | 1byte  | LENGTH byte | ×      |
//!                     <--  ADDRESS  --> <--           DATA            -->
//! ```
//!
//! which is exactly the in-memory layout of [`Packet`], so the DMA buffer is a `Packet`.

use core::sync::atomic::{Ordering, compiler_fence};

use embassy_hal_internal::{PeripheralRef, into_ref};
use embassy_nrf::{
    Peripheral,
    pac::{
        self,
        radio::vals::{self, State as RadioState},
    },
    radio::{Instance, TxPower},
};

use crate::{
    config::{MAX_DATA, RadioMode},
    header::Header,
    identity::NodeIdentity,
    log::{debug, trace, warn},
    packet::Packet,
    signal::SignalSource,
};

use super::{Recv, Transport};

pub mod addresses;

use addresses::{ADDR_LENGTH, Addresses};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Phase {
    /// Not configured yet
    Off,
    Rx,
    Tx,
}

/// Polled radio driver for the star network
pub struct NrfRadio<'d, T: Instance> {
    _p: PeripheralRef<'d, T>,
    frame: &'d mut Packet,
    phase: Phase,
    rf_channel: u8,
}

impl<'d, T: Instance> NrfRadio<'d, T> {
    /// Creates a new instance of `NrfRadio`. The radio stays off until
    /// [`Transport::configure`] runs.
    ///
    /// `frame` is the DMA buffer and must live in RAM.
    ///
    /// **IMPORTANT**: Do **NOT** use peripheral other than [`embassy_nrf::peripherals::RADIO`].
    /// It can cause unexpected behavior.
    pub fn new(radio: impl Peripheral<P = T> + 'd, frame: &'d mut Packet) -> Self {
        into_ref!(radio);
        Self {
            _p: radio,
            frame,
            phase: Phase::Off,
            rf_channel: 0,
        }
    }

    fn regs(&mut self) -> pac::radio::Radio {
        embassy_nrf::pac::RADIO
    }

    pub fn read_state(&mut self) -> RadioState {
        self.regs().state().read().state()
    }

    fn setup(&mut self, addresses: &Addresses, mode: RadioMode) {
        let r = self.regs();

        // Disable and enable to reset peripheral
        r.power().write(|w| w.set_power(false));
        r.power().write(|w| w.set_power(true));

        let (bitrate, tx_power) = match mode {
            RadioMode::Normal => (vals::Mode::NRF_2MBIT, TxPower::_0_DBM),
            RadioMode::Low => (vals::Mode::NRF_2MBIT, TxPower::NEG20_DBM),
            RadioMode::Slow => (vals::Mode::NRF_1MBIT, TxPower::POS4_DBM),
        };
        r.mode().write(|w| w.set_mode(bitrate));
        r.txpower().write(|w| w.set_txpower(tx_power));

        #[cfg(feature = "fast-ru")]
        r.modecnf0().write(|w| w.set_ru(vals::Ru::FAST));

        r.frequency().write(|w| w.set_frequency(addresses.rf_channel));
        self.rf_channel = addresses.rf_channel;

        // S0 carries the header byte, LENGTH the payload length
        r.pcnf0().write(|w| {
            w.set_s0len(true);
            w.set_lflen(8);
            w.set_s1len(0);
        });
        r.pcnf1().write(|w| {
            w.set_whiteen(false);
            w.set_endian(vals::Endian::BIG);
            w.set_balen(ADDR_LENGTH - 1);
            w.set_statlen(0);
            w.set_maxlen(MAX_DATA as u8);
        });

        const CRC_INIT: u32 = 0x0000_FFFF;
        const CRC_POLY: u32 = 0x0001_1021;
        r.crcinit().write(|w| w.set_crcinit(CRC_INIT & 0x00FF_FFFF));
        r.crcpoly().write(|w| w.set_crcpoly(CRC_POLY & 0x00FF_FFFF));
        r.crccnf().write(|w| w.set_len(vals::Len::TWO));

        r.base0().write(|w| *w = addresses.base_reg());
        r.prefix0().write(|w| w.0 = addresses.prefix_reg());
        r.txaddress().write(|w| w.set_txaddress(0));
        r.rxaddresses().write(|w| w.0 = 1);

        r.intenclr().write(|w| w.0 = 0xffff_ffff);
        r.shorts().write(|w| {
            w.set_ready_start(true);
            w.set_end_disable(true);
            w.set_address_rssistart(true);
            w.set_disabled_rssistop(true);
        });
    }

    fn start_rx(&mut self) {
        let ptr = &mut *self.frame as *mut Packet as u32;
        let r = self.regs();
        r.packetptr().write_value(ptr);
        r.events_address().write_value(0);
        r.events_end().write_value(0);
        r.events_disabled().write_value(0);
        dma_start_fence();
        r.tasks_rxen().write_value(1);
        self.phase = Phase::Rx;
    }

    /// Moves the radio to DISABLED, abandoning a listening receiver
    fn disable(&mut self) {
        let r = self.regs();
        r.tasks_disable().write_value(1);
        while self.read_state() != RadioState::DISABLED {}
        dma_end_fence();
        self.regs().events_disabled().write_value(0);
    }
}

impl<T: Instance> Transport for NrfRadio<'_, T> {
    fn configure(&mut self, identity: &NodeIdentity, mode: RadioMode) {
        if self.phase != Phase::Off {
            self.disable();
        }
        let addresses = Addresses::for_group(identity.group());
        self.setup(&addresses, mode);
        debug!(
            "radio: group {} channel {} mode {}",
            identity.group(),
            self.rf_channel,
            mode.as_byte()
        );
        self.start_rx();
    }

    fn can_send(&mut self) -> bool {
        match self.phase {
            Phase::Off | Phase::Tx => false,
            // An address match means a frame is coming in right now
            Phase::Rx => self.regs().events_address().read() == 0,
        }
    }

    fn send_start(&mut self, header: Header, payload: &[u8]) {
        self.disable();
        self.frame.set_header(header);
        if self.frame.set_payload(payload).is_err() {
            warn!("radio: payload of {} bytes dropped", payload.len());
            self.start_rx();
            return;
        }

        let ptr = &mut *self.frame as *mut Packet as u32;
        let r = self.regs();
        r.packetptr().write_value(ptr);
        r.events_disabled().write_value(0);
        dma_start_fence();
        r.tasks_txen().write_value(1);
        self.phase = Phase::Tx;
    }

    fn recv_done(&mut self, packet: &mut Packet) -> Recv {
        let r = self.regs();
        match self.phase {
            Phase::Off => Recv::Idle,
            Phase::Tx => {
                if r.events_disabled().read() != 0 {
                    trace!("radio: tx done");
                    self.start_rx();
                }
                Recv::Idle
            }
            Phase::Rx => {
                if r.events_disabled().read() == 0 {
                    return Recv::Idle;
                }
                dma_end_fence();
                let ok = r.crcstatus().read().crcstatus() == vals::Crcstatus::CRCOK;
                let result = if ok {
                    packet.clone_from(self.frame);
                    Recv::Frame
                } else {
                    debug!("radio: crc failed {}", r.rxcrc().read().rxcrc());
                    Recv::CrcFailed
                };
                self.start_rx();
                result
            }
        }
    }
}

/// Signal quality from the radio's RSSI sampler, for use as the `Net` signal source.
///
/// The sampler runs from address match to DISABLED, so by the time `Net` handles a frame the
/// value belongs to that frame. Reads the magnitude in -dBm: smaller is stronger.
#[derive(Debug, Default, Clone, Copy)]
pub struct RadioRssi;

impl SignalSource for RadioRssi {
    fn sample(&mut self) -> u8 {
        embassy_nrf::pac::RADIO.rssisample().read().rssisample()
    }
}

/// NOTE must be followed by a volatile write operation
fn dma_start_fence() {
    compiler_fence(Ordering::Release);
}

/// NOTE must be preceded by a volatile read operation
fn dma_end_fence() {
    compiler_fence(Ordering::Acquire);
}
