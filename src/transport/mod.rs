//! Physical transports
//!
//! [`crate::net::Net`] only needs a handful of non-blocking primitives from the medium: can a
//! frame go out now, start sending this frame, and has a frame come in. Which medium sits behind
//! them is chosen when the `Net` is built.

use crate::{config::RadioMode, header::Header, identity::NodeIdentity, packet::Packet};

#[cfg(test)]
pub(crate) mod mock;
#[cfg(feature = "nrf")]
pub mod nrf;
mod null;
mod serial;

pub use null::NullTransport;
pub use serial::SerialTransport;

/// Outcome of checking for a received frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Recv {
    /// Nothing complete yet
    Idle,
    /// A frame with a valid checksum was copied into the caller's packet
    Frame,
    /// A frame arrived with a bad checksum and was dropped
    CrcFailed,
}

pub trait Transport {
    /// `false` for a transport that stands in for missing hardware
    fn enabled(&self) -> bool {
        true
    }

    /// (Re)initializes the medium for this node
    fn configure(&mut self, _identity: &NodeIdentity, _mode: RadioMode) {}

    /// Whether a transmission may start right now
    fn can_send(&mut self) -> bool;

    /// Starts transmitting a frame. Only called right after `can_send` returned `true`.
    fn send_start(&mut self, header: Header, payload: &[u8]);

    /// Checks for a completed receive, copying the frame into `packet`
    fn recv_done(&mut self, packet: &mut Packet) -> Recv;
}
