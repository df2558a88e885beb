#![cfg_attr(not(test), no_std)]

//! Star-network radio transport for battery-powered sensor nodes.
//!
//! [`net::Net`] keeps a small queue of outbound packets, drives send / retry / ack timing and
//! acknowledges inbound packets, all from a single `poll()` called in the application's main
//! loop. The physical medium is abstracted behind [`transport::Transport`].

mod log;

pub mod clock;
pub mod config;
pub mod header;
pub mod identity;
pub mod net;
pub mod packet;
pub mod queue;
pub mod registry;
pub mod signal;
pub mod trace;
pub mod transport;

pub use config::{NetConfig, RadioMode};
pub use header::Header;
pub use identity::{BootOverride, NodeId, NodeIdentity};
pub use net::Net;
pub use packet::Packet;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Every outbound slot is taken
    QueueFull,
    BufferTooLong,
    /// The configured transport is the null transport
    Disabled,
    UnknownModule(u8),
    /// A module asked for a config block larger than the registry allows
    ConfigTooLarge(u8),
}
