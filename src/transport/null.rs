use crate::{header::Header, packet::Packet};

use super::{Recv, Transport};

/// Transport for nodes without a network. Nothing can be queued and nothing arrives.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn enabled(&self) -> bool {
        false
    }

    fn can_send(&mut self) -> bool {
        false
    }

    fn send_start(&mut self, _header: Header, _payload: &[u8]) {}

    fn recv_done(&mut self, _packet: &mut Packet) -> Recv {
        Recv::Idle
    }
}
