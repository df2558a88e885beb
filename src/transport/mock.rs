//! Scripted transport for unit tests

use std::collections::VecDeque;
use std::vec::Vec;

use crate::{config::RadioMode, header::Header, identity::NodeIdentity, packet::Packet};

use super::{Recv, Transport};

pub enum Inbound {
    Frame(Header, Vec<u8>),
    Corrupt,
}

#[derive(Default)]
pub struct MockTransport {
    /// What `can_send` reports
    pub busy: bool,
    pub sent: Vec<(Header, Vec<u8>)>,
    pub inbound: VecDeque<Inbound>,
    pub configured: Option<(NodeIdentity, RadioMode)>,
}

impl MockTransport {
    pub fn inject(&mut self, header: Header, payload: &[u8]) {
        self.inbound
            .push_back(Inbound::Frame(header, payload.to_vec()));
    }

    pub fn inject_corrupt(&mut self) {
        self.inbound.push_back(Inbound::Corrupt);
    }

    pub fn take_sent(&mut self) -> Vec<(Header, Vec<u8>)> {
        core::mem::take(&mut self.sent)
    }
}

impl Transport for MockTransport {
    fn configure(&mut self, identity: &NodeIdentity, mode: RadioMode) {
        self.configured = Some((*identity, mode));
    }

    fn can_send(&mut self) -> bool {
        !self.busy
    }

    fn send_start(&mut self, header: Header, payload: &[u8]) {
        assert!(!self.busy, "send_start while busy");
        self.sent.push((header, payload.to_vec()));
    }

    fn recv_done(&mut self, packet: &mut Packet) -> Recv {
        match self.inbound.pop_front() {
            None => Recv::Idle,
            Some(Inbound::Corrupt) => Recv::CrcFailed,
            Some(Inbound::Frame(header, payload)) => {
                packet.set_header(header);
                packet.set_payload(&payload).unwrap();
                Recv::Frame
            }
        }
    }
}
