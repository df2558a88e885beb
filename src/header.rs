//! Radio header byte
//!
//! ```text
//! | bit 7 | bit 6 | bit 5 | bits 4..0 |
//! | DST   | CTL   | ACK   | node id   |
//! ```
//!
//! * DST=0: broadcast from the named node, DST=1: directed to the named node
//! * CTL=0, ACK=0: data packet, no ack requested
//! * CTL=0, ACK=1: data packet, ack requested
//! * CTL=1, ACK=0: ack packet
//! * CTL=1, ACK=1: unused
//!
//! Node 0 is reserved for out-of-band use and node 31 for receive-all.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::identity::NodeId;

pub const HDR_DST: u8 = 0x80;
pub const HDR_CTL: u8 = 0x40;
pub const HDR_ACK: u8 = 0x20;
pub const HDR_MASK: u8 = 0x1F;

#[derive(Clone, Copy, PartialEq, Eq, Default, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct Header(u8);

impl Header {
    pub const fn from_byte(b: u8) -> Self {
        Self(b)
    }

    pub const fn as_byte(self) -> u8 {
        self.0
    }

    /// Data packet named after its source, heard by every node in the group
    pub const fn from_node(node: NodeId) -> Self {
        Self(node.get())
    }

    /// Data packet directed at `node`
    pub const fn to_node(node: NodeId) -> Self {
        Self(HDR_DST | node.get())
    }

    /// Header of the ack answering a packet whose node field was `dest`.
    ///
    /// A packet naming this node (it was directed here) is answered with an ack named after
    /// this node; anything else is answered with an ack directed back at `dest`.
    pub const fn ack_for(dest: u8, local: NodeId) -> Self {
        if dest == local.get() {
            Self(HDR_CTL | local.get())
        } else {
            Self(HDR_CTL | HDR_DST | (dest & HDR_MASK))
        }
    }

    pub const fn with_ack(self, ack: bool) -> Self {
        if ack {
            Self(self.0 | HDR_ACK)
        } else {
            self.without_ack()
        }
    }

    pub const fn without_ack(self) -> Self {
        Self(self.0 & !HDR_ACK)
    }

    pub const fn is_directed(self) -> bool {
        self.0 & HDR_DST != 0
    }

    pub const fn is_control(self) -> bool {
        self.0 & HDR_CTL != 0
    }

    pub const fn wants_ack(self) -> bool {
        self.0 & HDR_ACK != 0
    }

    pub const fn node(self) -> u8 {
        self.0 & HDR_MASK
    }
}

impl core::fmt::Debug for Header {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "Header({}{}{}{})",
            if self.is_directed() { "dst:" } else { "src:" },
            self.node(),
            if self.is_control() { " ctl" } else { "" },
            if self.wants_ack() { " ack" } else { "" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u8) -> NodeId {
        NodeId::new(id).unwrap()
    }

    #[test]
    fn field_decoding() {
        let h = Header::from_byte(0b1010_0111);
        assert!(h.is_directed());
        assert!(!h.is_control());
        assert!(h.wants_ack());
        assert_eq!(h.node(), 7);
    }

    #[test]
    fn ack_bit_toggles_without_touching_other_fields() {
        let h = Header::to_node(node(9)).with_ack(true);
        assert_eq!(h.as_byte(), HDR_DST | HDR_ACK | 9);
        assert_eq!(h.without_ack().as_byte(), HDR_DST | 9);
        assert_eq!(h.with_ack(false), h.without_ack());
    }

    #[test]
    fn ack_for_remote_sender_is_directed() {
        let h = Header::ack_for(12, node(3));
        assert_eq!(h.as_byte(), HDR_CTL | HDR_DST | 12);
        assert!(!h.wants_ack());
    }

    #[test]
    fn ack_for_packet_naming_us_is_self_addressed() {
        let h = Header::ack_for(3, node(3));
        assert_eq!(h.as_byte(), HDR_CTL | 3);
        assert!(!h.is_directed());
    }
}
