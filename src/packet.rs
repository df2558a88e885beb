// # Packet
//
// In-memory layout, shared by the outbound queue, the receive buffer and the nRF radio DMA:
// ```
// | HEADER | LENGTH | PAYLOAD                          |
// | 1byte  | 1byte  | LENGTH byte (<= MAX_DATA)        |
//                   | MODULE ID | module specific data |
// ```
//
// The module id is the first payload byte and selects the peripheral module that handles the
// packet on the receiving side.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{Error, config::MAX_DATA, header::Header};

#[derive(Debug, Clone, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(C)]
pub struct Packet {
    header: Header,
    len: u8,
    data: [u8; MAX_DATA],
}

impl Packet {
    /// Offset of the payload within the byte layout
    pub const PAYLOAD_OFFSET: usize = 2;

    pub const fn new_empty() -> Self {
        const {
            assert!(MAX_DATA <= 255);
        }
        Self {
            header: Header::from_byte(0),
            len: 0,
            data: [0; MAX_DATA],
        }
    }

    pub fn header(&self) -> Header {
        self.header
    }

    pub fn set_header(&mut self, header: Header) {
        self.header = header;
    }

    pub fn payload_length(&self) -> u8 {
        self.len
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[..(self.len as usize).min(MAX_DATA)]
    }

    /// First payload byte, if any
    pub fn module_id(&self) -> Option<u8> {
        self.payload().first().copied()
    }

    pub(crate) fn set_len(&mut self, len: u8) -> Result<(), Error> {
        if len as usize > MAX_DATA {
            Err(Error::BufferTooLong)
        } else {
            self.len = len;
            Ok(())
        }
    }

    pub fn set_payload(&mut self, payload: &[u8]) -> Result<(), Error> {
        if payload.len() > MAX_DATA {
            Err(Error::BufferTooLong)
        } else {
            self.data[..payload.len()].copy_from_slice(payload);
            self.len = payload.len() as u8;
            Ok(())
        }
    }

    /// The whole payload buffer, regardless of the current length
    pub(crate) fn buffer_mut(&mut self) -> &mut [u8; MAX_DATA] {
        &mut self.data
    }

    /// Header, length and payload exactly as they go on the wire
    pub fn frame(&self) -> &[u8] {
        &self.as_bytes()[..Self::PAYLOAD_OFFSET + self.payload().len()]
    }
}

impl Default for Packet {
    fn default() -> Self {
        Self::new_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_follows_length() {
        let mut p = Packet::new_empty();
        assert_eq!(p.module_id(), None);
        p.set_payload(&[4, 1, 2]).unwrap();
        assert_eq!(p.payload(), &[4, 1, 2]);
        assert_eq!(p.module_id(), Some(4));
        p.set_len(1).unwrap();
        assert_eq!(p.payload(), &[4]);
    }

    #[test]
    fn oversize_payload_rejected() {
        let mut p = Packet::new_empty();
        assert_eq!(p.set_payload(&[0; MAX_DATA + 1]), Err(Error::BufferTooLong));
        assert_eq!(p.set_len(MAX_DATA as u8 + 1), Err(Error::BufferTooLong));
        assert_eq!(p.payload_length(), 0);
    }

    #[test]
    fn frame_layout() {
        let mut p = Packet::new_empty();
        p.set_header(Header::from_byte(0x25));
        p.set_payload(&[7, 8]).unwrap();
        assert_eq!(p.frame(), &[0x25, 2, 7, 8]);
        assert_eq!(core::mem::size_of::<Packet>(), MAX_DATA + 2);
    }
}
