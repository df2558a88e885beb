//! Fixed-capacity outbound packet queue
//!
//! Only the head packet is ever in flight. Callers write a payload into the slot returned by
//! [`OutboundQueue::allocate`] and then commit it with [`OutboundQueue::push`]; an allocate that
//! is never pushed simply leaves the slot to be overwritten by the next allocate.

use crate::{Error, config::MAX_DATA, header::Header, packet::Packet};

pub struct OutboundQueue<const N: usize> {
    slots: [Packet; N],
    len: usize,
}

impl<const N: usize> OutboundQueue<N> {
    pub const fn new() -> Self {
        const {
            assert!(N >= 1, "queue needs at least one slot");
        }
        Self {
            slots: [const { Packet::new_empty() }; N],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len >= N
    }

    /// Payload buffer of the next free slot
    pub fn allocate(&mut self) -> Option<&mut [u8; MAX_DATA]> {
        if self.is_full() {
            return None;
        }
        Some(self.slots[self.len].buffer_mut())
    }

    /// Commits the slot handed out by the last `allocate`
    pub fn push(&mut self, header: Header, len: u8) -> Result<(), Error> {
        if self.is_full() {
            return Err(Error::QueueFull);
        }
        let slot = &mut self.slots[self.len];
        slot.set_len(len)?;
        slot.set_header(header);
        self.len += 1;
        Ok(())
    }

    pub fn head(&self) -> Option<&Packet> {
        self.slots[..self.len].first()
    }

    /// Drops the head packet, moving the others up
    pub fn pop(&mut self) -> bool {
        if self.is_empty() {
            return false;
        }
        self.slots[..self.len].rotate_left(1);
        self.len -= 1;
        true
    }
}

impl<const N: usize> Default for OutboundQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_with(payloads: &[&[u8]]) -> OutboundQueue<3> {
        let mut q = OutboundQueue::new();
        for (i, p) in payloads.iter().enumerate() {
            let buf = q.allocate().unwrap();
            buf[..p.len()].copy_from_slice(p);
            q.push(Header::from_byte(i as u8 + 1), p.len() as u8).unwrap();
        }
        q
    }

    #[test]
    fn fifo_order() {
        let mut q = queue_with(&[&[1], &[2, 2], &[3, 3, 3]]);
        assert_eq!(q.len(), 3);
        assert_eq!(q.head().unwrap().payload(), &[1]);
        assert!(q.pop());
        assert_eq!(q.head().unwrap().payload(), &[2, 2]);
        assert_eq!(q.head().unwrap().header().as_byte(), 2);
        assert!(q.pop());
        assert_eq!(q.head().unwrap().payload(), &[3, 3, 3]);
        assert!(q.pop());
        assert!(q.head().is_none());
        assert!(!q.pop());
    }

    #[test]
    fn allocate_fails_when_full() {
        let mut q = queue_with(&[&[1], &[2], &[3]]);
        assert!(q.is_full());
        assert!(q.allocate().is_none());
        assert_eq!(q.push(Header::default(), 1), Err(Error::QueueFull));
        q.pop();
        assert!(q.allocate().is_some());
    }

    #[test]
    fn unpushed_allocate_reuses_slot() {
        let mut q = OutboundQueue::<3>::new();
        q.allocate().unwrap()[0] = 0xAA;
        let again = q.allocate().unwrap();
        assert_eq!(again[0], 0xAA);
        again[0] = 0xBB;
        q.push(Header::default(), 1).unwrap();
        assert_eq!(q.head().unwrap().payload(), &[0xBB]);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn push_rejects_oversize_length() {
        let mut q = OutboundQueue::<3>::new();
        assert_eq!(
            q.push(Header::default(), MAX_DATA as u8 + 1),
            Err(Error::BufferTooLong)
        );
        assert!(q.is_empty());
    }
}
