//! Low-level trace buffer
//!
//! Records single-character trace items and ships them as a LOG module packet when the buffer
//! fills up. Meant for debugging timing problems where a serial console would be too slow.

use crate::registry::module_id::LOG;

pub const TRACE_LEN: usize = 60;

pub struct Trace {
    enabled: bool,
    // byte 0 holds the LOG module id so the buffer can be sent as-is
    buf: [u8; TRACE_LEN + 1],
    cnt: usize,
}

impl Trace {
    pub const fn new(enabled: bool) -> Self {
        let mut buf = [0; TRACE_LEN + 1];
        buf[0] = LOG;
        Self {
            enabled,
            buf,
            cnt: 0,
        }
    }

    pub fn push(&mut self, c: u8) {
        if self.enabled && self.cnt < TRACE_LEN {
            self.cnt += 1;
            self.buf[self.cnt] = c;
        }
    }

    pub fn len(&self) -> usize {
        self.cnt
    }

    pub fn is_empty(&self) -> bool {
        self.cnt == 0
    }

    /// Past three quarters, time to flush even outside `poll`
    pub fn nearly_full(&self) -> bool {
        self.cnt >= 3 * TRACE_LEN / 4
    }

    /// The packet payload to send, if it's time to send one
    pub fn pending(&self, force: bool) -> Option<&[u8]> {
        if (force && self.cnt > 0) || self.cnt >= TRACE_LEN / 2 {
            Some(&self.buf[..self.cnt + 1])
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.cnt = 0;
    }
}
