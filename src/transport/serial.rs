// # Serial framing
//
// ```
// | SYNC | HEADER | LENGTH | PAYLOAD     | CRC          |
// | 0xA5 | 1byte  | 1byte  | LENGTH byte | 2bytes (LE)  |
// ```
//
// CRC-16/MODBUS over HEADER, LENGTH and PAYLOAD. A LENGTH above `MAX_DATA` drops the receiver
// back to hunting for SYNC.

use crc::{CRC_16_MODBUS, Crc};
use embedded_io::{Read, ReadReady, Write, WriteReady};

use crate::{
    header::Header,
    log::{debug, warn},
    packet::Packet,
};

use super::{Recv, Transport};

const SYNC: u8 = 0xA5;
const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxState {
    /// Hunting for SYNC
    Idle,
    Header,
    Length,
    Data,
    CrcLow,
    CrcHigh,
}

/// Packet transport over a UART, e.g. a node wired straight to a gateway
pub struct SerialTransport<U> {
    uart: U,
    state: RxState,
    rx: Packet,
    fill: usize,
    crc_low: u8,
}

impl<U> SerialTransport<U>
where
    U: Read + ReadReady + Write + WriteReady,
{
    pub fn new(uart: U) -> Self {
        Self {
            uart,
            state: RxState::Idle,
            rx: Packet::new_empty(),
            fill: 0,
            crc_low: 0,
        }
    }

    pub fn into_inner(self) -> U {
        self.uart
    }

    fn write_frame(&mut self, frame: &Packet) -> Result<(), U::Error> {
        let crc = CRC16.checksum(frame.frame());
        self.uart.write_all(&[SYNC])?;
        self.uart.write_all(frame.frame())?;
        self.uart.write_all(&crc.to_le_bytes())?;
        self.uart.flush()
    }

    fn feed(&mut self, b: u8, packet: &mut Packet) -> Option<Recv> {
        match self.state {
            RxState::Idle => {
                if b == SYNC {
                    self.state = RxState::Header;
                }
            }
            RxState::Header => {
                self.rx.set_header(Header::from_byte(b));
                self.state = RxState::Length;
            }
            RxState::Length => {
                if self.rx.set_len(b).is_err() {
                    debug!("serial: bad length {}", b);
                    self.state = RxState::Idle;
                } else {
                    self.fill = 0;
                    self.state = if b == 0 {
                        RxState::CrcLow
                    } else {
                        RxState::Data
                    };
                }
            }
            RxState::Data => {
                self.rx.buffer_mut()[self.fill] = b;
                self.fill += 1;
                if self.fill >= self.rx.payload_length() as usize {
                    self.state = RxState::CrcLow;
                }
            }
            RxState::CrcLow => {
                self.crc_low = b;
                self.state = RxState::CrcHigh;
            }
            RxState::CrcHigh => {
                self.state = RxState::Idle;
                let expected = u16::from_le_bytes([self.crc_low, b]);
                if CRC16.checksum(self.rx.frame()) == expected {
                    packet.clone_from(&self.rx);
                    return Some(Recv::Frame);
                }
                return Some(Recv::CrcFailed);
            }
        }
        None
    }
}

impl<U> Transport for SerialTransport<U>
where
    U: Read + ReadReady + Write + WriteReady,
{
    fn can_send(&mut self) -> bool {
        self.uart.write_ready().unwrap_or(false)
    }

    fn send_start(&mut self, header: Header, payload: &[u8]) {
        let mut frame = Packet::new_empty();
        frame.set_header(header);
        if frame.set_payload(payload).is_err() {
            warn!("serial: payload of {} bytes dropped", payload.len());
            return;
        }
        if self.write_frame(&frame).is_err() {
            warn!("serial: write failed");
        }
    }

    fn recv_done(&mut self, packet: &mut Packet) -> Recv {
        let mut byte = [0u8; 1];
        loop {
            match self.uart.read_ready() {
                Ok(true) => {}
                Ok(false) => return Recv::Idle,
                Err(_) => {
                    warn!("serial: read failed");
                    self.state = RxState::Idle;
                    return Recv::Idle;
                }
            }
            match self.uart.read(&mut byte) {
                Ok(1) => {}
                Ok(_) => return Recv::Idle,
                Err(_) => {
                    warn!("serial: read failed");
                    self.state = RxState::Idle;
                    return Recv::Idle;
                }
            }
            if let Some(recv) = self.feed(byte[0], packet) {
                return recv;
            }
        }
    }
}
