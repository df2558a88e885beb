//! Signal-quality sampling
//!
//! The radio module has no digital RSSI readout, so received signal strength is approximated by
//! an analog read of the receiver's AGC capacitor, scaled down to a byte. The byte rides along
//! with every ack for round-trip diagnostics.

/// Something that yields a signal-quality byte for the frame just received
pub trait SignalSource {
    fn sample(&mut self) -> u8;
}

/// A 10-bit analog input
pub trait AnalogPin {
    fn read(&mut self) -> u16;
}

impl<F: FnMut() -> u16> AnalogPin for F {
    fn read(&mut self) -> u16 {
        (*self)()
    }
}

/// Samples an analog pin wired to the receiver's RSSI output
pub struct AnalogRssi<A> {
    pin: A,
}

impl<A: AnalogPin> AnalogRssi<A> {
    const OFFSET: i16 = 300;

    pub fn new(pin: A) -> Self {
        Self { pin }
    }

    pub fn into_inner(self) -> A {
        self.pin
    }
}

impl<A: AnalogPin> SignalSource for AnalogRssi<A> {
    fn sample(&mut self) -> u8 {
        let raw = (self.pin.read() & 0x3FF) as i16;
        ((raw - Self::OFFSET) >> 2) as u8
    }
}

/// No sampler wired up; every sample reads 0
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSignal;

impl SignalSource for NoSignal {
    fn sample(&mut self) -> u8 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_analog_reading() {
        let mut rssi = AnalogRssi::new(|| 1023u16);
        assert_eq!(rssi.sample(), 180);
        let mut rssi = AnalogRssi::new(|| 300u16);
        assert_eq!(rssi.sample(), 0);
        let mut rssi = AnalogRssi::new(|| 304u16);
        assert_eq!(rssi.sample(), 1);
    }

    #[test]
    fn readings_below_offset_wrap_like_a_byte() {
        let mut rssi = AnalogRssi::new(|| 100u16);
        // (100 - 300) >> 2 == -50
        assert_eq!(rssi.sample(), (-50i16) as u8);
    }

    #[test]
    fn no_signal_is_zero() {
        assert_eq!(NoSignal.sample(), 0);
    }
}
