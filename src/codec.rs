//! Bit-level codec: pulse generation and measurement.
//!
//! Every bit is a dominant pulse whose duration encodes the value, followed by
//! a floating gap up to the nominal bit period. The codec knows nothing about
//! frame structure; it sends and measures single bits, parity-covered fields,
//! start bits and acknowledge slots against the port's interval timer.
//!
//! All loops are bounded busy-waits. A wait that exceeds the
//! desynchronization bound of [`BitTiming`] fails with [`Desync`].

use crate::bus::AvcBus;
use crate::error::{Desync, ReadError};
use crate::parity::even_parity;
use crate::timer::BitTiming;

/// Sends and receives individual bits on an [`AvcBus`].
#[derive(Debug)]
pub struct BitCodec<B: AvcBus> {
    bus: B,
    timing: BitTiming,
    parity: bool,
}

impl<B: AvcBus> BitCodec<B> {
    /// Creates a codec over `bus` using `timing`.
    pub fn new(bus: B, timing: BitTiming) -> Self {
        Self {
            bus,
            timing,
            parity: false,
        }
    }

    /// The timing table in use.
    pub fn timing(&self) -> &BitTiming {
        &self.timing
    }

    /// Shared access to the port.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Exclusive access to the port.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Consumes the codec, returning the port.
    pub fn release(self) -> B {
        self.bus
    }

    /// Running parity of the bits received since the last field started.
    pub fn parity(&self) -> bool {
        self.parity
    }

    /// Drives the line for `driven` counts, then floats it until `total`.
    fn hold(&mut self, driven: u16, total: u16) {
        self.bus.restart_timer();
        self.bus.drive_level(true);
        while self.bus.read_elapsed() < driven {}
        self.bus.drive_level(false);
        while self.bus.read_elapsed() < total {}
    }

    /// Emits a start bit. The output driver must already be enabled.
    pub fn send_start_bit(&mut self) {
        self.hold(self.timing.start_driven, self.timing.start_period());
    }

    /// Emits one data bit. The output driver must already be enabled.
    pub fn send_bit(&mut self, bit: bool) {
        if bit {
            self.hold(self.timing.one_driven, self.timing.one_period());
        } else {
            self.hold(self.timing.zero_driven, self.timing.zero_period());
        }
    }

    /// Emits the low `bits` bits of `value`, most significant first, followed
    /// by their even parity bit.
    pub fn send_field(&mut self, value: u16, bits: u8) {
        for shift in (0..bits).rev() {
            self.send_bit((value >> shift) & 1 == 1);
        }
        self.send_bit(even_parity(value, bits));
    }

    /// Waits until the line is dominant (`true`) or idle (`false`).
    ///
    /// Restarts the timer on entry and returns the counts waited.
    fn wait_level(&mut self, dominant: bool, bound: u16) -> Result<u16, Desync> {
        self.bus.restart_timer();
        loop {
            if self.bus.is_bus_idle() != dominant {
                return Ok(self.bus.read_elapsed());
            }
            if self.bus.read_elapsed() > bound {
                return Err(Desync);
            }
        }
    }

    /// Receives one bit: waits for the line to go dominant, measures how long
    /// it stays dominant and classifies the pulse against the threshold.
    ///
    /// A `1` toggles the running parity.
    pub fn receive_bit(&mut self) -> Result<bool, Desync> {
        let bound = self.timing.desync_bound();
        let _ = self.wait_level(true, bound)?;
        let held = self.wait_level(false, bound)?;
        let bit = held < self.timing.threshold;
        if bit {
            self.parity = !self.parity;
        }
        Ok(bit)
    }

    /// Receives a `bits` wide field, most significant bit first.
    ///
    /// Resets the running parity first and returns the field together with
    /// the parity of its bits, to be compared with the trailing parity bit.
    pub fn receive_field(&mut self, bits: u8) -> Result<(u16, bool), Desync> {
        self.parity = false;
        let mut value = 0u16;
        for _ in 0..bits {
            value = (value << 1) | u16::from(self.receive_bit()?);
        }
        Ok((value, self.parity))
    }

    /// Receives and validates a start bit.
    ///
    /// If the line is already dominant (the caller saw it busy) the pulse is
    /// measured from now, otherwise the codec first waits for it to begin.
    pub fn receive_start_bit(&mut self) -> Result<(), ReadError> {
        if self.bus.is_bus_idle() {
            let _ = self
                .wait_level(true, self.timing.start_period())
                .map_err(|_| ReadError::NoStartBit)?;
        }
        let held = self
            .wait_level(false, self.timing.start_max())
            .map_err(|_| ReadError::LongStartBit)?;
        if held < self.timing.start_min() {
            return Err(ReadError::ShortStartBit(held));
        }
        Ok(())
    }

    /// Acknowledges the slot the sender is about to open: waits for its
    /// pulse, then holds the line dominant long enough to read as a `0`.
    ///
    /// Leaves the output driver disabled.
    pub fn send_ack(&mut self) -> Result<(), Desync> {
        let _ = self.wait_level(true, self.timing.desync_bound())?;
        self.bus.restart_timer();
        self.bus.set_transmitting(true);
        self.bus.drive_level(true);
        while self.bus.read_elapsed() < self.timing.zero_driven {}
        self.bus.drive_level(false);
        self.bus.set_transmitting(false);
        Ok(())
    }

    /// Opens an acknowledge slot as the sender and reports whether the
    /// receiver acknowledged it.
    ///
    /// Drives a `1` pulse, then disables the output driver so the receiver
    /// may stretch the pulse. A pulse observed past the threshold is an ACK.
    /// The slot is padded to a full bit period and the output driver is
    /// re-enabled on every path.
    pub fn read_ack(&mut self) -> Result<bool, Desync> {
        self.bus.restart_timer();
        self.bus.drive_level(true);
        while self.bus.read_elapsed() < self.timing.one_driven {}
        self.bus.set_transmitting(false);
        self.bus.drive_level(false);

        let held = loop {
            let elapsed = self.bus.read_elapsed();
            if self.bus.is_bus_idle() {
                break elapsed;
            }
            if elapsed > self.timing.max_bit {
                self.bus.set_transmitting(true);
                return Err(Desync);
            }
        };
        while self.bus.read_elapsed() < self.timing.bit_period() {}
        self.bus.set_transmitting(true);
        Ok(held >= self.timing.threshold)
    }

    /// `true` if the line stays idle for a full bit period. Returns `false`
    /// as soon as it is seen dominant.
    pub fn is_bus_free(&mut self) -> bool {
        self.bus.restart_timer();
        loop {
            if !self.bus.is_bus_idle() {
                return false;
            }
            if self.bus.read_elapsed() >= self.timing.bit_period() {
                return true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimBus, Waveform, decode_pulses};

    fn codec() -> BitCodec<SimBus> {
        BitCodec::new(SimBus::new(BitTiming::AVR_8MHZ), BitTiming::AVR_8MHZ)
    }

    #[test]
    fn test_send_bit_pulse_widths() {
        let mut codec = codec();
        codec.bus_mut().set_transmitting(true);
        codec.send_bit(true);
        codec.send_bit(false);
        codec.send_start_bit();
        let timing = BitTiming::AVR_8MHZ;
        let pulses = codec.bus().driven();
        assert_eq!(pulses.len(), 3);
        let width = |(start, end): (u32, u32)| end - start;
        assert!(width(pulses[0]).abs_diff(u32::from(timing.one_driven)) <= 4);
        assert!(width(pulses[1]).abs_diff(u32::from(timing.zero_driven)) <= 4);
        assert!(width(pulses[2]).abs_diff(u32::from(timing.start_driven)) <= 4);
        // bit 0 starts one bit-1 period after bit 1
        assert!((pulses[1].0 - pulses[0].0).abs_diff(u32::from(timing.one_period())) <= 4);
    }

    #[test]
    fn test_send_field_appends_even_parity() {
        let mut codec = codec();
        codec.bus_mut().set_transmitting(true);
        codec.send_field(0x0B, 4);
        let bits = decode_pulses(codec.bus().driven(), &BitTiming::AVR_8MHZ);
        assert_eq!(bits, [true, false, true, true, true]);
    }

    #[test]
    fn test_receive_field_and_parity() {
        let timing = BitTiming::AVR_8MHZ;
        let mut codec = codec();
        let wave = Waveform::new(timing).field(0x360, 12);
        codec.bus_mut().play(&wave, 3);
        let (value, parity) = codec.receive_field(12).unwrap();
        assert_eq!(value, 0x360);
        assert_eq!(parity, even_parity(0x360, 12));
        assert_eq!(codec.receive_bit(), Ok(parity));
    }

    #[test]
    fn test_receive_bit_times_out_on_silent_line() {
        let mut codec = codec();
        assert_eq!(codec.receive_bit(), Err(Desync));
    }

    #[test]
    fn test_start_bit_window() {
        let timing = BitTiming::AVR_8MHZ;

        let mut codec = codec();
        codec.bus_mut().play(&Waveform::new(timing).start_bit(), 3);
        assert_eq!(codec.receive_start_bit(), Ok(()));

        let mut codec = self::codec();
        codec.bus_mut().play(&Waveform::new(timing).pulse(400, 600), 3);
        assert!(matches!(codec.receive_start_bit(), Err(ReadError::ShortStartBit(n)) if n < 420));

        let mut codec = self::codec();
        codec.bus_mut().play(&Waveform::new(timing).pulse(3000, 3200), 3);
        assert_eq!(codec.receive_start_bit(), Err(ReadError::LongStartBit));

        let mut codec = self::codec();
        assert_eq!(codec.receive_start_bit(), Err(ReadError::NoStartBit));
    }

    #[test]
    fn test_ack_stretches_pulse_past_threshold() {
        let timing = BitTiming::AVR_8MHZ;
        let mut codec = codec();
        codec.bus_mut().play(&Waveform::new(timing).ack_slot(), 3);
        codec.send_ack().unwrap();
        let ours = codec.bus().driven();
        assert_eq!(ours.len(), 1);
        assert!(ours[0].1 - ours[0].0 >= u32::from(timing.threshold));
        assert!(!codec.bus().is_transmitting());
    }

    #[test]
    fn test_read_ack_without_peer_is_nak() {
        let mut codec = codec();
        codec.bus_mut().set_transmitting(true);
        assert_eq!(codec.read_ack(), Ok(false));
        assert!(codec.bus().is_transmitting());
    }

    #[test]
    fn test_read_ack_with_peer_is_ack() {
        let mut codec = codec();
        codec.bus_mut().acknowledge_every_slot(true);
        codec.bus_mut().set_transmitting(true);
        assert_eq!(codec.read_ack(), Ok(true));
        assert!(codec.bus().is_transmitting());
    }

    #[test]
    fn test_bus_free_requires_a_quiet_bit_period() {
        let timing = BitTiming::AVR_8MHZ;
        let mut codec = codec();
        assert!(codec.is_bus_free());

        let mut codec = self::codec();
        codec.bus_mut().play(&Waveform::new(timing).pulse(200, 300), 50);
        assert!(!codec.is_bus_free());
    }
}
