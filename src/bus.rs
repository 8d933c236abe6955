//! Hardware port of the AVC-LAN driver.
//!
//! The protocol code never touches registers. Everything it needs from the
//! hardware (sensing the line, driving it dominant, enabling the output
//! driver, and a free-running interval timer) goes through [`AvcBus`], so the
//! bit codec runs unchanged against real pins or a simulated bus on a host.
//!
//! [`PinBus`] builds an [`AvcBus`] from `embedded-hal` 1.0 digital pins and an
//! [`IntervalTimer`]:
//!
//! | Pin      | Direction | Meaning |
//! |----------|-----------|---------|
//! | `drive`  | output    | high drives the bus dominant (logical `0`) |
//! | `sense`  | input     | comparator output, high while the bus is dominant |
//! | `enable` | output    | optional transceiver driver enable; while off the line is released |
//!
//! Either of `sense` and `enable` may be inverted.

use embedded_hal::digital::{InputPin, OutputPin};

/// A free-running counter used to time pulses.
///
/// The counter rate fixes the unit of every duration in
/// [`BitTiming`](crate::timer::BitTiming).
pub trait IntervalTimer {
    /// Resets the counter to zero.
    fn restart(&mut self);
    /// Counts elapsed since the last [`restart`](IntervalTimer::restart), saturating at `u16::MAX`.
    fn elapsed(&mut self) -> u16;
}

/// The timer and line access the bit codec is written against.
pub trait AvcBus {
    /// `true` while the line is recessive (floating).
    fn is_bus_idle(&mut self) -> bool;
    /// Drives the line dominant (`true`) or releases it (`false`).
    fn drive_level(&mut self, dominant: bool);
    /// Enables or disables the output driver. While disabled nothing this
    /// node drives reaches the line.
    fn set_transmitting(&mut self, on: bool);
    /// Restarts the interval timer.
    fn restart_timer(&mut self);
    /// Reads the interval timer.
    fn read_elapsed(&mut self) -> u16;
}

impl<B: AvcBus + ?Sized> AvcBus for &mut B {
    fn is_bus_idle(&mut self) -> bool {
        (**self).is_bus_idle()
    }

    fn drive_level(&mut self, dominant: bool) {
        (**self).drive_level(dominant);
    }

    fn set_transmitting(&mut self, on: bool) {
        (**self).set_transmitting(on);
    }

    fn restart_timer(&mut self) {
        (**self).restart_timer();
    }

    fn read_elapsed(&mut self) -> u16 {
        (**self).read_elapsed()
    }
}

/// [`AvcBus`] over `embedded-hal` pins.
///
/// ## Type Parameters
///
/// - `DRV`: [`OutputPin`] driving the bus transmitter
/// - `SENSE`: [`InputPin`] reading the bus comparator
/// - `EN`: [`OutputPin`] enabling the transmitter (pass `None` if the
///   transceiver has no enable line)
/// - `T`: the [`IntervalTimer`]
///
/// ## Example
///
/// ```rust
/// # use embedded_hal_mock::eh1::digital::{Mock as Pin, State as PinState, Transaction as PinTransaction};
/// # struct Counter(u16);
/// # impl avclan::bus::IntervalTimer for Counter {
/// #     fn restart(&mut self) { self.0 = 0; }
/// #     fn elapsed(&mut self) -> u16 { self.0 }
/// # }
/// use avclan::bus::{AvcBus, PinBus};
///
/// # let drive = Pin::new(&[PinTransaction::set(PinState::Low)]);
/// # let sense = Pin::new(&[PinTransaction::get(PinState::Low)]);
/// let mut bus: PinBus<Pin, Pin, Pin, Counter> =
///     PinBus::new(drive, sense, None, Counter(0), None, None);
/// assert!(bus.is_bus_idle());
/// # bus.drive.done();
/// # bus.sense.done();
/// ```
///
/// ## Notes
///
/// Pin errors cannot be propagated out of a bit-timed loop: a failed sense
/// read counts as an idle line, and failed writes are ignored.
#[derive(Debug)]
pub struct PinBus<DRV, SENSE, EN, T>
where
    DRV: OutputPin,
    SENSE: InputPin,
    EN: OutputPin,
    T: IntervalTimer,
{
    /// Transmitter drive pin.
    pub drive: DRV,
    /// Comparator sense pin.
    pub sense: SENSE,
    /// Optional transmitter enable pin.
    pub enable: Option<EN>,
    /// Pulse timer.
    pub timer: T,
    sense_inverted: bool,
    enable_inverted: bool,
    transmitting: bool,
}

impl<DRV, SENSE, EN, T> PinBus<DRV, SENSE, EN, T>
where
    DRV: OutputPin,
    SENSE: InputPin,
    EN: OutputPin,
    T: IntervalTimer,
{
    /// Creates a bus port with the line released and the transmitter disabled.
    ///
    /// # Arguments
    /// - `drive`: output pin driving the transmitter
    /// - `sense`: input pin reading the comparator
    /// - `enable`: optional transmitter enable pin
    /// - `timer`: free-running interval timer
    /// - `sense_inverted`: the comparator reads low while the bus is dominant
    /// - `enable_inverted`: the transmitter is enabled by driving `enable` low
    pub fn new(
        drive: DRV,
        sense: SENSE,
        enable: Option<EN>,
        timer: T,
        sense_inverted: Option<bool>,
        enable_inverted: Option<bool>,
    ) -> Self {
        let mut bus = Self {
            drive,
            sense,
            enable,
            timer,
            sense_inverted: sense_inverted.unwrap_or(false),
            enable_inverted: enable_inverted.unwrap_or(false),
            transmitting: false,
        };
        let _ = bus.drive.set_low();
        bus.write_enable(false);
        bus
    }

    fn write_enable(&mut self, on: bool) {
        let state = on != self.enable_inverted;
        if let Some(ref mut enable) = self.enable {
            if state {
                let _ = enable.set_high();
            } else {
                let _ = enable.set_low();
            }
        }
    }

    /// `true` while the transmitter is enabled.
    pub fn is_transmitting(&self) -> bool {
        self.transmitting
    }
}

impl<DRV, SENSE, EN, T> AvcBus for PinBus<DRV, SENSE, EN, T>
where
    DRV: OutputPin,
    SENSE: InputPin,
    EN: OutputPin,
    T: IntervalTimer,
{
    fn is_bus_idle(&mut self) -> bool {
        let high = self.sense.is_high().unwrap_or(self.sense_inverted);
        high == self.sense_inverted
    }

    fn drive_level(&mut self, dominant: bool) {
        if dominant {
            let _ = self.drive.set_high();
        } else {
            let _ = self.drive.set_low();
        }
    }

    fn set_transmitting(&mut self, on: bool) {
        if self.transmitting == on {
            return;
        }
        self.transmitting = on;
        self.write_enable(on);
        if !on && self.enable.is_none() {
            let _ = self.drive.set_low();
        }
    }

    fn restart_timer(&mut self) {
        self.timer.restart();
    }

    fn read_elapsed(&mut self) -> u16 {
        self.timer.elapsed()
    }
}
