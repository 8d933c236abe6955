//! Bit timing profile and tick delivery for the AVC-LAN driver.
//!
//! The bus has no hardware UART support: every bit is a pulse whose driven
//! duration encodes its value. All durations here are expressed in counts of
//! the free-running interval timer behind [`AvcBus`](crate::bus::AvcBus), so
//! the profile depends on the controller clock and timer prescaler.
//!
//! ```text
//!                    |<---- Bit '0' ---->|<---- Bit '1' ---->|
//!   Driven           ,---------------,   ,---------,         ,-------
//!                    ^               |   ^         |         ^
//!   Floating   -----'               '---'         '---------'-------- idle
//!                    |---- 34 us ----|5.5|- 20.5 -|-- 19 us -|
//! ```
//!
//! A start bit is driven for ~166 us followed by ~19 us floating. A receiver
//! classifies a bit by comparing the driven duration against a threshold
//! halfway between the two data bit shapes (26 us).
//!
//! Contains:
//! - [`BitTiming`]: the calibrated timing table and its derived limits
//! - [`BitTiming::from_timer_hz`]: runtime table computation for other timer clocks
//! - `TickLatch` and the `init_avclan_clock!()` / `tick_avclan_clock!()` macros
//!   for delivering the 1 Hz play-time tick from an interrupt (feature `timer-isr`)
//!
//! Common timer clocks: (For use with [`BitTiming::from_timer_hz`])
//!
//! | F_CPU  | PRESCALER | Timer clock | Count length |
//! |--------|-----------|-------------|--------------|
//! | 16 MHz |         2 |       8 MHz |       125 ns |
//! | 20 MHz |         2 |      10 MHz |       100 ns |
//! | 20 MHz |         1 |      20 MHz |        50 ns |

use libm::round;

#[cfg(feature = "timer-isr")]
mod isr;
#[cfg(feature = "timer-isr")]
pub use isr::*;

#[cfg(feature = "timer-isr")]
mod macros;

/// Nominal driven duration of a start bit, in microseconds.
pub const START_DRIVEN_US: f64 = 166.0;
/// Nominal floating duration after a start bit, in microseconds.
pub const START_FLOATING_US: f64 = 19.0;
/// Nominal driven duration of a bit `1`, in microseconds.
pub const ONE_DRIVEN_US: f64 = 20.5;
/// Nominal floating duration of a bit `1`, in microseconds.
pub const ONE_FLOATING_US: f64 = 19.0;
/// Nominal driven duration of a bit `0`, in microseconds.
pub const ZERO_DRIVEN_US: f64 = 34.0;
/// Nominal floating duration of a bit `0`, in microseconds.
pub const ZERO_FLOATING_US: f64 = 5.5;
/// Driven duration separating a `1` (shorter) from a `0` (longer), in microseconds.
pub const THRESHOLD_US: f64 = 26.0;
/// Longest admissible data bit, in microseconds.
pub const MAX_BIT_US: f64 = 40.0;

/// Pulse durations of every bit shape, in interval-timer counts.
///
/// Invariant: `zero_driven > threshold > one_driven`, and the start bit is far
/// longer than either data bit, so a receiver can always disambiguate a pulse
/// from its driven duration alone. See [`BitTiming::is_consistent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct BitTiming {
    /// Driven phase of the start bit.
    pub start_driven: u16,
    /// Floating phase following the start bit.
    pub start_floating: u16,
    /// Driven phase of a bit `1` (also the sender's half of an acknowledge slot).
    pub one_driven: u16,
    /// Floating phase of a bit `1`.
    pub one_floating: u16,
    /// Driven phase of a bit `0` (also how long an acknowledging receiver holds the line).
    pub zero_driven: u16,
    /// Floating phase of a bit `0`.
    pub zero_floating: u16,
    /// Driven durations below this value read as `1`, at or above as `0`.
    pub threshold: u16,
    /// Longest admissible data bit; waits beyond twice this value are a desynchronization.
    pub max_bit: u16,
}

impl BitTiming {
    /// The calibrated table for an 8 MHz interval timer (16 MHz core clock,
    /// timer prescaler 2, 125 ns per count).
    pub const AVR_8MHZ: Self = Self {
        start_driven: 1328,
        start_floating: 152,
        one_driven: 164,
        one_floating: 152,
        zero_driven: 272,
        zero_floating: 44,
        threshold: 208,
        max_bit: 320,
    };

    /// Computes the timing table for an interval timer running at `timer_hz`.
    ///
    /// # Arguments
    /// - `timer_hz`: the rate at which the interval timer counts, in Hz
    ///
    /// # Returns
    /// - The nominal durations rounded to the nearest count
    pub fn from_timer_hz(timer_hz: u32) -> Self {
        let counts = |us: f64| -> u16 { round(us * timer_hz as f64 / 1_000_000.0) as u16 };
        Self {
            start_driven: counts(START_DRIVEN_US),
            start_floating: counts(START_FLOATING_US),
            one_driven: counts(ONE_DRIVEN_US),
            one_floating: counts(ONE_FLOATING_US),
            zero_driven: counts(ZERO_DRIVEN_US),
            zero_floating: counts(ZERO_FLOATING_US),
            threshold: counts(THRESHOLD_US),
            max_bit: counts(MAX_BIT_US),
        }
    }

    /// Total length of a bit `1`.
    pub const fn one_period(&self) -> u16 {
        self.one_driven + self.one_floating
    }

    /// Total length of a bit `0`.
    pub const fn zero_period(&self) -> u16 {
        self.zero_driven + self.zero_floating
    }

    /// Nominal bit period, the longer of the two data bit shapes.
    ///
    /// This is also the window the bus must stay idle before it is considered free.
    pub const fn bit_period(&self) -> u16 {
        let one = self.one_period();
        let zero = self.zero_period();
        if one > zero { one } else { zero }
    }

    /// Total length of a start bit.
    pub const fn start_period(&self) -> u16 {
        self.start_driven + self.start_floating
    }

    /// Shortest driven duration still accepted as a start bit.
    pub const fn start_min(&self) -> u16 {
        self.start_driven - self.start_driven / 4
    }

    /// Longest driven duration still accepted as a start bit.
    pub const fn start_max(&self) -> u16 {
        self.start_driven + self.start_driven / 8
    }

    /// How long any single wait for a line transition may last before the
    /// line is considered desynchronized.
    pub const fn desync_bound(&self) -> u16 {
        self.max_bit.saturating_mul(2)
    }

    /// Checks the ordering invariants the receiver relies on.
    pub const fn is_consistent(&self) -> bool {
        self.zero_driven > self.threshold
            && self.threshold > self.one_driven
            && self.start_driven > self.zero_driven * 2
            && self.bit_period() <= self.max_bit
    }
}

impl Default for BitTiming {
    fn default() -> Self {
        Self::AVR_8MHZ
    }
}
