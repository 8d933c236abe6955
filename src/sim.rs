//! Simulated bus for host tests.
//!
//! Time is virtual: every port access advances the clock by one count, so
//! the codec's busy-wait loops make progress exactly as they would against a
//! hardware timer. The line is dominant whenever this node drives it with the
//! output enabled, a scripted remote pulse covers the current instant, or the
//! simulated peer is stretching an acknowledge slot.

use crate::bus::AvcBus;
use crate::frame::Frame;
use crate::gate::EventGate;
use crate::parity::even_parity;
use crate::timer::BitTiming;

/// Upper bound on simulated time; a runaway loop fails the test instead of hanging.
const CLOCK_LIMIT: u32 = 50_000_000;

/// Which acknowledge slots the simulated peer answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Peer {
    /// Nobody acknowledges.
    Silent,
    /// Every slot is acknowledged.
    Everything,
    /// Slots of unicast frames addressed to this address are acknowledged,
    /// up to `slots` per frame.
    Address { address: u16, slots: usize },
}

#[derive(Debug)]
pub(crate) struct SimBus {
    timing: BitTiming,
    now: u32,
    timer_start: u32,
    transmitting: bool,
    level: bool,
    pulse_start: Option<u32>,
    driven: Vec<(u32, u32)>,
    remote: Vec<(u32, u32)>,
    peer: Peer,
    peer_hold_until: u32,
    acked_slots: usize,
}

impl SimBus {
    pub(crate) fn new(timing: BitTiming) -> Self {
        Self {
            timing,
            now: 0,
            timer_start: 0,
            transmitting: false,
            level: false,
            pulse_start: None,
            driven: Vec::new(),
            remote: Vec::new(),
            peer: Peer::Silent,
            peer_hold_until: 0,
            acked_slots: 0,
        }
    }

    pub(crate) fn is_transmitting(&self) -> bool {
        self.transmitting
    }

    /// Pulses this node has driven onto the line, as `(start, end)` instants.
    pub(crate) fn driven(&self) -> &[(u32, u32)] {
        &self.driven
    }

    pub(crate) fn clear_driven(&mut self) {
        self.driven.clear();
    }

    pub(crate) fn set_peer(&mut self, peer: Peer) {
        self.peer = peer;
    }

    pub(crate) fn acknowledge_every_slot(&mut self, on: bool) {
        self.peer = if on { Peer::Everything } else { Peer::Silent };
    }

    /// Schedules `wave` so that it begins `lead` counts from now.
    pub(crate) fn play(&mut self, wave: &Waveform, lead: u32) {
        let base = self.now + lead;
        self.remote
            .extend(wave.pulses.iter().map(|&(start, end)| (base + start, base + end)));
    }

    /// Schedules pulses recorded on another simulated bus, rebased to begin
    /// `lead` counts from now.
    pub(crate) fn replay(&mut self, pulses: &[(u32, u32)], lead: u32) {
        let Some(&(first, _)) = pulses.first() else {
            return;
        };
        let base = self.now + lead;
        self.remote
            .extend(pulses.iter().map(|&(start, end)| (base + start - first, base + end - first)));
    }

    fn step(&mut self) {
        self.now += 1;
        assert!(self.now < CLOCK_LIMIT, "simulated clock ran away");
    }

    fn output(&self) -> bool {
        self.transmitting && self.level
    }

    fn update_output(&mut self, was: bool) {
        let is = self.output();
        if is && !was {
            self.pulse_start = Some(self.now);
        } else if was && !is {
            if let Some(start) = self.pulse_start.take() {
                self.driven.push((start, self.now));
                if classify((start, self.now), &self.timing).is_none() {
                    self.acked_slots = 0;
                }
            }
        }
    }

    fn line_dominant(&self) -> bool {
        self.output()
            || self.now < self.peer_hold_until
            || self
                .remote
                .iter()
                .any(|&(start, end)| start <= self.now && self.now < end)
    }

    /// Called when our pulse is cut by disabling the driver: an acknowledge slot.
    fn ack_slot_opened(&mut self, pulse_start: u32) {
        let bits = current_frame_bits(&self.driven, &self.timing);
        let ack = match self.peer {
            Peer::Silent => false,
            Peer::Everything => true,
            Peer::Address { address, slots } => {
                receiver_of(&bits) == Some(address) && self.acked_slots < slots
            }
        };
        if ack {
            self.acked_slots += 1;
            self.peer_hold_until = pulse_start + u32::from(self.timing.zero_driven);
        }
    }
}

impl AvcBus for SimBus {
    fn is_bus_idle(&mut self) -> bool {
        let idle = !self.line_dominant();
        self.step();
        idle
    }

    fn drive_level(&mut self, dominant: bool) {
        let was = self.output();
        self.level = dominant;
        self.update_output(was);
        self.step();
    }

    fn set_transmitting(&mut self, on: bool) {
        let was = self.output();
        let start = self.pulse_start;
        self.transmitting = on;
        self.update_output(was);
        if was && !on {
            if let Some(start) = start {
                self.ack_slot_opened(start);
            }
        }
        self.step();
    }

    fn restart_timer(&mut self) {
        self.timer_start = self.now;
        self.step();
    }

    fn read_elapsed(&mut self) -> u16 {
        let elapsed = u16::try_from(self.now - self.timer_start).unwrap_or(u16::MAX);
        self.step();
        elapsed
    }
}

/// Classifies pulses as bits: `Some(true)` for a `1`, `Some(false)` for a
/// `0`, `None` for a start bit.
fn classify(pulse: (u32, u32), timing: &BitTiming) -> Option<bool> {
    let width = pulse.1 - pulse.0;
    if width > u32::from(timing.max_bit) {
        None
    } else {
        Some(width < u32::from(timing.threshold))
    }
}

/// Decodes data pulses into bits, skipping start bits.
pub(crate) fn decode_pulses(pulses: &[(u32, u32)], timing: &BitTiming) -> Vec<bool> {
    pulses.iter().filter_map(|&p| classify(p, timing)).collect()
}

/// Bits of the frame currently being driven: everything after the last start bit.
fn current_frame_bits(pulses: &[(u32, u32)], timing: &BitTiming) -> Vec<bool> {
    let from = pulses
        .iter()
        .rposition(|&p| classify(p, timing).is_none())
        .map_or(0, |i| i + 1);
    decode_pulses(&pulses[from..], timing)
}

fn bits_value(bits: &[bool]) -> u16 {
    bits.iter().fold(0, |acc, &bit| (acc << 1) | u16::from(bit))
}

/// Receiver address of a frame once its bits up to the address ACK slot are known.
fn receiver_of(bits: &[bool]) -> Option<u16> {
    // mode, sender(12), parity, receiver(12), parity
    if bits.len() < 27 || !bits[0] {
        return None;
    }
    Some(bits_value(&bits[14..26]))
}

/// Builder for remote pulse trains, in counts relative to the first pulse.
#[derive(Debug, Clone)]
pub(crate) struct Waveform {
    timing: BitTiming,
    cursor: u32,
    pulses: Vec<(u32, u32)>,
}

impl Waveform {
    pub(crate) fn new(timing: BitTiming) -> Self {
        Self {
            timing,
            cursor: 0,
            pulses: Vec::new(),
        }
    }

    /// A dominant pulse of `driven` counts in a slot of `total` counts.
    pub(crate) fn pulse(mut self, driven: u16, total: u16) -> Self {
        self.pulses
            .push((self.cursor, self.cursor + u32::from(driven)));
        self.cursor += u32::from(total);
        self
    }

    pub(crate) fn start_bit(self) -> Self {
        let t = self.timing;
        self.pulse(t.start_driven, t.start_period())
    }

    pub(crate) fn bit(self, bit: bool) -> Self {
        let t = self.timing;
        if bit {
            self.pulse(t.one_driven, t.one_period())
        } else {
            self.pulse(t.zero_driven, t.zero_period())
        }
    }

    fn bits(mut self, value: u16, bits: u8) -> Self {
        for shift in (0..bits).rev() {
            self = self.bit((value >> shift) & 1 == 1);
        }
        self
    }

    /// Field followed by its correct parity bit.
    pub(crate) fn field(self, value: u16, bits: u8) -> Self {
        self.bits(value, bits).bit(even_parity(value, bits))
    }

    /// Field followed by a wrong parity bit.
    pub(crate) fn bad_field(self, value: u16, bits: u8) -> Self {
        self.bits(value, bits).bit(!even_parity(value, bits))
    }

    /// The sender's half of an acknowledge slot.
    pub(crate) fn ack_slot(self) -> Self {
        let t = self.timing;
        self.pulse(t.one_driven, t.bit_period())
    }

    fn slot(self, unicast: bool) -> Self {
        if unicast { self.ack_slot() } else { self }
    }

    /// Header up to and including the receiver address acknowledge slot.
    pub(crate) fn header(self, unicast: bool, sender: u16, receiver: u16) -> Self {
        self.start_bit()
            .bit(unicast)
            .field(sender, 12)
            .field(receiver, 12)
            .slot(unicast)
    }

    /// A complete, well-formed frame as another node would send it.
    pub(crate) fn frame(self, frame: &Frame) -> Self {
        let unicast = !frame.is_broadcast();
        let mut wave = self
            .header(unicast, frame.sender(), frame.receiver())
            .field(u16::from(frame.control()), 4)
            .slot(unicast)
            .field(u16::from(frame.len()), 8)
            .slot(unicast);
        for &byte in frame.payload() {
            wave = wave.field(u16::from(byte), 8).slot(unicast);
        }
        wave
    }
}

/// Records mask depth and how many transactions were masked.
#[derive(Debug, Default)]
pub(crate) struct CountingGate {
    pub depth: i32,
    pub entered: u32,
}

impl EventGate for CountingGate {
    fn mask(&mut self) {
        self.depth += 1;
        self.entered += 1;
    }

    fn unmask(&mut self) {
        self.depth -= 1;
    }
}
