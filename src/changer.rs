//! The CD changer run loop.
//!
//! [`Changer`] ties the layers together: each [`poll`](Changer::poll) either
//! receives a frame (the bus is busy), classifies it, updates the device state
//! and queues the responses, or (the bus is idle) queues an owed status frame
//! and offers the head of the response queue to the bus.
//!
//! ## Example
//!
//! ```rust,ignore
//! use avclan::changer::{Changer, ChangerConfig};
//! use avclan::timer::CriticalSectionGate;
//!
//! avclan::init_avclan_clock!();
//!
//! let bus = avclan::bus::PinBus::new(drive, sense, Some(enable), timer, None, None);
//! let mut changer: Changer<_, _> =
//!     Changer::new(bus, CriticalSectionGate::new(), ChangerConfig::default());
//! changer.register();
//! loop {
//!     let _ = changer.poll_with(&AVCLAN_CLOCK);
//! }
//! ```

use crate::bus::AvcBus;
use crate::commands::{Action, dispatch};
use crate::consts::{CD_CHANGER_ADDRESS, HEAD_UNIT_ADDRESS, MAX_SEND_ATTEMPTS, RESPONSE_QUEUE_LEN};
use crate::device::DeviceState;
use crate::error::ReadError;
use crate::frame::Frame;
use crate::gate::EventGate;
use crate::messages::outbound;
use crate::response::{DrainOutcome, Responder, ResponseQueue};
use crate::timer::BitTiming;
use crate::transport::{LinkStats, Transport};

#[cfg(feature = "timer-isr")]
use crate::timer::TickLatch;

/// Identity and link settings of the emulated changer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct ChangerConfig {
    /// This device's bus address.
    pub address: u16,
    /// The head unit's bus address, receiver of unicast responses.
    pub head_unit: u16,
    /// Bit timing for the bus port's interval timer.
    pub timing: BitTiming,
    /// Send attempts per queued response before it is dropped.
    pub max_send_attempts: u8,
}

impl Default for ChangerConfig {
    fn default() -> Self {
        Self {
            address: CD_CHANGER_ADDRESS,
            head_unit: HEAD_UNIT_ADDRESS,
            timing: BitTiming::AVR_8MHZ,
            max_send_attempts: MAX_SEND_ATTEMPTS,
        }
    }
}

/// What one [`Changer::poll`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum PollEvent {
    /// Bus idle and nothing to send.
    Idle,
    /// A frame was received and classified (possibly as [`Action::None`]).
    Received(Frame, Action),
    /// A frame read was aborted.
    ReadFailed(ReadError),
    /// The response queue was offered to the bus.
    Drained(DrainOutcome),
}

/// Emulates a CD changer on the AVC-LAN.
#[derive(Debug)]
pub struct Changer<B: AvcBus, G: EventGate, const Q: usize = RESPONSE_QUEUE_LEN> {
    transport: Transport<B, G>,
    responder: Responder,
    state: DeviceState,
    queue: ResponseQueue<Q>,
    max_send_attempts: u8,
}

impl<B: AvcBus, G: EventGate, const Q: usize> Changer<B, G, Q> {
    /// Creates the emulator over `bus`.
    pub fn new(bus: B, gate: G, config: ChangerConfig) -> Self {
        Self {
            transport: Transport::new(bus, gate, config.address, config.timing),
            responder: Responder {
                address: config.address,
                head_unit: config.head_unit,
            },
            state: DeviceState::default(),
            queue: ResponseQueue::new(),
            max_send_attempts: config.max_send_attempts,
        }
    }

    /// One iteration of the run loop.
    pub fn poll(&mut self) -> PollEvent {
        if !self.transport.is_bus_idle() {
            return match self.transport.read_frame() {
                Ok(frame) => {
                    let action = dispatch(&frame, self.transport.address());
                    self.handle(action);
                    PollEvent::Received(frame, action)
                }
                Err(error) => PollEvent::ReadFailed(error),
            };
        }
        if self.state.take_status_pending() {
            if let Some(status) = self.responder.status(&self.state) {
                self.enqueue(status);
            }
        }
        match self.drain() {
            DrainOutcome::Empty => PollEvent::Idle,
            outcome => PollEvent::Drained(outcome),
        }
    }

    /// Applies the ticks pended on `clock`, then polls.
    #[cfg(feature = "timer-isr")]
    pub fn poll_with(&mut self, clock: &TickLatch) -> PollEvent {
        for _ in 0..clock.take() {
            self.tick();
        }
        self.poll()
    }

    /// Advances the play-time clock by one second.
    pub fn tick(&mut self) {
        self.state.tick();
    }

    /// Answers `action` and updates the device state.
    ///
    /// Responses are built from the state as it was before the action.
    pub fn handle(&mut self, action: Action) {
        let burst = self.responder.respond(action, &self.state);
        let _ = self.state.apply(action);
        if action != Action::None {
            debug!("command {:?}, {} responses", action, burst.len());
        }
        for frame in burst {
            self.enqueue(frame);
        }
    }

    /// Announces the changer: a register frame followed by the init burst.
    pub fn register(&mut self) {
        info!("registering with head unit {:#x}", self.responder.head_unit);
        if let Some(frame) = self.responder.frame(&outbound::REGISTER) {
            self.enqueue(frame);
        }
        self.handle(Action::Init);
    }

    /// Makes the head unit beep.
    pub fn beep(&mut self) {
        if let Some(frame) = self.responder.frame(&outbound::BEEP) {
            self.enqueue(frame);
        }
    }

    /// Switches the auxiliary function on at the head unit.
    pub fn enable_function(&mut self) {
        self.handle(Action::EnableFunction);
    }

    /// Switches the auxiliary function off at the head unit.
    pub fn disable_function(&mut self) {
        self.handle(Action::DisableFunction);
    }

    /// Jumps to `track` and restarts its play time; the next idle poll
    /// reports the new position.
    pub fn select_track(&mut self, track: u8) {
        self.state.select_track(track);
    }

    /// Queues an arbitrary frame. Counted as dropped if the queue is full.
    pub fn enqueue(&mut self, frame: Frame) {
        if self.queue.push(frame).is_err() {
            self.transport.stats.dropped = self.transport.stats.dropped.wrapping_add(1);
        }
    }

    fn drain(&mut self) -> DrainOutcome {
        let outcome = self.queue.drain(&mut self.transport, self.max_send_attempts);
        if let DrainOutcome::Dropped(_) = outcome {
            self.transport.stats.dropped = self.transport.stats.dropped.wrapping_add(1);
        }
        outcome
    }

    /// The emulated device state.
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Mutable access to the device state, e.g. to change track or flags.
    pub fn state_mut(&mut self) -> &mut DeviceState {
        &mut self.state
    }

    /// Responses waiting for the bus.
    pub fn queue(&self) -> &ResponseQueue<Q> {
        &self.queue
    }

    /// Link counters.
    pub fn stats(&self) -> LinkStats {
        self.transport.stats
    }

    /// The frame transport.
    pub fn transport(&self) -> &Transport<B, G> {
        &self.transport
    }

    /// Exclusive access to the frame transport.
    pub fn transport_mut(&mut self) -> &mut Transport<B, G> {
        &mut self.transport
    }
}
