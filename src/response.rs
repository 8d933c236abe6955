//! Response generation and the pending response queue.
//!
//! Deciding to answer and driving the bus are decoupled: responses are built
//! from templates into frames and pushed onto a [`ResponseQueue`], which the
//! run loop drains whenever the bus is idle.

use crate::bus::AvcBus;
use crate::commands::Action;
use crate::consts::MAX_RESPONSE_BURST;
use crate::device::DeviceState;
use crate::error::SendError;
use crate::frame::Frame;
use crate::gate::EventGate;
use crate::messages::{KnownMessage, outbound};
use crate::transport::Transport;
use heapless::{Deque, Vec};

/// Frames produced in reaction to one action.
pub type Burst = Vec<Frame, MAX_RESPONSE_BURST>;

/// Builds response frames from templates and device state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Responder {
    /// This device's address, the sender of every response.
    pub address: u16,
    /// Receiver of unicast responses.
    pub head_unit: u16,
}

impl Responder {
    /// Instantiates `message` without patching.
    pub fn frame(&self, message: &KnownMessage) -> Option<Frame> {
        message.to_frame(self.address, self.head_unit).ok()
    }

    fn position(&self, message: &KnownMessage, state: &DeviceState) -> Option<Frame> {
        let mut frame = self.frame(message)?;
        frame.patch(outbound::DISC_OFFSET, state.disc);
        frame.patch(outbound::TRACK_OFFSET, state.track);
        frame.patch(outbound::MINUTES_OFFSET, state.minutes);
        frame.patch(outbound::SECONDS_OFFSET, state.seconds);
        Some(frame)
    }

    /// The periodic playback status frame.
    pub fn status(&self, state: &DeviceState) -> Option<Frame> {
        let mut frame = self.position(&outbound::STATUS, state)?;
        frame.patch(outbound::STATE_OFFSET, state.disc_state.code());
        frame.patch(outbound::FLAGS_OFFSET, state.flags.bits());
        Some(frame)
    }

    /// The frames answering `action`, given the state before the action
    /// is applied.
    pub fn respond(&self, action: Action, state: &DeviceState) -> Burst {
        let mut burst = Burst::new();
        let action = match action {
            Action::ToggleFunction => match state.function_toggle() {
                Some(resolved) => resolved,
                None => return burst,
            },
            action => action,
        };
        let mut add = |frame: Option<Frame>| {
            if let Some(frame) = frame {
                let _ = burst.push(frame);
            }
        };
        match action {
            Action::None => {}
            Action::Status1 => add(self.frame(&outbound::STATUS_1)),
            Action::Status2 => add(self.frame(&outbound::STATUS_2)),
            Action::Status3 => add(self.frame(&outbound::STATUS_3)),
            Action::Status4 => add(self.frame(&outbound::STATUS_4)),
            Action::Register => add(self.frame(&outbound::REGISTER)),
            Action::Init => {
                for message in &outbound::INIT_BURST {
                    add(self.frame(message));
                }
            }
            Action::Check(sequence) => add(self.frame(&outbound::CHECK).map(|mut frame| {
                frame.patch(outbound::CHECK_SEQUENCE, sequence);
                frame.patch(outbound::CHECK_COUNTER, state.check_count);
                frame
            })),
            Action::PlayRequest1 => add(self.frame(&outbound::PLAY_OK_1)),
            Action::PlayRequest2 | Action::PlayRequest3 => {
                add(self.frame(&outbound::PLAY_OK_2));
                add(self.frame(&outbound::PLAY_OK_3));
            }
            Action::PlayIt => add(self.position(&outbound::PLAY_OK_4, state)),
            Action::StopRequest1 | Action::StopRequest2 => {
                add(self.frame(&outbound::STOP_1));
                add(self.position(&outbound::STOP_2, state));
            }
            Action::EnableFunction => add(self.frame(&outbound::ENABLE_FUNCTION)),
            Action::DisableFunction => add(self.frame(&outbound::DISABLE_FUNCTION)),
            Action::SourceInUse(_) | Action::NoSourceInUse | Action::ToggleFunction => {}
        }
        burst
    }
}

/// What one [`ResponseQueue::drain`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum DrainOutcome {
    /// Nothing was queued.
    Empty,
    /// The head frame was sent and removed.
    Sent,
    /// The bus was busy; the head frame stays queued.
    Busy,
    /// The head frame failed its last attempt and was discarded.
    Dropped(SendError),
}

#[derive(Debug, Clone)]
struct Pending {
    frame: Frame,
    attempts: u8,
}

/// Fixed-capacity FIFO of frames awaiting transmission.
///
/// `N` must be a power of two. When full, new frames are refused (the
/// newest response is the one lost) and queued frames keep their order.
#[derive(Debug)]
pub struct ResponseQueue<const N: usize> {
    entries: Deque<Pending, N>,
}

impl<const N: usize> ResponseQueue<N> {
    /// An empty queue.
    pub const fn new() -> Self {
        const { assert!(N.is_power_of_two(), "queue capacity must be a power of two") };
        Self {
            entries: Deque::new(),
        }
    }

    /// Appends `frame`.
    ///
    /// # Errors
    /// Hands `frame` back if the queue is full.
    pub fn push(&mut self, frame: Frame) -> Result<(), Frame> {
        self.entries
            .push_back(Pending { frame, attempts: 0 })
            .map_err(|pending| {
                warn!("response queue full, dropping frame to {:#x}", pending.frame.receiver());
                pending.frame
            })
    }

    /// Number of queued frames.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `true` if the next push would be refused.
    pub fn is_full(&self) -> bool {
        self.entries.is_full()
    }

    /// Maximum number of queued frames.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Queued frames, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.entries.iter().map(|pending| &pending.frame)
    }

    /// Discards everything queued.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Tries to send the head frame, up to `max_attempts` times in total.
    ///
    /// A busy bus ends the attempt without consuming one; the frame stays at
    /// the head for the next drain. A frame whose attempts are exhausted is
    /// removed and reported as [`DrainOutcome::Dropped`], so the next drain
    /// moves on to the following frame.
    pub fn drain<B: AvcBus, G: EventGate>(
        &mut self,
        transport: &mut Transport<B, G>,
        max_attempts: u8,
    ) -> DrainOutcome {
        let Some(head) = self.entries.front_mut() else {
            return DrainOutcome::Empty;
        };
        loop {
            match transport.send_frame(&head.frame) {
                Ok(()) => {
                    let _ = self.entries.pop_front();
                    return DrainOutcome::Sent;
                }
                Err(nb::Error::WouldBlock) => return DrainOutcome::Busy,
                Err(nb::Error::Other(error)) => {
                    head.attempts = head.attempts.saturating_add(1);
                    if head.attempts >= max_attempts {
                        warn!("dropping response after {} attempts: {}", head.attempts, error);
                        let _ = self.entries.pop_front();
                        return DrainOutcome::Dropped(error);
                    }
                }
            }
        }
    }
}

impl<const N: usize> Default for ResponseQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{BROADCAST_ADDRESS, CD_CHANGER_ADDRESS, HEAD_UNIT_ADDRESS};
    use crate::commands::Source;
    use crate::error::FrameField;
    use crate::frame::AddressingMode;
    use crate::sim::{CountingGate, Peer, SimBus, Waveform};
    use crate::timer::BitTiming;

    const RESPONDER: Responder = Responder {
        address: CD_CHANGER_ADDRESS,
        head_unit: HEAD_UNIT_ADDRESS,
    };

    fn numbered(n: u8) -> Frame {
        Frame::new(AddressingMode::Broadcast, CD_CHANGER_ADDRESS, BROADCAST_ADDRESS, &[n]).unwrap()
    }

    fn transport() -> Transport<SimBus, CountingGate> {
        let timing = BitTiming::AVR_8MHZ;
        Transport::new(SimBus::new(timing), CountingGate::default(), CD_CHANGER_ADDRESS, timing)
    }

    #[test]
    fn test_overflow_drops_newest_and_keeps_order() {
        let mut queue: ResponseQueue<4> = ResponseQueue::new();
        for n in 0..4 {
            assert!(queue.push(numbered(n)).is_ok());
        }
        assert!(queue.is_full());
        assert_eq!(queue.push(numbered(4)), Err(numbered(4)));
        let order: std::vec::Vec<u8> = queue.iter().map(|f| f.payload()[0]).collect();
        assert_eq!(order, [0, 1, 2, 3]);
    }

    #[test]
    fn test_capacity_is_the_const_parameter() {
        let queue: ResponseQueue<16> = ResponseQueue::default();
        assert_eq!(queue.capacity(), 16);
        assert!(!ResponseQueue::<2>::new().is_full());
    }

    #[test]
    fn test_drain_sends_in_order() {
        let mut queue: ResponseQueue<4> = ResponseQueue::new();
        let mut transport = transport();
        assert_eq!(queue.drain(&mut transport, 3), DrainOutcome::Empty);
        let _ = queue.push(numbered(1));
        let _ = queue.push(numbered(2));
        assert_eq!(queue.drain(&mut transport, 3), DrainOutcome::Sent);
        assert_eq!(queue.iter().next(), Some(&numbered(2)));
        assert_eq!(queue.drain(&mut transport, 3), DrainOutcome::Sent);
        assert!(queue.is_empty());
        assert_eq!(transport.stats.tx_good, 2);
    }

    #[test]
    fn test_busy_bus_keeps_frame_queued() {
        let mut queue: ResponseQueue<4> = ResponseQueue::new();
        let mut transport = transport();
        let _ = queue.push(numbered(1));
        transport
            .codec_mut()
            .bus_mut()
            .play(&Waveform::new(BitTiming::AVR_8MHZ).start_bit(), 0);
        assert_eq!(queue.drain(&mut transport, 3), DrainOutcome::Busy);
        assert_eq!(queue.len(), 1);
        assert!(transport.codec().bus().driven().is_empty());
    }

    #[test]
    fn test_unacknowledged_frame_dropped_after_three_attempts() {
        let mut queue: ResponseQueue<4> = ResponseQueue::new();
        let mut transport = transport();
        transport.codec_mut().bus_mut().set_peer(Peer::Silent);
        let _ = queue.push(RESPONDER.frame(&outbound::BEEP).unwrap());
        let _ = queue.push(numbered(7));
        assert_eq!(
            queue.drain(&mut transport, 3),
            DrainOutcome::Dropped(SendError::NoAck(FrameField::ReceiverAddress))
        );
        assert_eq!(transport.stats.tx_nak, 3);
        assert_eq!(queue.drain(&mut transport, 3), DrainOutcome::Sent);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_stop_patches_position() {
        let mut state = DeviceState::default();
        state.track = 0x04;
        state.minutes = 0x02;
        state.seconds = 0x31;
        let burst = RESPONDER.respond(Action::StopRequest1, &state);
        assert_eq!(burst.len(), 2);
        assert_eq!(burst[0].payload(), outbound::STOP_1.data);
        assert_eq!(burst[0].receiver(), HEAD_UNIT_ADDRESS);
        assert_eq!(
            burst[1].payload(),
            &[0x63, 0x31, 0xF1, 0x00, 0x30, 0x01, 0x04, 0x02, 0x31, 0x00, 0x80]
        );
        assert!(burst[1].is_broadcast());
    }

    #[test]
    fn test_status_patches_state_and_flags() {
        let mut state = DeviceState::default();
        state.disc = 3;
        state.seconds = 0x12;
        state.flags = crate::device::PlayFlags::RANDOM;
        let status = RESPONDER.status(&state).unwrap();
        assert_eq!(status.mode(), AddressingMode::Unicast);
        assert_eq!(status.receiver(), HEAD_UNIT_ADDRESS);
        assert_eq!(status.sender(), CD_CHANGER_ADDRESS);
        assert_eq!(
            status.payload(),
            &[0x63, 0x31, 0xF1, 0x01, 0x10, 0x03, 0x01, 0x00, 0x12, 0x04, 0x80]
        );
    }

    #[test]
    fn test_check_echoes_sequence_and_count() {
        let mut state = DeviceState::default();
        state.check_count = 2;
        let burst = RESPONDER.respond(Action::Check(0x41), &state);
        assert_eq!(burst[0].payload(), &[0x00, 0x01, 0x11, 0x30, 0x41, 0x02]);
    }

    #[test]
    fn test_function_toggle_answers_follow_state() {
        let mut state = DeviceState::default();
        let burst = RESPONDER.respond(Action::ToggleFunction, &state);
        assert_eq!(burst.len(), 1);
        assert_eq!(burst[0].payload(), &[0x00, 0x01, 0x11, 0x50, 0x61]);
        assert_eq!(burst[0].receiver(), HEAD_UNIT_ADDRESS);

        state.function_enabled = true;
        let burst = RESPONDER.respond(Action::ToggleFunction, &state);
        assert_eq!(burst[0].payload(), &[0x00, 0x01, 0x11, 0x51, 0x61]);

        state.source = Source::Cd;
        assert!(RESPONDER.respond(Action::ToggleFunction, &state).is_empty());
        assert!(
            RESPONDER
                .respond(Action::SourceInUse(Source::Tuner), &state)
                .is_empty()
        );
    }

    #[test]
    fn test_burst_shapes() {
        let state = DeviceState::default();
        assert_eq!(RESPONDER.respond(Action::Init, &state).len(), 10);
        assert_eq!(RESPONDER.respond(Action::PlayRequest3, &state).len(), 2);
        assert_eq!(RESPONDER.respond(Action::PlayIt, &state).len(), 1);
        assert!(RESPONDER.respond(Action::None, &state).is_empty());
        assert_eq!(
            RESPONDER.respond(Action::Status4, &state)[0].payload(),
            &[0x00, 0x01, 0x00, 0x1C, 0x00]
        );
    }
}
