//! Command table and dispatcher.
//!
//! The dispatcher is a pure classifier: it compares a received payload
//! against an ordered table of known patterns and names the action. Building
//! responses and changing device state happen elsewhere.
//!
//! Two pattern sets share the table. Unicast entries only match frames
//! addressed to this device; broadcast entries only match broadcast frames,
//! where several peripherals share the channel and are told apart by payload.
//! Matching is by prefix and the first matching entry wins, so when one
//! pattern is a prefix of another the entry listed first takes priority.

use crate::frame::{AddressingMode, Frame};
use crate::messages::{KnownMessage, inbound};

/// What a received frame asks this device to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Action {
    /// Nothing matched.
    None,
    /// Status request 1.
    Status1,
    /// Status request 2.
    Status2,
    /// Status request 3.
    Status3,
    /// Status request 4.
    Status4,
    /// Play request from the source switch.
    PlayRequest1,
    /// Play request from the head unit.
    PlayRequest2,
    /// Alternate play request from the head unit.
    PlayRequest3,
    /// Stop request.
    StopRequest1,
    /// Alternate stop request.
    StopRequest2,
    /// The head unit selected this device as the source.
    PlayIt,
    /// LAN check carrying a sequence number to echo.
    Check(u8),
    /// LAN register.
    Register,
    /// LAN init / restart.
    Init,
    /// The head unit switched to another audio source.
    SourceInUse(Source),
    /// The head unit reports no source in use.
    NoSourceInUse,
    /// Toggle the auxiliary function (eject on an empty built-in CD player).
    ToggleFunction,
    /// Turn the auxiliary function on.
    EnableFunction,
    /// Turn the auxiliary function off.
    DisableFunction,
}

/// Audio sources the head unit announces when switching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Source {
    /// Nothing selected.
    #[default]
    None,
    /// This changer ("play it").
    Changer,
    /// The AUX input.
    Aux,
    /// The tuner.
    Tuner,
    /// The tape deck.
    Tape,
    /// The built-in CD player.
    Cd,
}

/// One row of the command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    /// Pattern and the addressing mode it is valid for.
    pub message: KnownMessage,
    /// Action reported on a match.
    pub action: Action,
}

impl CommandEntry {
    const fn new(message: KnownMessage, action: Action) -> Self {
        Self { message, action }
    }

    /// `true` if `frame` hits this entry for a device at `me`.
    pub fn matches(&self, frame: &Frame, me: u16) -> bool {
        let addressed = match self.message.mode {
            AddressingMode::Unicast => frame.is_unicast_to(me),
            AddressingMode::Broadcast => frame.is_broadcast(),
        };
        addressed && self.message.is_prefix_of(frame.payload())
    }
}

/// Offset of the sequence number in a LAN check.
const CHECK_SEQUENCE_INDEX: usize = 3;

/// The CD changer command table, in priority order.
pub const COMMANDS: [CommandEntry; 20] = [
    CommandEntry::new(inbound::STATUS_1, Action::Status1),
    CommandEntry::new(inbound::STATUS_2, Action::Status2),
    CommandEntry::new(inbound::STATUS_3, Action::Status3),
    CommandEntry::new(inbound::STATUS_4, Action::Status4),
    CommandEntry::new(inbound::PLAY_REQUEST_1, Action::PlayRequest1),
    CommandEntry::new(inbound::PLAY_REQUEST_2, Action::PlayRequest2),
    CommandEntry::new(inbound::PLAY_REQUEST_3, Action::PlayRequest3),
    CommandEntry::new(inbound::STOP_REQUEST_1, Action::StopRequest1),
    CommandEntry::new(inbound::STOP_REQUEST_2, Action::StopRequest2),
    CommandEntry::new(inbound::PLAY_IT, Action::PlayIt),
    CommandEntry::new(inbound::LAN_CHECK, Action::Check(0)),
    CommandEntry::new(inbound::LAN_REGISTER, Action::Register),
    CommandEntry::new(inbound::LAN_INIT, Action::Init),
    CommandEntry::new(inbound::LAN_STATUS, Action::Status1),
    CommandEntry::new(inbound::AUX_IN_USE, Action::SourceInUse(Source::Aux)),
    CommandEntry::new(inbound::TUNER_IN_USE, Action::SourceInUse(Source::Tuner)),
    CommandEntry::new(inbound::TAPE_IN_USE, Action::SourceInUse(Source::Tape)),
    CommandEntry::new(inbound::CD_IN_USE, Action::SourceInUse(Source::Cd)),
    CommandEntry::new(inbound::NO_SOURCE_IN_USE, Action::NoSourceInUse),
    CommandEntry::new(inbound::EJECT_CD, Action::ToggleFunction),
];

/// Classifies `frame` against [`COMMANDS`] for a device at `me`.
pub fn dispatch(frame: &Frame, me: u16) -> Action {
    dispatch_in(&COMMANDS, frame, me)
}

/// Classifies `frame` against `table`; the first matching entry wins.
pub fn dispatch_in(table: &[CommandEntry], frame: &Frame, me: u16) -> Action {
    match table.iter().find(|entry| entry.matches(frame, me)) {
        Some(entry) => match entry.action {
            Action::Check(_) => Action::Check(
                frame
                    .payload()
                    .get(CHECK_SEQUENCE_INDEX)
                    .copied()
                    .unwrap_or(0),
            ),
            action => action,
        },
        None => Action::None,
    }
}
