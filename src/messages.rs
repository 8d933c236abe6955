//! Known messages of the CD changer emulation.
//!
//! A [`KnownMessage`] is an addressing mode plus a fixed byte pattern. Inbound
//! patterns are matched against received payloads by the command table;
//! outbound ones are response templates, copied into a [`Frame`] and patched
//! with live device state at fixed offsets before sending.
//!
//! Byte `0x11` inside the patterns is the head unit's switch id and `0x63`
//! the changer's logical id.

use crate::consts::BROADCAST_ADDRESS;
use crate::error::FrameError;
use crate::frame::{AddressingMode, Frame};

/// An immutable `(mode, pattern)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownMessage {
    /// Addressing mode the message travels with.
    pub mode: AddressingMode,
    /// The payload bytes.
    pub data: &'static [u8],
}

impl KnownMessage {
    const fn unicast(data: &'static [u8]) -> Self {
        Self {
            mode: AddressingMode::Unicast,
            data,
        }
    }

    const fn broadcast(data: &'static [u8]) -> Self {
        Self {
            mode: AddressingMode::Broadcast,
            data,
        }
    }

    /// Length of the pattern in bytes.
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// `true` for an empty pattern.
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `true` if `payload` starts with this pattern.
    pub fn is_prefix_of(&self, payload: &[u8]) -> bool {
        payload.starts_with(self.data)
    }

    /// Instantiates the template as a frame from `sender`.
    ///
    /// Unicast templates go to `peer`; broadcast templates go to the
    /// all-devices address.
    pub fn to_frame(&self, sender: u16, peer: u16) -> Result<Frame, FrameError> {
        let receiver = match self.mode {
            AddressingMode::Unicast => peer,
            AddressingMode::Broadcast => BROADCAST_ADDRESS,
        };
        Frame::new(self.mode, sender, receiver, self.data)
    }
}

/// Inbound patterns, unicast to this device.
pub mod inbound {
    use super::KnownMessage;

    /// Status request 1.
    pub const STATUS_1: KnownMessage = KnownMessage::unicast(&[0x00, 0x00, 0x01, 0x0A]);
    /// Status request 2.
    pub const STATUS_2: KnownMessage = KnownMessage::unicast(&[0x00, 0x00, 0x01, 0x08]);
    /// Status request 3.
    pub const STATUS_3: KnownMessage = KnownMessage::unicast(&[0x00, 0x00, 0x01, 0x0D]);
    /// Status request 4.
    pub const STATUS_4: KnownMessage = KnownMessage::unicast(&[0x00, 0x00, 0x01, 0x0C]);
    /// Play request from the source-select switch.
    pub const PLAY_REQUEST_1: KnownMessage = KnownMessage::unicast(&[0x00, 0x25, 0x63, 0x80]);
    /// Play request from the head unit.
    pub const PLAY_REQUEST_2: KnownMessage =
        KnownMessage::unicast(&[0x00, 0x11, 0x63, 0x42, 0x01, 0x00]);
    /// Alternate play request from the head unit.
    pub const PLAY_REQUEST_3: KnownMessage =
        KnownMessage::unicast(&[0x00, 0x11, 0x63, 0x42, 0x41]);
    /// Stop request.
    pub const STOP_REQUEST_1: KnownMessage =
        KnownMessage::unicast(&[0x00, 0x11, 0x63, 0x43, 0x01]);
    /// Alternate stop request.
    pub const STOP_REQUEST_2: KnownMessage =
        KnownMessage::unicast(&[0x00, 0x11, 0x63, 0x43, 0x41]);

    /// "Play it": the head unit selects the changer as source.
    pub const PLAY_IT: KnownMessage = KnownMessage::broadcast(&[0x11, 0x01, 0x45, 0x63]);
    /// LAN check; byte 3 carries a sequence number to echo.
    pub const LAN_CHECK: KnownMessage = KnownMessage::broadcast(&[0x11, 0x01, 0x20]);
    /// LAN register.
    pub const LAN_REGISTER: KnownMessage = KnownMessage::broadcast(&[0x11, 0x01, 0x00]);
    /// LAN init / restart.
    pub const LAN_INIT: KnownMessage = KnownMessage::broadcast(&[0x11, 0x01, 0x01]);
    /// LAN-wide status request.
    pub const LAN_STATUS: KnownMessage = KnownMessage::broadcast(&[0x00, 0x01, 0x0A]);

    /// The head unit switched to the AUX input.
    pub const AUX_IN_USE: KnownMessage = KnownMessage::broadcast(&[0x11, 0x01, 0x45, 0x01]);
    /// The head unit switched to the tuner.
    pub const TUNER_IN_USE: KnownMessage = KnownMessage::broadcast(&[0x11, 0x01, 0x45, 0x60]);
    /// The head unit switched to the tape deck.
    pub const TAPE_IN_USE: KnownMessage = KnownMessage::broadcast(&[0x11, 0x01, 0x45, 0x61]);
    /// The head unit switched to the built-in CD player.
    pub const CD_IN_USE: KnownMessage = KnownMessage::broadcast(&[0x11, 0x01, 0x45, 0x62]);
    /// No source selected (audio off).
    pub const NO_SOURCE_IN_USE: KnownMessage = KnownMessage::broadcast(&[0x11, 0x01, 0x46]);
    /// Eject pressed on the built-in CD player with no disc loaded; used as
    /// the function toggle.
    pub const EJECT_CD: KnownMessage = KnownMessage::broadcast(&[
        0x62, 0x31, 0xF1, 0x00, 0x30, 0x01, 0x01, 0x00, 0x00, 0x00,
    ]);
}

/// Outbound response templates.
pub mod outbound {
    use super::KnownMessage;

    /// Registers the changer with the head unit.
    pub const REGISTER: KnownMessage = KnownMessage::unicast(&[0x00, 0x01, 0x11, 0x10, 0x63]);
    /// Answer to status request 1.
    pub const STATUS_1: KnownMessage = KnownMessage::unicast(&[0x00, 0x01, 0x00, 0x1A]);
    /// Answer to status request 2.
    pub const STATUS_2: KnownMessage = KnownMessage::unicast(&[0x00, 0x01, 0x00, 0x18]);
    /// Answer to status request 3.
    pub const STATUS_3: KnownMessage = KnownMessage::unicast(&[0x00, 0x01, 0x00, 0x1D]);
    /// Answer to status request 4.
    pub const STATUS_4: KnownMessage = KnownMessage::unicast(&[0x00, 0x01, 0x00, 0x1C, 0x00]);
    /// LAN check answer; see [`CHECK_SEQUENCE`] and [`CHECK_COUNTER`].
    pub const CHECK: KnownMessage =
        KnownMessage::unicast(&[0x00, 0x01, 0x11, 0x30, 0x00, 0x00]);
    /// Offset of the echoed check sequence number.
    pub const CHECK_SEQUENCE: usize = 4;
    /// Offset of the running count of check answers.
    pub const CHECK_COUNTER: usize = 5;

    /// Acknowledges play request 1.
    pub const PLAY_OK_1: KnownMessage = KnownMessage::unicast(&[0x00, 0x63, 0x11, 0x50, 0x01]);
    /// Acknowledges play requests 2 and 3.
    pub const PLAY_OK_2: KnownMessage = KnownMessage::unicast(&[0x00, 0x63, 0x11, 0x52, 0x01]);
    /// Announces playback after play requests 2 and 3.
    pub const PLAY_OK_3: KnownMessage = KnownMessage::broadcast(&[
        0x63, 0x31, 0xF1, 0x01, 0x00, 0x01, 0xFF, 0xFF, 0xFF, 0x00, 0x80,
    ]);
    /// Announces playback after "play it"; patched with the position.
    pub const PLAY_OK_4: KnownMessage = KnownMessage::broadcast(&[
        0x63, 0x31, 0xF1, 0x01, 0x28, 0x00, 0x00, 0x00, 0x00, 0x00, 0x80,
    ]);
    /// Acknowledges a stop request.
    pub const STOP_1: KnownMessage = KnownMessage::unicast(&[0x00, 0x63, 0x11, 0x53, 0x01]);
    /// Announces the stop; patched with the position.
    pub const STOP_2: KnownMessage = KnownMessage::broadcast(&[
        0x63, 0x31, 0xF1, 0x00, 0x30, 0x00, 0x00, 0x00, 0x00, 0x00, 0x80,
    ]);
    /// Makes the head unit beep.
    pub const BEEP: KnownMessage = KnownMessage::unicast(&[0x00, 0x63, 0x29, 0x60, 0x02]);
    /// Enables the auxiliary function on the head unit.
    pub const ENABLE_FUNCTION: KnownMessage =
        KnownMessage::unicast(&[0x00, 0x01, 0x11, 0x50, 0x61]);
    /// Disables the auxiliary function on the head unit.
    pub const DISABLE_FUNCTION: KnownMessage =
        KnownMessage::unicast(&[0x00, 0x01, 0x11, 0x51, 0x61]);
    /// Periodic playback status, sent to the head unit; patched with state,
    /// position and flags.
    pub const STATUS: KnownMessage = KnownMessage::unicast(&[
        0x63, 0x31, 0xF1, 0x01, 0x10, 0x01, 0x01, 0x00, 0x00, 0x00, 0x80,
    ]);

    /// Offset of the disc-state byte in [`STATUS`].
    pub const STATE_OFFSET: usize = 4;
    /// Offset of the disc number in [`STATUS`], [`PLAY_OK_4`] and [`STOP_2`].
    pub const DISC_OFFSET: usize = 5;
    /// Offset of the track number.
    pub const TRACK_OFFSET: usize = 6;
    /// Offset of the BCD minutes.
    pub const MINUTES_OFFSET: usize = 7;
    /// Offset of the BCD seconds.
    pub const SECONDS_OFFSET: usize = 8;
    /// Offset of the play flags in [`STATUS`].
    pub const FLAGS_OFFSET: usize = 9;

    /// Broadcast after a LAN init, in order.
    pub const INIT_BURST: [KnownMessage; 10] = [
        KnownMessage::broadcast(&[0x63, 0x31, 0xF1, 0x00, 0x80, 0xFF, 0xFF, 0xFF, 0xFF, 0x00]),
        KnownMessage::broadcast(&[0x63, 0x31, 0xF3, 0x00, 0x3F, 0x00, 0x00, 0x00, 0x00, 0x02]),
        KnownMessage::broadcast(&[0x63, 0x31, 0xF3, 0x00, 0x3F, 0x00, 0x01, 0x00, 0x01, 0x02]),
        KnownMessage::broadcast(&[0x63, 0x31, 0xF3, 0x00, 0x3D, 0x00, 0x01, 0x00, 0x01, 0x02]),
        KnownMessage::broadcast(&[0x63, 0x31, 0xF3, 0x00, 0x39, 0x00, 0x01, 0x00, 0x01, 0x02]),
        KnownMessage::broadcast(&[0x63, 0x31, 0xF3, 0x00, 0x31, 0x00, 0x01, 0x00, 0x01, 0x02]),
        KnownMessage::broadcast(&[0x63, 0x31, 0xF3, 0x00, 0x21, 0x00, 0x01, 0x00, 0x01, 0x02]),
        KnownMessage::broadcast(&[0x63, 0x31, 0xF1, 0x00, 0x90, 0x01, 0xFF, 0xFF, 0xFF, 0x00, 0x80]),
        KnownMessage::broadcast(&[0x63, 0x31, 0xF3, 0x00, 0x01, 0x00, 0x01, 0x00, 0x01, 0x02]),
        KnownMessage::broadcast(&[0x63, 0x31, 0xF1, 0x00, 0x30, 0x01, 0xFF, 0xFF, 0xFF, 0x00, 0x80]),
    ];
}
