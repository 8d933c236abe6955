//! Error types for the AVC-LAN link layer.
//!
//! All of these are recoverable at frame level: a failed read discards the
//! frame, a failed send is reported to the caller (or the response queue),
//! and the run loop simply waits for the next idle-bus opportunity.

use core::fmt;
use thiserror::Error;

/// Position within a frame, used to report where a read or send failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum FrameField {
    /// The addressing-mode bit after the start bit.
    Mode,
    /// The 12-bit sender address.
    SenderAddress,
    /// The 12-bit receiver address (its acknowledge slot is the address ACK).
    ReceiverAddress,
    /// The 4-bit control nibble.
    Control,
    /// The payload length byte.
    Length,
    /// A payload byte, by index.
    Data(u8),
}

impl fmt::Display for FrameField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameField::Mode => f.write_str("mode"),
            FrameField::SenderAddress => f.write_str("sender address"),
            FrameField::ReceiverAddress => f.write_str("receiver address"),
            FrameField::Control => f.write_str("control"),
            FrameField::Length => f.write_str("length"),
            FrameField::Data(index) => write!(f, "data[{index}]"),
        }
    }
}

/// The line did not change level within the desynchronization bound.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[error("bus line desynchronized")]
pub struct Desync;

/// Why a frame read was aborted. The partial frame is always discarded.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum ReadError {
    /// The line never went dominant while waiting for a start bit.
    #[error("no start bit")]
    NoStartBit,
    /// A pulse shorter than the start-bit window (duration in timer counts).
    #[error("short start bit ({0} counts)")]
    ShortStartBit(u16),
    /// A pulse still driven past the start-bit window.
    #[error("long start bit")]
    LongStartBit,
    /// A bit inside the frame timed out.
    #[error("desynchronized in {0}")]
    Desync(FrameField),
    /// The trailing parity bit did not match the field.
    #[error("parity mismatch in {0}")]
    Parity(FrameField),
    /// The length field was zero or above the payload capacity.
    #[error("invalid length {0}")]
    InvalidLength(u8),
}

/// Why a frame send was aborted. Bus-busy is reported separately as
/// [`nb::Error::WouldBlock`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum SendError {
    /// The addressed receiver did not acknowledge this field.
    #[error("no acknowledge for {0}")]
    NoAck(FrameField),
    /// The line stayed dominant through this field's acknowledge slot.
    #[error("line stuck during {0}")]
    Desync(FrameField),
}

impl SendError {
    /// The field whose acknowledge slot failed.
    pub fn field(&self) -> FrameField {
        match *self {
            SendError::NoAck(field) | SendError::Desync(field) => field,
        }
    }
}

/// Why a [`Frame`](crate::frame::Frame) could not be built.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum FrameError {
    /// Frames carry at least one payload byte.
    #[error("empty payload")]
    EmptyPayload,
    /// Payload longer than the 32 byte capacity.
    #[error("payload of {0} bytes exceeds capacity")]
    PayloadTooLong(usize),
    /// Address does not fit in 12 bits.
    #[error("address {0:#x} out of range")]
    AddressOutOfRange(u16),
    /// Control does not fit in 4 bits.
    #[error("control {0:#x} out of range")]
    ControlOutOfRange(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_failing_field() {
        assert_eq!(
            SendError::NoAck(FrameField::Data(3)).to_string(),
            "no acknowledge for data[3]"
        );
        assert_eq!(
            ReadError::Parity(FrameField::ReceiverAddress).to_string(),
            "parity mismatch in receiver address"
        );
        assert_eq!(ReadError::ShortStartBit(12).to_string(), "short start bit (12 counts)");
    }

    #[test]
    fn test_send_error_field() {
        assert_eq!(SendError::Desync(FrameField::Length).field(), FrameField::Length);
        assert_eq!(
            SendError::NoAck(FrameField::ReceiverAddress).field(),
            FrameField::ReceiverAddress
        );
    }
}
