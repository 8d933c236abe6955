//! The AVC-LAN frame.
//!
//! On the wire a frame is
//!
//! ```text
//! start · mode · sender(12) · P · receiver(12) · P · [A] · control(4) · P · [A]
//!       · length(8) · P · [A] · { data(8) · P · [A] } × length
//! ```
//!
//! where `P` is an even parity bit and `[A]` an acknowledge slot that only
//! exists on unicast frames. [`Frame`] is the decoded form: it is built either
//! field by field by [`Transport::read_frame`](crate::transport::Transport::read_frame)
//! or whole by the response generator, and is not changed once sent or received.

use crate::consts::{CONTROL_COMMAND_WRITE, MAX_ADDRESS, MAX_CONTROL, MAX_PAYLOAD_LEN_USIZE};
use crate::error::FrameError;
use heapless::Vec;

/// Frame payload storage.
pub type Payload = Vec<u8, MAX_PAYLOAD_LEN_USIZE>;

/// The addressing-mode bit sent right after the start bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum AddressingMode {
    /// Sent as `0`. Intended for every listener; no acknowledge slots.
    Broadcast,
    /// Sent as `1`. Addressed to one receiver, which acknowledges each field.
    Unicast,
}

impl AddressingMode {
    /// The bit transmitted for this mode.
    pub const fn bit(self) -> bool {
        matches!(self, AddressingMode::Unicast)
    }

    /// Decodes the addressing-mode bit.
    pub const fn from_bit(bit: bool) -> Self {
        if bit {
            AddressingMode::Unicast
        } else {
            AddressingMode::Broadcast
        }
    }
}

/// A complete AVC-LAN frame.
///
/// Invariants, enforced by every constructor:
/// - sender and receiver fit in 12 bits
/// - control fits in 4 bits
/// - the payload holds 1 to 32 bytes
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Frame {
    mode: AddressingMode,
    sender: u16,
    receiver: u16,
    control: u8,
    payload: Payload,
}

impl Frame {
    /// Builds a "command write" frame (control `0xF`).
    ///
    /// # Errors
    /// - [`FrameError::EmptyPayload`] / [`FrameError::PayloadTooLong`] if the
    ///   payload is not 1 to 32 bytes
    /// - [`FrameError::AddressOutOfRange`] if either address exceeds 12 bits
    pub fn new(
        mode: AddressingMode,
        sender: u16,
        receiver: u16,
        payload: &[u8],
    ) -> Result<Self, FrameError> {
        check_address(sender)?;
        check_address(receiver)?;
        if payload.is_empty() {
            return Err(FrameError::EmptyPayload);
        }
        let payload =
            Payload::from_slice(payload).map_err(|_| FrameError::PayloadTooLong(payload.len()))?;
        Ok(Self {
            mode,
            sender,
            receiver,
            control: CONTROL_COMMAND_WRITE,
            payload,
        })
    }

    /// Replaces the control nibble.
    ///
    /// # Errors
    /// - [`FrameError::ControlOutOfRange`] if `control` exceeds 4 bits
    pub fn with_control(mut self, control: u8) -> Result<Self, FrameError> {
        if control > MAX_CONTROL {
            return Err(FrameError::ControlOutOfRange(control));
        }
        self.control = control;
        Ok(self)
    }

    /// Assembles a frame from fields already range-checked off the wire.
    pub(crate) fn from_wire(
        mode: AddressingMode,
        sender: u16,
        receiver: u16,
        control: u8,
        payload: Payload,
    ) -> Self {
        Self {
            mode,
            sender,
            receiver,
            control,
            payload,
        }
    }

    /// Overwrites one payload byte; out-of-range indices are ignored.
    pub(crate) fn patch(&mut self, index: usize, value: u8) {
        if let Some(byte) = self.payload.get_mut(index) {
            *byte = value;
        }
    }

    /// Broadcast or unicast.
    pub fn mode(&self) -> AddressingMode {
        self.mode
    }

    /// Address of the transmitting node.
    pub fn sender(&self) -> u16 {
        self.sender
    }

    /// Address of the intended receiver.
    pub fn receiver(&self) -> u16 {
        self.receiver
    }

    /// The control nibble.
    pub fn control(&self) -> u8 {
        self.control
    }

    /// The length field, always `1..=32`.
    pub fn len(&self) -> u8 {
        self.payload.len() as u8
    }

    /// Always `false`; frames carry at least one byte.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// The payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// `true` for broadcast frames.
    pub fn is_broadcast(&self) -> bool {
        self.mode == AddressingMode::Broadcast
    }

    /// `true` if this is a unicast frame addressed to `address`, i.e. one
    /// whose acknowledge slots `address` must answer.
    pub fn is_unicast_to(&self, address: u16) -> bool {
        self.mode == AddressingMode::Unicast && self.receiver == address
    }
}

fn check_address(address: u16) -> Result<(), FrameError> {
    if address > MAX_ADDRESS {
        Err(FrameError::AddressOutOfRange(address))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{BROADCAST_ADDRESS, CD_CHANGER_ADDRESS, HEAD_UNIT_ADDRESS};

    #[test]
    fn test_new_frame_defaults_to_command_write() {
        let frame = Frame::new(
            AddressingMode::Unicast,
            HEAD_UNIT_ADDRESS,
            CD_CHANGER_ADDRESS,
            &[0x00, 0x01, 0x0A],
        )
        .unwrap();
        assert_eq!(frame.control(), 0x0F);
        assert_eq!(frame.len(), 3);
        assert!(frame.is_unicast_to(CD_CHANGER_ADDRESS));
        assert!(!frame.is_unicast_to(HEAD_UNIT_ADDRESS));
    }

    #[test]
    fn test_payload_bounds() {
        let max = [0xAA; 32];
        assert_eq!(
            Frame::new(AddressingMode::Broadcast, 0x360, BROADCAST_ADDRESS, &max)
                .unwrap()
                .len(),
            32
        );
        assert_eq!(
            Frame::new(AddressingMode::Broadcast, 0x360, BROADCAST_ADDRESS, &[0; 33]),
            Err(FrameError::PayloadTooLong(33))
        );
        assert_eq!(
            Frame::new(AddressingMode::Broadcast, 0x360, BROADCAST_ADDRESS, &[]),
            Err(FrameError::EmptyPayload)
        );
    }

    #[test]
    fn test_field_ranges() {
        assert_eq!(
            Frame::new(AddressingMode::Unicast, 0x1000, 0x190, &[1]),
            Err(FrameError::AddressOutOfRange(0x1000))
        );
        let frame = Frame::new(AddressingMode::Unicast, 0x360, 0x190, &[1]).unwrap();
        assert_eq!(
            frame.clone().with_control(0x10),
            Err(FrameError::ControlOutOfRange(0x10))
        );
        assert_eq!(frame.with_control(0x3).unwrap().control(), 0x3);
    }

    #[test]
    fn test_patch_ignores_out_of_range() {
        let mut frame = Frame::new(AddressingMode::Unicast, 0x360, 0x190, &[0, 0]).unwrap();
        frame.patch(1, 0x42);
        frame.patch(6, 0x99);
        assert_eq!(frame.payload(), &[0x00, 0x42]);
    }

    #[test]
    fn test_mode_bit() {
        assert!(!AddressingMode::Broadcast.bit());
        assert_eq!(AddressingMode::from_bit(true), AddressingMode::Unicast);
    }
}
