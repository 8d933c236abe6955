//! Constants used across the AVC-LAN protocol implementation.
//!
//! This module defines the protocol-wide constants used for payload sizing,
//! device addressing, the control nibble and the diagnostics trace format.
//!
//! ## Key Concepts
//!
//! - **Addresses**: 12-bit bus addresses. The head unit and the emulated CD
//!   changer have fixed well-known addresses; `0x1FF` reaches all audio devices.
//! - **Payload Limits**: a frame carries between 1 and [`MAX_PAYLOAD_LEN`] bytes.
//! - **Control**: every frame in this design is a "command write" (`0xF`).
//! - **Retries**: queued responses are attempted a bounded number of times.

/// Maximum number of payload bytes in a single frame.
///
/// A received length field of `0` or anything above this value is a protocol
/// violation and aborts the read before any payload bytes are consumed.
pub const MAX_PAYLOAD_LEN: u8 = 32;

/// See [`MAX_PAYLOAD_LEN`](crate::consts::MAX_PAYLOAD_LEN)
pub const MAX_PAYLOAD_LEN_USIZE: usize = MAX_PAYLOAD_LEN as usize;

/// Largest value representable in the 12-bit address fields.
pub const MAX_ADDRESS: u16 = 0x0FFF;

/// Largest value representable in the 4-bit control field.
pub const MAX_CONTROL: u8 = 0x0F;

/// The control nibble for a "command write", the only control value used on the bus.
pub const CONTROL_COMMAND_WRITE: u8 = 0x0F;

/// Receiver address reaching all audio devices.
pub const BROADCAST_ADDRESS: u16 = 0x01FF;

/// Bus address of the head unit (the controller this device answers to).
pub const HEAD_UNIT_ADDRESS: u16 = 0x0190;

/// Bus address of CD changer #1, the peripheral this crate emulates.
pub const CD_CHANGER_ADDRESS: u16 = 0x0360;

/// Logical id the head unit uses for itself inside payloads (`0x11` on the
/// stereos this was calibrated against).
pub const HEAD_UNIT_SWITCH_ID: u8 = 0x11;

/// Logical id of the CD changer inside payloads.
pub const CD_CHANGER_LOGICAL_ID: u8 = 0x63;

/// Capacity of the pending response queue. Must be a power of two and large
/// enough to hold the ten-frame init burst sent after a LAN restart.
pub const RESPONSE_QUEUE_LEN: usize = 16;

/// Maximum number of frames generated in reaction to a single command.
pub const MAX_RESPONSE_BURST: usize = 10;

/// Number of times a queued response is offered to the bus before it is dropped.
pub const MAX_SEND_ATTEMPTS: u8 = 3;

/// First byte of a binary frame trace record.
pub const TRACE_START_MARKER: u8 = 0x10;

/// Last byte of a binary frame trace record.
pub const TRACE_END_MARKER: u8 = 0x17;

/// Size of the largest binary frame trace record: two markers, seven header bytes, payload.
pub const TRACE_RECORD_LEN: usize = MAX_PAYLOAD_LEN_USIZE + 9;
