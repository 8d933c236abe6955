//! Frame traces for a diagnostics console.
//!
//! Two forms are produced, neither of which the protocol core reads back:
//!
//! - a text line per frame, e.g.
//!   ```text
//!    < 1 0x190 0x360 0xF 0x05 0x00 0x11 0x63 0x42 0x41
//!   ```
//!   where the leading marker is ` < ` for frames concerning this device and
//!   `>< ` for traffic between other nodes;
//! - a binary record: [`TRACE_START_MARKER`], mode, sender hi/lo, receiver
//!   hi/lo, control, length, payload, [`TRACE_END_MARKER`].

use core::fmt;

use crate::consts::{BROADCAST_ADDRESS, TRACE_END_MARKER, TRACE_RECORD_LEN, TRACE_START_MARKER};
use crate::frame::Frame;
use heapless::Vec;

/// A binary trace record.
pub type TraceRecord = Vec<u8, TRACE_RECORD_LEN>;

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} 0x{:03X} 0x{:03X} 0x{:X} 0x{:02X}",
            u8::from(self.mode().bit()),
            self.sender(),
            self.receiver(),
            self.control(),
            self.len()
        )?;
        for byte in self.payload() {
            write!(f, " 0x{byte:02X}")?;
        }
        Ok(())
    }
}

/// One text trace line, as seen by the node at `local`.
#[derive(Debug, Clone, Copy)]
pub struct TextTrace<'a> {
    /// The traced frame.
    pub frame: &'a Frame,
    /// Address of the node printing the trace.
    pub local: u16,
}

impl<'a> TextTrace<'a> {
    /// Traces `frame` from the point of view of the node at `local`.
    pub fn new(frame: &'a Frame, local: u16) -> Self {
        Self { frame, local }
    }

    /// `true` if the frame is addressed to this node or to everyone.
    pub fn is_inbound(&self) -> bool {
        self.frame.is_unicast_to(self.local)
            || (self.frame.is_broadcast() && self.frame.receiver() == BROADCAST_ADDRESS)
    }
}

impl fmt::Display for TextTrace<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.is_inbound() { " < " } else { ">< " };
        writeln!(f, "{marker}{}", self.frame)
    }
}

/// Encodes `frame` as a binary trace record.
pub fn encode_binary(frame: &Frame) -> TraceRecord {
    let mut record = TraceRecord::new();
    let [sender_hi, sender_lo] = frame.sender().to_be_bytes();
    let [receiver_hi, receiver_lo] = frame.receiver().to_be_bytes();
    // Capacity covers the largest frame; pushes cannot fail.
    let _ = record.extend_from_slice(&[
        TRACE_START_MARKER,
        u8::from(frame.mode().bit()),
        sender_hi,
        sender_lo,
        receiver_hi,
        receiver_lo,
        frame.control(),
        frame.len(),
    ]);
    let _ = record.extend_from_slice(frame.payload());
    let _ = record.push(TRACE_END_MARKER);
    record
}
