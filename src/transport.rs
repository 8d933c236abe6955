//! Frame transport: frames to bits and back.
//!
//! [`Transport`] owns the bit codec, this node's bus address and an
//! [`EventGate`]. Every send and read runs with the gate masked, so the 1 Hz
//! tick and console input cannot stretch a pulse, and is unmasked again on
//! every exit path. Results are logged and counted only after the gate is
//! released, never inside the bit-timed section.
//!
//! ## Acknowledgment
//!
//! On unicast frames every field after the receiver address is followed by an
//! acknowledge slot. The sender drives what would be a `1` and lets go early;
//! the addressed receiver immediately re-drives the line so the sender reads
//! the slot back as a `0`. Nodes that are not addressed consume the slot as
//! an ordinary bit. Broadcast frames have no slots.

use crate::bus::AvcBus;
use crate::codec::BitCodec;
use crate::consts::MAX_PAYLOAD_LEN;
use crate::error::{FrameField, ReadError, SendError};
use crate::frame::{AddressingMode, Frame, Payload};
use crate::gate::{EventGate, MaskGuard};
use crate::timer::BitTiming;

/// Link-level counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct LinkStats {
    /// Frames received intact.
    pub rx_good: u16,
    /// Frame reads aborted (bad start bit, desync, parity, length).
    pub rx_bad: u16,
    /// Frames sent (and acknowledged, if unicast).
    pub tx_good: u16,
    /// Sends aborted for lack of an acknowledge.
    pub tx_nak: u16,
    /// Sends deferred because the bus was busy.
    pub tx_busy: u16,
    /// Responses discarded: queue overflow or retries exhausted.
    pub dropped: u16,
}

/// Sends and receives whole frames on an [`AvcBus`].
#[derive(Debug)]
pub struct Transport<B: AvcBus, G: EventGate> {
    codec: BitCodec<B>,
    gate: G,
    address: u16,
    /// Link counters, updated after every transaction.
    pub stats: LinkStats,
}

impl<B: AvcBus, G: EventGate> Transport<B, G> {
    /// Creates a transport for the node at `address`.
    ///
    /// # Arguments
    /// - `bus`: the hardware port
    /// - `gate`: masks asynchronous handlers during a transaction
    /// - `address`: this node's 12-bit bus address, used to decide which
    ///   acknowledge slots to answer
    /// - `timing`: bit timing table for the port's interval timer
    pub fn new(bus: B, gate: G, address: u16, timing: BitTiming) -> Self {
        Self {
            codec: BitCodec::new(bus, timing),
            gate,
            address,
            stats: LinkStats::default(),
        }
    }

    /// This node's bus address.
    pub fn address(&self) -> u16 {
        self.address
    }

    /// The bit codec.
    pub fn codec(&self) -> &BitCodec<B> {
        &self.codec
    }

    /// Exclusive access to the bit codec.
    pub fn codec_mut(&mut self) -> &mut BitCodec<B> {
        &mut self.codec
    }

    /// The event gate.
    pub fn gate(&self) -> &G {
        &self.gate
    }

    /// Samples the line once. `false` means another node is transmitting
    /// and [`read_frame`](Transport::read_frame) should be called.
    pub fn is_bus_idle(&mut self) -> bool {
        self.codec.bus_mut().is_bus_idle()
    }

    /// Transmits `frame`.
    ///
    /// # Returns
    /// - `Ok(())` once every field was sent (and acknowledged, if unicast)
    /// - `Err(nb::Error::WouldBlock)` if the bus was not free; nothing was
    ///   driven and the caller decides when to try again
    /// - `Err(nb::Error::Other(SendError::NoAck(field)))` for the first
    ///   field the receiver did not acknowledge
    ///
    /// The line is released and the output driver disabled on every path.
    pub fn send_frame(&mut self, frame: &Frame) -> nb::Result<(), SendError> {
        let result = {
            let _guard = MaskGuard::new(&mut self.gate);
            transmit(&mut self.codec, frame)
        };
        match result {
            Ok(()) => {
                self.stats.tx_good = self.stats.tx_good.wrapping_add(1);
                trace!("sent {} bytes to {:#x}", frame.len(), frame.receiver());
            }
            Err(nb::Error::WouldBlock) => {
                self.stats.tx_busy = self.stats.tx_busy.wrapping_add(1);
                trace!("bus busy, send deferred");
            }
            Err(nb::Error::Other(error)) => {
                self.stats.tx_nak = self.stats.tx_nak.wrapping_add(1);
                debug!("send to {:#x} failed: {}", frame.receiver(), error);
            }
        }
        result
    }

    /// Receives one frame. Call when the bus has been seen busy, or to wait
    /// (briefly) for a start bit.
    ///
    /// Acknowledges every slot of unicast frames addressed to this node.
    ///
    /// # Errors
    /// Any [`ReadError`]; the partially read frame is discarded.
    pub fn read_frame(&mut self) -> Result<Frame, ReadError> {
        let result = {
            let _guard = MaskGuard::new(&mut self.gate);
            receive(&mut self.codec, self.address)
        };
        match &result {
            Ok(frame) => {
                self.stats.rx_good = self.stats.rx_good.wrapping_add(1);
                trace!(
                    "received {} bytes {:#x} -> {:#x}",
                    frame.len(),
                    frame.sender(),
                    frame.receiver()
                );
            }
            Err(error) => {
                self.stats.rx_bad = self.stats.rx_bad.wrapping_add(1);
                debug!("frame read aborted: {}", error);
            }
        }
        result
    }

    /// Consumes the transport, returning the port and the gate.
    pub fn release(self) -> (B, G) {
        (self.codec.release(), self.gate)
    }
}

fn transmit<B: AvcBus>(codec: &mut BitCodec<B>, frame: &Frame) -> nb::Result<(), SendError> {
    if !codec.is_bus_free() {
        return Err(nb::Error::WouldBlock);
    }
    codec.bus_mut().set_transmitting(true);
    let result = transmit_fields(codec, frame);
    codec.bus_mut().drive_level(false);
    codec.bus_mut().set_transmitting(false);
    result.map_err(nb::Error::Other)
}

fn transmit_fields<B: AvcBus>(codec: &mut BitCodec<B>, frame: &Frame) -> Result<(), SendError> {
    let unicast = !frame.is_broadcast();
    codec.send_start_bit();
    codec.send_bit(frame.mode().bit());
    codec.send_field(frame.sender(), 12);
    codec.send_field(frame.receiver(), 12);
    await_ack(codec, unicast, FrameField::ReceiverAddress)?;
    codec.send_field(u16::from(frame.control()), 4);
    await_ack(codec, unicast, FrameField::Control)?;
    codec.send_field(u16::from(frame.len()), 8);
    await_ack(codec, unicast, FrameField::Length)?;
    for (index, &byte) in frame.payload().iter().enumerate() {
        codec.send_field(u16::from(byte), 8);
        await_ack(codec, unicast, FrameField::Data(index as u8))?;
    }
    Ok(())
}

fn await_ack<B: AvcBus>(
    codec: &mut BitCodec<B>,
    unicast: bool,
    field: FrameField,
) -> Result<(), SendError> {
    if !unicast {
        return Ok(());
    }
    match codec.read_ack() {
        Ok(true) => Ok(()),
        Ok(false) => Err(SendError::NoAck(field)),
        Err(_) => Err(SendError::Desync(field)),
    }
}

fn receive<B: AvcBus>(codec: &mut BitCodec<B>, me: u16) -> Result<Frame, ReadError> {
    codec.receive_start_bit()?;
    let mode = codec
        .receive_bit()
        .map(AddressingMode::from_bit)
        .map_err(|_| ReadError::Desync(FrameField::Mode))?;
    let sender = checked_field(codec, 12, FrameField::SenderAddress)?;
    let receiver = checked_field(codec, 12, FrameField::ReceiverAddress)?;
    let for_me = mode == AddressingMode::Unicast && receiver == me;
    answer_slot(codec, mode, for_me, FrameField::ReceiverAddress)?;

    let control = checked_field(codec, 4, FrameField::Control)? as u8;
    answer_slot(codec, mode, for_me, FrameField::Control)?;

    let len = checked_field(codec, 8, FrameField::Length)? as u8;
    if len == 0 || len > MAX_PAYLOAD_LEN {
        return Err(ReadError::InvalidLength(len));
    }
    answer_slot(codec, mode, for_me, FrameField::Length)?;

    let mut payload = Payload::new();
    for index in 0..len {
        let field = FrameField::Data(index);
        let byte = checked_field(codec, 8, field)? as u8;
        answer_slot(codec, mode, for_me, field)?;
        let _ = payload.push(byte);
    }
    Ok(Frame::from_wire(mode, sender, receiver, control, payload))
}

/// Reads a field and its trailing parity bit, rejecting a mismatch.
fn checked_field<B: AvcBus>(
    codec: &mut BitCodec<B>,
    bits: u8,
    field: FrameField,
) -> Result<u16, ReadError> {
    let (value, parity) = codec
        .receive_field(bits)
        .map_err(|_| ReadError::Desync(field))?;
    let parity_bit = codec.receive_bit().map_err(|_| ReadError::Desync(field))?;
    if parity_bit != parity {
        return Err(ReadError::Parity(field));
    }
    Ok(value)
}

/// Acknowledges the slot if the frame is ours, otherwise lets it pass.
fn answer_slot<B: AvcBus>(
    codec: &mut BitCodec<B>,
    mode: AddressingMode,
    for_me: bool,
    field: FrameField,
) -> Result<(), ReadError> {
    let slot = match (mode, for_me) {
        (AddressingMode::Broadcast, _) => return Ok(()),
        (AddressingMode::Unicast, true) => codec.send_ack(),
        (AddressingMode::Unicast, false) => codec.receive_bit().map(|_| ()),
    };
    slot.map_err(|_| ReadError::Desync(field))
}
