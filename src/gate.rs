//! Scoped suppression of asynchronous work during a frame transaction.
//!
//! Bit send/receive are busy-wait loops against a free-running timer. Anything
//! that steals cycles mid-frame (the 1 Hz tick handler, console input) shifts
//! the measured pulse widths, so both are masked for the whole transaction
//! and unmasked again on every exit path.

/// Something that can suppress and restore asynchronous event handling.
///
/// Implementations must tolerate `unmask` being called exactly once per
/// `mask`; calls are never nested by this crate.
pub trait EventGate {
    /// Suppress asynchronous handlers (tick, console input).
    fn mask(&mut self);
    /// Restore the handlers suppressed by the matching [`mask`](EventGate::mask).
    fn unmask(&mut self);
}

/// No-op gate, for hosts where nothing runs concurrently with the bus loop.
impl EventGate for () {
    fn mask(&mut self) {}
    fn unmask(&mut self) {}
}

impl<G: EventGate + ?Sized> EventGate for &mut G {
    fn mask(&mut self) {
        (**self).mask();
    }

    fn unmask(&mut self) {
        (**self).unmask();
    }
}

/// RAII guard: masks on construction, unmasks when dropped.
#[derive(Debug)]
pub struct MaskGuard<'a, G: EventGate> {
    gate: &'a mut G,
}

impl<'a, G: EventGate> MaskGuard<'a, G> {
    /// Masks `gate` until the returned guard goes out of scope.
    pub fn new(gate: &'a mut G) -> Self {
        gate.mask();
        Self { gate }
    }
}

impl<G: EventGate> Drop for MaskGuard<'_, G> {
    fn drop(&mut self) {
        self.gate.unmask();
    }
}
