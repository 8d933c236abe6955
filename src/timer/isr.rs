use crate::gate::EventGate;
use core::cell::Cell;
use core::fmt;
use critical_section::{Mutex, RestoreState};

/// Pending 1 Hz play-time ticks, shared between an interrupt and the run loop.
///
/// The interrupt only records that a second elapsed; the run loop applies it
/// to the device state between bus transactions, so the tick never lands in
/// the middle of a bit-timed loop.
///
/// # Example
/// ```rust
/// use avclan::timer::TickLatch;
///
/// static CLOCK: TickLatch = TickLatch::new();
///
/// // from the 1 Hz timer interrupt
/// CLOCK.pend();
///
/// // from the run loop
/// assert_eq!(CLOCK.take(), 1);
/// assert_eq!(CLOCK.take(), 0);
/// ```
#[derive(Debug)]
pub struct TickLatch {
    pending: Mutex<Cell<u8>>,
}

impl TickLatch {
    /// An empty latch, usable in a `static` initializer.
    pub const fn new() -> Self {
        Self {
            pending: Mutex::new(Cell::new(0)),
        }
    }

    /// Records one elapsed second. Saturates at `u8::MAX` pending ticks.
    pub fn pend(&self) {
        critical_section::with(|cs| {
            let pending = self.pending.borrow(cs);
            pending.set(pending.get().saturating_add(1));
        });
    }

    /// Returns and clears the number of ticks pended since the last call.
    pub fn take(&self) -> u8 {
        critical_section::with(|cs| self.pending.borrow(cs).replace(0))
    }
}

impl Default for TickLatch {
    fn default() -> Self {
        Self::new()
    }
}

/// [`EventGate`] that masks interrupts through the global `critical-section`
/// implementation for the duration of a frame transaction.
#[derive(Default)]
pub struct CriticalSectionGate {
    restore: Option<RestoreState>,
}

impl CriticalSectionGate {
    /// A gate that is not currently masking anything.
    pub const fn new() -> Self {
        Self { restore: None }
    }

    /// `true` while a transaction holds interrupts masked.
    pub fn is_masked(&self) -> bool {
        self.restore.is_some()
    }
}

impl fmt::Debug for CriticalSectionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CriticalSectionGate")
            .field("masked", &self.is_masked())
            .finish()
    }
}

impl EventGate for CriticalSectionGate {
    fn mask(&mut self) {
        if self.restore.is_none() {
            // SAFETY: paired with exactly one `release` in `unmask`, and the
            // only caller is `MaskGuard`, which unmasks on drop.
            self.restore = Some(unsafe { critical_section::acquire() });
        }
    }

    fn unmask(&mut self) {
        if let Some(state) = self.restore.take() {
            // SAFETY: `state` came from the matching `acquire` in `mask`.
            unsafe { critical_section::release(state) };
        }
    }
}
