/// Declares the global `AVCLAN_CLOCK` tick latch.
///
/// The latch is shared between the 1 Hz timer interrupt, which pends ticks
/// with [`tick_avclan_clock!`], and the run loop, which drains them through
/// `Changer::poll_with(&AVCLAN_CLOCK)`.
///
/// # Example
/// ```rust
/// avclan::init_avclan_clock!();
///
/// avclan::tick_avclan_clock!();
/// assert_eq!(AVCLAN_CLOCK.take(), 1);
/// ```
#[macro_export]
macro_rules! init_avclan_clock {
    () => {
        pub static AVCLAN_CLOCK: $crate::timer::TickLatch = $crate::timer::TickLatch::new();
    };
}

/// Pends one elapsed second on the global `AVCLAN_CLOCK`.
///
/// Intended to be the whole body of a 1 Hz timer interrupt:
///
/// ```rust,ignore
/// #[interrupt]
/// fn TIMER1_COMPA() {
///     avclan::tick_avclan_clock!();
/// }
/// ```
///
/// # Notes
/// - Requires `init_avclan_clock!` in the same module.
/// - Never touches the bus or the device state, so it is safe to fire at
///   any point; while a frame transaction is in progress the interrupt is
///   masked and the tick is delivered afterwards.
#[macro_export]
macro_rules! tick_avclan_clock {
    () => {
        AVCLAN_CLOCK.pend()
    };
}

#[cfg(test)]
mod tests {
    crate::init_avclan_clock!();

    #[test]
    fn test_macros_share_the_global_latch() {
        crate::tick_avclan_clock!();
        crate::tick_avclan_clock!();
        assert_eq!(AVCLAN_CLOCK.take(), 2);
    }
}
