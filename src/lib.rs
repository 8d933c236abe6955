//! # avclan
//!
//! A portable, no_std Rust driver for the AVC-LAN bus (IEBus mode 1) found in
//! Toyota and Lexus audio systems, with a CD changer emulator built on top.
//!
//! The bus has no hardware controller on cheap microcontrollers, so this
//! crate implements the transceiver in software:
//! - `embedded-hal` pins plus a free-running interval timer for bit timing
//! - pulse-width bit encoding with even parity per field
//! - per-field acknowledge slots on unicast frames, both sending and answering
//! - interrupt masking around every transaction through an [`EventGate`](gate::EventGate)
//!
//! ## Crate features
//! | Feature               | Description |
//! |-----------------------|-------------|
//! | `std`                 | Disables `#![no_std]` |
//! | `timer-isr` (default) | `critical-section` backed tick latch and event gate |
//! | `defmt-0-3`           | Uses `defmt` logging and `defmt::Format` derives |
//! | `log`                 | Uses `log` logging |
//!
//! ## Layers
//!
//! - [`bus`]: the hardware port ([`AvcBus`](bus::AvcBus), [`PinBus`](bus::PinBus))
//! - [`codec`]: start bit, data bits, fields with parity, acknowledge slots
//! - [`transport`]: whole frames, busy detection, link statistics
//! - [`commands`], [`device`], [`response`]: classify, update state, answer
//! - [`changer`]: the run loop tying it together
//! - [`trace`]: text and binary frame traces for a console
//!
//! ## Usage
//!
//! ```rust,ignore
//! use avclan::bus::PinBus;
//! use avclan::changer::{Changer, ChangerConfig};
//! use avclan::timer::CriticalSectionGate;
//!
//! avclan::init_avclan_clock!();
//!
//! // in the 1 Hz timer interrupt:
//! // avclan::tick_avclan_clock!();
//!
//! let bus = PinBus::new(drive, sense, Some(enable), timer, None, None);
//! let mut changer: Changer<_, _> =
//!     Changer::new(bus, CriticalSectionGate::new(), ChangerConfig::default());
//! changer.register();
//! loop {
//!     match changer.poll_with(&AVCLAN_CLOCK) {
//!         avclan::changer::PollEvent::Received(frame, _) => {
//!             let _ = write!(console, "{}", avclan::trace::TextTrace::new(&frame, 0x360));
//!         }
//!         _ => {}
//!     }
//! }
//! ```
//!
//! ## Integration Notes
//!
//! - Bit timing is measured, not scheduled: the interval timer must count
//!   fast enough to resolve the 5.5 us floating phase of a `0` bit
//!   (see [`timer`] for common clock setups)
//! - Do not service interrupts that take longer than a few microseconds while
//!   a frame is on the wire; the event gate masks them during transactions
//! - Only one transport should own the bus pins
//!
//! --
//! Designed for `#![no_std]` use in resource-constrained embedded environments.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
mod fmt;

#[cfg(feature = "timer-isr")]
pub use critical_section;
pub use heapless;
pub use nb;

pub mod bus;
pub mod changer;
pub mod codec;
pub mod commands;
pub mod consts;
pub mod device;
pub mod error;
pub mod frame;
pub mod gate;
pub mod messages;
pub mod parity;
pub mod response;
pub mod timer;
pub mod trace;
pub mod transport;

#[cfg(test)]
mod sim;
