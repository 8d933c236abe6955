//! Emulated CD changer state.
//!
//! [`DeviceState`] is changed by dispatched actions ([`DeviceState::apply`])
//! and by the 1 Hz play-time tick ([`DeviceState::tick`]), and read by the
//! response generator when it patches templates.

use crate::commands::{Action, Source};

/// Whether the changer is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum PlayMode {
    /// Stopped; the play-time clock does not advance.
    #[default]
    Stopped,
    /// Playing; the play-time clock advances once per tick.
    Playing,
}

/// The disc-state byte reported in status frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[repr(u8)]
pub enum DiscState {
    /// Tray open.
    Open = 0x01,
    /// Disc error.
    Error = 0x02,
    /// Seeking.
    Seeking = 0x08,
    /// Playing back.
    #[default]
    Playback = 0x10,
    /// Seeking to a track.
    SeekingTrack = 0x20,
    /// Loading a disc.
    Loading = 0x80,
}

impl DiscState {
    /// The byte sent on the wire.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Repeat / random / scan flags, as reported in status frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct PlayFlags(u8);

impl PlayFlags {
    /// Random across discs.
    pub const DISC_RANDOM: Self = Self(1 << 1);
    /// Random within the disc.
    pub const RANDOM: Self = Self(1 << 2);
    /// Repeat the disc.
    pub const DISC_REPEAT: Self = Self(1 << 3);
    /// Repeat the track.
    pub const REPEAT: Self = Self(1 << 4);
    /// Scan across discs.
    pub const DISC_SCAN: Self = Self(1 << 5);
    /// Scan within the disc.
    pub const SCAN: Self = Self(1 << 6);

    /// No flags set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// The raw byte.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// `true` if every flag in `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets or clears the flags in `other`.
    pub fn set(&mut self, other: Self, on: bool) {
        if on {
            self.0 |= other.0;
        } else {
            self.0 &= !other.0;
        }
    }
}

/// Increments a packed BCD byte.
///
/// Carries from the low digit when it reads 9, which is correct for
/// `0x00..=0x98` but turns `0x99` into `0xA0` rather than wrapping to `0x00`.
/// [`DeviceState::tick`] compensates for that at the minute boundary.
pub const fn increment_bcd(value: u8) -> u8 {
    if value & 0x09 == 0x09 {
        value.wrapping_add(7)
    } else {
        value.wrapping_add(1)
    }
}

/// The emulated changer's status record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct DeviceState {
    /// Play or stop.
    pub mode: PlayMode,
    /// Set by "play it", cleared by explicit play or stop requests.
    pub play_requested: bool,
    /// Current disc number.
    pub disc: u8,
    /// Current track number (BCD).
    pub track: u8,
    /// Elapsed minutes (BCD).
    pub minutes: u8,
    /// Elapsed seconds (BCD).
    pub seconds: u8,
    /// Disc state reported in status frames.
    pub disc_state: DiscState,
    /// Repeat / random / scan flags.
    pub flags: PlayFlags,
    /// Bitmap of loaded magazine slots, bit 0 = disc 1.
    pub slots: u8,
    /// Number of LAN check answers sent.
    pub check_count: u8,
    /// The source the head unit last announced.
    pub source: Source,
    /// Whether the auxiliary function is switched on.
    pub function_enabled: bool,
    status_pending: bool,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            mode: PlayMode::Stopped,
            play_requested: false,
            disc: 1,
            track: 1,
            minutes: 0,
            seconds: 0,
            disc_state: DiscState::Playback,
            flags: PlayFlags::empty(),
            slots: 0x01,
            check_count: 0,
            source: Source::None,
            function_enabled: false,
            status_pending: false,
        }
    }
}

impl DeviceState {
    /// Applies a dispatched action.
    ///
    /// # Returns
    /// `true` if the action is answered with at least one response frame.
    pub fn apply(&mut self, action: Action) -> bool {
        match action {
            Action::None => false,
            Action::Status1
            | Action::Status2
            | Action::Status3
            | Action::Status4
            | Action::Register
            | Action::Init => true,
            Action::PlayRequest1 => {
                self.play_requested = false;
                true
            }
            Action::PlayRequest2 | Action::PlayRequest3 => {
                self.play_requested = false;
                self.play();
                true
            }
            Action::PlayIt => {
                self.play_requested = true;
                self.play();
                self.status_pending = true;
                true
            }
            Action::StopRequest1 | Action::StopRequest2 => {
                self.play_requested = false;
                self.mode = PlayMode::Stopped;
                true
            }
            Action::Check(_) => {
                self.check_count = self.check_count.wrapping_add(1);
                true
            }
            Action::SourceInUse(source) => {
                self.select_source(source);
                false
            }
            Action::NoSourceInUse => {
                self.select_source(Source::None);
                false
            }
            Action::ToggleFunction => match self.function_toggle() {
                Some(action) => self.apply(action),
                None => false,
            },
            Action::EnableFunction => {
                self.function_enabled = true;
                true
            }
            Action::DisableFunction => {
                self.function_enabled = false;
                true
            }
        }
    }

    fn play(&mut self) {
        self.source = Source::Changer;
        self.mode = PlayMode::Playing;
        self.disc_state = DiscState::Playback;
    }

    /// Records the source the head unit switched to. Any source other than
    /// this changer stops playback; only AUX keeps the auxiliary function on.
    fn select_source(&mut self, source: Source) {
        self.source = source;
        self.function_enabled = source == Source::Aux;
        if source != Source::Changer {
            self.play_requested = false;
            self.mode = PlayMode::Stopped;
        }
    }

    /// What a function toggle resolves to: nothing while the built-in CD
    /// player is the source, otherwise the opposite of the current state.
    pub fn function_toggle(&self) -> Option<Action> {
        match (self.source, self.function_enabled) {
            (Source::Cd, _) => None,
            (_, true) => Some(Action::DisableFunction),
            (_, false) => Some(Action::EnableFunction),
        }
    }

    /// `true` once the head unit has switched to a source other than this changer.
    pub fn is_other_source_active(&self) -> bool {
        !matches!(self.source, Source::None | Source::Changer)
    }

    /// Advances the play-time clock by one second while playing, and marks a
    /// status frame as pending unless another source is active.
    ///
    /// Seconds roll over at `0x60`; minutes roll over from `0x99` to `0x00`
    /// by catching the `0xA0` that [`increment_bcd`] produces there.
    pub fn tick(&mut self) {
        if self.mode == PlayMode::Playing {
            self.seconds = increment_bcd(self.seconds);
            if self.seconds == 0x60 {
                self.seconds = 0;
                self.minutes = increment_bcd(self.minutes);
                if self.minutes == 0xA0 {
                    self.minutes = 0;
                }
            }
        }
        if !self.is_other_source_active() {
            self.status_pending = true;
        }
    }

    /// Selects a track and restarts its play time. A status frame is owed
    /// for the new position.
    pub fn select_track(&mut self, track: u8) {
        self.track = track;
        self.minutes = 0;
        self.seconds = 0;
        self.status_pending = true;
    }

    /// `true` if a status frame is owed.
    pub fn is_status_pending(&self) -> bool {
        self.status_pending
    }

    /// Returns and clears the pending-status flag.
    pub fn take_status_pending(&mut self) -> bool {
        core::mem::replace(&mut self.status_pending, false)
    }
}
