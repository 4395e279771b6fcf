//! # Button State
//!
//! Button, key and touch states are a bitmask, not an enum: one frame can
//! be `Pressed | JustPressed | Repeat` at once. Check bits with
//! [`ButtonState::contains`], never with `==`.

use std::time::Duration;

bitflags::bitflags! {
    /// Per-frame state of a button (or touch).
    ///
    /// Combine with bitwise OR: `ButtonState::PRESSED | ButtonState::JUST_PRESSED`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ButtonState: u8 {
        /// Up this frame.
        const RELEASED = 1 << 0;
        /// Down this frame.
        const PRESSED = 1 << 1;
        /// Down for at least the long press time (also set on the release
        /// frame of a long press).
        const LONG_PRESSED = 1 << 2;
        /// Went up this frame.
        const JUST_RELEASED = 1 << 3;
        /// Went down this frame.
        const JUST_PRESSED = 1 << 4;
        /// Crossed the long press time this frame.
        const JUST_LONG_PRESSED = 1 << 5;
        /// Platform auto-repeat fired this frame.
        const REPEAT = 1 << 6;
    }
}

impl ButtonState {
    /// State reported for buttons that do not exist.
    pub const INVALID: Self = Self::empty();
}

/// Press durations of one button on two consecutive frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PressTiming {
    /// Long press threshold.
    pub long_press: Duration,
    /// Held time as of the current frame.
    pub current: Duration,
    /// Held time as of the previous frame.
    pub previous: Duration,
}

/// Derives the state bitmask from two frames of samples.
#[must_use]
pub fn derive_button_state(curr: bool, prev: bool, repeat: bool, timing: PressTiming) -> ButtonState {
    let mut state = ButtonState::empty();
    let prev_long = prev && timing.previous >= timing.long_press;

    if curr {
        state |= ButtonState::PRESSED;
        if !prev {
            state |= ButtonState::JUST_PRESSED;
        }
        if repeat {
            state |= ButtonState::REPEAT;
        }
        if timing.current >= timing.long_press {
            state |= ButtonState::LONG_PRESSED;
            if !prev_long {
                state |= ButtonState::JUST_LONG_PRESSED;
            }
        }
    } else {
        state |= ButtonState::RELEASED;
        if prev {
            state |= ButtonState::JUST_RELEASED;
            if prev_long {
                state |= ButtonState::LONG_PRESSED;
            }
        }
    }
    state
}
