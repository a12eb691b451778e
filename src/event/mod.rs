//! Input decoding and dispatch
//!
//! Raw terminal events are decoded into an [`Action`] first, then dispatched
//! to the controller through a plain match.

pub mod event_loop;

pub use event_loop::{EventLoop, InputListener, LoopEvent, LoopState, Ticker};

use crate::playback::PlaybackController;
use crate::streaming::AudioDevice;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::warn;

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Louder by one step
    VolumeUp,
    /// Quieter by one step
    VolumeDown,
    /// Pause or resume
    TogglePause,
    /// Jump forward by one step
    SeekForward,
    /// Jump back by one step
    SeekBackward,
    /// Leave the player
    Quit,
    /// Not bound to anything
    Ignored,
}

impl Action {
    /// Decode a terminal event.
    ///
    /// Only key presses are bound; letters match case-insensitively.
    pub fn decode(event: &Event) -> Self {
        match event {
            Event::Key(key) => Self::from_key(key),
            _ => Action::Ignored,
        }
    }

    /// Decode a key event.
    pub fn from_key(key: &KeyEvent) -> Self {
        if key.kind != KeyEventKind::Press {
            return Action::Ignored;
        }
        match key.code {
            KeyCode::Esc => Action::Quit,
            KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => {
                if c.eq_ignore_ascii_case(&'c') {
                    Action::Quit
                } else {
                    Action::Ignored
                }
            }
            KeyCode::Char(c) => match c.to_ascii_lowercase() {
                'q' => Action::Quit,
                'a' => Action::VolumeUp,
                'd' => Action::VolumeDown,
                'p' | ' ' => Action::TogglePause,
                'n' => Action::SeekForward,
                'b' => Action::SeekBackward,
                _ => Action::Ignored,
            },
            KeyCode::Up => Action::VolumeUp,
            KeyCode::Down => Action::VolumeDown,
            KeyCode::Right => Action::SeekForward,
            KeyCode::Left => Action::SeekBackward,
            _ => Action::Ignored,
        }
    }
}

/// Result of handling one input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Outcome {
    /// State changed, re-render now
    pub changed: bool,
    /// Leave the loop
    pub quit: bool,
}

impl Outcome {
    /// Nothing happened
    pub const NONE: Self = Self {
        changed: false,
        quit: false,
    };

    /// Quit requested
    pub const QUIT: Self = Self {
        changed: false,
        quit: true,
    };

    fn changed(changed: bool) -> Self {
        Self {
            changed,
            quit: false,
        }
    }
}

/// Apply `action` to `controller`.
///
/// A failed seek is logged and treated as no change.
pub fn dispatch<D: AudioDevice>(controller: &PlaybackController<D>, action: Action) -> Outcome {
    match action {
        Action::Ignored => Outcome::NONE,
        Action::Quit => Outcome::QUIT,
        Action::VolumeUp => Outcome::changed(controller.volume_up()),
        Action::VolumeDown => Outcome::changed(controller.volume_down()),
        Action::TogglePause => Outcome::changed(controller.toggle_pause()),
        Action::SeekForward => seek_outcome(controller.seek_forward()),
        Action::SeekBackward => seek_outcome(controller.seek_backward()),
    }
}

fn seek_outcome(result: Result<bool, crate::error::SeekError>) -> Outcome {
    match result {
        Ok(changed) => Outcome::changed(changed),
        Err(e) => {
            warn!("{e}");
            Outcome::NONE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn default_key_bindings() {
        assert_eq!(Action::decode(&press(KeyCode::Char('a'))), Action::VolumeUp);
        assert_eq!(Action::decode(&press(KeyCode::Char('d'))), Action::VolumeDown);
        assert_eq!(Action::decode(&press(KeyCode::Char('p'))), Action::TogglePause);
        assert_eq!(Action::decode(&press(KeyCode::Char('n'))), Action::SeekForward);
        assert_eq!(Action::decode(&press(KeyCode::Char('b'))), Action::SeekBackward);
        assert_eq!(Action::decode(&press(KeyCode::Char('q'))), Action::Quit);
        assert_eq!(Action::decode(&press(KeyCode::Esc)), Action::Quit);
    }

    #[test]
    fn letters_are_case_insensitive() {
        assert_eq!(Action::decode(&press(KeyCode::Char('A'))), Action::VolumeUp);
        assert_eq!(Action::decode(&press(KeyCode::Char('Q'))), Action::Quit);
    }

    #[test]
    fn arrow_and_space_aliases() {
        assert_eq!(Action::decode(&press(KeyCode::Up)), Action::VolumeUp);
        assert_eq!(Action::decode(&press(KeyCode::Left)), Action::SeekBackward);
        assert_eq!(Action::decode(&press(KeyCode::Char(' '))), Action::TogglePause);
    }

    #[test]
    fn ctrl_c_quits_but_other_chords_do_not_bind() {
        let ctrl_c = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(Action::decode(&ctrl_c), Action::Quit);
        let ctrl_a = Event::Key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL));
        assert_eq!(Action::decode(&ctrl_a), Action::Ignored);
    }

    #[test]
    fn unmapped_and_non_key_events_are_ignored() {
        assert_eq!(Action::decode(&press(KeyCode::Char('z'))), Action::Ignored);
        assert_eq!(Action::decode(&press(KeyCode::F(1))), Action::Ignored);
        assert_eq!(Action::decode(&Event::Resize(80, 24)), Action::Ignored);
        assert_eq!(Action::decode(&Event::FocusGained), Action::Ignored);
    }

    #[test]
    fn key_release_is_ignored() {
        let release = Event::Key(KeyEvent {
            code: KeyCode::Char('a'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        });
        assert_eq!(Action::decode(&release), Action::Ignored);
    }
}
