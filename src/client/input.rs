// Keystroke capture for keyboard-wedge barcode scanners.
// A scanner types the code and presses Enter; these keys usually land on
// the page body rather than the code input, so they are routed here.
use crate::client::buffer::IntakeState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Enter,
    /// Navigation, function keys and anything else without text.
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    fn any(&self) -> bool {
        self.ctrl || self.alt || self.meta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    /// Auto-repeat from a held key.
    pub repeat: bool,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            repeat: false,
            modifiers: Modifiers::default(),
        }
    }
}

/// What currently owns keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Body,
    CodeField,
    QuantityField,
    OtherControl,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Capture {
    /// Not ours: a field has focus or the key carries no text.
    Ignored,
    Edited(IntakeState),
    /// The caller should run `IntakeState::submit`.
    Submit,
}

/// Routes one keystroke into the code field. Only active while the body
/// has focus, so typing in real inputs is never intercepted.
pub fn capture(state: &IntakeState, event: &KeyEvent, focus: Focus) -> Capture {
    if focus != Focus::Body || event.modifiers.any() {
        return Capture::Ignored;
    }
    match event.key {
        Key::Char(ch) if !ch.is_control() => {
            Capture::Edited(state.with_code(state.code().push_captured(ch)))
        }
        Key::Backspace => Capture::Edited(state.with_code(state.code().backspace())),
        Key::Enter if !event.repeat => Capture::Submit,
        _ => Capture::Ignored,
    }
}

/// Keystrokes a wedge scanner emits for one scanned line.
pub fn scan_keystrokes(line: &str) -> Vec<KeyEvent> {
    line.chars()
        .filter(|ch| *ch != '\r' && *ch != '\n')
        .map(|ch| KeyEvent::new(Key::Char(ch)))
        .chain(std::iter::once(KeyEvent::new(Key::Enter)))
        .collect()
}
