use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::{format_number, parse_number};

/// Fixed width of a scanner code.
pub const CODE_WIDTH: usize = 6;
pub const DEFAULT_QTTY: &str = "1";

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// An unsent scanned item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferEntry {
    pub code: String,
    pub qtty: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Mode {
    Adding,
    Editing { index: usize },
}

/// Form field a rejected submit points back at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Code,
    Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("Enter an item code")]
    EmptyCode,

    #[error("Quantity must be a number greater than zero")]
    InvalidQuantity,

    #[error("A send is in progress")]
    Busy,

    #[error("Row {index} does not exist (buffer has {len} entries)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Nothing to send")]
    EmptyBuffer,
}

impl BufferError {
    pub fn field(&self) -> Option<Field> {
        match self {
            BufferError::EmptyCode => Some(Field::Code),
            BufferError::InvalidQuantity => Some(Field::Quantity),
            _ => None,
        }
    }
}

/// Collapses every whitespace run to a single space. Leading and trailing
/// space survives until submit so captured keystrokes can still separate
/// words.
pub fn collapse_whitespace(raw: &str) -> String {
    WHITESPACE_RUN.replace_all(raw, " ").into_owned()
}

/// Contents of the code input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodeField {
    text: String,
    /// Whole text highlighted; the next captured key overwrites it.
    selected: bool,
}

impl CodeField {
    /// Text typed directly into the field, capped like an input `maxlength`.
    pub fn typed(raw: &str) -> Self {
        Self {
            text: collapse_whitespace(raw).chars().take(CODE_WIDTH).collect(),
            selected: false,
        }
    }

    /// Field text pre-selected for quick overwrite.
    pub fn selected(raw: &str) -> Self {
        Self {
            selected: true,
            ..Self::typed(raw)
        }
    }

    /// Appends a captured keystroke, keeping only the trailing code width.
    pub fn push_captured(&self, ch: char) -> Self {
        let mut raw = if self.selected {
            String::new()
        } else {
            self.text.clone()
        };
        raw.push(ch);
        Self {
            text: keep_last(&collapse_whitespace(&raw), CODE_WIDTH),
            selected: false,
        }
    }

    pub fn backspace(&self) -> Self {
        if self.selected {
            return Self::default();
        }
        let mut text = self.text.clone();
        text.pop();
        Self {
            text,
            selected: false,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }
}

fn keep_last(text: &str, width: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(width)).collect()
}

/// Complete client state. Every transition returns a new state and leaves
/// `self` untouched, so rejected operations need no rollback.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeState {
    entries: Vec<BufferEntry>,
    mode: Mode,
    sending: bool,
    scroll_pending: bool,
    code: CodeField,
    qtty: String,
}

impl Default for IntakeState {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            mode: Mode::Adding,
            sending: false,
            scroll_pending: false,
            code: CodeField::default(),
            qtty: DEFAULT_QTTY.to_string(),
        }
    }
}

impl IntakeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[BufferEntry] {
        &self.entries
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn editing_index(&self) -> Option<usize> {
        match self.mode {
            Mode::Adding => None,
            Mode::Editing { index } => Some(index),
        }
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    pub fn scroll_pending(&self) -> bool {
        self.scroll_pending
    }

    pub fn code(&self) -> &CodeField {
        &self.code
    }

    pub fn qtty(&self) -> &str {
        &self.qtty
    }

    // ── Field edits ───────────────────────────────────────────────────────

    pub fn with_code(&self, code: CodeField) -> Self {
        Self {
            code,
            ..self.clone()
        }
    }

    pub fn with_qtty(&self, raw: &str) -> Self {
        Self {
            qtty: raw.trim().to_string(),
            ..self.clone()
        }
    }

    // ── Transitions ───────────────────────────────────────────────────────

    /// Validates the form and either appends a new entry (`Adding`) or
    /// overwrites the edited one (`Editing`). Either way the form resets
    /// and the state returns to `Adding`.
    pub fn submit(&self) -> Result<Self, BufferError> {
        if self.sending {
            return Err(BufferError::Busy);
        }
        let code = self.code.text().trim().to_string();
        if code.is_empty() {
            return Err(BufferError::EmptyCode);
        }
        let qtty = parse_number(&self.qtty)
            .filter(|q| *q > 0.0)
            .ok_or(BufferError::InvalidQuantity)?;

        let entry = BufferEntry { code, qtty };
        let mut next = self.clone();
        match self.mode {
            Mode::Adding => {
                next.entries.push(entry);
                next.scroll_pending = true;
            }
            Mode::Editing { index } => {
                let len = next.entries.len();
                let slot = next
                    .entries
                    .get_mut(index)
                    .ok_or(BufferError::IndexOutOfRange { index, len })?;
                *slot = entry;
            }
        }
        next.mode = Mode::Adding;
        next.code = CodeField::default();
        next.qtty = DEFAULT_QTTY.to_string();
        Ok(next)
    }

    /// Switches to editing row `index` with both fields pre-filled.
    pub fn select_for_edit(&self, index: usize) -> Result<Self, BufferError> {
        if self.sending {
            return Err(BufferError::Busy);
        }
        let entry = self.entries.get(index).ok_or(BufferError::IndexOutOfRange {
            index,
            len: self.entries.len(),
        })?;
        Ok(Self {
            mode: Mode::Editing { index },
            code: CodeField::selected(&entry.code),
            qtty: format_number(entry.qtty),
            ..self.clone()
        })
    }

    /// Empties the buffer. Ignored while a send is in flight.
    pub fn clear(&self) -> Self {
        if self.sending {
            return self.clone();
        }
        Self {
            entries: Vec::new(),
            mode: Mode::Adding,
            scroll_pending: false,
            ..self.clone()
        }
    }

    pub fn acknowledge_scroll(&self) -> Self {
        Self {
            scroll_pending: false,
            ..self.clone()
        }
    }

    /// Marks a batch as in flight.
    pub fn begin_send(&self) -> Result<Self, BufferError> {
        if self.sending {
            return Err(BufferError::Busy);
        }
        if self.entries.is_empty() {
            return Err(BufferError::EmptyBuffer);
        }
        Ok(Self {
            sending: true,
            ..self.clone()
        })
    }

    /// Ends a batch. Only a complete send drops the entries; a partial one
    /// leaves every entry in place.
    pub fn finish_send(&self, all_sent: bool) -> Self {
        let mut next = Self {
            sending: false,
            ..self.clone()
        };
        if all_sent {
            next.entries.clear();
            next.mode = Mode::Adding;
            next.scroll_pending = false;
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(codes: &[(&str, &str)]) -> IntakeState {
        codes.iter().fold(IntakeState::new(), |state, (code, qtty)| {
            state
                .with_code(CodeField::typed(code))
                .with_qtty(qtty)
                .submit()
                .unwrap()
        })
    }

    #[test]
    fn adding_appends_one_normalized_entry() {
        let state = IntakeState::new()
            .with_code(CodeField::typed("  AB   12 "))
            .with_qtty(" 3 ");
        let next = state.submit().unwrap();

        assert_eq!(next.entries(), &[BufferEntry { code: "AB 12".into(), qtty: 3.0 }]);
        assert!(next.scroll_pending());
        assert_eq!(next.mode(), Mode::Adding);
        assert_eq!(next.code().text(), "");
        assert_eq!(next.qtty(), DEFAULT_QTTY);
    }

    #[test]
    fn typed_codes_are_capped() {
        assert_eq!(CodeField::typed("ABCDEFGH").text(), "ABCDEF");
        assert_eq!(CodeField::typed("a\t\tb").text(), "a b");
    }

    #[test]
    fn captured_codes_keep_the_tail() {
        let field = "12345678"
            .chars()
            .fold(CodeField::default(), |f, ch| f.push_captured(ch));
        assert_eq!(field.text(), "345678");
        assert_eq!(field.backspace().text(), "34567");
    }

    #[test]
    fn invalid_submits_point_at_the_field() {
        let state = IntakeState::new().with_code(CodeField::typed("   "));
        let err = state.submit().unwrap_err();
        assert_eq!(err, BufferError::EmptyCode);
        assert_eq!(err.field(), Some(Field::Code));

        for qtty in ["0", "-1", "abc", "", "inf"] {
            let state = IntakeState::new().with_code(CodeField::typed("A1")).with_qtty(qtty);
            let err = state.submit().unwrap_err();
            assert_eq!(err, BufferError::InvalidQuantity);
            assert_eq!(err.field(), Some(Field::Quantity));
        }
    }

    #[test]
    fn editing_replaces_in_place() {
        let state = filled(&[("A", "1"), ("B", "2"), ("C", "3")]).acknowledge_scroll();

        let editing = state.select_for_edit(1).unwrap();
        assert_eq!(editing.editing_index(), Some(1));
        assert_eq!(editing.code().text(), "B");
        assert!(editing.code().is_selected());
        assert_eq!(editing.qtty(), "2");

        let edited = editing
            .with_code(editing.code().push_captured('Z'))
            .with_qtty("7.5")
            .submit()
            .unwrap();
        assert_eq!(edited.editing_index(), None);
        assert!(!edited.scroll_pending());
        let codes: Vec<_> = edited.entries().iter().map(|e| (e.code.as_str(), e.qtty)).collect();
        assert_eq!(codes, vec![("A", 1.0), ("Z", 7.5), ("C", 3.0)]);
    }

    #[test]
    fn edit_selection_rejects_bad_index() {
        let state = filled(&[("A", "1")]);
        assert_eq!(
            state.select_for_edit(1).unwrap_err(),
            BufferError::IndexOutOfRange { index: 1, len: 1 }
        );
    }

    #[test]
    fn clear_resets_edit_state_unless_sending() {
        let editing = filled(&[("A", "1"), ("B", "1")]).select_for_edit(0).unwrap();
        let cleared = editing.clear();
        assert!(cleared.entries().is_empty());
        assert_eq!(cleared.editing_index(), None);

        let sending = filled(&[("A", "1")]).begin_send().unwrap();
        assert_eq!(sending.clear(), sending);
    }

    #[test]
    fn sending_blocks_mutations() {
        let sending = filled(&[("A", "1")]).begin_send().unwrap();
        assert_eq!(sending.begin_send().unwrap_err(), BufferError::Busy);
        assert_eq!(sending.select_for_edit(0).unwrap_err(), BufferError::Busy);
        let with_code = sending.with_code(CodeField::typed("B"));
        assert_eq!(with_code.submit().unwrap_err(), BufferError::Busy);
    }

    #[test]
    fn send_lifecycle() {
        assert_eq!(IntakeState::new().begin_send().unwrap_err(), BufferError::EmptyBuffer);

        let state = filled(&[("A", "1"), ("B", "1")]).select_for_edit(1).unwrap();
        let sending = state.begin_send().unwrap();
        assert!(sending.is_sending());

        let failed = sending.finish_send(false);
        assert!(!failed.is_sending());
        assert_eq!(failed.entries().len(), 2);

        let done = sending.finish_send(true);
        assert!(!done.is_sending());
        assert!(done.entries().is_empty());
        assert_eq!(done.editing_index(), None);
    }
}
