use crate::client::buffer::{IntakeState, CODE_WIDTH};
use crate::protocol::format_number;

/// Plain-text table of the buffer. The row being edited is marked with `*`.
pub fn render_table(state: &IntakeState) -> String {
    if state.entries().is_empty() {
        return "(buffer empty)\n".to_string();
    }

    let mut out = format!("  {:>3}  {:<width$}  {:>8}\n", "#", "Code", "Qty", width = CODE_WIDTH);
    for (index, entry) in state.entries().iter().enumerate() {
        let marker = if state.editing_index() == Some(index) { '*' } else { ' ' };
        out.push_str(&format!(
            "{marker} {:>3}  {:<width$}  {:>8}\n",
            index + 1,
            entry.code,
            format_number(entry.qtty),
            width = CODE_WIDTH
        ));
    }
    out.push_str(&format!(
        "{} pending{}\n",
        state.entries().len(),
        if state.is_sending() { " (sending…)" } else { "" }
    ));
    out
}
