//! Combo tracking for rule-driven units

use serde::{Deserialize, Serialize};

/// Where a unit stands in a combo sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboStatus {
    pub in_combo: bool,
    /// Next action id to use, `None` for an empty combo
    pub next_id: Option<String>,
}

/// Match the tail of `history` against the head of `combo`
///
/// A partial match continues the combo; a complete match or no match
/// restarts it from the first id.
pub fn get_combo_status<S: AsRef<str>, T: AsRef<str>>(combo: &[S], history: &[T]) -> ComboStatus {
    let longest = combo.len().min(history.len());
    let matched = (1..=longest)
        .rev()
        .find(|&len| {
            history[history.len() - len..]
                .iter()
                .zip(&combo[..len])
                .all(|(done, step)| done.as_ref() == step.as_ref())
        })
        .unwrap_or(0);

    if matched > 0 && matched < combo.len() {
        ComboStatus {
            in_combo: true,
            next_id: Some(combo[matched].as_ref().to_string()),
        }
    } else {
        ComboStatus {
            in_combo: false,
            next_id: combo.first().map(|id| id.as_ref().to_string()),
        }
    }
}
