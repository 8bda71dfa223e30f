//! Battle log lines shown to players

use serde::{Deserialize, Serialize};

/// Display colour of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogColor {
    Red,
    Green,
    Blue,
}

/// One line of the battle log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    pub text: String,
    pub color: LogColor,
}

impl ActionLogEntry {
    pub fn new(text: impl Into<String>, color: LogColor) -> Self {
        Self {
            text: text.into(),
            color,
        }
    }

    pub fn red(text: impl Into<String>) -> Self {
        Self::new(text, LogColor::Red)
    }

    pub fn green(text: impl Into<String>) -> Self {
        Self::new(text, LogColor::Green)
    }

    pub fn blue(text: impl Into<String>) -> Self {
        Self::new(text, LogColor::Blue)
    }
}

/// Format amounts for log lines: whole numbers bare, others with two decimals
pub fn format_amount(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(20.0), "20");
        assert_eq!(format_amount(2.5), "2.50");
    }

    #[test]
    fn test_log_color_serializes_lowercase() {
        let entry = ActionLogEntry::red("B takes 20 damage");
        let json = serde_json::to_string(&entry).expect("serializable");
        assert_eq!(json, r#"{"text":"B takes 20 damage","color":"red"}"#);
    }
}
