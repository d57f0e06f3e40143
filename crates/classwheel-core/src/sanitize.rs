// Turn loosely-shaped JSON question records into valid `QuizItem`s.
//
// Generated output is untrusted: fields may be missing, mistyped, or carry
// half-escaped chemistry markup. Nothing in here fails; bad records are
// coerced or dropped.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;
use tracing::debug;

use crate::quiz::{QuizItem, MAX_CORRECT_INDEX, OPTION_COUNT, OPTION_LABELS};

/// A `ce{` macro, with its backslash if it has one.
static CHEMISTRY_MACRO: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\?ce\{").unwrap());

/// Sanitize a batch of raw records, dropping those without question text.
pub fn sanitize_records(records: &[Value]) -> Vec<QuizItem> {
    let items: Vec<QuizItem> = records.iter().filter_map(sanitize_record).collect();
    debug!(raw = records.len(), kept = items.len(), "records sanitized");
    items
}

/// Sanitize one record. `None` when the question text is blank.
pub fn sanitize_record(record: &Value) -> Option<QuizItem> {
    let question = question_text(record);
    if question.trim().is_empty() {
        return None;
    }
    Some(QuizItem::new(
        question,
        options(record.get("options")),
        correct_index(record.get("correct")),
    ))
}

fn question_text(record: &Value) -> String {
    let primary = record.get("q").map(coerce_text).unwrap_or_default();
    if !primary.is_empty() {
        return primary;
    }
    record.get("question").map(coerce_text).unwrap_or_default()
}

fn options(raw: Option<&Value>) -> [String; OPTION_COUNT] {
    let given: &[Value] = match raw {
        Some(Value::Array(values)) => values,
        _ => &[],
    };
    std::array::from_fn(|i| match given.get(i) {
        Some(value) => coerce_text(value),
        None => OPTION_LABELS[i].to_string(),
    })
}

fn correct_index(raw: Option<&Value>) -> usize {
    let index = match raw {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => parse_leading_int(s).unwrap_or(0),
        _ => 0,
    };
    index.clamp(0, MAX_CORRECT_INDEX as i64) as usize
}

/// Parse an optionally signed run of leading digits, ignoring leading
/// whitespace and anything after the digits (`" 2)"` -> 2, `"B"` -> None).
fn parse_leading_int(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (sign, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    // Anything too long to fit is far outside [0, 3] anyway.
    let magnitude = digits.parse::<i64>().unwrap_or(i64::MAX);
    Some(sign * magnitude)
}

fn coerce_text(value: &Value) -> String {
    match value {
        Value::String(s) => repair_chemistry_markup(s),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => repair_chemistry_markup(&other.to_string()),
    }
}

/// Ensure every `ce{` chemistry macro carries its leading backslash.
///
/// `$ce{H2O}$` becomes `$\ce{H2O}$` and `ce{CO2}` becomes `\ce{CO2}`;
/// already-escaped `\ce{` is left alone.
pub fn repair_chemistry_markup(text: &str) -> String {
    CHEMISTRY_MACRO
        .replace_all(text, |caps: &Captures| {
            let found = &caps[0];
            if found.starts_with('\\') {
                found.to_string()
            } else {
                format!("\\{found}")
            }
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn well_formed_record_passes_through() {
        let items = sanitize_records(&[json!({
            "q": "Công thức của nước?",
            "options": ["H2O", "CO2", "O2", "N2"],
            "correct": 0
        })]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].question(), "Công thức của nước?");
        assert_eq!(items[0].options()[1], "CO2");
        assert_eq!(items[0].correct(), 0);
    }

    #[test]
    fn question_key_is_a_fallback() {
        let items = sanitize_records(&[json!({"question": "Fallback?", "options": []})]);
        assert_eq!(items[0].question(), "Fallback?");
    }

    #[test]
    fn blank_questions_are_dropped() {
        let items = sanitize_records(&[
            json!({"q": "   ", "options": ["a", "b", "c", "d"]}),
            json!({"options": ["a", "b", "c", "d"]}),
            json!({"q": null}),
            json!({"q": "kept"}),
        ]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].question(), "kept");
    }

    #[test]
    fn correct_index_is_clamped() {
        let high = sanitize_records(&[json!({"q": "x", "correct": 7})]);
        let low = sanitize_records(&[json!({"q": "x", "correct": -2})]);
        assert_eq!(high[0].correct(), 3);
        assert_eq!(low[0].correct(), 0);
    }

    #[test]
    fn correct_index_from_string_and_float() {
        let cases = [
            (json!("2"), 2),
            (json!(" 1) B"), 1),
            (json!("C"), 0),
            (json!("99"), 3),
            (json!(2.9), 2),
            (json!(true), 0),
            (json!(null), 0),
        ];
        for (raw, expected) in cases {
            let items = sanitize_records(&[json!({"q": "x", "correct": raw.clone()})]);
            assert_eq!(items[0].correct(), expected, "correct = {raw}");
        }
    }

    #[test]
    fn options_are_truncated_to_four() {
        let items = sanitize_records(&[json!({
            "q": "x",
            "options": ["1", "2", "3", "4", "5", "6"]
        })]);
        assert_eq!(items[0].options(), &["1", "2", "3", "4"].map(String::from));
    }

    #[test]
    fn short_options_are_padded_with_letters() {
        let items = sanitize_records(&[json!({"q": "x", "options": ["yes", "no"]})]);
        assert_eq!(items[0].options(), &["yes", "no", "C", "D"].map(String::from));
    }

    #[test]
    fn missing_or_non_array_options_become_letters() {
        let items = sanitize_records(&[
            json!({"q": "x"}),
            json!({"q": "y", "options": "A, B, C, D"}),
        ]);
        for item in items {
            assert_eq!(item.options(), &["A", "B", "C", "D"].map(String::from));
        }
    }

    #[test]
    fn non_string_options_are_stringified() {
        let items = sanitize_records(&[json!({"q": "x", "options": [1, 2.5, false, null]})]);
        assert_eq!(items[0].options(), &["1", "2.5", "false", ""].map(String::from));
    }

    #[test]
    fn chemistry_markup_gains_missing_backslash() {
        assert_eq!(repair_chemistry_markup("$ce{H2O}$"), "$\\ce{H2O}$");
        assert_eq!(repair_chemistry_markup("ce{CO2}"), "\\ce{CO2}");
        assert_eq!(repair_chemistry_markup("gas ce{O2} rises"), "gas \\ce{O2} rises");
        assert_eq!(repair_chemistry_markup("$\\ce{NaCl}$"), "$\\ce{NaCl}$");
        assert_eq!(
            repair_chemistry_markup("$ce{A}$ + $ce{B}$"),
            "$\\ce{A}$ + $\\ce{B}$"
        );
        assert_eq!(
            repair_chemistry_markup("ce{ce{X}}"),
            "\\ce{\\ce{X}}"
        );
        assert_eq!(repair_chemistry_markup("no markup"), "no markup");
    }

    #[test]
    fn markup_repair_applies_to_options_too() {
        let items = sanitize_records(&[json!({
            "q": "Chất nào là muối?",
            "options": ["$ce{NaCl}$", "$ce{HCl}$", "$ce{NaOH}$", "$ce{H2O}$"]
        })]);
        assert_eq!(items[0].options()[0], "$\\ce{NaCl}$");
    }
}
