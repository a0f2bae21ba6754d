//! Cell parsing and number formatting in the source locale: `.` groups
//! thousands and `,` marks decimals ("1.500,50" is 1500.50).

use crate::config::Plausibility;
use crate::search::tokenizer::fold_accents;
use serde_json::Value;
use std::sync::LazyLock;

static NUMBER_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^-?\d+(?:\.\d+)?$").expect("number regex is valid")
});

/// Column names that hold codes, table numbers or budget classifiers rather
/// than amounts. Matched against the folded name.
static IRRELEVANT_COLUMN_RES: LazyLock<Vec<regex::Regex>> = LazyLock::new(|| {
    [
        r"^numero|^n[º°]|num",
        r"^tabla|^tipologia|^tipo[^a-z]",
        r"^cod|^id|^ref",
        r"^jurisdiccion|^prog|^categ|^fuente|^actividad",
        r"^columna|^sin_nombre",
    ]
    .iter()
    .map(|p| regex::Regex::new(p).expect("column denylist regex is valid"))
    .collect()
});

/// Parse a locale-formatted number. Whitespace and `$` are ignored.
///
/// Without a comma, a single `.` followed by other than three digits is read
/// as a decimal point ("12.5"), otherwise dots group thousands ("1.500").
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '$')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else if has_decimal_point(&cleaned) {
        cleaned
    } else {
        cleaned.replace('.', "")
    };

    if !NUMBER_RE.is_match(&normalized) {
        return None;
    }
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn has_decimal_point(s: &str) -> bool {
    let mut parts = s.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(frac), None) => frac.len() != 3,
        _ => false,
    }
}

/// Numeric value of a JSON cell, without any plausibility screening.
pub fn value_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// Numeric value of a cell that is plausible as a monetary amount.
pub fn parse_amount(value: &Value, guard: &Plausibility) -> Option<f64> {
    value_number(value).filter(|v| guard.accepts(*v))
}

pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
        other => other.to_string(),
    }
}

/// Whether a column may take part in numeric aggregation.
pub fn is_relevant_column(name: &str) -> bool {
    let folded = fold_accents(name.trim());
    !IRRELEVANT_COLUMN_RES.iter().any(|re| re.is_match(&folded))
}

/// Format with `.` thousands and `,` decimals; whole numbers drop the decimals.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let fixed = format!("{:.2}", value.abs());
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*c);
    }

    let sign = if value < 0.0 && fixed != "0.00" {
        "-"
    } else {
        ""
    };
    if dec_part == "00" {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{},{}", sign, grouped, dec_part)
    }
}
