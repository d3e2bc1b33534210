//! Field normalization — numerals, units and closed vocabularies.
//!
//! Everything here is pure. The extractor and the oracle-payload path both
//! funnel raw values through these functions, so a value only reaches the
//! profile in canonical form.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::state::{Category, FieldValue, Gender, MaritalStatus};

/// Inclusive plausible age range.
pub const AGE_RANGE: std::ops::RangeInclusive<u32> = 1..=120;

/// Amount multipliers, matched against the word following a number.
/// Extend here; the extractor builds its income pattern from this table.
pub const UNIT_TABLE: &[(&str, f64)] = &[
    ("लाख", 100_000.0),
    ("lakh", 100_000.0),
    ("lakhs", 100_000.0),
    ("lac", 100_000.0),
    ("हजार", 1_000.0),
    ("ह\u{091C}\u{093C}ार", 1_000.0),
    ("thousand", 1_000.0),
];

// ─── Script Canonicalization ────────────────────────────────────────────────

/// Canonical form for matching: Devanagari digits become ASCII, precomposed
/// nukta letters are decomposed, and commas inside digit groups are dropped
/// (`1,50,000` → `150000`).
pub fn canonicalize(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    for (i, &c) in chars.iter().enumerate() {
        match c {
            '०'..='९' => {
                let digit = c as u32 - '०' as u32;
                out.push(char::from(b'0' + digit as u8));
            }
            ',' if i > 0
                && i + 1 < chars.len()
                && is_digit(chars[i - 1])
                && is_digit(chars[i + 1]) => {}
            '\u{0958}'..='\u{095F}' => {
                out.push(NUKTA_BASES[(c as u32 - 0x0958) as usize]);
                out.push('\u{093C}');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Base letters of U+0958..=U+095F (क़ ख़ ग़ ज़ ड़ ढ़ फ़ य़).
const NUKTA_BASES: [char; 8] = [
    '\u{0915}', '\u{0916}', '\u{0917}', '\u{091C}', '\u{0921}', '\u{0922}', '\u{092B}', '\u{092F}',
];

fn is_digit(c: char) -> bool {
    c.is_ascii_digit() || ('०'..='९').contains(&c)
}

/// Multiplier for a unit word, if it is one.
pub fn unit_multiplier(word: &str) -> Option<f64> {
    let word = canonicalize(word.trim()).to_lowercase();
    UNIT_TABLE
        .iter()
        .find(|(unit, _)| canonicalize(unit) == word)
        .map(|(_, mult)| *mult)
}

/// Regex alternation of every unit in `UNIT_TABLE`, longest first.
pub(crate) fn unit_alternation() -> String {
    let mut units: Vec<String> = UNIT_TABLE
        .iter()
        .map(|(u, _)| regex::escape(&canonicalize(u)))
        .collect();
    units.sort_by_key(|u| std::cmp::Reverse(u.len()));
    units.dedup();
    units.join("|")
}

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"([0-9]+(?:\.[0-9]+)?)\s*({})?",
        unit_alternation()
    ))
    .expect("amount pattern is valid")
});

/// Parse the first amount in `text`, applying a following unit word.
pub fn parse_amount(text: &str) -> Option<f64> {
    let canonical = canonicalize(text).to_lowercase();
    let caps = AMOUNT_RE.captures(&canonical)?;
    let number: f64 = caps.get(1)?.as_str().parse().ok()?;
    let multiplier = caps
        .get(2)
        .and_then(|m| unit_multiplier(m.as_str()))
        .unwrap_or(1.0);
    let amount = number * multiplier;
    (amount.is_finite() && amount >= 0.0).then_some(amount)
}

// ─── Typed Parsers ──────────────────────────────────────────────────────────

/// Age as an integer in `AGE_RANGE`.
pub fn parse_age(value: &Value) -> Option<u32> {
    let age = match value {
        Value::Number(n) => match n.as_u64() {
            Some(v) => v,
            None => {
                let f = n.as_f64()?;
                if f.fract() != 0.0 || f < 0.0 {
                    return None;
                }
                f as u64
            }
        },
        Value::String(s) => canonicalize(s.trim()).parse::<u64>().ok()?,
        _ => return None,
    };
    let age = u32::try_from(age).ok()?;
    AGE_RANGE.contains(&age).then_some(age)
}

/// Income from a number or a string such as `"1.5 लाख"` or `"₹1,50,000"`.
pub fn parse_income(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite() && *v >= 0.0),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

fn matches_any(text: &str, vocabulary: &[&str]) -> bool {
    vocabulary.iter().any(|v| canonicalize(v) == text)
}

const FEMALE_WORDS: &[&str] = &["female", "f", "woman", "महिला", "स्त्री", "औरत", "लड़की"];
const MALE_WORDS: &[&str] = &["male", "m", "man", "पुरुष", "आदमी", "लड़का"];

pub fn normalize_gender(raw: &str) -> Option<Gender> {
    let text = canonicalize(raw.trim()).to_lowercase();
    if matches_any(&text, FEMALE_WORDS) {
        Some(Gender::Female)
    } else if matches_any(&text, MALE_WORDS) {
        Some(Gender::Male)
    } else {
        None
    }
}

pub fn normalize_category(raw: &str) -> Option<Category> {
    let text = canonicalize(raw.trim()).to_lowercase();
    if matches_any(&text, &["sc", "एससी", "अनुसूचित जाति"]) {
        Some(Category::Sc)
    } else if matches_any(&text, &["st", "एसटी", "अनुसूचित जनजाति"]) {
        Some(Category::St)
    } else if matches_any(&text, &["obc", "ओबीसी", "अन्य पिछड़ा वर्ग", "पिछड़ा वर्ग"]) {
        Some(Category::Obc)
    } else if matches_any(&text, &["general", "gen", "सामान्य", "सामान्य वर्ग"]) {
        Some(Category::General)
    } else {
        None
    }
}

pub fn normalize_marital_status(raw: &str) -> Option<MaritalStatus> {
    let text = canonicalize(raw.trim()).to_lowercase();
    if matches_any(&text, &["unmarried", "single", "अविवाहित", "कुंवारा", "कुंवारी"]) {
        Some(MaritalStatus::Unmarried)
    } else if matches_any(&text, &["widowed", "widow", "widower", "विधवा", "विधुर"]) {
        Some(MaritalStatus::Widowed)
    } else if matches_any(&text, &["married", "विवाहित", "शादीशुदा"]) {
        Some(MaritalStatus::Married)
    } else {
        None
    }
}

/// Occupation vocabulary: surface form → canonical occupation.
pub const OCCUPATION_TABLE: &[(&str, &str)] = &[
    ("किसान", "farmer"),
    ("खेती", "farmer"),
    ("farmer", "farmer"),
    ("मजदूर", "labourer"),
    ("मज़दूर", "labourer"),
    ("labourer", "labourer"),
    ("laborer", "labourer"),
    ("शिक्षक", "teacher"),
    ("अध्यापक", "teacher"),
    ("teacher", "teacher"),
    ("बेरोजगार", "unemployed"),
    ("बेरोज़गार", "unemployed"),
    ("unemployed", "unemployed"),
];

/// Map a free-text occupation to its canonical name; unknown occupations
/// are kept lowercased.
pub fn normalize_occupation(raw: &str) -> Option<String> {
    let text = canonicalize(raw.trim()).to_lowercase();
    if text.is_empty() {
        return None;
    }
    let canonical = OCCUPATION_TABLE
        .iter()
        .find(|(surface, _)| text.contains(&canonicalize(surface)))
        .map(|(_, occupation)| occupation.to_string());
    Some(canonical.unwrap_or(text))
}

pub fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => {
            let text = s.trim().to_lowercase();
            if matches_any(&text, &["true", "yes", "हां", "हाँ", "हा"]) {
                Some(true)
            } else if matches_any(&text, &["false", "no", "नहीं", "ना"]) {
                Some(false)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Normalize one oracle-payload entry. Unknown keys and values that do not
/// normalize are discarded.
pub fn normalize_field(key: &str, value: &Value) -> Option<FieldValue> {
    match key {
        "age" => parse_age(value).map(FieldValue::Age),
        "annual_income" | "income" => parse_income(value).map(FieldValue::Income),
        "gender" => value.as_str().and_then(normalize_gender).map(FieldValue::Gender),
        "category" => value
            .as_str()
            .and_then(normalize_category)
            .map(FieldValue::Category),
        "occupation" => value
            .as_str()
            .and_then(normalize_occupation)
            .map(FieldValue::Occupation),
        "state" | "state_location" => value
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| FieldValue::StateLocation(s.to_string())),
        "is_student" => parse_flag(value).map(FieldValue::IsStudent),
        "has_disabilities" => parse_flag(value).map(FieldValue::HasDisabilities),
        "marital_status" => value
            .as_str()
            .and_then(normalize_marital_status)
            .map(FieldValue::MaritalStatus),
        _ => None,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonicalize_digits_commas_and_nukta() {
        assert_eq!(canonicalize("२५ साल"), "25 साल");
        assert_eq!(canonicalize("₹1,50,000"), "₹150000");
        assert_eq!(canonicalize("a, b"), "a, b");
        assert_eq!(canonicalize("\u{095B}"), "\u{091C}\u{093C}");
    }

    #[test]
    fn amounts_apply_units_from_table() {
        assert_eq!(parse_amount("1.5 लाख"), Some(150_000.0));
        assert_eq!(parse_amount("२ लाख रुपये"), Some(200_000.0));
        assert_eq!(parse_amount("50 हजार"), Some(50_000.0));
        assert_eq!(parse_amount("50 ह\u{095B}ार"), Some(50_000.0));
        assert_eq!(parse_amount("50 ह\u{091C}\u{093C}ार"), Some(50_000.0));
        assert_eq!(parse_amount("3 Lakh"), Some(300_000.0));
        assert_eq!(parse_amount("150000"), Some(150_000.0));
        assert_eq!(parse_amount("बहुत कम"), None);
        assert_eq!(unit_multiplier("thousand"), Some(1_000.0));
        assert_eq!(unit_multiplier("crore"), None);
    }

    #[test]
    fn ages_are_integers_in_range() {
        assert_eq!(parse_age(&json!(25)), Some(25));
        assert_eq!(parse_age(&json!(25.0)), Some(25));
        assert_eq!(parse_age(&json!("२५")), Some(25));
        assert_eq!(parse_age(&json!(25.5)), None);
        assert_eq!(parse_age(&json!(0)), None);
        assert_eq!(parse_age(&json!(121)), None);
        assert_eq!(parse_age(&json!(-3)), None);
        assert_eq!(parse_age(&json!("पच्चीस")), None);
    }

    #[test]
    fn income_accepts_numbers_and_strings() {
        assert_eq!(parse_income(&json!(150000)), Some(150_000.0));
        assert_eq!(parse_income(&json!("2 लाख")), Some(200_000.0));
        assert_eq!(parse_income(&json!(-1)), None);
        assert_eq!(parse_income(&json!(null)), None);
    }

    #[test]
    fn closed_vocabularies_discard_unknowns() {
        assert_eq!(normalize_gender("Male"), Some(Gender::Male));
        assert_eq!(normalize_gender("महिला"), Some(Gender::Female));
        assert_eq!(normalize_gender("other"), None);
        assert_eq!(normalize_category("obc"), Some(Category::Obc));
        assert_eq!(normalize_category("एससी"), Some(Category::Sc));
        assert_eq!(normalize_category("अनुसूचित जनजाति"), Some(Category::St));
        assert_eq!(normalize_category("EWS"), None);
        assert_eq!(normalize_marital_status("अविवाहित"), Some(MaritalStatus::Unmarried));
        assert_eq!(normalize_marital_status("married"), Some(MaritalStatus::Married));
    }

    #[test]
    fn occupation_maps_known_forms() {
        assert_eq!(normalize_occupation("मैं किसान हूं").as_deref(), Some("farmer"));
        assert_eq!(normalize_occupation("Driver").as_deref(), Some("driver"));
        assert_eq!(normalize_occupation("  "), None);
    }

    #[test]
    fn normalize_field_routes_payload_keys() {
        assert_eq!(
            normalize_field("annual_income", &json!("1 लाख")),
            Some(FieldValue::Income(100_000.0))
        );
        assert_eq!(
            normalize_field("state", &json!(" बिहार ")),
            Some(FieldValue::StateLocation("बिहार".to_string()))
        );
        assert_eq!(
            normalize_field("is_student", &json!("हां")),
            Some(FieldValue::IsStudent(true))
        );
        assert_eq!(normalize_field("gender", &json!(1)), None);
        assert_eq!(normalize_field("favourite_colour", &json!("blue")), None);
    }
}
