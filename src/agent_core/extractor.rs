//! Regex field extractor — deterministic, offline, always available.
//!
//! Used on its own whenever the oracle payload is missing, unparseable or
//! below the confidence threshold. Input is canonicalized first (see
//! `normalize::canonicalize`), so every pattern matches ASCII digits only.

use std::sync::LazyLock;

use regex::Regex;

use super::normalize::{self, canonicalize, AGE_RANGE};
use super::state::{Category, FieldValue, Gender, MaritalStatus};
use super::text::words;

const NUMBER: &str = r"([0-9]+(?:\.[0-9]+)?)";

/// `25 साल`, `25 वर्ष`, `25 years`.
static AGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9.])([0-9]{1,3})\s*(?:साल|वर्ष|years?|yrs?)").expect("age pattern is valid")
});

/// `उम्र 25`, `आयु: 25`, `age 25`.
static AGE_CONTEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:उम्र|आयु|age)[^0-9]{0,15}?([0-9]{1,3})(?:[^0-9]|$)")
        .expect("age context pattern is valid")
});

/// Number followed by a unit from the unit table.
static INCOME_UNIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{NUMBER}\s*({})", normalize::unit_alternation()))
        .expect("income unit pattern is valid")
});

/// `150000 रुपये`, `₹150000`, `rs 150000`.
static INCOME_CURRENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"{NUMBER}\s*(?:रुपये|रुपए|रुपया|रु\.?|rupees?|rs\.?|inr|₹)|(?:₹|rs\.?|inr)\s*{NUMBER}"
    ))
    .expect("income currency pattern is valid")
});

/// `आय 150000`, `income: 150000`. Excludes `आयु` (age).
static INCOME_CONTEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?:आय|आमदनी|कमाई|income|salary)(?:[^0-9ु][^0-9]{{0,15}}?)?{NUMBER}"
    ))
    .expect("income context pattern is valid")
});

/// State names, Hindi and English, to a canonical English name.
const STATE_TABLE: &[(&str, &str)] = &[
    ("उत्तर प्रदेश", "Uttar Pradesh"),
    ("uttar pradesh", "Uttar Pradesh"),
    ("मध्य प्रदेश", "Madhya Pradesh"),
    ("madhya pradesh", "Madhya Pradesh"),
    ("बिहार", "Bihar"),
    ("bihar", "Bihar"),
    ("राजस्थान", "Rajasthan"),
    ("rajasthan", "Rajasthan"),
    ("महाराष्ट्र", "Maharashtra"),
    ("maharashtra", "Maharashtra"),
    ("दिल्ली", "Delhi"),
    ("delhi", "Delhi"),
];

/// Extract every recognisable profile field from `utterance`.
///
/// Returns at most one value per field, in profile order.
pub fn extract_fields(utterance: &str) -> Vec<FieldValue> {
    let text = canonicalize(utterance).to_lowercase();
    let tokens = words(&text);

    let mut fields = Vec::new();
    if let Some(age) = extract_age(&text) {
        fields.push(FieldValue::Age(age));
    }
    if let Some(income) = extract_income(&text) {
        fields.push(FieldValue::Income(income));
    }
    if let Some(gender) = extract_gender(&tokens) {
        fields.push(FieldValue::Gender(gender));
    }
    if let Some(occupation) = extract_occupation(&text) {
        fields.push(FieldValue::Occupation(occupation));
    }
    if let Some(category) = extract_category(&text, &tokens) {
        fields.push(FieldValue::Category(category));
    }
    if let Some(state) = extract_state(&text) {
        fields.push(FieldValue::StateLocation(state));
    }
    // whole words: "छात्रवृत्ति" (scholarship) is not a student claim
    if tokens
        .iter()
        .any(|t| ["छात्र", "छात्रा", "विद्यार्थी", "student"].contains(t))
    {
        fields.push(FieldValue::IsStudent(true));
    }
    if contains_any(&text, &["विकलांग", "दिव्यांग", "disabled", "disability"]) {
        fields.push(FieldValue::HasDisabilities(true));
    }
    if let Some(status) = extract_marital_status(&text) {
        fields.push(FieldValue::MaritalStatus(status));
    }
    fields
}

fn extract_age(text: &str) -> Option<u32> {
    AGE_RE
        .captures_iter(text)
        .chain(AGE_CONTEXT_RE.captures_iter(text))
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .find(|age| AGE_RANGE.contains(age))
}

fn extract_income(text: &str) -> Option<f64> {
    let amount = if let Some(caps) = INCOME_UNIT_RE.captures(text) {
        let number: f64 = caps.get(1)?.as_str().parse().ok()?;
        number * normalize::unit_multiplier(caps.get(2)?.as_str())?
    } else if let Some(caps) = INCOME_CURRENCY_RE.captures(text) {
        let number = caps.get(1).or_else(|| caps.get(2))?;
        number.as_str().parse().ok()?
    } else {
        INCOME_CONTEXT_RE.captures(text)?.get(1)?.as_str().parse().ok()?
    };
    // Overlong digit runs parse to infinity.
    (amount.is_finite() && amount >= 0.0).then_some(amount)
}

fn extract_gender(tokens: &[&str]) -> Option<Gender> {
    // Whole words only: "female" contains "male".
    tokens
        .iter()
        .find_map(|t| normalize::normalize_gender(t))
}

fn extract_occupation(text: &str) -> Option<String> {
    normalize::OCCUPATION_TABLE
        .iter()
        .find(|(surface, _)| text.contains(&canonicalize(surface)))
        .map(|(_, occupation)| occupation.to_string())
}

fn extract_category(text: &str, tokens: &[&str]) -> Option<Category> {
    // Multi-word phrases before single tokens.
    if contains_any(text, &["अनुसूचित जनजाति"]) {
        return Some(Category::St);
    }
    if contains_any(text, &["अनुसूचित जाति"]) {
        return Some(Category::Sc);
    }
    if contains_any(text, &["पिछड़ा वर्ग"]) {
        return Some(Category::Obc);
    }
    if contains_any(text, &["सामान्य वर्ग", "सामान्य श्रेणी", "सामान्य जाति"]) {
        return Some(Category::General);
    }
    tokens.iter().find_map(|t| match *t {
        // bare "सामान्य" is too common to mean the category
        "सामान्य" => None,
        other => normalize::normalize_category(other),
    })
}

fn extract_state(text: &str) -> Option<String> {
    STATE_TABLE
        .iter()
        .find(|(surface, _)| text.contains(surface))
        .map(|(_, name)| name.to_string())
}

fn extract_marital_status(text: &str) -> Option<MaritalStatus> {
    if contains_any(text, &["अविवाहित", "कुंवारा", "कुंवारी", "unmarried"]) {
        Some(MaritalStatus::Unmarried)
    } else if contains_any(text, &["विधवा", "विधुर", "widow"]) {
        Some(MaritalStatus::Widowed)
    } else if contains_any(text, &["विवाहित", "शादीशुदा", "married"]) {
        Some(MaritalStatus::Married)
    } else {
        None
    }
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(&canonicalize(n)))
}

// ─── Tests ──────────────────────────────────────────────────────────────────
