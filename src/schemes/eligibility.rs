//! Eligibility engine — pure function over (profile, dataset).
//!
//! Every scheme lands in exactly one of the two partitions, in dataset
//! order, with the reasons that put it there.

use serde::{Deserialize, Serialize};

use super::dataset::{Scheme, SchemeDataset};
use crate::agent_core::state::{MaritalStatus, Profile};

/// Reason attached to a scheme that passes every condition.
const ALL_CONDITIONS_MET: &str = "सभी पात्रता शर्तें पूरी होती हैं";

/// One scheme's verdict for a profile. Stored in `ConversationState`, so it
/// carries the display fields rather than a reference into the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeMatch {
    pub scheme_id: String,
    pub name: String,
    pub description: String,
    pub benefits: Option<String>,
    pub eligible: bool,
    pub reasons: Vec<String>,
}

/// Partitioned result of one eligibility run.
#[derive(Debug, Clone, Default)]
pub struct EligibilityReport {
    pub eligible: Vec<SchemeMatch>,
    pub ineligible: Vec<SchemeMatch>,
    pub total_checked: usize,
}

/// Check `profile` against every scheme in `dataset`.
pub fn check_eligibility(profile: &Profile, dataset: &SchemeDataset) -> EligibilityReport {
    let mut report = EligibilityReport {
        total_checked: dataset.len(),
        ..Default::default()
    };

    for scheme in dataset.schemes() {
        let verdict = check_scheme(scheme, profile);
        if verdict.eligible {
            report.eligible.push(verdict);
        } else {
            report.ineligible.push(verdict);
        }
    }

    tracing::info!(
        checked = report.total_checked,
        eligible = report.eligible.len(),
        "eligibility check complete"
    );

    report
}

/// Evaluate a single scheme. An unknown profile value fails any condition
/// that constrains it.
pub fn check_scheme(scheme: &Scheme, profile: &Profile) -> SchemeMatch {
    let rules = &scheme.eligibility;
    let mut reasons = Vec::new();

    if let Some(min_age) = rules.min_age {
        if profile.age.map_or(true, |age| age < min_age) {
            reasons.push(format!("उम्र कम से कम {min_age} होनी चाहिए"));
        }
    }

    if let Some(max_age) = rules.max_age {
        if profile.age.map_or(true, |age| age > max_age) {
            reasons.push(format!("उम्र {max_age} से अधिक नहीं होनी चाहिए"));
        }
    }

    if let Some(max_income) = rules.max_income {
        if profile.income.map_or(true, |income| income > max_income) {
            reasons.push(format!("आय {max_income:.0} से अधिक नहीं होनी चाहिए"));
        }
    }

    if let Some(gender) = rules.gender {
        if profile.gender != Some(gender) {
            reasons.push(format!("लिंग {} होना चाहिए", gender.label_hindi()));
        }
    }

    if let Some(ref categories) = rules.category {
        if !profile.category.is_some_and(|c| categories.contains(&c)) {
            let names: Vec<&str> = categories.iter().map(|c| c.as_str()).collect();
            reasons.push(format!("श्रेणी {} में होनी चाहिए", names.join(", ")));
        }
    }

    if let Some(ref occupations) = rules.occupation {
        let matches = profile
            .occupation
            .as_deref()
            .is_some_and(|o| occupations.iter().any(|allowed| allowed.eq_ignore_ascii_case(o)));
        if !matches {
            reasons.push(format!("व्यवसाय {} होना चाहिए", occupations.join(", ")));
        }
    }

    if let Some(required) = rules.is_student {
        if profile.is_student != Some(required) {
            reasons.push(if required {
                "छात्र होना चाहिए".to_string()
            } else {
                "छात्र नहीं होना चाहिए".to_string()
            });
        }
    }

    if let Some(required) = rules.has_disabilities {
        if profile.has_disabilities != Some(required) {
            reasons.push(if required {
                "विकलांगता होनी चाहिए".to_string()
            } else {
                "विकलांगता नहीं होनी चाहिए".to_string()
            });
        }
    }

    if let Some(status) = rules.marital_status {
        if profile.marital_status != Some(status) {
            reasons.push(format!("वैवाहिक स्थिति {} होनी चाहिए", marital_label(status)));
        }
    }

    let eligible = reasons.is_empty();
    if eligible {
        reasons.push(ALL_CONDITIONS_MET.to_string());
    }

    SchemeMatch {
        scheme_id: scheme.id.clone(),
        name: scheme.display_name().to_string(),
        description: scheme.display_description().to_string(),
        benefits: scheme.benefits.clone(),
        eligible,
        reasons,
    }
}

fn marital_label(status: MaritalStatus) -> &'static str {
    match status {
        MaritalStatus::Married => "विवाहित",
        MaritalStatus::Unmarried => "अविवाहित",
        MaritalStatus::Widowed => "विधवा/विधुर",
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_core::state::{Category, Gender};
    use crate::schemes::dataset::EligibilityCriteria;
    use std::collections::HashSet;

    fn scheme(id: &str, eligibility: EligibilityCriteria) -> Scheme {
        Scheme {
            id: id.to_string(),
            name_hindi: format!("योजना {id}"),
            name_english: None,
            description_hindi: None,
            description: Some(format!("{id} description")),
            benefits: None,
            eligibility,
        }
    }

    fn dataset() -> SchemeDataset {
        SchemeDataset::new(vec![
            scheme(
                "YOUTH",
                EligibilityCriteria {
                    min_age: Some(18),
                    max_age: Some(35),
                    max_income: Some(300_000.0),
                    ..Default::default()
                },
            ),
            scheme(
                "WOMEN",
                EligibilityCriteria {
                    gender: Some(Gender::Female),
                    ..Default::default()
                },
            ),
            scheme(
                "SC_ST",
                EligibilityCriteria {
                    category: Some(vec![Category::Sc, Category::St]),
                    ..Default::default()
                },
            ),
            scheme("OPEN", EligibilityCriteria::default()),
        ])
    }

    fn profile(age: u32, income: f64, gender: Gender) -> Profile {
        Profile {
            age: Some(age),
            income: Some(income),
            gender: Some(gender),
            ..Default::default()
        }
    }

    #[test]
    fn partitions_cover_dataset_without_overlap() {
        let data = dataset();
        for p in [
            profile(25, 150_000.0, Gender::Male),
            profile(60, 900_000.0, Gender::Female),
            Profile::default(),
        ] {
            let report = check_eligibility(&p, &data);
            let eligible: HashSet<_> = report.eligible.iter().map(|m| m.scheme_id.clone()).collect();
            let ineligible: HashSet<_> = report.ineligible.iter().map(|m| m.scheme_id.clone()).collect();
            assert!(eligible.is_disjoint(&ineligible));
            let all: HashSet<_> = eligible.union(&ineligible).cloned().collect();
            let expected: HashSet<_> = data.schemes().iter().map(|s| s.id.clone()).collect();
            assert_eq!(all, expected);
            assert_eq!(report.total_checked, data.len());
        }
    }

    #[test]
    fn young_male_matches_youth_and_open() {
        let report = check_eligibility(&profile(25, 150_000.0, Gender::Male), &dataset());
        let ids: Vec<&str> = report.eligible.iter().map(|m| m.scheme_id.as_str()).collect();
        assert_eq!(ids, vec!["YOUTH", "OPEN"]);
        assert_eq!(report.eligible[0].reasons, vec![ALL_CONDITIONS_MET.to_string()]);
    }

    #[test]
    fn income_over_limit_gives_reason() {
        let m = check_scheme(&dataset().schemes()[0], &profile(25, 500_000.0, Gender::Male));
        assert!(!m.eligible);
        assert_eq!(m.reasons.len(), 1);
        assert!(m.reasons[0].contains("300000"));
    }

    #[test]
    fn unknown_values_fail_constrained_conditions() {
        let m = check_scheme(&dataset().schemes()[2], &Profile::default());
        assert!(!m.eligible);
        assert!(m.reasons[0].contains("SC, ST"));
    }

    #[test]
    fn occupation_match_is_case_insensitive() {
        let pm_kisan = SchemeDataset::built_in();
        let mut p = profile(30, 100_000.0, Gender::Male);
        p.occupation = Some("Farmer".to_string());
        let report = check_eligibility(&p, &pm_kisan);
        assert_eq!(report.eligible.len(), 1);
    }
}
