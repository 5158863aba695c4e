//! Candidate profile schema — the single structured output of the analysis
//! pipeline. Every extraction path (model-derived or heuristic) must produce
//! an instance that passes `validate()`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_HEADLINE_LEN: usize = 255;
pub const MAX_EDUCATION_LEN: usize = 255;

/// Criteria that must be present in `fit_scores` regardless of what else the
/// model returns.
pub const REQUIRED_FIT_CRITERIA: &[&str] = &["skills", "experience", "education", "culture"];

/// Work authorization status. Serialized exactly as the model is prompted to
/// emit it: `"EU"`, `"Visa"`, `"No"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkAuthorization {
    EU,
    Visa,
    No,
}

/// One professional experience entry. Dates are "YYYY-MM" strings or empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
}

/// One education entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub location: String,
}

/// Structured candidate profile extracted from a résumé.
///
/// List fields default to empty on deserialization so consumers never have
/// to distinguish "missing" from "empty".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub first_name: String,
    pub last_name: String,
    pub headline: String,
    pub summary: String,
    pub years_experience: f64,
    #[serde(default)]
    pub experiences: Vec<ExperienceEntry>,
    pub skills_primary: Vec<String>,
    #[serde(default)]
    pub skills_secondary: Vec<String>,
    /// Single-entry maps of language code → proficiency, e.g. `{"fr": "C2"}`.
    #[serde(default)]
    pub languages: Vec<BTreeMap<String, String>>,
    pub education_highest: String,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub locations_preferred: Vec<String>,
    #[serde(default)]
    pub salary_expectation_min: Option<u64>,
    #[serde(default)]
    pub salary_expectation_max: Option<u64>,
    /// "YYYY-MM-DD" when present.
    #[serde(default)]
    pub availability_date: Option<String>,
    pub work_authorization: WorkAuthorization,
    pub fit_score_overall: f64,
    pub fit_scores: BTreeMap<String, f64>,
}

impl CandidateProfile {
    /// Validates the structural and range constraints the schema promises:
    /// bounded non-empty identity fields, non-negative experience, all scores
    /// in [0, 100], required fit criteria present, salary bounds ordered, and
    /// language entries shaped as single-entry maps.
    pub fn validate(&self) -> Result<(), String> {
        check_bounded("first_name", &self.first_name, MAX_NAME_LEN)?;
        check_bounded("last_name", &self.last_name, MAX_NAME_LEN)?;
        check_bounded("headline", &self.headline, MAX_HEADLINE_LEN)?;
        check_bounded("education_highest", &self.education_highest, MAX_EDUCATION_LEN)?;

        if !self.years_experience.is_finite() || self.years_experience < 0.0 {
            return Err(format!(
                "years_experience must be a non-negative number, got {}",
                self.years_experience
            ));
        }

        check_score("fit_score_overall", self.fit_score_overall)?;
        for (criterion, score) in &self.fit_scores {
            check_score(criterion, *score)?;
        }
        for required in REQUIRED_FIT_CRITERIA {
            if !self.fit_scores.contains_key(*required) {
                return Err(format!("fit_scores is missing required criterion '{required}'"));
            }
        }

        if let (Some(min), Some(max)) = (self.salary_expectation_min, self.salary_expectation_max) {
            if min > max {
                return Err(format!(
                    "salary_expectation_min ({min}) exceeds salary_expectation_max ({max})"
                ));
            }
        }

        if let Some(date) = &self.availability_date {
            if chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
                return Err(format!("availability_date '{date}' is not a YYYY-MM-DD date"));
            }
        }

        for entry in &self.languages {
            if entry.len() != 1 {
                return Err(format!(
                    "languages entries must be single-entry maps, got {} keys",
                    entry.len()
                ));
            }
        }

        Ok(())
    }
}

fn check_bounded(field: &str, value: &str, max_len: usize) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    if value.chars().count() > max_len {
        return Err(format!("{field} exceeds {max_len} characters"));
    }
    Ok(())
}

fn check_score(name: &str, score: f64) -> Result<(), String> {
    if !score.is_finite() || !(0.0..=100.0).contains(&score) {
        return Err(format!("score '{name}' must be within [0, 100], got {score}"));
    }
    Ok(())
}

#[cfg(test)]
impl CandidateProfile {
    /// Fixture used across the crate's test modules.
    pub(crate) fn sample() -> Self {
        CandidateProfile {
            first_name: "Marie".to_string(),
            last_name: "Dupont".to_string(),
            headline: "Senior Backend Engineer".to_string(),
            summary: "Ten years of backend work.".to_string(),
            years_experience: 10.0,
            experiences: vec![],
            skills_primary: vec!["Rust".to_string()],
            skills_secondary: vec![],
            languages: vec![BTreeMap::from([("fr".to_string(), "C2".to_string())])],
            education_highest: "Master Informatique".to_string(),
            education: vec![],
            interests: vec![],
            locations_preferred: vec![],
            salary_expectation_min: None,
            salary_expectation_max: None,
            availability_date: None,
            work_authorization: WorkAuthorization::EU,
            fit_score_overall: 85.0,
            fit_scores: BTreeMap::from([
                ("skills".to_string(), 88.0),
                ("experience".to_string(), 90.0),
                ("education".to_string(), 75.0),
                ("culture".to_string(), 80.0),
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_profile() -> CandidateProfile {
        CandidateProfile::sample()
    }

    #[test]
    fn test_valid_profile_passes() {
        assert!(minimal_profile().validate().is_ok());
    }

    #[test]
    fn test_empty_first_name_rejected() {
        let mut profile = minimal_profile();
        profile.first_name = "   ".to_string();
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_negative_years_rejected() {
        let mut profile = minimal_profile();
        profile.years_experience = -1.0;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_score_above_100_rejected() {
        let mut profile = minimal_profile();
        profile.fit_scores.insert("skills".to_string(), 101.0);
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_overall_score_out_of_range_rejected() {
        let mut profile = minimal_profile();
        profile.fit_score_overall = 120.0;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_missing_required_criterion_rejected() {
        let mut profile = minimal_profile();
        profile.fit_scores.remove("culture");
        let err = profile.validate().unwrap_err();
        assert!(err.contains("culture"), "unexpected error: {err}");
    }

    #[test]
    fn test_salary_bounds_ordering() {
        let mut profile = minimal_profile();
        profile.salary_expectation_min = Some(60_000);
        profile.salary_expectation_max = Some(50_000);
        assert!(profile.validate().is_err());

        profile.salary_expectation_max = Some(70_000);
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_malformed_availability_date_rejected() {
        let mut profile = minimal_profile();
        profile.availability_date = Some("soon".to_string());
        assert!(profile.validate().is_err());

        profile.availability_date = Some("2026-10-01".to_string());
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_multi_key_language_entry_rejected() {
        let mut profile = minimal_profile();
        profile.languages.push(BTreeMap::from([
            ("fr".to_string(), "C2".to_string()),
            ("en".to_string(), "B2".to_string()),
        ]));
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_work_authorization_serde_round_trip() {
        for (variant, expected) in [
            (WorkAuthorization::EU, "\"EU\""),
            (WorkAuthorization::Visa, "\"Visa\""),
            (WorkAuthorization::No, "\"No\""),
        ] {
            assert_eq!(serde_json::to_string(&variant).unwrap(), expected);
        }
        assert!(serde_json::from_str::<WorkAuthorization>("\"Maybe\"").is_err());
    }

    #[test]
    fn test_list_fields_default_to_empty_on_deserialize() {
        let json = serde_json::json!({
            "first_name": "Jean",
            "last_name": "Martin",
            "headline": "Engineer",
            "summary": "s",
            "years_experience": 2.0,
            "skills_primary": ["Python"],
            "education_highest": "Licence",
            "work_authorization": "EU",
            "fit_score_overall": 70.0,
            "fit_scores": {"skills": 70.0, "experience": 70.0, "education": 70.0, "culture": 70.0}
        });
        let profile: CandidateProfile = serde_json::from_value(json).unwrap();
        assert!(profile.experiences.is_empty());
        assert!(profile.languages.is_empty());
        assert!(profile.interests.is_empty());
        assert!(profile.validate().is_ok());
    }
}
