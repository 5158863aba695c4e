//! Persistence-ready candidature record — the flat shape handed to the
//! storage boundary after analysis. Mirrors the profile fields plus record
//! bookkeeping (status/priority defaults, model version, provenance,
//! analysis timestamp).

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::orchestrator::{AnalysisOutcome, Provenance};
use crate::models::profile::{EducationEntry, ExperienceEntry, WorkAuthorization};

pub const STATUS_SUBMITTED: &str = "submitted";
pub const PRIORITY_NORMAL: &str = "normal";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatureRecord {
    pub id: Uuid,
    /// Reference to the stored résumé document.
    pub resume: String,
    pub cv_url: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub headline: String,
    pub summary: String,
    pub years_experience: f64,
    pub experiences: Vec<ExperienceEntry>,
    pub skills_primary: Vec<String>,
    pub skills_secondary: Vec<String>,
    pub languages: Vec<BTreeMap<String, String>>,
    pub education_highest: String,
    pub education: Vec<EducationEntry>,
    pub interests: Vec<String>,
    pub locations_preferred: Vec<String>,
    pub salary_expectation_min: Option<u64>,
    pub salary_expectation_max: Option<u64>,
    /// Parsed from the profile's string field; malformed dates are dropped.
    pub availability_date: Option<NaiveDate>,
    pub work_authorization: WorkAuthorization,
    pub status: String,
    pub priority: String,
    pub fit_score_overall: f64,
    pub fit_scores: BTreeMap<String, f64>,
    pub model_version: String,
    pub provenance: Provenance,
    pub analyzed_at: DateTime<Utc>,
}

impl CandidatureRecord {
    /// Maps an analysis outcome into the record shape the persistence
    /// boundary consumes. `email` comes from the text-submission form and is
    /// record-keeping only; it never influences analysis.
    pub fn from_outcome(outcome: AnalysisOutcome, resume_url: &str, email: Option<String>) -> Self {
        let AnalysisOutcome {
            profile,
            model_version,
            provenance,
        } = outcome;

        let availability_date = profile.availability_date.as_deref().and_then(|raw| {
            match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    tracing::debug!("dropping malformed availability_date '{raw}'");
                    None
                }
            }
        });

        CandidatureRecord {
            id: Uuid::new_v4(),
            resume: resume_url.to_string(),
            cv_url: resume_url.to_string(),
            first_name: profile.first_name,
            last_name: profile.last_name,
            email,
            headline: profile.headline,
            summary: profile.summary,
            years_experience: profile.years_experience,
            experiences: profile.experiences,
            skills_primary: profile.skills_primary,
            skills_secondary: profile.skills_secondary,
            languages: profile.languages,
            education_highest: profile.education_highest,
            education: profile.education,
            interests: profile.interests,
            locations_preferred: profile.locations_preferred,
            salary_expectation_min: profile.salary_expectation_min,
            salary_expectation_max: profile.salary_expectation_max,
            availability_date,
            work_authorization: profile.work_authorization,
            status: STATUS_SUBMITTED.to_string(),
            priority: PRIORITY_NORMAL.to_string(),
            fit_score_overall: profile.fit_score_overall,
            fit_scores: profile.fit_scores,
            model_version,
            provenance,
            analyzed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::CandidateProfile;

    fn outcome_with(profile: CandidateProfile) -> AnalysisOutcome {
        AnalysisOutcome {
            profile,
            model_version: "claude-test-v1.0".to_string(),
            provenance: Provenance::ModelDerived,
        }
    }

    #[test]
    fn test_record_defaults() {
        let record = CandidatureRecord::from_outcome(
            outcome_with(CandidateProfile::sample()),
            "uploads/cv.pdf",
            Some("marie@example.org".to_string()),
        );
        assert_eq!(record.status, STATUS_SUBMITTED);
        assert_eq!(record.priority, PRIORITY_NORMAL);
        assert_eq!(record.resume, "uploads/cv.pdf");
        assert_eq!(record.cv_url, "uploads/cv.pdf");
        assert_eq!(record.model_version, "claude-test-v1.0");
        assert_eq!(record.email.as_deref(), Some("marie@example.org"));
    }

    #[test]
    fn test_well_formed_availability_date_parsed() {
        let mut profile = CandidateProfile::sample();
        profile.availability_date = Some("2026-10-01".to_string());
        let record = CandidatureRecord::from_outcome(outcome_with(profile), "u", None);
        assert_eq!(
            record.availability_date,
            NaiveDate::from_ymd_opt(2026, 10, 1)
        );
    }

    #[test]
    fn test_malformed_availability_date_dropped_silently() {
        let mut profile = CandidateProfile::sample();
        profile.availability_date = Some("next month".to_string());
        let record = CandidatureRecord::from_outcome(outcome_with(profile), "u", None);
        assert!(record.availability_date.is_none());
    }

    #[test]
    fn test_provenance_carried_through() {
        let outcome = AnalysisOutcome {
            profile: CandidateProfile::sample(),
            model_version: "claude-test-v1.0".to_string(),
            provenance: Provenance::HeuristicFallback,
        };
        let record = CandidatureRecord::from_outcome(outcome, "u", None);
        assert_eq!(record.provenance, Provenance::HeuristicFallback);
    }
}
