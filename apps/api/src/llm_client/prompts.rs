// Prompt constants for CV profile extraction.
//
// The model must answer with a single JSON object matching CandidateProfile
// field-by-field; the response parser rejects anything else. Formatting rules
// (dates, language entries, score ranges) are spelled out explicitly because
// schema validation is strict.

pub const PROFILE_EXTRACTION_SYSTEM: &str = "You are an expert HR analyst. \
    You MUST respond with a single valid JSON object only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

const PROFILE_CONSTRAINTS: &str = "\
IMPORTANT CONSTRAINTS:
- Respond ONLY with valid JSON, no additional text
- All scores must be between 0 and 100
- work_authorization: 'EU', 'Visa', or 'No'
- availability_date format: 'YYYY-MM-DD' or null
- languages format: [{\"language_code\": \"level\"}] e.g. [{\"fr\": \"C2\"}, {\"en\": \"B2\"}]
- experiences format: [{\"start_date\": \"YYYY-MM\", \"end_date\": \"YYYY-MM\", \"company\": \"name\", \"position\": \"role\", \"location\": \"city\", \"description\": \"short description\"}]
- education format: [{\"start_date\": \"YYYY-MM\", \"end_date\": \"YYYY-MM\", \"school\": \"school\", \"degree\": \"degree\", \"field\": \"field\", \"location\": \"city\"}]

EVALUATION CRITERIA for fit_scores:
- skills: relevance and level of technical skills
- experience: years of experience and quality of positions held
- education: level and relevance of training
- culture: cultural adaptability and soft skills
- overall: global fit for the position";

const PROFILE_JSON_SHAPE: &str = "\
EXPECTED JSON:
{
  \"first_name\": \"string (candidate first name)\",
  \"last_name\": \"string (candidate last name)\",
  \"headline\": \"string (catchy professional title)\",
  \"summary\": \"string (2-3 sentence summary of the candidate's profile and career)\",
  \"years_experience\": float,
  \"experiences\": [
    {\"start_date\": \"2020-01\", \"end_date\": \"2024-03\", \"company\": \"Company name\", \"position\": \"Role held\", \"location\": \"City\", \"description\": \"Responsibilities\"}
  ],
  \"skills_primary\": [\"skill1\", \"skill2\", \"skill3\"],
  \"skills_secondary\": [\"skill4\", \"skill5\"],
  \"languages\": [{\"fr\": \"C2\"}, {\"en\": \"B2\"}],
  \"education_highest\": \"string (e.g. Master Informatique)\",
  \"education\": [
    {\"start_date\": \"2016-09\", \"end_date\": \"2018-06\", \"school\": \"School name\", \"degree\": \"Degree obtained\", \"field\": \"Field of study\", \"location\": \"City\"}
  ],
  \"interests\": [\"sport\", \"reading\", \"travel\"],
  \"locations_preferred\": [\"Paris\", \"Remote\"],
  \"salary_expectation_min\": int_or_null,
  \"salary_expectation_max\": int_or_null,
  \"availability_date\": \"YYYY-MM-DD_or_null\",
  \"work_authorization\": \"EU|Visa|No\",
  \"fit_score_overall\": float_0_100,
  \"fit_scores\": {
    \"skills\": float_0_100,
    \"experience\": float_0_100,
    \"education\": float_0_100,
    \"culture\": float_0_100
  }
}";

/// Builds the text-mode prompt with the extracted CV text embedded.
pub fn text_mode_prompt(cv_text: &str) -> String {
    format!(
        "Analyze this CV and extract the following information as strict JSON.\n\n\
         {PROFILE_CONSTRAINTS}\n\n\
         CV TO ANALYZE:\n{cv_text}\n\n\
         {PROFILE_JSON_SHAPE}"
    )
}

/// Builds the direct-document prompt; the PDF travels as an attached
/// base64 document block in the same message.
pub fn direct_mode_prompt() -> String {
    format!(
        "Analyze this CV PDF and extract the following information as strict JSON.\n\n\
         {PROFILE_CONSTRAINTS}\n\n\
         {PROFILE_JSON_SHAPE}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_prompt_embeds_cv_and_all_fields() {
        let prompt = text_mode_prompt("JEAN MARTIN\n10 years of experience");
        assert!(prompt.contains("JEAN MARTIN"));
        for field in [
            "first_name",
            "last_name",
            "headline",
            "summary",
            "years_experience",
            "experiences",
            "skills_primary",
            "skills_secondary",
            "languages",
            "education_highest",
            "education",
            "interests",
            "locations_preferred",
            "salary_expectation_min",
            "salary_expectation_max",
            "availability_date",
            "work_authorization",
            "fit_score_overall",
            "fit_scores",
        ] {
            assert!(prompt.contains(field), "prompt missing field '{field}'");
        }
    }

    #[test]
    fn test_direct_prompt_has_no_text_placeholder() {
        let prompt = direct_mode_prompt();
        assert!(!prompt.contains("CV TO ANALYZE"));
        assert!(prompt.contains("fit_scores"));
    }
}
