//! Heuristic profile synthesizer — the last-resort, fully local stage that
//! guarantees the pipeline's never-fail contract.
//!
//! Pure functions over immutable input: same text + filename always yields
//! the same profile, which is what makes golden assertions possible. The
//! output is structurally complete rather than accurate — placeholder
//! content fills whatever the text does not reveal.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::profile::{
    CandidateProfile, EducationEntry, ExperienceEntry, WorkAuthorization, MAX_HEADLINE_LEN,
    MAX_NAME_LEN,
};

/// Scoring parameters. Base 70, capped bonuses, overall saturates at 95 so a
/// heuristic profile never outranks a confident model analysis.
const BASE_SCORE: f64 = 70.0;
const MAX_EXPERIENCE_BONUS: f64 = 20.0;
const MAX_SKILLS_BONUS: f64 = 15.0;
const MAX_OVERALL: f64 = 95.0;

const DEFAULT_YEARS_EXPERIENCE: f64 = 3.0;
const DEFAULT_HEADLINE: &str = "Experienced professional";
const PLACEHOLDER_FIRST_NAME: &str = "John";
const PLACEHOLDER_LAST_NAME: &str = "Doe";

/// Leading words that mark a line as CV boilerplate rather than content.
const BOILERPLATE_PREFIXES: &[&str] = &["cv", "curriculum", "resume"];
/// Markers of contact-info lines, excluded from headline/name detection.
const CONTACT_MARKERS: &[&str] = &["email", "@", "tel", "phone"];

/// Technology keyword table. Matching is case-insensitive substring search
/// over the whole text; hits are ordered by first occurrence, so the profile
/// leads with what the candidate mentions first.
const TECH_SKILLS: &[(&str, &str)] = &[
    ("python", "Python"),
    ("javascript", "JavaScript"),
    ("react", "React"),
    ("django", "Django"),
    ("node", "Node.js"),
    ("vue", "Vue.js"),
    ("angular", "Angular"),
    ("rust", "Rust"),
    ("sql", "SQL"),
    ("postgresql", "PostgreSQL"),
    ("mongodb", "MongoDB"),
    ("git", "Git"),
    ("docker", "Docker"),
    ("kubernetes", "Kubernetes"),
    ("aws", "AWS"),
    ("azure", "Azure"),
    ("java", "Java"),
    ("php", "PHP"),
    ("html", "HTML/CSS"),
    ("css", "HTML/CSS"),
];

const FALLBACK_SKILLS: &[&str] = &["Web Development", "Software Engineering", "Programming"];

/// Education tiers, highest first. The first group with any keyword hit
/// determines the label.
const EDUCATION_TIERS: &[(&[&str], &str)] = &[
    (
        &["master", "ingénieur", "engineer", "msc", "bac+5", "m2", "phd", "doctorat"],
        "Master / Ingénieur",
    ),
    (
        &["licence", "bachelor", "bsc", "bac+3", "l3"],
        "Licence / Bachelor",
    ),
    (&["bts", "dut", "bac+2"], "BTS / DUT"),
];

const DEFAULT_EDUCATION: &str = "Formation supérieure";

/// "<N> years of experience" in both French and English word orders.
static EXPERIENCE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(\d+)\s*(?:ans?|years?)\s*(?:d['e]|of)?\s*(?:expérience|experience)",
        r"(?:expérience|experience)\D*?(\d+)\s*(?:ans?|years?)",
        r"(\d+)\+?\s*(?:ans?|years?)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("invalid experience pattern"))
    .collect()
});

/// Synthesizes a structurally complete profile from raw text and an optional
/// original filename. Never fails.
pub fn heuristic_profile(cv_text: &str, filename: Option<&str>) -> CandidateProfile {
    let text_lower = cv_text.to_lowercase();

    let headline = detect_headline(cv_text);
    let years_experience = detect_years_experience(&text_lower);
    let (skills_primary, skills_secondary) = detect_skills(&text_lower);
    let education_highest = detect_education(&text_lower);
    let (first_name, last_name) = detect_name(cv_text, filename);

    let experience_bonus = (years_experience * 5.0).min(MAX_EXPERIENCE_BONUS);
    let skills_bonus = (skills_primary.len() as f64 * 2.0).min(MAX_SKILLS_BONUS);
    let overall = (BASE_SCORE + experience_bonus + skills_bonus).min(MAX_OVERALL);

    let fit_scores = BTreeMap::from([
        ("skills".to_string(), (overall + 5.0).clamp(0.0, 95.0)),
        (
            "experience".to_string(),
            (BASE_SCORE + experience_bonus).clamp(0.0, 90.0),
        ),
        ("education".to_string(), 75.0),
        ("culture".to_string(), (overall - 5.0).clamp(0.0, 100.0)),
    ]);

    let summary = format!(
        "Professional with {years_experience} years of experience, specialized in software \
         development. Expertise in {}.",
        if skills_primary.is_empty() {
            "modern technologies".to_string()
        } else {
            skills_primary[..skills_primary.len().min(3)].join(", ")
        }
    );

    CandidateProfile {
        first_name,
        last_name,
        headline,
        summary,
        years_experience,
        experiences: placeholder_experiences(),
        skills_primary,
        skills_secondary,
        languages: vec![
            BTreeMap::from([("fr".to_string(), "C2".to_string())]),
            BTreeMap::from([("en".to_string(), "B2".to_string())]),
        ],
        education_highest: education_highest.to_string(),
        education: vec![EducationEntry {
            start_date: "2016-09".to_string(),
            end_date: "2018-06".to_string(),
            school: "Établissement de formation".to_string(),
            degree: education_highest.to_string(),
            field: "Informatique".to_string(),
            location: "Paris".to_string(),
        }],
        interests: vec![
            "Technology".to_string(),
            "Innovation".to_string(),
            "Open Source".to_string(),
        ],
        locations_preferred: vec![
            "Paris".to_string(),
            "Lyon".to_string(),
            "Remote".to_string(),
        ],
        salary_expectation_min: None,
        salary_expectation_max: None,
        availability_date: None,
        work_authorization: WorkAuthorization::EU,
        fit_score_overall: overall,
        fit_scores,
    }
}

// ── Field detectors ─────────────────────────────────────────────────────────

/// First non-empty line that is not boilerplate, has at most six words,
/// fits the headline bound, and carries no contact markers.
fn detect_headline(cv_text: &str) -> String {
    for line in cv_text.lines() {
        let line = line.trim();
        if line.is_empty() || line.chars().count() > MAX_HEADLINE_LEN {
            continue;
        }
        let lower = line.to_lowercase();
        if BOILERPLATE_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            continue;
        }
        if line.split_whitespace().count() > 6 {
            continue;
        }
        if CONTACT_MARKERS.iter().any(|m| lower.contains(m)) {
            continue;
        }
        return line.to_string();
    }
    DEFAULT_HEADLINE.to_string()
}

/// First numeric match across the ordered pattern table wins.
fn detect_years_experience(text_lower: &str) -> f64 {
    for pattern in EXPERIENCE_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(text_lower) {
            if let Some(years) = captures.get(1).and_then(|m| m.as_str().parse::<f64>().ok()) {
                return years;
            }
        }
    }
    DEFAULT_YEARS_EXPERIENCE
}

/// Collects keyword hits ordered by first occurrence in the text; the first
/// five become primary skills, the next five secondary. Duplicate display
/// names (html/css) collapse onto the earliest hit.
fn detect_skills(text_lower: &str) -> (Vec<String>, Vec<String>) {
    let mut hits: Vec<(usize, &str)> = Vec::new();
    for (keyword, display) in TECH_SKILLS {
        if let Some(position) = text_lower.find(keyword) {
            match hits.iter_mut().find(|(_, seen)| seen == display) {
                Some(existing) => existing.0 = existing.0.min(position),
                None => hits.push((position, display)),
            }
        }
    }

    if hits.is_empty() {
        return (
            FALLBACK_SKILLS.iter().map(|s| s.to_string()).collect(),
            Vec::new(),
        );
    }

    hits.sort_by_key(|(position, _)| *position);
    let mut found: Vec<String> = hits.into_iter().map(|(_, d)| d.to_string()).collect();
    let secondary = found.split_off(found.len().min(5));
    (found, secondary.into_iter().take(5).collect())
}

fn detect_education(text_lower: &str) -> &'static str {
    for (keywords, label) in EDUCATION_TIERS {
        if keywords.iter().any(|k| text_lower.contains(k)) {
            return label;
        }
    }
    DEFAULT_EDUCATION
}

/// Two-tier name extraction: filename tokens first, then the opening lines
/// of the text, then the clearly fictitious placeholder.
fn detect_name(cv_text: &str, filename: Option<&str>) -> (String, String) {
    if let Some(filename) = filename {
        let tokens = filename_name_tokens(filename);
        match tokens.len() {
            0 => {}
            1 => return (capitalize(&tokens[0]), PLACEHOLDER_LAST_NAME.to_string()),
            _ => return (capitalize(&tokens[0]), capitalize(&tokens[1])),
        }
    }

    if let Some((first, last)) = name_from_text(cv_text) {
        return (first, last);
    }

    (
        PLACEHOLDER_FIRST_NAME.to_string(),
        PLACEHOLDER_LAST_NAME.to_string(),
    )
}

/// Strips the extension and CV boilerplate words, splits on separators, and
/// keeps alphabetic tokens that fit the name bound.
fn filename_name_tokens(filename: &str) -> Vec<String> {
    let stem = filename
        .rsplit_once('.')
        .map(|(stem, _ext)| stem)
        .unwrap_or(filename);

    stem.split(|c: char| c == '_' || c == '-' || c == '.' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .filter(|token| {
            let lower = token.to_lowercase();
            !matches!(lower.as_str(), "cv" | "resume" | "curriculum" | "vitae")
        })
        .filter(|token| token.chars().all(char::is_alphabetic))
        .filter(|token| (2..=MAX_NAME_LEN).contains(&token.chars().count()))
        .map(|token| token.to_string())
        .collect()
}

/// Scans the first few lines for two consecutive alphabetic words free of
/// contact markers.
fn name_from_text(cv_text: &str) -> Option<(String, String)> {
    for line in cv_text.lines().take(5) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let lower = line.to_lowercase();
        if BOILERPLATE_PREFIXES.iter().any(|p| lower.starts_with(p))
            || lower.starts_with("email")
            || lower.starts_with("tel")
        {
            continue;
        }
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.len() >= 2 && words[..2].iter().all(|w| is_name_word(w)) {
            return Some((capitalize(words[0]), capitalize(words[1])));
        }
    }
    None
}

fn is_name_word(word: &str) -> bool {
    let length = word.chars().count();
    (1..=MAX_NAME_LEN).contains(&length)
        && word
            .chars()
            .all(|c| c.is_alphabetic() || c == '-' || c == '\'')
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

fn placeholder_experiences() -> Vec<ExperienceEntry> {
    vec![
        ExperienceEntry {
            start_date: "2021-01".to_string(),
            end_date: "2024-03".to_string(),
            company: "Previous employer".to_string(),
            position: "Senior Developer".to_string(),
            location: "Paris".to_string(),
            description: "Web application development".to_string(),
        },
        ExperienceEntry {
            start_date: "2019-06".to_string(),
            end_date: "2021-01".to_string(),
            company: "Previous employer".to_string(),
            position: "Developer".to_string(),
            location: "Lyon".to_string(),
            description: "Full-stack development".to_string(),
        },
    ]
}
