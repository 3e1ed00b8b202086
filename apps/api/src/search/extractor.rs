//! Prompt extractor: pulls structured filter hints out of a free-text search prompt.
//!
//! Each field has its own independent pattern pass over the whole prompt. A
//! field that fails to match is simply left out; nothing here can fail.
//! Because the passes are independent, one phrase may feed more than one field
//! (for example the skills run swallowing a trailing "in Austin").
//!
//! Case folding is ASCII-only (`(?i-u)`), so letters such as the long s (U+017F)
//! or the Kelvin sign (U+212A) never stand in for `s` or `k`. Whitespace stays
//! Unicode-aware.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::search::filters::{keys, FilterMap};

/// "experience 5", "exp10"
static EXPERIENCE_KEYWORD_FIRST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i-u)(?:experience|exp)(?u:\s)*([0-9]+)").unwrap());

/// "5 years", "2 year exp"
static EXPERIENCE_YEARS_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i-u)([0-9]+)(?u:\s)*years?(?u:\s)*(?:experience|exp)?").unwrap()
});

/// "skills: Python, ML"
static SKILLS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i-u)skills?:?(?u:\s)*((?:[A-Za-z0-9_,]|(?u:\s))+)").unwrap()
});

static LOCATION_IN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i-u)in ([A-Za-z ]+)").unwrap());

static LOCATION_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i-u)location:?(?u:\s)*([A-Za-z ]+)").unwrap());

/// The qualifier run binds to "developer" only; the other role words match bare.
static JOB_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i-u)([A-Za-z ]+ developer|engineer|manager|designer|scientist)").unwrap()
});

static UNIVERSITY_FROM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i-u)from ([A-Za-z ]+)(?: university)?").unwrap());

static EDUCATION_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i-u)education:?(?u:\s)*([A-Za-z ]+)").unwrap());

/// Filter fields recognised in a prompt. `None` means "not mentioned".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_experience: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub universities: Option<String>,
}

impl ExtractedFilters {
    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Filter keys present in this record, in canonical order.
    pub fn keys(&self) -> Vec<&'static str> {
        let present = [
            self.min_experience.is_some(),
            self.skills.is_some(),
            self.location.is_some(),
            self.job_title.is_some(),
            self.universities.is_some(),
        ];
        keys::EXTRACTED
            .iter()
            .zip(present)
            .filter_map(|(key, set)| set.then_some(*key))
            .collect()
    }
}

impl From<ExtractedFilters> for FilterMap {
    fn from(filters: ExtractedFilters) -> Self {
        let mut map = FilterMap::new();
        if let Some(years) = filters.min_experience {
            map.insert(keys::MIN_EXPERIENCE.to_string(), Value::from(years));
        }
        if let Some(skills) = filters.skills {
            map.insert(keys::SKILLS.to_string(), Value::from(skills));
        }
        if let Some(location) = filters.location {
            map.insert(keys::LOCATION.to_string(), Value::from(location));
        }
        if let Some(title) = filters.job_title {
            map.insert(keys::JOB_TITLE.to_string(), Value::from(title));
        }
        if let Some(universities) = filters.universities {
            map.insert(keys::UNIVERSITIES.to_string(), Value::from(universities));
        }
        map
    }
}

/// Extracts best-effort filters from a search prompt.
pub fn extract(prompt: &str) -> ExtractedFilters {
    if prompt.trim().is_empty() {
        return ExtractedFilters::default();
    }

    let experience = [&*EXPERIENCE_KEYWORD_FIRST, &*EXPERIENCE_YEARS_FIRST];

    let filters = ExtractedFilters {
        min_experience: first_capture(&experience, prompt).and_then(|digits| digits.parse().ok()),
        skills: first_capture(&[&*SKILLS], prompt).map(split_skills),
        location: first_capture(&[&*LOCATION_IN, &*LOCATION_LABEL], prompt)
            .map(|s| s.trim().to_string()),
        job_title: first_capture(&[&*JOB_TITLE], prompt).map(|s| s.trim().to_string()),
        universities: first_capture(&[&*UNIVERSITY_FROM, &*EDUCATION_LABEL], prompt)
            .map(|s| strip_trailing_university(s).to_string()),
    };

    debug!(fields = ?filters.keys(), "Extracted filters from prompt");
    filters
}

/// Group 1 of the first pattern that matches anywhere in `text`.
fn first_capture<'t>(patterns: &[&Regex], text: &'t str) -> Option<&'t str> {
    patterns
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Commas and spaces are both separators, so "Python, ML" and "Python ML" agree.
fn split_skills(run: &str) -> Vec<String> {
    run.split([',', ' '])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_trailing_university(name: &str) -> &str {
    let name = name.trim();
    match name.rsplit_once(' ') {
        Some((head, last)) if last.eq_ignore_ascii_case("university") => head.trim_end(),
        _ => name,
    }
}
