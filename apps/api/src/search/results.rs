//! Candidate result lists returned by the search backend, plus local sort and narrowing.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A candidate profile as returned by the backend. Unknown fields are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    /// Match percentage, passed through from the backend unchanged.
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub match_score: Option<Value>,
    #[serde(default)]
    pub raw_data: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Candidate {
    fn raw_str(&self, field: &str) -> &str {
        self.raw_data.get(field).and_then(Value::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Backend order.
    #[default]
    BestMatch,
    NewestFirst,
    NameAsc,
}

/// Exact-match narrowing on `raw_data` fields. `None` or "All" disables a criterion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultFilter {
    pub location: Option<String>,
    pub experience: Option<String>,
    pub role: Option<String>,
    pub company_type: Option<String>,
}

impl ResultFilter {
    fn criteria(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("location_country", self.location.as_deref()),
            ("experience", self.experience.as_deref()),
            ("role", self.role.as_deref()),
            ("company_type", self.company_type.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, wanted)| match wanted {
            Some(value) if value != "All" => Some((field, value)),
            _ => None,
        })
    }

    pub fn matches(&self, candidate: &Candidate) -> bool {
        self.criteria()
            .all(|(field, wanted)| candidate.raw_str(field) == wanted)
    }
}

/// Narrows and orders a result list without touching the stored copy.
pub fn view(candidates: &[Candidate], filter: &ResultFilter, sort: SortOrder) -> Vec<Candidate> {
    let mut view: Vec<Candidate> = candidates
        .iter()
        .filter(|c| filter.matches(c))
        .cloned()
        .collect();

    match sort {
        SortOrder::BestMatch => {}
        SortOrder::NewestFirst => view.reverse(),
        SortOrder::NameAsc => view.sort_by(compare_names),
    }
    view
}

fn compare_names(a: &Candidate, b: &Candidate) -> Ordering {
    let a = a.full_name.as_deref().unwrap_or("");
    let b = b.full_name.as_deref().unwrap_or("");
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate(name: Option<&str>, raw: Value) -> Candidate {
        Candidate {
            full_name: name.map(str::to_string),
            raw_data: raw,
            ..Default::default()
        }
    }

    fn names(list: &[Candidate]) -> Vec<&str> {
        list.iter()
            .map(|c| c.full_name.as_deref().unwrap_or(""))
            .collect()
    }

    fn sample() -> Vec<Candidate> {
        vec![
            candidate(Some("maya Chen"), json!({"location_country": "Austin, TX", "role": "Engineer"})),
            candidate(None, json!({"location_country": "San Francisco, CA"})),
            candidate(Some("Arjun Rao"), json!({"location_country": "Austin, TX", "role": "Product Manager"})),
        ]
    }

    #[test]
    fn test_candidate_deserializes_backend_profile() {
        let raw = json!({
            "id": 42,
            "full_name": "Maya Chen",
            "linkedin_url": "linkedin.com/in/maya",
            "match": 87,
            "raw_data": {"job_title": "Staff Engineer", "skills": ["Rust"]}
        });
        let c: Candidate = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(c.full_name.as_deref(), Some("Maya Chen"));
        assert_eq!(c.match_score, Some(json!(87)));
        assert_eq!(c.raw_str("job_title"), "Staff Engineer");
        assert_eq!(c.extra.get("id"), Some(&json!(42)));
        assert_eq!(serde_json::to_value(&c).unwrap(), raw);
    }

    #[test]
    fn test_best_match_keeps_backend_order() {
        let list = sample();
        let out = view(&list, &ResultFilter::default(), SortOrder::BestMatch);
        assert_eq!(out, list);
    }

    #[test]
    fn test_newest_first_reverses() {
        let out = view(&sample(), &ResultFilter::default(), SortOrder::NewestFirst);
        assert_eq!(names(&out), vec!["Arjun Rao", "", "maya Chen"]);
    }

    #[test]
    fn test_name_sort_puts_missing_names_first() {
        let out = view(&sample(), &ResultFilter::default(), SortOrder::NameAsc);
        assert_eq!(names(&out), vec!["", "Arjun Rao", "maya Chen"]);
    }

    #[test]
    fn test_filter_all_is_ignored() {
        let filter = ResultFilter {
            location: Some("All".to_string()),
            ..Default::default()
        };
        assert_eq!(view(&sample(), &filter, SortOrder::BestMatch).len(), 3);
    }

    #[test]
    fn test_filter_combines_criteria() {
        let filter = ResultFilter {
            location: Some("Austin, TX".to_string()),
            role: Some("Engineer".to_string()),
            ..Default::default()
        };
        let out = view(&sample(), &filter, SortOrder::BestMatch);
        assert_eq!(names(&out), vec!["maya Chen"]);
    }

    #[test]
    fn test_sort_order_wire_names() {
        let sort: SortOrder = serde_json::from_value(json!("name_asc")).unwrap();
        assert_eq!(sort, SortOrder::NameAsc);
        assert_eq!(SortOrder::default(), SortOrder::BestMatch);
    }
}
