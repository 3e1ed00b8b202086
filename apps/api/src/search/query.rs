use serde::Serialize;

use crate::errors::AppError;
use crate::search::filters::FilterState;
use crate::search::session::{SearchMode, SearchSession};

/// Request body sent to the candidate search backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchQuery {
    /// `{"prompt": "..."}`
    Prompt(String),
    /// `{"filters": {...}}`
    Filters(FilterState),
}

impl SearchQuery {
    /// AI mode sends the raw prompt; manual mode sends the accumulated filters.
    pub fn for_session(session: &SearchSession) -> Result<Self, AppError> {
        match session.mode {
            SearchMode::Ai => {
                let prompt = session.prompt.trim();
                if prompt.is_empty() {
                    return Err(AppError::Validation(
                        "A search prompt is required in AI mode".to_string(),
                    ));
                }
                Ok(SearchQuery::Prompt(prompt.to_string()))
            }
            SearchMode::Manual => Ok(SearchQuery::Filters(session.filters.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::filters::update_single_filter;
    use serde_json::json;

    #[test]
    fn test_prompt_body_shape() {
        let body = serde_json::to_value(SearchQuery::Prompt("rust devs".to_string())).unwrap();
        assert_eq!(body, json!({"prompt": "rust devs"}));
    }

    #[test]
    fn test_filters_body_shape() {
        let filters = update_single_filter(&FilterState::new(), "location", json!("Austin"));
        let body = serde_json::to_value(SearchQuery::Filters(filters)).unwrap();
        assert_eq!(body, json!({"filters": {"location": "Austin"}}));
    }

    #[test]
    fn test_ai_mode_requires_prompt() {
        let session = SearchSession::new();
        assert!(matches!(
            SearchQuery::for_session(&session),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_ai_mode_sends_trimmed_prompt() {
        let mut session = SearchSession::new();
        session.prompt = "  Rust developer in Austin ".to_string();
        assert_eq!(
            SearchQuery::for_session(&session).unwrap(),
            SearchQuery::Prompt("Rust developer in Austin".to_string())
        );
    }

    #[test]
    fn test_manual_mode_sends_filters_even_when_empty() {
        let mut session = SearchSession::new();
        session.mode = SearchMode::Manual;
        let query = SearchQuery::for_session(&session).unwrap();
        assert_eq!(query, SearchQuery::Filters(FilterState::new()));
    }
}
