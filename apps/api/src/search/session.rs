//! In-memory search sessions. Nothing here outlives the process.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::search::extractor::{extract, ExtractedFilters};
use crate::search::filters::{reconcile_extracted, update_single_filter, FilterState};
use crate::search::results::Candidate;

/// Sessions untouched for this long are dropped.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    #[default]
    Ai,
    Manual,
}

/// One talent-search view: the last prompt, the accumulated filters and the latest results.
#[derive(Debug, Clone, Serialize)]
pub struct SearchSession {
    pub id: Uuid,
    pub mode: SearchMode,
    pub prompt: String,
    pub filters: FilterState,
    pub results: Vec<Candidate>,
    /// Bumped whenever the prompt, filters or mode change, or on reset.
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    last_active: Instant,
}

impl Default for SearchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchSession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            mode: SearchMode::default(),
            prompt: String::new(),
            filters: FilterState::new(),
            results: Vec::new(),
            revision: 0,
            created_at: now,
            updated_at: now,
            last_active: Instant::now(),
        }
    }

    fn clear(&mut self) {
        self.prompt.clear();
        self.filters = FilterState::new();
        self.results.clear();
        self.revise();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
        self.last_active = Instant::now();
    }

    fn revise(&mut self) {
        self.revision += 1;
        self.touch();
    }

    fn is_idle(&self, ttl: Duration) -> bool {
        self.last_active.elapsed() >= ttl
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptOutcome {
    pub session: SearchSession,
    /// `None` when the prompt text was unchanged or blank, so nothing was parsed.
    pub extracted: Option<ExtractedFilters>,
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterOutcome {
    pub session: SearchSession,
    pub changed: bool,
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SearchSession>>>,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            idle_ttl,
        }
    }

    pub async fn create(&self) -> SearchSession {
        let session = SearchSession::new();
        let mut sessions = self.sessions.write().await;
        let idle_ttl = self.idle_ttl;
        sessions.retain(|_, s| !s.is_idle(idle_ttl));
        sessions.insert(session.id, session.clone());
        info!(session_id = %session.id, live = sessions.len(), "Search session created");
        session
    }

    /// Any access counts as activity for the idle timeout.
    pub async fn get(&self, id: Uuid) -> Result<SearchSession, AppError> {
        self.update(id, |session| {
            session.last_active = Instant::now();
            session.clone()
        })
        .await
    }

    pub async fn live_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops every session idle for longer than the configured timeout.
    pub async fn purge_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let idle_ttl = self.idle_ttl;
        sessions.retain(|_, s| !s.is_idle(idle_ttl));
        before - sessions.len()
    }

    pub fn spawn_idle_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let removed = store.purge_idle().await;
                if removed > 0 {
                    let remaining = store.live_count().await;
                    info!(removed, remaining, "Expired idle search sessions");
                }
            }
        })
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), AppError> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| info!(session_id = %id, "Search session removed"))
            .ok_or_else(|| not_found(id))
    }

    /// Clears prompt, filters and results; the session id stays valid.
    pub async fn reset(&self, id: Uuid) -> Result<SearchSession, AppError> {
        self.update(id, |session| {
            session.clear();
            session.clone()
        })
        .await
    }

    pub async fn set_mode(&self, id: Uuid, mode: SearchMode) -> Result<SearchSession, AppError> {
        self.update(id, |session| {
            if session.mode != mode {
                session.mode = mode;
                session.revise();
            }
            session.clone()
        })
        .await
    }

    /// Re-runs extraction only when the prompt text differs from the last one applied,
    /// so manual edits are not overwritten by re-parsing an unchanged prompt.
    pub async fn apply_prompt(&self, id: Uuid, prompt: &str) -> Result<PromptOutcome, AppError> {
        self.update(id, |session| {
            if session.prompt == prompt {
                return PromptOutcome {
                    session: session.clone(),
                    extracted: None,
                    changed: false,
                };
            }

            session.prompt = prompt.to_string();
            session.revise();

            if prompt.trim().is_empty() {
                return PromptOutcome {
                    session: session.clone(),
                    extracted: None,
                    changed: false,
                };
            }

            let extracted = extract(prompt);
            let next = reconcile_extracted(&session.filters, extracted.clone());
            let changed = !next.ptr_eq(&session.filters);
            session.filters = next;
            debug!(session_id = %id, changed, fields = ?extracted.keys(), "Prompt applied");

            PromptOutcome {
                session: session.clone(),
                extracted: Some(extracted),
                changed,
            }
        })
        .await
    }

    pub async fn apply_filter(
        &self,
        id: Uuid,
        key: &str,
        value: Value,
    ) -> Result<FilterOutcome, AppError> {
        self.update(id, |session| {
            let next = update_single_filter(&session.filters, key, value);
            let changed = !next.ptr_eq(&session.filters);
            if changed {
                session.filters = next;
                session.revise();
            }
            debug!(session_id = %id, key, changed, "Filter edited");
            FilterOutcome {
                session: session.clone(),
                changed,
            }
        })
        .await
    }

    /// Stores the results of a search issued at `revision`.
    ///
    /// Returns `None` and leaves the session alone if it was reset or edited
    /// after that search started.
    pub async fn store_results(
        &self,
        id: Uuid,
        revision: u64,
        results: Vec<Candidate>,
    ) -> Result<Option<SearchSession>, AppError> {
        self.update(id, |session| {
            if session.revision != revision {
                debug!(
                    session_id = %id,
                    issued = revision,
                    current = session.revision,
                    "Discarding results for a superseded search"
                );
                return None;
            }
            session.results = results;
            session.touch();
            Some(session.clone())
        })
        .await
    }

    async fn update<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut SearchSession) -> T,
    ) -> Result<T, AppError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&id) {
            Some(session) if !session.is_idle(self.idle_ttl) => Ok(f(session)),
            _ => Err(not_found(id)),
        }
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Search session {id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = SessionStore::new(DEFAULT_IDLE_TTL);
        let created = store.create().await;
        let fetched = store.get(created.id).await.unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.mode, SearchMode::Ai);
        assert!(fetched.filters.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let store = SessionStore::new(DEFAULT_IDLE_TTL);
        assert!(matches!(
            store.get(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            store.apply_prompt(Uuid::new_v4(), "exp 3").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_apply_prompt_populates_filters() {
        let store = SessionStore::new(DEFAULT_IDLE_TTL);
        let id = store.create().await.id;
        let outcome = store
            .apply_prompt(id, "Senior React developer from Stanford")
            .await
            .unwrap();
        assert!(outcome.changed);
        assert_eq!(
            outcome.session.filters.get("jobTitle"),
            Some(&json!("Senior React developer"))
        );
        assert_eq!(
            outcome.session.filters.get("universities"),
            Some(&json!("Stanford"))
        );
    }

    #[tokio::test]
    async fn test_unchanged_prompt_does_not_override_manual_edit() {
        let store = SessionStore::new(DEFAULT_IDLE_TTL);
        let id = store.create().await.id;
        store.apply_prompt(id, "Rust developer in Austin").await.unwrap();
        store
            .apply_filter(id, "location", json!("Boston"))
            .await
            .unwrap();

        let outcome = store.apply_prompt(id, "Rust developer in Austin").await.unwrap();
        assert!(!outcome.changed);
        assert!(outcome.extracted.is_none());
        assert_eq!(outcome.session.filters.get("location"), Some(&json!("Boston")));
    }

    #[tokio::test]
    async fn test_edited_prompt_overrides_previous_values() {
        let store = SessionStore::new(DEFAULT_IDLE_TTL);
        let id = store.create().await.id;
        store.apply_prompt(id, "Rust developer in Austin").await.unwrap();
        store
            .apply_filter(id, "maxExperience", json!(10))
            .await
            .unwrap();

        let outcome = store.apply_prompt(id, "Rust developer in Denver").await.unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.session.filters.get("location"), Some(&json!("Denver")));
        assert_eq!(outcome.session.filters.get("maxExperience"), Some(&json!(10)));
    }

    #[tokio::test]
    async fn test_reparse_with_same_fields_keeps_identity() {
        let store = SessionStore::new(DEFAULT_IDLE_TTL);
        let id = store.create().await.id;
        let first = store.apply_prompt(id, "exp 5").await.unwrap();
        let second = store.apply_prompt(id, "exp  5").await.unwrap();
        assert!(second.extracted.is_some());
        assert!(!second.changed);
        assert!(second.session.filters.ptr_eq(&first.session.filters));
    }

    #[tokio::test]
    async fn test_blank_prompt_is_stored_without_parsing() {
        let store = SessionStore::new(DEFAULT_IDLE_TTL);
        let id = store.create().await.id;
        store.apply_prompt(id, "exp 5").await.unwrap();
        let outcome = store.apply_prompt(id, "  ").await.unwrap();
        assert!(outcome.extracted.is_none());
        assert_eq!(outcome.session.prompt, "  ");
        assert_eq!(outcome.session.filters.get("minExperience"), Some(&json!(5)));
    }

    #[tokio::test]
    async fn test_apply_same_filter_twice_is_noop() {
        let store = SessionStore::new(DEFAULT_IDLE_TTL);
        let id = store.create().await.id;
        let first = store
            .apply_filter(id, "requiredContactInfo", json!("Email"))
            .await
            .unwrap();
        let second = store
            .apply_filter(id, "requiredContactInfo", json!("Email"))
            .await
            .unwrap();
        assert!(first.changed);
        assert!(!second.changed);
        assert!(second.session.filters.ptr_eq(&first.session.filters));
    }

    #[tokio::test]
    async fn test_reset_clears_state_but_keeps_session() {
        let store = SessionStore::new(DEFAULT_IDLE_TTL);
        let id = store.create().await.id;
        let revision = store.apply_prompt(id, "exp 5").await.unwrap().session.revision;
        store
            .store_results(id, revision, vec![Candidate::default()])
            .await
            .unwrap()
            .unwrap();

        let session = store.reset(id).await.unwrap();
        assert!(session.prompt.is_empty());
        assert!(session.filters.is_empty());
        assert!(session.results.is_empty());
        assert!(store.get(id).await.is_ok());
    }

    #[tokio::test]
    async fn test_remove_then_get_fails() {
        let store = SessionStore::new(DEFAULT_IDLE_TTL);
        let id = store.create().await.id;
        store.remove(id).await.unwrap();
        assert!(store.get(id).await.is_err());
        assert!(store.remove(id).await.is_err());
    }

    #[tokio::test]
    async fn test_set_mode() {
        let store = SessionStore::new(DEFAULT_IDLE_TTL);
        let id = store.create().await.id;
        let session = store.set_mode(id, SearchMode::Manual).await.unwrap();
        assert_eq!(session.mode, SearchMode::Manual);
    }

    #[tokio::test]
    async fn test_results_for_superseded_search_are_dropped() {
        let store = SessionStore::new(DEFAULT_IDLE_TTL);
        let id = store.create().await.id;
        let issued = store.apply_prompt(id, "Rust developer").await.unwrap().session.revision;

        store.reset(id).await.unwrap();
        let stored = store
            .store_results(id, issued, vec![Candidate::default()])
            .await
            .unwrap();
        assert!(stored.is_none());

        let session = store.get(id).await.unwrap();
        assert!(session.results.is_empty());
        assert!(session.prompt.is_empty());
    }

    #[tokio::test]
    async fn test_filter_edit_supersedes_running_search() {
        let store = SessionStore::new(DEFAULT_IDLE_TTL);
        let id = store.create().await.id;
        let issued = store.get(id).await.unwrap().revision;
        store.apply_filter(id, "location", json!("Austin")).await.unwrap();
        assert!(store
            .store_results(id, issued, vec![Candidate::default()])
            .await
            .unwrap()
            .is_none());

        // Storing results does not bump the revision, so a repeat store still lands.
        let current = store.get(id).await.unwrap().revision;
        assert!(store.store_results(id, current, Vec::new()).await.unwrap().is_some());
        assert!(store.store_results(id, current, Vec::new()).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_expire() {
        let store = SessionStore::new(Duration::from_secs(60));
        let idle = store.create().await.id;
        let active = store.create().await.id;

        tokio::time::advance(Duration::from_secs(40)).await;
        store.apply_filter(active, "location", json!("Austin")).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;

        assert!(matches!(store.get(idle).await, Err(AppError::NotFound(_))));
        assert!(store.get(active).await.is_ok());
        assert_eq!(store.live_count().await, 2);

        // Creating a session sweeps the expired one.
        store.create().await;
        assert_eq!(store.live_count().await, 2);
        assert_eq!(store.purge_idle().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sweeper_runs_in_background() {
        let store = SessionStore::new(Duration::from_secs(60));
        store.create().await;
        store.create().await;

        let sweeper = store.spawn_idle_sweeper(Duration::from_secs(30));
        tokio::time::sleep(Duration::from_secs(95)).await;
        assert_eq!(store.live_count().await, 0);
        sweeper.abort();
    }
}
