use crate::candidates_client::CandidateClient;
use crate::search::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub candidates: CandidateClient,
}
