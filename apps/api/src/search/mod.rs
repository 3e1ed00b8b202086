// Talent search: prompt extraction, filter reconciliation, sessions and results.
// All backend calls go through candidates_client; everything else here is local.

pub mod extractor;
pub mod filters;
pub mod handlers;
pub mod query;
pub mod results;
pub mod session;
