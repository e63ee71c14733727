use crate::db::{DbPool, OrmConn};

/// Shared handles for every handler. `orm` carries the transactional flows
/// (checkout, ratings, onboarding); `pool` serves the single-statement paths
/// (cart, credentials, audit log).
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
}
