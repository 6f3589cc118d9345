pub mod access;
pub mod ask;

use crate::state::AppState;
use axum::Router;

pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(ask::routes(state.clone()))
        .merge(access::routes(state))
}
