use axum::Router;

use crate::api::AppState;

pub mod cds;
pub mod system;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(cds::routes())
        .merge(system::routes())
}
