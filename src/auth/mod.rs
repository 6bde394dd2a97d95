use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod repo;
pub(crate) mod repo_types;
pub mod services;

pub use services::AuthUser;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
