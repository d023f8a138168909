use crate::state::AppState;
use axum::Router;

pub mod claims;
pub mod credentials;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod issuer;
pub mod jwt;
pub mod oauth;
pub mod password;
pub mod repo;
pub mod repo_types;

pub const SESSION_COOKIE: &str = "designboard.session-token";
pub const OAUTH_STATE_COOKIE: &str = "designboard.oauth-state";

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::auth_routes())
}
