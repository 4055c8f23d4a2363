use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod model;
pub mod repo;
pub mod services;

pub fn router() -> Router<AppState> {
    handlers::caption_routes()
}
