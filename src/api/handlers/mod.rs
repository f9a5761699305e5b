//! REST endpoint handlers organized by resource.

pub mod assignment;
pub mod contact;
pub mod link;
pub mod redirect;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(link::routes())
        .merge(contact::routes())
        .merge(assignment::routes())
}
