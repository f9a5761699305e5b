//! Operator-side assignment handler.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use super::redirect::request_attribution;
use crate::api::dto::AssignmentResponse;
use crate::app_state::AppState;
use crate::domain::{LinkId, VisitorInfo};
use crate::error::{ErrorResponse, RotatorError};

/// `POST /links/{id}/assign` — Assign a visitor to the next contact.
///
/// # Errors
///
/// Returns [`RotatorError::LinkNotFound`], [`RotatorError::LinkInactive`],
/// [`RotatorError::NoContacts`], or [`RotatorError::Transient`].
#[utoipa::path(
    post,
    path = "/api/v1/links/{id}/assign",
    tag = "Assignment",
    summary = "Assign a visitor",
    description = "Advances the rotation cursor, records a lead for the selected contact, and returns the WhatsApp hand-off URL. Missing attribution fields are filled from the request headers.",
    params(
        ("id" = uuid::Uuid, Path, description = "Link UUID"),
    ),
    request_body = VisitorInfo,
    responses(
        (status = 200, description = "Visitor assigned", body = AssignmentResponse),
        (status = 404, description = "Link not found", body = ErrorResponse),
        (status = 422, description = "Link inactive or without contacts", body = ErrorResponse),
        (status = 503, description = "Rotation busy, retry", body = ErrorResponse),
    )
)]
pub async fn assign(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    headers: HeaderMap,
    Json(mut visitor): Json<VisitorInfo>,
) -> Result<impl IntoResponse, RotatorError> {
    let link_id = LinkId::from_uuid(id);
    let from_headers = request_attribution(&headers, None, None);
    let attribution = &mut visitor.attribution;
    attribution.user_agent = attribution.user_agent.take().or(from_headers.user_agent);
    attribution.ip_address = attribution.ip_address.take().or(from_headers.ip_address);

    let link = state.link_service.get_link(link_id).await?;
    let assignment = state
        .assignment_service
        .assign(link_id, Some(visitor))
        .await?;
    Ok(Json(AssignmentResponse::new(&link, assignment)))
}

/// Assignment routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/links/{id}/assign", post(assign))
}
