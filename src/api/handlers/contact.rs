//! Contact-list handlers: read, replace, and move.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{ContactListResponse, MoveContactRequest, ReplaceContactsRequest};
use crate::app_state::AppState;
use crate::domain::LinkId;
use crate::error::{ErrorResponse, RotatorError};

/// `GET /links/{id}/contacts` — Contacts in rotation order.
///
/// # Errors
///
/// Returns [`RotatorError::LinkNotFound`] if the link does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/links/{id}/contacts",
    tag = "Contacts",
    summary = "List contacts",
    description = "Returns the contacts of a link ordered by position. An empty list is valid.",
    params(
        ("id" = uuid::Uuid, Path, description = "Link UUID"),
    ),
    responses(
        (status = 200, description = "Contact list", body = ContactListResponse),
        (status = 404, description = "Link not found", body = ErrorResponse),
    )
)]
pub async fn list_contacts(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, RotatorError> {
    let link_id = LinkId::from_uuid(id);
    let contacts = state.link_service.list_contacts(link_id).await?;
    Ok(Json(ContactListResponse { link_id, contacts }))
}

/// `PUT /links/{id}/contacts` — Replace the whole contact list.
///
/// # Errors
///
/// Returns [`RotatorError::LinkNotFound`] if the link does not exist.
#[utoipa::path(
    put,
    path = "/api/v1/links/{id}/contacts",
    tag = "Contacts",
    summary = "Replace contacts",
    description = "Atomically replaces the contact list. Blank entries are dropped; the rest are trimmed and numbered in the given order. The rotation cursor is left as is.",
    params(
        ("id" = uuid::Uuid, Path, description = "Link UUID"),
    ),
    request_body = ReplaceContactsRequest,
    responses(
        (status = 200, description = "New contact list", body = ContactListResponse),
        (status = 404, description = "Link not found", body = ErrorResponse),
    )
)]
pub async fn replace_contacts(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<ReplaceContactsRequest>,
) -> Result<impl IntoResponse, RotatorError> {
    let link_id = LinkId::from_uuid(id);
    let contacts = state
        .link_service
        .replace_contacts(link_id, req.contacts)
        .await?;
    Ok(Json(ContactListResponse { link_id, contacts }))
}

/// `POST /links/{id}/contacts/move` — Relocate one contact.
///
/// # Errors
///
/// Returns [`RotatorError::LinkNotFound`] or
/// [`RotatorError::PositionOutOfRange`] if `from` is outside the list.
#[utoipa::path(
    post,
    path = "/api/v1/links/{id}/contacts/move",
    tag = "Contacts",
    summary = "Move a contact",
    description = "Moves the contact at `from` to `to` and renumbers the list. A `to` outside the list leaves it unchanged.",
    params(
        ("id" = uuid::Uuid, Path, description = "Link UUID"),
    ),
    request_body = MoveContactRequest,
    responses(
        (status = 200, description = "Reordered contact list", body = ContactListResponse),
        (status = 400, description = "Source position out of range", body = ErrorResponse),
        (status = 404, description = "Link not found", body = ErrorResponse),
    )
)]
pub async fn move_contact(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<MoveContactRequest>,
) -> Result<impl IntoResponse, RotatorError> {
    let link_id = LinkId::from_uuid(id);
    let contacts = state
        .link_service
        .move_contact(link_id, req.from, req.to)
        .await?;
    Ok(Json(ContactListResponse { link_id, contacts }))
}

/// Contact-list routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/links/{id}/contacts",
            get(list_contacts).put(replace_contacts),
        )
        .route("/links/{id}/contacts/move", post(move_contact))
}
