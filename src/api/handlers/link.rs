//! Link handlers: CRUD, status, stats, and lead listing.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{
    CreateLinkRequest, LeadListResponse, LinkDetailResponse, LinkListQuery, LinkListResponse,
    LinkStatusResponse, PaginationMeta, PaginationParams, UpdateLinkRequest,
};
use crate::app_state::AppState;
use crate::domain::LinkId;
use crate::error::{ErrorResponse, RotatorError};
use crate::service::LinkStats;

/// `POST /links` — Create a redirect link.
///
/// # Errors
///
/// Returns [`RotatorError::InvalidRequest`] on a blank name or slug, or
/// [`RotatorError::SlugTaken`] if the slug is in use.
#[utoipa::path(
    post,
    path = "/api/v1/links",
    tag = "Links",
    summary = "Create a link",
    description = "Creates a link with an unstarted rotation cursor. The slug is normalized and must be unique. An optional initial contact list is applied atomically.",
    request_body = CreateLinkRequest,
    responses(
        (status = 201, description = "Link created", body = LinkDetailResponse),
        (status = 400, description = "Invalid name or slug", body = ErrorResponse),
        (status = 409, description = "Slug already in use", body = ErrorResponse),
    )
)]
pub async fn create_link(
    State(state): State<AppState>,
    Json(req): Json<CreateLinkRequest>,
) -> Result<impl IntoResponse, RotatorError> {
    let (new, contacts) = req.into_new_link()?;
    let (link, contacts) = state.link_service.create_link(new, contacts).await?;
    Ok((
        StatusCode::CREATED,
        Json(LinkDetailResponse::new(link, contacts)),
    ))
}

/// `GET /links` — List links with search, filters, and pagination.
///
/// # Errors
///
/// Returns [`RotatorError`] on storage failures.
#[utoipa::path(
    get,
    path = "/api/v1/links",
    tag = "Links",
    summary = "List links",
    description = "Returns links newest first. `q` searches name and slug, `campaign` matches exactly, and `status` filters on the derived status.",
    params(LinkListQuery),
    responses(
        (status = 200, description = "Paginated link list", body = LinkListResponse),
    )
)]
pub async fn list_links(
    State(state): State<AppState>,
    Query(query): Query<LinkListQuery>,
) -> Result<impl IntoResponse, RotatorError> {
    let (filter, params) = query.into_parts();
    let summaries = state.link_service.list_links(&filter).await?;
    let pagination = PaginationMeta::new(&params, summaries.len());
    let data = summaries
        .into_iter()
        .skip(params.offset())
        .take(params.limit())
        .collect();
    Ok(Json(LinkListResponse { data, pagination }))
}

/// `GET /links/{id}` — Get a link with its contacts.
///
/// # Errors
///
/// Returns [`RotatorError::LinkNotFound`] if the link does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/links/{id}",
    tag = "Links",
    summary = "Get link details",
    description = "Returns the link record, its derived status, and its contacts in rotation order.",
    params(
        ("id" = uuid::Uuid, Path, description = "Link UUID"),
    ),
    responses(
        (status = 200, description = "Link details", body = LinkDetailResponse),
        (status = 404, description = "Link not found", body = ErrorResponse),
    )
)]
pub async fn get_link(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, RotatorError> {
    let link_id = LinkId::from_uuid(id);
    let link = state.link_service.get_link(link_id).await?;
    let contacts = state.link_service.list_contacts(link_id).await?;
    Ok(Json(LinkDetailResponse::new(link, contacts)))
}

/// `PATCH /links/{id}` — Partially update a link.
///
/// # Errors
///
/// Returns [`RotatorError::LinkNotFound`], [`RotatorError::InvalidRequest`],
/// or [`RotatorError::SlugTaken`].
#[utoipa::path(
    patch,
    path = "/api/v1/links/{id}",
    tag = "Links",
    summary = "Update a link",
    description = "Updates only the fields present in the body. `null` clears nullable fields. Setting `enabled` to false makes the link refuse assignments.",
    params(
        ("id" = uuid::Uuid, Path, description = "Link UUID"),
    ),
    request_body = UpdateLinkRequest,
    responses(
        (status = 200, description = "Updated link", body = LinkDetailResponse),
        (status = 400, description = "Invalid field value", body = ErrorResponse),
        (status = 404, description = "Link not found", body = ErrorResponse),
        (status = 409, description = "Slug already in use", body = ErrorResponse),
    )
)]
pub async fn update_link(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<UpdateLinkRequest>,
) -> Result<impl IntoResponse, RotatorError> {
    let link_id = LinkId::from_uuid(id);
    let patch = req.into_patch()?;
    let link = state.link_service.update_link(link_id, patch).await?;
    let contacts = state.link_service.list_contacts(link_id).await?;
    Ok(Json(LinkDetailResponse::new(link, contacts)))
}

/// `DELETE /links/{id}` — Remove a link.
///
/// # Errors
///
/// Returns [`RotatorError::LinkNotFound`] if the link does not exist.
#[utoipa::path(
    delete,
    path = "/api/v1/links/{id}",
    tag = "Links",
    summary = "Delete a link",
    description = "Removes the link together with its contacts, cursor, and leads, and emits a LinkRemoved event.",
    params(
        ("id" = uuid::Uuid, Path, description = "Link UUID"),
    ),
    responses(
        (status = 204, description = "Link deleted"),
        (status = 404, description = "Link not found", body = ErrorResponse),
    )
)]
pub async fn delete_link(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, RotatorError> {
    state
        .link_service
        .delete_link(LinkId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /links/{id}/status` — Derived availability.
///
/// # Errors
///
/// Returns [`RotatorError::LinkNotFound`] if the link does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/links/{id}/status",
    tag = "Links",
    summary = "Get link status",
    description = "Returns `inactive` when disabled, `no_contacts` when the contact list is empty, and `active` otherwise.",
    params(
        ("id" = uuid::Uuid, Path, description = "Link UUID"),
    ),
    responses(
        (status = 200, description = "Link status", body = LinkStatusResponse),
        (status = 404, description = "Link not found", body = ErrorResponse),
    )
)]
pub async fn link_status(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, RotatorError> {
    let link_id = LinkId::from_uuid(id);
    let status = state.assignment_service.status(link_id).await?;
    Ok(Json(LinkStatusResponse { link_id, status }))
}

/// `GET /links/{id}/stats` — Counters and conversion rate.
///
/// # Errors
///
/// Returns [`RotatorError::LinkNotFound`] if the link does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/links/{id}/stats",
    tag = "Links",
    summary = "Get link stats",
    description = "Returns visits, leads, conversion rate with one decimal, last lead time, contact count, and the rotation cursor.",
    params(
        ("id" = uuid::Uuid, Path, description = "Link UUID"),
    ),
    responses(
        (status = 200, description = "Link stats", body = LinkStats),
        (status = 404, description = "Link not found", body = ErrorResponse),
    )
)]
pub async fn link_stats(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, RotatorError> {
    let stats = state.link_service.stats(LinkId::from_uuid(id)).await?;
    Ok(Json(stats))
}

/// `GET /links/{id}/leads` — Leads of a link, newest first.
///
/// # Errors
///
/// Returns [`RotatorError::LinkNotFound`] if the link does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/links/{id}/leads",
    tag = "Links",
    summary = "List leads",
    description = "Returns the leads recorded through this link, newest first.",
    params(
        ("id" = uuid::Uuid, Path, description = "Link UUID"),
        PaginationParams,
    ),
    responses(
        (status = 200, description = "Lead page", body = LeadListResponse),
        (status = 404, description = "Link not found", body = ErrorResponse),
    )
)]
pub async fn list_leads(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, RotatorError> {
    let params = params.clamped();
    let data = state
        .link_service
        .list_leads(LinkId::from_uuid(id), params.limit(), params.offset())
        .await?;
    Ok(Json(LeadListResponse {
        data,
        page: params.page,
        per_page: params.per_page,
    }))
}

/// Link management routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/links", get(list_links).post(create_link))
        .route(
            "/links/{id}",
            get(get_link).patch(update_link).delete(delete_link),
        )
        .route("/links/{id}/status", get(link_status))
        .route("/links/{id}/stats", get(link_stats))
        .route("/links/{id}/leads", get(list_leads))
}
