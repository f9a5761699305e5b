//! Public redirect endpoints served at `/r/{slug}`.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{FormDescriptor, FormSubmission, HandoffResponse, RedirectQuery};
use crate::app_state::AppState;
use crate::domain::handoff::whatsapp_url;
use crate::domain::{Attribution, Link, LinkMode, VisitorInfo};
use crate::error::{ErrorResponse, RotatorError};

/// Builds attribution from UTM tags and request headers. The IP is the
/// first `X-Forwarded-For` hop, falling back to `X-Real-IP`.
#[must_use]
pub fn request_attribution(
    headers: &HeaderMap,
    utm_source: Option<String>,
    utm_campaign: Option<String>,
) -> Attribution {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    let ip_address = header_str("x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|hop| hop.trim().to_string()))
        .filter(|v| !v.is_empty())
        .or_else(|| header_str("x-real-ip"));
    Attribution {
        utm_source,
        utm_campaign,
        user_agent: header_str(header::USER_AGENT.as_str()),
        ip_address,
    }
}

async fn resolve_enabled(state: &AppState, slug: &str) -> Result<Link, RotatorError> {
    let link = state.link_service.get_link_by_slug(slug).await?;
    if !link.enabled {
        return Err(RotatorError::LinkInactive(*link.id.as_uuid()));
    }
    Ok(link)
}

/// `GET /r/{slug}` — Visitor landing.
///
/// # Errors
///
/// Returns [`RotatorError::LinkNotFound`] or [`RotatorError::LinkInactive`];
/// direct-mode links may also fail with [`RotatorError::NoContacts`] or
/// [`RotatorError::Transient`].
#[utoipa::path(
    get,
    path = "/r/{slug}",
    tag = "Redirect",
    summary = "Visit a link",
    description = "Counts the visit. Direct-mode links assign the visitor immediately and answer 302 to WhatsApp; form-mode links return the form to show.",
    params(
        ("slug" = String, Path, description = "Link slug"),
        RedirectQuery,
    ),
    responses(
        (status = 200, description = "Form-mode descriptor", body = FormDescriptor),
        (status = 302, description = "Redirect to the assigned contact"),
        (status = 404, description = "Link not found", body = ErrorResponse),
        (status = 422, description = "Link inactive or without contacts", body = ErrorResponse),
        (status = 503, description = "Rotation busy, retry", body = ErrorResponse),
    )
)]
pub async fn visit(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<RedirectQuery>,
    headers: HeaderMap,
) -> Result<Response, RotatorError> {
    let link = resolve_enabled(&state, &slug).await?;
    state.link_service.record_visit(link.id).await;

    match link.mode {
        LinkMode::Form => Ok(Json(FormDescriptor::from(&link)).into_response()),
        LinkMode::Direct => {
            let visitor = VisitorInfo {
                attribution: request_attribution(&headers, query.utm_source, query.utm_campaign),
                ..VisitorInfo::default()
            };
            let assignment = state
                .assignment_service
                .assign(link.id, Some(visitor))
                .await?;
            let location = whatsapp_url(
                &assignment.contact.phone,
                link.message_template.as_deref(),
                None,
            );
            Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
        }
    }
}

/// `POST /r/{slug}` — Form submission.
///
/// # Errors
///
/// Returns [`RotatorError::InvalidRequest`] when a captured field is
/// missing, plus the errors of [`visit`].
#[utoipa::path(
    post,
    path = "/r/{slug}",
    tag = "Redirect",
    summary = "Submit the visitor form",
    description = "Checks the fields the link captures, assigns the visitor to the next contact, and returns the hand-off URL with the pixel to fire.",
    params(
        ("slug" = String, Path, description = "Link slug"),
    ),
    request_body = FormSubmission,
    responses(
        (status = 200, description = "Visitor assigned", body = HandoffResponse),
        (status = 400, description = "Required field missing", body = ErrorResponse),
        (status = 404, description = "Link not found", body = ErrorResponse),
        (status = 422, description = "Link inactive or without contacts", body = ErrorResponse),
        (status = 503, description = "Rotation busy, retry", body = ErrorResponse),
    )
)]
pub async fn submit(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    Json(form): Json<FormSubmission>,
) -> Result<impl IntoResponse, RotatorError> {
    let link = resolve_enabled(&state, &slug).await?;
    let visitor = form.into_visitor(request_attribution(&headers, None, None));

    if link.capture_name && visitor.name.is_none() {
        return Err(RotatorError::InvalidRequest("name is required".to_string()));
    }
    if link.capture_phone && visitor.phone.is_none() {
        return Err(RotatorError::InvalidRequest("phone is required".to_string()));
    }

    let assignment = state
        .assignment_service
        .assign(link.id, Some(visitor))
        .await?;
    Ok(Json(HandoffResponse::new(&link, &assignment)))
}

/// Public redirect routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new().route("/r/{slug}", get(visit).post(submit))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn attribution_reads_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        let attribution = request_attribution(&headers, Some("ig".to_string()), None);
        assert_eq!(attribution.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(attribution.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(attribution.utm_source.as_deref(), Some("ig"));
    }

    #[test]
    fn attribution_without_headers() {
        let attribution = request_attribution(&HeaderMap::new(), None, None);
        assert_eq!(attribution, Attribution::default());
    }
}
