//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::dto;
use super::handlers;
use crate::domain;
use crate::error::{ErrorBody, ErrorResponse};
use crate::service;

/// Generated OpenAPI description of every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "lead-rotator",
        description = "Round-robin contact rotation and lead assignment for WhatsApp redirect links."
    ),
    paths(
        handlers::system::health_handler,
        handlers::link::create_link,
        handlers::link::list_links,
        handlers::link::get_link,
        handlers::link::update_link,
        handlers::link::delete_link,
        handlers::link::link_status,
        handlers::link::link_stats,
        handlers::link::list_leads,
        handlers::contact::list_contacts,
        handlers::contact::replace_contacts,
        handlers::contact::move_contact,
        handlers::assignment::assign,
        handlers::redirect::visit,
        handlers::redirect::submit,
    ),
    components(schemas(
        ErrorResponse,
        ErrorBody,
        domain::Link,
        domain::LinkMode,
        domain::LinkStatus,
        domain::LinkSummary,
        domain::Contact,
        domain::Lead,
        domain::VisitorInfo,
        domain::Attribution,
        service::LinkStats,
        dto::CreateLinkRequest,
        dto::UpdateLinkRequest,
        dto::LinkDetailResponse,
        dto::LinkListResponse,
        dto::LinkStatusResponse,
        dto::LeadListResponse,
        dto::PaginationMeta,
        dto::ReplaceContactsRequest,
        dto::MoveContactRequest,
        dto::ContactListResponse,
        dto::AssignmentResponse,
        dto::FormDescriptor,
        dto::FormSubmission,
        dto::HandoffResponse,
    )),
    tags(
        (name = "System", description = "Liveness"),
        (name = "Links", description = "Link lifecycle and reporting"),
        (name = "Contacts", description = "Attendant list management"),
        (name = "Assignment", description = "Operator-side visitor assignment"),
        (name = "Redirect", description = "Public visitor endpoints"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_rotation_endpoints() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/api/v1/links/{id}/assign"));
        assert!(paths.contains_key("/api/v1/links/{id}/contacts/move"));
        assert!(paths.contains_key("/r/{slug}"));
        assert!(paths.contains_key("/health"));
    }
}
