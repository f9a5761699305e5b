//! Data Transfer Objects for REST request/response serialization.

pub mod assignment_dto;
pub mod common_dto;
pub mod contact_dto;
pub mod link_dto;

pub use assignment_dto::*;
pub use common_dto::*;
pub use contact_dto::*;
pub use link_dto::*;
