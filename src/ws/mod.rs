//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The WebSocket endpoint at `/ws` streams [`crate::domain::RotationEvent`]s
//! for the links a client subscribes to, and answers status queries.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
