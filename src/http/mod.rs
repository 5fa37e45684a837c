//! HTTP transport layer.
//!
//! Thin glue between axum and the registry: route handlers, payload shapes, and
//! the status mapping applied by `RegistryError`'s response conversion.

pub mod handlers;
