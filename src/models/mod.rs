//! Core data models for the bucket gateway.
//!
//! Everything here is a request-scoped value: listings mirror remote store
//! state at read time, fetched objects are discarded once the response is
//! written, and articles are recomputed from the listing on every request.

pub mod article;
pub mod object;
