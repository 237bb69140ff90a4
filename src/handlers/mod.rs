//! HTTP handlers. Each one extracts the actor, calls a service and wraps the result in the envelope.

pub mod admin;
pub mod backup;
