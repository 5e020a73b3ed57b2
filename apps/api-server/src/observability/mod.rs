//! Observability module - request ids on top of the tracing spans.

mod request_id;

pub use request_id::propagate_request_id;
