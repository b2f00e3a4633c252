//! Request-scoped logging context.
//!
//! Created by the transport for each request and handed to every orchestrator
//! call. Orchestrators run their work inside `span`, so every event emitted
//! while serving the request carries the same `request_id`.

use tracing::{Span, info_span};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct RequestContext {
    pub request_id: Uuid,
    span: Span,
}

impl RequestContext {
    pub fn new(operation: &'static str) -> Self {
        let request_id = Uuid::new_v4();
        let span = info_span!("request", op = operation, request_id = %request_id);
        Self { request_id, span }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}
