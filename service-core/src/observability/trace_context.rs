//! W3C Trace Context propagation for outbound HTTP calls.
//!
//! Requests to third-party APIs carry `traceparent`/`tracestate` taken from
//! the current span so they line up with the inbound request in traces.
//!
//! See: https://www.w3.org/TR/trace-context/

use opentelemetry::trace::TraceContextExt;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub const TRACEPARENT_HEADER: &str = "traceparent";

pub const TRACESTATE_HEADER: &str = "tracestate";

/// Correlation id set on every inbound request and echoed on the response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Headers describing the current span. Empty when no OpenTelemetry context
/// is active, e.g. with the OTLP exporter disabled.
pub fn current_trace_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();

    let context = Span::current().context();
    let span = context.span();
    let span_context = span.span_context();
    if !span_context.is_valid() {
        return headers;
    }

    // version-trace_id-span_id-trace_flags
    let traceparent = format!(
        "00-{}-{}-{:02x}",
        span_context.trace_id(),
        span_context.span_id(),
        span_context.trace_flags().to_u8()
    );
    if let Ok(value) = HeaderValue::from_str(&traceparent) {
        headers.insert(TRACEPARENT_HEADER, value);
    }

    let tracestate = span_context.trace_state().header();
    if !tracestate.is_empty()
        && let Ok(value) = HeaderValue::from_str(&tracestate)
    {
        headers.insert(TRACESTATE_HEADER, value);
    }

    headers
}

/// Attach the current trace context to an outgoing request.
///
/// Call it last, right before `send`, so the headers describe the span that
/// actually performs the call.
pub trait PropagateTrace {
    fn propagate_trace(self) -> Self;
}

impl PropagateTrace for reqwest::RequestBuilder {
    fn propagate_trace(self) -> Self {
        self.headers(current_trace_headers())
    }
}
