pub mod logging;
pub mod trace_context;

pub use logging::init_tracing;
pub use trace_context::{
    PropagateTrace, REQUEST_ID_HEADER, TRACEPARENT_HEADER, TRACESTATE_HEADER,
    current_trace_headers,
};
