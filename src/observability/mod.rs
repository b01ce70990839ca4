//! Observability for the garden node
//!
//! Structured logging through `tracing`, with span macros for the cycle,
//! network association and broker operations.

pub mod logging;

pub use logging::{init_default_logging, init_logging, LogFormat};

// Span macros for structured logging
pub use logging::{cycle_span, mqtt_span, network_span};
