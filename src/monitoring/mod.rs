/*!
 * Monitoring Module
 * Structured tracing and the dual-channel policy audit trail
 */

pub mod audit;
pub mod tracer;

pub use audit::{EventSeverity, LogChannel, PolicyAuditor, PolicyEvent, NON_DEFAULT_NOTICE};
pub use tracer::{activation_span, init_tracing};
