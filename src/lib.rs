/*!
 * Hardening Kernel Library
 *
 * Per-process exploit-mitigation policy negotiation and enforcement:
 * - Mitigation flag codec and feature-state validators
 * - Request resolution from image attribute channels
 * - Validation, feature dispatch and atomic per-process commit
 * - Hierarchical sandbox contexts seeded through the module cascade
 */

pub mod config;
pub mod core;
pub mod kernel;
pub mod modules;
pub mod monitoring;
pub mod policy;
pub mod process;
pub mod sandbox;

// Re-exports
pub use config::{ControlChannels, GlobalDefaults, HardeningConfig};
pub use crate::core::errors::{
    InvariantViolation, PolicyError, PolicyResult, SandboxError, SandboxResult,
};
pub use crate::core::types::{Pid, RawFlags, RawState, SandboxId, Tid};
pub use kernel::{version_context, HardeningKernel};
pub use monitoring::{init_tracing, EventSeverity, LogChannel, PolicyAuditor, PolicyEvent};
pub use policy::{
    has_conflict, is_known, requested_flags, validate_request, validate_result, ActivationEngine,
    ActivationPhase, ActivationReport, FeatureModule, FeatureState, FeatureStateKind, FlagSet,
    ImageParams, Mitigation, ModuleRegistry, SimpleFeatureState, StateCheck, Tunable,
};
pub use process::{PolicyView, Process, ProcessTable, ThreadContext};
pub use sandbox::{
    FeatureSettings, ParamList, ParamValue, Sandbox, SandboxInit, SandboxTree, SettingValue,
};
