/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::limits::{EINVAL, ENOENT, ENOEXEC};
use super::types::{Pid, RawFlags, SandboxId, Tid};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Policy operation result
///
/// # Must Use
/// A rejected activation must never be ignored, the image must not run
#[must_use = "policy operations can fail and must be handled"]
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Sandbox operation result
#[must_use = "sandbox operations can fail and must be handled"]
pub type SandboxResult<T> = Result<T, SandboxError>;

/// Which check tripped after the feature modules ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvariantViolation {
    UnknownFlags,
    ConflictingFlags,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvariantViolation::UnknownFlags => write!(f, "unknown flags"),
            InvariantViolation::ConflictingFlags => write!(f, "inconsistent flags"),
        }
    }
}

/// Policy errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum PolicyError {
    #[error("unknown flags: {flags:#x}")]
    #[diagnostic(
        code(policy::malformed_request),
        help("The image metadata requests bits outside the known mitigation set.")
    )]
    MalformedRequest { flags: RawFlags },

    #[error("inconsistent flags: {flags:#x}")]
    #[diagnostic(
        code(policy::conflicting_request),
        help("A mitigation is requested both enabled and disabled. Fix the image attributes.")
    )]
    ConflictingRequest { flags: RawFlags },

    #[error("{violation} after the setup: {flags:#x}")]
    #[diagnostic(
        code(policy::post_merge_invariant),
        help("A feature module emitted an invalid contribution. This is an internal defect.")
    )]
    PostMergeInvariantViolation {
        flags: RawFlags,
        violation: InvariantViolation,
    },

    #[error("sandbox {sandbox} initialization failed in module {module}: {source}")]
    #[diagnostic(
        code(policy::sandbox_init),
        help("Check the sandbox parameter list. The sandbox was not created.")
    )]
    SandboxInitFailure {
        sandbox: String,
        module: String,
        #[source]
        source: SandboxError,
    },

    #[error("root sandbox initialization failed in module {module}: {source}")]
    #[diagnostic(
        code(policy::root_sandbox_init),
        help("The global defaults are unusable. The subsystem cannot start.")
    )]
    RootSandboxInit {
        module: String,
        #[source]
        source: SandboxError,
    },

    #[error("sandbox {0} not found")]
    #[diagnostic(code(policy::sandbox_not_found))]
    SandboxNotFound(SandboxId),

    #[error("sandbox {0} is busy: {1}")]
    #[diagnostic(code(policy::sandbox_busy))]
    SandboxBusy(SandboxId, String),

    #[error("process {0} not found")]
    #[diagnostic(code(policy::process_not_found))]
    ProcessNotFound(Pid),

    #[error("thread {tid} does not belong to process {pid}")]
    #[diagnostic(
        code(policy::foreign_thread),
        help("Policy can only be inspected or committed from the process's own threads.")
    )]
    ForeignThread { pid: Pid, tid: Tid },

    #[error("configuration error: {0}")]
    #[diagnostic(code(policy::config))]
    Config(String),
}

impl PolicyError {
    /// errno the image activator reports for this error
    #[must_use]
    pub const fn errno(&self) -> i32 {
        match self {
            PolicyError::MalformedRequest { .. }
            | PolicyError::ConflictingRequest { .. }
            | PolicyError::PostMergeInvariantViolation { .. } => ENOEXEC,
            PolicyError::SandboxNotFound(_) | PolicyError::ProcessNotFound(_) => ENOENT,
            _ => EINVAL,
        }
    }

    /// Whether this error aborts an image activation
    #[inline]
    #[must_use]
    pub const fn is_exec_failure(&self) -> bool {
        self.errno() == ENOEXEC
    }

    /// True only for failures that cannot be caused by user input
    #[inline]
    #[must_use]
    pub const fn is_internal_defect(&self) -> bool {
        matches!(self, PolicyError::PostMergeInvariantViolation { .. })
    }
}

/// Sandbox-level initialization errors reported by feature modules
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SandboxError {
    #[error("invalid parameter {key}: {reason}")]
    #[diagnostic(code(sandbox::invalid_parameter))]
    InvalidParameter { key: String, reason: String },

    #[error("module {module} failed: {reason}")]
    #[diagnostic(code(sandbox::module_failure))]
    ModuleFailure { module: String, reason: String },
}

impl SandboxError {
    #[must_use]
    pub const fn errno(&self) -> i32 {
        EINVAL
    }
}
