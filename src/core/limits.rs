/*!
 * System Limits and Constants
 *
 * Version identifiers, errno values and bounded buffer sizes used by the
 * hardening subsystem.
 */

// =============================================================================
// VERSION IDENTIFIERS
// =============================================================================

/// Hardening feature-set version, bumped whenever the flag layout changes
pub const HARDENED_VERSION: u64 = 1_400_001;

/// Base system version the feature set was built against
pub const BASE_VERSION: u64 = 1_400_000;

/// Crate version string
pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// ERRNO VALUES
// =============================================================================

/// Exec format error, returned for every rejected activation
pub const ENOEXEC: i32 = 8;

/// Invalid argument, returned for malformed sandbox parameters
pub const EINVAL: i32 = 22;

/// No such entry
pub const ENOENT: i32 = 2;

// =============================================================================
// AUDIT BUFFERS
// =============================================================================

/// Privileged channel ring size
pub const MAX_POLICY_EVENTS: usize = 1024;

/// Process-visible channel ring size, per process
pub const MAX_POLICY_EVENTS_PER_PID: usize = 64;

// =============================================================================
// SANDBOX TREE
// =============================================================================

/// Identifier of the root sandbox
pub const ROOT_SANDBOX_ID: u32 = 0;

/// Name of the root sandbox
pub const ROOT_SANDBOX_NAME: &str = "0";
