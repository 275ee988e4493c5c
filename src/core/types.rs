/*!
 * Core Types
 * Common types used across the hardening subsystem
 */

/// Process ID type
pub type Pid = u32;

/// Thread ID type (unique per process table)
pub type Tid = u32;

/// Sandbox (jail) identifier, the root sandbox is always 0
pub type SandboxId = u32;

/// Raw flag word as carried by image metadata and log lines
pub type RawFlags = u32;

/// Raw persisted feature-state value (tunables, jail parameters)
pub type RawState = i64;
