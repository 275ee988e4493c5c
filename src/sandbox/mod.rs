/*!
 * Sandbox Module
 *
 * Hierarchical sandbox (jail) contexts carrying per-feature defaults:
 * - Root sandbox seeded from the global defaults
 * - Children derived from their parent plus a jail parameter list
 * - Settings swapped atomically on the explicit update path
 */

pub mod cascade;
pub mod tree;
pub mod types;

pub use tree::SandboxTree;
pub use types::{FeatureSettings, ParamList, ParamValue, Sandbox, SandboxInit, SettingValue};
