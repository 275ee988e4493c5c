/*!
 * Policy Traits
 * Contract every feature module implements
 */

use super::flags::FlagSet;
use super::resolver::ImageParams;
use super::state::{FeatureState, SimpleFeatureState};
use crate::core::errors::SandboxResult;
use crate::process::ThreadContext;
use crate::sandbox::types::{FeatureSettings, ParamList, SandboxInit, SettingValue};

/// A global tunable owned by a feature module, with its built-in default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tunable {
    pub key: &'static str,
    pub default: SettingValue,
}

impl Tunable {
    pub const fn four_way(key: &'static str, default: FeatureState) -> Self {
        Self {
            key,
            default: SettingValue::FourWay(default),
        }
    }

    pub const fn simple(key: &'static str, default: SimpleFeatureState) -> Self {
        Self {
            key,
            default: SettingValue::Simple(default),
        }
    }
}

/// Independently compiled mitigation feature
///
/// Modules only emit bits of their own mitigations. Their output is unioned
/// with the other modules' and re-validated before commit.
#[cfg_attr(test, mockall::automock)]
pub trait FeatureModule: Send + Sync {
    /// Short module name used in logs and errors
    fn name(&self) -> &'static str;

    /// Tunables this module reads from the sandbox settings
    fn tunables(&self) -> &'static [Tunable] {
        &[]
    }

    /// Contribution of this module to the policy of a new image.
    ///
    /// `settings` is the sandbox snapshot taken once for the whole activation.
    fn compute_flags(
        &self,
        image: &ImageParams,
        thread: &ThreadContext,
        settings: &FeatureSettings,
        mode: FlagSet,
    ) -> FlagSet;

    /// Seed this module's settings in a sandbox under construction
    fn init_for_sandbox(&self, sandbox: &mut SandboxInit, params: &ParamList)
        -> SandboxResult<()>;
}
