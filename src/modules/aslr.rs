/*!
 * Address-Space Randomization Module
 */

use super::common::{effective_state, inherit_tunables, resolve_mitigation};
use crate::core::errors::SandboxResult;
use crate::policy::flags::{FlagSet, Mitigation};
use crate::policy::resolver::ImageParams;
use crate::policy::state::FeatureState;
use crate::policy::traits::{FeatureModule, Tunable};
use crate::process::ThreadContext;
use crate::sandbox::types::{FeatureSettings, ParamList, SandboxInit};

pub const ASLR_STATUS: &str = "hardening.pax.aslr.status";

const TUNABLES: &[Tunable] = &[Tunable::four_way(ASLR_STATUS, FeatureState::OptOut)];

/// Randomization request handling
#[derive(Debug, Clone, Copy, Default)]
pub struct AslrModule;

impl FeatureModule for AslrModule {
    fn name(&self) -> &'static str {
        "aslr"
    }

    fn tunables(&self) -> &'static [Tunable] {
        TUNABLES
    }

    fn compute_flags(
        &self,
        _image: &ImageParams,
        _thread: &ThreadContext,
        settings: &FeatureSettings,
        mode: FlagSet,
    ) -> FlagSet {
        resolve_mitigation(effective_state(settings, ASLR_STATUS), mode, Mitigation::Aslr)
    }

    fn init_for_sandbox(
        &self,
        sandbox: &mut SandboxInit,
        params: &ParamList,
    ) -> SandboxResult<()> {
        inherit_tunables(self.name(), TUNABLES, sandbox, params)
    }
}
