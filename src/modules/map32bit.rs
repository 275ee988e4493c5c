/*!
 * Disallow Low-Address Mapping Module
 * Companion to randomization on targets that support 32-bit address hints
 */

use super::common::{effective_state, inherit_tunables, resolve_mitigation};
use crate::core::errors::SandboxResult;
use crate::policy::flags::{FlagSet, Mitigation};
use crate::policy::resolver::ImageParams;
use crate::policy::state::FeatureState;
use crate::policy::traits::{FeatureModule, Tunable};
use crate::process::ThreadContext;
use crate::sandbox::types::{FeatureSettings, ParamList, SandboxInit};

pub const MAP32BIT_STATUS: &str = "hardening.pax.disallow_map32bit.status";

const TUNABLES: &[Tunable] = &[Tunable::four_way(MAP32BIT_STATUS, FeatureState::OptIn)];

#[derive(Debug, Clone, Copy, Default)]
pub struct DisallowMap32BitModule;

impl FeatureModule for DisallowMap32BitModule {
    fn name(&self) -> &'static str {
        "disallow_map32bit"
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
        resolve_mitigation(
            effective_state(settings, MAP32BIT_STATUS),
            mode,
            Mitigation::DisallowMap32Bit,
        )
    }

    fn init_for_sandbox(
        &self,
        sandbox: &mut SandboxInit,
        params: &ParamList,
    ) -> SandboxResult<()> {
        inherit_tunables(self.name(), TUNABLES, sandbox, params)
    }
}
