/*!
 * Segmentation-Violation Guard Module
 */

use super::common::{effective_state, inherit_tunables, resolve_mitigation};
use crate::core::errors::SandboxResult;
use crate::policy::flags::{FlagSet, Mitigation};
use crate::policy::resolver::ImageParams;
use crate::policy::state::FeatureState;
use crate::policy::traits::{FeatureModule, Tunable};
use crate::process::ThreadContext;
use crate::sandbox::types::{FeatureSettings, ParamList, SandboxInit};

pub const SEGVGUARD_STATUS: &str = "hardening.pax.segvguard.status";

const TUNABLES: &[Tunable] = &[Tunable::four_way(SEGVGUARD_STATUS, FeatureState::OptIn)];

#[derive(Debug, Clone, Copy, Default)]
pub struct SegvguardModule;

impl FeatureModule for SegvguardModule {
    fn name(&self) -> &'static str {
        "segvguard"
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
            effective_state(settings, SEGVGUARD_STATUS),
            mode,
            Mitigation::Segvguard,
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
