/*!
 * Generic Hardening Module
 *
 * Owns shared-library load-order randomization (a four-way state) and the
 * procfs hardening toggle (a simple state, no flag contribution).
 */

use super::common::{effective_state, inherit_tunables, resolve_mitigation};
use crate::core::errors::SandboxResult;
use crate::policy::flags::{FlagSet, Mitigation};
use crate::policy::resolver::ImageParams;
use crate::policy::state::{FeatureState, SimpleFeatureState};
use crate::policy::traits::{FeatureModule, Tunable};
use crate::process::ThreadContext;
use crate::sandbox::types::{FeatureSettings, ParamList, SandboxInit};

pub const SHLIBRANDOM_STATUS: &str = "hardening.pax.shlibrandom.status";
pub const PROCFS_HARDEN: &str = "hardening.procfs_harden";

const TUNABLES: &[Tunable] = &[
    Tunable::four_way(SHLIBRANDOM_STATUS, FeatureState::OptOut),
    Tunable::simple(PROCFS_HARDEN, SimpleFeatureState::Enabled),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct HardeningModule;

impl FeatureModule for HardeningModule {
    fn name(&self) -> &'static str {
        "hardening"
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
            effective_state(settings, SHLIBRANDOM_STATUS),
            mode,
            Mitigation::ShlibRandom,
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
