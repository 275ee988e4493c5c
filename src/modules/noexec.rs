/*!
 * Non-Exec Enforcement Module
 *
 * PAGEEXEC removes write+exec mappings, MPROTECT forbids introducing
 * executable pages later. MPROTECT is meaningless without PAGEEXEC, so
 * enabling it also forces PAGEEXEC on.
 */

use super::common::{effective_state, inherit_tunables, resolve_mitigation};
use crate::core::errors::SandboxResult;
use crate::policy::flags::{FlagSet, Mitigation};
use crate::policy::resolver::ImageParams;
use crate::policy::state::FeatureState;
use crate::policy::traits::{FeatureModule, Tunable};
use crate::process::ThreadContext;
use crate::sandbox::types::{FeatureSettings, ParamList, SandboxInit};
use tracing::trace;

pub const PAGEEXEC_STATUS: &str = "hardening.pax.pageexec.status";
pub const MPROTECT_STATUS: &str = "hardening.pax.mprotect.status";

const TUNABLES: &[Tunable] = &[
    Tunable::four_way(PAGEEXEC_STATUS, FeatureState::OptOut),
    Tunable::four_way(MPROTECT_STATUS, FeatureState::OptOut),
];

/// Combined PAGEEXEC and MPROTECT contribution
#[must_use]
pub fn noexec_flags(pageexec: FeatureState, mprotect: FeatureState, mode: FlagSet) -> FlagSet {
    let mut flags = resolve_mitigation(pageexec, mode, Mitigation::PageExec);
    let mprotect_flags = resolve_mitigation(mprotect, mode, Mitigation::Mprotect);

    if mprotect_flags.contains(FlagSet::MPROTECT) {
        flags.remove(FlagSet::NOPAGEEXEC);
        flags.insert(FlagSet::PAGEEXEC);
    }

    flags | mprotect_flags
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoexecModule;

impl FeatureModule for NoexecModule {
    fn name(&self) -> &'static str {
        "noexec"
    }

    fn tunables(&self) -> &'static [Tunable] {
        TUNABLES
    }

    fn compute_flags(
        &self,
        _image: &ImageParams,
        thread: &ThreadContext,
        settings: &FeatureSettings,
        mode: FlagSet,
    ) -> FlagSet {
        let pageexec = effective_state(settings, PAGEEXEC_STATUS);
        let mprotect = effective_state(settings, MPROTECT_STATUS);
        let flags = noexec_flags(pageexec, mprotect, mode);

        trace!(pid = thread.pid(), %pageexec, %mprotect, flags = flags.bits(), "noexec flags");
        flags
    }

    fn init_for_sandbox(
        &self,
        sandbox: &mut SandboxInit,
        params: &ParamList,
    ) -> SandboxResult<()> {
        inherit_tunables(self.name(), TUNABLES, sandbox, params)
    }
}
