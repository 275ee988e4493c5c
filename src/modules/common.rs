/*!
 * Shared Feature Module Logic
 * Four-state resolution and jail parameter inheritance
 */

use crate::core::errors::{SandboxError, SandboxResult};
use crate::policy::flags::{FlagSet, Mitigation};
use crate::policy::state::{FeatureState, FeatureStateKind};
use crate::policy::traits::Tunable;
use crate::sandbox::types::{FeatureSettings, ParamList, ParamValue, SandboxInit};
use tracing::{trace, warn};

/// Resolve one mitigation's enable/disable bit from its state and the request
#[must_use]
pub fn resolve_mitigation(status: FeatureState, mode: FlagSet, mitigation: Mitigation) -> FlagSet {
    let enabled = match status {
        FeatureState::Disabled => false,
        FeatureState::ForceEnabled => true,
        FeatureState::OptIn => mode.contains(mitigation.enable()),
        FeatureState::OptOut => !mode.contains(mitigation.disable()),
    };

    if enabled {
        mitigation.enable()
    } else {
        mitigation.disable()
    }
}

/// Effective four-way state of `key` in a sandbox settings snapshot.
/// A missing entry is treated as force-enabled.
#[must_use]
pub fn effective_state(settings: &FeatureSettings, key: &str) -> FeatureState {
    settings.state(key).unwrap_or(FeatureState::SAFE_DEFAULT)
}

/// Copy every tunable from the inherited settings, then apply this module's
/// keys from the parameter list.
///
/// A missing key keeps the inherited value. An out-of-range integer is
/// reported and ignored. A non-integer value fails the whole sandbox.
pub fn inherit_tunables(
    module: &str,
    tunables: &[Tunable],
    sandbox: &mut SandboxInit,
    params: &ParamList,
) -> SandboxResult<()> {
    for tunable in tunables {
        let inherited = sandbox
            .inherited()
            .get(tunable.key)
            .unwrap_or(tunable.default);

        let value = match params.get(tunable.key) {
            None => inherited,
            Some(ParamValue::Int(raw)) => {
                let (ok, corrected) = inherited.revalidate(*raw);
                if ok {
                    corrected
                } else {
                    warn!(
                        module,
                        sandbox = sandbox.name(),
                        key = tunable.key,
                        raw = *raw,
                        keeping = %inherited,
                        "invalid sandbox parameter ignored"
                    );
                    inherited
                }
            }
            Some(ParamValue::Str(text)) => {
                return Err(SandboxError::InvalidParameter {
                    key: tunable.key.to_string(),
                    reason: format!("expected an integer state, got {:?}", text),
                });
            }
        };

        trace!(
            module,
            sandbox = sandbox.name(),
            key = tunable.key,
            state = %value,
            "sandbox setting"
        );
        sandbox.settings_mut().set(tunable.key, value);
    }

    Ok(())
}
