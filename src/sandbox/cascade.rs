/*!
 * Sandbox Cascade Initializer
 *
 * Runs every feature module's sandbox initializer in dispatch order and
 * stops at the first failure. Nothing is rolled back per module; the
 * caller drops the whole partially built context instead.
 */

use super::types::{FeatureSettings, ParamList, SandboxInit};
use crate::core::errors::SandboxError;
use crate::policy::registry::ModuleRegistry;
use tracing::{debug, warn};

/// First module that failed, with its error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeFailure {
    pub module: &'static str,
    pub source: SandboxError,
}

/// Initialize a sandbox's settings from `inherited` and `params`
pub fn initialize(
    registry: &ModuleRegistry,
    name: &str,
    inherited: FeatureSettings,
    params: &ParamList,
) -> Result<FeatureSettings, CascadeFailure> {
    debug!(sandbox = name, modules = registry.len(), "Setting sandbox hardening variables");

    let mut init = SandboxInit::new(name, inherited);
    for module in registry.iter() {
        if let Err(source) = module.init_for_sandbox(&mut init, params) {
            warn!(
                sandbox = name,
                module = module.name(),
                error = %source,
                "Sandbox initialization failed"
            );
            return Err(CascadeFailure {
                module: module.name(),
                source,
            });
        }
        debug!(sandbox = name, module = module.name(), "Initialized sandbox module");
    }

    Ok(init.into_settings())
}
