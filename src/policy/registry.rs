/*!
 * Feature Module Registry
 *
 * The single ordered list of compiled-in feature modules. Dispatch and the
 * sandbox cascade both walk it front to back:
 * 1. Randomization
 * 2. Disallow low-address mapping (only where applicable)
 * 3. Non-exec enforcement
 * 4. Guard tracking
 * 5. Generic hardening
 */

use super::traits::{FeatureModule, Tunable};
use crate::config::HardeningConfig;
use crate::modules::{
    AslrModule, DisallowMap32BitModule, HardeningModule, NoexecModule, SegvguardModule,
};
use std::sync::Arc;
use tracing::info;

/// Ordered registry of feature modules
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn FeatureModule>>,
}

impl ModuleRegistry {
    /// Empty registry; modules are appended in dispatch order
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard module set for the given configuration
    pub fn standard(config: &HardeningConfig) -> Self {
        let mut registry = Self::new().with_module(Arc::new(AslrModule));
        if config.map32bit {
            registry = registry.with_module(Arc::new(DisallowMap32BitModule));
        }
        let registry = registry
            .with_module(Arc::new(NoexecModule))
            .with_module(Arc::new(SegvguardModule))
            .with_module(Arc::new(HardeningModule));

        info!(modules = ?registry.names(), "Feature module registry initialized");
        registry
    }

    /// Append a module after the ones already registered
    #[inline]
    #[must_use]
    pub fn with_module(mut self, module: Arc<dyn FeatureModule>) -> Self {
        self.modules.push(module);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn FeatureModule>> {
        self.modules.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    /// Every tunable declared by a registered module, tagged with its owner
    pub fn tunables(&self) -> impl Iterator<Item = (&'static str, &'static Tunable)> + '_ {
        self.modules
            .iter()
            .flat_map(|m| m.tunables().iter().map(move |t| (m.name(), t)))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.names())
            .finish()
    }
}
