/*!
 * Global Defaults
 *
 * Process-wide feature settings the root sandbox is seeded from. Every
 * tunable goes through its state validator at startup; an invalid value is
 * corrected to the safe default and reported, never kept.
 */

use super::HardeningConfig;
use crate::policy::registry::ModuleRegistry;
use crate::sandbox::types::FeatureSettings;
use tracing::{debug, warn};

/// Validated global feature settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalDefaults {
    settings: FeatureSettings,
    corrections: Vec<String>,
}

impl GlobalDefaults {
    /// Validate the configured tunables for every registered module
    pub fn from_config(config: &HardeningConfig, registry: &ModuleRegistry) -> Self {
        let mut settings = FeatureSettings::new();
        let mut corrections = Vec::new();

        for (module, tunable) in registry.tunables() {
            let value = match config.tunables.get(tunable.key) {
                None => tunable.default,
                Some(&raw) => {
                    let (ok, value) = tunable.default.revalidate(raw);
                    if !ok {
                        warn!(
                            module,
                            key = tunable.key,
                            raw,
                            corrected = %value,
                            "WARNING, invalid hardening setting"
                        );
                        corrections.push(tunable.key.to_string());
                    }
                    value
                }
            };

            debug!(module, key = tunable.key, status = %value, "Feature status");
            settings.set(tunable.key, value);
        }

        for name in config.tunables.keys() {
            if settings.get(name).is_none() {
                warn!(key = %name, "Ignoring unknown hardening tunable");
            }
        }

        Self {
            settings,
            corrections,
        }
    }

    pub fn settings(&self) -> &FeatureSettings {
        &self.settings
    }

    /// Tunables whose configured value had to be corrected
    pub fn corrections(&self) -> &[String] {
        &self.corrections
    }
}
