/*!
 * Hardening Configuration
 *
 * Environment variables:
 * - HARDENING_CONFIG: path of a JSON config document (default: built-in)
 * - HARDENING_TUNABLES: comma-separated `name=value` overrides, e.g.
 *   `hardening.pax.aslr.status=3,hardening.pax.mprotect.status=1`
 */

pub mod defaults;

pub use defaults::GlobalDefaults;

use crate::core::errors::{PolicyError, PolicyResult};
use crate::core::types::RawState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "HARDENING_CONFIG";

/// Environment variable carrying tunable overrides
pub const TUNABLES_ENV: &str = "HARDENING_TUNABLES";

/// Which attribute-transport channels are compiled in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ControlChannels {
    /// Access-control-list carried flags
    pub acl: bool,
    /// Extended-attribute carried flags
    pub extattr: bool,
    /// Honour a thread's sticky prefer-ACL policy across activations
    pub acl_override: bool,
}

impl Default for ControlChannels {
    fn default() -> Self {
        Self {
            acl: true,
            extattr: true,
            acl_override: true,
        }
    }
}

/// Top-level hardening configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct HardeningConfig {
    pub control: ControlChannels,
    /// Whether the disallow-low-address companion module is applicable
    pub map32bit: bool,
    /// Raw tunable values keyed by tunable name
    pub tunables: BTreeMap<String, RawState>,
}

impl Default for HardeningConfig {
    fn default() -> Self {
        Self {
            control: ControlChannels::default(),
            map32bit: cfg!(target_pointer_width = "64"),
            tunables: BTreeMap::new(),
        }
    }
}

impl HardeningConfig {
    /// Load from `HARDENING_CONFIG` (if set) and apply `HARDENING_TUNABLES`
    pub fn load() -> PolicyResult<Self> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };

        if let Ok(overrides) = std::env::var(TUNABLES_ENV) {
            config.apply_overrides(&overrides)?;
        }

        info!(
            acl = config.control.acl,
            extattr = config.control.extattr,
            acl_override = config.control.acl_override,
            map32bit = config.map32bit,
            tunables = config.tunables.len(),
            "Hardening configuration loaded"
        );
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> PolicyResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| PolicyError::Config(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Reading hardening configuration");
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> PolicyResult<Self> {
        serde_json::from_str(text).map_err(|e| PolicyError::Config(e.to_string()))
    }

    /// Apply `name=value[,name=value...]` overrides on top of the tunables
    pub fn apply_overrides(&mut self, overrides: &str) -> PolicyResult<()> {
        for entry in overrides.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, value) = entry.split_once('=').ok_or_else(|| {
                PolicyError::Config(format!("expected name=value, got {:?}", entry))
            })?;
            let raw = value.trim().parse::<RawState>().map_err(|e| {
                PolicyError::Config(format!("tunable {}: {}", name.trim(), e))
            })?;
            self.tunables.insert(name.trim().to_string(), raw);
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn with_tunable(mut self, name: impl Into<String>, raw: RawState) -> Self {
        self.tunables.insert(name.into(), raw);
        self
    }
}
