/*!
 * Feature State Validators
 *
 * Self-correcting validation for the persisted feature states. An invalid
 * raw value is never kept: it is replaced by the enumeration's safe default
 * and the caller is told a correction happened.
 */

use crate::core::types::RawState;
use serde::{Deserialize, Serialize};

/// Outcome of validating a raw feature state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "always use the corrected state"]
pub struct StateCheck<S> {
    /// False when the raw value was out of range and got corrected
    pub ok: bool,
    /// The state to use; equals the safe default when `ok` is false
    pub state: S,
}

/// Enumerated feature state with an integer encoding and a safe default
pub trait FeatureStateKind: Copy + Eq + std::fmt::Display + Sized {
    /// Value substituted for anything out of range
    const SAFE_DEFAULT: Self;

    fn from_raw(raw: RawState) -> Option<Self>;

    fn as_raw(self) -> RawState;

    /// Validate a raw persisted value, correcting it to the safe default
    fn validate(raw: RawState) -> StateCheck<Self> {
        match Self::from_raw(raw) {
            Some(state) => StateCheck { ok: true, state },
            None => StateCheck {
                ok: false,
                state: Self::SAFE_DEFAULT,
            },
        }
    }
}

/// Four-way feature state governing a mitigation's default applicability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureState {
    Disabled,
    OptIn,
    OptOut,
    ForceEnabled,
}

impl FeatureStateKind for FeatureState {
    const SAFE_DEFAULT: Self = FeatureState::ForceEnabled;

    fn from_raw(raw: RawState) -> Option<Self> {
        match raw {
            0 => Some(FeatureState::Disabled),
            1 => Some(FeatureState::OptIn),
            2 => Some(FeatureState::OptOut),
            3 => Some(FeatureState::ForceEnabled),
            _ => None,
        }
    }

    fn as_raw(self) -> RawState {
        match self {
            FeatureState::Disabled => 0,
            FeatureState::OptIn => 1,
            FeatureState::OptOut => 2,
            FeatureState::ForceEnabled => 3,
        }
    }
}

impl FeatureState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            FeatureState::Disabled => "disabled",
            FeatureState::OptIn => "opt-in",
            FeatureState::OptOut => "opt-out",
            FeatureState::ForceEnabled => "force enabled",
        }
    }
}

impl std::fmt::Display for FeatureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two-way feature state for plain on/off toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimpleFeatureState {
    Disabled,
    Enabled,
}

impl FeatureStateKind for SimpleFeatureState {
    const SAFE_DEFAULT: Self = SimpleFeatureState::Enabled;

    fn from_raw(raw: RawState) -> Option<Self> {
        match raw {
            0 => Some(SimpleFeatureState::Disabled),
            1 => Some(SimpleFeatureState::Enabled),
            _ => None,
        }
    }

    fn as_raw(self) -> RawState {
        match self {
            SimpleFeatureState::Disabled => 0,
            SimpleFeatureState::Enabled => 1,
        }
    }
}

impl SimpleFeatureState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SimpleFeatureState::Disabled => "disabled",
            SimpleFeatureState::Enabled => "enabled",
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, SimpleFeatureState::Enabled)
    }
}

impl std::fmt::Display for SimpleFeatureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
