/*!
 * Sandbox Types
 * Sandbox contexts, their per-feature settings and jail parameter lists
 */

use crate::core::types::{RawState, SandboxId};
use crate::policy::state::{FeatureState, FeatureStateKind, SimpleFeatureState};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A single stored feature setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "state")]
pub enum SettingValue {
    FourWay(FeatureState),
    Simple(SimpleFeatureState),
}

impl SettingValue {
    #[must_use]
    pub fn as_raw(self) -> RawState {
        match self {
            SettingValue::FourWay(state) => state.as_raw(),
            SettingValue::Simple(state) => state.as_raw(),
        }
    }

    /// Validate `raw` against this value's enumeration
    pub fn revalidate(self, raw: RawState) -> (bool, SettingValue) {
        match self {
            SettingValue::FourWay(_) => {
                let check = FeatureState::validate(raw);
                (check.ok, SettingValue::FourWay(check.state))
            }
            SettingValue::Simple(_) => {
                let check = SimpleFeatureState::validate(raw);
                (check.ok, SettingValue::Simple(check.state))
            }
        }
    }
}

impl std::fmt::Display for SettingValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingValue::FourWay(state) => std::fmt::Display::fmt(state, f),
            SettingValue::Simple(state) => std::fmt::Display::fmt(state, f),
        }
    }
}

/// Feature settings keyed by tunable name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSettings {
    values: BTreeMap<String, SettingValue>,
}

impl FeatureSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<SettingValue> {
        self.values.get(key).copied()
    }

    /// Four-way state for `key`, if one is stored
    pub fn state(&self, key: &str) -> Option<FeatureState> {
        match self.values.get(key) {
            Some(SettingValue::FourWay(state)) => Some(*state),
            _ => None,
        }
    }

    /// Simple state for `key`, if one is stored
    pub fn simple(&self, key: &str) -> Option<SimpleFeatureState> {
        match self.values.get(key) {
            Some(SettingValue::Simple(state)) => Some(*state),
            _ => None,
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: SettingValue) {
        self.values.insert(key.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SettingValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Raw value of a jail parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(RawState),
    Str(String),
}

/// Named key/value option list handed to sandbox creation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamList {
    entries: BTreeMap<String, ParamValue>,
}

impl ParamList {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_int(mut self, key: impl Into<String>, value: RawState) -> Self {
        self.entries.insert(key.into(), ParamValue::Int(value));
        self
    }

    #[inline]
    #[must_use]
    pub fn with_str(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), ParamValue::Str(value.into()));
        self
    }

    /// Parse `key=value` pairs; integer values become [`ParamValue::Int`]
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = &'a str>) -> Self {
        let mut list = Self::new();
        for pair in pairs {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = match value.trim().parse::<RawState>() {
                Ok(raw) => ParamValue::Int(raw),
                Err(_) => ParamValue::Str(value.to_string()),
            };
            list.entries.insert(key.trim().to_string(), value);
        }
        list
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Sandbox context under construction, passed to each module's initializer
#[derive(Debug, Clone)]
pub struct SandboxInit {
    name: String,
    inherited: FeatureSettings,
    settings: FeatureSettings,
}

impl SandboxInit {
    pub fn new(name: impl Into<String>, inherited: FeatureSettings) -> Self {
        Self {
            name: name.into(),
            inherited,
            settings: FeatureSettings::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Values from the parent sandbox, the global defaults, or the sandbox's
    /// own current values when updating
    pub fn inherited(&self) -> &FeatureSettings {
        &self.inherited
    }

    pub fn settings(&self) -> &FeatureSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut FeatureSettings {
        &mut self.settings
    }

    pub fn into_settings(self) -> FeatureSettings {
        self.settings
    }
}

/// Initialized sandbox context
pub struct Sandbox {
    id: SandboxId,
    name: String,
    parent: Option<SandboxId>,
    settings: ArcSwap<FeatureSettings>,
    update_lock: Mutex<()>,
}

impl Sandbox {
    pub(crate) fn new(
        id: SandboxId,
        name: String,
        parent: Option<SandboxId>,
        settings: FeatureSettings,
    ) -> Self {
        Self {
            id,
            name,
            parent,
            settings: ArcSwap::from_pointee(settings),
            update_lock: Mutex::new(()),
        }
    }

    #[inline]
    pub fn id(&self) -> SandboxId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<SandboxId> {
        self.parent
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Current settings snapshot
    pub fn settings(&self) -> Arc<FeatureSettings> {
        self.settings.load_full()
    }

    pub fn state(&self, key: &str) -> Option<FeatureState> {
        self.settings.load().state(key)
    }

    pub fn simple(&self, key: &str) -> Option<SimpleFeatureState> {
        self.settings.load().simple(key)
    }

    pub(crate) fn update_lock(&self) -> &Mutex<()> {
        &self.update_lock
    }

    pub(crate) fn replace_settings(&self, settings: FeatureSettings) {
        self.settings.store(Arc::new(settings));
    }
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("settings", &*self.settings.load())
            .finish()
    }
}
