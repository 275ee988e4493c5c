/*!
 * Sandbox Tree
 * Hierarchical sandbox contexts rooted at a fixed global sandbox
 */

use super::cascade::{self, CascadeFailure};
use super::types::{FeatureSettings, ParamList, Sandbox};
use crate::config::GlobalDefaults;
use crate::core::errors::{PolicyError, PolicyResult};
use crate::core::limits::{ROOT_SANDBOX_ID, ROOT_SANDBOX_NAME};
use crate::core::types::SandboxId;
use crate::policy::registry::ModuleRegistry;
use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// Sandbox tree that owns every live sandbox context
#[derive(Clone)]
pub struct SandboxTree {
    registry: Arc<ModuleRegistry>,
    sandboxes: Arc<DashMap<SandboxId, Arc<Sandbox>, RandomState>>,
    root: Arc<Sandbox>,
    next_id: Arc<AtomicU32>,
    /// Serializes publishing a child against removing its parent
    structure: Arc<Mutex<()>>,
}

impl SandboxTree {
    /// Initialize the root sandbox from the global defaults.
    ///
    /// Failure here means the defaults themselves are unusable, and the
    /// caller must treat it as fatal.
    pub fn new(registry: Arc<ModuleRegistry>, defaults: &GlobalDefaults) -> PolicyResult<Self> {
        let settings = cascade::initialize(
            &registry,
            ROOT_SANDBOX_NAME,
            defaults.settings().clone(),
            &ParamList::new(),
        )
        .map_err(|CascadeFailure { module, source }| {
            error!(
                module,
                error = %source,
                "Unexpected error during root sandbox initialization"
            );
            PolicyError::RootSandboxInit {
                module: module.to_string(),
                source,
            }
        })?;

        let root = Arc::new(Sandbox::new(
            ROOT_SANDBOX_ID,
            ROOT_SANDBOX_NAME.to_string(),
            None,
            settings,
        ));

        let sandboxes = DashMap::with_hasher(RandomState::new());
        sandboxes.insert(ROOT_SANDBOX_ID, root.clone());

        info!(settings = root.settings().len(), "Root sandbox initialized");
        Ok(Self {
            registry,
            sandboxes: Arc::new(sandboxes),
            root,
            next_id: Arc::new(AtomicU32::new(ROOT_SANDBOX_ID + 1)),
            structure: Arc::new(Mutex::new(())),
        })
    }

    /// The distinguished root sandbox
    pub fn root(&self) -> Arc<Sandbox> {
        self.root.clone()
    }

    pub fn get(&self, id: SandboxId) -> Option<Arc<Sandbox>> {
        self.sandboxes.get(&id).map(|s| s.clone())
    }

    /// Create a child of `parent`. The sandbox is only published when every
    /// module initialized successfully and the parent is still live.
    pub fn create(
        &self,
        parent: SandboxId,
        name: impl Into<String>,
        params: &ParamList,
    ) -> PolicyResult<Arc<Sandbox>> {
        let name = name.into();
        let parent = self.get(parent).ok_or(PolicyError::SandboxNotFound(parent))?;

        let settings = cascade::initialize(
            &self.registry,
            &name,
            (*parent.settings()).clone(),
            params,
        )
        .map_err(|failure| Self::init_failure(&name, failure))?;

        let _guard = self.structure.lock();
        if !self.sandboxes.contains_key(&parent.id()) {
            return Err(PolicyError::SandboxNotFound(parent.id()));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let sandbox = Arc::new(Sandbox::new(id, name, Some(parent.id()), settings));
        self.sandboxes.insert(id, sandbox.clone());

        info!(id, name = sandbox.name(), parent = parent.id(), "Created sandbox");
        Ok(sandbox)
    }

    /// Apply a parameter list to an existing sandbox. The cascade runs
    /// against the sandbox's current values and the result replaces them
    /// atomically; on failure nothing changes.
    ///
    /// The root only ever carries the global defaults and cannot be updated.
    pub fn update(&self, id: SandboxId, params: &ParamList) -> PolicyResult<()> {
        if id == ROOT_SANDBOX_ID {
            return Err(PolicyError::SandboxBusy(id, "root sandbox".into()));
        }
        let sandbox = self.get(id).ok_or(PolicyError::SandboxNotFound(id))?;
        let _guard = sandbox.update_lock().lock();

        let current: FeatureSettings = (*sandbox.settings()).clone();
        let settings = cascade::initialize(&self.registry, sandbox.name(), current, params)
            .map_err(|failure| Self::init_failure(sandbox.name(), failure))?;

        sandbox.replace_settings(settings);
        info!(id, name = sandbox.name(), "Updated sandbox parameters");
        Ok(())
    }

    /// Tear down a sandbox without children
    pub fn remove(&self, id: SandboxId) -> PolicyResult<()> {
        if id == ROOT_SANDBOX_ID {
            return Err(PolicyError::SandboxBusy(id, "root sandbox".into()));
        }

        let _guard = self.structure.lock();
        if !self.children(id).is_empty() {
            return Err(PolicyError::SandboxBusy(id, "has child sandboxes".into()));
        }

        self.sandboxes
            .remove(&id)
            .map(|(_, sandbox)| info!(id, name = sandbox.name(), "Removed sandbox"))
            .ok_or(PolicyError::SandboxNotFound(id))
    }

    /// Direct children of `id`
    pub fn children(&self, id: SandboxId) -> Vec<SandboxId> {
        let mut children: Vec<_> = self
            .sandboxes
            .iter()
            .filter(|entry| entry.value().parent() == Some(id))
            .map(|entry| *entry.key())
            .collect();
        children.sort_unstable();
        children
    }

    pub fn len(&self) -> usize {
        self.sandboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sandboxes.is_empty()
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    fn init_failure(name: &str, failure: CascadeFailure) -> PolicyError {
        PolicyError::SandboxInitFailure {
            sandbox: name.to_string(),
            module: failure.module.to_string(),
            source: failure.source,
        }
    }
}
