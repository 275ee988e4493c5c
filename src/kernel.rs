/*!
 * Hardening Kernel
 *
 * Subsystem bootstrap: validated global defaults, the ordered module
 * registry, the root sandbox, and the activation engine wired on top.
 */

use crate::config::{GlobalDefaults, HardeningConfig};
use crate::core::errors::PolicyResult;
use crate::core::limits::{BASE_VERSION, CRATE_VERSION, HARDENED_VERSION};
use crate::monitoring::PolicyAuditor;
use crate::policy::{ActivationEngine, ActivationReport, ImageParams, ModuleRegistry};
use crate::process::{ProcessTable, ThreadContext};
use crate::sandbox::SandboxTree;
use std::sync::Arc;
use tracing::{error, info};

/// Build and version identifiers, as one line
pub fn version_context() -> String {
    format!(
        "hardened version {} (base {}), hardening-kernel {}",
        HARDENED_VERSION, BASE_VERSION, CRATE_VERSION
    )
}

/// Running hardening subsystem
#[derive(Clone)]
pub struct HardeningKernel {
    config: HardeningConfig,
    defaults: GlobalDefaults,
    engine: ActivationEngine,
    sandboxes: SandboxTree,
    processes: ProcessTable,
    auditor: Arc<PolicyAuditor>,
}

impl HardeningKernel {
    /// Boot with the standard module set
    pub fn init(config: HardeningConfig) -> PolicyResult<Self> {
        let registry = ModuleRegistry::standard(&config);
        Self::with_registry(config, registry)
    }

    /// Boot with a caller-supplied module set.
    ///
    /// # Errors
    /// [`PolicyError::RootSandboxInit`](crate::PolicyError::RootSandboxInit)
    /// when the root sandbox cannot be built; the subsystem must not start.
    pub fn with_registry(config: HardeningConfig, registry: ModuleRegistry) -> PolicyResult<Self> {
        info!("{}", version_context());

        let registry = Arc::new(registry);
        let defaults = GlobalDefaults::from_config(&config, &registry);

        let sandboxes = SandboxTree::new(registry.clone(), &defaults).map_err(|e| {
            error!(error = %e, "Hardening subsystem cannot start");
            e
        })?;

        let auditor = Arc::new(PolicyAuditor::new());
        let engine = ActivationEngine::new(registry, config.control, auditor.clone());

        info!(
            modules = ?engine.registry().names(),
            corrections = defaults.corrections().len(),
            "Hardening subsystem initialized"
        );

        Ok(Self {
            config,
            defaults,
            engine,
            sandboxes,
            processes: ProcessTable::new(),
            auditor,
        })
    }

    /// Start a fresh process in the root sandbox and activate `image` in it
    pub fn spawn(
        &self,
        name: &str,
        image: &ImageParams,
    ) -> (ThreadContext, PolicyResult<ActivationReport>) {
        let thread = self.processes.create_process(name, self.sandboxes.root());
        let result = self.engine.activate(&thread, image);
        (thread, result)
    }

    /// Tear down a process and its process-visible log
    pub fn exit(&self, thread: ThreadContext) -> PolicyResult<()> {
        let pid = thread.pid();
        self.processes.reap(pid)?;
        self.auditor.clear_pid(pid);
        Ok(())
    }

    pub fn config(&self) -> &HardeningConfig {
        &self.config
    }

    pub fn defaults(&self) -> &GlobalDefaults {
        &self.defaults
    }

    pub fn engine(&self) -> &ActivationEngine {
        &self.engine
    }

    pub fn sandboxes(&self) -> &SandboxTree {
        &self.sandboxes
    }

    pub fn processes(&self) -> &ProcessTable {
        &self.processes
    }

    pub fn auditor(&self) -> &Arc<PolicyAuditor> {
        &self.auditor
    }
}

impl std::fmt::Debug for HardeningKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HardeningKernel")
            .field("config", &self.config)
            .field("engine", &self.engine)
            .field("sandboxes", &self.sandboxes.len())
            .field("processes", &self.processes.len())
            .finish_non_exhaustive()
    }
}
