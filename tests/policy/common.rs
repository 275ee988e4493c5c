/*!
 * Shared fixtures for policy tests
 */

#![allow(dead_code)]

use hardening_kernel::{
    FeatureModule, FeatureSettings, FeatureState, FlagSet, HardeningConfig, HardeningKernel,
    ImageParams, ModuleRegistry, ParamList, SandboxError, SandboxInit, SandboxResult,
    SettingValue, ThreadContext,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Policy committed for an image with no request under the built-in defaults
pub fn default_policy(map32bit: bool) -> FlagSet {
    let companion = if map32bit {
        FlagSet::NODISALLOWMAP32BIT
    } else {
        FlagSet::empty()
    };
    FlagSet::ASLR
        | companion
        | FlagSet::PAGEEXEC
        | FlagSet::MPROTECT
        | FlagSet::NOSEGVGUARD
        | FlagSet::SHLIBRANDOM
}

pub fn config() -> HardeningConfig {
    HardeningConfig {
        map32bit: true,
        ..HardeningConfig::default()
    }
}

pub fn kernel() -> HardeningKernel {
    HardeningKernel::init(config()).unwrap()
}

pub fn kernel_with(registry: ModuleRegistry) -> HardeningKernel {
    HardeningKernel::with_registry(config(), registry).unwrap()
}

/// A process in the root sandbox
pub fn process(kernel: &HardeningKernel, name: &str) -> ThreadContext {
    kernel
        .processes()
        .create_process(name, kernel.sandboxes().root())
}

pub fn image(path: &str) -> ImageParams {
    ImageParams::new(path)
}

/// Module that emits a fixed contribution and counts its invocations
pub struct FixedModule {
    pub name: &'static str,
    pub output: FlagSet,
    pub calls: AtomicUsize,
}

impl FixedModule {
    pub fn new(name: &'static str, output: FlagSet) -> Arc<Self> {
        Arc::new(Self {
            name,
            output,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FeatureModule for FixedModule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn compute_flags(
        &self,
        _image: &ImageParams,
        _thread: &ThreadContext,
        _settings: &FeatureSettings,
        _mode: FlagSet,
    ) -> FlagSet {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.output
    }

    fn init_for_sandbox(
        &self,
        _sandbox: &mut SandboxInit,
        _params: &ParamList,
    ) -> SandboxResult<()> {
        Ok(())
    }
}

/// Parameter that makes [`MarkerModule`] fail its sandbox initializer
pub const FAIL_PARAM: &str = "test.marker.fail";

/// Module that writes a marker setting, then fails when asked to
pub struct MarkerModule {
    pub name: &'static str,
    pub key: &'static str,
}

impl FeatureModule for MarkerModule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn compute_flags(
        &self,
        _image: &ImageParams,
        _thread: &ThreadContext,
        _settings: &FeatureSettings,
        _mode: FlagSet,
    ) -> FlagSet {
        FlagSet::empty()
    }

    fn init_for_sandbox(
        &self,
        sandbox: &mut SandboxInit,
        params: &ParamList,
    ) -> SandboxResult<()> {
        sandbox
            .settings_mut()
            .set(self.key, SettingValue::FourWay(FeatureState::Disabled));
        if params.get(FAIL_PARAM).is_some() {
            return Err(SandboxError::ModuleFailure {
                module: self.name.to_string(),
                reason: "refusing this sandbox".into(),
            });
        }
        Ok(())
    }
}
