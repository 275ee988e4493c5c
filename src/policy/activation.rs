/*!
 * Feature Dispatch & Commit
 *
 * Drives one image activation through its state machine:
 *
 * ```text
 * validating-request -> dispatching -> validating-result -> committing -> committed
 *         |                                   |                  |
 *         +------------> failed <-------------+------------------+
 * ```
 *
 * Nothing is written to the process before the committing phase, so a
 * failed activation leaves the previous policy untouched.
 */

use super::flags::FlagSet;
use super::registry::ModuleRegistry;
use super::resolver::{requested_flags, ImageParams};
use super::validation::{validate_request, validate_result};
use crate::config::ControlChannels;
use crate::core::errors::{PolicyError, PolicyResult};
use crate::monitoring::audit::{PolicyAuditor, NON_DEFAULT_NOTICE};
use crate::monitoring::tracer::activation_span;
use crate::process::ThreadContext;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace, warn, Span};

/// State of an activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivationPhase {
    ValidatingRequest,
    Dispatching,
    ValidatingResult,
    Committing,
    Failed,
    Committed,
}

impl ActivationPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            ActivationPhase::ValidatingRequest => "validating-request",
            ActivationPhase::Dispatching => "dispatching",
            ActivationPhase::ValidatingResult => "validating-result",
            ActivationPhase::Committing => "committing",
            ActivationPhase::Failed => "failed",
            ActivationPhase::Committed => "committed",
        }
    }

    /// Whether the state machine stops here
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, ActivationPhase::Failed | ActivationPhase::Committed)
    }
}

impl std::fmt::Display for ActivationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a successful activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationReport {
    /// Requested mode after resolution (the thread policy when skipped)
    pub requested: FlagSet,
    /// Policy now in force for the process
    pub committed: FlagSet,
    pub phase: ActivationPhase,
    /// The sticky prefer-ACL policy short-circuited resolution
    pub skipped: bool,
}

/// Negotiates and commits the policy of newly activated images
#[derive(Clone)]
pub struct ActivationEngine {
    registry: Arc<ModuleRegistry>,
    control: ControlChannels,
    auditor: Arc<PolicyAuditor>,
}

impl ActivationEngine {
    pub fn new(
        registry: Arc<ModuleRegistry>,
        control: ControlChannels,
        auditor: Arc<PolicyAuditor>,
    ) -> Self {
        Self {
            registry,
            control,
            auditor,
        }
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    pub fn control(&self) -> &ControlChannels {
        &self.control
    }

    pub fn auditor(&self) -> &Arc<PolicyAuditor> {
        &self.auditor
    }

    /// Resolve, validate, dispatch and commit the policy for `image`
    /// launched by `thread`.
    ///
    /// # Errors
    /// Every rejection is exec-format class (see [`PolicyError::errno`]) and
    /// has already been reported on both log channels when returned.
    pub fn activate(
        &self,
        thread: &ThreadContext,
        image: &ImageParams,
    ) -> PolicyResult<ActivationReport> {
        let span = activation_span(
            thread.pid(),
            thread.tid(),
            &image.path().display().to_string(),
        );
        let _guard = span.enter();

        if self.control.acl && self.control.acl_override {
            let current = thread.policy();
            if current.contains(FlagSet::PREFER_ACL) {
                debug!(flags = current.bits(), "Prefer-ACL policy is sticky, keeping it");
                return Ok(ActivationReport {
                    requested: current,
                    committed: current,
                    phase: ActivationPhase::Committed,
                    skipped: true,
                });
            }
        }

        let mode = requested_flags(image, &self.control);

        transition(&span, ActivationPhase::ValidatingRequest);
        if let Err(err) = validate_request(mode) {
            return Err(self.fail(&span, thread, image, err, mode));
        }

        transition(&span, ActivationPhase::Dispatching);
        let merged = self.dispatch(image, thread, mode);

        transition(&span, ActivationPhase::ValidatingResult);
        if let Err(err) = validate_result(merged) {
            return Err(self.fail(&span, thread, image, err, merged));
        }

        let committed = if mode.contains(FlagSet::PREFER_ACL) {
            merged | FlagSet::PREFER_ACL
        } else {
            merged - FlagSet::PREFER_ACL
        };

        transition(&span, ActivationPhase::Committing);
        if let Err(err) = thread.commit(committed) {
            warn!(error = %err, "Policy commit refused");
            transition(&span, ActivationPhase::Failed);
            return Err(err);
        }
        transition(&span, ActivationPhase::Committed);

        if !mode.is_empty() {
            self.auditor
                .notice(thread.pid(), image.path(), NON_DEFAULT_NOTICE);
        }

        debug!(
            requested = mode.bits(),
            committed = committed.bits(),
            "Activation committed"
        );

        Ok(ActivationReport {
            requested: mode,
            committed,
            phase: ActivationPhase::Committed,
            skipped: false,
        })
    }

    /// Union of every module's contribution, in registry order.
    ///
    /// The sandbox settings are loaded once, so a concurrent sandbox update
    /// is seen by either all modules or none.
    #[must_use]
    pub fn dispatch(&self, image: &ImageParams, thread: &ThreadContext, mode: FlagSet) -> FlagSet {
        let settings = thread.sandbox().settings();
        self.registry.iter().fold(FlagSet::empty(), |merged, module| {
            let contribution = module.compute_flags(image, thread, &settings, mode);
            trace!(
                module = module.name(),
                contribution = contribution.bits(),
                "Module contribution"
            );
            merged | contribution
        })
    }

    fn fail(
        &self,
        span: &Span,
        thread: &ThreadContext,
        image: &ImageParams,
        err: PolicyError,
        flags: FlagSet,
    ) -> PolicyError {
        self.auditor
            .reject(thread.pid(), image.path(), &err, flags.bits());
        transition(span, ActivationPhase::Failed);
        err
    }
}

impl std::fmt::Debug for ActivationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivationEngine")
            .field("registry", &self.registry)
            .field("control", &self.control)
            .finish_non_exhaustive()
    }
}

fn transition(span: &Span, phase: ActivationPhase) {
    span.record("phase", phase.as_str());
    trace!(%phase, "Activation phase");
}
