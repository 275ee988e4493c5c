/*!
 * Activation Tests
 * End-to-end negotiation, rejection and commit of image policies
 */

use super::common::{default_policy, image, kernel, kernel_with, process, FixedModule};
use hardening_kernel::modules::{AslrModule, SegvguardModule};
use hardening_kernel::{
    ActivationPhase, ControlChannels, EventSeverity, FlagSet, HardeningConfig, HardeningKernel,
    InvariantViolation, LogChannel, ModuleRegistry, PolicyError,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const NOTICE: &str = "the process started with non-default hardening settings";

#[test]
fn test_no_request_commits_module_defaults() {
    let kernel = kernel();
    let thread = process(&kernel, "sh");

    let report = kernel.engine().activate(&thread, &image("/bin/sh")).unwrap();

    assert_eq!(report.requested, FlagSet::empty());
    assert_eq!(report.committed, default_policy(true));
    assert_eq!(report.phase, ActivationPhase::Committed);
    assert_eq!(thread.policy(), default_policy(true));
    assert!(kernel.auditor().notices_for(thread.pid()).is_empty());
}

#[test]
fn test_conflicting_request_rejected_before_dispatch() {
    let counter = FixedModule::new("counter", FlagSet::empty());
    let kernel = kernel_with(ModuleRegistry::new().with_module(counter.clone()));
    let thread = process(&kernel, "app");

    let img = image("/opt/app").with_extattr_flags((FlagSet::ASLR | FlagSet::NOASLR).bits());
    let err = kernel.engine().activate(&thread, &img).unwrap_err();

    assert_eq!(err, PolicyError::ConflictingRequest { flags: 0xc0 });
    assert_eq!(err.errno(), 8);
    assert_eq!(counter.calls(), 0);
    assert_eq!(thread.policy(), FlagSet::empty());
}

#[test]
fn test_single_enable_request_commits_exactly_that_bit() {
    let kernel = kernel_with(ModuleRegistry::new().with_module(Arc::new(SegvguardModule)));
    let thread = process(&kernel, "daemon");

    let img = image("/sbin/daemon").with_extattr_flags(FlagSet::SEGVGUARD.bits());
    let report = kernel.engine().activate(&thread, &img).unwrap();

    assert_eq!(report.committed, FlagSet::SEGVGUARD);
    assert_eq!(thread.process_policy(), FlagSet::SEGVGUARD);

    let notices = kernel.auditor().notices_for(thread.pid());
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, NOTICE);
    assert_eq!(notices[0].channel, LogChannel::Privileged);
}

#[test]
fn test_unknown_bits_rejected_on_both_channels() {
    let kernel = kernel();
    let thread = process(&kernel, "app");

    let img = image("/opt/app").with_acl_flags(0x0002_0000 | FlagSet::ASLR.bits());
    let err = kernel.engine().activate(&thread, &img).unwrap_err();

    assert!(matches!(err, PolicyError::MalformedRequest { flags: 0x0002_0040 }));
    let privileged = kernel.auditor().recent(1);
    let user = kernel.auditor().for_pid(thread.pid(), 1);
    assert_eq!(privileged[0].message, "unknown flags: 0x20040");
    assert_eq!(user[0].message, "unknown flags: 0x20040");
    assert_eq!(user[0].severity, EventSeverity::Rejection);
}

#[test]
fn test_rejection_keeps_previous_policy() {
    let kernel = kernel();
    let thread = process(&kernel, "app");

    let first = kernel
        .engine()
        .activate(&thread, &image("/opt/app").with_extattr_flags(FlagSet::NOMPROTECT.bits()))
        .unwrap();

    let bad = image("/opt/other")
        .with_extattr_flags((FlagSet::PAGEEXEC | FlagSet::NOPAGEEXEC).bits());
    assert!(kernel.engine().activate(&thread, &bad).is_err());

    assert_eq!(thread.policy(), first.committed);
    assert!(thread.policy_view().is_consistent());
}

#[test]
fn test_module_conflict_is_internal_defect() {
    let rogue = FixedModule::new("rogue", FlagSet::NOASLR);
    let registry = ModuleRegistry::new()
        .with_module(Arc::new(AslrModule))
        .with_module(rogue.clone());
    let kernel = kernel_with(registry);
    let thread = process(&kernel, "app");

    let err = kernel.engine().activate(&thread, &image("/opt/app")).unwrap_err();

    assert_eq!(
        err,
        PolicyError::PostMergeInvariantViolation {
            flags: 0xc0,
            violation: InvariantViolation::ConflictingFlags,
        }
    );
    assert!(err.is_internal_defect());
    assert_eq!(err.to_string(), "inconsistent flags after the setup: 0xc0");
    assert_eq!(rogue.calls(), 1);
    assert_eq!(kernel.auditor().recent(1)[0].severity, EventSeverity::Defect);
    assert_eq!(thread.policy(), FlagSet::empty());
}

#[test]
fn test_module_unknown_bit_is_internal_defect() {
    let rogue = FixedModule::new("rogue", FlagSet::from_raw(0x0000_4000));
    let kernel = kernel_with(ModuleRegistry::new().with_module(rogue));
    let thread = process(&kernel, "app");

    let err = kernel.engine().activate(&thread, &image("/opt/app")).unwrap_err();
    assert!(matches!(
        err,
        PolicyError::PostMergeInvariantViolation {
            violation: InvariantViolation::UnknownFlags,
            ..
        }
    ));
}

#[test]
fn test_prefer_acl_is_sticky() {
    let kernel = kernel();
    let thread = process(&kernel, "vim");

    let pinned = image("/usr/bin/vim")
        .with_acl_flags((FlagSet::PREFER_ACL | FlagSet::NOMPROTECT).bits());
    let first = kernel.engine().activate(&thread, &pinned).unwrap();
    assert!(first.committed.contains(FlagSet::PREFER_ACL | FlagSet::NOMPROTECT));

    let next = image("/bin/sh").with_extattr_flags(FlagSet::NOASLR.bits());
    let second = kernel.engine().activate(&thread, &next).unwrap();

    assert!(second.skipped);
    assert_eq!(second.committed, first.committed);
    assert_eq!(thread.policy(), first.committed);
}

#[test]
fn test_module_cannot_inject_prefer_acl() {
    let sneaky = FixedModule::new("sneaky", FlagSet::PREFER_ACL);
    let kernel = kernel_with(ModuleRegistry::new().with_module(sneaky));
    let thread = process(&kernel, "app");

    let report = kernel.engine().activate(&thread, &image("/opt/app")).unwrap();
    assert!(!report.committed.contains(FlagSet::PREFER_ACL));
}

#[test]
fn test_non_empty_acl_wins_over_extattr() {
    let kernel = kernel();
    let thread = process(&kernel, "app");

    let img = image("/opt/app")
        .with_acl_flags(FlagSet::NOSHLIBRANDOM.bits())
        .with_extattr_flags(FlagSet::NOASLR.bits());
    let report = kernel.engine().activate(&thread, &img).unwrap();

    assert_eq!(report.requested, FlagSet::NOSHLIBRANDOM);
    assert!(report.committed.contains(FlagSet::NOSHLIBRANDOM | FlagSet::ASLR));
}

#[test]
fn test_disabled_channel_is_ignored() {
    let config = HardeningConfig {
        control: ControlChannels {
            extattr: false,
            ..ControlChannels::default()
        },
        ..super::common::config()
    };
    let kernel = HardeningKernel::init(config).unwrap();
    let thread = process(&kernel, "app");

    let img = image("/opt/app").with_extattr_flags(FlagSet::NOASLR.bits());
    let report = kernel.engine().activate(&thread, &img).unwrap();

    assert!(report.requested.is_empty());
    assert!(report.committed.contains(FlagSet::ASLR));
}

#[test]
fn test_same_request_commits_same_policy() {
    let kernel = kernel();
    let thread = process(&kernel, "app");
    let img = image("/opt/app")
        .with_extattr_flags((FlagSet::NOPAGEEXEC | FlagSet::SEGVGUARD).bits());

    let first = kernel.engine().activate(&thread, &img).unwrap();
    let second = kernel.engine().activate(&thread, &img).unwrap();

    assert_eq!(first.committed, second.committed);
    assert_eq!(
        kernel.engine().dispatch(&img, &thread, first.requested),
        kernel.engine().dispatch(&img, &thread, first.requested)
    );
}

#[test]
fn test_mprotect_forces_pageexec() {
    let kernel = kernel();
    let thread = process(&kernel, "app");

    let img = image("/opt/app").with_extattr_flags(FlagSet::NOPAGEEXEC.bits());
    let report = kernel.engine().activate(&thread, &img).unwrap();

    assert!(report.committed.contains(FlagSet::PAGEEXEC | FlagSet::MPROTECT));
    assert!(!report.committed.contains(FlagSet::NOPAGEEXEC));

    let img = image("/opt/app")
        .with_extattr_flags((FlagSet::NOPAGEEXEC | FlagSet::NOMPROTECT).bits());
    let report = kernel.engine().activate(&thread, &img).unwrap();
    assert!(report.committed.contains(FlagSet::NOPAGEEXEC | FlagSet::NOMPROTECT));
}

#[test]
fn test_commit_reaches_every_thread() {
    let kernel = kernel();
    let main = process(&kernel, "app");
    let worker = kernel.processes().spawn_thread(&main);
    let helper = kernel.processes().spawn_thread(&main);

    let img = image("/opt/app").with_extattr_flags(FlagSet::NOASLR.bits());
    let report = kernel.engine().activate(&main, &img).unwrap();

    assert_eq!(worker.policy(), report.committed);
    assert_eq!(helper.policy(), report.committed);
    let view = main.policy_view();
    assert_eq!(view.threads.len(), 3);
    assert!(view.is_consistent());
    assert!(!worker.mitigation_active(hardening_kernel::Mitigation::Aslr));
}

#[test]
fn test_fork_inherits_committed_policy() {
    let kernel = kernel();
    let parent = process(&kernel, "shell");
    let report = kernel
        .engine()
        .activate(&parent, &image("/bin/sh").with_extattr_flags(FlagSet::NOMPROTECT.bits()))
        .unwrap();

    let child = kernel.processes().fork(&parent);
    assert_ne!(child.pid(), parent.pid());
    assert_eq!(child.policy(), report.committed);
}

#[test]
fn test_exited_thread_cannot_commit() {
    let kernel = kernel();
    let main = process(&kernel, "app");
    let worker = kernel.processes().spawn_thread(&main);
    let stale = worker.clone();
    kernel.processes().exit_thread(worker).unwrap();

    let err = kernel.engine().activate(&stale, &image("/opt/app")).unwrap_err();
    assert!(matches!(err, PolicyError::ForeignThread { .. }));
    assert_eq!(main.policy(), FlagSet::empty());
}
