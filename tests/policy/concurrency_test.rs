/*!
 * Concurrency Tests
 * Commit atomicity, parallel activations and sandbox tree consistency
 */

use super::common::{default_policy, image, kernel, process};
use hardening_kernel::{FlagSet, ParamList, PolicyError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

#[test]
fn test_readers_never_see_torn_policy() {
    let kernel = kernel();
    let main = process(&kernel, "app");
    let workers: Vec<_> = (0..4).map(|_| kernel.processes().spawn_thread(&main)).collect();

    let loose = image("/opt/loose")
        .with_extattr_flags((FlagSet::NOASLR | FlagSet::NOMPROTECT | FlagSet::NOPAGEEXEC).bits());
    let strict = image("/opt/strict").with_extattr_flags(FlagSet::SEGVGUARD.bits());

    let loose_policy = kernel.engine().activate(&main, &loose).unwrap().committed;
    let strict_policy = kernel.engine().activate(&main, &strict).unwrap().committed;
    assert_ne!(loose_policy, strict_policy);
    let allowed: HashSet<FlagSet> = [loose_policy, strict_policy].into_iter().collect();

    let done = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = workers
        .into_iter()
        .map(|worker| {
            let done = done.clone();
            let allowed = allowed.clone();
            thread::spawn(move || {
                let mut reads = 0u64;
                while !done.load(Ordering::Acquire) {
                    let view = worker.policy_view();
                    assert!(view.is_consistent(), "torn policy: {view:?}");
                    assert!(allowed.contains(&view.process));
                    assert!(allowed.contains(&worker.policy()));
                    reads += 1;
                }
                reads
            })
        })
        .collect();

    for i in 0..500 {
        let img = if i % 2 == 0 { &loose } else { &strict };
        kernel.engine().activate(&main, img).unwrap();
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
}

#[test]
fn test_parallel_activations_are_independent() {
    let kernel = kernel();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let kernel = kernel.clone();
            thread::spawn(move || {
                let thread = process(&kernel, "worker");
                let img = if i % 2 == 0 {
                    image("/opt/worker")
                } else {
                    image("/opt/worker").with_extattr_flags(FlagSet::NOASLR.bits())
                };
                for _ in 0..50 {
                    kernel.engine().activate(&thread, &img).unwrap();
                }
                (i, thread.policy())
            })
        })
        .collect();

    for handle in handles {
        let (i, policy) = handle.join().unwrap();
        if i % 2 == 0 {
            assert_eq!(policy, default_policy(true));
        } else {
            assert_eq!(policy, (default_policy(true) - FlagSet::ASLR) | FlagSet::NOASLR);
        }
    }
    assert_eq!(kernel.processes().len(), 8);
}

#[test]
fn test_racing_create_and_remove_leave_no_orphans() {
    let kernel = kernel();
    let tree = kernel.sandboxes().clone();
    let root = tree.root().id();

    for _ in 0..200 {
        let parent = tree.create(root, "parent", &ParamList::new()).unwrap();

        let creator = {
            let tree = tree.clone();
            let parent = parent.id();
            thread::spawn(move || tree.create(parent, "child", &ParamList::new()))
        };
        let removed = tree.remove(parent.id());

        match creator.join().unwrap() {
            Ok(child) => {
                // the child won, so the parent must have stayed
                assert!(matches!(removed, Err(PolicyError::SandboxBusy(..))));
                assert!(tree.get(parent.id()).is_some());
                tree.remove(child.id()).unwrap();
                tree.remove(parent.id()).unwrap();
            }
            Err(err) => {
                assert_eq!(err, PolicyError::SandboxNotFound(parent.id()));
                assert!(removed.is_ok());
            }
        }

        for id in tree.children(root) {
            let sandbox = tree.get(id).unwrap();
            assert_eq!(sandbox.parent(), Some(root));
        }
        assert_eq!(tree.len(), 1);
    }
}
