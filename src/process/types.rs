/*!
 * Process Types
 *
 * A process owns its mitigation policy. Every thread keeps a read-only
 * mirror of the same value. The process value and all mirrors sit behind
 * one lock, so a reader never sees some threads on the old policy and some
 * on the new one.
 */

use crate::core::errors::{PolicyError, PolicyResult};
use crate::core::types::{Pid, Tid};
use crate::policy::flags::{FlagSet, Mitigation};
use crate::sandbox::Sandbox;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
struct ThreadSlot {
    tid: Tid,
    flags: FlagSet,
}

#[derive(Debug, Default)]
struct PolicyState {
    flags: FlagSet,
    threads: Vec<ThreadSlot>,
}

/// Process entity owning the policy in force
#[derive(Debug)]
pub struct Process {
    pid: Pid,
    name: String,
    state: RwLock<PolicyState>,
}

impl Process {
    pub(crate) fn new(pid: Pid, name: String, inherited: FlagSet) -> Self {
        Self {
            pid,
            name,
            state: RwLock::new(PolicyState {
                flags: inherited,
                threads: Vec::new(),
            }),
        }
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn thread_count(&self) -> usize {
        self.state.read().threads.len()
    }

    /// Register a thread; it starts with the process's current policy
    pub(crate) fn attach_thread(&self, tid: Tid) {
        let mut state = self.state.write();
        let flags = state.flags;
        state.threads.push(ThreadSlot { tid, flags });
    }

    pub(crate) fn detach_thread(&self, tid: Tid) -> bool {
        let mut state = self.state.write();
        let before = state.threads.len();
        state.threads.retain(|slot| slot.tid != tid);
        state.threads.len() != before
    }

    /// Assign a new policy and fan it out to every thread in one critical section
    fn commit(&self, caller: Tid, flags: FlagSet) -> PolicyResult<()> {
        let mut state = self.state.write();
        if !state.threads.iter().any(|slot| slot.tid == caller) {
            return Err(PolicyError::ForeignThread {
                pid: self.pid,
                tid: caller,
            });
        }

        state.flags = flags;
        for slot in state.threads.iter_mut() {
            slot.flags = flags;
        }
        Ok(())
    }

    fn thread_flags(&self, tid: Tid) -> Option<FlagSet> {
        self.state
            .read()
            .threads
            .iter()
            .find(|slot| slot.tid == tid)
            .map(|slot| slot.flags)
    }

    fn flags(&self) -> FlagSet {
        self.state.read().flags
    }

    fn view(&self) -> PolicyView {
        let state = self.state.read();
        PolicyView {
            pid: self.pid,
            process: state.flags,
            threads: state.threads.iter().map(|s| (s.tid, s.flags)).collect(),
        }
    }
}

/// Consistent snapshot of a process policy and all of its thread mirrors
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyView {
    pub pid: Pid,
    #[serde(serialize_with = "serialize_flags")]
    pub process: FlagSet,
    #[serde(serialize_with = "serialize_thread_flags")]
    pub threads: Vec<(Tid, FlagSet)>,
}

impl PolicyView {
    /// True when every thread mirrors the process value
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.threads.iter().all(|(_, flags)| *flags == self.process)
    }
}

fn serialize_flags<S: serde::Serializer>(flags: &FlagSet, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u32(flags.bits())
}

fn serialize_thread_flags<S: serde::Serializer>(
    threads: &[(Tid, FlagSet)],
    s: S,
) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeSeq;
    let mut seq = s.serialize_seq(Some(threads.len()))?;
    for (tid, flags) in threads {
        seq.serialize_element(&(tid, flags.bits()))?;
    }
    seq.end()
}

/// Execution context of a running thread.
///
/// Policy reads go through this handle and only ever describe the thread's
/// own process; there is no cross-process inspection.
#[derive(Debug, Clone)]
pub struct ThreadContext {
    process: Arc<Process>,
    tid: Tid,
    sandbox: Arc<Sandbox>,
}

impl ThreadContext {
    pub(crate) fn new(process: Arc<Process>, tid: Tid, sandbox: Arc<Sandbox>) -> Self {
        Self {
            process,
            tid,
            sandbox,
        }
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.process.pid()
    }

    #[inline]
    pub fn tid(&self) -> Tid {
        self.tid
    }

    pub fn process(&self) -> &Arc<Process> {
        &self.process
    }

    /// Sandbox this thread's credentials belong to
    pub fn sandbox(&self) -> &Arc<Sandbox> {
        &self.sandbox
    }

    /// This thread's own policy mirror
    pub fn policy(&self) -> FlagSet {
        self.process
            .thread_flags(self.tid)
            .unwrap_or_else(|| self.process.flags())
    }

    /// Policy of the calling thread's own process
    pub fn process_policy(&self) -> FlagSet {
        self.process.flags()
    }

    /// Process value plus every thread mirror, read under a single lock
    pub fn policy_view(&self) -> PolicyView {
        self.process.view()
    }

    /// Whether `mitigation` is in force for this thread
    pub fn mitigation_active(&self, mitigation: Mitigation) -> bool {
        self.policy().is_active(mitigation)
    }

    pub(crate) fn commit(&self, flags: FlagSet) -> PolicyResult<()> {
        self.process.commit(self.tid, flags)
    }
}
