/*!
 * Process Table
 * Creates processes and threads, forks, and reaps them
 */

use super::types::{Process, ThreadContext};
use crate::core::errors::{PolicyError, PolicyResult};
use crate::core::types::{Pid, Tid};
use crate::policy::flags::FlagSet;
use crate::sandbox::Sandbox;
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Table of live processes
#[derive(Clone)]
pub struct ProcessTable {
    processes: Arc<DashMap<Pid, Arc<Process>, RandomState>>,
    next_pid: Arc<AtomicU32>,
    next_tid: Arc<AtomicU32>,
}

impl ProcessTable {
    pub fn new() -> Self {
        info!("Process table initialized");
        Self {
            processes: Arc::new(DashMap::with_hasher(RandomState::new())),
            next_pid: Arc::new(AtomicU32::new(1)),
            next_tid: Arc::new(AtomicU32::new(100_000)),
        }
    }

    fn alloc_pid(&self) -> Pid {
        self.next_pid.fetch_add(1, Ordering::Relaxed)
    }

    fn alloc_tid(&self) -> Tid {
        self.next_tid.fetch_add(1, Ordering::Relaxed)
    }

    /// Create a process in `sandbox` with a single main thread and an empty policy
    pub fn create_process(&self, name: impl Into<String>, sandbox: Arc<Sandbox>) -> ThreadContext {
        self.insert(name.into(), sandbox, FlagSet::empty())
    }

    /// Fork the caller's process; the child inherits policy and sandbox
    pub fn fork(&self, parent: &ThreadContext) -> ThreadContext {
        let name = parent.process().name().to_string();
        self.insert(name, parent.sandbox().clone(), parent.process_policy())
    }

    fn insert(&self, name: String, sandbox: Arc<Sandbox>, flags: FlagSet) -> ThreadContext {
        let pid = self.alloc_pid();
        let tid = self.alloc_tid();

        let process = Arc::new(Process::new(pid, name, flags));
        process.attach_thread(tid);
        self.processes.insert(pid, process.clone());

        debug!(pid, tid, sandbox = sandbox.id(), "Created process");
        ThreadContext::new(process, tid, sandbox)
    }

    /// Add a thread to the caller's process
    pub fn spawn_thread(&self, sibling: &ThreadContext) -> ThreadContext {
        let tid = self.alloc_tid();
        sibling.process().attach_thread(tid);
        debug!(pid = sibling.pid(), tid, "Spawned thread");
        ThreadContext::new(sibling.process().clone(), tid, sibling.sandbox().clone())
    }

    /// Remove a thread from its process
    pub fn exit_thread(&self, thread: ThreadContext) -> PolicyResult<()> {
        if thread.process().detach_thread(thread.tid()) {
            Ok(())
        } else {
            Err(PolicyError::ForeignThread {
                pid: thread.pid(),
                tid: thread.tid(),
            })
        }
    }

    /// Drop a process and every thread in it
    pub fn reap(&self, pid: Pid) -> PolicyResult<()> {
        self.processes
            .remove(&pid)
            .map(|_| debug!(pid, "Reaped process"))
            .ok_or(PolicyError::ProcessNotFound(pid))
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.processes.contains_key(&pid)
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}
