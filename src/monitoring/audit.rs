/*!
 * Policy Audit Trail
 *
 * Two channels: a privileged channel for operators (global ring) and a
 * process-visible channel for the invoking user (per-process ring). Every
 * recorded event is also emitted as a tracing event.
 */

use crate::core::errors::PolicyError;
use crate::core::limits::{MAX_POLICY_EVENTS, MAX_POLICY_EVENTS_PER_PID as MAX_PID_EVENTS};
use crate::core::types::{Pid, RawFlags};
use ahash::RandomState;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, TimestampSeconds};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{error, info, warn};

/// Notice logged after committing a policy that was explicitly requested
pub const NON_DEFAULT_NOTICE: &str = "the process started with non-default hardening settings";

/// Log channel an event was written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogChannel {
    Privileged,
    Process,
}

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    Notice,
    Rejection,
    /// A feature module produced an invalid merge
    Defect,
}

/// A single policy log line
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PolicyEvent {
    pub channel: LogChannel,
    pub severity: EventSeverity,
    pub pid: Pid,
    pub image: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<RawFlags>,
    #[serde_as(as = "TimestampSeconds<i64>")]
    pub logged_at: SystemTime,
}

impl PolicyEvent {
    fn new(
        channel: LogChannel,
        severity: EventSeverity,
        pid: Pid,
        image: &Path,
        message: String,
    ) -> Self {
        Self {
            channel,
            severity,
            pid,
            image: image.display().to_string(),
            message,
            flags: None,
            logged_at: SystemTime::now(),
        }
    }

    fn with_flags(mut self, flags: RawFlags) -> Self {
        self.flags = Some(flags);
        self
    }
}

/// Dual-channel policy logger
pub struct PolicyAuditor {
    /// Privileged channel (ring buffer)
    events: parking_lot::RwLock<VecDeque<PolicyEvent>>,
    /// Process-visible channel, per PID
    pid_events: Arc<DashMap<Pid, VecDeque<PolicyEvent>, RandomState>>,
    /// Rejection counters for monitoring
    rejection_counts: Arc<DashMap<Pid, u64, RandomState>>,
}

impl PolicyAuditor {
    pub fn new() -> Self {
        Self {
            events: parking_lot::RwLock::new(VecDeque::with_capacity(MAX_POLICY_EVENTS)),
            pid_events: Arc::new(DashMap::with_hasher(RandomState::new())),
            rejection_counts: Arc::new(DashMap::with_hasher(RandomState::new())),
        }
    }

    /// Report a rejected activation on both channels
    pub fn reject(&self, pid: Pid, image: &Path, err: &PolicyError, flags: RawFlags) {
        let severity = if err.is_internal_defect() {
            EventSeverity::Defect
        } else {
            EventSeverity::Rejection
        };
        let message = err.to_string();

        if severity == EventSeverity::Defect {
            error!(target: "hardening::log", pid, image = %image.display(), flags, "{}", message);
        } else {
            warn!(target: "hardening::log", pid, image = %image.display(), flags, "{}", message);
        }
        warn!(target: "hardening::ulog", pid, flags, "{}", message);

        let event = PolicyEvent::new(LogChannel::Privileged, severity, pid, image, message)
            .with_flags(flags);
        let mut user_event = event.clone();
        user_event.channel = LogChannel::Process;

        self.push_privileged(event);
        self.push_process(user_event);

        self.rejection_counts
            .entry(pid)
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }

    /// Informational line on the privileged channel
    pub fn notice(&self, pid: Pid, image: &Path, message: &str) {
        info!(target: "hardening::log", pid, image = %image.display(), "{}", message);
        self.push_privileged(PolicyEvent::new(
            LogChannel::Privileged,
            EventSeverity::Notice,
            pid,
            image,
            message.to_string(),
        ));
    }

    fn push_privileged(&self, event: PolicyEvent) {
        let mut events = self.events.write();
        if events.len() >= MAX_POLICY_EVENTS {
            events.pop_front();
        }
        events.push_back(event);
    }

    fn push_process(&self, event: PolicyEvent) {
        let mut entry = self
            .pid_events
            .entry(event.pid)
            .or_insert_with(|| VecDeque::with_capacity(MAX_PID_EVENTS));
        if entry.len() >= MAX_PID_EVENTS {
            entry.pop_front();
        }
        entry.push_back(event);
    }

    /// Most recent privileged events, newest first
    pub fn recent(&self, limit: usize) -> Vec<PolicyEvent> {
        let events = self.events.read();
        events.iter().rev().take(limit).cloned().collect()
    }

    /// Most recent process-visible events for `pid`, newest first
    pub fn for_pid(&self, pid: Pid, limit: usize) -> Vec<PolicyEvent> {
        if let Some(entry) = self.pid_events.get(&pid) {
            entry.iter().rev().take(limit).cloned().collect()
        } else {
            Vec::new()
        }
    }

    /// Privileged notices recorded for `pid`
    pub fn notices_for(&self, pid: Pid) -> Vec<PolicyEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.pid == pid && e.severity == EventSeverity::Notice)
            .cloned()
            .collect()
    }

    pub fn rejection_count(&self, pid: Pid) -> u64 {
        self.rejection_counts.get(&pid).map(|e| *e).unwrap_or(0)
    }

    /// Drop the process-visible log of an exited process
    pub fn clear_pid(&self, pid: Pid) {
        self.pid_events.remove(&pid);
        self.rejection_counts.remove(&pid);
    }
}

impl Default for PolicyAuditor {
    fn default() -> Self {
        Self::new()
    }
}
