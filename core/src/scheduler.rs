//! Deferred tasks on the engine's millisecond pacing clock.
//!
//! A scheduled task is identified by its `TaskHandle`. Whoever owns the
//! handle may cancel the task before it fires; a cancelled task never runs.

use crate::types::Millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

/// Work the engine may defer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    /// The enemy's reply to a player attack, bound to one encounter.
    EnemyCounterAttack { encounter_id: u64 },
}

#[derive(Debug, Clone)]
struct ScheduledTask<T> {
    handle: TaskHandle,
    due_at: Millis,
    task:   T,
}

#[derive(Debug, Clone)]
pub struct DeferredQueue<T> {
    next_handle: u64,
    tasks:       Vec<ScheduledTask<T>>,
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self { next_handle: 1, tasks: Vec::new() }
    }
}

impl<T> DeferredQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due_at: Millis, task: T) -> TaskHandle {
        let handle = TaskHandle(self.next_handle);
        self.next_handle += 1;
        self.tasks.push(ScheduledTask { handle, due_at, task });
        handle
    }

    /// Returns true if the task was still pending.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.handle != handle);
        self.tasks.len() != before
    }

    /// Earliest due time among pending tasks.
    pub fn next_due(&self) -> Option<Millis> {
        self.tasks.iter().map(|t| t.due_at).min()
    }

    /// Remove and return every task due at or before `now`, in due order
    /// (ties broken by scheduling order).
    pub fn drain_due(&mut self, now: Millis) -> Vec<T> {
        let (mut due, pending): (Vec<_>, Vec<_>) =
            self.tasks.drain(..).partition(|t| t.due_at <= now);
        self.tasks = pending;
        due.sort_by_key(|t| (t.due_at, t.handle));
        due.into_iter().map(|t| t.task).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
