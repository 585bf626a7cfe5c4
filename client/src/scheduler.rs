//! Deferred one-shot actions keyed by pooled handles.
//!
//! Actions carry the handle (slot + generation) they were scheduled for. The
//! scheduler itself does not know about stores; whoever runs a due action
//! resolves the handle first and drops the action when the slot has been
//! recycled.

use crate::store::Handle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferred {
    /// Lifetime of a projectile ran out.
    DespawnProjectile(Handle),
    /// The local ship may shoot again.
    ClearShootCooldown(Handle),
}

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    due_at: u64,
    seq: u64,
    action: Deferred,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    pending: Vec<Scheduled>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due_at: u64, action: Deferred) {
        self.pending.push(Scheduled {
            due_at,
            seq: self.next_seq,
            action,
        });
        self.next_seq += 1;
    }

    /// Removes and returns every action due at `now`, earliest first and in
    /// scheduling order among equal deadlines.
    pub fn drain_due(&mut self, now: u64) -> Vec<Deferred> {
        let mut due: Vec<Scheduled> = Vec::new();
        self.pending.retain(|entry| {
            if entry.due_at <= now {
                due.push(*entry);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|entry| (entry.due_at, entry.seq));
        due.into_iter().map(|entry| entry.action).collect()
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
