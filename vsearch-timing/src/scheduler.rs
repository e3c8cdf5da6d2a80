//! Cancellable deadlines tied to a state entry.
//!
//! Every state entry mints a fresh [`EntryToken`]. Timers carry the token of
//! the entry that scheduled them, and the owner compares it with its current
//! token when a timer comes due. A mismatch means the state was already left,
//! and the timer must be treated as a no-op.

/// Identifies one entry into a state. Never reused within a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryToken(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheduled<K> {
    pub token: EntryToken,
    pub kind: K,
    pub due_ns: u64,
    seq: u64,
}

#[derive(Debug, Clone)]
pub struct Scheduler<K> {
    generation: u64,
    seq: u64,
    pending: Vec<Scheduled<K>>,
}

impl<K: Copy + std::fmt::Debug> Scheduler<K> {
    pub fn new() -> Self {
        Self {
            generation: 0,
            seq: 0,
            pending: Vec::with_capacity(4),
        }
    }

    /// Starts a new state entry and returns its token.
    pub fn enter(&mut self) -> EntryToken {
        self.generation += 1;
        EntryToken(self.generation)
    }

    pub fn schedule(&mut self, token: EntryToken, kind: K, due_ns: u64) {
        tracing::trace!(?token, ?kind, due_ns, "timer scheduled");
        self.seq += 1;
        self.pending.push(Scheduled {
            token,
            kind,
            due_ns,
            seq: self.seq,
        });
    }

    /// Drops every pending timer owned by `token`.
    pub fn cancel(&mut self, token: EntryToken) -> usize {
        let before = self.pending.len();
        self.pending.retain(|s| s.token != token);
        before - self.pending.len()
    }

    pub fn cancel_all(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }

    /// Removes and returns the earliest timer due at or before `now_ns`.
    /// Ties fire in scheduling order.
    pub fn pop_due(&mut self, now_ns: u64) -> Option<Scheduled<K>> {
        let idx = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, s)| s.due_ns <= now_ns)
            .min_by_key(|(_, s)| (s.due_ns, s.seq))
            .map(|(i, _)| i)?;
        Some(self.pending.swap_remove(idx))
    }

    pub fn next_due(&self) -> Option<u64> {
        self.pending.iter().map(|s| s.due_ns).min()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<K: Copy + std::fmt::Debug> Default for Scheduler<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Kind {
        A,
        B,
    }

    #[test]
    fn tokens_are_unique() {
        let mut s = Scheduler::<Kind>::new();
        let a = s.enter();
        let b = s.enter();
        assert_ne!(a, b);
    }

    #[test]
    fn pops_in_deadline_order() {
        let mut s = Scheduler::new();
        let t = s.enter();
        s.schedule(t, Kind::B, 20);
        s.schedule(t, Kind::A, 10);
        assert!(s.pop_due(5).is_none());
        assert_eq!(s.next_due(), Some(10));
        assert_eq!(s.pop_due(25).map(|x| x.kind), Some(Kind::A));
        assert_eq!(s.pop_due(25).map(|x| x.kind), Some(Kind::B));
        assert!(s.is_empty());
    }

    #[test]
    fn cancel_only_touches_its_token() {
        let mut s = Scheduler::new();
        let old = s.enter();
        let new = s.enter();
        s.schedule(old, Kind::A, 10);
        s.schedule(new, Kind::B, 10);
        assert_eq!(s.cancel(old), 1);
        let fired = s.pop_due(10).unwrap();
        assert_eq!(fired.token, new);
        assert_eq!(s.cancel_all(), 0);
    }
}
