//! Process-global idempotency store.

use axum::body::Bytes;
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Notify;

/// State of one key.
#[derive(Clone)]
pub enum Entry {
    /// A winner is executing the handler; waiters park on the notify.
    Pending(Arc<Notify>),
    /// The captured response body, replayed verbatim for every retry.
    Completed(Bytes),
}

/// Outcome of claiming a key.
pub enum Begin {
    /// First sight of the key; the caller must `complete` or `abort`.
    Execute,
    /// The key already finished; replay the stored body.
    Replay(Bytes),
    /// Another request holds the key; wait for its completion.
    Wait(Arc<Notify>),
}

/// Key-indexed map of previously produced responses.
///
/// Entries are created on first sight of a key and live for the process
/// lifetime; there is no expiry. The insert is a per-key check-and-set
/// through the map's entry API, so unrelated requests never serialize on
/// a shared lock.
#[derive(Clone, Default)]
pub struct IdempotencyStore {
    inner: Arc<DashMap<String, Entry>>,
}

impl IdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`, atomically publishing a pending marker if it is unseen.
    ///
    /// Exactly one of two racing first-time requests observes `Execute`;
    /// the other observes `Wait` on the winner's notify.
    pub fn begin(&self, key: &str) -> Begin {
        match self.inner.entry(key.to_string()) {
            MapEntry::Occupied(occupied) => match occupied.get() {
                Entry::Completed(body) => Begin::Replay(body.clone()),
                Entry::Pending(notify) => Begin::Wait(notify.clone()),
            },
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry::Pending(Arc::new(Notify::new())));
                Begin::Execute
            }
        }
    }

    /// Publish the captured body for `key` and wake every waiter.
    pub fn complete(&self, key: &str, body: Bytes) {
        if let Some(mut entry) = self.inner.get_mut(key) {
            if let Entry::Pending(notify) = entry.value().clone() {
                *entry.value_mut() = Entry::Completed(body);
                drop(entry);
                notify.notify_waiters();
            }
        }
    }

    /// Drop the pending marker for `key` after a failed execution.
    ///
    /// Waiters are woken and re-run the race; the next claimant becomes
    /// the new winner. Completed entries are never removed.
    pub fn abort(&self, key: &str) {
        let removed = self
            .inner
            .remove_if(key, |_, entry| matches!(entry, Entry::Pending(_)));
        if let Some((_, Entry::Pending(notify))) = removed {
            notify.notify_waiters();
        }
    }

    /// Current state of `key`, if any.
    pub fn snapshot(&self, key: &str) -> Option<Entry> {
        self.inner.get(key).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_claim_executes_second_replays() {
        let store = IdempotencyStore::new();
        assert!(matches!(store.begin("k1"), Begin::Execute));
        store.complete("k1", Bytes::from_static(b"stored"));

        match store.begin("k1") {
            Begin::Replay(body) => assert_eq!(&body[..], b"stored"),
            _ => panic!("completed key must replay"),
        }
    }

    #[test]
    fn racing_claim_waits_on_the_winner() {
        let store = IdempotencyStore::new();
        assert!(matches!(store.begin("k1"), Begin::Execute));
        assert!(matches!(store.begin("k1"), Begin::Wait(_)));
    }

    #[test]
    fn abort_reopens_the_key() {
        let store = IdempotencyStore::new();
        assert!(matches!(store.begin("k1"), Begin::Execute));
        store.abort("k1");
        assert!(matches!(store.begin("k1"), Begin::Execute));
    }

    #[test]
    fn abort_never_drops_a_completed_entry() {
        let store = IdempotencyStore::new();
        assert!(matches!(store.begin("k1"), Begin::Execute));
        store.complete("k1", Bytes::from_static(b"stored"));
        store.abort("k1");
        assert!(matches!(store.begin("k1"), Begin::Replay(_)));
    }

    #[tokio::test]
    async fn waiter_wakes_when_winner_completes() {
        let store = IdempotencyStore::new();
        assert!(matches!(store.begin("k1"), Begin::Execute));

        let notify = match store.begin("k1") {
            Begin::Wait(notify) => notify,
            _ => panic!("second claim must wait"),
        };

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move {
                let notified = notify.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if let Some(Entry::Completed(body)) = store.snapshot("k1") {
                    return body;
                }
                notified.await;
                match store.snapshot("k1") {
                    Some(Entry::Completed(body)) => body,
                    _ => panic!("winner completed without publishing"),
                }
            })
        };

        tokio::task::yield_now().await;
        store.complete("k1", Bytes::from_static(b"stored"));
        assert_eq!(&waiter.await.unwrap()[..], b"stored");
    }
}
