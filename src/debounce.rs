use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// Coalesces rapid successive edits into a single outbound sync call.
///
/// One pending send may exist per logical target (the key): scheduling again
/// before the idle window elapses cancels the previous send, so only the most
/// recent payload within a burst is ever transmitted. There is no automatic
/// retry; a failed sync logs and the next edit re-triggers the dispatcher.
#[derive(Clone, Default)]
pub struct SyncDebouncer {
    pending: Arc<Mutex<HashMap<String, Pending>>>,
}

struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
}

impl SyncDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `send` to run after `delay` of idle time on this target.
    ///
    /// A previously scheduled send for the same key is cancelled; it will
    /// never transmit a stale payload after a newer one was scheduled.
    pub async fn schedule<F>(&self, key: &str, delay: Duration, send: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.pending.lock().await;

        let generation = pending.get(key).map(|p| p.generation + 1).unwrap_or(0);
        if let Some(prev) = pending.remove(key) {
            prev.handle.abort();
            log::debug!("debounce: superseded pending sync for '{}'", key);
        }

        let map = Arc::clone(&self.pending);
        let key_owned = key.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            send.await;
            // Deregister only our own entry: a newer schedule may have
            // replaced it while the send was in flight.
            let mut pending = map.lock().await;
            if pending.get(&key_owned).map(|p| p.generation) == Some(generation) {
                pending.remove(&key_owned);
            }
        });

        pending.insert(key.to_string(), Pending { generation, handle });
    }

    /// Cancels the pending send for one target, if any.
    pub async fn cancel(&self, key: &str) {
        if let Some(prev) = self.pending.lock().await.remove(key) {
            prev.handle.abort();
        }
    }

    /// Cancels every pending send. No timer survives this call; payloads
    /// pending at shutdown are dropped, not flushed.
    pub async fn cancel_all(&self) {
        let mut pending = self.pending.lock().await;
        for (_, prev) in pending.drain() {
            prev.handle.abort();
        }
    }

    /// Number of targets with a sync still pending.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn burst_sends_only_the_last_payload() {
        let debouncer = SyncDebouncer::new();
        let sent: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));

        for payload in [1u32, 2, 3] {
            let sent = Arc::clone(&sent);
            debouncer
                .schedule("shop_social", Duration::from_millis(40), async move {
                    sent.lock().await.push(payload);
                })
                .await;
        }

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(*sent.lock().await, vec![3]);
        assert_eq!(debouncer.pending_count().await, 0);
    }

    #[tokio::test]
    async fn independent_targets_do_not_cancel_each_other() {
        let debouncer = SyncDebouncer::new();
        let count = Arc::new(AtomicUsize::new(0));

        for key in ["bot_social", "shop_social"] {
            let count = Arc::clone(&count);
            debouncer
                .schedule(key, Duration::from_millis(30), async move {
                    count.fetch_add(1, Ordering::SeqCst);
                })
                .await;
        }

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cancel_all_drops_pending_sends() {
        let debouncer = SyncDebouncer::new();
        let count = Arc::new(AtomicUsize::new(0));

        {
            let count = Arc::clone(&count);
            debouncer
                .schedule("welcome_text", Duration::from_millis(30), async move {
                    count.fetch_add(1, Ordering::SeqCst);
                })
                .await;
        }
        debouncer.cancel_all().await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(debouncer.pending_count().await, 0);
    }
}
