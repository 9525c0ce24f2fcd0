use crate::error::AgentError;
use crate::session::Session;
use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OnceCell};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A session shared between the registry and in-flight turns. The mutex is
/// held for the whole of a turn.
pub type SharedSession = Arc<Mutex<Session>>;

/// When idle sessions get dropped. Both limits are off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionPolicy {
    pub idle_ttl: Option<Duration>,
    pub max_sessions: Option<usize>,
}

struct Slot {
    cell: OnceCell<SharedSession>,
    last_used_ms: AtomicU64,
}

impl Slot {
    fn new(now_ms: u64) -> Self {
        Self {
            cell: OnceCell::new(),
            last_used_ms: AtomicU64::new(now_ms),
        }
    }

    fn touch(&self, now_ms: u64) {
        self.last_used_ms.fetch_max(now_ms, Ordering::Relaxed);
    }

    fn last_used(&self) -> u64 {
        self.last_used_ms.load(Ordering::Relaxed)
    }

    /// A turn currently holds the session
    fn is_busy(&self) -> bool {
        self.cell
            .get()
            .map(|session| session.try_lock().is_err())
            .unwrap_or(false)
    }
}

/// Per-user sessions for one agent profile.
///
/// Lookups for different ids only meet at the map shard; concurrent first
/// calls for the same id share one factory run.
pub struct SessionRegistry {
    slots: DashMap<String, Arc<Slot>>,
    policy: EvictionPolicy,
    epoch: Instant,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(EvictionPolicy::default())
    }
}

impl SessionRegistry {
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            slots: DashMap::new(),
            policy,
            epoch: Instant::now(),
        }
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Return the session for `user_id`, creating it with `factory` if absent.
    ///
    /// An existing session is returned unchanged and `factory` is not run.
    /// If the factory fails nothing is stored and the next call retries.
    pub async fn get_or_create<F, Fut>(
        &self,
        user_id: &str,
        factory: F,
    ) -> Result<SharedSession, AgentError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Session>>,
    {
        let now = self.now_ms();
        let slot = self
            .slots
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Slot::new(now)))
            .clone();

        let created = slot
            .cell
            .get_or_try_init(|| async {
                info!(user_id = %user_id, "creating session");
                match factory().await {
                    Ok(session) => Ok(Arc::new(Mutex::new(session))),
                    Err(e) => {
                        warn!(user_id = %user_id, error = %e, "session factory failed");
                        Err(AgentError::session_creation(user_id, &e))
                    }
                }
            })
            .await
            .cloned();

        match created {
            Ok(session) => {
                slot.touch(self.now_ms());
                Ok(session)
            }
            Err(e) => {
                // Only this empty slot; a concurrent caller may have filled or replaced it
                self.slots.remove_if(user_id, |_, current| {
                    Arc::ptr_eq(current, &slot) && !current.cell.initialized()
                });
                Err(e)
            }
        }
    }

    /// Entries in the map, including ones whose session is still being built
    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Existing session for `user_id`, without creating one
    pub fn get(&self, user_id: &str) -> Option<SharedSession> {
        let slot = self.slots.get(user_id)?;
        let session = slot.cell.get()?.clone();
        slot.touch(self.now_ms());
        Some(session)
    }

    /// Drop the session for `user_id`. Returns whether one existed.
    pub fn clear(&self, user_id: &str) -> bool {
        let removed = self
            .slots
            .remove(user_id)
            .map(|(_, slot)| slot.cell.initialized())
            .unwrap_or(false);
        info!(user_id = %user_id, removed, "cleared session");
        removed
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| entry.value().cell.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply the eviction policy once. Sessions in the middle of a turn are
    /// never evicted. Returns how many entries were removed.
    pub fn evict_idle(&self) -> usize {
        let now = self.now_ms();
        let mut evicted = 0;

        if let Some(ttl) = self.policy.idle_ttl {
            let ttl_ms = ttl.as_millis() as u64;
            self.slots.retain(|user_id, slot| {
                let idle = now.saturating_sub(slot.last_used()) >= ttl_ms;
                if idle && !slot.is_busy() {
                    debug!(user_id = %user_id, "evicting idle session");
                    evicted += 1;
                    false
                } else {
                    true
                }
            });
        }

        if let Some(max) = self.policy.max_sessions {
            if self.slots.len() > max {
                let mut by_age: Vec<(String, u64)> = self
                    .slots
                    .iter()
                    .filter(|entry| !entry.value().is_busy())
                    .map(|entry| (entry.key().clone(), entry.value().last_used()))
                    .collect();
                by_age.sort_by_key(|(_, last_used)| *last_used);

                let excess = self.slots.len().saturating_sub(max);
                for (user_id, _) in by_age.into_iter().take(excess) {
                    if self.slots.remove(&user_id).is_some() {
                        debug!(user_id = %user_id, "evicting least recently used session");
                        evicted += 1;
                    }
                }
            }
        }

        if evicted > 0 {
            info!(evicted, remaining = self.slots.len(), "evicted sessions");
        }
        evicted
    }

    /// Run [`Self::evict_idle`] every `interval` until `cancel` fires
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let registry = self;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("session sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        registry.evict_idle();
                    }
                }
            }
        })
    }
}
