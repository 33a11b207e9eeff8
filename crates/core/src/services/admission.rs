//! Admission control for content creation.
//!
//! A sliding-window quota gate keyed per (user, action kind), backed by an
//! external counter store with atomic increment-with-expiry. The policy is
//! fail-open: if the counter store is unreachable the request proceeds
//! uncounted, loudly, because product availability outranks strict quota
//! enforcement.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use fred::clients::Client as RedisClient;
use fred::interfaces::KeysInterface;
use prepvault_common::{AppError, AppResult, config::LimitsConfig};
use prepvault_db::entities::user::Role;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

/// Content-creation action kinds under quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Questions,
    Companies,
    Tips,
}

impl ActionKind {
    /// Stable key fragment for this action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Questions => "questions",
            Self::Companies => "companies",
            Self::Tips => "tips",
        }
    }
}

impl FromStr for ActionKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "questions" => Ok(Self::Questions),
            "companies" => Ok(Self::Companies),
            "tips" => Ok(Self::Tips),
            other => Err(AppError::Validation(format!(
                "Unknown rate limit action: {other}"
            ))),
        }
    }
}

/// Counter store failure.
#[derive(Debug, thiserror::Error)]
pub enum CounterStoreError {
    #[error("Counter store unavailable: {0}")]
    Unavailable(String),
}

/// Narrow interface over the external counter service.
///
/// Implementations must make `increment_with_expiry` a single atomic
/// check-and-increment; two concurrent callers may never both observe the
/// pre-increment count.
#[async_trait::async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment the counter, starting a fresh window with the given
    /// expiry when the key is new. Returns the post-increment count.
    async fn increment_with_expiry(
        &self,
        key: &str,
        window_secs: i64,
    ) -> Result<u64, CounterStoreError>;

    /// Read the current count and remaining window without consuming.
    async fn peek(&self, key: &str) -> Result<(u64, Option<i64>), CounterStoreError>;
}

/// Redis-backed counter store.
pub struct RedisCounterStore {
    redis: Arc<RedisClient>,
}

impl RedisCounterStore {
    /// Create a new Redis counter store.
    #[must_use]
    pub const fn new(redis: Arc<RedisClient>) -> Self {
        Self { redis }
    }
}

#[async_trait::async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment_with_expiry(
        &self,
        key: &str,
        window_secs: i64,
    ) -> Result<u64, CounterStoreError> {
        let count: u64 = self
            .redis
            .incr(key)
            .await
            .map_err(|e| CounterStoreError::Unavailable(e.to_string()))?;

        // Set expiry on first increment
        if count == 1 {
            self.redis
                .expire::<(), _>(key, window_secs, None)
                .await
                .map_err(|e| CounterStoreError::Unavailable(e.to_string()))?;
        }

        Ok(count)
    }

    async fn peek(&self, key: &str) -> Result<(u64, Option<i64>), CounterStoreError> {
        let count: Option<u64> = self
            .redis
            .get(key)
            .await
            .map_err(|e| CounterStoreError::Unavailable(e.to_string()))?;

        let ttl: i64 = self
            .redis
            .ttl(key)
            .await
            .map_err(|e| CounterStoreError::Unavailable(e.to_string()))?;

        Ok((count.unwrap_or(0), (ttl > 0).then_some(ttl)))
    }
}

/// In-memory counter store for tests and single-node development.
///
/// Windows are tracked with `tokio::time::Instant`, so paused-clock tests
/// can advance past an expiry deterministically.
#[derive(Default)]
pub struct MemoryCounterStore {
    entries: RwLock<HashMap<String, (u64, Instant)>>,
}

impl MemoryCounterStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment_with_expiry(
        &self,
        key: &str,
        window_secs: i64,
    ) -> Result<u64, CounterStoreError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();

        let entry = entries
            .entry(key.to_string())
            .or_insert((0, now + Duration::from_secs(window_secs.max(0) as u64)));

        if now >= entry.1 {
            *entry = (0, now + Duration::from_secs(window_secs.max(0) as u64));
        }

        entry.0 += 1;
        Ok(entry.0)
    }

    async fn peek(&self, key: &str) -> Result<(u64, Option<i64>), CounterStoreError> {
        let entries = self.entries.read().await;
        let now = Instant::now();

        Ok(entries
            .get(key)
            .filter(|(_, expires_at)| now < *expires_at)
            .map_or((0, None), |(count, expires_at)| {
                (*count, Some(expires_at.duration_since(now).as_secs() as i64))
            }))
    }
}

/// Role-dependent ceilings per action kind.
#[derive(Debug, Clone)]
pub struct AdmissionLimits {
    /// Window length in seconds.
    pub window_secs: i64,
    ceilings: HashMap<ActionKind, (u32, u32)>,
}

impl AdmissionLimits {
    /// Build limits from configuration.
    #[must_use]
    pub fn from_config(config: &LimitsConfig) -> Self {
        let mut ceilings = HashMap::new();
        ceilings.insert(
            ActionKind::Questions,
            (config.questions_user, config.questions_admin),
        );
        ceilings.insert(
            ActionKind::Companies,
            (config.companies_user, config.companies_admin),
        );
        ceilings.insert(ActionKind::Tips, (config.tips_user, config.tips_admin));

        Self {
            window_secs: config.window_secs,
            ceilings,
        }
    }

    /// Ceiling for a role on an action.
    #[must_use]
    pub fn ceiling(&self, kind: ActionKind, role: Role) -> u32 {
        let (user, admin) = self.ceilings.get(&kind).copied().unwrap_or((0, 0));
        if role.is_admin() { admin } else { user }
    }
}

impl Default for AdmissionLimits {
    fn default() -> Self {
        Self::from_config(&LimitsConfig::default())
    }
}

/// Outcome of an admission check that allowed the request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionDecision {
    pub limit: u32,
    pub remaining: u32,
    pub reset_in_secs: Option<i64>,
    /// False when the counter store was unreachable and the request was
    /// admitted uncounted.
    pub enforced: bool,
}

/// Read-only quota status for a user and action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionStatus {
    pub action: ActionKind,
    pub limit: u32,
    pub used: u64,
    pub remaining: u32,
    pub reset_in_secs: Option<i64>,
    /// False when the counter store was unreachable.
    pub enforced: bool,
}

/// Sliding-window admission controller.
#[derive(Clone)]
pub struct AdmissionController {
    store: Arc<dyn CounterStore>,
    limits: AdmissionLimits,
    prefix: String,
}

impl AdmissionController {
    /// Create a new admission controller.
    #[must_use]
    pub fn new(store: Arc<dyn CounterStore>, limits: AdmissionLimits, prefix: String) -> Self {
        Self {
            store,
            limits,
            prefix,
        }
    }

    fn key(&self, user_id: &str, kind: ActionKind) -> String {
        format!("{}:ratelimit:{}:{}", self.prefix, user_id, kind.as_str())
    }

    /// Check the quota and consume one unit of it.
    ///
    /// Over-ceiling requests are rejected with the seconds until the
    /// window resets. Rejected attempts still tick the counter but never
    /// extend the window, which is only armed on the first increment.
    pub async fn check_and_consume(
        &self,
        user_id: &str,
        role: Role,
        kind: ActionKind,
    ) -> AppResult<AdmissionDecision> {
        let limit = self.limits.ceiling(kind, role);
        let key = self.key(user_id, kind);

        let count = match self
            .store
            .increment_with_expiry(&key, self.limits.window_secs)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                // Fail-open: availability beats quota enforcement. Loudly.
                tracing::warn!(
                    error = %e,
                    action = kind.as_str(),
                    "Counter store unreachable, admitting request without quota enforcement"
                );
                return Ok(AdmissionDecision {
                    limit,
                    remaining: limit,
                    reset_in_secs: None,
                    enforced: false,
                });
            }
        };

        if count > u64::from(limit) {
            let retry_after = match self.store.peek(&key).await {
                Ok((_, Some(ttl))) => ttl.max(0) as u64,
                _ => self.limits.window_secs.max(0) as u64,
            };
            return Err(AppError::RateLimited { retry_after });
        }

        Ok(AdmissionDecision {
            limit,
            remaining: limit.saturating_sub(count as u32),
            reset_in_secs: Some(self.limits.window_secs),
            enforced: true,
        })
    }

    /// Read the quota status without consuming. Never rate limited itself.
    pub async fn status(
        &self,
        user_id: &str,
        role: Role,
        kind: ActionKind,
    ) -> AppResult<AdmissionStatus> {
        let limit = self.limits.ceiling(kind, role);
        let key = self.key(user_id, kind);

        match self.store.peek(&key).await {
            Ok((used, reset_in_secs)) => Ok(AdmissionStatus {
                action: kind,
                limit,
                used,
                remaining: limit.saturating_sub(used.min(u64::from(limit)) as u32),
                reset_in_secs,
                enforced: true,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Counter store unreachable for quota status");
                Ok(AdmissionStatus {
                    action: kind,
                    limit,
                    used: 0,
                    remaining: limit,
                    reset_in_secs: None,
                    enforced: false,
                })
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct UnavailableStore;

    #[async_trait::async_trait]
    impl CounterStore for UnavailableStore {
        async fn increment_with_expiry(
            &self,
            _key: &str,
            _window_secs: i64,
        ) -> Result<u64, CounterStoreError> {
            Err(CounterStoreError::Unavailable("connection refused".into()))
        }

        async fn peek(&self, _key: &str) -> Result<(u64, Option<i64>), CounterStoreError> {
            Err(CounterStoreError::Unavailable("connection refused".into()))
        }
    }

    fn controller_with(store: Arc<dyn CounterStore>) -> AdmissionController {
        AdmissionController::new(store, AdmissionLimits::default(), "test".to_string())
    }

    #[tokio::test]
    async fn test_consumes_up_to_ceiling_then_rejects() {
        let controller = controller_with(Arc::new(MemoryCounterStore::new()));

        // Default user ceiling for questions is 10.
        for _ in 0..10 {
            let decision = controller
                .check_and_consume("u1", Role::User, ActionKind::Questions)
                .await
                .unwrap();
            assert!(decision.enforced);
        }

        let result = controller
            .check_and_consume("u1", Role::User, ActionKind::Questions)
            .await;
        match result {
            Err(AppError::RateLimited { retry_after }) => assert!(retry_after > 0),
            other => panic!("Expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_elapse_resets_quota() {
        let controller = controller_with(Arc::new(MemoryCounterStore::new()));

        for _ in 0..10 {
            controller
                .check_and_consume("u1", Role::User, ActionKind::Questions)
                .await
                .unwrap();
        }
        assert!(
            controller
                .check_and_consume("u1", Role::User, ActionKind::Questions)
                .await
                .is_err()
        );

        // Advance past the 24h window; the next attempt starts a new one.
        tokio::time::advance(Duration::from_secs(24 * 60 * 60 + 1)).await;

        let decision = controller
            .check_and_consume("u1", Role::User, ActionKind::Questions)
            .await
            .unwrap();
        assert_eq!(decision.remaining, 9);
    }

    #[tokio::test]
    async fn test_admin_ceiling_is_higher() {
        let controller = controller_with(Arc::new(MemoryCounterStore::new()));

        // The 11th admin question is still fine (admin ceiling 50).
        for _ in 0..11 {
            controller
                .check_and_consume("a1", Role::Admin, ActionKind::Questions)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_keys_are_per_user_and_per_action() {
        let controller = controller_with(Arc::new(MemoryCounterStore::new()));

        for _ in 0..10 {
            controller
                .check_and_consume("u1", Role::User, ActionKind::Questions)
                .await
                .unwrap();
        }

        // Another user is unaffected.
        assert!(
            controller
                .check_and_consume("u2", Role::User, ActionKind::Questions)
                .await
                .is_ok()
        );
        // Another action of the same user is unaffected.
        assert!(
            controller
                .check_and_consume("u1", Role::User, ActionKind::Companies)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_fail_open_when_store_unavailable() {
        let controller = controller_with(Arc::new(UnavailableStore));

        // Far past any ceiling, every request is still admitted.
        for _ in 0..25 {
            let decision = controller
                .check_and_consume("u1", Role::User, ActionKind::Questions)
                .await
                .unwrap();
            assert!(!decision.enforced);
        }
    }

    #[tokio::test]
    async fn test_status_reports_without_consuming() {
        let controller = controller_with(Arc::new(MemoryCounterStore::new()));

        for _ in 0..3 {
            controller
                .check_and_consume("u1", Role::User, ActionKind::Questions)
                .await
                .unwrap();
        }

        let status = controller
            .status("u1", Role::User, ActionKind::Questions)
            .await
            .unwrap();
        assert_eq!(status.used, 3);
        assert_eq!(status.remaining, 7);

        // Reading the status did not consume quota.
        let again = controller
            .status("u1", Role::User, ActionKind::Questions)
            .await
            .unwrap();
        assert_eq!(again.used, 3);
    }

    #[tokio::test]
    async fn test_status_fail_open() {
        let controller = controller_with(Arc::new(UnavailableStore));

        let status = controller
            .status("u1", Role::User, ActionKind::Questions)
            .await
            .unwrap();
        assert!(!status.enforced);
        assert_eq!(status.used, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_store_window_expiry() {
        let store = MemoryCounterStore::new();

        assert_eq!(store.increment_with_expiry("k", 60).await.unwrap(), 1);
        assert_eq!(store.increment_with_expiry("k", 60).await.unwrap(), 2);

        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(store.increment_with_expiry("k", 60).await.unwrap(), 1);
    }

    #[test]
    fn test_action_kind_round_trip() {
        assert_eq!("questions".parse::<ActionKind>().unwrap(), ActionKind::Questions);
        assert_eq!("tips".parse::<ActionKind>().unwrap(), ActionKind::Tips);
        assert!("replies".parse::<ActionKind>().is_err());
    }
}
