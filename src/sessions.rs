//! Pool of long-lived chat sessions, one per bot credential

use crate::{
    error::GatewayError,
    gateway::{ChatSession, Gateway},
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

/// Per-credential slot, initialized at most once
type SessionSlot = Arc<OnceCell<Arc<dyn ChatSession>>>;

/// Lazily-populated registry of gateway sessions
///
/// Concurrent first requests for the same credential wait on the same slot,
/// so only one connection is ever established per credential. A failed
/// connect leaves the slot empty and the next caller retries from scratch.
/// Sessions are never evicted; keeping them alive is the gateway's job.
pub struct SessionPool {
    gateway: Arc<dyn Gateway>,
    slots: Mutex<HashMap<String, SessionSlot>>,
}

impl SessionPool {
    /// Creates an empty pool connecting through `gateway`
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the session for `credential`, connecting on first use
    pub async fn get_or_create(
        &self,
        credential: &str,
    ) -> Result<Arc<dyn ChatSession>, GatewayError> {
        // Only the slot lookup happens under the map lock; the connect itself
        // serializes per credential on the slot.
        let slot = {
            let mut slots = self.slots.lock().await;
            slots
                .entry(credential.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let session = slot
            .get_or_try_init(|| async {
                tracing::debug!("Session not found, opening gateway connection");
                let session = self.gateway.connect(credential).await?;
                tracing::info!("Gateway session established");
                Ok::<_, GatewayError>(session)
            })
            .await?;

        Ok(session.clone())
    }

    /// Number of established sessions
    pub async fn len(&self) -> usize {
        let slots = self.slots.lock().await;
        slots.values().filter(|slot| slot.initialized()).count()
    }

    /// Returns true if no session has been established yet
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::MockGateway;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_credential_returns_same_session() {
        let gateway = Arc::new(MockGateway::new());
        let pool = SessionPool::new(gateway.clone());

        let first = pool.get_or_create("token-a").await.unwrap();
        let second = pool.get_or_create("token-a").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(gateway.connect_count(), 1);
        assert_eq!(pool.len().await, 1);
    }

    #[tokio::test]
    async fn test_distinct_credentials_get_distinct_sessions() {
        let gateway = Arc::new(MockGateway::new());
        let pool = SessionPool::new(gateway.clone());

        let a = pool.get_or_create("token-a").await.unwrap();
        let b = pool.get_or_create("token-b").await.unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(gateway.connect_count(), 2);
        assert_eq!(pool.len().await, 2);
    }

    #[tokio::test]
    async fn test_failed_connect_is_not_cached() {
        let gateway = Arc::new(MockGateway::new());
        gateway.refuse("bad-token");
        let pool = SessionPool::new(gateway.clone());

        let err = pool.get_or_create("bad-token").await.err().unwrap();
        assert!(matches!(err, GatewayError::HandshakeRejected { code: 4004, .. }));
        assert!(pool.is_empty().await);

        assert!(pool.get_or_create("bad-token").await.is_err());
        assert_eq!(gateway.connect_attempts(), 2);
        assert_eq!(gateway.connect_count(), 0);
        assert!(pool.is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_connects_once() {
        let gateway = Arc::new(MockGateway::new().with_connect_delay(Duration::from_millis(50)));
        let pool = Arc::new(SessionPool::new(gateway.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                pool.get_or_create("shared").await.unwrap()
            }));
        }

        let mut sessions = Vec::new();
        for handle in handles {
            sessions.push(handle.await.unwrap());
        }

        assert_eq!(gateway.connect_count(), 1);
        assert!(sessions.iter().all(|s| Arc::ptr_eq(s, &sessions[0])));
    }
}
