//! Serialisation of operations touching shared proxy state.
//!
//! # Lock Order
//! ```text
//! service lock (per service name)  →  pipeline lock (template file, proxy)
//! ```
//! - `execute` and remove hold their service lock for the whole operation
//! - Every writer of the shared template file, and every proxy
//!   rebuild/reload, holds the pipeline lock
//! - Fleet replay takes only the pipeline lock

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct OperationLocks {
    services: DashMap<String, Arc<Mutex<()>>>,
    pipeline: Mutex<()>,
}

impl OperationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to one service.
    pub async fn service(&self, service_name: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .services
            .entry(service_name.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    /// Wait for exclusive access to the template file and the proxy.
    pub async fn pipeline(&self) -> MutexGuard<'_, ()> {
        self.pipeline.lock().await
    }

    /// Number of services that have been locked at least once.
    pub fn tracked_services(&self) -> usize {
        self.services.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_service_is_exclusive() {
        let locks = Arc::new(OperationLocks::new());
        let guard = locks.service("svc").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.service("svc").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_services_do_not_block() {
        let locks = OperationLocks::new();
        let _a = locks.service("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.service("b")).await;
        assert!(b.is_ok());
        assert_eq!(locks.tracked_services(), 2);
    }
}
