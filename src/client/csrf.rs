use std::future::Future;
use tokio::sync::Mutex;

use super::error::ClientError;

/// Client-side CSRF token cell.
///
/// The lock is held while a fetch is in flight, so concurrent callers queue
/// behind the first one and all receive the token it fetched. A failed fetch
/// leaves the cell empty and the next caller tries again.
#[derive(Debug, Default)]
pub struct CsrfTokenCache {
    slot: Mutex<Option<String>>,
}

impl CsrfTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached token, running `fetch` only when the cell is empty.
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<String, ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, ClientError>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }

        let token = fetch().await?;
        *slot = Some(token.clone());
        Ok(token)
    }

    pub async fn cached(&self) -> Option<String> {
        self.slot.lock().await.clone()
    }

    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }

    /// Drops the cached token only if it is still `token`. A token fetched
    /// after the rejected one was sent stays cached.
    pub async fn invalidate_if(&self, token: &str) -> bool {
        let mut slot = self.slot.lock().await;
        if slot.as_deref() == Some(token) {
            *slot = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn second_call_uses_cache() {
        let cache = CsrfTokenCache::new();
        let fetches = AtomicUsize::new(0);

        for _ in 0..2 {
            let token = cache
                .get_or_fetch(|| async {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Ok("t1".to_string())
                })
                .await
                .unwrap();
            assert_eq!(token, "t1");
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_fetch() {
        let cache = Arc::new(CsrfTokenCache::new());
        let fetches = Arc::new(AtomicUsize::new(0));

        let calls = (0..8).map(|_| {
            let cache = cache.clone();
            let fetches = fetches.clone();
            async move {
                cache
                    .get_or_fetch(|| async move {
                        fetches.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok("shared".to_string())
                    })
                    .await
            }
        });

        let results = futures::future::join_all(calls).await;
        assert!(results.iter().all(|r| r.as_deref().ok() == Some("shared")));
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_fetch_is_not_cached() {
        let cache = CsrfTokenCache::new();
        let err = cache
            .get_or_fetch(|| async { Err(ClientError::CsrfTokenMissing) })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::CsrfTokenMissing));
        assert_eq!(cache.cached().await, None);

        let token = cache.get_or_fetch(|| async { Ok("t2".to_string()) }).await.unwrap();
        assert_eq!(token, "t2");
    }

    #[tokio::test]
    async fn invalidate_if_only_drops_matching_token() {
        let cache = CsrfTokenCache::new();
        cache.get_or_fetch(|| async { Ok("current".to_string()) }).await.unwrap();

        assert!(!cache.invalidate_if("stale").await);
        assert_eq!(cache.cached().await.as_deref(), Some("current"));

        assert!(cache.invalidate_if("current").await);
        assert_eq!(cache.cached().await, None);
    }
}
