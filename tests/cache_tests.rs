mod common;

use async_trait::async_trait;
use journeys::cache::{InMemoryCache, QueryCache};
use journeys::entities::PublishStatus;
use journeys::store::articles::{self, ArticlePatch, NewArticle};
use journeys::store::{StatusFilter, Store};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

/// Parks the first `set` until released, so a write can land between a
/// read's database query and its cache fill.
struct GatedCache {
    inner: InMemoryCache,
    reached: Mutex<Option<oneshot::Sender<()>>>,
    release: tokio::sync::Mutex<Option<oneshot::Receiver<()>>>,
}

#[async_trait]
impl QueryCache for GatedCache {
    async fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).await
    }

    async fn generation(&self) -> u64 {
        self.inner.generation().await
    }

    async fn set(&self, key: &str, value: String, generation: u64) {
        let gate = self.release.lock().await.take();
        if let Some(release) = gate {
            let reached = self.reached.lock().unwrap().take();
            if let Some(reached) = reached {
                let _ = reached.send(());
            }
            let _ = release.await;
        }
        self.inner.set(key, value, generation).await
    }

    async fn invalidate(&self, prefix: &str) {
        self.inner.invalidate(prefix).await
    }
}

#[tokio::test]
async fn write_during_a_cache_fill_is_not_overwritten_by_stale_rows() {
    let base = common::test_store().await;
    let (reached_tx, reached_rx) = oneshot::channel();
    let (release_tx, release_rx) = oneshot::channel();
    let cache = Arc::new(GatedCache {
        inner: InMemoryCache::new(Duration::from_secs(60)),
        reached: Mutex::new(Some(reached_tx)),
        release: tokio::sync::Mutex::new(Some(release_rx)),
    });
    let store = Store::new(base.db.clone(), cache);

    let created = articles::create(
        &store,
        NewArticle {
            title: "before".to_string(),
            excerpt: "e".to_string(),
            content: None,
            category: "تقنية".to_string(),
            image_url: None,
            status: PublishStatus::Published,
        },
    )
    .await
    .unwrap();

    let reader = {
        let store = store.clone();
        tokio::spawn(async move { articles::list(&store, StatusFilter::All).await })
    };

    // The reader has loaded "before" and is about to fill the cache.
    reached_rx.await.unwrap();
    articles::update(
        &store,
        created.id,
        ArticlePatch {
            title: Some("after".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    release_tx.send(()).unwrap();

    let in_flight = reader.await.unwrap().unwrap();
    assert_eq!(in_flight[0].title, "before");

    let fresh = articles::list(&store, StatusFilter::All).await.unwrap();
    assert_eq!(fresh[0].title, "after");
}

#[tokio::test]
async fn fills_without_a_concurrent_write_are_served_from_the_cache() {
    let cache = Arc::new(InMemoryCache::new(Duration::from_secs(60)));
    let base = common::test_store().await;
    let store = Store::new(base.db.clone(), cache.clone());

    articles::list(&store, StatusFilter::Published).await.unwrap();
    assert_eq!(cache.len(), 1);
}
