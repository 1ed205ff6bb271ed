use std::time::Duration;

use quarry_core::query::{CacheKey, SearchQuery};
use quarry_core::traits::ResultCache;
use quarry_db::{Database, PgResultCache};

use crate::integration::common::setup_test_db;

fn key(query: &str) -> CacheKey {
    SearchQuery::new(query).unwrap().cache_key()
}

#[tokio::test]
async fn absent_key_reads_empty() {
    let (pool, _container) = setup_test_db().await;
    let cache = PgResultCache::new(pool);

    assert!(cache.get(&key("zelda")).await.unwrap().is_empty());
}

#[tokio::test]
async fn append_preserves_order() {
    let (pool, _container) = setup_test_db().await;
    let cache = PgResultCache::new(pool);
    let k = key("zelda");

    for payload in ["one", "two", "three"] {
        cache.append(&k, payload).await.unwrap();
    }

    assert_eq!(cache.get(&k).await.unwrap(), vec!["one", "two", "three"]);
    assert!(cache.get(&key("mario")).await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_appends_are_all_kept() {
    let (pool, _container) = setup_test_db().await;
    let cache = PgResultCache::new(pool);
    let k = key("zelda");

    let mut handles = Vec::new();
    for i in 0..20 {
        let cache = cache.clone();
        let k = k.clone();
        handles.push(tokio::spawn(async move {
            cache.append(&k, &format!("r{i}")).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(cache.get(&k).await.unwrap().len(), 20);
}

#[tokio::test]
async fn expired_key_reads_empty_and_is_replaced() {
    let (pool, _container) = setup_test_db().await;
    let cache = PgResultCache::new(pool);
    let k = key("zelda");

    cache.append(&k, "old").await.unwrap();
    cache.expire(&k, Duration::from_secs(1)).await.unwrap();
    assert_eq!(cache.get(&k).await.unwrap(), vec!["old"]);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(cache.get(&k).await.unwrap().is_empty());

    cache.append(&k, "new").await.unwrap();
    assert_eq!(cache.get(&k).await.unwrap(), vec!["new"]);
}

#[tokio::test]
async fn expire_on_absent_key_is_noop() {
    let (pool, _container) = setup_test_db().await;
    let cache = PgResultCache::new(pool.clone());
    let k = key("nothing");

    cache.expire(&k, Duration::from_secs(60)).await.unwrap();

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM search_cache_expiry")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn purge_expired_removes_only_stale_keys() {
    let (pool, _container) = setup_test_db().await;
    let cache = PgResultCache::new(pool);
    let stale = key("zelda");
    let live = key("mario");

    cache.append(&stale, "a").await.unwrap();
    cache.append(&stale, "b").await.unwrap();
    cache.expire(&stale, Duration::from_secs(1)).await.unwrap();
    cache.append(&live, "c").await.unwrap();
    cache.expire(&live, Duration::from_secs(3600)).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(cache.purge_expired().await.unwrap(), 2);
    assert_eq!(cache.get(&live).await.unwrap(), vec!["c"]);
}

#[tokio::test]
async fn health_check_succeeds() {
    let (pool, _container) = setup_test_db().await;
    let db = Database::from_pool(pool);

    db.health_check().await.unwrap();
    db.result_cache().append(&key("zelda"), "x").await.unwrap();
}
