// ABOUTME: Integration tests for the persisted CSRF secret key
// ABOUTME: Covers key reuse across restarts and cold-start races between processes

use ctc_security::{CsrfKeyStore, CsrfTokenEngine};
use ctc_storage::{open_pool, SecretKeyStorage, StorageConfig};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

async fn key_store_at(config: &StorageConfig) -> CsrfKeyStore {
    let pool = open_pool(config).await.unwrap();
    CsrfKeyStore::new(SecretKeyStorage::new(pool))
}

#[tokio::test]
async fn test_secret_key_is_stable_across_restart() {
    let dir = TempDir::new().unwrap();
    let config = StorageConfig::at(dir.path().join("ctc.db"));

    let store = key_store_at(&config).await;
    let first = store.get_or_create_secret_key().await.unwrap();
    let second = store.get_or_create_secret_key().await.unwrap();
    assert_eq!(first, second);

    // Simulated restart: brand new pool and store against the same file
    let restarted = key_store_at(&config).await;
    let after_restart = restarted.get_or_create_secret_key().await.unwrap();
    assert_eq!(first, after_restart);
}

#[tokio::test]
async fn test_tokens_survive_restart() {
    let dir = TempDir::new().unwrap();
    let config = StorageConfig::at(dir.path().join("ctc.db"));

    let key = key_store_at(&config)
        .await
        .get_or_create_secret_key()
        .await
        .unwrap();
    let token = CsrfTokenEngine::new(&key)
        .mint(Some("u1"), "/projects/5/edit", 1_700_000_000)
        .unwrap();

    let restarted_key = key_store_at(&config)
        .await
        .get_or_create_secret_key()
        .await
        .unwrap();
    let engine = CsrfTokenEngine::new(&restarted_key);

    assert!(engine.is_valid(Some(&token), Some("u1"), "/projects/5/edit", 1_700_000_100));
}

#[tokio::test]
async fn test_cold_start_race_yields_one_key() {
    let dir = TempDir::new().unwrap();
    let config = StorageConfig::at(dir.path().join("ctc.db"));

    // Separate pools stand in for separate server processes
    let mut stores = Vec::new();
    for _ in 0..4 {
        stores.push(key_store_at(&config).await);
    }

    let mut handles = Vec::new();
    for store in stores {
        handles.push(tokio::spawn(async move {
            store.get_or_create_secret_key().await.unwrap()
        }));
    }

    let mut keys = Vec::new();
    for handle in handles {
        keys.push(handle.await.unwrap());
    }

    for key in &keys[1..] {
        assert_eq!(&keys[0], key);
    }
}
