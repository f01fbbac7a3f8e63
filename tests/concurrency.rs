//! Concurrency tests: many callers against one sequence must see every value
//! exactly once.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use sequencing_worker::config::{FileStorageConfig, StorageConfig};
use sequencing_worker::domain::{GenerationContext, SequenceKey, UpsertConfigRequest};
use sequencing_worker::error::AppError;
use sequencing_worker::service::SequenceEngine;
use sequencing_worker::storage::{LockSettings, create_storage};

async fn engine(temp: &TempDir, lock: LockSettings) -> SequenceEngine {
    let config = StorageConfig {
        file: FileStorageConfig {
            data_dir: temp.path().to_path_buf(),
        },
        ..Default::default()
    };
    let storage = create_storage(&config, lock).await.unwrap();
    SequenceEngine::builder(storage).build()
}

async fn configure(engine: &SequenceEngine, key: &SequenceKey, request: UpsertConfigRequest) {
    engine.create_or_update_config(key, request).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_generate_is_gap_free() {
    const CALLERS: u64 = 64;

    let temp = TempDir::new().unwrap();
    let engine = Arc::new(engine(&temp, LockSettings::default()).await);
    let key = SequenceKey::new("acme", "invoice").unwrap();
    configure(
        &engine,
        &key,
        UpsertConfigRequest {
            pattern: "INV-{COUNTER:5}".to_string(),
            ..UpsertConfigRequest::default()
        },
    )
    .await;

    let mut handles = Vec::new();
    for _ in 0..CALLERS {
        let engine = Arc::clone(&engine);
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            engine.generate(&key, &GenerationContext::new()).await
        }));
    }

    let mut counters = BTreeSet::new();
    let mut values = BTreeSet::new();
    for handle in handles {
        let number = handle.await.unwrap().unwrap();
        assert!(counters.insert(number.counter), "duplicate {}", number.counter);
        values.insert(number.value);
    }

    assert_eq!(counters, (1..=CALLERS).collect::<BTreeSet<_>>());
    assert_eq!(values.len(), counters.len());
    assert_eq!(engine.state(&key).await.unwrap().current_value, CALLERS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_generate_with_count_reset() {
    const CALLERS: u64 = 30;

    let temp = TempDir::new().unwrap();
    let engine = Arc::new(engine(&temp, LockSettings::default()).await);
    let key = SequenceKey::new("acme", "batch").unwrap();
    configure(
        &engine,
        &key,
        UpsertConfigRequest {
            pattern: "{COUNTER}".to_string(),
            reset_limit: Some(10),
            ..UpsertConfigRequest::default()
        },
    )
    .await;

    let mut handles = Vec::new();
    for _ in 0..CALLERS {
        let engine = Arc::clone(&engine);
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            engine.generate(&key, &GenerationContext::new()).await
        }));
    }

    let mut per_value = [0u32; 11];
    for handle in handles {
        let number = handle.await.unwrap().unwrap();
        let index = usize::try_from(number.counter).unwrap();
        per_value[index] += 1;
    }

    // Three full epochs of 1..=10.
    assert_eq!(per_value[0], 0);
    assert!(per_value[1..].iter().all(|&n| n == 3), "{per_value:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sequences_do_not_contend() {
    let temp = TempDir::new().unwrap();
    let engine = Arc::new(engine(&temp, LockSettings::default()).await);

    let keys: Vec<SequenceKey> = (0..4)
        .map(|i| SequenceKey::new("acme", format!("seq-{i}")).unwrap())
        .collect();
    for key in &keys {
        configure(
            &engine,
            key,
            UpsertConfigRequest {
                pattern: "{COUNTER}".to_string(),
                ..UpsertConfigRequest::default()
            },
        )
        .await;
    }

    let mut handles = Vec::new();
    for key in &keys {
        for _ in 0..10 {
            let engine = Arc::clone(&engine);
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                engine.generate(&key, &GenerationContext::new()).await
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for key in &keys {
        assert_eq!(engine.state(key).await.unwrap().current_value, 10);
    }
}

#[tokio::test]
async fn test_lock_timeout_is_retryable() {
    let temp = TempDir::new().unwrap();
    let engine = engine(
        &temp,
        LockSettings {
            timeout: Duration::from_millis(50),
            retry_interval: Duration::from_millis(5),
        },
    )
    .await;
    let key = SequenceKey::new("acme", "invoice").unwrap();
    configure(
        &engine,
        &key,
        UpsertConfigRequest {
            pattern: "{COUNTER}".to_string(),
            ..UpsertConfigRequest::default()
        },
    )
    .await;

    // Another process holds the counter row.
    let path = temp.path().join("counters/acme/invoice.json");
    let holder = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(&path)
        .unwrap();
    fs2::FileExt::lock_exclusive(&holder).unwrap();

    let err = engine
        .generate(&key, &GenerationContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ConcurrencyTimeout(_)));
    assert!(err.is_retryable());

    fs2::FileExt::unlock(&holder).unwrap();
    let number = engine.generate(&key, &GenerationContext::new()).await.unwrap();
    assert_eq!(number.counter, 1);
}
