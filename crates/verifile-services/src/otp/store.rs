use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use verifile_core::models::{OtpCheck, OtpRecord};
use verifile_core::{AppError, OtpStore};

/// Process-local passcode store. Records are lost on restart.
#[derive(Default)]
pub struct InMemoryOtpStore {
    records: RwLock<HashMap<String, OtpRecord>>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn put(&self, record: OtpRecord) -> Result<(), AppError> {
        self.records
            .write()
            .await
            .insert(record.email.clone(), record);
        Ok(())
    }

    async fn get(&self, email: &str) -> Result<Option<OtpRecord>, AppError> {
        Ok(self.records.read().await.get(email).cloned())
    }

    async fn delete(&self, email: &str) -> Result<(), AppError> {
        self.records.write().await.remove(email);
        Ok(())
    }

    async fn check_and_consume(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
        max_attempts: u32,
    ) -> Result<OtpCheck, AppError> {
        // One write guard covers the read, the decision, and the update.
        let mut records = self.records.write().await;
        let outcome = match records.get(email) {
            Some(record) => record.check(code, now, max_attempts),
            None => return Ok(OtpCheck::NotFound),
        };

        if let OtpCheck::Mismatch { attempts } = outcome {
            if let Some(record) = records.get_mut(email) {
                record.attempts = attempts;
            }
        } else if outcome.consumes_record() {
            records.remove(email);
        }

        Ok(outcome)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| !record.is_expired_at(now));
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(email: &str, code: &str) -> OtpRecord {
        OtpRecord::new(email.to_string(), code.to_string(), chrono::Duration::minutes(10))
    }

    #[tokio::test]
    async fn put_overwrites_previous_code() {
        let store = InMemoryOtpStore::new();
        store.put(record("a@b.com", "111111")).await.unwrap();
        store
            .check_and_consume("a@b.com", "999999", Utc::now(), 5)
            .await
            .unwrap();
        store.put(record("a@b.com", "222222")).await.unwrap();

        let loaded = store.get("a@b.com").await.unwrap().unwrap();
        assert_eq!(loaded.code, "222222");
        assert_eq!(loaded.attempts, 0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn mismatches_accumulate_and_match_consumes() {
        let store = InMemoryOtpStore::new();
        let now = Utc::now();
        assert_eq!(
            store.check_and_consume("a@b.com", "111111", now, 5).await.unwrap(),
            OtpCheck::NotFound
        );

        store.put(record("a@b.com", "111111")).await.unwrap();
        assert_eq!(
            store.check_and_consume("a@b.com", "000000", now, 5).await.unwrap(),
            OtpCheck::Mismatch { attempts: 1 }
        );
        assert_eq!(
            store.check_and_consume("a@b.com", "000000", now, 5).await.unwrap(),
            OtpCheck::Mismatch { attempts: 2 }
        );
        assert_eq!(store.get("a@b.com").await.unwrap().unwrap().attempts, 2);

        assert_eq!(
            store.check_and_consume("a@b.com", "111111", now, 5).await.unwrap(),
            OtpCheck::Verified
        );
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn concurrent_checks_verify_once() {
        let store = Arc::new(InMemoryOtpStore::new());
        store.put(record("a@b.com", "123456")).await.unwrap();
        let now = Utc::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .check_and_consume("a@b.com", "123456", now, 5)
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut verified = 0;
        for handle in handles {
            if handle.await.unwrap() == OtpCheck::Verified {
                verified += 1;
            }
        }
        assert_eq!(verified, 1);
    }

    #[tokio::test]
    async fn concurrent_mismatches_respect_budget() {
        let store = Arc::new(InMemoryOtpStore::new());
        store.put(record("a@b.com", "123456")).await.unwrap();
        let now = Utc::now();

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .check_and_consume("a@b.com", "000000", now, 3)
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut mismatches = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), OtpCheck::Mismatch { .. }) {
                mismatches += 1;
            }
        }
        assert_eq!(mismatches, 3);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn purge_removes_only_expired_records() {
        let store = InMemoryOtpStore::new();
        store.put(record("old@b.com", "111111")).await.unwrap();
        store
            .put(OtpRecord::new(
                "new@b.com".to_string(),
                "222222".to_string(),
                chrono::Duration::minutes(60),
            ))
            .await
            .unwrap();

        let later = Utc::now() + chrono::Duration::minutes(30);
        assert_eq!(store.purge_expired(later).await.unwrap(), 1);
        assert!(store.get("old@b.com").await.unwrap().is_none());
        assert!(store.get("new@b.com").await.unwrap().is_some());
        assert_eq!(store.purge_expired(later).await.unwrap(), 0);
    }
}
