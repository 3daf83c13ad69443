//! The metadata block stored ahead of every payload.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// 9999-12-31T23:59:59Z, the latest instant that round-trips through RFC 3339.
const LATEST_EXPIRY_SECS: i64 = 253_402_300_799;

fn latest_expiry() -> DateTime<Utc> {
    DateTime::from_timestamp(LATEST_EXPIRY_SECS, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Identity and expiry configuration of one cache file.
///
/// Built from `open` arguments only for a brand-new cache. Once a file holds
/// a metadata block, that block wins over whatever the caller passes later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    identifier: String,
    expire_enabled: bool,
    expiry_time: DateTime<Utc>,
}

impl CacheMetadata {
    /// Defaults for a new cache; a zero `expiry` never expires.
    pub fn new(identifier: impl Into<String>, expiry: Duration) -> Self {
        Self::starting_at(identifier, expiry, Utc::now())
    }

    pub(crate) fn starting_at(identifier: impl Into<String>, expiry: Duration, now: DateTime<Utc>) -> Self {
        let latest = latest_expiry();
        let expiry_time = TimeDelta::from_std(expiry)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .filter(|t| *t <= latest)
            .unwrap_or(latest);

        Self { identifier: identifier.into(), expire_enabled: !expiry.is_zero(), expiry_time }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn expire_enabled(&self) -> bool {
        self.expire_enabled
    }

    pub fn expiry_time(&self) -> DateTime<Utc> {
        self.expiry_time
    }

    /// Whether the cache is stale at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expire_enabled && self.expiry_time < now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(self).map_err(|e| Error::EncodeFailure(format!("metadata: {e}")))
    }

    pub(crate) fn decode(block: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(block).map_err(|e| Error::CorruptMetadata(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_expiry_never_expires() {
        let meta = CacheMetadata::new("forever", Duration::ZERO);
        assert!(!meta.expire_enabled());
        assert!(!meta.is_expired_at(meta.expiry_time() + TimeDelta::days(365)));
    }

    #[test]
    fn test_expiry_time_offset() {
        let now = Utc::now();
        let meta = CacheMetadata::starting_at("feeds", Duration::from_secs(10), now);
        assert!(meta.expire_enabled());
        assert_eq!(meta.expiry_time(), now + TimeDelta::seconds(10));
        assert!(!meta.is_expired_at(now + TimeDelta::seconds(10)));
        assert!(meta.is_expired_at(now + TimeDelta::seconds(11)));
    }

    #[test]
    fn test_huge_expiry_saturates() {
        let meta = CacheMetadata::new("long", Duration::from_secs(u64::MAX));
        assert!(meta.expire_enabled());
        assert_eq!(meta.expiry_time(), latest_expiry());
        assert!(!meta.is_expired());

        let block = meta.encode().unwrap();
        assert_eq!(CacheMetadata::decode(&block).unwrap(), meta);
    }

    #[test]
    fn test_encode_decode() {
        let meta = CacheMetadata::new("feeds", Duration::from_secs(30));
        let block = meta.encode().unwrap();
        assert_eq!(CacheMetadata::decode(&block).unwrap(), meta);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = CacheMetadata::decode(b"\x00\x01not metadata");
        assert!(matches!(result, Err(Error::CorruptMetadata(_))));
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        let result = CacheMetadata::decode(br#"{"identifier":"feeds"}"#);
        assert!(matches!(result, Err(Error::CorruptMetadata(_))));
    }
}
