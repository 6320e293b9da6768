//! Cached signed-header record.

use chrono::{DateTime, Utc};

/// A signed header together with the identity and endpoint it is bound to.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Caller-supplied namespace, normally the API key.
    pub owner_key: String,
    pub region: String,
    /// Opaque header value sent as `X-Sts-Gci-Headers`.
    pub header: String,
    pub expiry: DateTime<Utc>,
    pub account_id: String,
    /// Hostname the header was presigned for. Older files may lack it.
    pub endpoint: Option<String>,
}

impl CredentialRecord {
    /// Usable strictly before `expiry`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expiry
    }

    /// Unexpired and generated for `endpoint`.
    pub fn is_usable_for(&self, endpoint: &str, now: DateTime<Utc>) -> bool {
        self.is_valid_at(now) && self.endpoint.as_deref() == Some(endpoint)
    }
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("region", &self.region)
            .field("header", &"<redacted>")
            .field("expiry", &self.expiry)
            .field("account_id", &self.account_id)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(expiry: DateTime<Utc>) -> CredentialRecord {
        CredentialRecord {
            owner_key: "key".into(),
            region: "us-east-1".into(),
            header: "X-Amz-Signature=abc".into(),
            expiry,
            account_id: "123456789012".into(),
            endpoint: Some("hlb.us-east-1.aws.zonehero.cloud".into()),
        }
    }

    #[test]
    fn test_expiry_is_exclusive() {
        let now = Utc::now();
        assert!(record(now + Duration::seconds(1)).is_valid_at(now));
        assert!(!record(now).is_valid_at(now));
        assert!(!record(now - Duration::seconds(1)).is_valid_at(now));
    }

    #[test]
    fn test_endpoint_binding() {
        let now = Utc::now();
        let rec = record(now + Duration::minutes(5));
        assert!(rec.is_usable_for("hlb.us-east-1.aws.zonehero.cloud", now));
        assert!(!rec.is_usable_for("localhost", now));

        let legacy = CredentialRecord {
            endpoint: None,
            ..rec
        };
        assert!(!legacy.is_usable_for("hlb.us-east-1.aws.zonehero.cloud", now));
    }

    #[test]
    fn test_debug_hides_header() {
        let printed = format!("{:?}", record(Utc::now()));
        assert!(!printed.contains("X-Amz-Signature"));
    }
}
