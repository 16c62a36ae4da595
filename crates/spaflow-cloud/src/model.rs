//! Provider-neutral records for the resources the deployer reconciles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key/value tag attached to a bucket or distribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Certificate lifecycle status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificateStatus {
    Issued,
    PendingValidation,
    Failed,
    Revoked,
    Other(String),
}

impl CertificateStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "ISSUED" => Self::Issued,
            "PENDING_VALIDATION" => Self::PendingValidation,
            "FAILED" => Self::Failed,
            "REVOKED" => Self::Revoked,
            other => Self::Other(other.to_string()),
        }
    }

    /// States from which a certificate will never become issued.
    pub fn is_terminal_failure(&self) -> bool {
        match self {
            Self::Failed | Self::Revoked => true,
            Self::Other(s) => matches!(s.as_str(), "EXPIRED" | "INACTIVE" | "VALIDATION_TIMED_OUT"),
            Self::Issued | Self::PendingValidation => false,
        }
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issued => write!(f, "ISSUED"),
            Self::PendingValidation => write!(f, "PENDING_VALIDATION"),
            Self::Failed => write!(f, "FAILED"),
            Self::Revoked => write!(f, "REVOKED"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// DNS record the certificate authority expects for domain validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsChallenge {
    pub name: String,
    pub record_type: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainValidation {
    pub domain_name: String,
    pub challenge: Option<DnsChallenge>,
}

/// Described certificate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub arn: String,
    pub domain_name: String,
    pub subject_alternative_names: Vec<String>,
    pub status: CertificateStatus,
    pub issued_at: Option<DateTime<Utc>>,
    pub validation_options: Vec<DomainValidation>,
}

impl CertificateRecord {
    /// Primary name first, then the alternative names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.domain_name.as_str())
            .chain(self.subject_alternative_names.iter().map(String::as_str))
    }
}

/// Distribution propagation status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributionStatus {
    Deployed,
    InProgress,
    Other(String),
}

impl DistributionStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "Deployed" => Self::Deployed,
            "InProgress" | "In Progress" => Self::InProgress,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for DistributionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deployed => write!(f, "Deployed"),
            Self::InProgress => write!(f, "InProgress"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Distribution summary; the full configuration stays provider-typed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionRecord {
    pub id: String,
    pub arn: String,
    /// Public hostname assigned by the CDN (e.g. `d111.cloudfront.net`)
    pub domain_name: String,
    pub aliases: Vec<String>,
    pub status: DistributionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginAccessControl {
    pub id: String,
    pub name: String,
    pub etag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedZone {
    pub id: String,
    /// Zone name as returned by the provider, usually with a trailing dot
    pub name: String,
}

impl HostedZone {
    pub fn bare_name(&self) -> &str {
        self.name.trim_end_matches('.')
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasTarget {
    pub hosted_zone_id: String,
    pub dns_name: String,
    pub evaluate_target_health: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    pub name: String,
    pub record_type: String,
    pub ttl: Option<i64>,
    pub values: Vec<String>,
    pub alias: Option<AliasTarget>,
}

impl RecordSet {
    pub fn alias(name: impl Into<String>, record_type: &str, target: AliasTarget) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.to_string(),
            ttl: None,
            values: Vec::new(),
            alias: Some(target),
        }
    }

    pub fn simple(name: impl Into<String>, record_type: &str, ttl: i64, value: String) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.to_string(),
            ttl: Some(ttl),
            values: vec![value],
            alias: None,
        }
    }
}

/// Edge function stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionStage {
    Development,
    Live,
}

impl FunctionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "DEVELOPMENT",
            Self::Live => "LIVE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeFunction {
    pub name: String,
    pub arn: String,
    pub stage: FunctionStage,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
}

/// Viewer event an edge function is attached to.
///
/// Declaration order is the order associations are written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EdgeEventType {
    ViewerRequest,
    ViewerResponse,
}

impl EdgeEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewerRequest => "viewer-request",
            Self::ViewerResponse => "viewer-response",
        }
    }
}

impl fmt::Display for EdgeEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invalidation {
    pub id: String,
    pub status: String,
}

impl Invalidation {
    pub fn is_completed(&self) -> bool {
        self.status == "Completed"
    }
}

/// How the bucket is exposed to the CDN. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BucketAccessMode {
    /// Public-read bucket served through its static website endpoint
    PublicWebsite,
    /// Locked bucket reachable only by the distribution through an OAC
    PrivateOac,
}
