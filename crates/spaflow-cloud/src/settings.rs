//! Deployer settings
//!
//! Defaults suit the common case. They can be overridden with an optional
//! `spaflow.{toml,yaml,json}` file in the working directory and then with
//! `SPAFLOW_*` environment variables (e.g. `SPAFLOW_BUCKET_REGION=eu-west-1`).

use crate::error::Result;
use crate::model::Tag;
use crate::waiter::{RetryConfig, WaitPolicy};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENV_PREFIX: &str = "SPAFLOW";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Region new buckets are created in
    pub bucket_region: String,
    /// Region certificates are requested in. CloudFront only accepts us-east-1.
    pub certificate_region: String,

    pub identifying_tag_key: String,
    pub identifying_tag_value: String,

    /// Hosted zone id used by every CloudFront alias record
    pub cloudfront_hosted_zone_id: String,

    pub poll_interval_secs: u64,
    pub certificate_timeout_secs: u64,
    pub distribution_timeout_secs: u64,
    pub invalidation_timeout_secs: u64,
    /// Pause between requesting a certificate and reading its validation record
    pub certificate_settle_delay_secs: u64,
    pub invalidation_attempts: u32,

    /// Suffix of the SPA redirect function's name. Changing it deploys a new
    /// function instead of editing the one existing distributions use.
    pub redirect_function_color: String,

    /// TTL of DNS validation records
    pub validation_record_ttl: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bucket_region: "eu-west-3".to_string(),
            certificate_region: "us-east-1".to_string(),
            identifying_tag_key: "managed-by-spaflow".to_string(),
            identifying_tag_value: "v1".to_string(),
            cloudfront_hosted_zone_id: "Z2FDTNDATAQYW2".to_string(),
            poll_interval_secs: 10,
            certificate_timeout_secs: 600,
            distribution_timeout_secs: 1500,
            invalidation_timeout_secs: 600,
            certificate_settle_delay_secs: 5,
            invalidation_attempts: 5,
            redirect_function_color: "yellow".to_string(),
            validation_record_ttl: 3600,
        }
    }
}

impl Settings {
    /// Load settings from `<dir>/spaflow.*` (optional) and the environment.
    pub fn load(dir: &Path) -> Result<Self> {
        let base = dir.join("spaflow");
        let settings = Config::builder()
            .add_source(File::with_name(&base.to_string_lossy()).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        tracing::debug!("settings loaded: {:?}", settings);
        Ok(settings)
    }

    pub fn identifying_tag(&self) -> Tag {
        Tag::new(&self.identifying_tag_key, &self.identifying_tag_value)
    }

    pub fn has_identifying_tag(&self, tags: &[Tag]) -> bool {
        tags.iter()
            .any(|t| t.key == self.identifying_tag_key && t.value == self.identifying_tag_value)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn certificate_wait(&self) -> WaitPolicy {
        WaitPolicy::new(
            self.poll_interval(),
            Duration::from_secs(self.certificate_timeout_secs),
        )
    }

    pub fn distribution_wait(&self) -> WaitPolicy {
        WaitPolicy::new(
            self.poll_interval(),
            Duration::from_secs(self.distribution_timeout_secs),
        )
    }

    pub fn invalidation_wait(&self) -> WaitPolicy {
        WaitPolicy::new(
            self.poll_interval(),
            Duration::from_secs(self.invalidation_timeout_secs),
        )
    }

    pub fn certificate_settle_delay(&self) -> Duration {
        Duration::from_secs(self.certificate_settle_delay_secs)
    }

    pub fn invalidation_retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.invalidation_attempts,
            delay: Duration::ZERO,
        }
    }
}
