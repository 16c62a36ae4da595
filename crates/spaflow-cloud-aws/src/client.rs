//! Service seams
//!
//! Each trait is the narrow slice of one AWS API the reconcilers need. The
//! `sdk` module implements them for the real SDK clients; tests use the
//! generated mocks.

use async_trait::async_trait;
use aws_sdk_cloudfront::types::DistributionConfig;
use aws_sdk_s3::types::LifecycleRule;
use spaflow_cloud::Result;
use spaflow_cloud::model::{
    CertificateRecord, DistributionRecord, EdgeFunction, FunctionStage, HostedZone,
    Invalidation, OriginAccessControl, RecordSet, Tag,
};
use spaflow_cloud::paginate::Page;
use std::path::Path;

#[cfg(test)]
use mockall::automock;

/// ACM
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CertificateApi: Send + Sync {
    /// One page of certificate ARNs
    async fn list_certificates(&self, next_token: Option<String>) -> Result<Page<String>>;

    async fn describe_certificate(&self, arn: &str) -> Result<CertificateRecord>;

    /// Request a DNS-validated certificate. `None` when the provider returned
    /// no ARN.
    async fn request_certificate(&self, domain: &str) -> Result<Option<String>>;
}

/// Distribution configuration together with the ETag it was read at
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VersionedConfig {
    pub config: Option<DistributionConfig>,
    pub etag: Option<String>,
}

/// CloudFront distributions, tags and invalidations
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DistributionApi: Send + Sync {
    async fn list_distributions(&self, marker: Option<String>) -> Result<Page<DistributionRecord>>;

    async fn get_distribution(&self, id: &str) -> Result<DistributionRecord>;

    async fn create_distribution(
        &self,
        config: DistributionConfig,
    ) -> Result<Option<DistributionRecord>>;

    async fn get_distribution_config(&self, id: &str) -> Result<VersionedConfig>;

    async fn update_distribution(
        &self,
        id: &str,
        etag: &str,
        config: DistributionConfig,
    ) -> Result<()>;

    async fn list_tags(&self, arn: &str) -> Result<Vec<Tag>>;

    async fn tag_resource(&self, arn: &str, tags: Vec<Tag>) -> Result<()>;

    async fn create_invalidation(
        &self,
        distribution_id: &str,
        paths: Vec<String>,
        caller_reference: &str,
    ) -> Result<Invalidation>;

    async fn get_invalidation(
        &self,
        distribution_id: &str,
        invalidation_id: &str,
    ) -> Result<Invalidation>;
}

/// CloudFront Functions
#[cfg_attr(test, automock)]
#[async_trait]
pub trait FunctionApi: Send + Sync {
    async fn list_functions(&self, marker: Option<String>) -> Result<Page<EdgeFunction>>;

    /// Errors with `NotFound` when no function has that name in that stage.
    async fn describe_function(&self, name: &str, stage: FunctionStage) -> Result<EdgeFunction>;

    async fn get_function_code(&self, name: &str, stage: FunctionStage) -> Result<String>;

    /// Creates the function in the DEVELOPMENT stage.
    async fn create_function(&self, name: &str, comment: &str, code: &str)
    -> Result<EdgeFunction>;

    /// Returns the new ETag.
    async fn update_function(
        &self,
        name: &str,
        etag: &str,
        comment: &str,
        code: &str,
    ) -> Result<String>;

    async fn publish_function(&self, name: &str, etag: &str) -> Result<EdgeFunction>;
}

/// CloudFront origin access controls
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OriginAccessApi: Send + Sync {
    async fn list_origin_access_controls(
        &self,
        marker: Option<String>,
    ) -> Result<Page<OriginAccessControl>>;

    /// Fetch with ETag
    async fn get_origin_access_control(&self, id: &str) -> Result<OriginAccessControl>;

    async fn create_origin_access_control(
        &self,
        name: &str,
        description: &str,
    ) -> Result<OriginAccessControl>;

    async fn delete_origin_access_control(&self, id: &str, etag: &str) -> Result<()>;
}

/// Route 53
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DnsApi: Send + Sync {
    async fn list_hosted_zones(&self, marker: Option<String>) -> Result<Page<HostedZone>>;

    async fn create_hosted_zone(
        &self,
        name: &str,
        caller_reference: &str,
    ) -> Result<Option<HostedZone>>;

    /// Record sets in lexicographic order starting at `start_name`
    async fn list_record_sets(&self, zone_id: &str, start_name: &str) -> Result<Vec<RecordSet>>;

    async fn upsert_record(&self, zone_id: &str, record: RecordSet) -> Result<()>;
}

/// S3
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StorageApi: Send + Sync {
    /// `NotFound` when the bucket does not exist
    async fn head_bucket(&self, bucket: &str) -> Result<()>;

    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<()>;

    /// `NotFound` when the bucket has no tag set
    async fn get_bucket_tags(&self, bucket: &str) -> Result<Vec<Tag>>;

    async fn put_bucket_tags(&self, bucket: &str, tags: Vec<Tag>) -> Result<()>;

    /// Index document suffix; `NotFound` when the bucket is not a website
    async fn get_website_index(&self, bucket: &str) -> Result<String>;

    async fn put_website(&self, bucket: &str, index_document: &str, error_document: &str)
    -> Result<()>;

    async fn delete_website(&self, bucket: &str) -> Result<()>;

    /// `NotFound` when the bucket has no policy
    async fn get_policy(&self, bucket: &str) -> Result<String>;

    async fn put_policy(&self, bucket: &str, policy: String) -> Result<()>;

    /// Whether every kind of public access is blocked. `NotFound` when the
    /// bucket has no public access block.
    async fn get_public_access_block(&self, bucket: &str) -> Result<bool>;

    /// Blocks every kind of public access
    async fn put_public_access_block(&self, bucket: &str) -> Result<()>;

    async fn delete_public_access_block(&self, bucket: &str) -> Result<()>;

    /// `NotFound` when the bucket has no lifecycle configuration
    async fn get_lifecycle_rules(&self, bucket: &str) -> Result<Vec<LifecycleRule>>;

    async fn put_lifecycle_rules(&self, bucket: &str, rules: Vec<LifecycleRule>) -> Result<()>;

    /// Streams the file at `path` as the object body
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: String,
        cache_control: Option<String>,
    ) -> Result<()>;
}
