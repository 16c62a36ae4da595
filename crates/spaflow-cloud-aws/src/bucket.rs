//! S3 bucket lifecycle and access mode
//!
//! The bucket is named after the domain. It is either a public website
//! origin or a locked bucket only the distribution may read.

use crate::context::Context;
use crate::sdk::invalid_request;
use aws_sdk_s3::types::{
    ExpirationStatus, LifecycleExpiration, LifecycleRule, LifecycleRuleFilter,
};
use serde_json::json;
use spaflow_cloud::asset::INDEX_DOCUMENT;
use spaflow_cloud::model::Tag;
use spaflow_cloud::{CloudError, Result};

pub const EXPIRE_OLD_BRANCHES_RULE: &str = "expire-old-branches";

pub struct BucketReconciler<'a> {
    ctx: &'a Context,
}

impl<'a> BucketReconciler<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    pub async fn exists(&self, bucket: &str) -> Result<bool> {
        tracing::info!("[S3] 🔍 looking for bucket \"{}\"...", bucket);
        match self.ctx.storage.head_bucket(bucket).await {
            Ok(()) => {
                tracing::info!("[S3] 🔍 bucket \"{}\" found", bucket);
                Ok(true)
            }
            Err(e) if e.is_not_found() => {
                tracing::info!("[S3] 😬 bucket \"{}\" not found", bucket);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Create the bucket in the configured region and tag it.
    pub async fn create(&self, bucket: &str) -> Result<()> {
        tracing::info!("[S3] ✏️ creating \"{}\" bucket...", bucket);
        match self
            .ctx
            .storage
            .create_bucket(bucket, &self.ctx.settings.bucket_region)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_conflict() => {
                return Err(CloudError::precondition(format!(
                    "[S3] bucket \"{bucket}\" already exists in an unsupported region or account; delete it first"
                )));
            }
            Err(e) => return Err(e),
        }
        self.tag(bucket, Vec::new()).await
    }

    /// Check the bucket carries the identifying tag. A bucket without it is
    /// only taken over when the operator agrees; the tag is then applied.
    pub async fn confirm_management(&self, bucket: &str) -> Result<()> {
        let tag = self.ctx.settings.identifying_tag();
        tracing::info!(
            "[S3] 🔍 checking that tag \"{}:{}\" exists on bucket \"{}\"...",
            tag.key,
            tag.value,
            bucket
        );

        let tags = match self.ctx.storage.get_bucket_tags(bucket).await {
            Ok(tags) => tags,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e),
        };
        if self.ctx.settings.has_identifying_tag(&tags) {
            tracing::info!("[S3] 👍 tag \"{}:{}\" found", tag.key, tag.value);
            return Ok(());
        }

        let question = format!(
            "[S3] Bucket \"{bucket}\" is not yet managed by spaflow. Would you like it to be modified (public access & website config) & managed by spaflow?"
        );
        if !self.ctx.confirm.confirm(&question, false)? {
            return Err(CloudError::UserDeclined(
                "You can use another domain name or delete the S3 bucket...".to_string(),
            ));
        }
        self.tag(bucket, tags).await
    }

    /// Apply the identifying tag on top of `existing`.
    async fn tag(&self, bucket: &str, existing: Vec<Tag>) -> Result<()> {
        let tag = self.ctx.settings.identifying_tag();
        tracing::info!(
            "[S3] ✏️ tagging \"{}\" bucket with \"{}:{}\"...",
            bucket,
            tag.key,
            tag.value
        );
        let mut tags: Vec<Tag> = existing.into_iter().filter(|t| t.key != tag.key).collect();
        tags.push(tag);
        self.ctx.storage.put_bucket_tags(bucket, tags).await
    }

    /// Serve the bucket as a public static website. Returns whether anything
    /// was written.
    pub async fn set_public_website(&self, bucket: &str) -> Result<bool> {
        let current = self.access_state(bucket).await?;
        let policy = public_read_policy(bucket);
        if !current.public_access_blocked
            && current.website_index.as_deref() == Some(INDEX_DOCUMENT)
            && same_policy(current.policy.as_deref(), &policy)
        {
            tracing::info!("[S3] 👍 bucket \"{}\" is already a public website", bucket);
            return Ok(false);
        }

        tracing::info!("[S3] ✅ allow public access for bucket \"{}\"...", bucket);
        self.ctx.storage.delete_public_access_block(bucket).await?;

        tracing::info!(
            "[S3] ✏️ set bucket website with index and error document \"{}\" on \"{}\"...",
            INDEX_DOCUMENT,
            bucket
        );
        self.ctx
            .storage
            .put_website(bucket, INDEX_DOCUMENT, INDEX_DOCUMENT)
            .await?;

        tracing::info!("[S3] ✏️ allow public read to \"{}\"...", bucket);
        self.ctx.storage.put_policy(bucket, policy).await?;
        Ok(true)
    }

    /// Lock the bucket so only `distribution_arn` may read it. Returns
    /// whether anything was written.
    pub async fn set_private(&self, bucket: &str, distribution_arn: &str) -> Result<bool> {
        let current = self.access_state(bucket).await?;
        let policy = distribution_read_policy(bucket, distribution_arn);
        if current.public_access_blocked
            && current.website_index.is_none()
            && same_policy(current.policy.as_deref(), &policy)
        {
            tracing::info!(
                "[S3] 👍 bucket \"{}\" is already readable by {} only",
                bucket,
                distribution_arn
            );
            return Ok(false);
        }

        tracing::info!(
            "[S3] 🔏 ensure bucket \"{}\" is not a static website",
            bucket
        );
        self.ctx.storage.delete_website(bucket).await?;

        tracing::info!("[S3] 🔏 block public access for bucket \"{}\"...", bucket);
        self.ctx.storage.put_public_access_block(bucket).await?;

        tracing::info!(
            "[S3] 🔏 allow distribution {} to read from \"{}\"...",
            distribution_arn,
            bucket
        );
        self.ctx.storage.put_policy(bucket, policy).await?;
        Ok(true)
    }

    async fn access_state(&self, bucket: &str) -> Result<AccessState> {
        let storage = &self.ctx.storage;
        Ok(AccessState {
            website_index: optional(storage.get_website_index(bucket).await)?,
            policy: optional(storage.get_policy(bucket).await)?,
            public_access_blocked: optional(storage.get_public_access_block(bucket).await)?
                .unwrap_or(false),
        })
    }

    /// Expire objects after `days`, keeping every other lifecycle rule.
    /// Returns whether the configuration was written.
    pub async fn upsert_lifecycle(&self, bucket: &str, days: i32) -> Result<bool> {
        let rules = match self.ctx.storage.get_lifecycle_rules(bucket).await {
            Ok(rules) => rules,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e),
        };

        let up_to_date = rules.iter().any(|rule| {
            rule.id() == Some(EXPIRE_OLD_BRANCHES_RULE)
                && rule.expiration().and_then(|e| e.days()) == Some(days)
        });
        if up_to_date {
            tracing::info!(
                "[S3] 👍 lifecycle rule \"{}\" already set on \"{}\"",
                EXPIRE_OLD_BRANCHES_RULE,
                bucket
            );
            return Ok(false);
        }

        let mut updated: Vec<LifecycleRule> = rules
            .into_iter()
            .filter(|rule| rule.id() != Some(EXPIRE_OLD_BRANCHES_RULE))
            .map(|mut rule| {
                // the API rejects rules without a filter on write
                if rule.filter.is_none() {
                    rule.filter = Some(empty_prefix());
                }
                rule
            })
            .collect();

        updated.push(
            LifecycleRule::builder()
                .id(EXPIRE_OLD_BRANCHES_RULE)
                .status(ExpirationStatus::Enabled)
                .filter(empty_prefix())
                .expiration(LifecycleExpiration::builder().days(days).build())
                .build()
                .map_err(invalid_request)?,
        );

        self.ctx.storage.put_lifecycle_rules(bucket, updated).await?;
        tracing::info!(
            "[S3] ✅ lifecycle rule \"{}\" set on \"{}\" ({} days)",
            EXPIRE_OLD_BRANCHES_RULE,
            bucket,
            days
        );
        Ok(true)
    }
}

fn empty_prefix() -> LifecycleRuleFilter {
    LifecycleRuleFilter::builder().prefix("").build()
}

/// What decides how the bucket is exposed
struct AccessState {
    website_index: Option<String>,
    policy: Option<String>,
    public_access_blocked: bool,
}

fn optional<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Compared as JSON, the provider may reformat stored policies.
fn same_policy(current: Option<&str>, desired: &str) -> bool {
    let Some(current) = current else {
        return false;
    };
    match (
        serde_json::from_str::<serde_json::Value>(current),
        serde_json::from_str::<serde_json::Value>(desired),
    ) {
        (Ok(current), Ok(desired)) => current == desired,
        _ => false,
    }
}

fn public_read_policy(bucket: &str) -> String {
    json!({
        "Statement": [{
            "Sid": "AllowPublicRead",
            "Effect": "Allow",
            "Principal": { "AWS": "*" },
            "Action": "s3:GetObject",
            "Resource": format!("arn:aws:s3:::{bucket}/*"),
        }]
    })
    .to_string()
}

fn distribution_read_policy(bucket: &str, distribution_arn: &str) -> String {
    json!({
        "Statement": [{
            "Sid": "AllowCloudFrontServicePrincipal",
            "Effect": "Allow",
            "Principal": { "Service": "cloudfront.amazonaws.com" },
            "Action": "s3:GetObject",
            "Resource": format!("arn:aws:s3:::{bucket}/*"),
            "Condition": {
                "StringEquals": { "AWS:SourceArn": distribution_arn }
            },
        }]
    })
    .to_string()
}
