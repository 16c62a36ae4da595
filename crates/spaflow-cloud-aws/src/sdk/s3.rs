use super::{classify, invalid_request};
use crate::client::StorageApi;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLifecycleConfiguration, BucketLocationConstraint, CreateBucketConfiguration,
    ErrorDocument, IndexDocument, LifecycleRule, PublicAccessBlockConfiguration, Tagging,
    WebsiteConfiguration,
};
use spaflow_cloud::model::Tag;
use spaflow_cloud::{CloudError, Result};
use std::path::Path;

const SERVICE: &str = "S3";

fn bucket(name: &str) -> String {
    format!("bucket {name}")
}

#[async_trait]
impl StorageApi for Client {
    async fn head_bucket(&self, name: &str) -> Result<()> {
        self.head_bucket()
            .bucket(name)
            .send()
            .await
            .map_err(|e| classify(SERVICE, bucket(name), e))?;
        Ok(())
    }

    async fn create_bucket(&self, name: &str, region: &str) -> Result<()> {
        // us-east-1 rejects an explicit location constraint
        let configuration = (region != "us-east-1").then(|| {
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region))
                .build()
        });

        self.create_bucket()
            .bucket(name)
            .set_create_bucket_configuration(configuration)
            .send()
            .await
            .map_err(|e| classify(SERVICE, bucket(name), e))?;
        Ok(())
    }

    async fn get_bucket_tags(&self, name: &str) -> Result<Vec<Tag>> {
        let output = self
            .get_bucket_tagging()
            .bucket(name)
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("tag set of {name}"), e))?;

        Ok(output
            .tag_set()
            .iter()
            .map(|t| Tag::new(t.key(), t.value()))
            .collect())
    }

    async fn put_bucket_tags(&self, name: &str, tags: Vec<Tag>) -> Result<()> {
        let tag_set = tags
            .into_iter()
            .map(|t| {
                aws_sdk_s3::types::Tag::builder()
                    .key(t.key)
                    .value(t.value)
                    .build()
                    .map_err(invalid_request)
            })
            .collect::<Result<Vec<_>>>()?;
        let tagging = Tagging::builder()
            .set_tag_set(Some(tag_set))
            .build()
            .map_err(invalid_request)?;

        self.put_bucket_tagging()
            .bucket(name)
            .tagging(tagging)
            .send()
            .await
            .map_err(|e| classify(SERVICE, bucket(name), e))?;
        Ok(())
    }

    async fn get_website_index(&self, name: &str) -> Result<String> {
        let output = self
            .get_bucket_website()
            .bucket(name)
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("website of {name}"), e))?;

        Ok(output
            .index_document()
            .map(|doc| doc.suffix().to_string())
            .unwrap_or_default())
    }

    async fn put_website(
        &self,
        name: &str,
        index_document: &str,
        error_document: &str,
    ) -> Result<()> {
        let website = WebsiteConfiguration::builder()
            .index_document(
                IndexDocument::builder()
                    .suffix(index_document)
                    .build()
                    .map_err(invalid_request)?,
            )
            .error_document(
                ErrorDocument::builder()
                    .key(error_document)
                    .build()
                    .map_err(invalid_request)?,
            )
            .build();

        self.put_bucket_website()
            .bucket(name)
            .website_configuration(website)
            .send()
            .await
            .map_err(|e| classify(SERVICE, bucket(name), e))?;
        Ok(())
    }

    async fn delete_website(&self, name: &str) -> Result<()> {
        self.delete_bucket_website()
            .bucket(name)
            .send()
            .await
            .map_err(|e| classify(SERVICE, bucket(name), e))?;
        Ok(())
    }

    async fn get_policy(&self, name: &str) -> Result<String> {
        let output = self
            .get_bucket_policy()
            .bucket(name)
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("policy of {name}"), e))?;

        output
            .policy()
            .map(str::to_string)
            .ok_or_else(|| CloudError::NotFound {
                service: SERVICE,
                resource: format!("policy of {name}"),
            })
    }

    async fn put_policy(&self, name: &str, policy: String) -> Result<()> {
        self.put_bucket_policy()
            .bucket(name)
            .policy(policy)
            .send()
            .await
            .map_err(|e| classify(SERVICE, bucket(name), e))?;
        Ok(())
    }

    async fn get_public_access_block(&self, name: &str) -> Result<bool> {
        let output = self
            .get_public_access_block()
            .bucket(name)
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("public access block of {name}"), e))?;

        Ok(output
            .public_access_block_configuration()
            .is_some_and(|c| {
                c.block_public_acls() == Some(true)
                    && c.ignore_public_acls() == Some(true)
                    && c.block_public_policy() == Some(true)
                    && c.restrict_public_buckets() == Some(true)
            }))
    }

    async fn put_public_access_block(&self, name: &str) -> Result<()> {
        let configuration = PublicAccessBlockConfiguration::builder()
            .block_public_acls(true)
            .ignore_public_acls(true)
            .block_public_policy(true)
            .restrict_public_buckets(true)
            .build();

        self.put_public_access_block()
            .bucket(name)
            .public_access_block_configuration(configuration)
            .send()
            .await
            .map_err(|e| classify(SERVICE, bucket(name), e))?;
        Ok(())
    }

    async fn delete_public_access_block(&self, name: &str) -> Result<()> {
        self.delete_public_access_block()
            .bucket(name)
            .send()
            .await
            .map_err(|e| classify(SERVICE, bucket(name), e))?;
        Ok(())
    }

    async fn get_lifecycle_rules(&self, name: &str) -> Result<Vec<LifecycleRule>> {
        let output = self
            .get_bucket_lifecycle_configuration()
            .bucket(name)
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("lifecycle configuration of {name}"), e))?;

        Ok(output.rules().to_vec())
    }

    async fn put_lifecycle_rules(&self, name: &str, rules: Vec<LifecycleRule>) -> Result<()> {
        let configuration = BucketLifecycleConfiguration::builder()
            .set_rules(Some(rules))
            .build()
            .map_err(invalid_request)?;

        self.put_bucket_lifecycle_configuration()
            .bucket(name)
            .lifecycle_configuration(configuration)
            .send()
            .await
            .map_err(|e| classify(SERVICE, bucket(name), e))?;
        Ok(())
    }

    async fn put_object(
        &self,
        name: &str,
        key: &str,
        path: &Path,
        content_type: String,
        cache_control: Option<String>,
    ) -> Result<()> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| CloudError::Io(std::io::Error::other(e)))?;

        self.put_object()
            .bucket(name)
            .key(key)
            .body(body)
            .content_type(content_type)
            .set_cache_control(cache_control)
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("object {key}"), e))?;
        Ok(())
    }
}
