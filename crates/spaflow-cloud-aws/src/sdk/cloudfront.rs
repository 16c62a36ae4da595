use super::{classify, invalid_request, to_chrono};
use crate::client::{DistributionApi, FunctionApi, OriginAccessApi, VersionedConfig};
use async_trait::async_trait;
use aws_sdk_cloudfront::Client;
use aws_sdk_cloudfront::primitives::Blob;
use aws_sdk_cloudfront::types::{
    Distribution, DistributionConfig, DistributionSummary, FunctionConfig, FunctionRuntime,
    FunctionSummary, InvalidationBatch, OriginAccessControlConfig,
    OriginAccessControlOriginTypes, OriginAccessControlSigningBehaviors,
    OriginAccessControlSigningProtocols, Paths, Tags,
};
use spaflow_cloud::model::{
    DistributionRecord, DistributionStatus, EdgeFunction, FunctionStage, Invalidation,
    OriginAccessControl, Tag,
};
use spaflow_cloud::{CloudError, Page, Result};

const SERVICE: &str = "CloudFront";
const FUNCTION_RUNTIME: &str = "cloudfront-js-2.0";

fn from_summary(summary: &DistributionSummary) -> DistributionRecord {
    DistributionRecord {
        id: summary.id().to_string(),
        arn: summary.arn().to_string(),
        domain_name: summary.domain_name().to_string(),
        aliases: summary
            .aliases()
            .map(|a| a.items().to_vec())
            .unwrap_or_default(),
        status: DistributionStatus::parse(summary.status()),
    }
}

fn from_distribution(distribution: &Distribution) -> DistributionRecord {
    DistributionRecord {
        id: distribution.id().to_string(),
        arn: distribution.arn().to_string(),
        domain_name: distribution.domain_name().to_string(),
        aliases: distribution
            .distribution_config()
            .and_then(|c| c.aliases())
            .map(|a| a.items().to_vec())
            .unwrap_or_default(),
        status: DistributionStatus::parse(distribution.status()),
    }
}

fn sdk_stage(stage: FunctionStage) -> aws_sdk_cloudfront::types::FunctionStage {
    aws_sdk_cloudfront::types::FunctionStage::from(stage.as_str())
}

fn from_function(summary: &FunctionSummary, etag: Option<&str>) -> EdgeFunction {
    let metadata = summary.function_metadata();
    let stage = match metadata.and_then(|m| m.stage()).map(|s| s.as_str()) {
        Some("LIVE") => FunctionStage::Live,
        _ => FunctionStage::Development,
    };
    EdgeFunction {
        name: summary.name().to_string(),
        arn: metadata
            .map(|m| m.function_arn().to_string())
            .unwrap_or_default(),
        stage,
        last_modified: metadata.and_then(|m| to_chrono(m.last_modified_time())),
        etag: etag.map(str::to_string),
    }
}

fn function_config(comment: &str) -> Result<FunctionConfig> {
    FunctionConfig::builder()
        .comment(comment)
        .runtime(FunctionRuntime::from(FUNCTION_RUNTIME))
        .build()
        .map_err(invalid_request)
}

fn missing(what: &str) -> CloudError {
    CloudError::precondition(format!("[{SERVICE}] response did not include {what}"))
}

#[async_trait]
impl DistributionApi for Client {
    async fn list_distributions(&self, marker: Option<String>) -> Result<Page<DistributionRecord>> {
        let output = self
            .list_distributions()
            .set_marker(marker)
            .send()
            .await
            .map_err(|e| classify(SERVICE, "distributions", e))?;

        let Some(list) = output.distribution_list() else {
            return Ok(Page::last(Vec::new()));
        };
        Ok(Page::new(
            list.items().iter().map(from_summary).collect(),
            list.next_marker().map(str::to_string),
        ))
    }

    async fn get_distribution(&self, id: &str) -> Result<DistributionRecord> {
        let output = self
            .get_distribution()
            .id(id)
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("distribution {id}"), e))?;

        output
            .distribution()
            .map(from_distribution)
            .ok_or_else(|| CloudError::NotFound {
                service: SERVICE,
                resource: format!("distribution {id}"),
            })
    }

    async fn create_distribution(
        &self,
        config: DistributionConfig,
    ) -> Result<Option<DistributionRecord>> {
        let output = self
            .create_distribution()
            .distribution_config(config)
            .send()
            .await
            .map_err(|e| classify(SERVICE, "distribution", e))?;

        Ok(output.distribution().map(from_distribution))
    }

    async fn get_distribution_config(&self, id: &str) -> Result<VersionedConfig> {
        let output = self
            .get_distribution_config()
            .id(id)
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("distribution {id}"), e))?;

        Ok(VersionedConfig {
            config: output.distribution_config().cloned(),
            etag: output.e_tag().map(str::to_string),
        })
    }

    async fn update_distribution(
        &self,
        id: &str,
        etag: &str,
        config: DistributionConfig,
    ) -> Result<()> {
        self.update_distribution()
            .id(id)
            .if_match(etag)
            .distribution_config(config)
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("distribution {id}"), e))?;
        Ok(())
    }

    async fn list_tags(&self, arn: &str) -> Result<Vec<Tag>> {
        let output = self
            .list_tags_for_resource()
            .resource(arn)
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("tags of {arn}"), e))?;

        Ok(output
            .tags()
            .map(|tags| {
                tags.items()
                    .iter()
                    .map(|t| Tag::new(t.key(), t.value().unwrap_or_default()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn tag_resource(&self, arn: &str, tags: Vec<Tag>) -> Result<()> {
        let items = tags
            .into_iter()
            .map(|t| {
                aws_sdk_cloudfront::types::Tag::builder()
                    .key(t.key)
                    .value(t.value)
                    .build()
                    .map_err(invalid_request)
            })
            .collect::<Result<Vec<_>>>()?;

        self.tag_resource()
            .resource(arn)
            .tags(Tags::builder().set_items(Some(items)).build())
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("tags of {arn}"), e))?;
        Ok(())
    }

    async fn create_invalidation(
        &self,
        distribution_id: &str,
        paths: Vec<String>,
        caller_reference: &str,
    ) -> Result<Invalidation> {
        let paths = Paths::builder()
            .quantity(paths.len() as i32)
            .set_items(Some(paths))
            .build()
            .map_err(invalid_request)?;
        let batch = InvalidationBatch::builder()
            .paths(paths)
            .caller_reference(caller_reference)
            .build()
            .map_err(invalid_request)?;

        let output = self
            .create_invalidation()
            .distribution_id(distribution_id)
            .invalidation_batch(batch)
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("distribution {distribution_id}"), e))?;

        let invalidation = output
            .invalidation()
            .ok_or_else(|| missing("an invalidation"))?;
        Ok(Invalidation {
            id: invalidation.id().to_string(),
            status: invalidation.status().to_string(),
        })
    }

    async fn get_invalidation(
        &self,
        distribution_id: &str,
        invalidation_id: &str,
    ) -> Result<Invalidation> {
        let output = self
            .get_invalidation()
            .distribution_id(distribution_id)
            .id(invalidation_id)
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("invalidation {invalidation_id}"), e))?;

        let invalidation = output
            .invalidation()
            .ok_or_else(|| missing("an invalidation"))?;
        Ok(Invalidation {
            id: invalidation.id().to_string(),
            status: invalidation.status().to_string(),
        })
    }
}

#[async_trait]
impl FunctionApi for Client {
    async fn list_functions(&self, marker: Option<String>) -> Result<Page<EdgeFunction>> {
        let output = self
            .list_functions()
            .set_marker(marker)
            .send()
            .await
            .map_err(|e| classify(SERVICE, "functions", e))?;

        let Some(list) = output.function_list() else {
            return Ok(Page::last(Vec::new()));
        };
        Ok(Page::new(
            list.items().iter().map(|f| from_function(f, None)).collect(),
            list.next_marker().map(str::to_string),
        ))
    }

    async fn describe_function(&self, name: &str, stage: FunctionStage) -> Result<EdgeFunction> {
        let output = self
            .describe_function()
            .name(name)
            .stage(sdk_stage(stage))
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("function {name}"), e))?;

        output
            .function_summary()
            .map(|f| from_function(f, output.e_tag()))
            .ok_or_else(|| CloudError::NotFound {
                service: SERVICE,
                resource: format!("function {name}"),
            })
    }

    async fn get_function_code(&self, name: &str, stage: FunctionStage) -> Result<String> {
        let output = self
            .get_function()
            .name(name)
            .stage(sdk_stage(stage))
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("function {name}"), e))?;

        Ok(output
            .function_code()
            .map(|code| String::from_utf8_lossy(code.as_ref()).into_owned())
            .unwrap_or_default())
    }

    async fn create_function(
        &self,
        name: &str,
        comment: &str,
        code: &str,
    ) -> Result<EdgeFunction> {
        let output = self
            .create_function()
            .name(name)
            .function_config(function_config(comment)?)
            .function_code(Blob::new(code.as_bytes().to_vec()))
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("function {name}"), e))?;

        output
            .function_summary()
            .map(|f| from_function(f, output.e_tag()))
            .ok_or_else(|| missing("a function summary"))
    }

    async fn update_function(
        &self,
        name: &str,
        etag: &str,
        comment: &str,
        code: &str,
    ) -> Result<String> {
        let output = self
            .update_function()
            .name(name)
            .if_match(etag)
            .function_config(function_config(comment)?)
            .function_code(Blob::new(code.as_bytes().to_vec()))
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("function {name}"), e))?;

        output
            .e_tag()
            .map(str::to_string)
            .ok_or_else(|| missing("an ETag"))
    }

    async fn publish_function(&self, name: &str, etag: &str) -> Result<EdgeFunction> {
        let output = self
            .publish_function()
            .name(name)
            .if_match(etag)
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("function {name}"), e))?;

        output
            .function_summary()
            .map(|f| from_function(f, None))
            .ok_or_else(|| missing("a function summary"))
    }
}

#[async_trait]
impl OriginAccessApi for Client {
    async fn list_origin_access_controls(
        &self,
        marker: Option<String>,
    ) -> Result<Page<OriginAccessControl>> {
        let output = self
            .list_origin_access_controls()
            .set_marker(marker)
            .send()
            .await
            .map_err(|e| classify(SERVICE, "origin access controls", e))?;

        let Some(list) = output.origin_access_control_list() else {
            return Ok(Page::last(Vec::new()));
        };
        Ok(Page::new(
            list.items()
                .iter()
                .map(|oac| OriginAccessControl {
                    id: oac.id().to_string(),
                    name: oac.name().to_string(),
                    etag: None,
                })
                .collect(),
            list.next_marker().map(str::to_string),
        ))
    }

    async fn get_origin_access_control(&self, id: &str) -> Result<OriginAccessControl> {
        let output = self
            .get_origin_access_control()
            .id(id)
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("origin access control {id}"), e))?;

        let oac = output
            .origin_access_control()
            .ok_or_else(|| CloudError::NotFound {
                service: SERVICE,
                resource: format!("origin access control {id}"),
            })?;
        Ok(OriginAccessControl {
            id: oac.id().to_string(),
            name: oac
                .origin_access_control_config()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            etag: output.e_tag().map(str::to_string),
        })
    }

    async fn create_origin_access_control(
        &self,
        name: &str,
        description: &str,
    ) -> Result<OriginAccessControl> {
        let config = OriginAccessControlConfig::builder()
            .name(name)
            .description(description)
            .origin_access_control_origin_type(OriginAccessControlOriginTypes::from("s3"))
            .signing_behavior(OriginAccessControlSigningBehaviors::from("always"))
            .signing_protocol(OriginAccessControlSigningProtocols::from("sigv4"))
            .build()
            .map_err(invalid_request)?;

        let output = self
            .create_origin_access_control()
            .origin_access_control_config(config)
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("origin access control {name}"), e))?;

        let oac = output
            .origin_access_control()
            .ok_or_else(|| missing("an origin access control"))?;
        Ok(OriginAccessControl {
            id: oac.id().to_string(),
            name: name.to_string(),
            etag: output.e_tag().map(str::to_string),
        })
    }

    async fn delete_origin_access_control(&self, id: &str, etag: &str) -> Result<()> {
        self.delete_origin_access_control()
            .id(id)
            .if_match(etag)
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("origin access control {id}"), e))?;
        Ok(())
    }
}
