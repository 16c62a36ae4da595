//! CloudFront distribution reconciliation
//!
//! A distribution belongs to a domain when its aliases contain the domain
//! and it carries the identifying tag. Updates are computed as a candidate
//! configuration and only sent when it differs from the current one, so
//! re-running a deploy against an up to date distribution writes nothing.

use crate::context::Context;
use crate::edge_function::{
    BasicAuth, EdgeFunctionManager, REDIRECT_FUNCTION_COMMENT, basic_auth_function_code,
    redirect_function_code,
};
use crate::sdk::invalid_request;
use aws_sdk_cloudfront::types::{
    Aliases, AllowedMethods, CachedMethods, CookiePreference, CustomErrorResponse,
    CustomErrorResponses, CustomOriginConfig, DefaultCacheBehavior, DistributionConfig, EventType,
    ForwardedValues, FunctionAssociation, FunctionAssociations, HttpVersion, ItemSelection,
    Method, MinimumProtocolVersion, Origin, OriginProtocolPolicy, OriginSslProtocols, Origins,
    PriceClass, S3OriginConfig, SslProtocol, SslSupportMethod, ViewerCertificate,
    ViewerProtocolPolicy,
};
use chrono::Utc;
use spaflow_cloud::asset::INDEX_DOCUMENT;
use spaflow_cloud::domain::{
    basic_auth_function_name, private_bucket_domain, redirect_function_name, website_domain,
    website_origin_id,
};
use spaflow_cloud::model::{DistributionRecord, DistributionStatus, EdgeEventType};
use spaflow_cloud::{CloudError, PollState, Result, get_all, wait_until};
use std::collections::BTreeMap;

/// How the distribution reaches the bucket
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OriginAccess {
    /// Through the public website endpoint
    #[default]
    PublicWebsite,
    /// Through the REST endpoint, signed with an origin access control
    Private { origin_access_control_id: String },
}

/// Desired state applied by [`DistributionReconciler::update`]
#[derive(Debug, Clone, Default)]
pub struct DistributionOptions {
    pub access: OriginAccess,
    /// Serve sub-folder deployments: no default root object, directory
    /// requests rewritten at the edge
    pub no_default_root_object: bool,
    pub redirect_403_to_root: bool,
    pub additional_aliases: Vec<String>,
    /// Published functions to attach, by name
    pub functions: BTreeMap<EdgeEventType, Vec<String>>,
    pub basic_auth: Option<BasicAuth>,
}

pub struct DistributionReconciler<'a> {
    ctx: &'a Context,
}

impl<'a> DistributionReconciler<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Distribution serving `domain`, waited on until deployed.
    ///
    /// A distribution with the alias but without the identifying tag is an
    /// error: it was not created by this tool and is left alone.
    pub async fn find_deployed(&self, domain: &str) -> Result<Option<DistributionRecord>> {
        tracing::info!(
            "[CloudFront] 🔍 searching for a distribution matching \"{}\"...",
            domain
        );

        let distributions = get_all(|marker, page| {
            tracing::debug!("[CloudFront] list distributions (page {})", page);
            self.ctx.distributions.list_distributions(marker)
        })
        .await?;

        let Some(distribution) = distributions
            .into_iter()
            .find(|d| d.aliases.iter().any(|alias| alias == domain))
        else {
            tracing::info!("[CloudFront] 😬 no matching distribution");
            return Ok(None);
        };

        let tags = self.ctx.distributions.list_tags(&distribution.arn).await?;
        if !self.ctx.settings.has_identifying_tag(&tags) {
            let tag = self.ctx.settings.identifying_tag();
            return Err(CloudError::precondition(format!(
                "[CloudFront] distribution {} serves \"{}\" but is missing the tag {}={}; \
                 it was not created by spaflow and will not be modified",
                distribution.id, domain, tag.key, tag.value
            )));
        }
        tracing::info!("[CloudFront] 👍 distribution found: {}", distribution.id);

        if distribution.status != DistributionStatus::Deployed {
            return self.wait_until_deployed(&distribution.id).await.map(Some);
        }
        Ok(Some(distribution))
    }

    /// Create a distribution for `domain` in front of the bucket's website
    /// endpoint and wait until it is deployed.
    pub async fn create(&self, domain: &str, certificate_arn: &str) -> Result<DistributionRecord> {
        tracing::info!("[CloudFront] ✏️ creating distribution for \"{}\"...", domain);

        let website = website_domain(domain, &self.ctx.settings.bucket_region)?;
        let caller_reference = Utc::now().timestamp_millis().to_string();
        let config = base_config(domain, &website, certificate_arn, &caller_reference)?;

        let distribution = self
            .ctx
            .distributions
            .create_distribution(config)
            .await?
            .ok_or_else(|| {
                CloudError::precondition(format!(
                    "[CloudFront] distribution creation for \"{domain}\" returned nothing"
                ))
            })?;

        tracing::info!(
            "[CloudFront] ✏️ tagging distribution {} with {}...",
            distribution.id,
            self.ctx.settings.identifying_tag_key
        );
        self.ctx
            .distributions
            .tag_resource(&distribution.arn, vec![self.ctx.settings.identifying_tag()])
            .await?;

        self.wait_until_deployed(&distribution.id).await
    }

    /// Bring the distribution's configuration to the desired state.
    /// Returns whether an update was sent.
    pub async fn update(
        &self,
        distribution_id: &str,
        domain: &str,
        options: &DistributionOptions,
    ) -> Result<bool> {
        let versioned = self
            .ctx
            .distributions
            .get_distribution_config(distribution_id)
            .await?;
        let (Some(current), Some(etag)) = (versioned.config, versioned.etag) else {
            return Err(CloudError::precondition(format!(
                "[CloudFront] no configuration or ETag returned for distribution {distribution_id}"
            )));
        };

        let mut candidate = current.clone();

        let associations = self.desired_associations(domain, options).await?;
        apply_associations(&mut candidate, associations)?;

        candidate.default_root_object = Some(if options.no_default_root_object {
            String::new()
        } else {
            INDEX_DOCUMENT.to_string()
        });

        let origin = self.desired_origin(domain, &options.access)?;
        apply_origin(&mut candidate, origin, &options.access)?;

        if options.redirect_403_to_root {
            apply_403_redirect(&mut candidate)?;
        }
        apply_aliases(&mut candidate, &options.additional_aliases)?;

        if candidate == current {
            tracing::info!(
                "[CloudFront] 👍 no updates needed for distribution \"{}\"",
                distribution_id
            );
            return Ok(false);
        }

        tracing::info!(
            "[CloudFront] ✏️ updating distribution configuration \"{}\"...",
            distribution_id
        );
        self.ctx
            .distributions
            .update_distribution(distribution_id, &etag, candidate)
            .await?;
        Ok(true)
    }

    async fn wait_until_deployed(&self, distribution_id: &str) -> Result<DistributionRecord> {
        tracing::info!(
            "[CloudFront] ⏱ waiting for distribution {} to be deployed (can take a while)...",
            distribution_id
        );
        let distribution = wait_until(
            &format!("distribution {distribution_id}"),
            self.ctx.settings.distribution_wait(),
            || async move {
                let distribution = self
                    .ctx
                    .distributions
                    .get_distribution(distribution_id)
                    .await?;
                if distribution.status == DistributionStatus::Deployed {
                    return Ok(PollState::Ready(distribution));
                }
                Ok(PollState::Pending(distribution.status.to_string()))
            },
        )
        .await?;
        tracing::info!("[CloudFront] 👍 distribution {} deployed", distribution_id);
        Ok(distribution)
    }

    /// Function associations in event order: the named functions first, then
    /// the managed viewer-request function if any.
    async fn desired_associations(
        &self,
        domain: &str,
        options: &DistributionOptions,
    ) -> Result<Vec<FunctionAssociation>> {
        let functions = EdgeFunctionManager::new(self.ctx);
        let mut associations = Vec::new();

        for (event, names) in &options.functions {
            for name in names {
                let arn = functions.resolve_live_arn(name).await?.ok_or_else(|| {
                    CloudError::precondition(format!(
                        "[CloudFront] no published function named \"{name}\" for {event}"
                    ))
                })?;
                associations.push(association(&arn, *event)?);
            }
        }

        let managed = match &options.basic_auth {
            Some(auth) => {
                let code = basic_auth_function_code(auth, options.no_default_root_object);
                let comment = format!("Basic auth for {domain}");
                Some(
                    functions
                        .ensure_code(&basic_auth_function_name(domain), &code, &comment)
                        .await?,
                )
            }
            None if options.no_default_root_object => {
                let name = redirect_function_name(&self.ctx.settings.redirect_function_color);
                Some(
                    functions
                        .ensure_published(
                            &name,
                            &redirect_function_code(),
                            REDIRECT_FUNCTION_COMMENT,
                        )
                        .await?,
                )
            }
            None => None,
        };
        if let Some(arn) = managed {
            associations.push(association(&arn, EdgeEventType::ViewerRequest)?);
        }

        Ok(associations)
    }

    fn desired_origin(&self, domain: &str, access: &OriginAccess) -> Result<Origin> {
        let region = &self.ctx.settings.bucket_region;
        match access {
            OriginAccess::PublicWebsite => public_origin(&website_domain(domain, region)?),
            OriginAccess::Private {
                origin_access_control_id,
            } => private_origin(&private_bucket_domain(domain, region), origin_access_control_id),
        }
    }
}

fn association(arn: &str, event: EdgeEventType) -> Result<FunctionAssociation> {
    FunctionAssociation::builder()
        .function_arn(arn)
        .event_type(EventType::from(event.as_str()))
        .build()
        .map_err(invalid_request)
}

fn apply_associations(
    candidate: &mut DistributionConfig,
    desired: Vec<FunctionAssociation>,
) -> Result<()> {
    let Some(behavior) = candidate.default_cache_behavior.as_mut() else {
        return Err(CloudError::precondition(
            "[CloudFront] distribution has no default cache behavior",
        ));
    };

    let current = behavior
        .function_associations
        .as_ref()
        .map(|f| f.items())
        .unwrap_or_default();
    if current == desired.as_slice() {
        return Ok(());
    }

    behavior.function_associations = Some(
        FunctionAssociations::builder()
            .quantity(desired.len() as i32)
            .set_items((!desired.is_empty()).then_some(desired))
            .build()
            .map_err(invalid_request)?,
    );
    Ok(())
}

/// Point the distribution at `desired` unless an origin with the same
/// domain is already there.
fn apply_origin(
    candidate: &mut DistributionConfig,
    desired: Origin,
    access: &OriginAccess,
) -> Result<()> {
    let position = candidate.origins.as_ref().and_then(|origins| {
        origins
            .items()
            .iter()
            .position(|o| o.domain_name() == desired.domain_name())
    });

    match (position, access) {
        (
            Some(index),
            OriginAccess::Private {
                origin_access_control_id,
            },
        ) => {
            if let Some(origins) = candidate.origins.as_mut() {
                let origin = &mut origins.items[index];
                if origin.origin_access_control_id() != Some(origin_access_control_id.as_str()) {
                    origin.origin_access_control_id = Some(origin_access_control_id.clone());
                }
            }
        }
        (Some(_), OriginAccess::PublicWebsite) => {}
        (None, _) => {
            let origin_id = desired.id().to_string();
            candidate.origins = Some(
                Origins::builder()
                    .quantity(1)
                    .items(desired)
                    .build()
                    .map_err(invalid_request)?,
            );
            if let Some(behavior) = candidate.default_cache_behavior.as_mut() {
                behavior.target_origin_id = origin_id;
            }
        }
    }
    Ok(())
}

fn apply_403_redirect(candidate: &mut DistributionConfig) -> Result<()> {
    let mut responses = candidate
        .custom_error_responses
        .as_ref()
        .map(|c| c.items().to_vec())
        .unwrap_or_default();
    if responses.iter().any(|r| r.error_code() == 403) {
        return Ok(());
    }

    responses.push(
        CustomErrorResponse::builder()
            .error_code(403)
            .response_page_path(format!("/{INDEX_DOCUMENT}"))
            .response_code("200")
            .error_caching_min_ttl(10)
            .build()
            .map_err(invalid_request)?,
    );
    candidate.custom_error_responses = Some(
        CustomErrorResponses::builder()
            .quantity(responses.len() as i32)
            .set_items(Some(responses))
            .build()
            .map_err(invalid_request)?,
    );
    Ok(())
}

fn apply_aliases(candidate: &mut DistributionConfig, additional: &[String]) -> Result<()> {
    let mut aliases = candidate
        .aliases
        .as_ref()
        .map(|a| a.items().to_vec())
        .unwrap_or_default();
    let before = aliases.len();
    for alias in additional {
        if !aliases.contains(alias) {
            aliases.push(alias.clone());
        }
    }
    if aliases.len() == before {
        return Ok(());
    }

    candidate.aliases = Some(
        Aliases::builder()
            .quantity(aliases.len() as i32)
            .set_items(Some(aliases))
            .build()
            .map_err(invalid_request)?,
    );
    Ok(())
}

fn public_origin(website_domain: &str) -> Result<Origin> {
    let protocols = OriginSslProtocols::builder()
        .quantity(1)
        .items(SslProtocol::from("TLSv1.2"))
        .build()
        .map_err(invalid_request)?;
    let custom = CustomOriginConfig::builder()
        .http_port(80)
        .https_port(443)
        // website endpoints only speak HTTP
        .origin_protocol_policy(OriginProtocolPolicy::from("http-only"))
        .origin_ssl_protocols(protocols)
        .origin_read_timeout(30)
        .origin_keepalive_timeout(5)
        .build()
        .map_err(invalid_request)?;

    Origin::builder()
        .id(website_origin_id(website_domain))
        .domain_name(website_domain)
        .origin_path("")
        .custom_origin_config(custom)
        .build()
        .map_err(invalid_request)
}

fn private_origin(bucket_domain: &str, origin_access_control_id: &str) -> Result<Origin> {
    let s3 = S3OriginConfig::builder()
        .origin_access_identity("")
        .build();

    Origin::builder()
        .id(bucket_domain)
        .domain_name(bucket_domain)
        .origin_path("")
        .s3_origin_config(s3)
        .origin_access_control_id(origin_access_control_id)
        .build()
        .map_err(invalid_request)
}

fn base_config(
    domain: &str,
    website_domain: &str,
    certificate_arn: &str,
    caller_reference: &str,
) -> Result<DistributionConfig> {
    let methods = || vec![Method::from("HEAD"), Method::from("GET")];
    let cached = CachedMethods::builder()
        .quantity(2)
        .set_items(Some(methods()))
        .build()
        .map_err(invalid_request)?;
    let allowed = AllowedMethods::builder()
        .quantity(2)
        .set_items(Some(methods()))
        .cached_methods(cached)
        .build()
        .map_err(invalid_request)?;

    let cookies = CookiePreference::builder()
        .forward(ItemSelection::from("none"))
        .build()
        .map_err(invalid_request)?;
    let forwarded = ForwardedValues::builder()
        .query_string(false)
        .cookies(cookies)
        .build()
        .map_err(invalid_request)?;

    let behavior = DefaultCacheBehavior::builder()
        .target_origin_id(website_origin_id(website_domain))
        .viewer_protocol_policy(ViewerProtocolPolicy::from("redirect-to-https"))
        .allowed_methods(allowed)
        .forwarded_values(forwarded)
        .min_ttl(0)
        .default_ttl(86400)
        .max_ttl(31536000)
        .compress(true)
        .build()
        .map_err(invalid_request)?;

    let certificate = ViewerCertificate::builder()
        .acm_certificate_arn(certificate_arn)
        .ssl_support_method(SslSupportMethod::from("sni-only"))
        .minimum_protocol_version(MinimumProtocolVersion::from("TLSv1.2_2021"))
        .build();

    let aliases = Aliases::builder()
        .quantity(1)
        .items(domain)
        .build()
        .map_err(invalid_request)?;
    let origins = Origins::builder()
        .quantity(1)
        .items(public_origin(website_domain)?)
        .build()
        .map_err(invalid_request)?;

    DistributionConfig::builder()
        .caller_reference(caller_reference)
        .aliases(aliases)
        .origins(origins)
        .default_cache_behavior(behavior)
        .default_root_object(INDEX_DOCUMENT)
        .comment("")
        .enabled(true)
        .price_class(PriceClass::from("PriceClass_All"))
        .http_version(HttpVersion::from("http2"))
        .viewer_certificate(certificate)
        .build()
        .map_err(invalid_request)
}
