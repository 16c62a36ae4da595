//! Deploy orchestration
//!
//! Runs the reconcilers in order: hosted zone, certificate, bucket,
//! distribution, access mode, DNS, upload, invalidation. Each step finds
//! or creates its resource, or diffs before writing, so a failed run is
//! resumed by running it again.

use crate::bucket::BucketReconciler;
use crate::certificate::CertificateResolver;
use crate::context::Context;
use crate::distribution::{DistributionOptions, DistributionReconciler, OriginAccess};
use crate::dns::DnsReconciler;
use crate::edge_function::BasicAuth;
use crate::invalidation::CacheInvalidator;
use crate::origin_access::OriginAccessManager;
use crate::upload::AssetUploader;
use spaflow_cloud::asset::INDEX_DOCUMENT;
use spaflow_cloud::domain::{get_cache_invalidations, origin_access_control_name};
use spaflow_cloud::model::{BucketAccessMode, EdgeEventType};
use spaflow_cloud::{ActionType, CloudError, DeployReport, DomainSpec, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const PRE_DEPLOY_QUESTION: &str = "⚠️  It looks like you're attempting to deploy from a non CI environment. Are you sure you built the SPA correctly (env variables, run tests, ...)?";

/// Everything `spaflow deploy` was asked to do
#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub target: DomainSpec,
    /// Built SPA, must contain `index.html`
    pub directory: PathBuf,
    /// Wait for the cache invalidation to complete
    pub wait: bool,
    /// Comma separated paths, relative to the target's subfolder
    pub cache_invalidation: String,
    pub cache_busted_prefix: Option<String>,
    pub basic_auth: Option<BasicAuth>,
    /// Skip the pre-deploy confirmation
    pub no_prompt: bool,
    pub access_mode: BucketAccessMode,
    pub no_default_root_object: bool,
    pub redirect_403_to_root: bool,
    pub object_expiration_days: Option<i32>,
    pub aliases: Vec<String>,
    pub functions: BTreeMap<EdgeEventType, Vec<String>>,
}

impl DeployOptions {
    pub fn new(target: DomainSpec, directory: impl Into<PathBuf>) -> Self {
        Self {
            target,
            directory: directory.into(),
            wait: false,
            cache_invalidation: "/*".to_string(),
            cache_busted_prefix: None,
            basic_auth: None,
            no_prompt: false,
            access_mode: BucketAccessMode::PublicWebsite,
            no_default_root_object: false,
            redirect_403_to_root: false,
            object_expiration_days: None,
            aliases: Vec::new(),
            functions: BTreeMap::new(),
        }
    }
}

pub struct Deployer<'a> {
    ctx: &'a Context,
}

impl<'a> Deployer<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    pub async fn deploy(&self, options: &DeployOptions) -> Result<DeployReport> {
        let domain = options.target.domain_name.as_str();
        let bucket = options.target.bucket();
        let mut report = DeployReport::new();

        tracing::info!(
            "✨ deploying \"{}\" on \"{}\"...",
            options.directory.display(),
            options.target
        );
        validate_local_assets(&options.directory)?;
        let paths = get_cache_invalidations(
            &options.cache_invalidation,
            options.target.subfolder.as_deref(),
        );
        if paths.is_empty() {
            return Err(CloudError::InvalidConfig(format!(
                "no cache invalidation path in \"{}\"",
                options.cache_invalidation
            )));
        }
        self.pre_deploy_gate(options)?;

        // hosted zone
        let dns = DnsReconciler::new(self.ctx);
        let zone = match dns.find_hosted_zone(domain).await? {
            Some(zone) => {
                report.record("hosted-zone", &zone.id, ActionType::NoOp, zone.name.clone());
                zone
            }
            None => {
                let zone = dns.create_hosted_zone(domain).await?;
                report.record("hosted-zone", &zone.id, ActionType::Create, zone.name.clone());
                zone
            }
        };

        // certificate
        let certificates = CertificateResolver::new(self.ctx);
        let certificate_arn = match certificates.resolve(domain).await? {
            Some(arn) => {
                report.record("certificate", &arn, ActionType::NoOp, "issued certificate found");
                arn
            }
            None => {
                let arn = certificates.request(domain, &zone.id).await?;
                report.record("certificate", &arn, ActionType::Create, "certificate requested");
                arn
            }
        };

        // bucket
        let buckets = BucketReconciler::new(self.ctx);
        if buckets.exists(bucket).await? {
            buckets.confirm_management(bucket).await?;
            report.record("bucket", bucket, ActionType::NoOp, "bucket managed by spaflow");
        } else {
            buckets.create(bucket).await?;
            report.record("bucket", bucket, ActionType::Create, "bucket created");
        }

        if options.access_mode == BucketAccessMode::PublicWebsite {
            let action = if buckets.set_public_website(bucket).await? {
                ActionType::Update
            } else {
                ActionType::NoOp
            };
            report.record("bucket-access", bucket, action, "public website");
        }

        if let Some(days) = options.object_expiration_days {
            let action = if buckets.upsert_lifecycle(bucket, days).await? {
                ActionType::Update
            } else {
                ActionType::NoOp
            };
            report.record("lifecycle", bucket, action, format!("objects expire after {days} days"));
        }

        // distribution
        let distributions = DistributionReconciler::new(self.ctx);
        let distribution = match distributions.find_deployed(domain).await? {
            Some(distribution) => {
                report.record(
                    "distribution",
                    &distribution.id,
                    ActionType::NoOp,
                    "distribution found",
                );
                distribution
            }
            None => {
                let distribution = distributions.create(domain, &certificate_arn).await?;
                report.record(
                    "distribution",
                    &distribution.id,
                    ActionType::Create,
                    "distribution created",
                );
                distribution
            }
        };

        // access mode
        let origin_access = OriginAccessManager::new(self.ctx);
        let access = match options.access_mode {
            BucketAccessMode::PrivateOac => {
                let (oac, created) = origin_access.upsert(domain, &distribution.id).await?;
                let action = if created { ActionType::Create } else { ActionType::NoOp };
                report.record("origin-access-control", &oac.id, action, oac.name.clone());
                OriginAccess::Private {
                    origin_access_control_id: oac.id,
                }
            }
            BucketAccessMode::PublicWebsite => OriginAccess::PublicWebsite,
        };

        let distribution_options = DistributionOptions {
            access,
            no_default_root_object: options.no_default_root_object,
            redirect_403_to_root: options.redirect_403_to_root,
            additional_aliases: options.aliases.clone(),
            functions: options.functions.clone(),
            basic_auth: options.basic_auth.clone(),
        };
        let updated = distributions
            .update(&distribution.id, domain, &distribution_options)
            .await?;
        report.record(
            "distribution-config",
            &distribution.id,
            if updated { ActionType::Update } else { ActionType::NoOp },
            "distribution configuration",
        );

        match options.access_mode {
            BucketAccessMode::PrivateOac => {
                let action = if buckets.set_private(bucket, &distribution.arn).await? {
                    ActionType::Update
                } else {
                    ActionType::NoOp
                };
                report.record(
                    "bucket-access",
                    bucket,
                    action,
                    "private, read by the distribution only",
                );
            }
            BucketAccessMode::PublicWebsite => {
                if origin_access.cleanup(domain, &distribution.id).await? {
                    report.record(
                        "origin-access-control",
                        origin_access_control_name(domain, &distribution.id),
                        ActionType::Delete,
                        "no longer used",
                    );
                }
            }
        }

        // dns
        let dns_action = if dns
            .needs_update(&zone.id, domain, &distribution.domain_name)
            .await?
        {
            dns.update(&zone.id, domain, &distribution.domain_name).await?;
            ActionType::Update
        } else {
            ActionType::NoOp
        };
        report.record(
            "dns-record",
            domain,
            dns_action,
            format!("alias to {}", distribution.domain_name),
        );

        // assets
        let uploaded = AssetUploader::new(self.ctx)
            .upload(
                &options.directory,
                &options.target,
                options.cache_busted_prefix.as_deref(),
            )
            .await?;
        report.record("assets", bucket, ActionType::Update, format!("{uploaded} files uploaded"));

        // cache
        let invalidation = CacheInvalidator::new(self.ctx)
            .invalidate_with_retry(&distribution.id, &paths, options.wait)
            .await?;
        report.record("invalidation", &invalidation.id, ActionType::Create, paths);

        Ok(report)
    }

    fn pre_deploy_gate(&self, options: &DeployOptions) -> Result<()> {
        if options.no_prompt {
            return Ok(());
        }
        tracing::info!(
            "💡 if you don't want this message to prompt, either set CI=true in your env variables or use the \"--no-prompt\" option"
        );
        if self.ctx.confirm.confirm(PRE_DEPLOY_QUESTION, false)? {
            Ok(())
        } else {
            Err(CloudError::UserDeclined("👍 deploy aborted".to_string()))
        }
    }
}

/// The built SPA folder must exist and hold an `index.html`.
pub fn validate_local_assets(folder: &Path) -> Result<()> {
    if !folder.is_dir() {
        return Err(CloudError::precondition(format!(
            "folder \"{}\" not found",
            folder.display()
        )));
    }
    if !folder.join(INDEX_DOCUMENT).is_file() {
        return Err(CloudError::precondition(format!(
            "\"{}\" not found in \"{}\" folder",
            INDEX_DOCUMENT,
            folder.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::VersionedConfig;
    use crate::context::testing::Mocks;
    use aws_sdk_cloudfront::types::DistributionConfig;
    use spaflow_cloud::Page;
    use spaflow_cloud::model::{
        CertificateRecord, CertificateStatus, DistributionRecord, DistributionStatus,
        DnsChallenge, DomainValidation, HostedZone, Invalidation, OriginAccessControl, RecordSet,
        Tag,
    };
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const DOMAIN: &str = "hello.example.com";

    fn build_folder() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();
        dir
    }

    fn not_found(resource: &str) -> CloudError {
        CloudError::NotFound {
            service: "test",
            resource: resource.into(),
        }
    }

    fn distribution(status: DistributionStatus) -> DistributionRecord {
        DistributionRecord {
            id: "E1".into(),
            arn: "arn:aws:cloudfront::123:distribution/E1".into(),
            domain_name: "d111.cloudfront.net".into(),
            aliases: vec![DOMAIN.into()],
            status,
        }
    }

    /// A fresh account: zone exists, nothing else does.
    fn first_deploy(mocks: &mut Mocks) -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        mocks.dns.expect_list_hosted_zones().returning(|_| {
            Ok(Page::last(vec![HostedZone {
                id: "Z1".into(),
                name: "example.com.".into(),
            }]))
        });

        mocks
            .certificates
            .expect_list_certificates()
            .returning(|_| Ok(Page::last(vec![])));
        mocks
            .certificates
            .expect_request_certificate()
            .times(1)
            .returning(|_| Ok(Some("arn:cert".into())));
        mocks.certificates.expect_describe_certificate().returning(|arn| {
            Ok(CertificateRecord {
                arn: arn.to_string(),
                domain_name: DOMAIN.into(),
                subject_alternative_names: vec![DOMAIN.into()],
                status: CertificateStatus::Issued,
                issued_at: None,
                validation_options: vec![DomainValidation {
                    domain_name: DOMAIN.into(),
                    challenge: Some(DnsChallenge {
                        name: "_x.hello.example.com.".into(),
                        record_type: "CNAME".into(),
                        value: "_y.acm-validations.aws.".into(),
                    }),
                }],
            })
        });

        let records = Arc::new(AtomicUsize::new(0));
        let counter = records.clone();
        mocks.dns.expect_upsert_record().returning(move |zone, _| {
            assert_eq!(zone, "Z1");
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        mocks
            .dns
            .expect_list_record_sets()
            .returning(|_, _| Ok(vec![]));

        mocks
            .storage
            .expect_head_bucket()
            .returning(|b| Err(not_found(b)));
        mocks
            .storage
            .expect_create_bucket()
            .times(1)
            .returning(|_, _| Ok(()));
        mocks
            .storage
            .expect_put_bucket_tags()
            .times(1)
            .returning(|_, _| Ok(()));

        let config = Arc::new(Mutex::new(None::<DistributionConfig>));
        mocks
            .distributions
            .expect_list_distributions()
            .returning(|_| Ok(Page::last(vec![])));
        let created = config.clone();
        mocks
            .distributions
            .expect_create_distribution()
            .times(1)
            .returning(move |c| {
                *created.lock().unwrap() = Some(c);
                Ok(Some(distribution(DistributionStatus::InProgress)))
            });
        mocks
            .distributions
            .expect_tag_resource()
            .times(1)
            .returning(|_, _| Ok(()));
        mocks
            .distributions
            .expect_get_distribution()
            .returning(|_| Ok(distribution(DistributionStatus::Deployed)));
        let read = config.clone();
        mocks
            .distributions
            .expect_get_distribution_config()
            .returning(move |_| {
                Ok(VersionedConfig {
                    config: read.lock().unwrap().clone(),
                    etag: Some("ETAG".into()),
                })
            });

        let uploads = Arc::new(AtomicUsize::new(0));
        let counter = uploads.clone();
        mocks
            .storage
            .expect_put_object()
            .returning(move |_, _, _, _, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        mocks
            .distributions
            .expect_create_invalidation()
            .withf(|id, paths, _| id == "E1" && paths == ["/*".to_string()].as_slice())
            .times(1)
            .returning(|_, _, _| {
                Ok(Invalidation {
                    id: "I1".into(),
                    status: "InProgress".into(),
                })
            });

        (records, uploads)
    }

    #[tokio::test]
    async fn test_first_public_deploy_creates_everything() {
        let dir = build_folder();
        let mut mocks = Mocks::new();
        let (records, uploads) = first_deploy(&mut mocks);
        mocks.bucket_access(None, None, Some(true));
        mocks
            .storage
            .expect_delete_public_access_block()
            .times(1)
            .returning(|_| Ok(()));
        mocks
            .storage
            .expect_put_website()
            .times(1)
            .returning(|_, _, _| Ok(()));
        mocks
            .storage
            .expect_put_policy()
            .withf(|_, policy| policy.contains("AllowPublicRead"))
            .times(1)
            .returning(|_, _| Ok(()));
        mocks
            .origin_access
            .expect_list_origin_access_controls()
            .returning(|_| Ok(Page::last(vec![])));
        mocks.distributions.expect_update_distribution().never();
        let ctx = mocks.into_context();

        let mut options = DeployOptions::new(DomainSpec::parse(DOMAIN).unwrap(), dir.path());
        options.no_prompt = true;
        let report = Deployer::new(&ctx).deploy(&options).await.unwrap();

        let action = |kind: &str| report.find(kind).map(|s| s.action_type);
        assert_eq!(action("hosted-zone"), Some(ActionType::NoOp));
        assert_eq!(action("certificate"), Some(ActionType::Create));
        assert_eq!(action("bucket"), Some(ActionType::Create));
        assert_eq!(action("bucket-access"), Some(ActionType::Update));
        assert_eq!(action("distribution"), Some(ActionType::Create));
        assert_eq!(action("distribution-config"), Some(ActionType::NoOp));
        assert_eq!(action("dns-record"), Some(ActionType::Update));
        assert_eq!(action("invalidation"), Some(ActionType::Create));
        assert_eq!(action("origin-access-control"), None);

        // validation record, then the alias record
        assert_eq!(records.load(Ordering::SeqCst), 2);
        assert_eq!(uploads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_private_deploy_locks_bucket_after_distribution_update() {
        let dir = build_folder();
        let mut mocks = Mocks::new();
        first_deploy(&mut mocks);
        mocks.bucket_access(None, None, Some(true));
        mocks.storage.expect_delete_public_access_block().never();
        mocks
            .origin_access
            .expect_list_origin_access_controls()
            .returning(|_| Ok(Page::last(vec![])));
        mocks
            .origin_access
            .expect_create_origin_access_control()
            .times(1)
            .returning(|name, _| {
                Ok(OriginAccessControl {
                    id: "OAC1".into(),
                    name: name.to_string(),
                    etag: Some("E".into()),
                })
            });

        let updated = Arc::new(AtomicUsize::new(0));
        let counter = updated.clone();
        mocks
            .distributions
            .expect_update_distribution()
            .withf(|_, _, config| {
                config
                    .origins()
                    .map(|o| o.items()[0].origin_access_control_id() == Some("OAC1"))
                    .unwrap_or(false)
            })
            .times(1)
            .returning(move |_, _, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        mocks
            .storage
            .expect_delete_website()
            .times(1)
            .returning(move |_| Ok(()));
        let seen = updated.clone();
        mocks
            .storage
            .expect_put_public_access_block()
            .times(1)
            .returning(move |_| {
                assert_eq!(seen.load(Ordering::SeqCst), 1, "bucket locked before update");
                Ok(())
            });
        mocks
            .storage
            .expect_put_policy()
            .withf(|_, policy| policy.contains("AllowCloudFrontServicePrincipal"))
            .times(1)
            .returning(|_, _| Ok(()));
        let ctx = mocks.into_context();

        let mut options = DeployOptions::new(DomainSpec::parse(DOMAIN).unwrap(), dir.path());
        options.no_prompt = true;
        options.access_mode = BucketAccessMode::PrivateOac;
        let report = Deployer::new(&ctx).deploy(&options).await.unwrap();

        assert_eq!(
            report.find("origin-access-control").map(|s| s.action_type),
            Some(ActionType::Create)
        );
        assert_eq!(
            report.find("distribution-config").map(|s| s.action_type),
            Some(ActionType::Update)
        );
        assert_eq!(
            report.find("bucket-access").map(|s| s.action_type),
            Some(ActionType::Update)
        );
    }

    /// Provider state shared by the mocks, so a run sees what the previous
    /// one left behind. `writes` logs every mutating call.
    #[derive(Default)]
    struct Account {
        zones: Vec<HostedZone>,
        certificates: Vec<String>,
        records: Vec<RecordSet>,
        bucket_tags: Option<Vec<Tag>>,
        website_index: Option<String>,
        policy: Option<String>,
        public_access_blocked: Option<bool>,
        distribution: Option<DistributionConfig>,
        distribution_tags: Vec<Tag>,
        uploads: usize,
        writes: Vec<&'static str>,
    }

    fn stateful_account(mocks: &mut Mocks, zones: Vec<HostedZone>) -> Arc<Mutex<Account>> {
        let account = Arc::new(Mutex::new(Account {
            zones,
            ..Account::default()
        }));

        // Route 53
        let state = account.clone();
        mocks
            .dns
            .expect_list_hosted_zones()
            .returning(move |_| Ok(Page::last(state.lock().unwrap().zones.clone())));
        let state = account.clone();
        mocks
            .dns
            .expect_create_hosted_zone()
            .returning(move |name, _| {
                let zone = HostedZone {
                    id: "Z2".into(),
                    name: format!("{name}."),
                };
                let mut state = state.lock().unwrap();
                state.zones.push(zone.clone());
                state.writes.push("create_hosted_zone");
                Ok(Some(zone))
            });
        let state = account.clone();
        mocks
            .dns
            .expect_list_record_sets()
            .returning(move |_, _| Ok(state.lock().unwrap().records.clone()));
        let state = account.clone();
        mocks.dns.expect_upsert_record().returning(move |_, record| {
            let mut state = state.lock().unwrap();
            state
                .records
                .retain(|r| r.name != record.name || r.record_type != record.record_type);
            state.records.push(record);
            state.writes.push("upsert_record");
            Ok(())
        });

        // ACM
        let state = account.clone();
        mocks
            .certificates
            .expect_list_certificates()
            .returning(move |_| Ok(Page::last(state.lock().unwrap().certificates.clone())));
        let state = account.clone();
        mocks
            .certificates
            .expect_request_certificate()
            .returning(move |_| {
                let mut state = state.lock().unwrap();
                state.certificates.push("arn:cert".into());
                state.writes.push("request_certificate");
                Ok(Some("arn:cert".into()))
            });
        mocks.certificates.expect_describe_certificate().returning(|arn| {
            Ok(CertificateRecord {
                arn: arn.to_string(),
                domain_name: DOMAIN.into(),
                subject_alternative_names: vec![DOMAIN.into()],
                status: CertificateStatus::Issued,
                issued_at: None,
                validation_options: vec![DomainValidation {
                    domain_name: DOMAIN.into(),
                    challenge: Some(DnsChallenge {
                        name: "_x.hello.example.com.".into(),
                        record_type: "CNAME".into(),
                        value: "_y.acm-validations.aws.".into(),
                    }),
                }],
            })
        });

        // S3
        let state = account.clone();
        mocks.storage.expect_head_bucket().returning(move |b| {
            match state.lock().unwrap().bucket_tags {
                Some(_) => Ok(()),
                None => Err(not_found(b)),
            }
        });
        let state = account.clone();
        mocks.storage.expect_create_bucket().returning(move |_, _| {
            let mut state = state.lock().unwrap();
            state.bucket_tags = Some(Vec::new());
            // new buckets block public access
            state.public_access_blocked = Some(true);
            state.writes.push("create_bucket");
            Ok(())
        });
        let state = account.clone();
        mocks.storage.expect_get_bucket_tags().returning(move |b| {
            match state.lock().unwrap().bucket_tags.clone() {
                Some(tags) if !tags.is_empty() => Ok(tags),
                _ => Err(not_found(b)),
            }
        });
        let state = account.clone();
        mocks
            .storage
            .expect_put_bucket_tags()
            .returning(move |_, tags| {
                let mut state = state.lock().unwrap();
                state.bucket_tags = Some(tags);
                state.writes.push("put_bucket_tags");
                Ok(())
            });
        let state = account.clone();
        mocks.storage.expect_get_website_index().returning(move |b| {
            state.lock().unwrap().website_index.clone().ok_or_else(|| not_found(b))
        });
        let state = account.clone();
        mocks.storage.expect_get_policy().returning(move |b| {
            state.lock().unwrap().policy.clone().ok_or_else(|| not_found(b))
        });
        let state = account.clone();
        mocks
            .storage
            .expect_get_public_access_block()
            .returning(move |b| {
                state
                    .lock()
                    .unwrap()
                    .public_access_blocked
                    .ok_or_else(|| not_found(b))
            });
        let state = account.clone();
        mocks
            .storage
            .expect_delete_public_access_block()
            .returning(move |_| {
                let mut state = state.lock().unwrap();
                state.public_access_blocked = None;
                state.writes.push("delete_public_access_block");
                Ok(())
            });
        let state = account.clone();
        mocks
            .storage
            .expect_put_website()
            .returning(move |_, index, _| {
                let mut state = state.lock().unwrap();
                state.website_index = Some(index.to_string());
                state.writes.push("put_website");
                Ok(())
            });
        let state = account.clone();
        mocks.storage.expect_put_policy().returning(move |_, policy| {
            let mut state = state.lock().unwrap();
            state.policy = Some(policy);
            state.writes.push("put_policy");
            Ok(())
        });
        let state = account.clone();
        mocks
            .storage
            .expect_put_object()
            .returning(move |_, _, _, _, _| {
                state.lock().unwrap().uploads += 1;
                Ok(())
            });

        // CloudFront
        let state = account.clone();
        mocks.distributions.expect_list_distributions().returning(move |_| {
            let deployed = state.lock().unwrap().distribution.is_some();
            Ok(Page::last(if deployed {
                vec![distribution(DistributionStatus::Deployed)]
            } else {
                vec![]
            }))
        });
        let state = account.clone();
        mocks
            .distributions
            .expect_list_tags()
            .returning(move |_| Ok(state.lock().unwrap().distribution_tags.clone()));
        let state = account.clone();
        mocks
            .distributions
            .expect_create_distribution()
            .returning(move |config| {
                let mut state = state.lock().unwrap();
                state.distribution = Some(config);
                state.writes.push("create_distribution");
                Ok(Some(distribution(DistributionStatus::InProgress)))
            });
        let state = account.clone();
        mocks
            .distributions
            .expect_tag_resource()
            .returning(move |_, tags| {
                let mut state = state.lock().unwrap();
                state.distribution_tags = tags;
                state.writes.push("tag_distribution");
                Ok(())
            });
        mocks
            .distributions
            .expect_get_distribution()
            .returning(|_| Ok(distribution(DistributionStatus::Deployed)));
        let state = account.clone();
        mocks
            .distributions
            .expect_get_distribution_config()
            .returning(move |_| {
                Ok(VersionedConfig {
                    config: state.lock().unwrap().distribution.clone(),
                    etag: Some("ETAG".into()),
                })
            });
        let state = account.clone();
        mocks
            .distributions
            .expect_update_distribution()
            .returning(move |_, _, config| {
                let mut state = state.lock().unwrap();
                state.distribution = Some(config);
                state.writes.push("update_distribution");
                Ok(())
            });
        mocks
            .distributions
            .expect_create_invalidation()
            .returning(|_, _, _| {
                Ok(Invalidation {
                    id: "I1".into(),
                    status: "InProgress".into(),
                })
            });
        mocks
            .origin_access
            .expect_list_origin_access_controls()
            .returning(|_| Ok(Page::last(vec![])));

        account
    }

    fn parent_zone() -> HostedZone {
        HostedZone {
            id: "Z1".into(),
            name: "example.com.".into(),
        }
    }

    #[tokio::test]
    async fn test_second_deploy_writes_nothing_new() {
        let dir = build_folder();
        let mut mocks = Mocks::new();
        let account = stateful_account(&mut mocks, vec![parent_zone()]);
        let ctx = mocks.into_context();

        let mut options = DeployOptions::new(DomainSpec::parse(DOMAIN).unwrap(), dir.path());
        options.no_prompt = true;
        let deployer = Deployer::new(&ctx);

        let first = deployer.deploy(&options).await.unwrap();
        assert!(first.summary().create >= 3);
        let writes_after_first = account.lock().unwrap().writes.clone();
        assert!(writes_after_first.contains(&"create_distribution"));

        let second = deployer.deploy(&options).await.unwrap();
        let account = account.lock().unwrap();
        let again = &account.writes[writes_after_first.len()..];
        assert!(again.is_empty(), "second run wrote again: {again:?}");
        assert_eq!(account.uploads, 4);

        for kind in [
            "hosted-zone",
            "certificate",
            "bucket",
            "bucket-access",
            "distribution",
            "distribution-config",
            "dns-record",
        ] {
            assert_eq!(
                second.find(kind).map(|s| s.action_type),
                Some(ActionType::NoOp),
                "{kind}"
            );
        }
        let summary = second.summary();
        assert_eq!(summary.create, 1, "only the invalidation is new");
        assert_eq!(summary.update, 1, "only the assets are rewritten");
        assert_eq!(summary.delete, 0);
    }

    #[tokio::test]
    async fn test_deploy_creates_missing_hosted_zone() {
        let dir = build_folder();
        let mut mocks = Mocks::new();
        let account = stateful_account(&mut mocks, vec![]);
        let ctx = mocks.into_context();

        let mut options = DeployOptions::new(DomainSpec::parse(DOMAIN).unwrap(), dir.path());
        options.no_prompt = true;
        let report = Deployer::new(&ctx).deploy(&options).await.unwrap();

        let zone = report.find("hosted-zone").unwrap();
        assert_eq!(zone.action_type, ActionType::Create);
        assert_eq!(zone.resource_id, "Z2");

        let account = account.lock().unwrap();
        assert_eq!(account.zones.len(), 1);
        assert_eq!(account.zones[0].name, "hello.example.com.");
        // validation and alias records both land in the new zone
        assert!(account.records.iter().any(|r| r.record_type == "CNAME"));
        assert!(account.records.iter().any(|r| r.record_type == "A"));
    }

    #[tokio::test]
    async fn test_empty_cache_invalidation_is_rejected_upfront() {
        let dir = build_folder();
        let mut mocks = Mocks::new();
        mocks.dns.expect_list_hosted_zones().never();
        let ctx = mocks.into_context();

        let mut options = DeployOptions::new(DomainSpec::parse(DOMAIN).unwrap(), dir.path());
        options.no_prompt = true;
        options.cache_invalidation = " , ".into();
        let result = Deployer::new(&ctx).deploy(&options).await;
        assert!(matches!(result, Err(CloudError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_missing_index_stops_before_any_call() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Mocks::new().into_context();

        let mut options = DeployOptions::new(DomainSpec::parse(DOMAIN).unwrap(), dir.path());
        options.no_prompt = true;
        let result = Deployer::new(&ctx).deploy(&options).await;
        assert!(matches!(result, Err(CloudError::Precondition(msg)) if msg.contains("index.html")));
    }

    #[tokio::test]
    async fn test_missing_folder() {
        let ctx = Mocks::new().into_context();
        let options = DeployOptions::new(DomainSpec::parse(DOMAIN).unwrap(), "/nonexistent/build");
        let result = Deployer::new(&ctx).deploy(&options).await;
        assert!(matches!(result, Err(CloudError::Precondition(msg)) if msg.contains("not found")));
    }

    #[tokio::test]
    async fn test_declined_gate_aborts() {
        let dir = build_folder();
        let mut mocks = Mocks::new();
        mocks.dns.expect_list_hosted_zones().never();
        let ctx = mocks.into_context();

        let options = DeployOptions::new(DomainSpec::parse(DOMAIN).unwrap(), dir.path());
        let result = Deployer::new(&ctx).deploy(&options).await;
        assert!(
            matches!(result, Err(CloudError::UserDeclined(msg)) if msg.contains("deploy aborted"))
        );
    }
}
