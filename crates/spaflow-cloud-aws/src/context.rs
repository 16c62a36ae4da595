//! Shared handles for one deploy run

use crate::client::{
    CertificateApi, DistributionApi, DnsApi, FunctionApi, OriginAccessApi, StorageApi,
};
use aws_config::BehaviorVersion;
use spaflow_cloud::{Confirm, Settings};
use std::sync::Arc;

/// Everything a reconciler needs: one client per service, the settings and
/// the operator confirmation capability. Built once, then borrowed.
#[derive(Clone)]
pub struct Context {
    pub certificates: Arc<dyn CertificateApi>,
    pub distributions: Arc<dyn DistributionApi>,
    pub functions: Arc<dyn FunctionApi>,
    pub origin_access: Arc<dyn OriginAccessApi>,
    pub dns: Arc<dyn DnsApi>,
    pub storage: Arc<dyn StorageApi>,
    pub settings: Settings,
    pub confirm: Arc<dyn Confirm>,
}

impl Context {
    /// Build SDK clients from the default credential chain.
    ///
    /// ACM is pinned to the certificate region and S3 to the bucket region;
    /// CloudFront and Route 53 are global.
    pub async fn from_env(settings: Settings, confirm: Arc<dyn Confirm>) -> Self {
        let shared = aws_config::load_defaults(BehaviorVersion::latest()).await;

        let acm_config = aws_sdk_acm::config::Builder::from(&shared)
            .region(aws_sdk_acm::config::Region::new(settings.certificate_region.clone()))
            .build();
        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .region(aws_sdk_s3::config::Region::new(settings.bucket_region.clone()))
            .build();

        let cloudfront = aws_sdk_cloudfront::Client::new(&shared);
        let route53 = aws_sdk_route53::Client::new(&shared);

        tracing::debug!(
            "AWS clients ready (certificates in {}, bucket in {})",
            settings.certificate_region,
            settings.bucket_region
        );

        Self {
            certificates: Arc::new(aws_sdk_acm::Client::from_conf(acm_config)),
            distributions: Arc::new(cloudfront.clone()),
            functions: Arc::new(cloudfront.clone()),
            origin_access: Arc::new(cloudfront),
            dns: Arc::new(route53),
            storage: Arc::new(aws_sdk_s3::Client::from_conf(s3_config)),
            settings,
            confirm,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::client::{
        MockCertificateApi, MockDistributionApi, MockDnsApi, MockFunctionApi,
        MockOriginAccessApi, MockStorageApi,
    };
    use spaflow_cloud::{AutoConfirm, CloudError};

    /// Mocks with no expectations; set the ones a test needs, then call
    /// [`Mocks::into_context`].
    pub struct Mocks {
        pub certificates: MockCertificateApi,
        pub distributions: MockDistributionApi,
        pub functions: MockFunctionApi,
        pub origin_access: MockOriginAccessApi,
        pub dns: MockDnsApi,
        pub storage: MockStorageApi,
        pub settings: Settings,
        pub answer: bool,
    }

    impl Mocks {
        pub fn new() -> Self {
            Self {
                certificates: MockCertificateApi::new(),
                distributions: MockDistributionApi::new(),
                functions: MockFunctionApi::new(),
                origin_access: MockOriginAccessApi::new(),
                dns: MockDnsApi::new(),
                storage: MockStorageApi::new(),
                settings: Settings {
                    poll_interval_secs: 1,
                    certificate_settle_delay_secs: 0,
                    ..Settings::default()
                },
                answer: false,
            }
        }

        /// Current exposure of every bucket. `None` reads as absent.
        pub fn bucket_access(
            &mut self,
            website_index: Option<&str>,
            policy: Option<String>,
            public_access_blocked: Option<bool>,
        ) {
            let website_index = website_index.map(str::to_string);
            self.storage
                .expect_get_website_index()
                .returning(move |bucket| website_index.clone().ok_or_else(|| absent(bucket)));
            self.storage
                .expect_get_policy()
                .returning(move |bucket| policy.clone().ok_or_else(|| absent(bucket)));
            self.storage
                .expect_get_public_access_block()
                .returning(move |bucket| public_access_blocked.ok_or_else(|| absent(bucket)));
        }

        pub fn into_context(self) -> Context {
            Context {
                certificates: Arc::new(self.certificates),
                distributions: Arc::new(self.distributions),
                functions: Arc::new(self.functions),
                origin_access: Arc::new(self.origin_access),
                dns: Arc::new(self.dns),
                storage: Arc::new(self.storage),
                settings: self.settings,
                confirm: Arc::new(AutoConfirm {
                    answer: self.answer,
                }),
            }
        }
    }

    fn absent(bucket: &str) -> CloudError {
        CloudError::NotFound {
            service: "S3",
            resource: bucket.to_string(),
        }
    }
}
