use super::{classify, to_chrono};
use crate::client::CertificateApi;
use async_trait::async_trait;
use aws_sdk_acm::Client;
use aws_sdk_acm::types::ValidationMethod;
use spaflow_cloud::model::{CertificateRecord, CertificateStatus, DnsChallenge, DomainValidation};
use spaflow_cloud::{CloudError, Page, Result};

const SERVICE: &str = "ACM";

#[async_trait]
impl CertificateApi for Client {
    async fn list_certificates(&self, next_token: Option<String>) -> Result<Page<String>> {
        let output = self
            .list_certificates()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify(SERVICE, "certificates", e))?;

        let arns = output
            .certificate_summary_list()
            .iter()
            .filter_map(|summary| summary.certificate_arn().map(str::to_string))
            .collect();

        Ok(Page::new(arns, output.next_token().map(str::to_string)))
    }

    async fn describe_certificate(&self, arn: &str) -> Result<CertificateRecord> {
        let output = self
            .describe_certificate()
            .certificate_arn(arn)
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("certificate {arn}"), e))?;

        let detail = output.certificate().ok_or_else(|| CloudError::NotFound {
            service: SERVICE,
            resource: format!("certificate {arn}"),
        })?;

        let validation_options = detail
            .domain_validation_options()
            .iter()
            .map(|option| DomainValidation {
                domain_name: option.domain_name().to_string(),
                challenge: option.resource_record().map(|record| DnsChallenge {
                    name: record.name().to_string(),
                    record_type: record.r#type().as_str().to_string(),
                    value: record.value().to_string(),
                }),
            })
            .collect();

        Ok(CertificateRecord {
            arn: detail.certificate_arn().unwrap_or(arn).to_string(),
            domain_name: detail.domain_name().unwrap_or_default().to_string(),
            subject_alternative_names: detail.subject_alternative_names().to_vec(),
            status: detail
                .status()
                .map(|s| CertificateStatus::parse(s.as_str()))
                .unwrap_or_else(|| CertificateStatus::Other("UNKNOWN".to_string())),
            issued_at: detail.issued_at().and_then(to_chrono),
            validation_options,
        })
    }

    async fn request_certificate(&self, domain: &str) -> Result<Option<String>> {
        let output = self
            .request_certificate()
            .domain_name(domain)
            .validation_method(ValidationMethod::Dns)
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("certificate for {domain}"), e))?;

        Ok(output.certificate_arn().map(str::to_string))
    }
}
