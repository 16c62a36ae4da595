//! ACM certificate resolution
//!
//! Reuses an issued certificate covering the domain when one exists, waits
//! on a pending one otherwise, and as a last resort requests a new
//! DNS-validated certificate and writes its validation record.

use crate::context::Context;
use crate::dns::DnsReconciler;
use spaflow_cloud::domain::domain_name_match;
use spaflow_cloud::model::{CertificateRecord, CertificateStatus};
use spaflow_cloud::{CloudError, PollState, Result, get_all, wait_until};

pub struct CertificateResolver<'a> {
    ctx: &'a Context,
}

impl<'a> CertificateResolver<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// ARN of a certificate usable for `domain`, if any.
    ///
    /// Issued matches win without waiting; among several, the most recently
    /// issued one is used. With only a pending match, waits for issuance.
    pub async fn resolve(&self, domain: &str) -> Result<Option<String>> {
        tracing::info!("[ACM] 🔍 looking for a certificate matching \"{}\"...", domain);

        let arns = get_all(|next_token, page| {
            tracing::info!("[ACM] 🔍 list certificates (page {})...", page);
            self.ctx.certificates.list_certificates(next_token)
        })
        .await?;

        let mut issued: Vec<CertificateRecord> = Vec::new();
        let mut pending: Option<String> = None;

        for arn in arns {
            let certificate = self.ctx.certificates.describe_certificate(&arn).await?;
            if !certificate.names().any(|name| domain_name_match(name, domain)) {
                continue;
            }

            match certificate.status {
                CertificateStatus::Issued => issued.push(certificate),
                CertificateStatus::PendingValidation => {
                    tracing::debug!("[ACM] pending certificate {}", certificate.arn);
                    pending = Some(certificate.arn);
                }
                _ => {}
            }
        }

        if issued.len() > 1 {
            tracing::warn!(
                "[ACM] ⚠️ {} issued certificates match \"{}\"; using the most recently issued",
                issued.len(),
                domain
            );
        }
        if let Some(certificate) = most_recently_issued(issued) {
            tracing::info!("[ACM] 👍 certificate found: {}", certificate.arn);
            return Ok(Some(certificate.arn));
        }

        if let Some(arn) = pending {
            tracing::info!("[ACM] ⏱ certificate {} is pending validation", arn);
            self.wait_until_issued(&arn).await?;
            return Ok(Some(arn));
        }

        tracing::info!("[ACM] 😬 no matching certificate found");
        Ok(None)
    }

    /// Request a DNS-validated certificate, write its validation record in
    /// `hosted_zone_id` and wait until it is issued.
    pub async fn request(&self, domain: &str, hosted_zone_id: &str) -> Result<String> {
        tracing::info!("[ACM] ✏️ requesting a certificate for {}...", domain);

        let arn = self
            .ctx
            .certificates
            .request_certificate(domain)
            .await?
            .ok_or_else(|| {
                CloudError::precondition(format!("[ACM] no certificate ARN returned for {domain}"))
            })?;

        // validation options are filled in asynchronously after the request
        tokio::time::sleep(self.ctx.settings.certificate_settle_delay()).await;

        let certificate = self.ctx.certificates.describe_certificate(&arn).await?;
        let challenge = certificate
            .validation_options
            .iter()
            .find(|option| option.domain_name == domain)
            .and_then(|option| option.challenge.as_ref())
            .ok_or_else(|| {
                CloudError::precondition(format!(
                    "[ACM] no DNS validation record found for {domain} on certificate {arn}"
                ))
            })?;

        DnsReconciler::new(self.ctx)
            .upsert_validation_record(hosted_zone_id, challenge)
            .await?;

        self.wait_until_issued(&arn).await?;
        tracing::info!("[ACM] 👍 certificate {} issued", arn);
        Ok(arn)
    }

    async fn wait_until_issued(&self, arn: &str) -> Result<CertificateRecord> {
        wait_until(
            &format!("certificate {arn}"),
            self.ctx.settings.certificate_wait(),
            || async move {
                let certificate = self.ctx.certificates.describe_certificate(arn).await?;
                if certificate.status == CertificateStatus::Issued {
                    return Ok(PollState::Ready(certificate));
                }
                if certificate.status.is_terminal_failure() {
                    return Err(CloudError::precondition(format!(
                        "[ACM] certificate {arn} is {} and will not be issued",
                        certificate.status
                    )));
                }
                Ok(PollState::Pending(certificate.status.to_string()))
            },
        )
        .await
    }
}

/// Latest `issued_at` wins; list order breaks ties and missing dates.
fn most_recently_issued(candidates: Vec<CertificateRecord>) -> Option<CertificateRecord> {
    let mut best: Option<CertificateRecord> = None;
    for candidate in candidates {
        let replace = match &best {
            None => true,
            Some(current) => candidate.issued_at > current.issued_at,
        };
        if replace {
            best = Some(candidate);
        }
    }
    best
}
