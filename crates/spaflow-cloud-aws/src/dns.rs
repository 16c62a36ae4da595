//! Route 53 reconciliation
//!
//! Finds the hosted zone serving a domain, decides whether the domain's
//! record already points at the distribution, and upserts the alias record.

use crate::context::Context;
use chrono::Utc;
use spaflow_cloud::domain::zone_contains;
use spaflow_cloud::model::{AliasTarget, DnsChallenge, HostedZone, RecordSet};
use spaflow_cloud::{CloudError, Result, get_all};

pub struct DnsReconciler<'a> {
    ctx: &'a Context,
}

impl<'a> DnsReconciler<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Hosted zone whose name is the domain or one of its parents.
    ///
    /// Several candidates (e.g. `example.com` and `app.example.com` zones for
    /// `www.app.example.com`) resolve to the most specific one.
    pub async fn find_hosted_zone(&self, domain: &str) -> Result<Option<HostedZone>> {
        tracing::info!("[Route53] 🔍 looking for a hosted zone matching \"{}\"...", domain);

        let zones = get_all(|marker, page| {
            tracing::debug!("[Route53] list hosted zones (page {})", page);
            self.ctx.dns.list_hosted_zones(marker)
        })
        .await?;

        let mut matching: Vec<HostedZone> = zones
            .into_iter()
            .filter(|zone| zone_contains(&zone.name, domain))
            .collect();

        if matching.len() > 1 {
            let names: Vec<&str> = matching.iter().map(|z| z.name.as_str()).collect();
            tracing::warn!(
                "[Route53] ⚠️ found multiple hosted zones for \"{}\": {}. The most specific one is used",
                domain,
                names.join(", ")
            );
        }

        // stable sort keeps list order among equally specific zones
        matching.sort_by_key(|zone| std::cmp::Reverse(zone.bare_name().len()));
        let zone = matching.into_iter().next();

        match &zone {
            Some(zone) => tracing::info!("[Route53] 👍 found hosted zone \"{}\"", zone.name),
            None => tracing::info!("[Route53] 🧐 no hosted zone found"),
        }
        Ok(zone)
    }

    pub async fn create_hosted_zone(&self, domain: &str) -> Result<HostedZone> {
        tracing::info!("[Route53] ✏️ creating hosted zone \"{}\"...", domain);
        let caller_reference = format!("spaflow-{}", Utc::now().timestamp_millis());

        self.ctx
            .dns
            .create_hosted_zone(domain, &caller_reference)
            .await?
            .ok_or_else(|| {
                CloudError::precondition(format!(
                    "[Route53] hosted zone creation for \"{domain}\" returned nothing"
                ))
            })
    }

    /// Whether the domain's record must be (re)written to point at `target`.
    ///
    /// A record pointing somewhere else is only overwritten when the operator
    /// agrees.
    pub async fn needs_update(&self, zone_id: &str, domain: &str, target: &str) -> Result<bool> {
        tracing::info!("[Route53] 🔍 looking for a record matching \"{}\"...", domain);

        let record_name = fqdn(domain);
        let expected = fqdn(target);
        let records = self.ctx.dns.list_record_sets(zone_id, &record_name).await?;

        for record in records {
            if !record.name.eq_ignore_ascii_case(&record_name) {
                continue;
            }

            if record.record_type == "CNAME" {
                let Some(current) = record.values.first() else {
                    continue;
                };
                if current.eq_ignore_ascii_case(&expected) {
                    tracing::info!("[Route53] 👍 found well configured CNAME record");
                    return Ok(false);
                }
                return self.confirm_overwrite(&format!(
                    "[Route53] CNAME record for \"{domain}\" is \"{current}\". Update it to \"{expected}\"?"
                ));
            }

            if record.record_type == "A" {
                let Some(alias) = &record.alias else {
                    continue;
                };
                if alias.hosted_zone_id == self.ctx.settings.cloudfront_hosted_zone_id
                    && alias.dns_name.eq_ignore_ascii_case(&expected)
                {
                    tracing::info!("[Route53] 👍 found well configured A record");
                    return Ok(false);
                }
                return self.confirm_overwrite(&format!(
                    "[Route53] A record for \"{}\" is \"{}:{}\". Update it to \"{}:{}\"?",
                    domain,
                    alias.hosted_zone_id,
                    alias.dns_name,
                    self.ctx.settings.cloudfront_hosted_zone_id,
                    expected
                ));
            }
        }

        tracing::info!("[Route53] 🔍 no matching record found");
        Ok(true)
    }

    fn confirm_overwrite(&self, question: &str) -> Result<bool> {
        if self.ctx.confirm.confirm(question, false)? {
            return Ok(true);
        }
        tracing::warn!(
            "[Route53] ⚠️ the site might not be served correctly unless the record is updated"
        );
        Ok(false)
    }

    /// Upsert `domain. A ALIAS target.` in the CDN alias zone.
    pub async fn update(&self, zone_id: &str, domain: &str, target: &str) -> Result<()> {
        tracing::info!("[Route53] ✏️ upserting A: \"{}.\" → {}...", domain, target);
        let record = RecordSet::alias(
            fqdn(domain),
            "A",
            AliasTarget {
                hosted_zone_id: self.ctx.settings.cloudfront_hosted_zone_id.clone(),
                dns_name: fqdn(target),
                evaluate_target_health: false,
            },
        );
        self.ctx.dns.upsert_record(zone_id, record).await
    }

    /// Write the record a certificate authority asked for.
    pub async fn upsert_validation_record(
        &self,
        zone_id: &str,
        challenge: &DnsChallenge,
    ) -> Result<()> {
        tracing::info!(
            "[Route53] ✏️ creating record {}:{}={} to validate the certificate",
            challenge.record_type,
            challenge.name,
            challenge.value
        );
        let record = RecordSet::simple(
            &challenge.name,
            &challenge.record_type,
            self.ctx.settings.validation_record_ttl,
            challenge.value.clone(),
        );
        self.ctx.dns.upsert_record(zone_id, record).await
    }
}

fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}
