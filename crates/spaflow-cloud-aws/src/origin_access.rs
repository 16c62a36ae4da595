//! Origin access control lifecycle
//!
//! One OAC per (domain, distribution) pair, identified by its derived name.

use crate::context::Context;
use spaflow_cloud::domain::origin_access_control_name;
use spaflow_cloud::model::OriginAccessControl;
use spaflow_cloud::{CloudError, Result, get_all};

pub struct OriginAccessManager<'a> {
    ctx: &'a Context,
}

impl<'a> OriginAccessManager<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Existing OAC for the pair, fetched with its ETag.
    pub async fn find(
        &self,
        domain: &str,
        distribution_id: &str,
    ) -> Result<Option<OriginAccessControl>> {
        let name = origin_access_control_name(domain, distribution_id);

        let controls = get_all(|marker, page| {
            tracing::debug!("[CloudFront] list origin access controls (page {})", page);
            self.ctx.origin_access.list_origin_access_controls(marker)
        })
        .await?;

        match controls.into_iter().find(|oac| oac.name == name) {
            Some(summary) => {
                let oac = self
                    .ctx
                    .origin_access
                    .get_origin_access_control(&summary.id)
                    .await?;
                Ok(Some(oac))
            }
            None => Ok(None),
        }
    }

    /// Find the pair's OAC or create it.
    pub async fn upsert(
        &self,
        domain: &str,
        distribution_id: &str,
    ) -> Result<(OriginAccessControl, bool)> {
        if let Some(existing) = self.find(domain, distribution_id).await? {
            tracing::info!("[CloudFront] 👍 origin access control {} found", existing.id);
            return Ok((existing, false));
        }

        tracing::info!(
            "[CloudFront] ✏️ creating an origin access control for \"{}\"...",
            domain
        );
        let name = origin_access_control_name(domain, distribution_id);
        let description =
            format!("OAC used by {domain} associated to distributionId: {distribution_id}");
        let created = self
            .ctx
            .origin_access
            .create_origin_access_control(&name, &description)
            .await?;
        Ok((created, true))
    }

    /// Delete the pair's OAC if there is one. Returns whether one was deleted.
    pub async fn cleanup(&self, domain: &str, distribution_id: &str) -> Result<bool> {
        let Some(existing) = self.find(domain, distribution_id).await? else {
            return Ok(false);
        };

        let Some(etag) = existing.etag.as_deref() else {
            return Err(CloudError::precondition(format!(
                "[CloudFront] no ETag returned for origin access control {}",
                existing.id
            )));
        };

        tracing::info!(
            "[CloudFront] 🗑 deleting origin access control {} ({})",
            existing.id,
            existing.name
        );
        self.ctx
            .origin_access
            .delete_origin_access_control(&existing.id, etag)
            .await?;
        Ok(true)
    }
}
