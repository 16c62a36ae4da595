use super::{classify, invalid_request};
use crate::client::DnsApi;
use async_trait::async_trait;
use aws_sdk_route53::Client;
use aws_sdk_route53::types::{
    AliasTarget, Change, ChangeAction, ChangeBatch, ResourceRecord, ResourceRecordSet, RrType,
};
use spaflow_cloud::model::{self, HostedZone, RecordSet};
use spaflow_cloud::{Page, Result};

const SERVICE: &str = "Route53";

fn to_sdk_record(record: RecordSet) -> Result<ResourceRecordSet> {
    let values = record
        .values
        .into_iter()
        .map(|value| {
            ResourceRecord::builder()
                .value(value)
                .build()
                .map_err(invalid_request)
        })
        .collect::<Result<Vec<_>>>()?;

    let alias = record
        .alias
        .map(|alias| {
            AliasTarget::builder()
                .hosted_zone_id(alias.hosted_zone_id)
                .dns_name(alias.dns_name)
                .evaluate_target_health(alias.evaluate_target_health)
                .build()
                .map_err(invalid_request)
        })
        .transpose()?;

    ResourceRecordSet::builder()
        .name(record.name)
        .r#type(RrType::from(record.record_type.as_str()))
        .set_ttl(record.ttl)
        .set_resource_records((!values.is_empty()).then_some(values))
        .set_alias_target(alias)
        .build()
        .map_err(invalid_request)
}

#[async_trait]
impl DnsApi for Client {
    async fn list_hosted_zones(&self, marker: Option<String>) -> Result<Page<HostedZone>> {
        let output = self
            .list_hosted_zones()
            .set_marker(marker)
            .send()
            .await
            .map_err(|e| classify(SERVICE, "hosted zones", e))?;

        let zones = output
            .hosted_zones()
            .iter()
            .map(|zone| HostedZone {
                id: zone.id().to_string(),
                name: zone.name().to_string(),
            })
            .collect();

        let next = if output.is_truncated() {
            output.next_marker().map(str::to_string)
        } else {
            None
        };
        Ok(Page::new(zones, next))
    }

    async fn create_hosted_zone(
        &self,
        name: &str,
        caller_reference: &str,
    ) -> Result<Option<HostedZone>> {
        let output = self
            .create_hosted_zone()
            .name(name)
            .caller_reference(caller_reference)
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("hosted zone {name}"), e))?;

        Ok(output.hosted_zone().map(|zone| HostedZone {
            id: zone.id().to_string(),
            name: zone.name().to_string(),
        }))
    }

    async fn list_record_sets(&self, zone_id: &str, start_name: &str) -> Result<Vec<RecordSet>> {
        let output = self
            .list_resource_record_sets()
            .hosted_zone_id(zone_id)
            .start_record_name(start_name)
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("hosted zone {zone_id}"), e))?;

        Ok(output
            .resource_record_sets()
            .iter()
            .map(|set| RecordSet {
                name: set.name().to_string(),
                record_type: set.r#type().as_str().to_string(),
                ttl: set.ttl(),
                values: set
                    .resource_records()
                    .iter()
                    .map(|r| r.value().to_string())
                    .collect(),
                alias: set.alias_target().map(|alias| model::AliasTarget {
                    hosted_zone_id: alias.hosted_zone_id().to_string(),
                    dns_name: alias.dns_name().to_string(),
                    evaluate_target_health: alias.evaluate_target_health(),
                }),
            })
            .collect())
    }

    async fn upsert_record(&self, zone_id: &str, record: RecordSet) -> Result<()> {
        let name = record.name.clone();
        let change = Change::builder()
            .action(ChangeAction::Upsert)
            .resource_record_set(to_sdk_record(record)?)
            .build()
            .map_err(invalid_request)?;
        let batch = ChangeBatch::builder()
            .changes(change)
            .build()
            .map_err(invalid_request)?;

        self.change_resource_record_sets()
            .hosted_zone_id(zone_id)
            .change_batch(batch)
            .send()
            .await
            .map_err(|e| classify(SERVICE, format!("record {name}"), e))?;
        Ok(())
    }
}
