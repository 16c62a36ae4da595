//! Deployment target and the naming conventions derived from it
//!
//! Nothing is persisted between runs: every resource is found again from the
//! domain name, through the helpers below.

use crate::error::{CloudError, Result};
use std::fmt;

/// `domain[/sub/folder]` as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSpec {
    pub domain_name: String,
    /// Key prefix inside the bucket, without leading or trailing slashes
    pub subfolder: Option<String>,
}

impl DomainSpec {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let (domain, rest) = match input.split_once('/') {
            Some((domain, rest)) => (domain, Some(rest)),
            None => (input, None),
        };

        if domain.is_empty() {
            return Err(CloudError::InvalidConfig(format!(
                "a domain name must be provided (got \"{input}\")"
            )));
        }

        let subfolder = rest
            .map(|r| r.trim_matches('/'))
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        Ok(Self {
            domain_name: domain.to_ascii_lowercase(),
            subfolder,
        })
    }

    /// Bucket name; the domain is the bucket's identity.
    pub fn bucket(&self) -> &str {
        &self.domain_name
    }

    /// Object key for a path relative to the deployed folder.
    pub fn object_key(&self, relative: &str) -> String {
        match &self.subfolder {
            Some(sub) => format!("{sub}/{relative}"),
            None => relative.to_string(),
        }
    }
}

impl fmt::Display for DomainSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subfolder {
            Some(sub) => write!(f, "{}/{}", self.domain_name, sub),
            None => write!(f, "{}", self.domain_name),
        }
    }
}

/// True when `cert_name` covers `domain`: either the exact name or the
/// wildcard of the domain's parent (`*.example.com` for `app.example.com`).
pub fn domain_name_match(cert_name: &str, domain: &str) -> bool {
    if cert_name.eq_ignore_ascii_case(domain) {
        return true;
    }
    match domain.split_once('.') {
        Some((_, parent)) if !parent.is_empty() => {
            cert_name.eq_ignore_ascii_case(&format!("*.{parent}"))
        }
        _ => false,
    }
}

/// True when `domain` lives in the zone named `zone_name` (trailing dot
/// ignored). Matches only on label boundaries.
pub fn zone_contains(zone_name: &str, domain: &str) -> bool {
    let zone = zone_name.trim_end_matches('.').to_ascii_lowercase();
    let domain = domain.trim_end_matches('.').to_ascii_lowercase();
    !zone.is_empty() && (domain == zone || domain.ends_with(&format!(".{zone}")))
}

/// Normalize a comma separated list of paths into distribution-absolute
/// invalidation paths, scoped to the subfolder when there is one.
pub fn get_cache_invalidations(paths: &str, subfolder: Option<&str>) -> String {
    let prefix = match subfolder {
        Some(sub) if !sub.is_empty() => format!("/{sub}/"),
        _ => "/".to_string(),
    };
    paths
        .split(',')
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(|path| {
            let path = path.strip_prefix('/').unwrap_or(path);
            format!("{prefix}{path}")
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Static website endpoint suffix for a bucket region. The provider does not
/// expose this, hence the table.
pub fn website_endpoint(region: &str) -> Option<&'static str> {
    Some(match region {
        "us-east-2" => "s3-website.us-east-2.amazonaws.com",
        "us-east-1" => "s3-website-us-east-1.amazonaws.com",
        "us-west-1" => "s3-website-us-west-1.amazonaws.com",
        "us-west-2" => "s3-website-us-west-2.amazonaws.com",
        "ap-south-1" => "s3-website.ap-south-1.amazonaws.com",
        "ap-northeast-3" => "s3-website.ap-northeast-3.amazonaws.com",
        "ap-northeast-2" => "s3-website.ap-northeast-2.amazonaws.com",
        "ap-southeast-1" => "s3-website-ap-southeast-1.amazonaws.com",
        "ap-southeast-2" => "s3-website-ap-southeast-2.amazonaws.com",
        "ap-northeast-1" => "s3-website-ap-northeast-1.amazonaws.com",
        "ca-central-1" => "s3-website.ca-central-1.amazonaws.com",
        "cn-northwest-1" => "s3-website.cn-northwest-1.amazonaws.com.cn",
        "eu-central-1" => "s3-website.eu-central-1.amazonaws.com",
        "eu-west-1" => "s3-website-eu-west-1.amazonaws.com",
        "eu-west-2" => "s3-website.eu-west-2.amazonaws.com",
        "eu-west-3" => "s3-website.eu-west-3.amazonaws.com",
        "eu-north-1" => "s3-website.eu-north-1.amazonaws.com",
        "sa-east-1" => "s3-website-sa-east-1.amazonaws.com",
        _ => return None,
    })
}

/// Hostname of the bucket's public website endpoint.
pub fn website_domain(bucket: &str, region: &str) -> Result<String> {
    website_endpoint(region)
        .map(|endpoint| format!("{bucket}.{endpoint}"))
        .ok_or_else(|| {
            CloudError::InvalidConfig(format!("no S3 website endpoint known for region {region}"))
        })
}

/// Origin id used for the public website origin.
pub fn website_origin_id(website_domain: &str) -> String {
    format!("S3-Website-{website_domain}")
}

/// Hostname of the bucket's REST endpoint, used as the private origin.
pub fn private_bucket_domain(bucket: &str, region: &str) -> String {
    format!("{bucket}.s3.{region}.amazonaws.com")
}

pub fn origin_access_control_name(domain: &str, distribution_id: &str) -> String {
    format!("{domain}-{distribution_id}")
}

pub fn redirect_function_name(color: &str) -> String {
    format!("spaflow-no-default-root-object_{color}")
}

pub fn basic_auth_function_name(domain: &str) -> String {
    format!("spaflow-basic-auth-{}", domain.replace('.', "-"))
}
