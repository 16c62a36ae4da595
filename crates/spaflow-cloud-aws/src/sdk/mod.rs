//! Service traits implemented for the AWS SDK clients

mod acm;
mod cloudfront;
mod route53;
mod s3;

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{BuildError, DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::DateTime;
use chrono::Utc;
use spaflow_cloud::CloudError;

/// Map an SDK error onto the crate taxonomy. HTTP 404 and `NoSuch*` /
/// `*NotFound` codes become [`CloudError::NotFound`]; everything else is a
/// provider error carrying the service's code and message.
pub(crate) fn classify<E>(
    service: &'static str,
    resource: impl Into<String>,
    err: SdkError<E, HttpResponse>,
) -> CloudError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let code = err.code().map(str::to_string);

    let not_found = status == Some(404)
        || code
            .as_deref()
            .is_some_and(|c| c.starts_with("NoSuch") || c.ends_with("NotFound"));
    if not_found {
        return CloudError::NotFound {
            service,
            resource: resource.into(),
        };
    }

    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());

    CloudError::Provider {
        service,
        code,
        status,
        message,
    }
}

/// A request shape could not be built (missing required member).
pub(crate) fn invalid_request(err: BuildError) -> CloudError {
    CloudError::InvalidConfig(format!("invalid request: {err}"))
}

pub(crate) fn to_chrono(dt: &DateTime) -> Option<chrono::DateTime<Utc>> {
    chrono::DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_chrono() {
        let dt = DateTime::from_secs(1_700_000_000);
        let converted = to_chrono(&dt).unwrap();
        assert_eq!(converted.timestamp(), 1_700_000_000);
    }
}
