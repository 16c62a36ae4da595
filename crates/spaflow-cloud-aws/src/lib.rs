//! AWS reconcilers for spaflow
//!
//! Brings ACM, CloudFront, Route 53 and S3 to the state a single-page app
//! needs, finding resources again on every run from their names and tags.
//!
//! Every reconciler borrows a [`Context`]; the service traits in [`client`]
//! are implemented for the SDK clients in `sdk` and mocked in tests.

pub mod bucket;
pub mod certificate;
pub mod client;
pub mod context;
pub mod deploy;
pub mod distribution;
pub mod dns;
pub mod edge_function;
pub mod invalidation;
pub mod origin_access;
mod sdk;
pub mod upload;

pub use bucket::BucketReconciler;
pub use certificate::CertificateResolver;
pub use context::Context;
pub use deploy::{DeployOptions, Deployer};
pub use distribution::{DistributionOptions, DistributionReconciler, OriginAccess};
pub use dns::DnsReconciler;
pub use edge_function::{BasicAuth, EdgeFunctionManager};
pub use invalidation::CacheInvalidator;
pub use origin_access::OriginAccessManager;
pub use upload::AssetUploader;
