//! spaflow cloud primitives
//!
//! Provider-neutral building blocks for reconciling a single-page app's
//! hosting stack: error taxonomy, pagination, long-poll waiting, operator
//! confirmation, naming conventions and the deploy report.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  spaflow CLI                     │
//! │              (spaflow deploy ...)                │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               spaflow-cloud-aws                  │
//! │  reconcilers: certificate / distribution /       │
//! │  origin access / dns / bucket / invalidation     │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                spaflow-cloud                     │
//! │  ┌────────────┐ ┌────────────┐ ┌─────────────┐  │
//! │  │ paginate   │ │  waiter    │ │  settings   │  │
//! │  └────────────┘ └────────────┘ └─────────────┘  │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod asset;
pub mod domain;
pub mod error;
pub mod model;
pub mod paginate;
pub mod prompt;
pub mod report;
pub mod settings;
pub mod waiter;

// Re-exports
pub use domain::DomainSpec;
pub use error::{CloudError, Result};
pub use paginate::{Page, get_all};
pub use prompt::{AutoConfirm, Confirm};
pub use report::{ActionType, DeployReport, ReportSummary, StepOutcome};
pub use settings::Settings;
pub use waiter::{PollState, RetryConfig, WaitPolicy, retry, wait_until};
