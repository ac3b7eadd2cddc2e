//! opsview-core: Downtime and reload reconciliation
//!
//! Converges an Opsview server towards a desired state:
//! - downtime windows tagged with a deterministic per-host identifier are
//!   created, found and deleted by [`downtime`]
//! - configuration reloads are triggered and awaited by [`reload`]
//!
//! All remote access goes through [`opsview_client::OpsviewApi`]; every
//! operation returns an [`Outcome`] or a [`CoreError`].

pub mod cancel;
pub mod config;
pub mod downtime;
pub mod duration;
pub mod error;
pub mod ident;
pub mod outcome;
pub mod reload;

pub use cancel::{CancelHandle, Cancellation};
pub use config::{DEFAULT_DURATION, DesiredState, DowntimeRequest, ReconcilePolicy};
pub use downtime::{
    create_downtime, create_downtime_at, delete_downtime, find_downtime, reconcile_downtime,
};
pub use duration::parse_duration;
pub use error::CoreError;
pub use ident::{downtime_comment, downtime_ident};
pub use outcome::Outcome;
pub use reload::reconcile_reload;
