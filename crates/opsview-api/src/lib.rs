//! opsview-api: Shared Opsview REST payload types
//!
//! Contains the downtime, reload and session payloads exchanged with the
//! Opsview REST API, used by both the client and the reconcilers.

pub mod downtime;
pub mod reload;
pub mod session;

pub use downtime::{DowntimeList, DowntimeObject, NewDowntime};
pub use reload::{ReloadStatus, ServerStatus};
pub use session::{LoginRequest, LoginResponse, ServerInfo};
