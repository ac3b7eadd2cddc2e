//! opsview-client: HTTP client for the Opsview REST API
//!
//! Provides the [`OpsviewApi`] trait the reconcilers are written against and
//! [`HttpClient`], its `reqwest` implementation.
//!
//! # Example
//!
//! ```no_run
//! use opsview_client::{ClientConfig, HttpClient, OpsviewApi, TlsVerify};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new("https://opsview.example.com", "admin")
//!     .with_password("secret")
//!     .with_verify(TlsVerify::parse("true")?);
//! let client = HttpClient::connect(&config).await?;
//!
//! // Raw reload status
//! let status = client.reload_status().await?;
//! println!("{status:?}");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod http;
pub mod tls;
pub mod traits;

pub use error::{ClientError, Result};
pub use http::{ClientConfig, HttpClient};
pub use tls::TlsVerify;
pub use traits::{OpsviewApi, Params};
