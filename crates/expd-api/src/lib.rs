//! Remote API client for the expd development server.
//!
//! The backend exposes two kinds of calls:
//!
//! - **Method calls**: `/--/api/<method>/<urlencoded JSON args>`, optionally
//!   with a JSON request body
//! - **Path calls**: plain `GET <base><path>` returning JSON
//!
//! [`ApiClient`] captures those two primitives and layers the typed calls the
//! dev server needs on top of them (`whoami`, `sdk_versions`,
//! `sign_manifest`). [`HttpApiClient`] is the `reqwest` implementation.
//!
//! # Example
//!
//! ```rust,no_run
//! use expd_api::{ApiClient, ApiConfig, HttpApiClient};
//!
//! # async fn run() -> Result<(), expd_api::ApiError> {
//! let client = HttpApiClient::new(ApiConfig::default())?;
//! if let Some(user) = client.whoami().await? {
//!     println!("logged in as {}", user.username);
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod traits;
mod types;

pub use client::{ApiConfig, HttpApiClient, DEFAULT_API_URL};
pub use error::ApiError;
pub use traits::{ApiClient, HttpMethod};
pub use types::{PublishArgs, SdkVersionInfo, SdkVersions, User};
