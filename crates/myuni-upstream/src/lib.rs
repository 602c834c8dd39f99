//! Upstream collaborators for `myuni-core`.
//!
//! Concrete implementations of the [`myuni_core::source`] traits:
//!
//! - [`StudentApiClient`]: the enrolment REST API (basic auth plus an
//!   optional client certificate);
//! - [`SoapCatalog`]: the SOAP course catalog;
//! - [`CalendarClient`]: the institutional dates feed;
//! - [`EnvSecrets`] and [`CachedSecrets`]: secret lookup for the above.

pub mod calendar;
pub mod catalog;
pub mod config;
pub mod error;
pub mod secrets;
pub mod student;

pub use calendar::CalendarClient;
pub use catalog::SoapCatalog;
pub use config::UpstreamConfig;
pub use error::{Error, Result};
pub use secrets::{CachedSecrets, EnvSecrets};
pub use student::StudentApiClient;
