//! Error types for the upstream clients.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{what} returned {status}")]
  Status { what: &'static str, status: StatusCode },

  #[error("malformed response: {0}")]
  MalformedResponse(String),

  #[error("xml error: {0}")]
  Xml(String),

  #[error("soap fault: {0}")]
  SoapFault(String),

  #[error("secret {0:?} is not set")]
  MissingSecret(String),

  #[error("secret lookup failed: {0}")]
  Secret(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
