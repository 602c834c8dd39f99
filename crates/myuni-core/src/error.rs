//! Error types for `myuni-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The input tree or records lack a structural field the engines need.
  #[error("malformed input: {0}")]
  MalformedInput(String),

  /// A unit refers to an academic year that has no yearly enrolment at all.
  #[error("semester not found: {year} {semester}")]
  SemesterNotFound { year: i32, semester: u8 },

  #[error("upstream unavailable: {what}: {source}")]
  UpstreamUnavailable {
    what:   String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("no enrolment data for student {0}")]
  StudentNotFound(String),

  #[error("invalid session key: {0:?}")]
  InvalidSessionKey(String),

  #[error("serialization error: {0}")]
  Json(#[from] serde_json::Error),
}

impl Error {
  pub(crate) fn upstream<E>(what: impl Into<String>, source: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::UpstreamUnavailable {
      what:   what.into(),
      source: Box::new(source),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
