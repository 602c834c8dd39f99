//! Collaborator traits the engines' callers fetch their inputs through.
//!
//! The traits are implemented by `myuni-upstream` (HTTP and SOAP clients) and
//! by in-process fakes in tests. Every method returns a `Send` future so the
//! services can run on a multi-threaded runtime.

use std::{collections::HashMap, future::Future};

use thiserror::Error;

use crate::{calendar::CalendarRecords, enrolment::StudentRecord};

// ─── Traits ──────────────────────────────────────────────────────────────────

/// The upstream enrolment-data provider.
pub trait EnrolmentSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch the enrolment tree for `student_id`. `None` when the provider
  /// knows no such student.
  fn student_record<'a>(
    &'a self,
    student_id: &'a str,
  ) -> impl Future<Output = Result<Option<StudentRecord>, Self::Error>> + Send + 'a;
}

/// The upstream course catalog.
pub trait CourseCatalog: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Total credit points required by the course with `route_code`.
  fn course_credits<'a>(
    &'a self,
    route_code: &'a str,
  ) -> impl Future<Output = Result<u32, Self::Error>> + Send + 'a;
}

/// The institutional calendar feed.
pub trait CalendarFeed: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn calendar_records(&self) -> impl Future<Output = Result<CalendarRecords, Self::Error>> + Send + '_;
}

/// Named secrets (URLs, credentials, certificates) for the upstream clients.
pub trait SecretProvider: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn secret<'a>(&'a self, name: &'a str) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;
}

// ─── Static catalog ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
#[error("route {0:?} is not in the course catalog")]
pub struct UnknownRoute(pub String);

/// A fixed route → credits table.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
  credits: HashMap<String, u32>,
}

impl StaticCatalog {
  pub fn new(credits: HashMap<String, u32>) -> Self { Self { credits } }
}

impl FromIterator<(String, u32)> for StaticCatalog {
  fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
    Self::new(iter.into_iter().collect())
  }
}

impl CourseCatalog for StaticCatalog {
  type Error = UnknownRoute;

  async fn course_credits(&self, route_code: &str) -> Result<u32, UnknownRoute> {
    self
      .credits
      .get(route_code)
      .copied()
      .ok_or_else(|| UnknownRoute(route_code.to_owned()))
  }
}
