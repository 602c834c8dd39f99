//! Fetch-then-transform orchestration over the collaborator traits.
//!
//! Enrolment failures propagate to the caller. Calendar feed failures do
//! not: study weeks degrade to an empty result.

use std::collections::BTreeMap;

use chrono::{Datelike, Utc};

use crate::{
  Error, Result,
  credits::{CourseCredits, aggregate_credits},
  degrees::{DegreeSummary, aggregate_degrees},
  enrolment::StudentRecord,
  info::{StudentInfo, student_info},
  source::{CalendarFeed, CourseCatalog, EnrolmentSource},
  weeks::{SessionWeeks, build_study_weeks},
};

/// The calendar year results are withheld for.
pub fn current_year() -> i32 { Utc::now().year() }

/// Student-facing views backed by an enrolment source and a course catalog.
pub struct StudentService<E, C> {
  enrolment:    E,
  catalog:      C,
  current_year: i32,
}

impl<E, C> StudentService<E, C>
where
  E: EnrolmentSource,
  C: CourseCatalog,
{
  pub fn new(enrolment: E, catalog: C) -> Self {
    Self {
      enrolment,
      catalog,
      current_year: current_year(),
    }
  }

  /// Override the year treated as "current" for result redaction.
  pub fn with_current_year(mut self, year: i32) -> Self {
    self.current_year = year;
    self
  }

  pub async fn student_record(&self, student_id: &str) -> Result<StudentRecord> {
    self
      .enrolment
      .student_record(student_id)
      .await
      .map_err(|e| Error::upstream(format!("enrolment for student {student_id}"), e))?
      .ok_or_else(|| Error::StudentNotFound(student_id.to_owned()))
  }

  pub async fn degrees(&self, student_id: &str) -> Result<Vec<DegreeSummary>> {
    let record = self.student_record(student_id).await?;
    aggregate_degrees(&record, self.current_year)
  }

  pub async fn credits(&self, student_id: &str) -> Result<Vec<CourseCredits>> {
    let record = self.student_record(student_id).await?;
    aggregate_credits(&record, &self.catalog).await
  }

  pub async fn info(&self, student_id: &str) -> Result<Vec<StudentInfo>> {
    let record = self.student_record(student_id).await?;
    student_info(&record)
  }
}

/// Fetch the calendar and build weeks for `requested`.
///
/// A failed fetch is logged and yields an empty map.
pub async fn fetch_study_weeks<F, S>(feed: &F, requested: &[S]) -> BTreeMap<String, SessionWeeks>
where
  F: CalendarFeed,
  S: AsRef<str>,
{
  match feed.calendar_records().await {
    Ok(records) => {
      tracing::debug!(records = records.len(), "calendar records fetched");
      build_study_weeks(&records, requested)
    }
    Err(e) => {
      tracing::warn!(error = %e, "calendar feed unavailable; returning no study weeks");
      BTreeMap::new()
    }
  }
}
