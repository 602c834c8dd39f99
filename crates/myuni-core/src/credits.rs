//! Credit totals per currently-studying course.
//!
//! Unlike the degree view, withdrawn units are counted here: the yearly total
//! is the plain sum of points attempted.

use futures::future::try_join_all;
use serde::{Serialize, Serializer};

use crate::{
  Error, Result,
  enrolment::{CourseEnrolment, StudentRecord},
  source::CourseCatalog,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearCredits {
  pub year:          i32,
  /// Sum of points attempted; may be fractional.
  #[serde(serialize_with = "points")]
  pub total_credits: f64,
}

/// Whole totals as integers (`24`, not `24.0`), others as decimals.
fn points<S: Serializer>(total: &f64, s: S) -> Result<S::Ok, S::Error> {
  if total.fract() == 0.0 && (0.0..=u64::MAX as f64).contains(total) {
    s.serialize_u64(*total as u64)
  } else {
    s.serialize_f64(*total)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseCredits {
  /// Credit points the course requires, from the course catalog.
  pub course_total_credits: u32,
  pub yearly_data:          Vec<YearCredits>,
}

/// Points attempted per enrolment year, in input order.
pub fn yearly_credits(course: &CourseEnrolment) -> Result<Vec<YearCredits>> {
  Ok(
    course
      .yearly_enrolments()?
      .iter()
      .map(|y| YearCredits {
        year:          y.academic_year,
        total_credits: y.units().iter().map(|u| u.points_attempted).sum(),
      })
      .collect(),
  )
}

/// Credit totals for every currently-studying course.
///
/// One catalog lookup per course runs concurrently; results keep course
/// order. Any failed lookup fails the whole call.
pub async fn aggregate_credits<C>(student: &StudentRecord, catalog: &C) -> Result<Vec<CourseCredits>>
where
  C: CourseCatalog,
{
  let courses = student.active_courses()?;
  try_join_all(courses.into_iter().map(|course| course_credits(course, catalog))).await
}

async fn course_credits<C>(course: &CourseEnrolment, catalog: &C) -> Result<CourseCredits>
where
  C: CourseCatalog,
{
  let route = course.route.as_deref().ok_or_else(|| {
    Error::MalformedInput(format!("course enrolment {:?} has no route", course.course_name()))
  })?;
  let yearly_data = yearly_credits(course)?;

  let course_total_credits = catalog
    .course_credits(route)
    .await
    .map_err(|e| Error::upstream(format!("course credits for route {route}"), e))?;
  tracing::debug!(route, course_total_credits, "course credits resolved");

  Ok(CourseCredits {
    course_total_credits,
    yearly_data,
  })
}
