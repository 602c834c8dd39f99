//! Student profile summary per currently-studying course.

use serde::Serialize;

use crate::{
  Result,
  degrees::DegreeLevel,
  enrolment::{CourseEnrolment, SemesterEnrolment, StudentRecord, YearlyEnrolment},
};

const CURRENT_SEMESTER_STATUS: &str = "CS";
const MAJOR_PATHWAY_MARKER: &str = "M-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttendanceMode {
  #[serde(rename = "Full time")]
  FullTime,
  #[serde(rename = "Part time")]
  PartTime,
}

impl AttendanceMode {
  /// Full time iff the attendance pattern mentions `FT`.
  pub fn from_pattern(pattern: &str) -> Self {
    if pattern.contains("FT") { Self::FullTime } else { Self::PartTime }
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Academics {
  pub degree:           String,
  pub major:            String,
  /// Not supplied upstream; always empty.
  pub minor:            String,
  pub enrolment_info:   Option<String>,
  pub enrolment_status: Option<AttendanceMode>,
  pub status:           Option<DegreeLevel>,
  pub route:            Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInfo {
  pub campus:             String,
  pub campus_description: String,
  pub name:               String,
  pub academics:          Academics,
}

/// The first currently-studying semester, searching years in input order.
///
/// This is the first match, not necessarily the most recent semester.
pub fn current_semester(
  yearly: &[YearlyEnrolment],
) -> Option<(&YearlyEnrolment, &SemesterEnrolment)> {
  yearly.iter().find_map(|y| {
    y.semester_enrolments
      .as_deref()
      .unwrap_or_default()
      .iter()
      .find(|s| s.semester_status.as_deref() == Some(CURRENT_SEMESTER_STATUS))
      .map(|s| (y, s))
  })
}

/// Descriptions of the course's major pathways, space-joined.
pub fn academic_major(course: &CourseEnrolment) -> String {
  if course.pathway.is_empty() {
    tracing::debug!(course = course.course_name(), "no pathway in course enrolment");
  }
  course
    .pathway
    .iter()
    .filter(|p| {
      p.pathway_code
        .as_deref()
        .is_some_and(|c| c.contains(MAJOR_PATHWAY_MARKER))
    })
    .filter_map(|p| p.pathway_description.as_deref())
    .collect::<Vec<_>>()
    .join(" ")
}

pub fn student_info_item(student: &StudentRecord, course: &CourseEnrolment) -> Result<StudentInfo> {
  let yearly = course.yearly_enrolments()?;

  // Campus comes from the first unit of the first year, whatever year that is.
  let first_unit = yearly.first().and_then(|y| y.units().first());
  let campus = first_unit
    .and_then(|u| u.campus.clone())
    .unwrap_or_default();
  let campus_description = first_unit
    .and_then(|u| u.campus_description.clone())
    .unwrap_or_default();

  let current = current_semester(yearly);
  let enrolment_info = current.map(|(y, s)| {
    let semester = s.semester_id.map(|id| id.to_string()).unwrap_or_default();
    format!("Enrolment Year {}, Semester {semester}", y.academic_year)
  });
  let enrolment_status = current.map(|(_, s)| {
    AttendanceMode::from_pattern(s.attendance_pattern.as_deref().unwrap_or_default())
  });

  Ok(StudentInfo {
    campus,
    campus_description,
    name: student.full_name(),
    academics: Academics {
      degree: course.course_name().to_owned(),
      major: academic_major(course),
      minor: String::new(),
      enrolment_info,
      enrolment_status,
      status: DegreeLevel::of(course),
      route: course.route.clone(),
    },
  })
}

/// One info item per currently-studying course, in input order.
pub fn student_info(student: &StudentRecord) -> Result<Vec<StudentInfo>> {
  student
    .active_courses()?
    .into_iter()
    .map(|course| student_info_item(student, course))
    .collect()
}
