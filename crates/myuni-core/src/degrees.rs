//! Degree summaries: units of study grouped into ordered academic periods.
//!
//! A period is one named teaching session of one enrolment year (e.g.
//! `"Enrolment Year 2023 - Semester 1"`). Periods take their date bounds
//! from the matching semester enrolment; a period can only be opened by a
//! unit whose session maps to semester 1 or 2.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::{
  Error, Result,
  enrolment::{CourseEnrolment, SemesterEnrolment, StudentRecord, UnitEnrolment, YearlyEnrolment},
  normalize,
};

const WITHDRAWN: &str = "Withdrawn";
const NORMAL_COMPLETION: &str = "Normal Completion";
const CURRENTLY_ENROLLED: &str = "Currently enrolled student";
/// Upstream placeholder for "no status date".
const NULL_STATUS_DATE: &str = "1900-01-01";

// ─── Degree level ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DegreeLevel {
  Postgraduate,
  Undergraduate,
}

impl DegreeLevel {
  /// `PC` (coursework) and `PR` (research) are postgraduate; `UC` is
  /// undergraduate coursework.
  pub fn from_course_type(course_type: &str) -> Option<Self> {
    match course_type.trim() {
      "PC" | "PR" => Some(Self::Postgraduate),
      "UC" => Some(Self::Undergraduate),
      _ => None,
    }
  }

  pub fn of(course: &CourseEnrolment) -> Option<Self> {
    course.course_type.as_deref().and_then(Self::from_course_type)
  }
}

impl fmt::Display for DegreeLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Postgraduate => f.write_str("Postgraduate"),
      Self::Undergraduate => f.write_str("Undergraduate"),
    }
  }
}

// ─── Units of study ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStatus {
  Completed,
  InProgress,
  /// Results for the current year are withheld until the year completes.
  Unreleased,
  /// Any other upstream status text, passed through unchanged.
  Other(String),
}

impl UnitStatus {
  pub fn from_upstream(status: &str) -> Self {
    match status {
      NORMAL_COMPLETION => Self::Completed,
      CURRENTLY_ENROLLED => Self::InProgress,
      other => Self::Other(other.to_owned()),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      Self::Completed => "COMPLETED",
      Self::InProgress => "IN PROGRESS",
      Self::Unreleased => "UNRELEASED",
      Self::Other(s) => s,
    }
  }
}

impl fmt::Display for UnitStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl Serialize for UnitStatus {
  fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(self.as_str())
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitOfStudy {
  pub code:                String,
  pub name:                String,
  #[serde(rename = "type")]
  pub kind:                String,
  pub status:              UnitStatus,
  /// Decimal string; `""` while results are unreleased.
  pub credit_points:       String,
  pub academic_year:       i32,
  pub session_id:          String,
  pub session_description: String,
  pub semester_id:         Option<u8>,
  pub period_name:         String,
  pub period_order:        i64,
  /// Numeric form of `credit_points`.
  #[serde(skip)]
  pub points:              f64,
}

impl UnitOfStudy {
  /// Derive a unit of study from one upstream unit enrolment.
  ///
  /// Units in `current_year` are redacted: status `UNRELEASED`, no credit.
  pub fn from_enrolment(unit: &UnitEnrolment, academic_year: i32, current_year: i32) -> Self {
    let session_id = normalize::canonical_code(unit.session_id.as_deref().unwrap_or_default());
    let raw_status = unit
      .enrolment_status_alias_description
      .as_deref()
      .unwrap_or_default();

    let (status, points) = if academic_year == current_year {
      (UnitStatus::Unreleased, None)
    } else if raw_status == WITHDRAWN {
      (UnitStatus::from_upstream(raw_status), Some(0.0))
    } else {
      (UnitStatus::from_upstream(raw_status), Some(unit.points_attempted))
    };

    Self {
      code: unit.uos_alpha.clone().unwrap_or_default(),
      name: unit.uos_name.clone().unwrap_or_default(),
      kind: unit.delivery_mode_description.clone().unwrap_or_default(),
      status,
      credit_points: points.map(|p| p.to_string()).unwrap_or_default(),
      academic_year,
      semester_id: normalize::classify_session(&session_id),
      period_name: normalize::period_name(&session_id, academic_year),
      period_order: normalize::period_order(&session_id, academic_year),
      session_description: unit.session_id_description.clone().unwrap_or_default(),
      session_id,
      points: points.unwrap_or_default(),
    }
  }

  /// Whole points this unit adds to its period total; fractions are dropped
  /// per unit before summing.
  pub fn whole_points(&self) -> i64 { self.points.trunc() as i64 }
}

/// Flatten every unit enrolment across `yearly` into units of study.
pub fn units_of_study(yearly: &[YearlyEnrolment], current_year: i32) -> Vec<UnitOfStudy> {
  yearly
    .iter()
    .flat_map(|y| {
      y.units()
        .iter()
        .map(move |u| UnitOfStudy::from_enrolment(u, y.academic_year, current_year))
    })
    .collect()
}

// ─── Periods ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
  pub name:                String,
  pub from:                String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub to:                  Option<String>,
  pub units_of_study:      Vec<UnitOfStudy>,
  pub total_credit_points: i64,
  pub order:               i64,
}

impl Period {
  fn open(unit: UnitOfStudy, semester: &SemesterEnrolment) -> Self {
    let (from, to) = match semester.semester_start_date.as_deref() {
      Some(start) if !start.is_empty() => (start.to_owned(), None),
      _ => (
        "--".to_owned(),
        semester
          .semester_status_date
          .clone()
          .filter(|d| d != NULL_STATUS_DATE),
      ),
    };
    Self {
      name: unit.period_name.clone(),
      from,
      to,
      total_credit_points: unit.whole_points(),
      order: unit.period_order,
      units_of_study: vec![unit],
    }
  }

  fn push(&mut self, unit: UnitOfStudy) {
    self.total_credit_points = self.total_credit_points.saturating_add(unit.whole_points());
    self.units_of_study.push(unit);
  }
}

/// The outcome of grouping units into periods.
#[derive(Debug, Clone, Default)]
pub struct PeriodGrouping {
  /// Periods in creation order.
  pub periods:    Vec<Period>,
  /// Units that neither opened nor joined a period.
  pub unattached: Vec<UnitOfStudy>,
}

/// Locate the semester enrolment for `semester` in `year`.
///
/// Fails with [`Error::SemesterNotFound`] only when no yearly enrolment for
/// `year` carries a semester list at all. A year that is present but lacks the
/// semester id yields `Ok(None)`.
pub fn find_semester(
  yearly: &[YearlyEnrolment],
  year: i32,
  semester: u8,
) -> Result<Option<&SemesterEnrolment>> {
  let mut semester_lists = yearly
    .iter()
    .filter(|y| y.academic_year == year)
    .filter_map(|y| y.semester_enrolments.as_deref());

  if let Some(semesters) = semester_lists.next() {
    let found = semesters
      .iter()
      .find(|s| s.semester_id == Some(i64::from(semester)));
    if found.is_none() {
      tracing::warn!(year, semester, "semester not found in yearly enrolment");
    }
    return Ok(found);
  }

  Err(Error::SemesterNotFound { year, semester })
}

/// Group `units` into periods by period name.
///
/// Pass one opens a period for each unit whose semester can be located and
/// attaches units to periods already open. Pass two retries the leftovers
/// against the periods pass one produced. Anything still unplaced is
/// returned in [`PeriodGrouping::unattached`].
pub fn group_periods(
  units: Vec<UnitOfStudy>,
  yearly: &[YearlyEnrolment],
) -> Result<PeriodGrouping> {
  let mut periods: Vec<Period> = Vec::new();
  let mut leftover = Vec::new();

  for unit in units {
    if let Some(period) = periods.iter_mut().find(|p| p.name == unit.period_name) {
      period.push(unit);
      continue;
    }
    let semester = match unit.semester_id {
      Some(id) => find_semester(yearly, unit.academic_year, id)?,
      None => None,
    };
    match semester {
      Some(semester) => periods.push(Period::open(unit, semester)),
      None => leftover.push(unit),
    }
  }

  let mut unattached = Vec::new();
  for unit in leftover {
    match periods.iter_mut().find(|p| p.name == unit.period_name) {
      Some(period) => period.push(unit),
      None => unattached.push(unit),
    }
  }

  Ok(PeriodGrouping { periods, unattached })
}

/// Most recent period first. The sort is stable, so periods with equal
/// `order` keep their creation order.
pub fn sort_periods(periods: &mut [Period]) { periods.sort_by(|a, b| b.order.cmp(&a.order)); }

// ─── Degree summaries ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DegreeSummary {
  pub name:             String,
  pub minor:            String,
  pub major:            String,
  pub periods:          Vec<Period>,
  pub route:            Option<String>,
  pub enrolment_status: Option<String>,
}

/// `"<level>, <course name>"`, or just the course name when the course type
/// has no known level.
pub fn degree_name(course: &CourseEnrolment) -> String {
  match DegreeLevel::of(course) {
    Some(level) => format!("{level}, {}", course.course_name()),
    None => course.course_name().to_owned(),
  }
}

pub fn degree_summary(course: &CourseEnrolment, current_year: i32) -> Result<DegreeSummary> {
  let yearly = course.yearly_enrolments()?;
  let grouping = group_periods(units_of_study(yearly, current_year), yearly)?;

  for unit in &grouping.unattached {
    tracing::debug!(
      code = %unit.code,
      period = %unit.period_name,
      "unit has no period; omitted from degree summary"
    );
  }

  let mut periods = grouping.periods;
  sort_periods(&mut periods);

  let major = course
    .pathway
    .iter()
    .filter_map(|p| p.pathway_description.as_deref())
    .find(|d| !d.trim().is_empty())
    .unwrap_or("-")
    .to_owned();

  Ok(DegreeSummary {
    name: degree_name(course),
    minor: "-".to_owned(),
    major,
    periods,
    route: course.route.clone(),
    enrolment_status: course.enrolment_status.clone(),
  })
}

/// Degree summaries for every currently-studying course.
///
/// Courses come out in reverse input order, matching the order the client
/// application has always received them in.
pub fn aggregate_degrees(student: &StudentRecord, current_year: i32) -> Result<Vec<DegreeSummary>> {
  student
    .active_courses()?
    .into_iter()
    .rev()
    .map(|course| degree_summary(course, current_year))
    .collect()
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  const NOW: i32 = 2026;

  fn unit(code: &str, session: &str, points: f64, status: &str) -> UnitEnrolment {
    UnitEnrolment {
      uos_alpha: Some(code.into()),
      uos_name: Some(format!("{code} name")),
      delivery_mode_description: Some("Normal (lecture/lab/tutorial) Day".into()),
      enrolment_status_alias_description: Some(status.into()),
      points_attempted: points,
      session_id: Some(session.into()),
      session_id_description: Some(format!("{session} description")),
      ..Default::default()
    }
  }

  fn semester(id: i64, start: Option<&str>) -> SemesterEnrolment {
    SemesterEnrolment {
      semester_id: Some(id),
      semester_status: Some("CS".into()),
      attendance_pattern: Some("FT".into()),
      semester_start_date: start.map(Into::into),
      semester_status_date: None,
    }
  }

  fn year(
    academic_year: i32,
    semesters: Option<Vec<SemesterEnrolment>>,
    units: Vec<UnitEnrolment>,
  ) -> YearlyEnrolment {
    YearlyEnrolment {
      academic_year,
      semester_enrolments: semesters,
      uos_enrolments: Some(units),
    }
  }

  // ── Units ───────────────────────────────────────────────────────────────

  #[test]
  fn status_mapping() {
    assert_eq!(UnitStatus::from_upstream("Normal Completion"), UnitStatus::Completed);
    assert_eq!(
      UnitStatus::from_upstream("Currently enrolled student"),
      UnitStatus::InProgress
    );
    assert_eq!(
      UnitStatus::from_upstream("Discontinued"),
      UnitStatus::Other("Discontinued".into())
    );
  }

  #[test]
  fn current_year_units_are_unreleased() {
    for status in ["Normal Completion", "Withdrawn", "Fail"] {
      let u = UnitOfStudy::from_enrolment(&unit("INFO1110", "S1C", 6.0, status), NOW, NOW);
      assert_eq!(u.status, UnitStatus::Unreleased);
      assert_eq!(u.credit_points, "");
      assert_eq!(u.points, 0.0);
    }
  }

  #[test]
  fn withdrawn_units_carry_zero_credit() {
    let u = UnitOfStudy::from_enrolment(&unit("INFO1110", "S1C", 6.0, "Withdrawn"), 2023, NOW);
    assert_eq!(u.credit_points, "0");
    assert_eq!(u.status, UnitStatus::Other("Withdrawn".into()));
  }

  #[test]
  fn unit_derives_period_metadata() {
    let u = UnitOfStudy::from_enrolment(&unit("MATH1021", "s2cra", 6.0, "Normal Completion"), 2023, NOW);
    assert_eq!(u.session_id, "S2CRA");
    assert_eq!(u.semester_id, Some(2));
    assert_eq!(u.period_name, "Enrolment Year 2023 - Semester 2");
    assert_eq!(u.period_order, 2_023_002);
    assert_eq!(u.credit_points, "6");
    assert_eq!(u.status.as_str(), "COMPLETED");
  }

  #[test]
  fn fractional_points_are_kept() {
    let u = UnitOfStudy::from_enrolment(&unit("LNGS1001", "S1C", 3.5, "Normal Completion"), 2023, NOW);
    assert_eq!(u.credit_points, "3.5");
    assert_eq!(u.points, 3.5);
    assert_eq!(u.whole_points(), 3);
  }

  #[test]
  fn period_total_drops_fractions_per_unit() {
    let yearly = vec![year(
      2023,
      Some(vec![semester(1, Some("2023-03-01"))]),
      vec![
        unit("A", "S1C", 1.5, "Normal Completion"),
        unit("B", "S1C", 1.5, "Normal Completion"),
        unit("C", "S1C", 6.0, "Normal Completion"),
      ],
    )];
    let grouping = group_periods(units_of_study(&yearly, NOW), &yearly).unwrap();
    let p = &grouping.periods[0];
    let points: Vec<_> = p.units_of_study.iter().map(|u| u.credit_points.as_str()).collect();
    assert_eq!(points, ["1.5", "1.5", "6"]);
    assert_eq!(p.total_credit_points, 8);
  }

  #[test]
  fn unit_serializes_with_upstream_field_names() {
    let u = UnitOfStudy::from_enrolment(&unit("MATH1021", "S1C", 6.0, "Normal Completion"), 2023, NOW);
    let v = serde_json::to_value(&u).unwrap();
    assert_eq!(v["type"], "Normal (lecture/lab/tutorial) Day");
    assert_eq!(v["status"], "COMPLETED");
    assert_eq!(v["creditPoints"], "6");
    assert_eq!(v["periodOrder"], 2_023_001);
    assert!(v.get("points").is_none());
  }

  // ── Periods ─────────────────────────────────────────────────────────────

  #[test]
  fn two_units_share_one_period() {
    let yearly = vec![year(
      2023,
      Some(vec![semester(1, Some("2023-03-01"))]),
      vec![
        unit("INFO1110", "S1C", 6.0, "Normal Completion"),
        unit("MATH1021", "S1C", 6.0, "Normal Completion"),
      ],
    )];
    let grouping = group_periods(units_of_study(&yearly, NOW), &yearly).unwrap();

    assert_eq!(grouping.periods.len(), 1);
    let p = &grouping.periods[0];
    assert_eq!(p.name, "Enrolment Year 2023 - Semester 1");
    assert_eq!(p.from, "2023-03-01");
    assert_eq!(p.to, None);
    assert_eq!(p.total_credit_points, 12);
    assert_eq!(p.units_of_study.len(), 2);
    assert!(grouping.unattached.is_empty());
  }

  #[test]
  fn missing_start_date_uses_status_date() {
    let mut s = semester(2, None);
    s.semester_status_date = Some("2023-11-20".into());
    let yearly = vec![year(2023, Some(vec![s]), vec![unit("A", "S2C", 6.0, "Normal Completion")])];
    let grouping = group_periods(units_of_study(&yearly, NOW), &yearly).unwrap();
    assert_eq!(grouping.periods[0].from, "--");
    assert_eq!(grouping.periods[0].to.as_deref(), Some("2023-11-20"));
  }

  #[test]
  fn placeholder_status_date_is_dropped() {
    let mut s = semester(2, None);
    s.semester_status_date = Some("1900-01-01".into());
    let yearly = vec![year(2023, Some(vec![s]), vec![unit("A", "S2C", 6.0, "Normal Completion")])];
    let grouping = group_periods(units_of_study(&yearly, NOW), &yearly).unwrap();
    assert_eq!(grouping.periods[0].from, "--");
    assert_eq!(grouping.periods[0].to, None);
  }

  #[test]
  fn unrecognised_session_without_period_is_dropped() {
    let yearly = vec![year(
      2023,
      Some(vec![semester(1, Some("2023-03-01"))]),
      vec![unit("X", "WIN", 6.0, "Normal Completion")],
    )];
    let grouping = group_periods(units_of_study(&yearly, NOW), &yearly).unwrap();
    assert!(grouping.periods.is_empty());
    assert_eq!(grouping.unattached.len(), 1);
    assert_eq!(grouping.unattached[0].code, "X");
  }

  #[test]
  fn leftover_unit_joins_period_opened_later() {
    // A unit with no semester id cannot open a period, but it joins one
    // of the same name opened by a later unit.
    let mut early = UnitOfStudy::from_enrolment(&unit("EARLY", "S1C", 6.0, "Normal Completion"), 2023, NOW);
    early.semester_id = None;
    let later = UnitOfStudy::from_enrolment(&unit("LATER", "S1CRA", 6.0, "Normal Completion"), 2023, NOW);
    let yearly = vec![year(2023, Some(vec![semester(1, Some("2023-03-01"))]), vec![])];

    let grouping = group_periods(vec![early, later], &yearly).unwrap();
    assert_eq!(grouping.periods.len(), 1);
    let codes: Vec<_> = grouping.periods[0]
      .units_of_study
      .iter()
      .map(|u| u.code.as_str())
      .collect();
    assert_eq!(codes, ["LATER", "EARLY"]);
    assert_eq!(grouping.periods[0].total_credit_points, 12);
    assert!(grouping.unattached.is_empty());
  }

  #[test]
  fn unknown_semester_id_in_known_year_is_skipped() {
    let yearly = vec![year(
      2023,
      Some(vec![semester(1, Some("2023-03-01"))]),
      vec![unit("A", "S2C", 6.0, "Normal Completion")],
    )];
    let grouping = group_periods(units_of_study(&yearly, NOW), &yearly).unwrap();
    assert!(grouping.periods.is_empty());
    assert_eq!(grouping.unattached.len(), 1);
  }

  #[test]
  fn unknown_year_is_an_error() {
    let yearly = vec![year(2023, Some(vec![semester(1, Some("2023-03-01"))]), vec![])];
    let orphan = UnitOfStudy::from_enrolment(&unit("A", "S1C", 6.0, "Normal Completion"), 2021, NOW);
    let r = group_periods(vec![orphan], &yearly);
    assert!(matches!(
      r,
      Err(Error::SemesterNotFound { year: 2021, semester: 1 })
    ));
  }

  #[test]
  fn year_without_semester_list_counts_as_missing() {
    let yearly = vec![year(2023, None, vec![])];
    assert!(matches!(
      find_semester(&yearly, 2023, 1),
      Err(Error::SemesterNotFound { .. })
    ));
  }

  #[test]
  fn periods_sort_most_recent_first_and_stably() {
    let mk = |name: &str, order: i64| Period {
      name: name.into(),
      from: "--".into(),
      to: None,
      units_of_study: vec![],
      total_credit_points: 0,
      order,
    };
    let mut periods = vec![mk("a", 2_022_001), mk("b", 2_023_002), mk("c", 2_022_001), mk("d", 2_023_001)];
    sort_periods(&mut periods);
    let names: Vec<_> = periods.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["b", "d", "a", "c"]);
  }

  // ── Degrees ─────────────────────────────────────────────────────────────

  #[test]
  fn degree_level_from_course_type() {
    assert_eq!(DegreeLevel::from_course_type("PC"), Some(DegreeLevel::Postgraduate));
    assert_eq!(DegreeLevel::from_course_type("PR"), Some(DegreeLevel::Postgraduate));
    assert_eq!(DegreeLevel::from_course_type("UC"), Some(DegreeLevel::Undergraduate));
    assert_eq!(DegreeLevel::from_course_type("XX"), None);
  }

  #[test]
  fn undergraduate_degree_name() {
    let course = CourseEnrolment {
      course_type: Some("UC".into()),
      course_name: Some("Bachelor of Science".into()),
      ..Default::default()
    };
    assert_eq!(degree_name(&course), "Undergraduate, Bachelor of Science");
  }

  #[test]
  fn aggregate_degrees_reverses_active_courses() {
    let student: StudentRecord = serde_json::from_value(json!({
      "courseEnrolments": [
        {
          "enrolmentStatus": "CS", "courseType": "UC", "courseName": "Bachelor of Arts",
          "route": "A001", "yearlyEnrolments": []
        },
        { "enrolmentStatus": "DC", "courseName": "Dropped", "yearlyEnrolments": [] },
        {
          "enrolmentStatus": "CS", "courseType": "PC", "courseName": "Master of IT",
          "route": "M002",
          "pathway": [{ "pathwayCode": "M-1", "pathwayDescription": "" },
                      { "pathwayCode": "M-2", "pathwayDescription": "Software" }],
          "yearlyEnrolments": []
        }
      ]
    }))
    .unwrap();

    let degrees = aggregate_degrees(&student, NOW).unwrap();
    let names: Vec<_> = degrees.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["Postgraduate, Master of IT", "Undergraduate, Bachelor of Arts"]);
    assert_eq!(degrees[0].major, "Software");
    assert_eq!(degrees[1].major, "-");
    assert_eq!(degrees[0].minor, "-");
    assert_eq!(degrees[0].route.as_deref(), Some("M002"));
    assert_eq!(degrees[0].enrolment_status.as_deref(), Some("CS"));
  }

  #[test]
  fn active_course_without_years_is_malformed() {
    let student: StudentRecord = serde_json::from_value(json!({
      "courseEnrolments": [{ "enrolmentStatus": "CS", "courseName": "A" }]
    }))
    .unwrap();
    assert!(matches!(aggregate_degrees(&student, NOW), Err(Error::MalformedInput(_))));
  }
}
