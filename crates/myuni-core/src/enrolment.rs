//! Raw enrolment tree as delivered by the upstream student API.
//!
//! Field names follow the upstream JSON (`camelCase`). Nearly everything is
//! optional upstream; accessors that the engines cannot work without return
//! [`Error::MalformedInput`] instead.
//!
//! Numeric fields are read leniently: upstream sends some of them as numbers
//! and some as strings (`"semesterId": "1"`).

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Course enrolment status for a currently-studying course.
pub const ACTIVE_STATUS: &str = "CS";

// ─── Tree ────────────────────────────────────────────────────────────────────

/// One student's record: the root of the enrolment tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
  #[serde(default)]
  pub title_description: Option<String>,
  #[serde(default)]
  pub official_name:     Option<String>,
  #[serde(default)]
  pub course_enrolments: Option<Vec<CourseEnrolment>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseEnrolment {
  #[serde(default)]
  pub enrolment_status:  Option<String>,
  #[serde(default)]
  pub course_name:       Option<String>,
  /// `PC`, `PR` or `UC`; anything else has no degree level.
  #[serde(default)]
  pub course_type:       Option<String>,
  #[serde(default)]
  pub route:             Option<String>,
  #[serde(default)]
  pub pathway:           Vec<Pathway>,
  #[serde(default)]
  pub yearly_enrolments: Option<Vec<YearlyEnrolment>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pathway {
  #[serde(default)]
  pub pathway_code:        Option<String>,
  #[serde(default)]
  pub pathway_description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyEnrolment {
  #[serde(deserialize_with = "lenient::int")]
  pub academic_year:       i32,
  #[serde(default)]
  pub semester_enrolments: Option<Vec<SemesterEnrolment>>,
  #[serde(default)]
  pub uos_enrolments:      Option<Vec<UnitEnrolment>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterEnrolment {
  #[serde(default, deserialize_with = "lenient::opt_int")]
  pub semester_id:          Option<i64>,
  #[serde(default)]
  pub semester_status:      Option<String>,
  /// e.g. `FT` or `PT`, possibly with a suffix.
  #[serde(default)]
  pub attendance_pattern:   Option<String>,
  #[serde(default)]
  pub semester_start_date:  Option<String>,
  #[serde(default)]
  pub semester_status_date: Option<String>,
}

/// A single unit-of-study enrolment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitEnrolment {
  #[serde(default)]
  pub uos_alpha:                          Option<String>,
  #[serde(default)]
  pub uos_name:                           Option<String>,
  #[serde(default)]
  pub delivery_mode_description:          Option<String>,
  #[serde(default)]
  pub enrolment_status_alias_description: Option<String>,
  /// Decimal; half points occur.
  #[serde(default, deserialize_with = "lenient::points")]
  pub points_attempted:                   f64,
  #[serde(default)]
  pub session_id:                         Option<String>,
  #[serde(default)]
  pub session_id_description:             Option<String>,
  #[serde(default)]
  pub campus:                             Option<String>,
  #[serde(default)]
  pub campus_description:                 Option<String>,
}

// ─── Accessors ───────────────────────────────────────────────────────────────

impl StudentRecord {
  pub fn course_enrolments(&self) -> Result<&[CourseEnrolment]> {
    self
      .course_enrolments
      .as_deref()
      .ok_or_else(|| Error::MalformedInput("student record has no courseEnrolments".into()))
  }

  /// Currently-studying course enrolments, in input order.
  pub fn active_courses(&self) -> Result<Vec<&CourseEnrolment>> {
    Ok(
      self
        .course_enrolments()?
        .iter()
        .filter(|c| c.is_active())
        .collect(),
    )
  }

  /// `"{title} {official name}"`, skipping whichever part is missing.
  pub fn full_name(&self) -> String {
    [self.title_description.as_deref(), self.official_name.as_deref()]
      .into_iter()
      .flatten()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .collect::<Vec<_>>()
      .join(" ")
  }
}

impl CourseEnrolment {
  pub fn is_active(&self) -> bool {
    self.enrolment_status.as_deref() == Some(ACTIVE_STATUS)
  }

  pub fn yearly_enrolments(&self) -> Result<&[YearlyEnrolment]> {
    self.yearly_enrolments.as_deref().ok_or_else(|| {
      Error::MalformedInput(format!(
        "course enrolment {:?} has no yearlyEnrolments",
        self.course_name.as_deref().unwrap_or_default()
      ))
    })
  }

  pub fn course_name(&self) -> &str { self.course_name.as_deref().unwrap_or_default() }
}

impl YearlyEnrolment {
  pub fn units(&self) -> &[UnitEnrolment] { self.uos_enrolments.as_deref().unwrap_or_default() }
}

// ─── Lenient numbers ─────────────────────────────────────────────────────────

mod lenient {
  use serde::{Deserialize, Deserializer, de::Error as _};

  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Number {
    Int(i64),
    Float(f64),
    Text(String),
  }

  impl Number {
    fn into_i64(self) -> Option<i64> {
      match self {
        Number::Int(n) => Some(n),
        Number::Float(f) if f.is_finite() => Some(f.trunc() as i64),
        Number::Float(_) => None,
        Number::Text(s) => leading_int(&s),
      }
    }
  }

  /// Leading integer of `s`, ignoring surrounding whitespace and any trailing
  /// non-digit text (`"6.0"` → 6, `"2 "` → 2).
  fn leading_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let (sign, rest) = match s.strip_prefix('-') {
      Some(rest) => (-1, rest),
      None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse::<i64>().ok().map(|n| sign * n)
  }

  pub fn int<'de, D>(d: D) -> Result<i32, D::Error>
  where
    D: Deserializer<'de>,
  {
    Number::deserialize(d)?
      .into_i64()
      .and_then(|n| i32::try_from(n).ok())
      .ok_or_else(|| D::Error::custom("expected an integer"))
  }

  pub fn opt_int<'de, D>(d: D) -> Result<Option<i64>, D::Error>
  where
    D: Deserializer<'de>,
  {
    Ok(Option::<Number>::deserialize(d)?.and_then(Number::into_i64))
  }

  /// Credit points, kept as given (`3.5`, `"1.5"`). Missing, negative,
  /// non-finite or unparseable values count as zero.
  pub fn points<'de, D>(d: D) -> Result<f64, D::Error>
  where
    D: Deserializer<'de>,
  {
    let points = match Option::<Number>::deserialize(d)? {
      Some(Number::Int(n)) => n as f64,
      Some(Number::Float(f)) => f,
      Some(Number::Text(s)) => s.trim().parse::<f64>().unwrap_or_default(),
      None => 0.0,
    };
    Ok(if points.is_finite() && points > 0.0 { points } else { 0.0 })
  }

}
