//! Session-code normalisation and classification shared by both pipelines.
//!
//! Session codes arrive from upstream with inconsistent case and stray
//! whitespace. Every comparison in this crate goes through
//! [`canonical_code`] first.

use serde::Serialize;

const SEMESTER_1_CODES: [&str; 3] = ["S1C", "S1CRA", "S1CRB"];
const SEMESTER_2_CODES: [&str; 3] = ["S2C", "S2CRA", "S2CRB"];

// Keeps `year * 1000 + ...` strictly increasing across years.
const MAX_INTENSIVE_OFFSET: i64 = 899;
const MAX_OTHER_OFFSET: i64 = 999;

/// The broad category a session code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
  Semester1,
  Semester2,
  Intensive,
  Other,
}

/// Trim and upper-case a session or session-group code.
pub fn canonical_code(code: &str) -> String { code.trim().to_ascii_uppercase() }

pub fn session_kind(session_id: &str) -> SessionKind {
  let code = canonical_code(session_id);
  if SEMESTER_1_CODES.contains(&code.as_str()) {
    SessionKind::Semester1
  } else if SEMESTER_2_CODES.contains(&code.as_str()) {
    SessionKind::Semester2
  } else if is_intensive(&code) {
    SessionKind::Intensive
  } else {
    SessionKind::Other
  }
}

/// The semester number (1 or 2) for the six canonical semester codes.
pub fn classify_session(session_id: &str) -> Option<u8> {
  match session_kind(session_id) {
    SessionKind::Semester1 => Some(1),
    SessionKind::Semester2 => Some(2),
    SessionKind::Intensive | SessionKind::Other => None,
  }
}

/// Intensive sessions contain `S?CI`, e.g. `S1CIAU` or `S2CIJL`.
pub fn is_intensive(session_id: &str) -> bool {
  let chars: Vec<char> = canonical_code(session_id).chars().collect();
  chars
    .windows(4)
    .any(|w| w[0] == 'S' && w[2] == 'C' && w[3] == 'I')
}

pub fn period_name(session_id: &str, year: i32) -> String {
  match session_kind(session_id) {
    SessionKind::Semester1 => format!("Enrolment Year {year} - Semester 1"),
    SessionKind::Semester2 => format!("Enrolment Year {year} - Semester 2"),
    SessionKind::Intensive => format!("Enrolment Year {year} - Intensive"),
    SessionKind::Other => {
      format!("Enrolment Year {year} - {}", canonical_code(session_id))
    }
  }
}

/// Sort key for a period: `year * 1000` plus a per-kind offset.
///
/// Semester 1 and 2 take offsets 1 and 2, intensive sessions `100 + digits`,
/// and anything else the bare digits of its code.
pub fn period_order(session_id: &str, year: i32) -> i64 {
  let base = i64::from(year) * 1000;
  match session_kind(session_id) {
    SessionKind::Semester1 => base + 1,
    SessionKind::Semester2 => base + 2,
    SessionKind::Intensive => {
      base + 100 + digits_of(session_id).min(MAX_INTENSIVE_OFFSET)
    }
    SessionKind::Other => base + digits_of(session_id).min(MAX_OTHER_OFFSET),
  }
}

/// The decimal digits of `code` read as one number; `0` when there are none.
fn digits_of(code: &str) -> i64 {
  code
    .chars()
    .filter_map(|c| c.to_digit(10))
    .fold(0i64, |acc, d| acc.saturating_mul(10).saturating_add(i64::from(d)))
}
