//! Calendar records and the interval indexes extracted from them.
//!
//! The institutional calendar feed is a flat JSON object of opaque keys to
//! records. Two kinds of record matter here:
//!
//! - **teaching ranges**: tagged as session dates and carrying an end date;
//!   the session id is the parenthesised code in the title, e.g.
//!   `"Semester 1 (S1C)"`;
//! - **overrides**: breaks, STUVAC and exam periods that replace regular
//!   teaching weeks, e.g. `"STUVAC (Semester 1)"`.
//!
//! A record that fits neither, or whose dates cannot be read, is ignored.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, normalize};

/// Tag carried by records that define a session's teaching dates.
pub const SESSION_DATES_TAG: &str = "Student website : Filter by... / Session dates";

// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarRecord {
  pub start_date: String,
  #[serde(default)]
  pub end_date:   Option<String>,
  #[serde(rename = "jcr:title")]
  pub title:      String,
  #[serde(default)]
  pub tags:       Vec<String>,
}

/// Calendar records by their feed key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CalendarRecords(pub BTreeMap<String, CalendarRecord>);

impl CalendarRecords {
  /// Read records from the feed's JSON object, skipping entries that do not
  /// deserialize as a [`CalendarRecord`].
  pub fn from_json(value: serde_json::Value) -> Result<Self> {
    let serde_json::Value::Object(entries) = value else {
      return Err(Error::MalformedInput("calendar feed is not a JSON object".into()));
    };

    let mut records = BTreeMap::new();
    for (key, entry) in entries {
      match serde_json::from_value::<CalendarRecord>(entry) {
        Ok(record) => {
          records.insert(key, record);
        }
        Err(e) => tracing::debug!(%key, error = %e, "skipping unreadable calendar record"),
      }
    }
    Ok(Self(records))
  }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl FromIterator<(String, CalendarRecord)> for CalendarRecords {
  fn from_iter<I: IntoIterator<Item = (String, CalendarRecord)>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

// ─── Session keys ────────────────────────────────────────────────────────────

/// `"{year}-{sessionId}"`, e.g. `2024-S1C`. The session id is canonical
/// (trimmed, upper-case).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionKey {
  pub year:       i32,
  pub session_id: String,
}

impl SessionKey {
  pub fn new(year: i32, session_id: &str) -> Self {
    Self {
      year,
      session_id: normalize::canonical_code(session_id),
    }
  }
}

impl fmt::Display for SessionKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.year, self.session_id)
  }
}

impl FromStr for SessionKey {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let invalid = || Error::InvalidSessionKey(s.to_owned());
    let (year, id) = s.trim().split_once('-').ok_or_else(invalid)?;
    let year = year.trim().parse().map_err(|_| invalid())?;
    let key = Self::new(year, id);
    if key.session_id.is_empty() {
      return Err(invalid());
    }
    Ok(key)
  }
}

// ─── Intervals ───────────────────────────────────────────────────────────────

/// A session's teaching period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeachingRange {
  pub start_date: NaiveDate,
  pub end_date:   NaiveDate,
  pub title:      String,
}

/// A break, STUVAC or exam period inside a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideInterval {
  pub start_date: NaiveDate,
  pub end_date:   NaiveDate,
  /// Title with any parenthesised session name removed.
  pub title:      String,
}

/// Everything [`extract_ranges`] learns from one batch of records.
#[derive(Debug, Clone, Default)]
pub struct CalendarIndex {
  pub teaching:      BTreeMap<SessionKey, TeachingRange>,
  /// Sorted ascending by start date.
  pub overrides:     BTreeMap<SessionKey, Vec<OverrideInterval>>,
  /// Human session name (title text before the parenthesis).
  pub session_names: BTreeMap<SessionKey, String>,
}

/// Build the teaching-range and override indexes from raw records.
pub fn extract_ranges(records: &CalendarRecords) -> CalendarIndex {
  let mut index = CalendarIndex::default();
  // Lower-cased session name → session id, for resolving exam periods.
  let mut session_ids: BTreeMap<String, String> = BTreeMap::new();

  for (key, record) in &records.0 {
    if !record.tags.iter().any(|t| t == SESSION_DATES_TAG) {
      continue;
    }
    let Some(end) = record.end_date.as_deref() else { continue };
    let (Some(start_date), Some(end_date)) = (parse_date(&record.start_date), parse_date(end)) else {
      tracing::debug!(%key, "skipping session dates with unreadable dates");
      continue;
    };
    let Some(session_id) = session_id_from_title(&record.title) else {
      tracing::debug!(%key, title = %record.title, "no session id in session dates title");
      continue;
    };

    let name = title_name(&record.title);
    let session = SessionKey::new(start_date.year(), &session_id);
    session_ids.insert(name.to_lowercase(), session.session_id.clone());
    index.session_names.insert(session.clone(), name);
    index.teaching.insert(session, TeachingRange {
      start_date,
      end_date,
      title: record.title.clone(),
    });
  }

  for (key, record) in &records.0 {
    let Some(kind) = OverrideKind::of(&record.title) else { continue };

    let session = match kind {
      OverrideKind::ExamPeriod => exam_period_session(key, &record.title, &session_ids),
      OverrideKind::Break => session_from_key(key),
    };
    let Some(session) = session else {
      tracing::debug!(%key, title = %record.title, "cannot place override in a session");
      continue;
    };

    let end = record.end_date.as_deref().unwrap_or(&record.start_date);
    let (Some(start_date), Some(end_date)) = (parse_date(&record.start_date), parse_date(end)) else {
      tracing::debug!(%key, "skipping override with unreadable dates");
      continue;
    };

    index.overrides.entry(session).or_default().push(OverrideInterval {
      start_date,
      end_date,
      title: title_name(&record.title),
    });
  }

  for intervals in index.overrides.values_mut() {
    intervals.sort_by_key(|i| i.start_date);
  }

  index
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OverrideKind {
  /// Breaks and STUVAC; their session is encoded in the record key.
  Break,
  /// Exam periods; their session is named in the title.
  ExamPeriod,
}

impl OverrideKind {
  fn of(title: &str) -> Option<Self> {
    let lower = title.trim_start().to_lowercase();
    if lower.starts_with("exam period") {
      Some(Self::ExamPeriod)
    } else if lower.contains("stuvac") || lower.contains("break") {
      Some(Self::Break)
    } else {
      None
    }
  }
}

// ─── Title and key parsing ───────────────────────────────────────────────────

/// Text before the first `(`, trimmed.
fn title_name(title: &str) -> String {
  title.split('(').next().unwrap_or_default().trim().to_owned()
}

/// The parenthesised session code in a title: `"Semester 1 (S1C)"` → `S1C`.
///
/// The code must start with `S` and a digit.
pub fn session_id_from_title(title: &str) -> Option<String> {
  title.match_indices('(').find_map(|(i, _)| {
    let rest = &title[i + 1..];
    let mut chars = rest.chars();
    let starts_like_code = matches!(chars.next(), Some('S' | 's'))
      && chars.next().is_some_and(|c| c.is_ascii_digit());
    if !starts_like_code {
      return None;
    }
    let close = rest.find(')')?;
    Some(normalize::canonical_code(&rest[..close]))
  })
}

/// Break and STUVAC keys look like `"2024-s1c-mid-semester-break"`.
fn session_from_key(key: &str) -> Option<SessionKey> {
  let mut parts = key.split('-');
  let year = parts.next()?.trim().parse().ok()?;
  let id = parts.next().filter(|id| !id.trim().is_empty())?;
  Some(SessionKey::new(year, id))
}

/// Exam periods name their session in the title, e.g.
/// `"Exam period (Semester 1)"`; the year still comes from the key.
fn exam_period_session(
  key: &str,
  title: &str,
  session_ids: &BTreeMap<String, String>,
) -> Option<SessionKey> {
  let year = key.split('-').next()?.trim().parse().ok()?;
  let open = title.find('(')?;
  let close = open + title[open..].find(')')?;
  let name = title[open + 1..close].trim().to_lowercase();
  session_ids.get(&name).map(|id| SessionKey::new(year, id))
}

/// Parse a feed date: RFC 3339, a naive date-time, or a bare date.
///
/// Only the calendar date matters; an offset is honoured by taking the date
/// as written rather than converting to UTC.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
  let raw = raw.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Some(dt.date_naive());
  }
  if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
    return Some(dt.date());
  }
  NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

  fn feed() -> CalendarRecords {
    CalendarRecords::from_json(json!({
      "2024-s1c-teaching-dates": {
        "startDate": "2024-02-26T00:00:00.000+11:00",
        "endDate": "2024-06-02T00:00:00.000+10:00",
        "jcr:title": "Semester 1 (S1C)",
        "tags": [SESSION_DATES_TAG]
      },
      "2024-s2c-teaching-dates": {
        "startDate": "2024-08-05",
        "endDate": "2024-11-03",
        "jcr:title": "Semester 2 (s2c)",
        "tags": [SESSION_DATES_TAG, "other"]
      },
      "2024-s1c-census": {
        "startDate": "2024-03-31",
        "jcr:title": "Census date (S1C)",
        "tags": [SESSION_DATES_TAG]
      },
      "2024-s1c-stuvac": {
        "startDate": "2024-05-27",
        "endDate": "2024-06-02",
        "jcr:title": "STUVAC (Semester 1)",
        "tags": []
      },
      "2024-s1c-mid-semester-break": {
        "startDate": "2024-04-01",
        "endDate": "2024-04-07",
        "jcr:title": "Mid-semester break (Semester 1)",
        "tags": []
      },
      "2024-exams-1": {
        "startDate": "2024-06-08",
        "endDate": "2024-06-22",
        "jcr:title": "Exam period (Semester 1)",
        "tags": []
      },
      "2024-exams-x": {
        "startDate": "2024-06-08",
        "endDate": "2024-06-22",
        "jcr:title": "Exam period (Summer School)",
        "tags": []
      },
      "garbage": { "title": "no start date" },
      "not-an-object": 42
    }))
    .unwrap()
  }

  #[test]
  fn unreadable_records_are_skipped() {
    let records = feed();
    assert_eq!(records.len(), 7);
    assert!(!records.0.contains_key("garbage"));
  }

  #[test]
  fn non_object_feed_is_malformed() {
    assert!(matches!(
      CalendarRecords::from_json(json!([1, 2])),
      Err(Error::MalformedInput(_))
    ));
  }

  #[test]
  fn teaching_ranges_need_tag_and_end_date() {
    let index = extract_ranges(&feed());
    let keys: Vec<_> = index.teaching.keys().map(ToString::to_string).collect();
    assert_eq!(keys, ["2024-S1C", "2024-S2C"]);

    let s1 = &index.teaching[&SessionKey::new(2024, "S1C")];
    assert_eq!(s1.start_date, date(2024, 2, 26));
    assert_eq!(s1.end_date, date(2024, 6, 2));
    assert_eq!(s1.title, "Semester 1 (S1C)");
    assert_eq!(index.session_names[&SessionKey::new(2024, "S1C")], "Semester 1");
  }

  #[test]
  fn overrides_are_grouped_and_sorted() {
    let index = extract_ranges(&feed());
    let s1 = &index.overrides[&SessionKey::new(2024, "S1C")];
    let titles: Vec<_> = s1.iter().map(|o| o.title.as_str()).collect();
    assert_eq!(titles, ["Mid-semester break", "STUVAC", "Exam period"]);
    assert_eq!(index.overrides.len(), 1);
  }

  #[test]
  fn exam_period_with_unknown_session_name_is_ignored() {
    let index = extract_ranges(&feed());
    let all: usize = index.overrides.values().map(Vec::len).sum();
    assert_eq!(all, 3);
  }

  #[test]
  fn session_id_in_title() {
    assert_eq!(session_id_from_title("Semester 1 (S1C)").as_deref(), Some("S1C"));
    assert_eq!(session_id_from_title("Winter (June) (s1cijl)").as_deref(), Some("S1CIJL"));
    assert_eq!(session_id_from_title("Semester 1 (Semester)"), None);
    assert_eq!(session_id_from_title("Semester 1 (S1C"), None);
    assert_eq!(session_id_from_title("Semester 1"), None);
  }

  #[test]
  fn session_key_round_trip_and_case() {
    let key: SessionKey = "2024-s1c".parse().unwrap();
    assert_eq!(key, SessionKey::new(2024, "S1C"));
    assert_eq!(key.to_string(), "2024-S1C");
    assert!("2024".parse::<SessionKey>().is_err());
    assert!("x-S1C".parse::<SessionKey>().is_err());
    assert!("2024-".parse::<SessionKey>().is_err());
  }

  #[test]
  fn date_formats() {
    assert_eq!(parse_date("2024-02-26"), Some(date(2024, 2, 26)));
    assert_eq!(parse_date("2024-02-26T00:00:00.000+11:00"), Some(date(2024, 2, 26)));
    assert_eq!(parse_date("2024-02-26T23:30:00Z"), Some(date(2024, 2, 26)));
    assert_eq!(parse_date("2024-02-26T08:00:00"), Some(date(2024, 2, 26)));
    assert_eq!(parse_date("26/02/2024"), None);
  }
}
