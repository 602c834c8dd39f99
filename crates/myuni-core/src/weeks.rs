//! Study weeks: a session's teaching period cut into Monday-to-Monday weeks,
//! with breaks, STUVAC and exam periods substituted for regular weeks.

use std::{collections::BTreeMap, iter};

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use crate::calendar::{CalendarIndex, CalendarRecords, OverrideInterval, SessionKey, TeachingRange, extract_ranges};

const WEEK: Days = Days::new(7);

/// One labelled week, `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Week {
  #[serde(serialize_with = "iso_instant")]
  pub start: DateTime<Utc>,
  #[serde(serialize_with = "iso_instant")]
  pub end:   DateTime<Utc>,
  pub name:  String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionWeeks {
  pub name:  String,
  pub weeks: Vec<Week>,
}

/// `2024-02-26T00:00:00.000Z`
fn iso_instant<S: Serializer>(at: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
  s.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// The Monday on or before `date`; `None` past the calendar's range.
pub fn start_of_week(date: NaiveDate) -> Option<NaiveDate> {
  date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
}

/// The Monday after `date`'s week; weeks are half-open.
pub fn end_of_week(date: NaiveDate) -> Option<NaiveDate> { start_of_week(date)?.checked_add_days(WEEK) }

fn midnight(date: NaiveDate) -> DateTime<Utc> { date.and_time(NaiveTime::MIN).and_utc() }

/// Drop a parenthesised part (and the space before it) from a title:
/// `"STUVAC (Semester 1)"` → `"STUVAC"`.
pub fn strip_parenthetical(title: &str) -> String {
  match (title.find(" ("), title.rfind(')')) {
    (Some(open), Some(close)) if close > open => format!("{}{}", &title[..open], &title[close + 1..]),
    _ => title.to_owned(),
  }
}

/// An override interval widened to whole weeks.
struct OverrideWindow<'a> {
  start: NaiveDate,
  end:   NaiveDate,
  title: &'a str,
}

impl<'a> OverrideWindow<'a> {
  fn of(o: &'a OverrideInterval) -> Option<Self> {
    Some(Self {
      start: start_of_week(o.start_date)?,
      end:   end_of_week(o.end_date)?,
      title: &o.title,
    })
  }

  /// Either window contains the other.
  fn covers(&self, start: NaiveDate, end: NaiveDate) -> bool {
    (start <= self.start && end >= self.end) || (start >= self.start && end <= self.end)
  }
}

/// Weeks covering `[start_of_week(range.start), end_of_week(range.end))`.
///
/// `overrides` must be sorted by start date. They are consumed in order: an
/// override is passed once a week reaches its end, and is never looked at
/// again. Only regular weeks are numbered. Overrides whose weeks fall outside
/// the calendar are ignored.
///
/// `None` when the range's own weeks fall outside the calendar.
pub fn session_weeks(range: &TeachingRange, overrides: &[OverrideInterval]) -> Option<Vec<Week>> {
  let session_start = start_of_week(range.start_date)?;
  let session_end = end_of_week(range.end_date)?;
  let week_starts = iter::successors(Some(session_start), |d| d.checked_add_days(WEEK))
    .take_while(|d| *d < session_end);

  let mut pending = overrides.iter().filter_map(OverrideWindow::of).peekable();
  let mut teaching_week = 1;
  let mut weeks = Vec::new();

  for start in week_starts {
    let end = start.checked_add_days(WEEK)?;
    while pending.next_if(|o| o.end <= start).is_some() {}

    let name = match pending.peek() {
      Some(o) if o.covers(start, end) => {
        let name = strip_parenthetical(o.title);
        if end >= o.end {
          pending.next();
        }
        name
      }
      _ => {
        let name = format!("Week {teaching_week}");
        teaching_week += 1;
        name
      }
    };

    weeks.push(Week {
      start: midnight(start),
      end: midnight(end),
      name,
    });
  }

  Some(weeks)
}

/// Weeks for each requested `"{year}-{sessionId}"` (case-insensitive).
///
/// Output is keyed by the request string as given. Requests that do not
/// parse or have no teaching range are logged and left out.
pub fn build_weeks<S>(requested: &[S], index: &CalendarIndex) -> BTreeMap<String, SessionWeeks>
where
  S: AsRef<str>,
{
  let mut out = BTreeMap::new();

  for raw in requested {
    let raw = raw.as_ref();
    let key: SessionKey = match raw.parse() {
      Ok(key) => key,
      Err(e) => {
        tracing::warn!(request = raw, error = %e, "ignoring session request");
        continue;
      }
    };
    let Some(range) = index.teaching.get(&key) else {
      tracing::warn!(session = %key, "session not found");
      continue;
    };

    let overrides = index.overrides.get(&key).map(Vec::as_slice).unwrap_or_default();
    let Some(weeks) = session_weeks(range, overrides) else {
      tracing::warn!(session = %key, "session dates out of range");
      continue;
    };
    out.insert(raw.to_owned(), SessionWeeks {
      name: index.session_names.get(&key).cloned().unwrap_or_default(),
      weeks,
    });
  }

  out
}

/// Extract intervals from `records` and build weeks for `requested`.
pub fn build_study_weeks<S>(records: &CalendarRecords, requested: &[S]) -> BTreeMap<String, SessionWeeks>
where
  S: AsRef<str>,
{
  build_weeks(requested, &extract_ranges(records))
}
