//! Client for the institutional dates feed.

use std::time::Duration;

use myuni_core::{calendar::CalendarRecords, source::CalendarFeed};
use reqwest::Client;

use crate::{Error, Result, config::CalendarConfig};

pub struct CalendarClient {
  client: Client,
  url:    String,
}

impl CalendarClient {
  pub fn new(config: &CalendarConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self {
      client,
      url: config.url.clone(),
    })
  }
}

/// Records from a feed body. Unreadable entries are skipped; a body that is
/// not a JSON object is malformed.
pub fn parse_feed(body: serde_json::Value) -> Result<CalendarRecords> {
  CalendarRecords::from_json(body).map_err(|e| Error::MalformedResponse(e.to_string()))
}

impl CalendarFeed for CalendarClient {
  type Error = Error;

  async fn calendar_records(&self) -> Result<CalendarRecords> {
    let resp = self.client.get(&self.url).send().await?;
    if !resp.status().is_success() {
      return Err(Error::Status {
        what:   "calendar feed",
        status: resp.status(),
      });
    }
    let records = parse_feed(resp.json().await?)?;
    tracing::debug!(url = %self.url, records = records.len(), "calendar feed loaded");
    Ok(records)
  }
}
