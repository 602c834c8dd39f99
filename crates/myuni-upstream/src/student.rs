//! Client for the upstream enrolment REST API.
//!
//! `GET {url}/v1/students/enrolment/list?SID={id}` with basic auth and, when
//! configured, a client certificate. Connection details come from a
//! [`SecretProvider`] on first use and are kept for the life of the client.

use std::time::Duration;

use myuni_core::{enrolment::StudentRecord, source::{EnrolmentSource, SecretProvider}};
use reqwest::{Client, Identity};
use serde::Deserialize;
use tokio::sync::OnceCell;

use crate::{Error, Result, config::StudentApiConfig};

/// Resolved connection details.
struct Connection {
  client:   Client,
  base_url: String,
  username: String,
  password: String,
}

pub struct StudentApiClient<P> {
  config:     StudentApiConfig,
  secrets:    P,
  connection: OnceCell<Connection>,
}

impl<P: SecretProvider> StudentApiClient<P> {
  pub fn new(config: StudentApiConfig, secrets: P) -> Self {
    Self {
      config,
      secrets,
      connection: OnceCell::new(),
    }
  }

  async fn secret(&self, name: &str) -> Result<String> {
    self
      .secrets
      .secret(name)
      .await
      .map_err(|e| Error::Secret(Box::new(e)))
  }

  async fn connection(&self) -> Result<&Connection> {
    self.connection.get_or_try_init(|| self.connect()).await
  }

  async fn connect(&self) -> Result<Connection> {
    let (base_url, username, password) = futures::try_join!(
      self.secret(&self.config.url_secret),
      self.secret(&self.config.username_secret),
      self.secret(&self.config.password_secret),
    )?;

    let mut builder = Client::builder()
      .timeout(Duration::from_secs(self.config.timeout_secs))
      .danger_accept_invalid_certs(self.config.accept_invalid_certs);

    if let (Some(cert_name), Some(key_name)) =
      (&self.config.certificate_secret, &self.config.private_key_secret)
    {
      let (cert, key) = futures::try_join!(self.secret(cert_name), self.secret(key_name))?;
      let identity = Identity::from_pem(format!("{cert}\n{key}").as_bytes())?;
      builder = builder.identity(identity);
    }

    tracing::debug!(%base_url, "student API connection ready");
    Ok(Connection {
      client: builder.build()?,
      base_url,
      username,
      password,
    })
  }
}

/// Body of the enrolment list endpoint.
#[derive(Debug, Deserialize)]
struct EnrolmentList {
  #[serde(default)]
  students: Option<Vec<StudentRecord>>,
}

/// The first student in an enrolment list body.
///
/// A body without a `students` field is malformed; an empty list means the
/// student is unknown.
pub fn parse_enrolment_list(body: serde_json::Value) -> Result<Option<StudentRecord>> {
  let list: EnrolmentList = serde_json::from_value(body)?;
  let students = list
    .students
    .ok_or_else(|| Error::MalformedResponse("enrolment list has no students".into()))?;
  Ok(students.into_iter().next())
}

impl<P: SecretProvider> EnrolmentSource for StudentApiClient<P> {
  type Error = Error;

  async fn student_record(&self, student_id: &str) -> Result<Option<StudentRecord>> {
    let conn = self.connection().await?;
    let url = format!("{}/v1/students/enrolment/list", conn.base_url.trim_end_matches('/'));

    let resp = conn
      .client
      .get(&url)
      .query(&[("SID", student_id)])
      .basic_auth(&conn.username, Some(&conn.password))
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(Error::Status {
        what:   "enrolment list",
        status: resp.status(),
      });
    }
    parse_enrolment_list(resp.json().await?)
  }
}
