//! Connection settings for the upstream services.
//!
//! Credentials are not configured here directly; the student API section
//! names the secrets to fetch from a [`SecretProvider`](myuni_core::source::SecretProvider).

use serde::Deserialize;

fn default_timeout_secs() -> u64 { 30 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamConfig {
  #[serde(default)]
  pub student:  StudentApiConfig,
  #[serde(default)]
  pub catalog:  CatalogConfig,
  #[serde(default)]
  pub calendar: CalendarConfig,
}

/// Secret names for the enrolment REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct StudentApiConfig {
  pub url_secret:           String,
  pub username_secret:      String,
  pub password_secret:      String,
  /// PEM client certificate for mutual TLS; used with `private_key_secret`.
  #[serde(default)]
  pub certificate_secret:   Option<String>,
  #[serde(default)]
  pub private_key_secret:   Option<String>,
  /// The upstream gateway presents a certificate that does not verify.
  #[serde(default)]
  pub accept_invalid_certs: bool,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:         u64,
}

impl Default for StudentApiConfig {
  fn default() -> Self {
    Self {
      url_secret:           "/myuni5/student/url".into(),
      username_secret:      "/myuni5/student/username".into(),
      password_secret:      "/myuni5/student/password".into(),
      certificate_secret:   Some("/myuni5/mulesoft/certificate".into()),
      private_key_secret:   Some("/myuni5/mulesoft/privatekey".into()),
      accept_invalid_certs: false,
      timeout_secs:         default_timeout_secs(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
  /// SOAP endpoint of the course service.
  pub endpoint:     String,
  /// Target namespace of the service's request elements.
  #[serde(default = "default_catalog_namespace")]
  pub namespace:    String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_catalog_namespace() -> String { "http://sydney.edu.au/sits/enrolment/details".into() }

impl Default for CatalogConfig {
  fn default() -> Self {
    Self {
      endpoint:     "https://api.sydney.edu.au/usyd-enrolment-soap-exp-api-v1-0/SITSEnrolmentDetailsService/EnrolmentDetailsServicePortTypeEndpoint".into(),
      namespace:    default_catalog_namespace(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
  pub url:          String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for CalendarConfig {
  fn default() -> Self {
    Self {
      url:          "https://www.sydney.edu.au/bin/students/dates/l/dl.json".into(),
      timeout_secs: default_timeout_secs(),
    }
  }
}
