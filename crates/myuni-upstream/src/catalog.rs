//! SOAP client for the course catalog.
//!
//! Total credits for a route take two calls: `getCourseRouteElements` maps the
//! route to its publication code, then `getCourses` returns the course
//! record carrying `courseCreditPts`.

use std::{io::Cursor, time::Duration};

use myuni_core::source::CourseCatalog;
use quick_xml::{
  Reader, Writer,
  events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use reqwest::{Client, header::CONTENT_TYPE};

use crate::{Error, Result, config::CatalogConfig};

// ─── Namespaces ──────────────────────────────────────────────────────────────

pub const NS_SOAP_ENV: &str = "http://schemas.xmlsoap.org/soap/envelope/";

// ─── Envelope ────────────────────────────────────────────────────────────────

fn write(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> Result<()> {
  writer
    .write_event(event)
    .map_err(|e| Error::Xml(e.to_string()))
}

/// A SOAP 1.1 request envelope for `operation` with one child element per
/// parameter, in order.
pub fn envelope(namespace: &str, operation: &str, params: &[(&str, &str)]) -> Result<Vec<u8>> {
  let mut writer = Writer::new(Cursor::new(Vec::new()));
  write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

  let mut env = BytesStart::new("soapenv:Envelope");
  env.push_attribute(("xmlns:soapenv", NS_SOAP_ENV));
  env.push_attribute(("xmlns:ns", namespace));
  write(&mut writer, Event::Start(env))?;
  write(&mut writer, Event::Empty(BytesStart::new("soapenv:Header")))?;
  write(&mut writer, Event::Start(BytesStart::new("soapenv:Body")))?;

  let op = format!("ns:{operation}");
  write(&mut writer, Event::Start(BytesStart::new(op.as_str())))?;
  for (name, value) in params {
    write(&mut writer, Event::Start(BytesStart::new(*name)))?;
    write(&mut writer, Event::Text(BytesText::new(value)))?;
    write(&mut writer, Event::End(BytesEnd::new(*name)))?;
  }
  write(&mut writer, Event::End(BytesEnd::new(op.as_str())))?;

  write(&mut writer, Event::End(BytesEnd::new("soapenv:Body")))?;
  write(&mut writer, Event::End(BytesEnd::new("soapenv:Envelope")))?;
  Ok(writer.into_inner().into_inner())
}

// ─── Response parsing ────────────────────────────────────────────────────────

fn local_name(name: &[u8]) -> &[u8] {
  match name.iter().rposition(|&b| b == b':') {
    Some(pos) => &name[pos + 1..],
    None => name,
  }
}

/// Text of the first element whose local name is `local`, prefixes ignored.
pub fn element_text(xml: &[u8], local: &str) -> Result<Option<String>> {
  let mut reader = Reader::from_reader(xml);
  reader.config_mut().trim_text(true);

  let mut inside = false;
  let mut buf = Vec::new();
  loop {
    match reader.read_event_into(&mut buf) {
      Ok(Event::Start(ref e)) if local_name(e.name().as_ref()) == local.as_bytes() => {
        inside = true;
      }
      Ok(Event::Empty(ref e)) if local_name(e.name().as_ref()) == local.as_bytes() => {
        return Ok(Some(String::new()));
      }
      Ok(Event::Text(ref t)) if inside => {
        let text = t.unescape().map_err(|e| Error::Xml(e.to_string()))?;
        return Ok(Some(text.into_owned()));
      }
      Ok(Event::End(ref e)) if inside && local_name(e.name().as_ref()) == local.as_bytes() => {
        return Ok(Some(String::new()));
      }
      Ok(Event::Eof) => return Ok(None),
      Err(e) => return Err(Error::Xml(e.to_string())),
      _ => {}
    }
    buf.clear();
  }
}

/// Fail with the fault string when the body is a SOAP fault.
fn check_fault(xml: &[u8]) -> Result<()> {
  match element_text(xml, "faultstring")? {
    Some(fault) => Err(Error::SoapFault(fault)),
    None => Ok(()),
  }
}

/// Credit points as printed by the catalog: an integer, or a decimal that is
/// truncated.
pub fn parse_credit_points(text: &str) -> Result<u32> {
  let text = text.trim();
  if let Ok(n) = text.parse::<u32>() {
    return Ok(n);
  }
  match text.parse::<f64>() {
    Ok(f) if f.is_finite() && f >= 0.0 => Ok(f.trunc() as u32),
    _ => Err(Error::MalformedResponse(format!("courseCreditPts {text:?} is not a number"))),
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

pub struct SoapCatalog {
  client:    Client,
  endpoint:  String,
  namespace: String,
}

impl SoapCatalog {
  pub fn new(config: &CatalogConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self {
      client,
      endpoint: config.endpoint.clone(),
      namespace: config.namespace.clone(),
    })
  }

  async fn call(&self, operation: &str, params: &[(&str, &str)]) -> Result<Vec<u8>> {
    let body = envelope(&self.namespace, operation, params)?;
    tracing::debug!(operation, endpoint = %self.endpoint, "soap call");

    let resp = self
      .client
      .post(&self.endpoint)
      .header(CONTENT_TYPE, "text/xml; charset=utf-8")
      .header("SOAPAction", operation)
      .body(body)
      .send()
      .await?;

    let status = resp.status();
    let bytes = resp.bytes().await?;
    // Faults come back as 500 with a useful message; prefer it over the status.
    check_fault(&bytes)?;
    if !status.is_success() {
      return Err(Error::Status {
        what: "course catalog",
        status,
      });
    }
    Ok(bytes.to_vec())
  }

  async fn publication_code(&self, route_code: &str) -> Result<String> {
    let xml = self
      .call("getCourseRouteElements", &[
        ("publicationCode", ""),
        ("routeCode", route_code),
        ("pathwayCode", ""),
        ("academicYear", ""),
        ("lastModifiedDate", ""),
        ("startRecord", "1"),
        ("numberOfRecords", "50"),
      ])
      .await?;
    element_text(&xml, "publicationCode")?
      .filter(|code| !code.is_empty())
      .ok_or_else(|| Error::MalformedResponse(format!("no publication code for route {route_code}")))
  }
}

impl CourseCatalog for SoapCatalog {
  type Error = Error;

  async fn course_credits(&self, route_code: &str) -> Result<u32> {
    let publication_code = self.publication_code(route_code).await?;
    let xml = self
      .call("getCourses", &[
        ("publicationCode", publication_code.as_str()),
        ("inUse", ""),
        ("isPublishable", ""),
        ("department", ""),
        ("faculty", ""),
        ("lastModifiedDate", ""),
        ("startRecord", "1"),
        ("numberOfRecords", "50"),
      ])
      .await?;
    let text = element_text(&xml, "courseCreditPts")?
      .ok_or_else(|| Error::MalformedResponse(format!("no courseCreditPts for {publication_code}")))?;
    parse_credit_points(&text)
  }
}
