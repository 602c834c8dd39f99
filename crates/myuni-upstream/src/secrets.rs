//! Secret providers.
//!
//! [`EnvSecrets`] reads secrets from the process environment.
//! [`CachedSecrets`] wraps any provider so each secret is fetched at most once
//! per process, even under concurrent first use.

use std::{collections::HashMap, sync::Arc};

use myuni_core::source::SecretProvider;
use tokio::sync::{Mutex, OnceCell};

use crate::{Error, Result};

// ─── Environment ─────────────────────────────────────────────────────────────

/// Secrets from environment variables named after the secret path:
/// `/myuni5/student/url` is read from `MYUNI5_STUDENT_URL`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecrets;

/// The environment variable holding secret `name`.
pub fn env_var_name(name: &str) -> String {
  name
    .trim_start_matches('/')
    .chars()
    .map(|c| match c {
      '/' | '-' | '.' => '_',
      c => c.to_ascii_uppercase(),
    })
    .collect()
}

impl SecretProvider for EnvSecrets {
  type Error = Error;

  async fn secret(&self, name: &str) -> Result<String> {
    std::env::var(env_var_name(name)).map_err(|_| Error::MissingSecret(name.to_owned()))
  }
}

// ─── Cache ───────────────────────────────────────────────────────────────────

/// Single-flight, fetch-once cache in front of another provider.
///
/// Failed lookups are not cached; the next caller retries.
pub struct CachedSecrets<P> {
  inner: P,
  cells: Mutex<HashMap<String, Arc<OnceCell<String>>>>,
}

impl<P> CachedSecrets<P> {
  pub fn new(inner: P) -> Self {
    Self {
      inner,
      cells: Mutex::new(HashMap::new()),
    }
  }
}

impl<P: SecretProvider> SecretProvider for CachedSecrets<P> {
  type Error = P::Error;

  async fn secret(&self, name: &str) -> Result<String, P::Error> {
    let cell = {
      let mut cells = self.cells.lock().await;
      Arc::clone(cells.entry(name.to_owned()).or_default())
    };
    let value = cell
      .get_or_try_init(|| async {
        tracing::debug!(secret = name, "fetching secret");
        self.inner.secret(name).await
      })
      .await?;
    Ok(value.clone())
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;

  /// Counts lookups; fails for names starting with `missing`.
  #[derive(Default)]
  struct Counting {
    calls: AtomicUsize,
  }

  impl SecretProvider for Counting {
    type Error = Error;

    async fn secret(&self, name: &str) -> Result<String> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      tokio::task::yield_now().await;
      if name.starts_with("missing") {
        return Err(Error::MissingSecret(name.to_owned()));
      }
      Ok(format!("value of {name}"))
    }
  }

  #[test]
  fn env_var_names() {
    assert_eq!(env_var_name("/myuni5/student/url"), "MYUNI5_STUDENT_URL");
    assert_eq!(env_var_name("/myuni5/mulesoft/private-key"), "MYUNI5_MULESOFT_PRIVATE_KEY");
    assert_eq!(env_var_name("plain"), "PLAIN");
  }

  #[tokio::test]
  async fn env_secret_missing() {
    let r = EnvSecrets.secret("/myuni-test/definitely/not/set").await;
    assert!(matches!(r, Err(Error::MissingSecret(_))));
  }

  #[tokio::test]
  async fn cache_fetches_each_secret_once() {
    let cache = CachedSecrets::new(Counting::default());
    assert_eq!(cache.secret("a").await.unwrap(), "value of a");
    assert_eq!(cache.secret("a").await.unwrap(), "value of a");
    assert_eq!(cache.secret("b").await.unwrap(), "value of b");
    assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn concurrent_first_use_is_single_flight() {
    let cache = CachedSecrets::new(Counting::default());
    let (a, b, c) = tokio::join!(cache.secret("a"), cache.secret("a"), cache.secret("a"));
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(c.unwrap(), "value of a");
    assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn failures_are_retried() {
    let cache = CachedSecrets::new(Counting::default());
    assert!(cache.secret("missing").await.is_err());
    assert!(cache.secret("missing").await.is_err());
    assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 2);
  }
}
