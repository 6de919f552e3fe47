//! S3-compatible object store over HTTP

use async_trait::async_trait;
use bytes::Bytes;
use regex::Regex;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use strand_errors::{ConfigError, Error};
use tracing::debug;
use url::Url;

use crate::retry::{calculate_backoff_delay, RetryConfig};
use crate::store::{ObjectStore, StoreError};

/// HTTP store configuration
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub bearer_token: Option<String>,
    pub retry: RetryConfig,
    pub user_agent: String,
}

impl Default for HttpStoreConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            bearer_token: None,
            retry: RetryConfig::default(),
            user_agent: format!("strand/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Bucket reachable through plain GETs and `ListObjectsV2` queries
#[derive(Clone)]
pub struct HttpObjectStore {
    name: String,
    base: Url,
    client: Client,
    config: HttpStoreConfig,
    key_pattern: Regex,
}

impl std::fmt::Debug for HttpObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpObjectStore")
            .field("name", &self.name)
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpObjectStore {
    /// Create a store rooted at `base_url`
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or the HTTP client cannot
    /// be built.
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        config: HttpStoreConfig,
    ) -> Result<Self, Error> {
        let name = name.into();
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base = Url::parse(&normalized)
            .map_err(|_| ConfigError::invalid_value(format!("sources.{name}.uri"), base_url))?;
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| Error::internal(format!("http client for {name}: {e}")))?;
        let key_pattern = Regex::new(r"<Key>([^<]+)</Key>")
            .map_err(|e| Error::internal(e.to_string()))?;

        Ok(Self {
            name,
            base,
            client,
            config,
            key_pattern,
        })
    }

    fn object_url(&self, key: &str) -> Result<Url, StoreError> {
        self.base.join(key).map_err(|e| StoreError::Permanent {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request, retrying transient failures with jittered backoff
    async fn send_with_retry<F>(&self, key: &str, build: F) -> Result<Response, StoreError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            let result = match self.authorize(build()).send().await {
                Ok(response) => classify_response(key, response),
                Err(e) => Err(classify_transport(key, &e)),
            };

            match result {
                Err(err) if err.is_transient() && attempt < self.config.retry.max_retries => {
                    attempt += 1;
                    let delay = match &err {
                        StoreError::RateLimited { seconds } => Duration::from_secs(*seconds),
                        _ => calculate_backoff_delay(&self.config.retry, attempt),
                    };
                    debug!(store = %self.name, key, attempt, ?delay, error = %err, "retrying request");
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

fn classify_response(key: &str, response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let key = key.to_string();
    match status {
        StatusCode::NOT_FOUND => Err(StoreError::NotFound { key }),
        StatusCode::TOO_MANY_REQUESTS => {
            let seconds = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            Err(StoreError::RateLimited { seconds })
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StoreError::Permanent {
            key,
            message: format!("access denied ({status})"),
        }),
        s if s.is_server_error() || s == StatusCode::REQUEST_TIMEOUT => {
            Err(StoreError::Transient {
                key,
                message: format!("server returned {status}"),
            })
        }
        _ => Err(StoreError::Permanent {
            key,
            message: format!("unexpected status {status}"),
        }),
    }
}

fn classify_transport(key: &str, error: &reqwest::Error) -> StoreError {
    if error.is_builder() {
        StoreError::Permanent {
            key: key.to_string(),
            message: error.to_string(),
        }
    } else {
        StoreError::Transient {
            key: key.to_string(),
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, StoreError> {
        let url = self.object_url(key)?;
        let response = self
            .send_with_retry(key, || self.client.get(url.clone()))
            .await?;
        response.bytes().await.map_err(|e| StoreError::Transient {
            key: key.to_string(),
            message: format!("reading body: {e}"),
        })
    }

    async fn list_objects(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        max: usize,
    ) -> Result<Vec<String>, StoreError> {
        let mut url = self.base.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("list-type", "2")
                .append_pair("prefix", prefix)
                .append_pair("delimiter", "/")
                .append_pair("max-keys", &max.to_string());
            if let Some(after) = start_after {
                query.append_pair("start-after", after);
            }
        }

        let response = self
            .send_with_retry(prefix, || self.client.get(url.clone()))
            .await?;
        let body = response.text().await.map_err(|e| StoreError::Transient {
            key: prefix.to_string(),
            message: format!("reading listing: {e}"),
        })?;

        let mut keys: Vec<String> = self
            .key_pattern
            .captures_iter(&body)
            .filter_map(|caps| caps.get(1))
            .map(|m| unescape_xml(m.as_str()))
            .filter(|key| key.starts_with(prefix) && !key[prefix.len()..].contains('/'))
            .filter(|key| start_after.is_none_or(|after| key.as_str() > after))
            .collect();
        keys.sort_unstable();
        keys.truncate(max);
        Ok(keys)
    }
}

/// Resolve the predefined XML entities in a listed key
///
/// Listings escape `&`, `<` and `>` inside `<Key>`; numeric character
/// references are left as they are.
fn unescape_xml(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(at) = rest.find('&') {
        out.push_str(&rest[..at]);
        rest = &rest[at..];
        let entity = [
            ("&amp;", '&'),
            ("&lt;", '<'),
            ("&gt;", '>'),
            ("&quot;", '"'),
            ("&apos;", '\''),
        ]
        .into_iter()
        .find(|(name, _)| rest.starts_with(name));
        match entity {
            Some((name, ch)) => {
                out.push(ch);
                rest = &rest[name.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_xml_entities() {
        assert_eq!(unescape_xml("plain/key.rcd_sig"), "plain/key.rcd_sig");
        assert_eq!(unescape_xml("a&amp;b&lt;c&gt;&quot;d&apos;"), "a&b<c>\"d'");
        assert_eq!(unescape_xml("&amp;amp;"), "&amp;");
        assert_eq!(unescape_xml("loose & ampersand&"), "loose & ampersand&");
        assert_eq!(unescape_xml("&#38;"), "&#38;");
    }
}
