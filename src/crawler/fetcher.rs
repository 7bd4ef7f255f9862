//! HTTP access for the session core
//!
//! This module handles the few requests the core makes itself:
//! - Building the HTTP client with the configured user agent and timeouts
//! - Fetching the front page used for classification
//! - Retrying transient failures with the session's pacing
//! - Turning HTTP status codes into actionable errors

use crate::config::{NetworkPolicy, Settings};
use crate::crawler::adapter::SiteProbe;
use crate::DumpError;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::cookie::Jar;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use url::Url;

/// Extra pause per retry, on top of the configured delay
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Builds an HTTP client from the client settings
///
/// # Arguments
///
/// * `settings` - User agent and timeout settings
/// * `cookies` - Optional Netscape-format cookie file, scoped per cookie domain
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(DumpError)` - The cookie file is unreadable or the client failed to build
///
/// # Example
///
/// ```no_run
/// use wikidump::config::Settings;
/// use wikidump::crawler::build_http_client;
///
/// let client = build_http_client(&Settings::default(), None).unwrap();
/// ```
pub fn build_http_client(settings: &Settings, cookies: Option<&Path>) -> Result<Client, DumpError> {
    let mut builder = Client::builder()
        .user_agent(settings.user_agent.header_value())
        .timeout(Duration::from_secs(settings.http.timeout_secs))
        .connect_timeout(Duration::from_secs(settings.http.connect_timeout_secs))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true);

    if let Some(path) = cookies {
        if let Some(jar) = load_cookie_jar(path)? {
            builder = builder.cookie_provider(jar);
        }
    }

    Ok(builder.build()?)
}

/// One line of a Netscape cookie file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetscapeCookie {
    pub domain: String,
    pub include_subdomains: bool,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    /// Unix timestamp; `None` for session cookies
    pub expires: Option<i64>,
    pub name: String,
    pub value: String,
}

impl NetscapeCookie {
    /// The URL the cookie is scoped to
    fn origin(&self) -> Option<Url> {
        let host = self.domain.trim_start_matches('.');
        if host.is_empty() {
            return None;
        }
        let scheme = if self.secure { "https" } else { "http" };
        Url::parse(&format!("{}://{}{}", scheme, host, self.path)).ok()
    }

    /// The cookie as a `Set-Cookie` value for its origin
    fn set_cookie(&self) -> String {
        let mut value = format!("{}={}; Path={}", self.name, self.value, self.path);
        if self.include_subdomains {
            value.push_str("; Domain=");
            value.push_str(self.domain.trim_start_matches('.'));
        }
        if self.secure {
            value.push_str("; Secure");
        }
        if self.http_only {
            value.push_str("; HttpOnly");
        }
        value
    }

    fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires, Some(at) if at <= now)
    }
}

/// Parses the contents of a Netscape cookie file
///
/// Lines are `domain subdomains path secure expiry name value`, tab
/// separated. Comments, blank lines and malformed lines are skipped.
/// `#HttpOnly_` prefixed lines are cookies with the HttpOnly flag.
pub fn parse_netscape_cookies(content: &str) -> Vec<NetscapeCookie> {
    content
        .lines()
        .filter_map(|line| {
            let (line, http_only) = match line.strip_prefix("#HttpOnly_") {
                Some(rest) => (rest, true),
                None => (line, false),
            };
            if line.trim().is_empty() || line.starts_with('#') {
                return None;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            match fields.as_slice() {
                [domain, subdomains, path, secure, expires, name, value] => {
                    let expires = expires.trim().parse::<i64>().ok().filter(|at| *at > 0);
                    Some(NetscapeCookie {
                        domain: domain.trim().to_string(),
                        include_subdomains: subdomains.eq_ignore_ascii_case("TRUE"),
                        path: if path.is_empty() { "/".to_string() } else { path.to_string() },
                        secure: secure.eq_ignore_ascii_case("TRUE"),
                        http_only,
                        expires,
                        name: name.to_string(),
                        value: value.trim_end().to_string(),
                    })
                }
                _ => None,
            }
        })
        .collect()
}

/// Loads a Netscape cookie file into a cookie jar
///
/// Every cookie is stored against its own domain and path, so it is only
/// sent where a browser would send it. Expired cookies are dropped.
pub fn load_cookie_jar(path: &Path) -> Result<Option<Arc<Jar>>, DumpError> {
    let content = std::fs::read_to_string(path)?;
    let now = Utc::now().timestamp();

    let jar = Jar::default();
    let mut loaded = 0usize;
    for cookie in parse_netscape_cookies(&content) {
        if cookie.is_expired(now) {
            tracing::debug!("Skipping expired cookie {} for {}", cookie.name, cookie.domain);
            continue;
        }
        match cookie.origin() {
            Some(origin) => {
                jar.add_cookie_str(&cookie.set_cookie(), &origin);
                loaded += 1;
            }
            None => tracing::warn!(
                "Skipping cookie {} with unusable domain {:?}",
                cookie.name,
                cookie.domain
            ),
        }
    }

    if loaded == 0 {
        tracing::warn!("Cookie file {} holds no usable cookies", path.display());
        return Ok(None);
    }

    tracing::debug!("Loaded {} cookies from {}", loaded, path.display());
    Ok(Some(Arc::new(jar)))
}

/// How a response status should be handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusAction {
    Accept,
    Retry(String),
    Fail(String),
}

/// Maps an HTTP status to an action and an operator-facing explanation
///
/// | Status | Action |
/// |--------|--------|
/// | 2xx | Accept |
/// | 400 | Fail, check the URL |
/// | 401, 403 | Fail, check credentials or cookies |
/// | 404 | Fail, check the URL |
/// | 429, 5xx | Retry |
/// | other | Fail |
pub fn status_action(status: StatusCode) -> StatusAction {
    match status.as_u16() {
        200..=299 => StatusAction::Accept,
        400 => StatusAction::Fail(
            "HTTP 400 Bad Request. The server rejected the URL; check it for typos".to_string(),
        ),
        401 | 403 => StatusAction::Fail(format!(
            "HTTP {} {}. The wiki requires authentication; supply --cookies or --user/--pass",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Forbidden")
        )),
        404 => StatusAction::Fail(
            "HTTP 404 Not Found. Check that the URL points at an existing wiki page".to_string(),
        ),
        429 => StatusAction::Retry(
            "HTTP 429 Too Many Requests. Consider a larger --delay".to_string(),
        ),
        500..=599 => StatusAction::Retry(format!(
            "HTTP {} {}. The server is having trouble",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Server Error")
        )),
        other => StatusAction::Fail(format!("Unexpected HTTP status {}", other)),
    }
}

/// [`SiteProbe`] backed by reqwest
///
/// Requests are paced by the policy's delay and retried on rate limiting,
/// server errors, timeouts and connection failures.
pub struct HttpProbe {
    client: Client,
    policy: NetworkPolicy,
    last_request: Mutex<Option<Instant>>,
}

impl HttpProbe {
    pub fn new(client: Client, policy: NetworkPolicy) -> Self {
        Self {
            client,
            policy,
            last_request: Mutex::new(None),
        }
    }

    /// Builds the client from settings and wraps it
    pub fn from_settings(
        settings: &Settings,
        policy: NetworkPolicy,
        cookies: Option<&Path>,
    ) -> Result<Self, DumpError> {
        Ok(Self::new(build_http_client(settings, cookies)?, policy))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fetches `url` and returns the body, retrying per the policy
    pub async fn get_text(&self, url: &str) -> Result<String, DumpError> {
        let mut attempt: u32 = 0;

        loop {
            self.pace().await;

            let failure = match self.client.get(url).send().await {
                Ok(response) => match status_action(response.status()) {
                    StatusAction::Accept => return Ok(response.text().await?),
                    StatusAction::Retry(message) => message,
                    StatusAction::Fail(message) => {
                        return Err(DumpError::Transport {
                            url: url.to_string(),
                            message,
                        })
                    }
                },
                Err(e) if e.is_timeout() => "Request timed out".to_string(),
                Err(e) if e.is_connect() => format!("Connection failed: {}", e),
                Err(e) => return Err(e.into()),
            };

            attempt += 1;
            if attempt > self.policy.retries {
                return Err(DumpError::Transport {
                    url: url.to_string(),
                    message: format!("{} (gave up after {} attempts)", failure, attempt),
                });
            }

            let pause = RETRY_BACKOFF * attempt;
            tracing::warn!(
                "{} for {}; retry {}/{} in {:.1}s",
                failure,
                url,
                attempt,
                self.policy.retries,
                pause.as_secs_f64() + self.policy.delay_secs
            );
            tokio::time::sleep(pause).await;
        }
    }

    /// Waits until the configured delay has passed since the last request
    async fn pace(&self) {
        let delay = Duration::from_secs_f64(self.policy.delay_secs.max(0.0));
        let wait = {
            let mut last = match self.last_request.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let wait = last
                .map(|at| delay.saturating_sub(at.elapsed()))
                .unwrap_or_default();
            *last = Some(Instant::now() + wait);
            wait
        };

        if !wait.is_zero() {
            tracing::debug!("Waiting {:.2}s before next request", wait.as_secs_f64());
            tokio::time::sleep(wait).await;
        }
    }
}

#[async_trait]
impl SiteProbe for HttpProbe {
    async fn fetch_front_page(&self, site: &str) -> Result<String, DumpError> {
        tracing::info!("Fetching {} for engine detection", site);
        self.get_text(site).await
    }
}
