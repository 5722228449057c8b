// Portal HTTP client
//
// Wraps `reqwest::Client` with provider-relative URL construction, the
// XHR headers the monitor pages send, and status/JSON validation. Endpoint
// calls live in sibling modules as inherent methods so this file stays
// focused on transport mechanics.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, ORIGIN, REFERER};
use reqwest::{Method, StatusCode};
use secrecy::SecretString;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::portal::endpoint::Endpoint;
use crate::provider::Provider;
use crate::transport::TransportConfig;

/// Username and password for the portal's login form.
///
/// The password is a [`SecretString`] so it never ends up in `Debug` output
/// or logs.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Build from a password that is already wrapped.
    pub fn from_secret(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

/// How a request carries its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Params {
    /// `application/x-www-form-urlencoded` body.
    Form,
    /// Query string, empty body.
    Query,
}

/// One authenticated conversation with an eSolar portal.
///
/// Owns the cookie jar that carries the session; every call made through
/// the same client shares it. The `authenticated` flag is set only by a
/// successful [`login`](Self::login) and cleared by
/// [`invalidate`](Self::invalidate) or [`reset`](Self::reset).
pub struct PortalClient {
    http: reqwest::Client,
    provider: Provider,
    base_url: Url,
    credentials: Credentials,
    transport: TransportConfig,
    cookie_jar: Arc<Jar>,
    authenticated: AtomicBool,
}

impl PortalClient {
    /// Create a client for `provider` with a fresh cookie jar.
    ///
    /// TLS verification follows `provider.verify_tls()`; the rest of the
    /// transport (timeout, user agent, custom CA) comes from `transport`.
    pub fn new(
        provider: Provider,
        credentials: Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let transport = transport
            .clone()
            .with_verification(provider.verify_tls())
            .with_cookie_jar();
        let cookie_jar = transport
            .cookie_jar
            .clone()
            .unwrap_or_else(|| Arc::new(Jar::default()));
        let base_url = provider.base_url()?;
        let http = transport.build_client_with_headers(xhr_headers(&provider, &base_url))?;
        seed_locale_cookies(&cookie_jar, &base_url);

        Ok(Self {
            http,
            provider,
            base_url,
            credentials,
            transport,
            cookie_jar,
            authenticated: AtomicBool::new(false),
        })
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    /// Application root URL (`https://host/path/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    pub(crate) fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.transport.timeout
    }

    // ── Session state ────────────────────────────────────────────────

    /// Whether the last login succeeded and nothing has invalidated it since.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    pub(crate) fn mark_authenticated(&self) {
        self.authenticated.store(true, Ordering::Release);
    }

    /// Forget the authenticated state; the next
    /// [`ensure_authenticated`](Self::ensure_authenticated) logs in again.
    pub fn invalidate(&self) {
        if self.authenticated.swap(false, Ordering::AcqRel) {
            debug!("session invalidated");
        }
    }

    /// Tear the session down: drop every cookie by rebuilding the HTTP
    /// client around a new jar.
    pub fn reset(&mut self) -> Result<(), Error> {
        let jar = Arc::new(Jar::default());
        self.transport.cookie_jar = Some(Arc::clone(&jar));
        self.http = self
            .transport
            .build_client_with_headers(xhr_headers(&self.provider, &self.base_url))?;
        seed_locale_cookies(&jar, &self.base_url);
        self.cookie_jar = jar;
        self.authenticated.store(false, Ordering::Release);
        debug!("session reset");
        Ok(())
    }

    /// The `Cookie` header the session would send to the portal.
    pub fn cookie_header(&self) -> Option<String> {
        let cookies = self.cookie_jar.cookies(&self.base_url)?;
        cookies.to_str().ok().map(String::from)
    }

    // ── Request helpers ──────────────────────────────────────────────

    pub(crate) fn url(&self, endpoint: Endpoint) -> Result<Url, Error> {
        Ok(self.base_url.join(endpoint.path())?)
    }

    /// Send one monitor request and return its JSON body.
    ///
    /// Anything but HTTP 200 is an error. 401 and redirects (the portal's
    /// way of bouncing an expired session to the login page) are reported
    /// as [`Error::SessionExpired`].
    pub(crate) async fn call(
        &self,
        method: Method,
        endpoint: Endpoint,
        params: Params,
        payload: &(impl Serialize + Sync),
    ) -> Result<Value, Error> {
        let url = self.url(endpoint)?;
        debug!(%method, endpoint = endpoint.name(), "{url}");

        let builder = self.http.request(method, url);
        let builder = match params {
            Params::Form => builder.form(payload),
            Params::Query => builder.query(payload),
        };

        let resp = builder
            .send()
            .await
            .map_err(|e| Error::from_send(e, self.timeout()))?;

        self.parse_json(endpoint, resp).await
    }

    async fn parse_json(&self, endpoint: Endpoint, resp: reqwest::Response) -> Result<Value, Error> {
        let status = resp.status();
        trace!(endpoint = endpoint.name(), %status, "response");

        if status == StatusCode::UNAUTHORIZED || status.is_redirection() {
            return Err(Error::SessionExpired {
                endpoint: endpoint.name(),
                status: status.as_u16(),
            });
        }

        if status != StatusCode::OK {
            return Err(Error::Status {
                endpoint: endpoint.name(),
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::from_send(e, self.timeout()))?;

        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                endpoint: endpoint.name(),
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }
}

impl std::fmt::Debug for PortalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalClient")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.credentials.username)
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

/// Headers the portal's own monitor pages send with their XHR calls.
fn xhr_headers(provider: &Provider, base_url: &Url) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
    );
    headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
    if let Ok(origin) = HeaderValue::from_str(&provider.base_domain()) {
        headers.insert(ORIGIN, origin);
    }
    if let Ok(referer) = HeaderValue::from_str(&format!("{base_url}monitor/home/index")) {
        headers.insert(REFERER, referer);
    }
    headers
}

/// The login page renders in the locale stored in these cookies; pinning
/// them to English keeps the response shape stable.
fn seed_locale_cookies(jar: &Jar, base_url: &Url) {
    jar.add_cookie_str(
        "org.springframework.web.servlet.i18n.CookieLocaleResolver.LOCALE=en; Path=/",
        base_url,
    );
    jar.add_cookie_str("op:_lang=en; Path=/", base_url);
}
