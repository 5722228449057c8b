// Portal authentication
//
// Form login against `<base>/login`. The portal answers with HTML; the only
// success signal is a redirect to the dashboard, and the session cookie it
// sets lands in the client's jar for every later call.

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CACHE_CONTROL, HeaderValue, LOCATION, REFERER};
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Error;
use crate::portal::client::PortalClient;

/// Reason reported when the portal refuses the credentials.
pub const INVALID_CREDENTIALS: &str = "invalid credentials";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginForm<'a> {
    lang: &'static str,
    username: &'a str,
    password: &'a str,
    remember_me: &'static str,
}

impl PortalClient {
    /// Submit the login form once.
    ///
    /// - 302/303 with a `Location` header: success, the session is marked
    ///   authenticated.
    /// - 200 (login page re-rendered), 401, 403: [`Error::Authentication`].
    /// - Certificate or connection failures: transport errors, never auth.
    /// - Anything else: [`Error::UnknownAuthentication`].
    pub async fn login(&self) -> Result<(), Error> {
        let url = self.provider().login_url()?;
        debug!(username = self.username(), "logging in at {url}");

        let credentials = self.credentials();
        let form = LoginForm {
            lang: "en",
            username: &credentials.username,
            password: credentials.password.expose_secret(),
            remember_me: "true",
        };

        let mut request = self
            .http()
            .post(url.clone())
            .header(
                ACCEPT,
                HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
            )
            .header(CACHE_CONTROL, HeaderValue::from_static("max-age=0"))
            .form(&form);
        if let Ok(referer) = HeaderValue::from_str(url.as_str()) {
            request = request.header(REFERER, referer);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| Error::from_send(e, self.timeout()))?;

        let status = resp.status();
        debug!(%status, "login response");

        match status {
            StatusCode::OK | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                self.invalidate();
                Err(Error::Authentication {
                    message: INVALID_CREDENTIALS.into(),
                })
            }
            StatusCode::FOUND | StatusCode::SEE_OTHER if resp.headers().contains_key(LOCATION) => {
                let target = resp
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                debug!(%status, location = target, "login redirect accepted");
                self.mark_authenticated();
                Ok(())
            }
            other => {
                warn!(status = %other, "unexpected login response");
                self.invalidate();
                Err(Error::UnknownAuthentication {
                    status: other.as_u16(),
                })
            }
        }
    }

    /// Log in unless the session already holds a successful login.
    ///
    /// Idempotent: repeated calls on an authenticated session make no
    /// request. It never retries a failed login.
    pub async fn ensure_authenticated(&self) -> Result<(), Error> {
        if self.is_authenticated() {
            debug!("reusing authenticated session");
            return Ok(());
        }
        self.login().await
    }
}
