use url::Url;

use crate::error::Error;

/// URL scheme used to reach the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Https,
    Http,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Https => "https",
            Self::Http => "http",
        }
    }
}

/// Identifies one eSolar portal deployment.
///
/// SAJ hosts the portal itself and resellers run rebranded copies under
/// their own host and application path, so the same protocol is spoken at
/// `https://fop.saj-electric.com/saj` and at
/// `https://greenheiss-portal.saj-electric.com/cloud`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    host: String,
    path: String,
    scheme: Scheme,
    verify_tls: bool,
}

impl Provider {
    pub const SAJ_HOST: &'static str = "fop.saj-electric.com";
    pub const SAJ_PATH: &'static str = "saj";
    pub const GREENHEISS_HOST: &'static str = "greenheiss-portal.saj-electric.com";
    pub const GREENHEISS_PATH: &'static str = "cloud";

    /// Create a provider. Leading/trailing slashes on `path` are dropped so
    /// `"/saj/"` and `"saj"` address the same application.
    pub fn new(host: impl Into<String>, path: &str, scheme: Scheme, verify_tls: bool) -> Self {
        Self {
            host: host.into().trim().trim_end_matches('/').to_owned(),
            path: path.trim().trim_matches('/').to_owned(),
            scheme,
            verify_tls,
        }
    }

    /// SAJ's own portal.
    pub fn saj() -> Self {
        Self::new(Self::SAJ_HOST, Self::SAJ_PATH, Scheme::Https, true)
    }

    /// The Greenheiss reseller portal.
    pub fn greenheiss() -> Self {
        Self::new(Self::GREENHEISS_HOST, Self::GREENHEISS_PATH, Scheme::Https, true)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn verify_tls(&self) -> bool {
        self.verify_tls
    }

    /// `scheme://host`, used as the `Origin` header.
    pub fn base_domain(&self) -> String {
        format!("{}://{}", self.scheme.as_str(), self.host)
    }

    /// Application root, always with a trailing slash so relative joins
    /// stay below it: `https://fop.saj-electric.com/saj/`.
    pub fn base_url(&self) -> Result<Url, Error> {
        let raw = if self.path.is_empty() {
            format!("{}/", self.base_domain())
        } else {
            format!("{}/{}/", self.base_domain(), self.path)
        };
        Ok(Url::parse(&raw)?)
    }

    /// The form login page: `<base>/login`.
    pub fn login_url(&self) -> Result<Url, Error> {
        self.endpoint_url("login")
    }

    /// Resolve an application-relative path such as `monitor/site/getUserPlantList`.
    pub fn endpoint_url(&self, relative: &str) -> Result<Url, Error> {
        Ok(self.base_url()?.join(relative.trim_start_matches('/'))?)
    }
}

impl Default for Provider {
    fn default() -> Self {
        Self::saj()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn saj_urls() {
        let p = Provider::saj();
        assert_eq!(p.base_domain(), "https://fop.saj-electric.com");
        assert_eq!(
            p.login_url().unwrap().as_str(),
            "https://fop.saj-electric.com/saj/login"
        );
        assert_eq!(
            p.endpoint_url("monitor/site/getUserPlantList").unwrap().as_str(),
            "https://fop.saj-electric.com/saj/monitor/site/getUserPlantList"
        );
    }

    #[test]
    fn path_slashes_are_trimmed() {
        let p = Provider::new("portal.example.com", "/cloud/", Scheme::Http, false);
        assert_eq!(p.path(), "cloud");
        assert_eq!(
            p.base_url().unwrap().as_str(),
            "http://portal.example.com/cloud/"
        );
        assert!(!p.verify_tls());
    }

    #[test]
    fn empty_path_and_port() {
        let p = Provider::new("127.0.0.1:8080", "", Scheme::Http, true);
        assert_eq!(
            p.login_url().unwrap().as_str(),
            "http://127.0.0.1:8080/login"
        );
    }
}
