//! Client configuration.
//!
//! Read from the environment:
//!
//! | variable              | default                 |
//! |-----------------------|-------------------------|
//! | `ORGKIT_DOMAIN`       | required (tenant host)  |
//! | `ORGKIT_ORIGIN`       | `https://{ORGKIT_DOMAIN}` |
//! | `ORGKIT_TIMEOUT_SECS` | `30`                    |
//! | `ORGKIT_USER_AGENT`   | `orgkit/{version}`      |

use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

use orgkit_auth::Audience;
use orgkit_core::validate;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MY_ORG_PATH: &str = "my-org/";
const MY_ACCOUNT_PATH: &str = "me/v1/";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} is invalid: {message}")]
    Invalid { name: &'static str, message: String },
}

impl ConfigError {
    fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            name,
            message: message.into(),
        }
    }
}

/// Where and how the HTTP client talks to the tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    origin: Url,
    my_org: Url,
    my_account: Url,
    request_timeout: Duration,
    user_agent: String,
}

impl ClientConfig {
    /// Configuration for `https://{domain}`.
    pub fn for_domain(domain: &str) -> Result<Self, ConfigError> {
        let host = validate::host_name("domain", domain)
            .map_err(|e| ConfigError::invalid("ORGKIT_DOMAIN", e.to_string()))?;
        let origin = Url::parse(&format!("https://{host}/"))
            .map_err(|e| ConfigError::invalid("ORGKIT_DOMAIN", e.to_string()))?;
        Self::with_origin(origin)
    }

    /// Configuration for an explicit origin such as `http://127.0.0.1:8080`.
    pub fn with_origin(origin: Url) -> Result<Self, ConfigError> {
        if origin.cannot_be_a_base() || origin.host_str().is_none() {
            return Err(ConfigError::invalid("ORGKIT_ORIGIN", "must be an absolute http(s) URL"));
        }
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(ConfigError::invalid("ORGKIT_ORIGIN", "must use http or https"));
        }

        let join = |path: &str| {
            origin
                .join(path)
                .map_err(|e| ConfigError::invalid("ORGKIT_ORIGIN", e.to_string()))
        };
        Ok(Self {
            my_org: join(MY_ORG_PATH)?,
            my_account: join(MY_ACCOUNT_PATH)?,
            origin,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: default_user_agent(),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut config = match value("ORGKIT_ORIGIN") {
            Some(origin) => {
                let url = Url::parse(origin.trim())
                    .map_err(|e| ConfigError::invalid("ORGKIT_ORIGIN", e.to_string()))?;
                Self::with_origin(url)?
            }
            None => {
                let domain = value("ORGKIT_DOMAIN").ok_or(ConfigError::Missing("ORGKIT_DOMAIN"))?;
                Self::for_domain(&domain)?
            }
        };

        if let Some(raw) = value("ORGKIT_TIMEOUT_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| {
                    ConfigError::invalid("ORGKIT_TIMEOUT_SECS", "must be a whole number")
                })?;
            if secs == 0 {
                return Err(ConfigError::invalid(
                    "ORGKIT_TIMEOUT_SECS",
                    "must be greater than zero",
                ));
            }
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(agent) = value("ORGKIT_USER_AGENT") {
            config.user_agent = agent.trim().to_string();
        }

        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Base of the My Org API (`{origin}/my-org/`).
    pub fn my_org_base_url(&self) -> &Url {
        &self.my_org
    }

    /// Base of the My Account API (`{origin}/me/v1/`).
    pub fn my_account_base_url(&self) -> &Url {
        &self.my_account
    }

    pub fn base_url(&self, audience: Audience) -> &Url {
        match audience {
            Audience::Organization => &self.my_org,
            Audience::SelfAccount => &self.my_account,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

fn default_user_agent() -> String {
    format!("orgkit/{}", env!("CARGO_PKG_VERSION"))
}
