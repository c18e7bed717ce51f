use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

pub const REFRESH_COOKIE: &str = "refresh_token";

const DAY_SECS: u64 = 24 * 60 * 60;
const SESSION_MAX_AGE: u64 = 7 * DAY_SECS;
const REMEMBER_MAX_AGE: u64 = 30 * DAY_SECS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    #[default]
    Local,
    Dev,
    Prod,
}

impl FromStr for AppEnv {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => Err(format!("unknown APP_ENV '{other}'")),
        }
    }
}

impl fmt::Display for AppEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Local => "local",
            Self::Dev => "dev",
            Self::Prod => "prod",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    None,
}

impl SameSite {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

/// Attributes shared by every refresh cookie the service sets or clears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePolicy {
    pub domain: String,
    pub secure: bool,
    pub same_site: SameSite,
}

impl CookiePolicy {
    pub fn from_env(env: AppEnv, domain: impl Into<String>) -> Self {
        let same_site = match env {
            AppEnv::Local | AppEnv::Dev => SameSite::Lax,
            AppEnv::Prod => SameSite::None,
        };
        Self {
            domain: domain.into(),
            secure: env == AppEnv::Prod,
            same_site,
        }
    }

    fn attributes(&self) -> String {
        let mut attrs = format!(
            "Domain={}; Path=/; HttpOnly; SameSite={}",
            self.domain,
            self.same_site.as_str()
        );
        if self.secure {
            attrs.push_str("; Secure");
        }
        attrs
    }

    /// `Set-Cookie` value carrying a refresh token.
    pub fn set_refresh_cookie(&self, refresh_token: &str, remember: bool) -> String {
        let max_age = if remember { REMEMBER_MAX_AGE } else { SESSION_MAX_AGE };
        format!(
            "{REFRESH_COOKIE}={refresh_token}; Max-Age={max_age}; {}",
            self.attributes()
        )
    }

    /// `Set-Cookie` value that removes the refresh cookie.
    pub fn clear_refresh_cookie(&self) -> String {
        format!(
            "{REFRESH_COOKIE}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; {}",
            self.attributes()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(cookie: &str) -> Vec<String> {
        cookie
            .split("; ")
            .skip(1)
            .filter(|part| !part.starts_with("Max-Age") && !part.starts_with("Expires"))
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_local_cookie_is_lax_and_not_secure() {
        let policy = CookiePolicy::from_env(AppEnv::Local, "localhost");
        let cookie = policy.set_refresh_cookie("r1", false);
        assert!(cookie.starts_with("refresh_token=r1; Max-Age=604800;"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Domain=localhost"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_prod_cookie_is_secure_and_cross_site() {
        let policy = CookiePolicy::from_env(AppEnv::Prod, "example.com");
        let cookie = policy.set_refresh_cookie("r1", true);
        assert!(cookie.contains("Max-Age=2592000"));
        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.ends_with("; Secure"));
    }

    #[test]
    fn test_clear_cookie_matches_set_attributes() {
        for env in [AppEnv::Local, AppEnv::Dev, AppEnv::Prod] {
            let policy = CookiePolicy::from_env(env, "example.com");
            let set = policy.set_refresh_cookie("r1", true);
            let clear = policy.clear_refresh_cookie();
            assert!(clear.starts_with("refresh_token=;"));
            assert!(clear.contains("Max-Age=0"));
            assert_eq!(attrs(&set), attrs(&clear), "attributes differ for {env}");
        }
    }

    #[test]
    fn test_app_env_parsing() {
        assert_eq!("PROD".parse::<AppEnv>().unwrap(), AppEnv::Prod);
        assert_eq!("dev".parse::<AppEnv>().unwrap(), AppEnv::Dev);
        assert!("staging".parse::<AppEnv>().is_err());
    }
}
