use std::fmt;
use std::net::SocketAddr;

use crate::error::ConfigError;

/// Signing secret used when nothing is configured and `APP_ENV=development`.
/// Never reachable outside development mode.
pub const DEVELOPMENT_FALLBACK_SECRET: &str = "insecure-development-secret-change-me";

const DEFAULT_SESSION_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;
const MAX_SESSION_MAX_AGE_SECS: i64 = 365 * 24 * 60 * 60;

/// Where a signing secret came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    JwtSecret,
    NextAuthSecret,
    DevelopmentFallback,
}

#[derive(Clone)]
pub struct SigningSecret {
    value: String,
    source: SecretSource,
}

impl SigningSecret {
    pub fn as_bytes(&self) -> &[u8] {
        self.value.as_bytes()
    }

    #[cfg(test)]
    pub fn source(&self) -> SecretSource {
        self.source
    }

    pub fn is_fallback(&self) -> bool {
        self.source == SecretSource::DevelopmentFallback
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningSecret")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MongoConfig {
    pub uri: Option<String>,
    pub db_name: Option<String>,
}

#[derive(Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProvidersConfig {
    pub google: Option<OAuthCredentials>,
    pub github: Option<OAuthCredentials>,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub access_token_secret: SigningSecret,
    pub session_secret: SigningSecret,
    pub base_url: String,
    pub session_max_age_secs: i64,
    pub providers: ProvidersConfig,
    pub development: bool,
}

impl AuthConfig {
    /// Cookies get the `Secure` flag when the public URL is https.
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub mongo: MongoConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves the whole configuration from a variable lookup. Empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let development = var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("development"))
            .unwrap_or(false);

        let mongo = MongoConfig {
            uri: var("MONGODB_URI").or_else(|| var("NEXT_PUBLIC_MONGODB_URI")),
            db_name: var("MONGODB_DB").or_else(|| var("MONGODB_DB_NAME")),
        };

        let access_token_secret = resolve_secret(
            &[
                ("JWT_SECRET", SecretSource::JwtSecret),
                ("NEXTAUTH_SECRET", SecretSource::NextAuthSecret),
            ],
            &var,
            development,
            "access tokens",
            "JWT_SECRET or NEXTAUTH_SECRET",
        )?;
        let session_secret = resolve_secret(
            &[("NEXTAUTH_SECRET", SecretSource::NextAuthSecret)],
            &var,
            development,
            "session tokens",
            "NEXTAUTH_SECRET",
        )?;

        let providers = ProvidersConfig {
            google: credentials_pair(&var, "GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET"),
            github: credentials_pair(&var, "GITHUB_CLIENT_ID", "GITHUB_CLIENT_SECRET"),
        };

        let port = match var("APP_PORT") {
            Some(v) => v.parse::<u16>().map_err(|_| ConfigError::Invalid {
                var: "APP_PORT",
                value: v,
            })?,
            None => 8080,
        };

        let session_max_age_secs = match var("SESSION_MAX_AGE") {
            Some(v) => match v.parse::<i64>() {
                Ok(secs) if secs > 0 && secs <= MAX_SESSION_MAX_AGE_SECS => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "SESSION_MAX_AGE",
                        value: v,
                    })
                }
            },
            None => DEFAULT_SESSION_MAX_AGE_SECS,
        };

        let base_url = var("NEXTAUTH_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://localhost:{port}"));

        Ok(Self {
            host: var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            mongo,
            auth: AuthConfig {
                access_token_secret,
                session_secret,
                base_url,
                session_max_age_secs,
                providers,
                development,
            },
        })
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::Invalid {
            var: "APP_HOST",
            value: raw,
        })
    }
}

fn resolve_secret<F>(
    candidates: &[(&str, SecretSource)],
    var: &F,
    development: bool,
    purpose: &'static str,
    vars: &'static str,
) -> Result<SigningSecret, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    for (key, source) in candidates {
        if let Some(value) = var(*key) {
            return Ok(SigningSecret {
                value,
                source: *source,
            });
        }
    }
    if development {
        return Ok(SigningSecret {
            value: DEVELOPMENT_FALLBACK_SECRET.to_string(),
            source: SecretSource::DevelopmentFallback,
        });
    }
    Err(ConfigError::MissingSecret { purpose, vars })
}

fn credentials_pair<F>(var: &F, id_key: &str, secret_key: &str) -> Option<OAuthCredentials>
where
    F: Fn(&str) -> Option<String>,
{
    Some(OAuthCredentials {
        client_id: var(id_key)?,
        client_secret: var(secret_key)?,
    })
}
