use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_jwt_expiry")]
    pub jwt_expiry_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_expiry_seconds: default_jwt_expiry(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CorsConfig {
    /// Empty allows any origin.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0:5000".into()
}
fn default_database_url() -> String {
    "sqlite://./data/mindmate.db?mode=rwc".into()
}
fn default_max_connections() -> u32 {
    20
}
fn default_jwt_expiry() -> u64 {
    7 * 24 * 3600
}
fn default_allowed_origins() -> Vec<String> {
    vec![
        "https://www.mindmates.app".into(),
        "http://localhost:5173".into(),
    ]
}

fn looks_like_placeholder_secret(raw: &str) -> bool {
    let normalized = raw.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return true;
    }
    normalized.contains("change_me")
        || normalized.contains("changeme")
        || normalized.contains("replace_me")
        || normalized.contains("replace_with")
        || normalized.starts_with("example")
        || normalized == "devkey"
        || normalized == "devsecret"
        || normalized == "secret"
}

fn validate_secret_configuration(config: &Config) -> Result<()> {
    let jwt_secret = config.auth.jwt_secret.trim();
    if jwt_secret.is_empty() {
        anyhow::bail!("auth.jwt_secret is not set (config file or MINDMATE_JWT_SECRET)");
    }
    if jwt_secret.len() < 32 || looks_like_placeholder_secret(jwt_secret) {
        anyhow::bail!(
            "Invalid auth.jwt_secret: use a strong random secret (at least 32 characters) and never leave placeholder values"
        );
    }
    Ok(())
}

fn parse_origin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Config Loading ───────────────────────────────────────────────────────────

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        Self::load_with_env(path, |name| std::env::var(name).ok())
    }

    /// Load `path` (defaults when absent), then apply `MINDMATE_*` overrides
    /// looked up through `env`.
    pub fn load_with_env(path: &str, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config: Config = if std::path::Path::new(path).exists() {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            tracing::info!("Config file not found at '{}', using defaults", path);
            Config::default()
        };

        if let Some(value) = env("MINDMATE_BIND_ADDRESS") {
            config.server.bind_address = value;
        }
        if let Some(value) = env("MINDMATE_DATABASE_URL") {
            config.database.url = value;
        }
        if let Some(value) = env("MINDMATE_DATABASE_MAX_CONNECTIONS") {
            match value.trim().parse::<u32>() {
                Ok(parsed) if parsed > 0 => config.database.max_connections = parsed,
                _ => tracing::warn!(
                    "Ignoring invalid MINDMATE_DATABASE_MAX_CONNECTIONS value '{}'",
                    value
                ),
            }
        }
        if let Some(value) = env("MINDMATE_JWT_SECRET") {
            config.auth.jwt_secret = value;
        }
        if let Some(value) = env("MINDMATE_JWT_EXPIRY_SECONDS") {
            if let Ok(parsed) = value.trim().parse::<u64>() {
                config.auth.jwt_expiry_seconds = parsed;
            }
        }
        if let Some(value) = env("MINDMATE_ALLOWED_ORIGINS") {
            config.cors.allowed_origins = parse_origin_list(&value);
        }

        validate_secret_configuration(&config)?;
        Ok(config)
    }

    /// Sign a session token for `account_id` with the configured secret and
    /// lifetime.
    pub fn issue_token(&self, account_id: i64) -> Result<String> {
        mindmate_core::auth::create_token(
            account_id,
            &self.auth.jwt_secret,
            self.auth.jwt_expiry_seconds,
        )
        .map_err(|e| anyhow::anyhow!("failed to sign token: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const GOOD_SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn missing_file_uses_defaults_plus_env() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("absent.toml");
        let config = Config::load_with_env(
            path.to_str().expect("utf8"),
            env_from(&[("MINDMATE_JWT_SECRET", GOOD_SECRET)]),
        )
        .expect("load");
        assert_eq!(config.server.bind_address, "0.0.0.0:5000");
        assert_eq!(config.cors.allowed_origins.len(), 2);
        assert!(!path.exists());
    }

    #[test]
    fn file_values_are_read_and_env_wins() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("mindmate.toml");
        fs::write(
            &path,
            format!(
                r#"
[server]
bind_address = "127.0.0.1:9000"

[database]
url = "sqlite::memory:"
max_connections = 3

[auth]
jwt_secret = "{GOOD_SECRET}"

[cors]
allowed_origins = []
"#
            ),
        )
        .expect("write");

        let config = Config::load_with_env(
            path.to_str().expect("utf8"),
            env_from(&[
                ("MINDMATE_DATABASE_MAX_CONNECTIONS", "7"),
                ("MINDMATE_ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
            ]),
        )
        .expect("load");
        assert_eq!(config.server.bind_address, "127.0.0.1:9000");
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.database.max_connections, 7);
        assert_eq!(
            config.cors.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(config.auth.jwt_expiry_seconds, 7 * 24 * 3600);
    }

    #[test]
    fn absent_short_or_placeholder_secrets_are_fatal() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("absent.toml");
        let path = path.to_str().expect("utf8");

        assert!(Config::load_with_env(path, env_from(&[])).is_err());
        assert!(Config::load_with_env(path, env_from(&[("MINDMATE_JWT_SECRET", "short")])).is_err());
        assert!(Config::load_with_env(
            path,
            env_from(&[("MINDMATE_JWT_SECRET", "change_me_change_me_change_me_change_me")])
        )
        .is_err());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("broken.toml");
        fs::write(&path, "[server\nbind_address = ").expect("write");
        assert!(Config::load_with_env(
            path.to_str().expect("utf8"),
            env_from(&[("MINDMATE_JWT_SECRET", GOOD_SECRET)])
        )
        .is_err());
    }

    #[test]
    fn issued_tokens_carry_the_configured_lifetime() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("absent.toml");
        let config = Config::load_with_env(
            path.to_str().expect("utf8"),
            env_from(&[
                ("MINDMATE_JWT_SECRET", GOOD_SECRET),
                ("MINDMATE_JWT_EXPIRY_SECONDS", "600"),
            ]),
        )
        .expect("load");

        let token = config.issue_token(4242).expect("token");
        let claims = mindmate_core::auth::validate_token(&token, GOOD_SECRET).expect("valid");
        assert_eq!(claims.sub, 4242);
        assert_eq!(claims.exp - claims.iat, 600);
    }
}
