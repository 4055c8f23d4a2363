use anyhow::Context;
use jsonwebtoken::Algorithm;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub issuer: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub name: String,
    pub api_url: String,
    pub api_token: String,
    pub max_caption_length: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub api_version: String,
    pub allowed_origins: Vec<String>,
    pub jwt: JwtConfig,
    pub model: ModelConfig,
}

fn require(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("{name} must be set"))
}

fn parse_algorithm(raw: &str) -> anyhow::Result<Algorithm> {
    raw.parse()
        .map_err(|_| anyhow::anyhow!("JWT_ALGORITHM is not a supported algorithm"))
}

pub(crate) fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl AppConfig {
    /// Reads the full configuration from the environment. Every variable is
    /// required; a missing one aborts startup.
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt = JwtConfig {
            secret: require("JWT_SECRET")?,
            algorithm: parse_algorithm(&require("JWT_ALGORITHM")?)?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "sightline".into()),
            ttl_minutes: require("JWT_TTL_MINUTES")?
                .parse()
                .context("JWT_TTL_MINUTES must be an integer")?,
        };
        let model = ModelConfig {
            name: require("MODEL_NAME")?,
            api_url: require("MODEL_API_URL")?,
            api_token: require("MODEL_API_TOKEN")?,
            max_caption_length: require("MAX_CAPTION_LENGTH")?
                .parse()
                .context("MAX_CAPTION_LENGTH must be an integer")?,
        };
        Ok(Self {
            database_url: require("DATABASE_URL")?,
            host: require("APP_HOST")?,
            port: require("APP_PORT")?
                .parse()
                .context("APP_PORT must be a port number")?,
            api_version: require("API_VERSION")?,
            allowed_origins: parse_origins(&require("ALLOWED_ORIGINS")?),
            jwt,
            model,
        })
    }

    pub fn cors_allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_origins_splits_and_trims() {
        let origins = parse_origins("http://localhost:3000, https://app.example.com ,");
        assert_eq!(
            origins,
            vec![
                "http://localhost:3000".to_string(),
                "https://app.example.com".to_string()
            ]
        );
    }

    #[test]
    fn parse_origins_wildcard() {
        let origins = parse_origins("*");
        assert_eq!(origins, vec!["*".to_string()]);
    }

    #[test]
    fn require_fails_fast_on_unset_variable() {
        let err = require("SIGHTLINE_NEVER_SET_FOR_TEST").unwrap_err();
        assert!(err.to_string().contains("SIGHTLINE_NEVER_SET_FOR_TEST must be set"));
    }

    #[test]
    fn require_reads_a_set_variable() {
        std::env::set_var("SIGHTLINE_SET_FOR_TEST", "value");
        assert_eq!(require("SIGHTLINE_SET_FOR_TEST").unwrap(), "value");
    }

    #[test]
    fn algorithm_parsing() {
        assert_eq!(parse_algorithm("HS256").unwrap(), Algorithm::HS256);
        assert_eq!(parse_algorithm("HS512").unwrap(), Algorithm::HS512);
        assert!(parse_algorithm("HS999").is_err());
        assert!(parse_algorithm("none").is_err());
    }
}
