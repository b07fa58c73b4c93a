use url::Url;

/// Process configuration, read once at startup. Redirect targets are parsed
/// eagerly so a typo fails the boot instead of the first redirect.
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub hcaptcha_secret: String,
    pub hcaptcha_site_key: String,
    pub human_redirect_url: Url,
    pub bot_redirect_url: Url,
    pub audit_sink_url: Url,
    /// Bearer token guarding the admin reset endpoint. Unset disables the
    /// endpoint entirely.
    pub admin_token: Option<String>,
    pub port: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is not a valid URL: {source}")]
    InvalidUrl {
        name: &'static str,
        source: url::ParseError,
    },
}

const DEFAULT_HUMAN_REDIRECT: &str = "https://example.com/human";
const DEFAULT_BOT_REDIRECT: &str = "https://example.com/bot";

impl GateConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            hcaptcha_secret: require("GATEHOUSE_HCAPTCHA_SECRET")?,
            hcaptcha_site_key: require("GATEHOUSE_HCAPTCHA_SITE_KEY")?,
            human_redirect_url: parse_url(
                "GATEHOUSE_HUMAN_REDIRECT_URL",
                optional("GATEHOUSE_HUMAN_REDIRECT_URL")
                    .unwrap_or_else(|| DEFAULT_HUMAN_REDIRECT.to_string()),
            )?,
            bot_redirect_url: parse_url(
                "GATEHOUSE_BOT_REDIRECT_URL",
                optional("GATEHOUSE_BOT_REDIRECT_URL")
                    .unwrap_or_else(|| DEFAULT_BOT_REDIRECT.to_string()),
            )?,
            audit_sink_url: parse_url("GATEHOUSE_AUDIT_SINK_URL", require("GATEHOUSE_AUDIT_SINK_URL")?)?,
            admin_token: optional("GATEHOUSE_ADMIN_TOKEN"),
            port: optional("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
        })
    }
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn parse_url(name: &'static str, value: String) -> Result<Url, ConfigError> {
    Url::parse(&value).map_err(|source| ConfigError::InvalidUrl { name, source })
}
