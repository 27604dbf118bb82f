use serde::Deserialize;

/// Deployment mode. Controls error verbosity, cookie flags, CORS and the
/// mail transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvMode {
    Development,
    Production,
}

impl EnvMode {
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("production") {
            EnvMode::Production
        } else {
            EnvMode::Development
        }
    }

    pub fn is_production(self) -> bool {
        self == EnvMode::Production
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_seconds: i64,
    pub cookie_ttl_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub site_title: String,
    pub email_from: String,
    pub master_email: String,
    pub sendgrid_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: EnvMode,
    pub database_url: String,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    pub client_site: String,
    pub cors_origins: Vec<String>,
    pub upload_dir: String,
    pub reset_ttl_minutes: i64,
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let env = EnvMode::parse(&std::env::var("APP_ENV").unwrap_or_default());
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "atelier".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "atelier-users".into()),
            // 60 days
            ttl_seconds: env_i64("JWT_TTL_SECONDS", 60 * 60 * 24 * 60),
            cookie_ttl_seconds: env_i64("JWT_COOKIE_TTL_SECONDS", 60 * 60 * 24 * 60),
        };
        let mail = MailConfig {
            site_title: std::env::var("SITE_TITLE").unwrap_or_else(|_| "Atelier".into()),
            email_from: std::env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "noreply@atelier.local".into()),
            master_email: std::env::var("MASTER_EMAIL")
                .unwrap_or_else(|_| "owner@atelier.local".into()),
            sendgrid_api_key: std::env::var("SENDGRID_API_KEY").ok(),
        };
        let client_site =
            std::env::var("CLIENT_SITE").unwrap_or_else(|_| "http://localhost:3000".into());
        let cors_origins = std::env::var("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "./public/img".into());
        let reset_ttl_minutes = env_i64("RESET_TTL_MINUTES", 10);

        Ok(Self {
            env,
            database_url,
            jwt,
            mail,
            client_site,
            cors_origins,
            upload_dir,
            reset_ttl_minutes,
        })
    }
}
