use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub mail: Option<MailConfig>,
    pub cloudinary: Option<CloudinaryConfig>,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .or_else(|_| env::var("PORT"))
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8000);
        let jwt = JwtConfig::from_env()?;

        Ok(Self {
            port,
            database_url,
            host,
            jwt,
            mail: MailConfig::from_env(),
            cloudinary: CloudinaryConfig::from_env(),
        })
    }
}

impl JwtConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let ttl_hours = env::var("JWT_TTL_HOURS")
            .ok()
            .and_then(|h| h.parse::<i64>().ok())
            .filter(|h| *h > 0)
            .unwrap_or(24 * 7);
        Ok(Self { secret, ttl_hours })
    }
}

impl MailConfig {
    /// `None` when no SMTP account is configured.
    pub fn from_env() -> Option<Self> {
        let username = env::var("EMAIL_USER").ok()?;
        let password = env::var("EMAIL_PASS").ok()?;
        let smtp_host = env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string());
        Some(Self {
            smtp_host,
            username,
            password,
        })
    }
}

impl CloudinaryConfig {
    pub fn from_env() -> Option<Self> {
        Some(Self {
            cloud_name: env::var("CLOUDINARY_CLOUD_NAME").ok()?,
            api_key: env::var("CLOUDINARY_API_KEY").ok()?,
            api_secret: env::var("CLOUDINARY_API_SECRET").ok()?,
        })
    }
}
