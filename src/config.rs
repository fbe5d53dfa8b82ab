use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from: String,
}

/// Which backend new uploads go to. Reads always resolve both locator
/// forms regardless of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Local,
    Remote,
}

/// Credentials and target repository for the remote content store.
/// Always passed explicitly to the store constructor.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub api_base: String,
    pub repository: String,
    pub branch: String,
    pub token: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: BackendKind,
    pub local_dir: PathBuf,
    pub remote: Option<RemoteConfig>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "userbase".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "userbase-clients".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };

        let smtp = SmtpConfig {
            host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".into()),
            username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
            password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
            from: std::env::var("SMTP_FROM").unwrap_or_else(|_| "no-reply@userbase.local".into()),
        };

        let backend = match std::env::var("STORAGE_BACKEND").as_deref() {
            Ok("remote") => BackendKind::Remote,
            _ => BackendKind::Local,
        };
        let remote = match std::env::var("CONTENT_API_BASE") {
            Ok(api_base) => Some(RemoteConfig {
                api_base,
                repository: std::env::var("CONTENT_REPOSITORY")?,
                branch: std::env::var("CONTENT_BRANCH").unwrap_or_else(|_| "main".into()),
                token: std::env::var("CONTENT_TOKEN").unwrap_or_default(),
                timeout_secs: std::env::var("CONTENT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(30),
            }),
            Err(_) => None,
        };
        if backend == BackendKind::Remote && remote.is_none() {
            anyhow::bail!("STORAGE_BACKEND=remote requires CONTENT_API_BASE to be set");
        }

        let storage = StorageConfig {
            backend,
            local_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads/user-images")),
            remote,
        };

        Ok(Self { database_url, jwt, smtp, storage })
    }
}
