use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, fmt, str::FromStr};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: String,
    pub uploads_dir: String,
    pub teacher_password: String,
    pub max_upload_bytes: usize,
}

/// Keeps the teacher password out of startup logs.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("data_dir", &self.data_dir)
            .field("uploads_dir", &self.uploads_dir)
            .field("teacher_password", &"<redacted>")
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Grade lookup and lecture sharing API")]
pub struct Args {
    /// Host to bind to (overrides CLASSROOM_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides CLASSROOM_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory holding students.json and lectures.json (overrides CLASSROOM_DATA_DIR)
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Directory where lecture files are stored (overrides CLASSROOM_UPLOADS_DIR)
    #[arg(long)]
    pub uploads_dir: Option<String>,

    /// Shared teacher password (overrides CLASSROOM_TEACHER_PASSWORD)
    #[arg(long)]
    pub teacher_password: Option<String>,

    /// Maximum accepted upload size in bytes (overrides CLASSROOM_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    /// Merge already parsed CLI args over the environment.
    pub fn from_args(args: Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env::var("CLASSROOM_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_env("CLASSROOM_PORT", 5000u16)?;
        let env_data = env::var("CLASSROOM_DATA_DIR").unwrap_or_else(|_| "./data".into());
        let env_uploads = env::var("CLASSROOM_UPLOADS_DIR").unwrap_or_else(|_| "./uploads".into());
        let env_password = env::var("CLASSROOM_TEACHER_PASSWORD").ok();
        let env_max_upload = parse_env("CLASSROOM_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;

        let teacher_password = match args.teacher_password.or(env_password) {
            Some(password) if !password.is_empty() => password,
            _ => bail!("teacher password must be set via --teacher-password or CLASSROOM_TEACHER_PASSWORD"),
        };

        // --- Merge ---
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            data_dir: args.data_dir.unwrap_or(env_data),
            uploads_dir: args.uploads_dir.unwrap_or(env_uploads),
            teacher_password,
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_args_override_defaults() -> Result<()> {
        let args = Args::try_parse_from([
            "classroom-store",
            "--port",
            "8080",
            "--data-dir",
            "/tmp/data",
            "--teacher-password",
            "pw",
        ])?;
        let cfg = AppConfig::from_args(args)?;
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.data_dir, "/tmp/data");
        assert_eq!(cfg.teacher_password, "pw");
        assert_eq!(cfg.addr(), format!("{}:8080", cfg.host));
        assert!(!format!("{:?}", cfg).contains("pw\""));
        Ok(())
    }
}
