use anyhow::{Context, Result, anyhow};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub mailbox: MailboxConfig,
    #[serde(default)]
    pub downloads: DownloadsConfig,
    pub photos: Option<PhotosConfig>,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MailboxConfig {
    pub host: String,
    #[serde(default = "default_imap_port")]
    pub port: u16,
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
    pub username: String,
    /// When absent, the password is read from the OS keyring
    /// (stored via `mailpix set-password`).
    pub password: Option<String>,
    /// Sender address the search and re-validation filter on.
    pub sender: String,
    /// Exact substring the decoded Subject must contain.
    pub subject: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DownloadsConfig {
    /// Allow-listed file extensions, dotted (".jpg"). Compared case-insensitively.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PhotosConfig {
    pub client_id: String,
    pub album_name: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScheduleConfig {
    #[serde(default = "default_days_back")]
    pub days_back: u32,
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
    /// Weekday the sender usually posts on. Advisory: logged, never filters.
    #[serde(default = "default_target_weekday")]
    pub target_weekday: String,
}

/// Extraction policy derived from `[downloads]`: lowercased dotted
/// extensions, byte ceiling, staging path.
#[derive(Debug, Clone)]
pub struct DownloadPolicy {
    pub extensions: Vec<String>,
    pub max_bytes: u64,
    pub staging_dir: PathBuf,
}

impl DownloadPolicy {
    pub fn allows_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e == ext)
    }

    pub fn within_size(&self, len: usize) -> bool {
        len as u64 <= self.max_bytes
    }
}

impl DownloadsConfig {
    pub fn policy(&self) -> DownloadPolicy {
        DownloadPolicy {
            extensions: self.extensions.iter().map(|e| e.to_lowercase()).collect(),
            max_bytes: self.max_file_size_mb * 1024 * 1024,
            staging_dir: self.staging_dir.clone(),
        }
    }
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            staging_dir: default_staging_dir(),
            max_file_size_mb: default_max_file_size_mb(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            days_back: default_days_back(),
            interval_minutes: default_interval_minutes(),
            target_weekday: default_target_weekday(),
        }
    }
}

impl ScheduleConfig {
    pub fn target_weekday(&self) -> Result<Weekday> {
        self.target_weekday
            .parse::<Weekday>()
            .map_err(|_| anyhow!("invalid target_weekday: {:?}", self.target_weekday))
    }
}

fn default_imap_port() -> u16 {
    993
}

fn default_use_tls() -> bool {
    true
}

fn default_extensions() -> Vec<String> {
    [".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("./staging")
}

fn default_max_file_size_mb() -> u64 {
    50
}

fn default_redirect_uri() -> String {
    "http://127.0.0.1:8080/callback".to_string()
}

fn default_days_back() -> u32 {
    7
}

fn default_interval_minutes() -> u64 {
    60
}

fn default_target_weekday() -> String {
    "Fri".to_string()
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow!("no config dir available"))?
        .join("mailpix"))
}

pub fn config_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("config.toml");
    Ok(p)
}

/// Load and validate the config, from `path` when given, otherwise from the
/// per-user config dir. A missing default config produces an editable
/// template and an error telling the user to fill it in.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = config_path()?;
            if !p.exists() {
                write_template(&p)?;
                return Err(anyhow!(
                    "Created template config at {} — edit it and run again",
                    p.display()
                ));
            }
            p
        }
    };

    let s = fs::read_to_string(&path)
        .with_context(|| format!("cannot read config file {}", path.display()))?;
    let cfg: Config = toml::from_str(&s)
        .with_context(|| format!("cannot parse config file {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

fn write_template(path: &Path) -> Result<()> {
    let sample = Config {
        mailbox: MailboxConfig {
            host: "imap.gmail.com".to_string(),
            port: default_imap_port(),
            use_tls: true,
            username: "you@example.com".to_string(),
            password: None,
            sender: "news@school.org".to_string(),
            subject: "[Weekly Update]".to_string(),
        },
        downloads: DownloadsConfig::default(),
        photos: Some(PhotosConfig {
            client_id: "YOUR_CLIENT_ID.apps.googleusercontent.com".to_string(),
            album_name: "School Photos".to_string(),
            redirect_uri: default_redirect_uri(),
        }),
        schedule: ScheduleConfig::default(),
    };
    let tom = toml::to_string_pretty(&sample)?;
    fs::write(path, tom)?;
    Ok(())
}

impl Config {
    /// Fail fast on anything a run would trip over later. Runs once at load.
    pub fn validate(&self) -> Result<()> {
        if self.mailbox.host.is_empty() {
            return Err(anyhow!("[mailbox] host must not be empty"));
        }
        if self.mailbox.username.is_empty() {
            return Err(anyhow!("[mailbox] username must not be empty"));
        }
        if self.mailbox.sender.is_empty() {
            return Err(anyhow!("[mailbox] sender must not be empty"));
        }
        if self.mailbox.subject.is_empty() {
            return Err(anyhow!("[mailbox] subject must not be empty"));
        }
        if self.downloads.extensions.is_empty() {
            return Err(anyhow!("[downloads] extensions must not be empty"));
        }
        for ext in &self.downloads.extensions {
            if !ext.starts_with('.') || ext.len() < 2 {
                return Err(anyhow!(
                    "[downloads] extensions entries must look like \".jpg\", got {ext:?}"
                ));
            }
        }
        if self.downloads.max_file_size_mb == 0 {
            return Err(anyhow!("[downloads] max_file_size_mb must be positive"));
        }
        self.schedule.target_weekday()?;
        if let Some(photos) = &self.photos {
            if photos.client_id.is_empty() {
                return Err(anyhow!("[photos] client_id must not be empty"));
            }
            if photos.album_name.is_empty() {
                return Err(anyhow!("[photos] album_name must not be empty"));
            }
        }
        Ok(())
    }
}
