use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub const DEFAULT_USER: &str = "default";

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
    /// Journal server URL; unset means the local database is the backend.
    pub remote_url: Option<String>,
    /// Bearer key sent to a remote journal server.
    pub remote_key: Option<String>,
    pub user_id: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "sevenday").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = data_dir.join("sevenday.db");

        let remote_url = std::env::var("SEVENDAY_REMOTE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());
        let remote_key = std::env::var("SEVENDAY_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let user_id = std::env::var("SEVENDAY_USER")
            .ok()
            .filter(|user| !user.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER.to_string());

        Ok(Config {
            db_path,
            data_dir,
            remote_url,
            remote_key,
            user_id,
        })
    }

    /// Load the server API key from disk, or generate a new one.
    ///
    /// Returns `(key, newly_created)` where `newly_created` is true when a
    /// fresh key was just generated (first run).
    pub fn load_or_create_api_key(&self) -> Result<(String, bool)> {
        use rand::Rng;
        use std::fmt::Write;

        let path = self.data_dir.join("api_key");

        if path.exists() {
            let key = std::fs::read_to_string(&path).context("Failed to read API key file")?;
            let key = key.trim().to_string();
            if !key.is_empty() {
                return Ok((key, false));
            }
        }

        let bytes: [u8; 32] = rand::rng().random();
        let key = bytes
            .iter()
            .fold(String::with_capacity(64), |mut acc: String, b| {
                let _ = write!(acc, "{b:02x}");
                acc
            });
        std::fs::write(&path, &key).context("Failed to write API key file")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .context("Failed to set API key file permissions")?;
        }
        eprintln!("Generated new API key: {key}");
        eprintln!("Include in requests: Authorization: Bearer {key}");
        Ok((key, true))
    }
}
