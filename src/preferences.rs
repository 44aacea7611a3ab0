use crate::models::ThemePreference;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{error, warn};

/// The dark-mode flag, kept in its own small file.
pub struct Preferences {
    path: PathBuf,
    theme: Mutex<ThemePreference>,
}

impl Preferences {
    /// Missing or unreadable files fall back to the light theme.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let theme = load_theme(&path).await;
        Self {
            path,
            theme: Mutex::new(theme),
        }
    }

    pub async fn theme(&self) -> ThemePreference {
        *self.theme.lock().await
    }

    pub async fn toggle_dark_mode(&self) -> Result<ThemePreference, std::io::Error> {
        let mut theme = self.theme.lock().await;
        let next = ThemePreference {
            dark_mode: !theme.dark_mode,
        };
        persist_theme(&self.path, &next).await?;
        *theme = next;
        Ok(next)
    }
}

async fn load_theme(path: &Path) -> ThemePreference {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(theme) => theme,
            Err(err) => {
                warn!("failed to parse preference file: {err}");
                ThemePreference::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => ThemePreference::default(),
        Err(err) => {
            error!("failed to read preference file: {err}");
            ThemePreference::default()
        }
    }
}

async fn persist_theme(path: &Path, theme: &ThemePreference) -> Result<(), std::io::Error> {
    let payload = serde_json::to_vec_pretty(theme)?;
    fs::write(path, payload).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_path() -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!("attendance_prefs_{}_{}.json", std::process::id(), nanos));
        path
    }

    #[tokio::test]
    async fn absent_preference_means_light_theme() {
        let prefs = Preferences::load(unique_path()).await;
        assert!(!prefs.theme().await.dark_mode);
    }

    #[tokio::test]
    async fn toggle_survives_reload() {
        let path = unique_path();
        let prefs = Preferences::load(&path).await;
        assert!(prefs.toggle_dark_mode().await.unwrap().dark_mode);

        let reloaded = Preferences::load(&path).await;
        assert!(reloaded.theme().await.dark_mode);
        assert!(!reloaded.toggle_dark_mode().await.unwrap().dark_mode);
        let _ = std::fs::remove_file(path);
    }
}
