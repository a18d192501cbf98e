use std::path::PathBuf;

use directories::ProjectDirs;

/// Where metronome keeps its configuration and data
///
/// Follows the XDG Base Directory layout:
/// - Config: $XDG_CONFIG_HOME/{name} (default: ~/.config/{name})
/// - Data: $XDG_DATA_HOME/{name} (default: ~/.local/share/{name})
///
/// Without a usable HOME the platform directories from `directories` are used.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl ProjectPaths {
    pub fn new(name: &str) -> Option<Self> {
        if let Some(home) = home_dir() {
            return Some(Self {
                config_dir: xdg_dir("XDG_CONFIG_HOME", || home.join(".config")).join(name),
                data_dir: xdg_dir("XDG_DATA_HOME", || home.join(".local").join("share"))
                    .join(name),
            });
        }

        let dirs = ProjectDirs::from("", "", name)?;
        Some(Self {
            config_dir: dirs.config_dir().to_path_buf(),
            data_dir: dirs.data_dir().to_path_buf(),
        })
    }

    pub fn config_dir(&self) -> PathBuf {
        self.config_dir.clone()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone()
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}

/// An absolute `$var`, or the fallback (relative values are ignored per XDG)
fn xdg_dir(var: &str, fallback: impl FnOnce() -> PathBuf) -> PathBuf {
    std::env::var_os(var)
        .map(PathBuf::from)
        .filter(|path| path.is_absolute())
        .unwrap_or_else(fallback)
}
