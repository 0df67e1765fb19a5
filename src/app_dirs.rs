use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("patlock"),
            )
        } else {
            ProjectDirs::from("", "", "patlock").map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }

    /// Where the rejected pattern history lives.
    pub fn state_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("rejected.json"))
    }

    pub fn log_dir() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("logs"))
    }
}
