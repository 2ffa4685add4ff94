//! Mocked sign-in. There are no accounts: being "logged in" means a flag file
//! holding a display name exists.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::app_dirs::AppDirs;

/// What the host asks before offering to keep a result.
pub trait SessionStateProvider {
    fn is_logged_in(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct FileLoginFlag {
    path: PathBuf,
}

impl FileLoginFlag {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::login_flag_path().unwrap_or_else(|| PathBuf::from("typewise_user"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn sign_in(&self, user: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, user.trim())?;
        info!(user = user.trim(), "signed in");
        Ok(())
    }

    pub fn sign_out(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("signed out");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn user(&self) -> Option<String> {
        fs::read_to_string(&self.path)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

impl SessionStateProvider for FileLoginFlag {
    fn is_logged_in(&self) -> bool {
        self.user().is_some()
    }
}

/// Fixed answer, for tests and for running without any state directory.
#[derive(Debug, Clone, Copy)]
pub struct StaticLoginState(pub bool);

impl SessionStateProvider for StaticLoginState {
    fn is_logged_in(&self) -> bool {
        self.0
    }
}
