use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Player,
    AdminLogin,
    AdminDashboard,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoginError {
    #[error("Invalid password. Please try again.")]
    InvalidPassword,
}

/// Where the "admin is signed in" flag lives for the current terminal session.
pub trait SessionFlags {
    fn is_admin_authenticated(&self) -> bool;
    fn set_admin_authenticated(&mut self, authenticated: bool) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemorySessionFlags {
    authenticated: bool,
}

impl SessionFlags for MemorySessionFlags {
    fn is_admin_authenticated(&self) -> bool {
        self.authenticated
    }

    fn set_admin_authenticated(&mut self, authenticated: bool) -> Result<()> {
        self.authenticated = authenticated;
        Ok(())
    }
}

/// Keeps the flag as a marker file, so restarting the player inside the same
/// shell session keeps the admin signed in.
#[derive(Debug)]
pub struct FileSessionFlags {
    marker: PathBuf,
}

impl FileSessionFlags {
    pub fn for_current_session() -> Self {
        let session_key = env::var("MUSIKIPRI_SESSION")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(parent_process_key);
        Self::in_dir(&env::temp_dir().join("musikipri-sessions"), &session_key)
    }

    pub fn in_dir(dir: &Path, session_key: &str) -> Self {
        let safe_key: String = session_key
            .chars()
            .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
            .collect();
        Self {
            marker: dir.join(format!("{safe_key}.admin")),
        }
    }
}

#[cfg(unix)]
fn parent_process_key() -> String {
    format!("ppid-{}", std::os::unix::process::parent_id())
}

#[cfg(not(unix))]
fn parent_process_key() -> String {
    String::from("default")
}

impl SessionFlags for FileSessionFlags {
    fn is_admin_authenticated(&self) -> bool {
        self.marker.is_file()
    }

    fn set_admin_authenticated(&mut self, authenticated: bool) -> Result<()> {
        if authenticated {
            if let Some(parent) = self.marker.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            fs::write(&self.marker, b"true")
                .with_context(|| format!("failed to write {}", self.marker.display()))?;
        } else if self.marker.exists() {
            fs::remove_file(&self.marker)
                .with_context(|| format!("failed to remove {}", self.marker.display()))?;
        }
        Ok(())
    }
}

pub struct Navigator {
    view: View,
    password: String,
    flags: Box<dyn SessionFlags>,
}

impl Navigator {
    pub fn new(flags: Box<dyn SessionFlags>, password: &str) -> Self {
        let view = if flags.is_admin_authenticated() {
            View::AdminDashboard
        } else {
            View::Player
        };
        tracing::info!(?view, "initial view");
        Self {
            view,
            password: password.to_string(),
            flags,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn is_authenticated(&self) -> bool {
        self.flags.is_admin_authenticated()
    }

    pub fn navigate(&mut self, target: View) {
        self.view = match target {
            View::AdminDashboard if !self.is_authenticated() => View::AdminLogin,
            other => other,
        };
        tracing::debug!(requested = ?target, view = ?self.view, "navigate");
    }

    pub fn login(&mut self, password: &str) -> Result<(), LoginError> {
        if password != self.password {
            tracing::warn!("admin login rejected");
            return Err(LoginError::InvalidPassword);
        }

        if let Err(err) = self.flags.set_admin_authenticated(true) {
            tracing::warn!("could not persist admin session flag: {err:#}");
        }
        self.view = View::AdminDashboard;
        tracing::info!("admin logged in");
        Ok(())
    }

    pub fn logout(&mut self) {
        if let Err(err) = self.flags.set_admin_authenticated(false) {
            tracing::warn!("could not clear admin session flag: {err:#}");
        }
        self.view = View::Player;
        tracing::info!("admin logged out");
    }
}
