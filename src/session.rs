use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
}

/// Bearer token shared by every request of a client.
///
/// With a backing file the token survives between runs; without one it lives
/// only as long as the process.
#[derive(Debug, Default)]
pub struct Session {
    path: Option<PathBuf>,
    token: RwLock<Option<String>>,
}

impl Session {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            path: None,
            token: RwLock::new(Some(token.into())),
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(crate::config::config_dir()?.join("session.json"))
    }

    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let token = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .context("Failed to read session file")?;
            serde_json::from_str::<SessionFile>(&content)
                .context("Failed to parse session file")?
                .access_token
        } else {
            None
        };

        Ok(Self {
            path: Some(path),
            token: RwLock::new(token),
        })
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.token().is_some()
    }

    pub fn set_token(&self, token: impl Into<String>) -> Result<()> {
        let token = token.into();
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token.clone());
        self.persist(Some(token))
    }

    /// Forgets the token, returning the one that was stored.
    pub fn clear(&self) -> Result<Option<String>> {
        let previous = self.token.write().unwrap_or_else(|e| e.into_inner()).take();
        self.persist(None)?;
        Ok(previous)
    }

    fn persist(&self, access_token: Option<String>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        write_session_file(path, &SessionFile { access_token })
    }
}

fn write_session_file(path: &Path, session: &SessionFile) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(session)?)
        .context("Failed to write session file")?;
    Ok(())
}
