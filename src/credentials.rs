//! Export token lookup
//!
//! The orchestrator asks a [`CredentialProvider`] for the token once per run
//! and fails with `InvalidRequest("missing token")` when none is available.

use crate::export::config::{DEFAULT_TOKEN_FILE, TOKEN_ENV_VAR};
use std::path::PathBuf;
use tracing::debug;

/// Source of the opaque export token
pub trait CredentialProvider: Send + Sync {
    /// Current token, or `None` when no usable token is configured
    fn token(&self) -> Option<String>;
}

/// Fixed token
#[derive(Clone)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    /// Provider that always returns `token`; an empty string counts as absent
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: normalize(token.into()),
        }
    }

    /// Provider without a token
    pub fn none() -> Self {
        Self { token: None }
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl CredentialProvider for StaticCredentials {
    fn token(&self) -> Option<String> {
        self.token.clone()
    }
}

/// Token from an environment variable, falling back to a token file
///
/// Lookup order:
/// 1. `FINAM_TOKEN` (or the configured variable)
/// 2. `finam_token.txt` in the working directory (or the configured file)
///
/// Values are trimmed; an empty value counts as absent.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    env_var: String,
    token_file: Option<PathBuf>,
}

impl EnvCredentials {
    /// Default lookup (`FINAM_TOKEN`, then `finam_token.txt`)
    pub fn new() -> Self {
        Self {
            env_var: TOKEN_ENV_VAR.to_string(),
            token_file: Some(PathBuf::from(DEFAULT_TOKEN_FILE)),
        }
    }

    /// Read a different environment variable
    pub fn with_env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var = name.into();
        self
    }

    /// Fall back to a different token file, or to none
    pub fn with_token_file(mut self, path: Option<PathBuf>) -> Self {
        self.token_file = path;
        self
    }
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialProvider for EnvCredentials {
    fn token(&self) -> Option<String> {
        if let Some(token) = std::env::var(&self.env_var).ok().and_then(normalize) {
            debug!(source = %self.env_var, "Token loaded from environment");
            return Some(token);
        }

        let path = self.token_file.as_ref()?;
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let token = normalize(content);
                if token.is_some() {
                    debug!(source = %path.display(), "Token loaded from file");
                }
                token
            }
            Err(e) => {
                debug!(source = %path.display(), error = %e, "Token file not readable");
                None
            }
        }
    }
}

fn normalize(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
