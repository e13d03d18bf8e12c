//! App Store Connect credential resolution and `.env` loading.
//!
//! Credentials are all-or-nothing: the three variables are read together
//! and a partial set is never handed to the toolchain.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::expand_home;
use crate::error::{CredentialError, PreconditionError, Result};

/// Variable naming the `.p8` API key file
pub const KEY_PATH_VAR: &str = "APP_STORE_CONNECT_API_KEY_PATH";
/// Variable holding the API key identifier
pub const KEY_ID_VAR: &str = "APP_STORE_CONNECT_API_KEY_ID";
/// Variable holding the API issuer identifier
pub const ISSUER_ID_VAR: &str = "APP_STORE_CONNECT_API_ISSUER_ID";
/// Variable used to detect CI runs
pub const CI_VAR: &str = "CI";

/// Source of environment values.
///
/// The process environment in production, a plain map in tests.
pub trait EnvSource {
    /// Value of `name`, if set
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads from the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Trimmed, non-empty value of `name`.
fn non_empty(env: &dyn EnvSource, name: &str) -> Option<String> {
    env.var(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Whether `CI` is set to `1`, `true` or `yes` (case-insensitive).
pub fn is_ci(env: &dyn EnvSource) -> bool {
    non_empty(env, CI_VAR)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// A complete App Store Connect API key configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Path to the `.p8` key file, with `~` expanded
    pub key_path: PathBuf,
    /// API key identifier
    pub key_id: String,
    /// Issuer identifier
    pub issuer_id: String,
}

/// Outcome of reading the credential variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// All three variables are set
    Complete(Credentials),
    /// Some variables are set; the named ones are not
    Incomplete(Vec<&'static str>),
    /// None of the variables are set
    Absent,
}

impl Credentials {
    /// Read the three credential variables from `env`.
    ///
    /// Does not touch the filesystem; see [`Credentials::for_upload`] for the
    /// key file check.
    pub fn resolve(env: &dyn EnvSource) -> Resolution {
        let key_path = non_empty(env, KEY_PATH_VAR);
        let key_id = non_empty(env, KEY_ID_VAR);
        let issuer_id = non_empty(env, ISSUER_ID_VAR);

        match (key_path, key_id, issuer_id) {
            (Some(key_path), Some(key_id), Some(issuer_id)) => Resolution::Complete(Credentials {
                key_path: expand_home(&key_path),
                key_id,
                issuer_id,
            }),
            (None, None, None) => Resolution::Absent,
            (key_path, key_id, issuer_id) => {
                let missing = [
                    (KEY_PATH_VAR, key_path.is_none()),
                    (KEY_ID_VAR, key_id.is_none()),
                    (ISSUER_ID_VAR, issuer_id.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, unset)| unset.then_some(name))
                .collect();
                Resolution::Incomplete(missing)
            }
        }
    }

    /// Credentials required by the upload stage.
    ///
    /// Absent and incomplete sets are reported as distinct errors; a complete
    /// set whose key file does not exist is a precondition failure.
    pub fn for_upload(env: &dyn EnvSource) -> Result<Self> {
        match Self::resolve(env) {
            Resolution::Complete(credentials) => {
                if !credentials.key_path.is_file() {
                    return Err(PreconditionError::KeyFileNotFound {
                        path: credentials.key_path,
                    }
                    .into());
                }
                Ok(credentials)
            }
            Resolution::Incomplete(missing) => Err(CredentialError::Incomplete { missing }.into()),
            Resolution::Absent => Err(CredentialError::Missing(KEY_PATH_VAR).into()),
        }
    }

    /// `xcodebuild` authentication arguments for this key.
    pub fn xcodebuild_args(&self) -> Vec<String> {
        vec![
            "-authenticationKeyPath".to_string(),
            self.key_path.display().to_string(),
            "-authenticationKeyID".to_string(),
            self.key_id.clone(),
            "-authenticationKeyIssuerID".to_string(),
            self.issuer_id.clone(),
        ]
    }

    /// `altool` authentication arguments for this key.
    pub fn altool_args(&self) -> Vec<String> {
        vec![
            "--api-key".to_string(),
            self.key_id.clone(),
            "--api-issuer".to_string(),
            self.issuer_id.clone(),
            "--p8-file-path".to_string(),
            self.key_path.display().to_string(),
        ]
    }
}

/// Parse `KEY=VALUE` lines.
///
/// Blank lines and `#` comments are skipped, a leading `export ` is removed,
/// the line is split on the first `=`, and one pair of matching single or
/// double quotes around the value is stripped. Lines without `=` or with an
/// empty key are ignored.
pub fn parse_env_file(contents: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    for raw in contents.lines() {
        let mut line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("export ") {
            line = rest.trim();
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        let mut value = value.trim();
        if value.len() >= 2 {
            let bytes = value.as_bytes();
            let (first, last) = (bytes[0], bytes[value.len() - 1]);
            if first == last && (first == b'"' || first == b'\'') {
                value = &value[1..value.len() - 1];
            }
        }

        pairs.push((key.to_string(), value.to_string()));
    }

    pairs
}

/// First candidate that exists and is a regular file.
pub fn find_env_file(candidates: &[PathBuf]) -> Option<&Path> {
    candidates
        .iter()
        .map(PathBuf::as_path)
        .find(|path| path.is_file())
}

/// Load the first existing `.env` file among `candidates` into the process
/// environment.
///
/// Returns the file that was loaded, if any. Later candidates are not read
/// once one is found. Must run before anything else reads the environment
/// from another thread; the tool is single-threaded.
#[allow(unsafe_code)]
pub fn load_env_file(candidates: &[PathBuf]) -> Result<Option<PathBuf>> {
    let Some(path) = find_env_file(candidates) else {
        return Ok(None);
    };

    let contents = fs::read_to_string(path)?;
    let pairs = parse_env_file(&contents);
    log::debug!("Loading {} variables from {}", pairs.len(), path.display());

    for (key, value) in pairs {
        // SAFETY: called from the main thread before any other thread exists
        unsafe {
            std::env::set_var(key, value);
        }
    }

    Ok(Some(path.to_path_buf()))
}
