//! Discovery of the chat client's IPC endpoints.
//!
//! The daemon listens on the first free slot of ten: `discord-ipc-0` through
//! `discord-ipc-9`. On unix the sockets live in a per-user runtime or temp
//! directory; lookup order for that directory:
//! 1. `ipc_dir` from [`PresenceConfig`] (explicit override)
//! 2. `$XDG_RUNTIME_DIR` via the `dirs` crate
//! 3. `$TMPDIR`, `$TMP`, `$TEMP`
//! 4. `/tmp`
//!
//! On Windows the endpoints are named pipes and the directory is unused.

use crate::config::PresenceConfig;

use std::env;
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::path::{Path, PathBuf};

use const_format::concatcp;
use log::debug;

/// Number of endpoint slots tried per connection attempt.
pub const ENDPOINT_COUNT: usize = 10;

pub const IPC_ENDPOINT_PREFIX: &str = "discord-ipc-";

pub const PIPE_NAME_PREFIX: &str = concatcp!(r"\\?\pipe\", IPC_ENDPOINT_PREFIX);

const TEMP_DIR_VARS: [&str; 3] = ["TMPDIR", "TMP", "TEMP"];

const FALLBACK_DIR: &str = "/tmp";

/// How the socket directory was determined (for logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointSource {
    Override,
    RuntimeDir,
    TempEnv(&'static str),
    Fallback,
}

impl Display for EndpointSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        match self {
            EndpointSource::Override => write!(f, "configured ipc_dir"),
            EndpointSource::RuntimeDir => write!(f, "XDG_RUNTIME_DIR"),
            EndpointSource::TempEnv(var) => write!(f, "{var}"),
            EndpointSource::Fallback => write!(f, "{FALLBACK_DIR} fallback"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointResolver {
    base_dir: PathBuf,
    source: EndpointSource,
}

impl EndpointResolver {
    /// Use the config override if present, otherwise detect from the environment.
    pub fn from_config(config: &PresenceConfig) -> Self {
        match config.ipc_dir {
            Some(ref dir) => Self::with_base_dir(dir),
            None => Self::detect(),
        }
    }

    pub fn with_base_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: dir.as_ref().to_path_buf(),
            source: EndpointSource::Override,
        }
    }

    pub fn detect() -> Self {
        Self::detect_with(dirs::runtime_dir(), |name| env::var(name).ok())
    }

    /// Detection with injectable inputs.
    pub fn detect_with<F>(runtime_dir: Option<PathBuf>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let (base_dir, source) = if let Some(dir) = runtime_dir {
            (dir, EndpointSource::RuntimeDir)
        } else if let Some((var, dir)) = TEMP_DIR_VARS.iter().find_map(|var| {
            lookup(var)
                .filter(|value| !value.is_empty())
                .map(|value| (*var, PathBuf::from(value)))
        }) {
            (dir, EndpointSource::TempEnv(var))
        } else {
            (PathBuf::from(FALLBACK_DIR), EndpointSource::Fallback)
        };

        debug!("IPC socket directory {} ({source})", base_dir.display());

        Self { base_dir, source }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn source(&self) -> EndpointSource {
        self.source
    }

    pub fn socket_path(&self, index: usize) -> PathBuf {
        self.base_dir.join(format!("{IPC_ENDPOINT_PREFIX}{index}"))
    }

    /// Socket paths in connection order.
    pub fn candidates(&self) -> impl Iterator<Item = PathBuf> + '_ {
        (0..ENDPOINT_COUNT).map(|index| self.socket_path(index))
    }

    pub fn pipe_name(index: usize) -> String {
        format!("{PIPE_NAME_PREFIX}{index}")
    }

    /// Named pipe names in connection order.
    pub fn pipe_names(&self) -> impl Iterator<Item = String> {
        (0..ENDPOINT_COUNT).map(Self::pipe_name)
    }
}
