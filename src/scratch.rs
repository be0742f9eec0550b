// src/scratch.rs
// Scratch file management: exclusive creation with a randomized unique
// name, the full initial write, and best-effort removal at session end.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::{debug, warn};

use crate::error::ScratchError;

const NAME_PREFIX: &str = "editbridge_";
const SUFFIX_LEN: usize = 8;

/// Name collisions are resolved by retrying with a fresh random suffix,
/// bounded so a pathological temp directory cannot spin forever.
pub const MAX_CREATE_ATTEMPTS: u32 = 100;

/// The temporary file handed to the editor. Lives for the whole session;
/// removal is the session's terminal action.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    removed: bool,
}

impl ScratchFile {
    /// Creates the scratch file in the system temp directory and writes
    /// the initial text.
    pub fn create(text: &str, ext: Option<&str>) -> Result<Self, ScratchError> {
        Self::create_in(&std::env::temp_dir(), text, ext, &mut random_suffix)
    }

    /// Creation with an explicit directory and name source, for tests.
    pub fn create_in(
        dir: &Path,
        text: &str,
        ext: Option<&str>,
        name_source: &mut dyn FnMut() -> String,
    ) -> Result<Self, ScratchError> {
        for _ in 0..MAX_CREATE_ATTEMPTS {
            let mut name = format!("{NAME_PREFIX}{}", name_source());
            if let Some(ext) = ext.filter(|e| !e.is_empty()) {
                name.push('.');
                name.push_str(ext);
            }
            let path = dir.join(&name);

            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(ScratchError::Io(e)),
            };

            if let Err(e) = file.write_all(text.as_bytes()) {
                // A half-written scratch file must not outlive the failure.
                drop(file);
                let _ = std::fs::remove_file(&path);
                return Err(ScratchError::Io(e));
            }

            debug!(path = %path.display(), "created scratch file");
            return Ok(Self {
                path,
                removed: false,
            });
        }

        Err(ScratchError::Exhausted {
            attempts: MAX_CREATE_ATTEMPTS,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Best-effort removal; failure is logged, never escalated. The OS
    /// reclaims the temp directory eventually regardless.
    pub fn remove(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to remove scratch file");
            }
        } else {
            debug!(path = %self.path.display(), "removed scratch file");
        }
    }
}

fn random_suffix() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect()
}
