//! Remembers which planet was shown last so `--pick` does not repeat it on
//! the next run.

use std::fs;
use std::path::{Path, PathBuf};

use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::{debug, warn};

pub const DEFAULT_STATE_FILE: &str = "last_planet.txt";

#[derive(Debug, Clone)]
pub struct LastChoice {
    path: PathBuf,
}

impl LastChoice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name stored by the previous run. A missing or unreadable file means
    /// there is no previous choice.
    pub fn read(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let name = contents.trim();
                (!name.is_empty()).then(|| name.to_string())
            },
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "no previous choice");
                None
            },
        }
    }

    /// Store `name` for the next run. Failures are logged and otherwise ignored.
    pub fn write(&self, name: &str) {
        if let Err(e) = fs::write(&self.path, name) {
            warn!(path = %self.path.display(), error = %e, "failed to save last choice");
        }
    }
}

/// Pick a random name, avoiding `last` whenever another name exists
pub fn pick_fresh<'a, R: Rng + ?Sized>(
    names: &[&'a str],
    last: Option<&str>,
    rng: &mut R,
) -> Option<&'a str> {
    let fresh: Vec<&'a str> = names
        .iter()
        .copied()
        .filter(|name| Some(*name) != last)
        .collect();
    let pool = if fresh.is_empty() { names } else { &fresh[..] };
    pool.choose(rng).copied()
}
