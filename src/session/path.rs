//! Session directory selection
//!
//! Decides which directory a dump session writes to. A path that does not
//! exist yet (or is an empty directory) is taken as is. An occupied path is a
//! collision: it may hold an unfinished dump the operator wants to resume, or
//! it may be unrelated. The resolver never guesses; it asks a
//! [`CollisionPolicy`] to choose between resuming, trying a suffixed
//! alternative (`path-2`, `path-3`, ...) and aborting.

use crate::session::naming::STATE_FILE_NAME;
use crate::DumpError;
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Component, Path, PathBuf};

/// The three ways out of a path collision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionDecision {
    /// Use the occupied directory and resume the session stored there
    Resume,
    /// Leave it alone and try the next suffixed name
    Rename,
    /// Stop without touching anything
    Abort,
}

/// Details handed to a [`CollisionPolicy`]
#[derive(Debug, Clone)]
pub struct PathCollision {
    /// The occupied path
    pub path: PathBuf,
    /// Whether the occupied path contains persisted session state
    pub has_session_state: bool,
    /// The path that `Rename` would try next
    pub alternative: PathBuf,
}

/// Decision callback for occupied session paths
pub trait CollisionPolicy {
    fn decide(&mut self, collision: &PathCollision) -> CollisionDecision;
}

impl<P: CollisionPolicy + ?Sized> CollisionPolicy for &mut P {
    fn decide(&mut self, collision: &PathCollision) -> CollisionDecision {
        (**self).decide(collision)
    }
}

impl<P: CollisionPolicy + ?Sized> CollisionPolicy for Box<P> {
    fn decide(&mut self, collision: &PathCollision) -> CollisionDecision {
        (**self).decide(collision)
    }
}

/// Always answers with the same decision; for batch and automated runs
#[derive(Debug, Clone, Copy)]
pub struct FixedPolicy(pub CollisionDecision);

impl CollisionPolicy for FixedPolicy {
    fn decide(&mut self, _collision: &PathCollision) -> CollisionDecision {
        self.0
    }
}

/// Asks the operator on a terminal
///
/// Generic over its input and output so it can be driven by tests. End of
/// input is treated as `Abort`.
pub struct InteractivePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> InteractivePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, collision: &PathCollision) -> std::io::Result<CollisionDecision> {
        writeln!(
            self.output,
            "\nWarning!: \"{}\" path exists",
            collision.path.display()
        )?;
        if collision.has_session_state {
            writeln!(
                self.output,
                "There is a dump in \"{}\", probably incomplete.\n\
                 If you choose resume, the parameters of the current invocation are ignored \
                 and the ones saved in \"{}\" are loaded.",
                collision.path.display(),
                collision.path.join(STATE_FILE_NAME).display()
            )?;
        } else {
            writeln!(
                self.output,
                "\"{}\" is not empty and holds no saved session, so it cannot be resumed.",
                collision.path.display()
            )?;
        }

        loop {
            write!(
                self.output,
                "Resume [r], use \"{}\" instead [n], or abort [a]? ",
                collision.alternative.display()
            )?;
            self.output.flush()?;

            let mut reply = String::new();
            if self.input.read_line(&mut reply)? == 0 {
                return Ok(CollisionDecision::Abort);
            }
            match reply.trim().to_lowercase().as_str() {
                "r" | "resume" | "y" | "yes" => return Ok(CollisionDecision::Resume),
                "n" | "no" | "rename" => return Ok(CollisionDecision::Rename),
                "a" | "abort" | "q" | "quit" => return Ok(CollisionDecision::Abort),
                _ => continue,
            }
        }
    }
}

impl<R: BufRead, W: Write> CollisionPolicy for InteractivePrompt<R, W> {
    fn decide(&mut self, collision: &PathCollision) -> CollisionDecision {
        match self.ask(collision) {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!("Could not read collision decision ({}), aborting", e);
                CollisionDecision::Abort
            }
        }
    }
}

/// Outcome of path resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Directory the session will use
    pub path: PathBuf,
    /// Whether the session at `path` is to be resumed
    pub resume: bool,
}

/// Picks the session directory
pub struct SessionPathResolver<P> {
    policy: P,
}

impl<P: CollisionPolicy> SessionPathResolver<P> {
    pub fn new(policy: P) -> Self {
        Self { policy }
    }

    /// Resolves the directory for a session
    ///
    /// # Arguments
    ///
    /// * `desired` - The directory the operator asked for
    /// * `resume_requested` - Whether `--resume` was given
    ///
    /// # Returns
    ///
    /// * `Ok(ResolvedPath)` - The directory to use and the effective resume flag
    /// * `Err(DumpError::MissingSessionState)` - Resume chosen for a path without state
    /// * `Err(DumpError::PathCollision)` - The policy aborted
    pub fn resolve(&mut self, desired: &Path, resume_requested: bool) -> Result<ResolvedPath, DumpError> {
        let desired = normalize(desired);
        if resume_requested || !is_occupied(&desired)? {
            return Ok(ResolvedPath {
                path: desired,
                resume: resume_requested,
            });
        }

        let mut candidate = desired.clone();
        let mut suffix = 2u32;

        loop {
            if !is_occupied(&candidate)? {
                tracing::info!("Using path {}", candidate.display());
                return Ok(ResolvedPath {
                    path: candidate,
                    resume: false,
                });
            }

            let collision = PathCollision {
                has_session_state: has_session_state(&candidate),
                alternative: suffixed(&desired, suffix),
                path: candidate,
            };

            match self.policy.decide(&collision) {
                CollisionDecision::Resume => {
                    if !collision.has_session_state {
                        return Err(DumpError::MissingSessionState {
                            path: collision.path,
                        });
                    }
                    tracing::info!("Resuming dump in {}", collision.path.display());
                    return Ok(ResolvedPath {
                        path: collision.path,
                        resume: true,
                    });
                }
                CollisionDecision::Rename => {
                    tracing::info!("Trying to use path {}", collision.alternative.display());
                    candidate = collision.alternative;
                    suffix += 1;
                }
                CollisionDecision::Abort => {
                    return Err(DumpError::PathCollision {
                        path: collision.path,
                    });
                }
            }
        }
    }
}

/// Returns true if a session state file exists in `dir`
pub fn has_session_state(dir: &Path) -> bool {
    dir.join(STATE_FILE_NAME).is_file()
}

/// A path is occupied if it is a file or a non-empty directory
fn is_occupied(path: &Path) -> std::io::Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    if path.is_dir() {
        return Ok(fs::read_dir(path)?.next().is_some());
    }
    Ok(true)
}

/// Rebuilds `path` from its components
///
/// Drops trailing separators and `.` parts so that a suffix always lands on
/// the final directory name (`dump/` becomes `dump`, never `dump/-2`).
fn normalize(path: &Path) -> PathBuf {
    let normalized: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

/// `base` with `-n` appended to its final component
fn suffixed(base: &Path, n: u32) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!("-{}", n));
    PathBuf::from(name)
}
