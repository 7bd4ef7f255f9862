//! Session state persistence
//!
//! The [`CrawlConfig`] of a session is stored as TOML in the session
//! directory. It is the only thing a later process needs to reconstruct the
//! exact crawl parameters, including the engine classification, so a resume
//! never fingerprints the site again. Credentials are not part of it.

use crate::config::CrawlConfig;
use crate::session::naming::STATE_FILE_NAME;
use crate::DumpError;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const STATE_HEADER: &str = "# wikidump session state. Edits take effect on the next --resume.\n";

/// Path of the state file for a session directory
pub fn state_file_path(dir: &Path) -> PathBuf {
    dir.join(STATE_FILE_NAME)
}

/// Writes the session state into the config's session directory
///
/// The file is written to a temporary sibling first and renamed into place,
/// so an interrupted save leaves the previous state intact.
///
/// # Returns
///
/// * `Ok(PathBuf)` - Path of the written state file
/// * `Err(DumpError)` - Serialization or I/O failed
pub fn save_session_state(config: &CrawlConfig) -> Result<PathBuf, DumpError> {
    let state_path = state_file_path(config.path());
    let body = toml::to_string(config)?;

    let temp_path = state_path.with_extension("toml.tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(STATE_HEADER.as_bytes())?;
    file.write_all(body.as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_path, &state_path)?;
    tracing::info!("Session state saved to {}", state_path.display());
    Ok(state_path)
}

/// Loads the session state stored in `dir`
///
/// If the directory was moved since the state was written, the loaded config
/// is pointed at `dir`; every other field is returned exactly as stored.
///
/// # Returns
///
/// * `Ok(CrawlConfig)` - The persisted configuration
/// * `Err(DumpError::MissingSessionState)` - No state file in `dir`
/// * `Err(DumpError::StateParse)` - The state file is not valid session state
pub fn load_session_state(dir: &Path) -> Result<CrawlConfig, DumpError> {
    let state_path = state_file_path(dir);
    if !state_path.is_file() {
        return Err(DumpError::MissingSessionState {
            path: dir.to_path_buf(),
        });
    }

    tracing::info!("Loading session state from {}", state_path.display());
    let content = fs::read_to_string(&state_path)?;
    let mut config: CrawlConfig =
        toml::from_str(&content).map_err(|source| DumpError::StateParse {
            path: state_path.clone(),
            source,
        })?;

    if config.path != dir {
        tracing::warn!(
            "Session was saved for {} but found in {}; continuing in {}",
            config.path.display(),
            dir.display(),
            dir.display()
        );
        config.path = dir.to_path_buf();
    }

    Ok(config)
}

/// Computes a SHA-256 hash of the state file in `dir`
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(DumpError)` - Failed to read the file
pub fn compute_state_hash(dir: &Path) -> Result<String, DumpError> {
    let content = fs::read(state_file_path(dir))?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(hex::encode(hasher.finalize()))
}

/// Loads the session state and returns it together with its hash
pub fn load_session_state_with_hash(dir: &Path) -> Result<(CrawlConfig, String), DumpError> {
    let config = load_session_state(dir)?;
    let hash = compute_state_hash(dir)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ContentSelection, CrawlConfigBuilder, Credentials, EntryPoints, NamespaceFilter,
        NamespaceSelection, NetworkPolicy,
    };
    use crate::engine::Engine;
    use tempfile::TempDir;

    fn sample_config(dir: &Path) -> CrawlConfig {
        CrawlConfigBuilder::new("https://wiki.example.org/index.php")
            .date("20240512")
            .cookies("/home/me/cookies.txt")
            .content(ContentSelection {
                pages: true,
                current_only: false,
                images: true,
            })
            .namespaces(NamespaceFilter {
                include: NamespaceSelection::Only(vec![0, 4, 14]),
                exclude: vec![4],
            })
            .network(NetworkPolicy {
                retries: 7,
                delay_secs: 1.5,
            })
            .credentials(Some(Credentials {
                user: "archiver".to_string(),
                password: "s3cret-pa55".to_string(),
            }))
            .build(
                Engine::MediaWiki,
                dir.to_path_buf(),
                EntryPoints {
                    api: Some("https://wiki.example.org/api.php".to_string()),
                    browse: Some("https://wiki.example.org/index.php".to_string()),
                },
            )
    }

    #[test]
    fn test_roundtrip_preserves_every_persisted_field() {
        let tmp = TempDir::new().unwrap();
        let config = sample_config(tmp.path());

        save_session_state(&config).unwrap();
        let loaded = load_session_state(tmp.path()).unwrap();

        assert_eq!(loaded, config.clone().with_credentials(None));
        assert_eq!(loaded.engine(), Engine::MediaWiki);
        assert_eq!(loaded.network().delay_secs, 1.5);
        assert_eq!(
            loaded.namespaces().include,
            NamespaceSelection::Only(vec![0, 4, 14])
        );
    }

    #[test]
    fn test_credentials_are_never_written() {
        let tmp = TempDir::new().unwrap();
        let config = sample_config(tmp.path());

        let state_path = save_session_state(&config).unwrap();
        let on_disk = fs::read_to_string(state_path).unwrap();

        assert!(!on_disk.contains("s3cret-pa55"));
        assert!(!on_disk.contains("archiver"));
        assert!(load_session_state(tmp.path()).unwrap().credentials().is_none());
    }

    #[test]
    fn test_default_namespaces_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let config = CrawlConfigBuilder::new("https://wiki.example.org")
            .date("20240512")
            .build(Engine::DokuWiki, tmp.path().to_path_buf(), EntryPoints::default());

        save_session_state(&config).unwrap();
        assert_eq!(load_session_state(tmp.path()).unwrap(), config);
    }

    #[test]
    fn test_missing_state() {
        let tmp = TempDir::new().unwrap();
        let err = load_session_state(tmp.path()).unwrap_err();
        assert!(matches!(err, DumpError::MissingSessionState { .. }));
    }

    #[test]
    fn test_corrupt_state() {
        let tmp = TempDir::new().unwrap();
        fs::write(state_file_path(tmp.path()), "engine = 42\n").unwrap();
        let err = load_session_state(tmp.path()).unwrap_err();
        assert!(matches!(err, DumpError::StateParse { .. }));
    }

    #[test]
    fn test_moved_session_is_relocated() {
        let tmp = TempDir::new().unwrap();
        let original = tmp.path().join("first");
        let moved = tmp.path().join("second");
        fs::create_dir(&original).unwrap();

        save_session_state(&sample_config(&original)).unwrap();
        fs::rename(&original, &moved).unwrap();

        let loaded = load_session_state(&moved).unwrap();
        assert_eq!(loaded.path(), moved.as_path());
        assert_eq!(loaded.engine(), Engine::MediaWiki);
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let tmp = TempDir::new().unwrap();
        save_session_state(&sample_config(tmp.path())).unwrap();

        let names: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(STATE_FILE_NAME)]);
    }

    #[test]
    fn test_state_hash() {
        let tmp = TempDir::new().unwrap();
        save_session_state(&sample_config(tmp.path())).unwrap();

        let (_, hash1) = load_session_state_with_hash(tmp.path()).unwrap();
        let hash2 = compute_state_hash(tmp.path()).unwrap();
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }
}
