//! YAML files as the save store.
//!
//! Layout under the configured save directory:
//!
//! ```text
//! <save_dir>/options.yaml        user settings
//! <save_dir>/games/<NAME>.yaml   one saved game each
//! ```
//!
//! Names are upper-cased and reduced to letters and digits before they
//! touch the filesystem.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use daggorath_presentation::{PersistError, SaveStore};
use daggorath_types::Settings;
use tracing::{debug, info};

use crate::demo::{DungeonState, SharedDungeon};

const GAMES_DIR: &str = "games";
const OPTIONS_FILE: &str = "options.yaml";
const SAVE_EXTENSION: &str = "yaml";

/// Reduce a typed name to the form used on disk.
pub fn sanitize_name(name: &str) -> Option<String> {
    let clean: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if clean.is_empty() { None } else { Some(clean) }
}

fn storage(action: &str, path: &Path, err: &impl std::fmt::Display) -> PersistError {
    PersistError::Storage {
        message: format!("{action} {}: {err}", path.display()),
    }
}

/// File-backed [`SaveStore`] sharing the live game state.
#[derive(Debug)]
pub struct FileSaveStore {
    root: PathBuf,
    state: SharedDungeon,
}

impl FileSaveStore {
    /// Open (creating if needed) the save directory at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Storage`] if the directories cannot be
    /// created.
    pub fn open(root: &Path, state: SharedDungeon) -> Result<Self, PersistError> {
        let games = root.join(GAMES_DIR);
        fs::create_dir_all(&games).map_err(|e| storage("create", &games, &e))?;
        debug!(root = %root.display(), "Save store opened");
        Ok(Self {
            root: root.to_path_buf(),
            state,
        })
    }

    /// Settings saved by a previous session, if any.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Storage`] if the file exists but cannot be
    /// read or parsed.
    pub fn load_options(&self) -> Result<Option<Settings>, PersistError> {
        let path = self.root.join(OPTIONS_FILE);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage("read", &path, &e)),
        };
        let settings = serde_yml::from_str(&text).map_err(|e| storage("parse", &path, &e))?;
        Ok(Some(settings))
    }

    fn game_path(&self, name: &str) -> Result<PathBuf, PersistError> {
        let clean = sanitize_name(name).ok_or_else(|| PersistError::NotFound {
            name: name.to_owned(),
        })?;
        Ok(self
            .root
            .join(GAMES_DIR)
            .join(clean)
            .with_extension(SAVE_EXTENSION))
    }
}

impl SaveStore for FileSaveStore {
    fn list_saves(&self) -> Result<Vec<String>, PersistError> {
        let dir = self.root.join(GAMES_DIR);
        let entries = fs::read_dir(&dir).map_err(|e| storage("list", &dir, &e))?;
        let mut saves: Vec<(SystemTime, String)> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some(SAVE_EXTENSION) {
                    return None;
                }
                let name = path.file_stem()?.to_str()?.to_owned();
                let modified = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                Some((modified, name))
            })
            .collect();
        saves.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        Ok(saves.into_iter().map(|(_, name)| name).collect())
    }

    fn save_game(&mut self, name: &str) -> Result<(), PersistError> {
        let path = self.game_path(name)?;
        let yaml = serde_yml::to_string(&*self.state.lock())
            .map_err(|e| storage("encode", &path, &e))?;
        fs::write(&path, yaml).map_err(|e| storage("write", &path, &e))?;
        info!(path = %path.display(), "Game saved");
        Ok(())
    }

    fn load_game(&mut self, name: &str) -> Result<(), PersistError> {
        let path = self.game_path(name)?;
        let text = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                PersistError::NotFound {
                    name: name.to_owned(),
                }
            } else {
                storage("read", &path, &e)
            }
        })?;
        let restored: DungeonState =
            serde_yml::from_str(&text).map_err(|e| storage("parse", &path, &e))?;
        *self.state.lock() = restored;
        info!(path = %path.display(), "Game restored");
        Ok(())
    }

    fn delete_save(&mut self, name: &str) -> Result<(), PersistError> {
        let path = self.game_path(name)?;
        fs::remove_file(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                PersistError::NotFound {
                    name: name.to_owned(),
                }
            } else {
                storage("delete", &path, &e)
            }
        })?;
        info!(path = %path.display(), "Save deleted");
        Ok(())
    }

    fn save_options(&mut self, settings: &Settings) -> Result<(), PersistError> {
        let path = self.root.join(OPTIONS_FILE);
        let yaml = serde_yml::to_string(settings).map_err(|e| storage("encode", &path, &e))?;
        fs::write(&path, yaml).map_err(|e| storage("write", &path, &e))?;
        info!(path = %path.display(), "Options saved");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    struct TempDir(PathBuf);

    impl TempDir {
        fn new(tag: &str) -> Self {
            let dir = std::env::temp_dir().join(format!(
                "daggorath-saves-{tag}-{}",
                std::process::id()
            ));
            let _ = fs::remove_dir_all(&dir);
            Self(dir)
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    fn store(dir: &TempDir) -> (FileSaveStore, SharedDungeon) {
        let state = Arc::new(Mutex::new(DungeonState::default()));
        let store = FileSaveStore::open(&dir.0, Arc::clone(&state)).unwrap();
        (store, state)
    }

    #[test]
    fn names_are_cleaned() {
        assert_eq!(sanitize_name("den 2!"), Some("DEN2".to_owned()));
        assert_eq!(sanitize_name("../"), None);
    }

    #[test]
    fn saved_game_restores_state() {
        let dir = TempDir::new("roundtrip");
        let (mut store, state) = store(&dir);
        state.lock().level = 4;
        store.save_game("den").unwrap();
        state.lock().level = 1;

        assert_eq!(store.list_saves().unwrap(), vec!["DEN".to_owned()]);
        store.load_game("DEN").unwrap();
        assert_eq!(state.lock().level, 4);
    }

    #[test]
    fn missing_game_is_not_found() {
        let dir = TempDir::new("missing");
        let (mut store, _) = store(&dir);
        assert!(matches!(
            store.load_game("PIT"),
            Err(PersistError::NotFound { .. })
        ));
        assert!(matches!(
            store.delete_save("PIT"),
            Err(PersistError::NotFound { .. })
        ));
    }

    #[test]
    fn delete_removes_from_listing() {
        let dir = TempDir::new("delete");
        let (mut store, _) = store(&dir);
        store.save_game("ONE").unwrap();
        store.save_game("TWO").unwrap();
        store.delete_save("ONE").unwrap();
        assert_eq!(store.list_saves().unwrap(), vec!["TWO".to_owned()]);
    }

    #[test]
    fn options_round_trip_through_the_file() {
        let dir = TempDir::new("options");
        let (mut store, _) = store(&dir);
        assert_eq!(store.load_options().unwrap(), None);
        let settings = Settings {
            volume: 40,
            ..Settings::default()
        };
        store.save_options(&settings).unwrap();
        assert_eq!(store.load_options().unwrap(), Some(settings));
    }
}
