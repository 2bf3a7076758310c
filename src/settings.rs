use anyhow::{anyhow, Context, Result};
use log::warn;
use std::{collections::HashMap, fs, path::PathBuf, sync::RwLock};

use crate::breaks::BreakPreferences;

/// Per-user break preferences backed by a JSON file. With no path the store
/// lives in memory only.
pub struct PreferencesStore {
    path: Option<PathBuf>,
    data: RwLock<HashMap<String, BreakPreferences>>,
}

impl PreferencesStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read preferences from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Ignoring unreadable preferences file {}: {err}",
                    path.display()
                );
                HashMap::new()
            })
        } else {
            HashMap::new()
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Stored preferences for `user_id`, or the defaults.
    pub fn get(&self, user_id: &str) -> Result<BreakPreferences> {
        let guard = self
            .data
            .read()
            .map_err(|_| anyhow!("preferences lock poisoned"))?;
        Ok(guard.get(user_id).copied().unwrap_or_default())
    }

    pub fn update(&self, user_id: &str, prefs: BreakPreferences) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("preferences lock poisoned"))?;
        if guard.get(user_id) == Some(&prefs) {
            return Ok(());
        }
        guard.insert(user_id.to_string(), prefs);
        self.persist(&guard)
    }

    fn persist(&self, data: &HashMap<String, BreakPreferences>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write preferences to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaks::PomodoroPreset;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("codepulse-{name}-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn unknown_user_gets_defaults() {
        let store = PreferencesStore::in_memory();
        assert_eq!(store.get("nobody").unwrap(), BreakPreferences::default());
    }

    #[test]
    fn updates_survive_reload() {
        let path = temp_path("prefs");
        let prefs = BreakPreferences {
            pomodoro_interval: 50,
            pomodoro_preset: PomodoroPreset::Extended,
            reminders_enabled: false,
        };

        let store = PreferencesStore::new(path.clone()).unwrap();
        store.update("user_1", prefs).unwrap();

        let reloaded = PreferencesStore::new(path.clone()).unwrap();
        assert_eq!(reloaded.get("user_1").unwrap(), prefs);
        assert_eq!(reloaded.get("user_2").unwrap(), BreakPreferences::default());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn corrupt_file_falls_back_to_empty() {
        let path = temp_path("corrupt");
        fs::write(&path, "{not json").unwrap();

        let store = PreferencesStore::new(path.clone()).unwrap();
        assert_eq!(store.get("user_1").unwrap(), BreakPreferences::default());

        let _ = fs::remove_file(path);
    }
}
