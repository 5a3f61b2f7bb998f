//! Preference storage seam.
//!
//! The selector persists the chosen output name through a
//! [`PreferenceStore`] injected at construction, never a process-wide
//! singleton, so selection logic stays testable against a fake store.
//! Values live in a component-scoped string namespace with no further
//! schema.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};

/// Component scope for playback preferences.
pub const PLAYBACK_SCOPE: &str = "playback";

/// Key holding the selected output name.
pub const OUTPUT_PLUGIN_KEY: &str = "output_plugin";

/// Scoped string key/value store. Writes are last-write-wins.
pub trait PreferenceStore: Send + Sync {
    fn get_string(&self, scope: &str, key: &str) -> Option<String>;
    fn set_string(&self, scope: &str, key: &str, value: &str);
}

type ScopedValues = HashMap<String, HashMap<String, String>>;

fn get_scoped(values: &ScopedValues, scope: &str, key: &str) -> Option<String> {
    values.get(scope).and_then(|scoped| scoped.get(key)).cloned()
}

fn set_scoped(values: &mut ScopedValues, scope: &str, key: &str, value: &str) {
    values
        .entry(scope.to_string())
        .or_default()
        .insert(key.to_string(), value.to_string());
}

/// In-memory store; the fake of choice for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryPreferences {
    values: Mutex<ScopedValues>,
}

impl PreferenceStore for MemoryPreferences {
    fn get_string(&self, scope: &str, key: &str) -> Option<String> {
        get_scoped(&self.values.lock().unwrap(), scope, key)
    }

    fn set_string(&self, scope: &str, key: &str, value: &str) {
        set_scoped(&mut self.values.lock().unwrap(), scope, key, value);
    }
}

/// TOML-file-backed store: one `[scope]` table per component, string values.
///
/// Loading is lenient: a missing file is an empty store. Every write
/// persists; a failed write is logged and the in-memory value kept, so a
/// read-only disk never breaks selection.
pub struct FilePreferences {
    path: PathBuf,
    values: Mutex<ScopedValues>,
}

impl FilePreferences {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("read preferences {:?}", path))?;
            toml::from_str::<ScopedValues>(&raw)
                .with_context(|| format!("parse preferences {:?}", path))?
        } else {
            ScopedValues::default()
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    fn save(&self, values: &ScopedValues) {
        let rendered = match toml::to_string(values) {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::warn!(path = ?self.path, "failed to render preferences: {e}");
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, rendered) {
            tracing::warn!(path = ?self.path, "failed to persist preferences: {e}");
        }
    }
}

impl PreferenceStore for FilePreferences {
    fn get_string(&self, scope: &str, key: &str) -> Option<String> {
        get_scoped(&self.values.lock().unwrap(), scope, key)
    }

    fn set_string(&self, scope: &str, key: &str, value: &str) {
        let mut values = self.values.lock().unwrap();
        set_scoped(&mut values, scope, key, value);
        self.save(&values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_prefs_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("playback-prefs-{}-{tag}.toml", std::process::id()))
    }

    #[test]
    fn memory_store_round_trips() {
        let prefs = MemoryPreferences::default();
        assert!(prefs.get_string(PLAYBACK_SCOPE, OUTPUT_PLUGIN_KEY).is_none());
        prefs.set_string(PLAYBACK_SCOPE, OUTPUT_PLUGIN_KEY, "WASAPI");
        assert_eq!(
            prefs.get_string(PLAYBACK_SCOPE, OUTPUT_PLUGIN_KEY).as_deref(),
            Some("WASAPI")
        );
    }

    #[test]
    fn memory_store_last_write_wins() {
        let prefs = MemoryPreferences::default();
        prefs.set_string(PLAYBACK_SCOPE, OUTPUT_PLUGIN_KEY, "first");
        prefs.set_string(PLAYBACK_SCOPE, OUTPUT_PLUGIN_KEY, "second");
        assert_eq!(
            prefs.get_string(PLAYBACK_SCOPE, OUTPUT_PLUGIN_KEY).as_deref(),
            Some("second")
        );
    }

    #[test]
    fn scopes_are_isolated() {
        let prefs = MemoryPreferences::default();
        prefs.set_string("playback", "output_plugin", "A");
        prefs.set_string("ui", "output_plugin", "B");
        assert_eq!(
            prefs.get_string("playback", "output_plugin").as_deref(),
            Some("A")
        );
        assert_eq!(prefs.get_string("ui", "output_plugin").as_deref(), Some("B"));
    }

    #[test]
    fn file_store_missing_file_is_empty() {
        let path = temp_prefs_path("missing");
        let _ = std::fs::remove_file(&path);
        let prefs = FilePreferences::load(&path).unwrap();
        assert!(prefs.get_string(PLAYBACK_SCOPE, OUTPUT_PLUGIN_KEY).is_none());
    }

    #[test]
    fn file_store_persists_across_instances() {
        let path = temp_prefs_path("roundtrip");
        let _ = std::fs::remove_file(&path);

        let prefs = FilePreferences::load(&path).unwrap();
        prefs.set_string(PLAYBACK_SCOPE, OUTPUT_PLUGIN_KEY, "CoreAudio");
        drop(prefs);

        let reloaded = FilePreferences::load(&path).unwrap();
        assert_eq!(
            reloaded
                .get_string(PLAYBACK_SCOPE, OUTPUT_PLUGIN_KEY)
                .as_deref(),
            Some("CoreAudio")
        );
        let _ = std::fs::remove_file(&path);
    }
}
