//! Cross-platform string storage.
//!
//! Values are plain strings with no schema versioning:
//! - Web: `localStorage`
//! - Desktop: one file per key in the platform config directory:
//!   - Linux: `~/.config/narrator/`
//!   - macOS: `~/Library/Application Support/narrator/`
//!   - Windows: `%APPDATA%\narrator\`

#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;

/// Handle to the persistent key/value store.
#[derive(Debug, Clone, Default)]
pub struct Storage {
    #[cfg(not(target_arch = "wasm32"))]
    root: Option<PathBuf>,
}

impl Storage {
    /// Storage at the platform default location.
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage rooted at `dir` instead of the platform config directory.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(dir.into()),
        }
    }

    /// Save a value. Returns `true` if the write succeeded.
    pub fn save(&self, key: &str, value: &str) -> bool {
        self.save_raw(key, value)
    }

    /// Load a value, or `None` if the key was never saved.
    pub fn load(&self, key: &str) -> Option<String> {
        self.load_raw(key)
    }

    pub fn remove(&self, key: &str) {
        self.remove_raw(key);
    }

    pub fn exists(&self, key: &str) -> bool {
        self.load_raw(key).is_some()
    }
}

// =========================================
// Web (WASM) implementation
// =========================================

#[cfg(target_arch = "wasm32")]
impl Storage {
    fn local_storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok()?
    }

    fn save_raw(&self, key: &str, value: &str) -> bool {
        Self::local_storage()
            .map(|storage| storage.set_item(key, value).is_ok())
            .unwrap_or(false)
    }

    fn load_raw(&self, key: &str) -> Option<String> {
        Self::local_storage()?.get_item(key).ok()?
    }

    fn remove_raw(&self, key: &str) {
        if let Some(storage) = Self::local_storage() {
            let _ = storage.remove_item(key);
        }
    }
}

// =========================================
// Desktop (native) implementation
// =========================================

#[cfg(not(target_arch = "wasm32"))]
impl Storage {
    fn dir(&self) -> Option<PathBuf> {
        let dir = match &self.root {
            Some(root) => root.clone(),
            None => dirs::config_dir()?.join("narrator"),
        };

        if !dir.exists() {
            std::fs::create_dir_all(&dir).ok()?;
        }

        Some(dir)
    }

    fn file_path(&self, key: &str) -> Option<PathBuf> {
        // Keys become file names
        let safe_key = key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_");
        Some(self.dir()?.join(safe_key))
    }

    fn save_raw(&self, key: &str, value: &str) -> bool {
        match self.file_path(key) {
            Some(path) => std::fs::write(path, value).is_ok(),
            None => false,
        }
    }

    fn load_raw(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.file_path(key)?).ok()
    }

    fn remove_raw(&self, key: &str) {
        if let Some(path) = self.file_path(key) {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[test]
    fn save_load_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::at(dir.path());

        assert!(!storage.exists("previousPath"));
        assert!(storage.save("previousPath", "/books/moby-dick.txt"));
        assert_eq!(storage.load("previousPath").as_deref(), Some("/books/moby-dick.txt"));

        storage.remove("previousPath");
        assert_eq!(storage.load("previousPath"), None);
    }

    #[test]
    fn keys_with_separators_stay_in_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::at(dir.path());

        assert!(storage.save("a/b:c", "value"));
        assert!(dir.path().join("a_b_c").exists());
        assert_eq!(storage.load("a/b:c").as_deref(), Some("value"));
    }
}
