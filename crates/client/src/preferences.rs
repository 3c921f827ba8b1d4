//! Values remembered between sessions: last opened path and narration choices.

use crate::storage::Storage;

pub const PREVIOUS_PATH_KEY: &str = "previousPath";
pub const SELECTED_MODEL_KEY: &str = "selected-model";
pub const SELECTED_SPEAKER_KEY: &str = "selected-speaker";
// Misspelled in the first release; kept so existing browsers keep their selection.
pub const SELECTED_LANGUAGE_KEY: &str = "seleted-language";
pub const TEXT_KEY: &str = "narrator-text";

#[derive(Debug, Clone, Default)]
pub struct Preferences {
    storage: Storage,
}

impl Preferences {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn previous_path(&self) -> Option<String> {
        self.storage.load(PREVIOUS_PATH_KEY).filter(|path| !path.is_empty())
    }

    pub fn set_previous_path(&self, path: &str) {
        self.storage.save(PREVIOUS_PATH_KEY, path);
    }

    pub fn selected_model(&self) -> Option<String> {
        self.storage.load(SELECTED_MODEL_KEY)
    }

    /// Empty names are ignored.
    pub fn set_selected_model(&self, model: &str) {
        if !model.is_empty() {
            self.storage.save(SELECTED_MODEL_KEY, model);
        }
    }

    pub fn selected_speaker(&self) -> Option<String> {
        self.storage.load(SELECTED_SPEAKER_KEY)
    }

    /// Empty names are ignored.
    pub fn set_selected_speaker(&self, speaker: &str) {
        if !speaker.is_empty() {
            self.storage.save(SELECTED_SPEAKER_KEY, speaker);
        }
    }

    pub fn selected_language(&self) -> Option<String> {
        self.storage.load(SELECTED_LANGUAGE_KEY)
    }

    pub fn set_selected_language(&self, language: &str) {
        self.storage.save(SELECTED_LANGUAGE_KEY, language);
    }

    /// The last narrated text, or an empty string.
    pub fn text(&self) -> String {
        self.storage.load(TEXT_KEY).unwrap_or_default()
    }

    pub fn set_text(&self, text: &str) {
        self.storage.save(TEXT_KEY, text);
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    fn preferences() -> (tempfile::TempDir, Preferences) {
        let dir = tempfile::tempdir().unwrap();
        let preferences = Preferences::new(Storage::at(dir.path()));
        (dir, preferences)
    }

    #[test]
    fn empty_model_and_speaker_are_not_saved() {
        let (_dir, preferences) = preferences();
        preferences.set_selected_model("tts_models/en/vctk/vits");
        preferences.set_selected_model("");
        preferences.set_selected_speaker("");

        assert_eq!(
            preferences.selected_model().as_deref(),
            Some("tts_models/en/vctk/vits")
        );
        assert_eq!(preferences.selected_speaker(), None);
    }

    #[test]
    fn text_defaults_to_empty() {
        let (_dir, preferences) = preferences();
        assert_eq!(preferences.text(), "");
        preferences.set_text("Call me Ishmael.");
        assert_eq!(preferences.text(), "Call me Ishmael.");
    }

    #[test]
    fn language_uses_historical_key() {
        let (dir, preferences) = preferences();
        preferences.set_selected_language("fr");
        assert!(dir.path().join("seleted-language").exists());
        assert_eq!(preferences.selected_language().as_deref(), Some("fr"));
    }
}
