//! Narration configuration and the model/sample catalogs served over HTTP.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Model used when nothing has been selected yet.
pub const DEFAULT_MODEL: &str = "tts_models/en/ljspeech/tacotron2-DDC_ph";

/// Fastest speed the backend accepts.
pub const MAX_SPEED: f32 = 2.0;

// --- Narration ---

/// How text should be read aloud. Sent as the `configuration` of a `read` request.
///
/// Every field is optional; the server fills in its own defaults for anything
/// missing, so `NarrationConfig::default()` serializes to `{}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NarrationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl NarrationConfig {
    /// Build a configuration for `model`, only carrying a speaker or language
    /// when the model's parameters say it supports them.
    pub fn for_selection(
        model: &str,
        parameters: Option<&ModelParameters>,
        speed: f32,
        speaker: Option<&str>,
        language: Option<&str>,
    ) -> Self {
        let mut config = Self {
            name: Some(model.to_string()),
            speed: Some(speed),
            ..Self::default()
        };

        if let Some(parameters) = parameters {
            if parameters.is_multi_lingual.unwrap_or(false) {
                config.language = language.map(str::to_string);
            }
            if parameters.is_multi_speaker.unwrap_or(false) {
                config.speaker = speaker.map(str::to_string);
            }
        }

        config
    }

    /// Check the speed bounds enforced by the backend: `0 < speed <= 2`.
    pub fn validate(&self) -> Result<(), String> {
        match self.speed {
            Some(speed) if speed <= 0.0 || speed > MAX_SPEED => Err(format!(
                "Speed must be greater than 0 and at most {MAX_SPEED}, got {speed}"
            )),
            _ => Ok(()),
        }
    }
}

// --- Model catalog (`GET /models/parameters`) ---

/// Parameters describing one text-to-speech model.
///
/// The availability-dependent fields are `null` for models that have not
/// been downloaded on the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelParameters {
    pub fullname: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub dataset: Option<String>,
    #[serde(default)]
    pub is_available: bool,
    #[serde(default)]
    pub is_multi_lingual: Option<bool>,
    #[serde(default)]
    pub is_multi_speaker: Option<bool>,
    #[serde(default)]
    pub languages: Option<Vec<String>>,
    #[serde(default)]
    pub speakers: Option<Vec<String>>,
}

/// Model name → parameters, ordered by name.
pub type ModelCatalog = BTreeMap<String, ModelParameters>;

// --- Samples (`GET /sample/list`, `POST /sample`) ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SampleModel {
    pub value: String,
    pub text: String,
    #[serde(default)]
    pub languages: Option<Vec<String>>,
    #[serde(default)]
    pub speakers: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SampleDataset {
    pub value: String,
    pub text: String,
    #[serde(default)]
    pub models: Vec<SampleModel>,
}

impl SampleDataset {
    pub fn model(&self, value: &str) -> Option<&SampleModel> {
        self.models.iter().find(|model| model.value == value)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SampleCatalog {
    #[serde(default)]
    pub samples: Vec<SampleDataset>,
}

impl SampleCatalog {
    pub fn dataset(&self, value: &str) -> Option<&SampleDataset> {
        self.samples.iter().find(|dataset| dataset.value == value)
    }

    /// Find a model by its full name across every dataset.
    pub fn find_model(&self, model: &str) -> Option<&SampleModel> {
        self.samples.iter().find_map(|dataset| dataset.model(model))
    }
}

/// Body of `POST /sample`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SampleRequest {
    pub model: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub speaker: Option<String>,
}
