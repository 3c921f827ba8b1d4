//! Incoming messages, decoded from the raw JSON mapping of a text frame.
//!
//! Each variant is plain data. Decoding substitutes defaults for optional
//! fields so handlers never see a missing progress value or message.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ErrorBody, UNKNOWN_PLACEHOLDER};

/// Shown while loading when the server gives no description.
pub const DEFAULT_LOAD_MESSAGE: &str = "Loading Data...";

/// Reply text the server uses for requests it has no handler for.
pub const DEFAULT_NO_HANDLER_MESSAGE: &str = "The received message does not have a handler";

/// Completion of a long-running load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    /// No fraction was reported; show an indeterminate indicator.
    Indeterminate,
    /// Reported completion, as sent by the server.
    Fraction(f64),
}

impl Progress {
    /// Missing, non-numeric and zero all read as indeterminate; the server
    /// reports 0 before it knows how much work there is.
    fn from_value(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_f64) {
            Some(fraction) if fraction != 0.0 => Progress::Fraction(fraction),
            _ => Progress::Indeterminate,
        }
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Progress::Indeterminate)
    }
}

/// The server accepted the connection. Carries whatever it sent along.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenResponse {
    pub payload: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AcknowledgementResponse {
    #[serde(default, alias = "messageID")]
    pub message_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct KillResponse {
    #[serde(default, alias = "messageID")]
    pub message_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadResponse {
    pub message_id: Option<String>,
    pub message: String,
    pub percent_complete: Progress,
    pub item_count: Option<u64>,
    pub count_complete: u64,
    pub operation: String,
}

impl Default for LoadResponse {
    fn default() -> Self {
        Self {
            message_id: None,
            message: DEFAULT_LOAD_MESSAGE.to_string(),
            percent_complete: Progress::Indeterminate,
            item_count: None,
            count_complete: 0,
            operation: "load".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct LoadWire {
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    percent_complete: Option<Value>,
    #[serde(default)]
    item_count: Option<u64>,
    #[serde(default)]
    count_complete: Option<u64>,
    #[serde(default)]
    operation: Option<String>,
}

/// One streamed chunk of narrated audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioResponse {
    pub message_id: Option<String>,
    pub audio: Vec<u8>,
    pub audio_index: u32,
    pub audio_count: u32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AudioField {
    Text(String),
    Bytes(Vec<u8>),
}

impl AudioField {
    fn into_bytes(self) -> Vec<u8> {
        match self {
            // Legacy encoding: every UTF-16 code unit stands for one byte.
            AudioField::Text(text) => text.encode_utf16().map(|unit| unit as u8).collect(),
            AudioField::Bytes(bytes) => bytes,
        }
    }
}

#[derive(Deserialize)]
struct AudioWire {
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    audio: Option<AudioField>,
    #[serde(default)]
    audio_index: Option<u32>,
    #[serde(default)]
    audio_count: Option<u32>,
}

/// Marks the end of a transfer started by the request with `message_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferCompleteResponse {
    pub message_id: Option<String>,
    pub item_count: u64,
}

#[derive(Deserialize)]
struct TransferCompleteWire {
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    item_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoHandlerResponse {
    pub message_id: Option<String>,
    pub message: String,
}

#[derive(Deserialize)]
struct NoHandlerWire {
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Payload of an `error` frame or a socket error event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorNotice {
    pub body: ErrorBody,
}

impl ErrorNotice {
    pub fn message_type(&self) -> &str {
        non_empty(self.body.message_type.as_deref())
    }

    pub fn message_id(&self) -> &str {
        non_empty(self.body.message_id.as_deref())
    }

    pub fn error_message(&self) -> &str {
        non_empty(self.body.error_message.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> &str {
    match value {
        Some(value) if !value.is_empty() => value,
        _ => UNKNOWN_PLACEHOLDER,
    }
}

/// A decoded incoming message.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Opened(OpenResponse),
    Acknowledgement(AcknowledgementResponse),
    Kill(KillResponse),
    Load(LoadResponse),
    Audio(AudioResponse),
    TransferComplete(TransferCompleteResponse),
    NoHandler(NoHandlerResponse),
    Error(ErrorNotice),
    /// No decoder was registered for the message's operation.
    Raw(Value),
}

impl Response {
    /// Correlation identifier of the message, when it carried one.
    pub fn message_id(&self) -> Option<&str> {
        match self {
            Response::Opened(open) => open.payload.get("message_id").and_then(Value::as_str),
            Response::Acknowledgement(ack) => ack.message_id.as_deref(),
            Response::Kill(kill) => kill.message_id.as_deref(),
            Response::Load(load) => load.message_id.as_deref(),
            Response::Audio(audio) => audio.message_id.as_deref(),
            Response::TransferComplete(done) => done.message_id.as_deref(),
            Response::NoHandler(reply) => reply.message_id.as_deref(),
            Response::Error(notice) => notice.body.message_id.as_deref(),
            Response::Raw(payload) => payload.get("message_id").and_then(Value::as_str),
        }
    }
}

// --- Decoders ---

pub fn decode_open(payload: &Value) -> Result<Response, serde_json::Error> {
    Ok(Response::Opened(OpenResponse {
        payload: payload.clone(),
    }))
}

pub fn decode_acknowledgement(payload: &Value) -> Result<Response, serde_json::Error> {
    AcknowledgementResponse::deserialize(payload).map(Response::Acknowledgement)
}

pub fn decode_kill(payload: &Value) -> Result<Response, serde_json::Error> {
    KillResponse::deserialize(payload).map(Response::Kill)
}

pub fn decode_load(payload: &Value) -> Result<Response, serde_json::Error> {
    let wire = LoadWire::deserialize(payload)?;
    Ok(Response::Load(LoadResponse {
        message_id: wire.message_id,
        message: wire
            .message
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| DEFAULT_LOAD_MESSAGE.to_string()),
        percent_complete: Progress::from_value(wire.percent_complete.as_ref()),
        item_count: wire.item_count,
        count_complete: wire.count_complete.unwrap_or(0),
        operation: wire
            .operation
            .filter(|operation| !operation.is_empty())
            .unwrap_or_else(|| "load".to_string()),
    }))
}

pub fn decode_audio(payload: &Value) -> Result<Response, serde_json::Error> {
    let wire = AudioWire::deserialize(payload)?;
    Ok(Response::Audio(AudioResponse {
        message_id: wire.message_id,
        audio: wire.audio.map(AudioField::into_bytes).unwrap_or_default(),
        audio_index: wire.audio_index.unwrap_or(0),
        audio_count: wire.audio_count.unwrap_or(1),
    }))
}

pub fn decode_transfer_complete(payload: &Value) -> Result<Response, serde_json::Error> {
    let wire = TransferCompleteWire::deserialize(payload)?;
    Ok(Response::TransferComplete(TransferCompleteResponse {
        message_id: wire.message_id,
        item_count: wire.item_count.unwrap_or(1),
    }))
}

pub fn decode_no_handler(payload: &Value) -> Result<Response, serde_json::Error> {
    let wire = NoHandlerWire::deserialize(payload)?;
    Ok(Response::NoHandler(NoHandlerResponse {
        message_id: wire.message_id,
        message: wire
            .message
            .unwrap_or_else(|| DEFAULT_NO_HANDLER_MESSAGE.to_string()),
    }))
}

pub fn decode_error(payload: &Value) -> Result<Response, serde_json::Error> {
    let body = ErrorBody::deserialize(payload)?;
    Ok(Response::Error(ErrorNotice { body }))
}
