//! Operation → decoder lookup for incoming text frames.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::error::DecodeError;
use crate::responses::{
    decode_acknowledgement, decode_audio, decode_error, decode_kill, decode_load,
    decode_no_handler, decode_open, decode_transfer_complete, Response,
};
use crate::Operation;

/// Turns a raw JSON mapping into a typed [`Response`].
pub type Decoder = fn(&Value) -> Result<Response, serde_json::Error>;

#[derive(Clone, Default)]
pub struct PayloadRegistry {
    decoders: HashMap<Operation, Decoder>,
}

impl fmt::Debug for PayloadRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.decoders.keys()).finish()
    }
}

impl PayloadRegistry {
    /// A registry with no decoders; every message decodes to [`Response::Raw`].
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decoders used by the narrator front-end.
    pub fn narrator() -> Self {
        let mut registry = Self::appearance();
        registry.register(Operation::Read, decode_audio);
        registry.register(Operation::TransferComplete, decode_transfer_complete);
        registry.register(Operation::Load, decode_load);
        registry
    }

    /// Decoders used by the appearance front-end.
    pub fn appearance() -> Self {
        let mut registry = Self::empty();
        registry.register(Operation::ConnectionOpened, decode_open);
        registry.register(Operation::Acknowledgement, decode_acknowledgement);
        registry.register(Operation::Kill, decode_kill);
        registry.register(Operation::NoHandler, decode_no_handler);
        registry.register(Operation::Error, decode_error);
        registry
    }

    /// Associate `operation` with `decoder`, replacing any previous one.
    pub fn register(&mut self, operation: Operation, decoder: Decoder) {
        self.decoders.insert(operation, decoder);
    }

    pub fn contains(&self, operation: &Operation) -> bool {
        self.decoders.contains_key(operation)
    }

    /// Decode `payload` with the decoder for `operation`, or wrap it as
    /// [`Response::Raw`] when none is registered.
    pub fn decode(&self, operation: &Operation, payload: Value) -> Result<Response, DecodeError> {
        match self.decoders.get(operation) {
            Some(decoder) => decoder(&payload).map_err(|source| DecodeError::Payload {
                operation: operation.clone(),
                source,
            }),
            None => Ok(Response::Raw(payload)),
        }
    }
}

/// Parse a text frame and pull out its operation tag.
pub fn parse_frame(text: &str) -> Result<(Operation, Value), DecodeError> {
    let payload: Value = serde_json::from_str(text)?;
    let object = payload.as_object().ok_or(DecodeError::NotAnObject)?;
    let operation = object
        .get("operation")
        .and_then(Value::as_str)
        .map(Operation::from)
        .ok_or(DecodeError::MissingOperation)?;
    Ok((operation, payload))
}
