//! Outgoing messages.
//!
//! A [`Request`] pairs a generated `message_id` with an operation-specific
//! [`RequestBody`] and a list of callbacks to run once the frame has been
//! handed to the socket.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::id::new_message_id;
use crate::models::NarrationConfig;
use crate::Operation;

/// Row count the appearance front-end asks for when none is given.
pub const DEFAULT_ROW_COUNT: u32 = 20;

/// Key under which every envelope carries its correlation identifier.
pub const MESSAGE_ID_KEY: &str = "message_id";

/// Operation-specific fields of a request.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum RequestBody {
    /// Ask the server to load the file at `path`.
    Load {
        path: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        row_count: Option<u32>,
    },
    /// Ask the server to shut down.
    Kill,
    /// Ask the server to narrate `text`.
    Read {
        text: String,
        configuration: NarrationConfig,
    },
}

impl RequestBody {
    pub fn operation(&self) -> Operation {
        match self {
            RequestBody::Load { .. } => Operation::Load,
            RequestBody::Kill => Operation::Kill,
            RequestBody::Read { .. } => Operation::Read,
        }
    }
}

type SendHandler = Box<dyn Fn() + Send + Sync>;

pub struct Request {
    message_id: String,
    body: RequestBody,
    send_handlers: Vec<SendHandler>,
}

impl Request {
    pub fn new(body: RequestBody) -> Self {
        Self {
            message_id: new_message_id(),
            body,
            send_handlers: Vec::new(),
        }
    }

    /// File/path selection as sent by the narrator front-end.
    pub fn load(path: impl Into<String>) -> Self {
        Self::new(RequestBody::Load {
            path: path.into(),
            row_count: None,
        })
    }

    /// File/path selection as sent by the appearance front-end, which always
    /// includes a row count.
    pub fn load_rows(path: impl Into<String>, row_count: Option<u32>) -> Self {
        Self::new(RequestBody::Load {
            path: path.into(),
            row_count: Some(row_count.unwrap_or(DEFAULT_ROW_COUNT)),
        })
    }

    pub fn kill() -> Self {
        Self::new(RequestBody::Kill)
    }

    pub fn read(text: impl Into<String>, configuration: NarrationConfig) -> Self {
        Self::new(RequestBody::Read {
            text: text.into(),
            configuration,
        })
    }

    /// Replace the generated identifier.
    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = message_id.into();
        self
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn operation(&self) -> Operation {
        self.body.operation()
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    /// The operation-tagged mapping to transmit, always including `message_id`.
    pub fn payload(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let mut payload = match serde_json::to_value(&self.body)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        payload.insert(
            MESSAGE_ID_KEY.to_string(),
            Value::String(self.message_id.clone()),
        );
        Ok(payload)
    }

    /// Register a callback to run after this request has been transmitted.
    pub fn on_send(&mut self, handler: impl Fn() + Send + Sync + 'static) -> &mut Self {
        self.send_handlers.push(Box::new(handler));
        self
    }

    /// Run every send callback in registration order.
    pub fn sent(&self) {
        for handler in &self.send_handlers {
            handler();
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("message_id", &self.message_id)
            .field("body", &self.body)
            .field("send_handlers", &self.send_handlers.len())
            .finish()
    }
}

/// Anything the client can transmit: a typed request or a raw JSON mapping.
#[derive(Debug)]
pub enum Outgoing {
    Request(Request),
    Raw(Map<String, Value>),
}

impl Outgoing {
    /// Normalize to a payload mapping, generating a `message_id` if the
    /// mapping does not already carry one.
    pub fn payload(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let mut payload = match self {
            Outgoing::Request(request) => request.payload()?,
            Outgoing::Raw(map) => map.clone(),
        };
        if !payload.contains_key(MESSAGE_ID_KEY) {
            payload.insert(MESSAGE_ID_KEY.to_string(), Value::String(new_message_id()));
        }
        Ok(payload)
    }

    /// Run the request's send callbacks. Raw payloads have none.
    pub fn sent(&self) {
        if let Outgoing::Request(request) = self {
            request.sent();
        }
    }
}

impl From<Request> for Outgoing {
    fn from(request: Request) -> Self {
        Outgoing::Request(request)
    }
}

impl From<Map<String, Value>> for Outgoing {
    fn from(map: Map<String, Value>) -> Self {
        Outgoing::Raw(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn load_payload_has_operation_path_and_id() {
        let request = Request::load("/data/book.txt").with_message_id("AB12CD34");
        let payload = Value::Object(request.payload().unwrap());
        assert_eq!(
            payload,
            json!({"operation": "load", "path": "/data/book.txt", "message_id": "AB12CD34"})
        );
    }

    #[test]
    fn appearance_load_defaults_row_count() {
        let payload = Request::load_rows("a.nc", None).payload().unwrap();
        assert_eq!(payload["row_count"], json!(20));
        let payload = Request::load_rows("a.nc", Some(5)).payload().unwrap();
        assert_eq!(payload["row_count"], json!(5));
    }

    #[test]
    fn kill_payload_is_tag_only() {
        let request = Request::kill();
        let payload = request.payload().unwrap();
        assert_eq!(payload.len(), 2);
        assert_eq!(payload["operation"], json!("kill"));
        assert_eq!(payload["message_id"], json!(request.message_id()));
    }

    #[test]
    fn read_payload_carries_configuration() {
        let request = Request::read("Hello there", NarrationConfig::default());
        let payload = request.payload().unwrap();
        assert_eq!(payload["operation"], json!("read"));
        assert_eq!(payload["text"], json!("Hello there"));
        assert_eq!(payload["configuration"], json!({}));
        assert_eq!(request.operation(), Operation::Read);
    }

    #[test]
    fn send_handlers_run_in_order() {
        let calls = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut request = Request::kill();
        for n in 0..3 {
            let calls = calls.clone();
            request.on_send(move || calls.lock().unwrap().push(n));
        }
        request.sent();
        assert_eq!(*calls.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn raw_payload_gets_generated_id() {
        let mut map = Map::new();
        map.insert("operation".into(), json!("load"));
        let payload = Outgoing::from(map).payload().unwrap();
        let id = payload["message_id"].as_str().unwrap();
        assert_eq!(id.len(), 8);
    }

    #[test]
    fn raw_payload_keeps_existing_id() {
        let mut map = Map::new();
        map.insert("message_id".into(), json!("KEEP"));
        let outgoing = Outgoing::from(map);
        assert_eq!(outgoing.payload().unwrap()["message_id"], json!("KEEP"));
    }

    #[test]
    fn outgoing_request_forwards_sent() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut request = Request::kill();
        let seen = counter.clone();
        request.on_send(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        Outgoing::from(request).sent();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
