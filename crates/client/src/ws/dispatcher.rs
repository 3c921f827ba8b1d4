//! Routes incoming frames to the handlers registered for their operation.
//!
//! Text frames are parsed, decoded through the [`PayloadRegistry`] and handed
//! to every handler of the frame's operation, in registration order. Binary
//! frames skip all of that and go to the binary handlers. Failures are logged
//! and the frame is dropped; nothing propagates back to the transport.

use narrator_shared::{parse_frame, Decoder, Operation, PayloadRegistry, Response};
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::connection::MaybeSendSync;

pub trait ResponseHandler: Fn(&Response) + MaybeSendSync {}
impl<F: Fn(&Response) + MaybeSendSync> ResponseHandler for F {}

pub trait BinaryHandler: Fn(&[u8]) + MaybeSendSync {}
impl<F: Fn(&[u8]) + MaybeSendSync> BinaryHandler for F {}

// Poisoned locks stay usable; they only guard handler lists.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
pub struct Dispatcher {
    handlers: Mutex<HashMap<Operation, Vec<Arc<dyn ResponseHandler>>>>,
    registry: Mutex<PayloadRegistry>,
    binary_handlers: Mutex<Vec<Arc<dyn BinaryHandler>>>,
}

impl Dispatcher {
    pub fn new(registry: PayloadRegistry) -> Self {
        Self {
            registry: Mutex::new(registry),
            ..Self::default()
        }
    }

    /// Append `handler` to the list for `operation`.
    pub fn add_handler(&self, operation: impl Into<Operation>, handler: impl ResponseHandler + 'static) {
        lock(&self.handlers)
            .entry(operation.into())
            .or_default()
            .push(Arc::new(handler));
    }

    pub fn add_binary_handler(&self, handler: impl BinaryHandler + 'static) {
        lock(&self.binary_handlers).push(Arc::new(handler));
    }

    pub fn clear_binary_handlers(&self) {
        lock(&self.binary_handlers).clear();
    }

    pub fn register_payload_type(&self, operation: impl Into<Operation>, decoder: Decoder) {
        lock(&self.registry).register(operation.into(), decoder);
    }

    /// Parse and dispatch one text frame. Returns the number of handlers invoked.
    pub fn dispatch_text(&self, text: &str) -> usize {
        match parse_frame(text) {
            Ok((operation, payload)) => self.dispatch(&operation, payload),
            Err(e) => {
                crate::log_error!("Dropping incoming frame: {}", e);
                0
            }
        }
    }

    /// Decode `payload` for `operation` and invoke its handlers.
    pub fn dispatch(&self, operation: &Operation, payload: Value) -> usize {
        let response = match lock(&self.registry).decode(operation, payload) {
            Ok(response) => response,
            Err(e) => {
                crate::log_error!("Dropping '{}' message: {}", operation, e);
                return 0;
            }
        };

        // Handlers may register more handlers; never call them under the lock
        let handlers = lock(&self.handlers).get(operation).cloned().unwrap_or_default();
        if handlers.is_empty() {
            crate::log_debug!("No handlers for '{}'", operation);
            return 0;
        }

        for handler in &handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(&response))).is_err() {
                crate::log_error!("A '{}' handler panicked; continuing with the next", operation);
            }
        }
        handlers.len()
    }

    /// Hand a binary frame to every binary handler.
    pub fn dispatch_binary(&self, data: &[u8]) -> usize {
        let handlers = lock(&self.binary_handlers).clone();
        for handler in &handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(data))).is_err() {
                crate::log_error!("A binary handler panicked on a {} byte frame", data.len());
            }
        }
        handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use narrator_shared::{AcknowledgementResponse, Progress};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn error_handlers_run_in_registration_order() {
        let dispatcher = Dispatcher::new(PayloadRegistry::narrator());
        let calls = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second"] {
            let calls = calls.clone();
            dispatcher.add_handler(Operation::Error, move |response: &Response| {
                let Response::Error(notice) = response else {
                    panic!("expected an error notice, got {:?}", response);
                };
                calls.lock().unwrap().push((name, notice.error_message().to_string()));
            });
        }

        let invoked = dispatcher.dispatch_text(
            r#"{"operation": "error", "message_id": "0A1B2C3D", "error_message": "model missing"}"#,
        );

        assert_eq!(invoked, 2);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                ("first", "model missing".to_string()),
                ("second", "model missing".to_string())
            ]
        );
    }

    #[test]
    fn panicking_handler_does_not_stop_the_rest() {
        let dispatcher = Dispatcher::new(PayloadRegistry::narrator());
        let count = Arc::new(AtomicUsize::new(0));
        dispatcher.add_handler(Operation::Kill, |_: &Response| panic!("kill handler failed"));
        let counter = count.clone();
        dispatcher.add_handler(Operation::Kill, move |_: &Response| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        dispatcher.add_binary_handler(|_: &[u8]| panic!("bad track"));
        let counter = count.clone();
        dispatcher.add_binary_handler(move |_: &[u8]| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(dispatcher.dispatch_text(r#"{"operation": "kill", "message_id": "1"}"#), 2);
        assert_eq!(dispatcher.dispatch_text(r#"{"operation": "kill", "message_id": "2"}"#), 2);
        assert_eq!(dispatcher.dispatch_binary(b"RIFF"), 2);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn malformed_json_invokes_nothing() {
        let dispatcher = Dispatcher::new(PayloadRegistry::narrator());
        let count = Arc::new(AtomicUsize::new(0));
        for operation in ["error", "load", "acknowledgement"] {
            let count = count.clone();
            dispatcher.add_handler(operation, move |_: &Response| {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(dispatcher.dispatch_text("{\"operation\": \"load\", "), 0);
        assert_eq!(dispatcher.dispatch_text("[1, 2, 3]"), 0);
        assert_eq!(dispatcher.dispatch_text(r#"{"message_id": "X"}"#), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn undecodable_payload_is_dropped() {
        let dispatcher = Dispatcher::new(PayloadRegistry::narrator());
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        dispatcher.add_handler(Operation::Load, move |_: &Response| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // item_count must be a number
        let invoked = dispatcher.dispatch_text(r#"{"operation": "load", "item_count": "many"}"#);

        assert_eq!(invoked, 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn load_progress_is_decoded_before_dispatch() {
        let dispatcher = Dispatcher::new(PayloadRegistry::narrator());
        let seen = Arc::new(Mutex::new(None));
        let slot = seen.clone();
        dispatcher.add_handler(Operation::Load, move |response: &Response| {
            if let Response::Load(load) = response {
                *slot.lock().unwrap() = Some(load.percent_complete);
            }
        });

        dispatcher.dispatch_text(r#"{"operation": "load", "message_id": "1", "percent_complete": 0.25}"#);
        assert_eq!(*seen.lock().unwrap(), Some(Progress::Fraction(0.25)));

        dispatcher.dispatch_text(r#"{"operation": "load", "message_id": "1"}"#);
        assert_eq!(*seen.lock().unwrap(), Some(Progress::Indeterminate));
    }

    #[test]
    fn unknown_operation_arrives_raw() {
        let dispatcher = Dispatcher::new(PayloadRegistry::narrator());
        let seen = Arc::new(Mutex::new(None));
        let slot = seen.clone();
        dispatcher.add_handler("status", move |response: &Response| {
            *slot.lock().unwrap() = Some(response.clone());
        });

        assert_eq!(dispatcher.dispatch_text(r#"{"operation": "status", "busy": true}"#), 1);
        assert_eq!(
            *seen.lock().unwrap(),
            Some(Response::Raw(json!({"operation": "status", "busy": true})))
        );
    }

    #[test]
    fn registered_payload_type_replaces_decoder() {
        fn quiet_ack(_: &Value) -> Result<Response, serde_json::Error> {
            Ok(Response::Acknowledgement(AcknowledgementResponse::default()))
        }

        let dispatcher = Dispatcher::new(PayloadRegistry::appearance());
        dispatcher.register_payload_type("acknowledgement", quiet_ack);
        let seen = Arc::new(Mutex::new(None));
        let slot = seen.clone();
        dispatcher.add_handler(Operation::Acknowledgement, move |response: &Response| {
            *slot.lock().unwrap() = Some(response.clone());
        });

        dispatcher.dispatch_text(r#"{"operation": "acknowledgement", "message_id": "A", "message": "ok"}"#);
        assert_eq!(
            *seen.lock().unwrap(),
            Some(Response::Acknowledgement(AcknowledgementResponse::default()))
        );
    }

    #[test]
    fn binary_without_handlers_is_a_no_op() {
        let dispatcher = Dispatcher::new(PayloadRegistry::narrator());
        assert_eq!(dispatcher.dispatch_binary(&[0x52, 0x49, 0x46, 0x46]), 0);
    }

    #[test]
    fn binary_handlers_bypass_operations() {
        let dispatcher = Dispatcher::new(PayloadRegistry::narrator());
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        dispatcher.add_binary_handler(move |data: &[u8]| sink.lock().unwrap().extend_from_slice(data));
        dispatcher.add_handler(Operation::Read, |_: &Response| panic!("text handler called"));

        assert_eq!(dispatcher.dispatch_binary(b"RIFF"), 1);
        assert_eq!(*received.lock().unwrap(), b"RIFF".to_vec());

        dispatcher.clear_binary_handlers();
        assert_eq!(dispatcher.dispatch_binary(b"RIFF"), 0);
    }
}
