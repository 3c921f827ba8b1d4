//! WASM/Web-specific WebSocket transport using web_sys::WebSocket.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use wasm_bindgen::prelude::*;
use web_sys::{js_sys, BinaryType, CloseEvent, MessageEvent, WebSocket};

use super::{ConnectionState, EventSink, Socket, SocketEvent, Transport, TransportError};

/// Opens browser websockets.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserTransport;

impl Transport for BrowserTransport {
    fn open(
        &self,
        url: &str,
        on_event: Arc<dyn EventSink>,
    ) -> Result<Box<dyn Socket>, TransportError> {
        let ws = WebSocket::new(url).map_err(|e| TransportError::Create(format!("{:?}", e)))?;
        // Audio arrives as binary frames
        ws.set_binary_type(BinaryType::Arraybuffer);

        let on_open = on_event.clone();
        let onopen_callback = Closure::wrap(Box::new(move |_: web_sys::Event| {
            crate::log_info!("WebSocket onopen fired");
            on_open(SocketEvent::Open(Value::Object(Map::new())));
        }) as Box<dyn FnMut(web_sys::Event)>);
        ws.set_onopen(Some(onopen_callback.as_ref().unchecked_ref()));
        onopen_callback.forget();

        let on_message = on_event.clone();
        let onmessage_callback = Closure::wrap(Box::new(move |e: MessageEvent| {
            let data = e.data();
            if let Ok(text) = data.clone().dyn_into::<js_sys::JsString>() {
                on_message(SocketEvent::Text(text.into()));
            } else if let Ok(buffer) = data.dyn_into::<js_sys::ArrayBuffer>() {
                on_message(SocketEvent::Binary(js_sys::Uint8Array::new(&buffer).to_vec()));
            } else {
                crate::log_warn!("WebSocket received a frame of unknown type");
            }
        }) as Box<dyn FnMut(MessageEvent)>);
        ws.set_onmessage(Some(onmessage_callback.as_ref().unchecked_ref()));
        onmessage_callback.forget();

        let on_close = on_event.clone();
        let onclose_callback = Closure::wrap(Box::new(move |e: CloseEvent| {
            crate::log_info!("WebSocket onclose: code {} {}", e.code(), e.reason());
            on_close(SocketEvent::Closed(json!({
                "code": e.code(),
                "reason": e.reason(),
                "was_clean": e.was_clean(),
            })));
        }) as Box<dyn FnMut(CloseEvent)>);
        ws.set_onclose(Some(onclose_callback.as_ref().unchecked_ref()));
        onclose_callback.forget();

        let on_error = on_event;
        let onerror_callback = Closure::wrap(Box::new(move |_: web_sys::Event| {
            crate::log_error!("WebSocket onerror fired");
            on_error(SocketEvent::Error(json!({ "error_message": "WebSocket error" })));
        }) as Box<dyn FnMut(web_sys::Event)>);
        ws.set_onerror(Some(onerror_callback.as_ref().unchecked_ref()));
        onerror_callback.forget();

        Ok(Box::new(BrowserSocket { ws }))
    }
}

struct BrowserSocket {
    ws: WebSocket,
}

impl Socket for BrowserSocket {
    fn state(&self) -> ConnectionState {
        match self.ws.ready_state() {
            WebSocket::CONNECTING => ConnectionState::Connecting,
            WebSocket::OPEN => ConnectionState::Open,
            WebSocket::CLOSING => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }

    fn send_text(&self, text: &str) -> Result<(), TransportError> {
        crate::log_debug!("Sending to {}: {}", self.ws.url(), text);
        self.ws
            .send_with_str(text)
            .map_err(|e| TransportError::Send(format!("{:?}", e)))
    }

    fn close(&self) {
        if let Err(e) = self.ws.close() {
            crate::log_warn!("WebSocket close failed: {:?}", e);
        }
    }
}
