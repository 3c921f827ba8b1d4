//! Narrator Client - command line entry point
//!
//! Drives a narrator server from a terminal: narrate text, open files, list
//! models and fetch samples. The browser build has no entry point of its own.

#[cfg(not(target_arch = "wasm32"))]
mod cli;

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    narrator_client::logging::init_tracing("narrator_client=info");
    cli::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
