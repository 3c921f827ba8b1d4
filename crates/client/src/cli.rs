//! `narrator` subcommands.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use futures_channel::mpsc::{unbounded, UnboundedReceiver};
use futures_util::StreamExt;
use narrator_client::{
    log_info, log_warn, ClientConfig, Frontend, NarratorApp, ReconnectPolicy,
};
use narrator_shared::{NarrationConfig, Operation, Progress, Response, SampleRequest};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Debug, Parser)]
#[command(name = "narrator", version, about = "Talk to a narrator server")]
struct Cli {
    /// Server origin, e.g. http://localhost:10324 (overrides NARRATOR_ORIGIN)
    #[arg(long)]
    origin: Option<String>,

    /// Websocket path relative to the origin (overrides NARRATOR_WS_PATH)
    #[arg(long)]
    ws_path: Option<String>,

    /// What to do when sending on a closed socket (overrides NARRATOR_RECONNECT)
    #[arg(long)]
    reconnect: Option<ReconnectPolicy>,

    #[arg(long, value_enum, default_value_t = FrontendArg::Narrator)]
    frontend: FrontendArg,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FrontendArg {
    Narrator,
    Appearance,
}

impl From<FrontendArg> for Frontend {
    fn from(value: FrontendArg) -> Self {
        match value {
            FrontendArg::Narrator => Frontend::Narrator,
            FrontendArg::Appearance => Frontend::Appearance,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Narrate text and write each audio chunk to the output directory
    Read {
        /// Text to narrate; the last narrated text is reused when omitted
        text: Option<String>,
        /// Read the text from a file instead
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,
        #[arg(long, default_value = "narration")]
        output: PathBuf,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        speaker: Option<String>,
        #[arg(long)]
        language: Option<String>,
        #[arg(long, default_value_t = 1.0)]
        speed: f32,
    },
    /// Ask the server to open a path; the previous path is used when omitted
    Load { path: Option<String> },
    /// Ask the server to shut down
    Kill,
    /// List the models the server knows about
    Models,
    /// List the pre-generated samples
    Samples,
    /// Download one sample
    Sample {
        model: String,
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        speaker: Option<String>,
        #[arg(long, default_value = "sample.wav")]
        output: PathBuf,
    },
}

fn client_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = ClientConfig::from_env().context("invalid NARRATOR_* environment")?;
    if let Some(origin) = &cli.origin {
        config = ClientConfig::new(origin)?
            .with_ws_path(config.ws_path)
            .with_reconnect(config.reconnect);
    }
    if let Some(ws_path) = &cli.ws_path {
        config = config.with_ws_path(ws_path.clone());
    }
    if let Some(reconnect) = cli.reconnect {
        config = config.with_reconnect(reconnect);
    }
    Ok(config)
}

/// Every decoded response with its operation, in arrival order.
fn responses(app: &NarratorApp) -> UnboundedReceiver<(Operation, Response)> {
    let (tx, rx) = unbounded();
    for operation in [
        Operation::Acknowledgement,
        Operation::Load,
        Operation::Read,
        Operation::TransferComplete,
        Operation::NoHandler,
        Operation::Error,
        Operation::Kill,
        Operation::Closed,
    ] {
        let tx = tx.clone();
        let tag = operation.clone();
        app.client().add_handler(operation, move |response: &Response| {
            let _ = tx.unbounded_send((tag.clone(), response.clone()));
        });
    }
    rx
}

async fn connect(app: &NarratorApp) -> Result<()> {
    let state = app.start().await?;
    if !state.is_open() {
        bail!(
            "could not connect to {} (socket is {:?})",
            app.client().config().origin,
            state
        );
    }
    Ok(())
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = client_config(&cli)?;
    let app = NarratorApp::new(config, cli.frontend.into());

    match cli.command {
        Command::Read {
            text,
            file,
            output,
            model,
            speaker,
            language,
            speed,
        } => {
            let text = match (text, file) {
                (Some(text), _) => text,
                (None, Some(file)) => tokio::fs::read_to_string(&file)
                    .await
                    .with_context(|| format!("could not read {}", file.display()))?,
                (None, None) => app.preferences().text(),
            };
            if text.trim().is_empty() {
                bail!("nothing to narrate");
            }
            read(&app, &text, output, model, speaker, language, speed).await
        }
        Command::Load { path } => {
            let path = path
                .or_else(|| app.preferences().previous_path())
                .context("no path given and no previous path saved")?;
            load(&app, &path).await
        }
        Command::Kill => {
            connect(&app).await?;
            let message_id = app.kill().await?;
            log_info!("Sent kill request {}", message_id);
            app.client().close();
            Ok(())
        }
        Command::Models => {
            for (name, parameters) in app.model_parameters().await? {
                let mut traits = Vec::new();
                if parameters.is_multi_lingual.unwrap_or(false) {
                    traits.push("multi-lingual");
                }
                if parameters.is_multi_speaker.unwrap_or(false) {
                    traits.push("multi-speaker");
                }
                if !parameters.is_available {
                    traits.push("not downloaded");
                }
                println!("{name}\t{}", traits.join(", "));
            }
            Ok(())
        }
        Command::Samples => {
            let catalog = app.api().sample_list().await.map_err(|e| anyhow::anyhow!(e.user_message()))?;
            for dataset in &catalog.samples {
                println!("{}", dataset.text);
                for model in &dataset.models {
                    println!("  {}\t{}", model.value, model.text);
                }
            }
            Ok(())
        }
        Command::Sample {
            model,
            language,
            speaker,
            output,
        } => {
            let audio = app
                .api()
                .sample(&SampleRequest {
                    model,
                    language,
                    speaker,
                })
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            tokio::fs::write(&output, &audio)
                .await
                .with_context(|| format!("could not write {}", output.display()))?;
            println!("Wrote {} bytes to {}", audio.len(), output.display());
            Ok(())
        }
    }
}

async fn read(
    app: &NarratorApp,
    text: &str,
    output: PathBuf,
    model: Option<String>,
    speaker: Option<String>,
    language: Option<String>,
    speed: f32,
) -> Result<()> {
    let catalog = match app.model_parameters().await {
        Ok(catalog) => catalog,
        Err(e) => {
            log_warn!("Could not load model parameters: {}", e);
            Default::default()
        }
    };

    if let Some(model) = &model {
        app.preferences().set_selected_model(model);
    }
    if let Some(speaker) = &speaker {
        app.preferences().set_selected_speaker(speaker);
    }
    if let Some(language) = &language {
        app.preferences().set_selected_language(language);
    }
    let configuration: NarrationConfig = app.selected_configuration(&catalog, speed);

    let tracks = Arc::new(Mutex::new(Vec::<Vec<u8>>::new()));
    let sink = tracks.clone();
    app.on_audio(move |data: &[u8]| {
        if let Ok(mut tracks) = sink.lock() {
            tracks.push(data.to_vec());
        }
    });

    let mut responses = responses(app);
    connect(app).await?;
    let message_id = app.read_text(text, configuration).await?;
    log_info!("Narrating as {}", message_id);

    loop {
        tokio::select! {
            response = responses.next() => match response {
                Some((_, Response::Audio(chunk))) if !chunk.audio.is_empty() => {
                    if let Ok(mut tracks) = tracks.lock() {
                        tracks.push(chunk.audio);
                    }
                }
                Some((Operation::TransferComplete, done))
                    if done.message_id() == Some(message_id.as_str()) => break,
                Some((operation, response)) => check_failure(&operation, &response)?,
                None => bail!("connection dropped"),
            },
            _ = tokio::signal::ctrl_c() => bail!("interrupted"),
        }
    }

    let tracks = tracks.lock().map(|tracks| tracks.clone()).unwrap_or_default();
    tokio::fs::create_dir_all(&output)
        .await
        .with_context(|| format!("could not create {}", output.display()))?;
    for (index, track) in tracks.iter().enumerate() {
        let path = output.join(format!("{index:03}.wav"));
        tokio::fs::write(&path, track)
            .await
            .with_context(|| format!("could not write {}", path.display()))?;
    }
    println!("Wrote {} track(s) to {}", tracks.len(), output.display());
    app.client().close();
    Ok(())
}

async fn load(app: &NarratorApp, path: &str) -> Result<()> {
    let mut responses = responses(app);
    connect(app).await?;
    let message_id = app.load_path(path).await?;

    loop {
        tokio::select! {
            response = responses.next() => match response {
                Some((_, Response::Load(progress))) => match progress.percent_complete {
                    Progress::Fraction(percent) => println!("{} {:.0}%", progress.message, percent),
                    Progress::Indeterminate => println!("{}", progress.message),
                },
                Some((operation, response)) if response.message_id() == Some(message_id.as_str()) => {
                    check_failure(&operation, &response)?;
                    println!("Loaded {path}");
                    break;
                }
                Some((operation, response)) => check_failure(&operation, &response)?,
                None => bail!("connection dropped"),
            },
            _ = tokio::signal::ctrl_c() => bail!("interrupted"),
        }
    }

    app.client().close();
    Ok(())
}

/// Turn responses that end the session into errors.
fn check_failure(operation: &Operation, response: &Response) -> Result<()> {
    match (operation, response) {
        (_, Response::Error(notice)) => bail!(
            "{} failed for message {}: {}",
            notice.message_type(),
            notice.message_id(),
            notice.error_message()
        ),
        (Operation::Kill, _) => bail!("the server is shutting down"),
        (Operation::Closed, _) => bail!("connection closed"),
        _ => Ok(()),
    }
}
