//! Worker thread bridging the UI command queue to the generation client.

use std::path::Path;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use gen_client::{GeneratedImage, GenerationClient, GenerationRequest, ImageUpload};
use tracing::{error, info};

use crate::backend_bridge::commands::BackendCommand;
use crate::config::StartupConfig;
use crate::controller::events::{UiError, UiErrorCategory, UiErrorContext, UiEvent};

pub fn spawn_backend_thread(
    startup: StartupConfig,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::WorkerStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let client = match GenerationClient::new(startup.server_url.as_str()) {
                Ok(client) => client,
                Err(err) => {
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::WorkerStartup,
                        format!("backend worker startup failure: {err}"),
                    )));
                    error!("failed to construct generation client: {err}");
                    return;
                }
            };
            info!(server_url = client.base_url(), "backend worker ready");
            let _ = ui_tx.try_send(UiEvent::Info("Ready".to_string()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::Generate {
                        request,
                        prompt,
                        image_path,
                        styles,
                    } => {
                        let event = match run_generation(&client, prompt, &image_path, styles)
                            .await
                        {
                            Ok(image) => UiEvent::GenerationFinished { request, image },
                            Err(error) => UiEvent::GenerationFailed { request, error },
                        };
                        let _ = ui_tx.try_send(event);
                    }
                }
            }
        });
    });
}

async fn run_generation(
    client: &GenerationClient,
    prompt: String,
    image_path: &Path,
    styles: Vec<String>,
) -> Result<GeneratedImage, UiError> {
    let bytes = tokio::fs::read(image_path).await.map_err(|err| {
        UiError::new(
            UiErrorCategory::Io,
            UiErrorContext::LoadImage,
            format!("failed to read '{}': {err}", image_path.display()),
        )
    })?;
    let filename = image_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("image")
        .to_string();
    let mime_type = mime_guess::from_path(image_path)
        .first_raw()
        .map(|mime| mime.to_string());

    client
        .generate(GenerationRequest {
            prompt,
            image: ImageUpload {
                filename,
                mime_type,
                bytes,
            },
            styles,
        })
        .await
        .map_err(|err| UiError::from_generate(UiErrorContext::Generate, &err))
}
