//! Application shell: the generation form, preview, output panel, and the
//! event pump draining worker events into UI state.

use std::{
    collections::HashMap,
    fs,
    hash::{Hash, Hasher},
    path::{Path, PathBuf},
    time::SystemTime,
};

use arboard::{Clipboard, ImageData};
use chrono::Local;
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use egui::TextureHandle;
use gen_client::GeneratedImage;
use image::GenericImageView;
use shared::STYLE_PRESETS;

use crate::backend_bridge::commands::BackendCommand;
use crate::config::StartupConfig;
use crate::controller::events::{err_label, UiEvent};
use crate::controller::orchestration::dispatch_command;
use crate::controller::session::{
    format_final_elapsed, format_running_elapsed, GenerationSession,
};

const PREVIEW_MAX_DIMENSION: f32 = 280.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusBannerSeverity {
    Error,
}

#[derive(Debug, Clone)]
struct StatusBanner {
    severity: StatusBannerSeverity,
    message: String,
}

#[derive(Clone)]
enum InputPreview {
    Image {
        texture: TextureHandle,
        size: egui::Vec2,
    },
    DecodeFailed,
}

#[derive(Clone, Eq)]
struct PreviewCacheKey {
    path: PathBuf,
    modified: Option<SystemTime>,
}

impl PartialEq for PreviewCacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.modified == other.modified
    }
}

impl Hash for PreviewCacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
        self.modified.hash(state);
    }
}

struct GenerationOutput {
    bytes: Vec<u8>,
    content_type: Option<String>,
    texture: Option<TextureHandle>,
    size: egui::Vec2,
}

pub struct StudioApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,

    server_url: String,
    with_timer: bool,
    with_style_picker: bool,

    prompt: String,
    selected_image: Option<PathBuf>,
    style_checked: Vec<bool>,
    preview_cache: HashMap<PreviewCacheKey, InputPreview>,

    session: GenerationSession,
    output: Option<GenerationOutput>,

    status: String,
    banner: Option<StatusBanner>,
}

impl StudioApp {
    pub fn new(
        startup: StartupConfig,
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
    ) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            server_url: startup.server_url,
            with_timer: startup.with_timer,
            with_style_picker: startup.with_style_picker,
            prompt: String::new(),
            selected_image: None,
            style_checked: vec![false; STYLE_PRESETS.len()],
            preview_cache: HashMap::new(),
            session: GenerationSession::new(),
            output: None,
            status: "Starting...".to_string(),
            banner: None,
        }
    }

    fn process_ui_events(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::Error(err) => {
                    self.status = format!("{} error: {}", err_label(err.category()), err.message());
                    self.banner = Some(StatusBanner {
                        severity: StatusBannerSeverity::Error,
                        message: err.message().to_string(),
                    });
                }
                UiEvent::GenerationFinished { request, image } => {
                    if !self.session.complete_success(request) {
                        tracing::debug!(request = request.0, "dropping stale generation result");
                        continue;
                    }
                    let elapsed = self.session.final_elapsed().unwrap_or_default();
                    self.output = Some(load_output(ctx, image));
                    self.banner = None;
                    self.status = format!("Done in {}", format_final_elapsed(elapsed));
                }
                UiEvent::GenerationFailed { request, error } => {
                    if !self
                        .session
                        .complete_failure(request, error.message().to_string())
                    {
                        tracing::debug!(request = request.0, "dropping stale generation failure");
                        continue;
                    }
                    self.output = None;
                    self.status =
                        format!("{} error: {}", err_label(error.category()), error.message());
                    self.banner = Some(StatusBanner {
                        severity: StatusBannerSeverity::Error,
                        message: error.message().to_string(),
                    });
                }
            }
        }
    }

    fn try_generate(&mut self) {
        let Some(image_path) = self.selected_image.clone() else {
            self.show_error("Please select an image file.");
            return;
        };

        let styles: Vec<String> = if self.with_style_picker {
            STYLE_PRESETS
                .iter()
                .zip(&self.style_checked)
                .filter(|(_, checked)| **checked)
                .map(|(style, _)| style.to_string())
                .collect()
        } else {
            Vec::new()
        };

        let request = self.session.begin();
        self.output = None;
        self.banner = None;
        self.status = "Generating...".to_string();

        let queued = dispatch_command(
            &self.cmd_tx,
            BackendCommand::Generate {
                request,
                prompt: self.prompt.clone(),
                image_path,
                styles,
            },
            &mut self.status,
        );
        if !queued {
            // Unwind the optimistic Loading phase so the button comes back.
            let message = self.status.clone();
            self.session.complete_failure(request, message);
        }
    }

    fn show_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.status = message.clone();
        self.banner = Some(StatusBanner {
            severity: StatusBannerSeverity::Error,
            message,
        });
    }

    fn show_status_banner(&mut self, ui: &mut egui::Ui) {
        if let Some(banner) = self.banner.clone() {
            let (fill, stroke) = match banner.severity {
                StatusBannerSeverity::Error => (
                    egui::Color32::from_rgb(111, 53, 53),
                    egui::Stroke::new(1.0, egui::Color32::from_rgb(175, 96, 96)),
                ),
            };

            egui::Frame::NONE
                .fill(fill)
                .stroke(stroke)
                .corner_radius(8.0)
                .inner_margin(egui::Margin::symmetric(10, 8))
                .show(ui, |ui| {
                    ui.horizontal_wrapped(|ui| {
                        ui.label(egui::RichText::new(&banner.message).color(egui::Color32::WHITE));
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("Dismiss").clicked() {
                                self.banner = None;
                            }
                        });
                    });
                });
            ui.add_space(8.0);
        }
    }

    fn show_form_panel(&mut self, ui: &mut egui::Ui) {
        self.show_status_banner(ui);

        ui.heading("Generate");
        ui.add_space(6.0);

        ui.label(egui::RichText::new("Prompt").strong());
        ui.add(
            egui::TextEdit::multiline(&mut self.prompt)
                .id_salt("prompt_input")
                .hint_text("Describe the change to apply to the image")
                .desired_rows(3)
                .desired_width(f32::INFINITY),
        );
        ui.add_space(8.0);

        ui.label(egui::RichText::new("Input image").strong());
        ui.horizontal(|ui| {
            if ui.button("Choose image...").clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("Images", &["png", "jpg", "jpeg", "gif", "webp", "bmp"])
                    .pick_file()
                {
                    self.selected_image = Some(path);
                }
                // Dialog cancelled: keep the previous selection.
            }
            if self.selected_image.is_some() && ui.button("Clear").clicked() {
                self.selected_image = None;
            }
        });
        if let Some(path) = self.selected_image.clone() {
            ui.horizontal_wrapped(|ui| {
                ui.small(
                    path.file_name()
                        .and_then(|name| name.to_str())
                        .unwrap_or("(unnamed)"),
                );
                ui.small(egui::RichText::new(selected_file_size_text(&path)).weak());
            });
            match self.load_input_preview(ui.ctx(), &path) {
                Some(InputPreview::Image { texture, size }) => {
                    ui.add(egui::Image::new(&texture).fit_to_exact_size(size));
                }
                Some(InputPreview::DecodeFailed) => {
                    ui.small(
                        egui::RichText::new("Preview unavailable for this file.").weak(),
                    );
                }
                None => {}
            }
        }
        ui.add_space(8.0);

        if self.with_style_picker {
            ui.label(egui::RichText::new("Styles").strong());
            for (index, style) in STYLE_PRESETS.iter().enumerate() {
                ui.checkbox(&mut self.style_checked[index], *style);
            }
            ui.add_space(8.0);
        }

        let is_loading = self.session.is_loading();
        let label = if is_loading {
            "Generating..."
        } else {
            "Generate Image"
        };
        let button = egui::Button::new(egui::RichText::new(label).strong())
            .min_size(egui::vec2(ui.available_width(), 36.0));
        if ui.add_enabled(!is_loading, button).clicked() {
            self.try_generate();
        }

        if is_loading {
            ui.horizontal(|ui| {
                ui.add(egui::Spinner::new());
                if self.with_timer {
                    if let Some(elapsed) = self.session.loading_elapsed() {
                        ui.label(format_running_elapsed(elapsed));
                    }
                }
            });
        }

        ui.add_space(6.0);
        ui.horizontal_wrapped(|ui| {
            ui.small("Status:");
            ui.small(egui::RichText::new(&self.status).weak());
        });
        ui.small(egui::RichText::new(format!("Server: {}", self.server_url)).weak());
    }

    fn show_output_panel(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Output");
            if self.with_timer {
                if let Some(elapsed) = self.session.final_elapsed() {
                    egui::Frame::NONE
                        .fill(egui::Color32::from_rgb(47, 92, 63))
                        .corner_radius(8.0)
                        .inner_margin(egui::Margin::symmetric(8, 4))
                        .show(ui, |ui| {
                            ui.small(
                                egui::RichText::new(format!(
                                    "Done in {}",
                                    format_final_elapsed(elapsed)
                                ))
                                .color(egui::Color32::WHITE),
                            );
                        });
                }
            }
        });
        ui.add_space(6.0);

        let mut save_requested = false;
        let mut copy_requested = false;
        match &self.output {
            Some(output) => {
                ui.horizontal(|ui| {
                    save_requested = ui.button("Save image...").clicked();
                    copy_requested = ui
                        .add_enabled(
                            output.texture.is_some(),
                            egui::Button::new("Copy to clipboard"),
                        )
                        .clicked();
                });
                ui.add_space(8.0);
                match &output.texture {
                    Some(texture) => {
                        let avail = ui.available_size();
                        let scale = (avail.x / output.size.x)
                            .min(avail.y / output.size.y)
                            .min(1.0);
                        ui.add(
                            egui::Image::new(texture).fit_to_exact_size(output.size * scale),
                        );
                    }
                    None => {
                        ui.label(
                            egui::RichText::new(
                                "The response image could not be decoded for display; \
                                 it can still be saved.",
                            )
                            .weak(),
                        );
                    }
                }
            }
            None => {
                let placeholder = match self.session.failure_message() {
                    Some(message) => format!("Generation failed: {message}"),
                    None => "Your generated image will appear here.".to_string(),
                };
                ui.centered_and_justified(|ui| {
                    ui.label(egui::RichText::new(placeholder).weak());
                });
            }
        }

        if save_requested {
            self.save_output_as();
        }
        if copy_requested {
            self.copy_output_to_clipboard();
        }
    }

    fn preview_cache_key(path: &Path) -> PreviewCacheKey {
        PreviewCacheKey {
            path: path.to_path_buf(),
            modified: fs::metadata(path).and_then(|m| m.modified()).ok(),
        }
    }

    fn load_input_preview(&mut self, ctx: &egui::Context, path: &Path) -> Option<InputPreview> {
        if !is_previewable_image(path) {
            return None;
        }

        let cache_key = Self::preview_cache_key(path);
        if let Some(cached) = self.preview_cache.get(&cache_key).cloned() {
            return Some(cached);
        }

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(_) => {
                self.preview_cache
                    .insert(cache_key, InputPreview::DecodeFailed);
                return Some(InputPreview::DecodeFailed);
            }
        };
        let decoded = match image::load_from_memory(&bytes) {
            Ok(image) => image,
            Err(_) => {
                self.preview_cache
                    .insert(cache_key, InputPreview::DecodeFailed);
                return Some(InputPreview::DecodeFailed);
            }
        };

        let (orig_w, orig_h) = decoded.dimensions();
        let scale = (PREVIEW_MAX_DIMENSION / (orig_w.max(orig_h) as f32)).min(1.0);
        let resized = if scale < 1.0 {
            decoded.resize(
                (orig_w as f32 * scale).max(1.0) as u32,
                (orig_h as f32 * scale).max(1.0) as u32,
                image::imageops::FilterType::Triangle,
            )
        } else {
            decoded
        };
        let rgba = resized.to_rgba8();
        let [w, h] = [rgba.width() as usize, rgba.height() as usize];
        let color_image = egui::ColorImage::from_rgba_unmultiplied([w, h], rgba.as_raw());
        let texture = ctx.load_texture(
            format!("input-preview:{}", path.display()),
            color_image,
            egui::TextureOptions::LINEAR,
        );
        let preview = InputPreview::Image {
            texture,
            size: egui::vec2(w as f32, h as f32),
        };
        self.preview_cache.insert(cache_key, preview.clone());
        Some(preview)
    }

    fn save_output_as(&mut self) {
        let Some(output) = &self.output else {
            return;
        };
        let suggested = suggested_output_name(output.content_type.as_deref());
        if let Some(path) = rfd::FileDialog::new().set_file_name(&suggested).save_file() {
            match fs::write(&path, &output.bytes) {
                Ok(()) => {
                    self.status = format!("Saved image to {}", path.display());
                }
                Err(err) => {
                    self.status = format!("Failed to save image: {err}");
                }
            }
        }
    }

    fn copy_output_to_clipboard(&mut self) {
        let Some(output) = &self.output else {
            return;
        };
        match decode_image_for_clipboard(&output.bytes)
            .and_then(|(rgba, width, height)| write_clipboard_image(&rgba, width, height))
        {
            Ok(()) => self.status = "Copied generated image to clipboard".to_string(),
            Err(err) => self.status = format!("Failed to copy image: {err}"),
        }
    }
}

impl eframe::App for StudioApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events(ctx);

        egui::SidePanel::left("form_panel")
            .resizable(true)
            .default_width(360.0)
            .min_width(300.0)
            .show(ctx, |ui| self.show_form_panel(ui));
        egui::CentralPanel::default().show(ctx, |ui| self.show_output_panel(ui));

        // While loading, repaint often enough that the elapsed counter ticks.
        if self.session.is_loading() {
            ctx.request_repaint_after(std::time::Duration::from_millis(250));
        } else {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}

fn load_output(ctx: &egui::Context, image: GeneratedImage) -> GenerationOutput {
    match image::load_from_memory(&image.bytes) {
        Ok(decoded) => {
            let rgba = decoded.to_rgba8();
            let [w, h] = [rgba.width() as usize, rgba.height() as usize];
            let color_image = egui::ColorImage::from_rgba_unmultiplied([w, h], rgba.as_raw());
            let texture =
                ctx.load_texture("generation-output", color_image, egui::TextureOptions::LINEAR);
            GenerationOutput {
                bytes: image.bytes,
                content_type: image.content_type,
                texture: Some(texture),
                size: egui::vec2(w as f32, h as f32),
            }
        }
        Err(err) => {
            tracing::warn!("generated image did not decode: {err}");
            GenerationOutput {
                bytes: image.bytes,
                content_type: image.content_type,
                texture: None,
                size: egui::Vec2::ZERO,
            }
        }
    }
}

fn is_previewable_image(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref(),
        Some("png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp")
    )
}

fn selected_file_size_text(path: &Path) -> String {
    let bytes = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    human_readable_bytes(bytes)
}

fn human_readable_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else if (value - value.trunc()).abs() < f64::EPSILON {
        format!("{} {}", value as u64, UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

fn extension_for_content_type(content_type: Option<&str>) -> &'static str {
    match content_type {
        Some(ct) if ct.starts_with("image/jpeg") => "jpg",
        Some(ct) if ct.starts_with("image/webp") => "webp",
        Some(ct) if ct.starts_with("image/gif") => "gif",
        Some(ct) if ct.starts_with("image/bmp") => "bmp",
        _ => "png",
    }
}

fn suggested_output_name(content_type: Option<&str>) -> String {
    format!(
        "kontext-{}.{}",
        Local::now().format("%Y%m%d-%H%M%S"),
        extension_for_content_type(content_type)
    )
}

fn decode_image_for_clipboard(bytes: &[u8]) -> Result<(Vec<u8>, usize, usize), String> {
    let decoded = image::load_from_memory(bytes).map_err(|err| err.to_string())?;
    let rgba = decoded.to_rgba8();
    Ok((
        rgba.as_raw().to_vec(),
        rgba.width() as usize,
        rgba.height() as usize,
    ))
}

fn write_clipboard_image(rgba: &[u8], width: usize, height: usize) -> Result<(), String> {
    let mut clipboard = Clipboard::new().map_err(|err| err.to_string())?;
    clipboard
        .set_image(ImageData {
            width,
            height,
            bytes: std::borrow::Cow::Owned(rgba.to_vec()),
        })
        .map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> (
        StudioApp,
        crossbeam_channel::Receiver<BackendCommand>,
        crossbeam_channel::Sender<UiEvent>,
    ) {
        let (cmd_tx, cmd_rx) = crossbeam_channel::bounded(4);
        let (ui_tx, ui_rx) = crossbeam_channel::bounded(4);
        let app = StudioApp::new(StartupConfig::default(), cmd_tx, ui_rx);
        (app, cmd_rx, ui_tx)
    }

    #[test]
    fn submit_without_image_queues_nothing_and_shows_validation_message() {
        let (mut app, cmd_rx, _ui_tx) = test_app();
        app.prompt = "make it rainy".to_string();

        app.try_generate();

        assert!(cmd_rx.try_recv().is_err(), "no command may be queued");
        assert!(!app.session.is_loading());
        assert_eq!(
            app.banner.as_ref().map(|b| b.message.as_str()),
            Some("Please select an image file.")
        );
    }

    #[test]
    fn submit_queues_generate_with_checked_styles_in_picker_order() {
        let (mut app, cmd_rx, _ui_tx) = test_app();
        app.prompt = "make it rainy".to_string();
        app.selected_image = Some(PathBuf::from("/tmp/input.png"));
        app.style_checked[3] = true;
        app.style_checked[1] = true;

        app.try_generate();

        assert!(app.session.is_loading());
        let cmd = cmd_rx.try_recv().expect("one command queued");
        let BackendCommand::Generate {
            prompt,
            image_path,
            styles,
            ..
        } = cmd;
        assert_eq!(prompt, "make it rainy");
        assert_eq!(image_path, PathBuf::from("/tmp/input.png"));
        assert_eq!(
            styles,
            vec![
                STYLE_PRESETS[1].to_string(),
                STYLE_PRESETS[3].to_string()
            ]
        );
        assert!(cmd_rx.try_recv().is_err(), "exactly one command");
    }

    #[test]
    fn disabled_style_picker_submits_no_styles() {
        let (cmd_tx, cmd_rx) = crossbeam_channel::bounded(4);
        let (_ui_tx, ui_rx) = crossbeam_channel::bounded(4);
        let startup = StartupConfig {
            with_style_picker: false,
            ..StartupConfig::default()
        };
        let mut app = StudioApp::new(startup, cmd_tx, ui_rx);
        app.selected_image = Some(PathBuf::from("/tmp/input.png"));
        app.style_checked[0] = true;

        app.try_generate();

        let BackendCommand::Generate { styles, .. } =
            cmd_rx.try_recv().expect("one command queued");
        assert!(styles.is_empty());
    }

    #[test]
    fn disconnected_worker_unwinds_loading_state() {
        let (mut app, cmd_rx, _ui_tx) = test_app();
        drop(cmd_rx);
        app.selected_image = Some(PathBuf::from("/tmp/input.png"));

        app.try_generate();

        assert!(
            app.session.controls_enabled(),
            "failed dispatch must not leave the button disabled"
        );
        assert!(app.session.failure_message().is_some());
    }

    #[test]
    fn formats_file_sizes_readably() {
        assert_eq!(human_readable_bytes(0), "0 B");
        assert_eq!(human_readable_bytes(1023), "1023 B");
        assert_eq!(human_readable_bytes(1024), "1 KB");
        assert_eq!(human_readable_bytes(1536), "1.5 KB");
        assert_eq!(human_readable_bytes(2 * 1024 * 1024), "2 MB");
        assert_eq!(human_readable_bytes(3 * 1024 * 1024 * 1024), "3 GB");
    }

    #[test]
    fn output_extension_follows_content_type() {
        assert_eq!(extension_for_content_type(Some("image/png")), "png");
        assert_eq!(extension_for_content_type(Some("image/jpeg")), "jpg");
        assert_eq!(
            extension_for_content_type(Some("image/jpeg; charset=binary")),
            "jpg"
        );
        assert_eq!(extension_for_content_type(Some("text/plain")), "png");
        assert_eq!(extension_for_content_type(None), "png");
    }

    #[test]
    fn suggested_name_carries_prefix_and_extension() {
        let name = suggested_output_name(Some("image/png"));
        assert!(name.starts_with("kontext-"));
        assert!(name.ends_with(".png"));
    }

    #[test]
    fn previewable_extensions_are_case_insensitive() {
        assert!(is_previewable_image(Path::new("a/photo.PNG")));
        assert!(is_previewable_image(Path::new("b.webp")));
        assert!(!is_previewable_image(Path::new("c.tiff")));
        assert!(!is_previewable_image(Path::new("noext")));
    }
}
