mod backend_bridge;
mod config;
mod controller;
mod ui;

use clap::Parser;
use crossbeam_channel::bounded;
use eframe::egui;

use backend_bridge::commands::BackendCommand;
use backend_bridge::runtime::spawn_backend_thread;
use controller::events::UiEvent;
use ui::StudioApp;

#[derive(Parser, Debug)]
#[command(
    name = "kontext-studio",
    about = "Desktop client for a Kontext image-generation service"
)]
struct Cli {
    /// Generation server base URL (overrides studio.toml and environment).
    #[arg(long)]
    server_url: Option<String>,
    /// Disable the elapsed-time counter.
    #[arg(long)]
    no_timer: bool,
    /// Hide the style tag picker.
    #[arg(long)]
    no_styles: bool,
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let cli = Cli::parse();
    let mut startup = config::load_settings();
    if let Some(url) = cli.server_url {
        startup.server_url = url;
    }
    if cli.no_timer {
        startup.with_timer = false;
    }
    if cli.no_styles {
        startup.with_style_picker = false;
    }

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(64);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(256);
    spawn_backend_thread(startup.clone(), cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Kontext Studio")
            .with_inner_size([1100.0, 720.0])
            .with_min_inner_size([820.0, 560.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Kontext Studio",
        options,
        Box::new(move |_cc| Ok(Box::new(StudioApp::new(startup, cmd_tx, ui_rx)))),
    )
}
