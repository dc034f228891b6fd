mod models;
mod screens;
mod services;

use eframe::egui;
use screens::leaderboard::LeaderboardPage;
use services::admin_source::AdminSource;
use services::config_loader::{self, LeaderboardConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

enum LeaderboardState {
    Board(Box<LeaderboardPage>),
    StartupFailed { message: String },
}

struct LeaderboardApp {
    state: LeaderboardState,
}

impl LeaderboardApp {
    fn new(config: Result<LeaderboardConfig, String>) -> Self {
        let state = match config.and_then(|config| {
            AdminSource::from_config(&config.source)
                .map(|source| LeaderboardPage::new(Arc::new(source), &config))
                .map_err(|err| format!("Invalid data source: {err:#}"))
        }) {
            Ok(page) => {
                info!("Transition: Startup -> Board");
                LeaderboardState::Board(Box::new(page))
            }
            Err(message) => {
                error!("{message}");
                LeaderboardState::StartupFailed { message }
            }
        };
        Self { state }
    }
}

impl eframe::App for LeaderboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        match &mut self.state {
            LeaderboardState::Board(page) => page.ui(ctx),
            LeaderboardState::StartupFailed { message } => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.add_space(8.0);
                    ui.heading("Competition Board");
                    ui.add_space(8.0);
                    egui::Frame::group(ui.style())
                        .fill(egui::Color32::from_rgb(58, 22, 22))
                        .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(180, 60, 60)))
                        .show(ui, |ui| {
                            ui.label(egui::RichText::new("Startup Error").strong());
                            ui.colored_label(egui::Color32::from_rgb(255, 170, 170), message.as_str());
                        });
                });
            }
        }
    }
}

const LOG_DIR_ENV_VAR: &str = "LEADERBOARD_LOG_DIR";
const DEFAULT_LOG_FILTER: &str = "info,reqwest=warn,hyper_util=warn,wgpu_core=warn";

fn init_tracing(log_dir: &Path) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (file_layer, file_guard) = match fs::create_dir_all(log_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(log_dir, "leaderboard.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        Err(err) => {
            eprintln!("log directory {} unavailable: {err}", log_dir.display());
            (None, None)
        }
    };

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false);

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
    {
        eprintln!("tracing init failed: {err}");
        return None;
    }

    file_guard
}

fn install_custom_font(ctx: &egui::Context, font_path: &Path) {
    let bytes = match fs::read(font_path) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!("Failed to read font {}: {}", font_path.display(), err);
            return;
        }
    };

    let mut fonts = egui::FontDefinitions::default();
    fonts.font_data.insert(
        "custom".to_string(),
        Arc::new(egui::FontData::from_owned(bytes)),
    );

    if let Some(proportional) = fonts.families.get_mut(&egui::FontFamily::Proportional) {
        proportional.insert(0, "custom".to_string());
    }
    if let Some(monospace) = fonts.families.get_mut(&egui::FontFamily::Monospace) {
        monospace.push("custom".to_string());
    }

    ctx.set_fonts(fonts);
    info!("Installed font {}", font_path.display());
}

fn main() -> eframe::Result<()> {
    let log_dir = std::env::var_os(LOG_DIR_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("logs"));
    let _log_guard = init_tracing(&log_dir);
    info!("Starting admin leaderboard, logging to {}", log_dir.display());

    let config_path = config_loader::resolve_config_path(
        std::env::args().nth(1),
        std::env::var(config_loader::CONFIG_ENV_VAR).ok(),
    );
    let config = config_loader::load_leaderboard_config(&config_path);
    let presentation = config
        .as_ref()
        .map(|config| config.presentation.clone())
        .unwrap_or_default();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([presentation.window_width, presentation.window_height])
            .with_min_inner_size([900.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Competition Board",
        options,
        Box::new(move |cc| {
            if let Some(font_path) = presentation.font_path.as_deref() {
                install_custom_font(&cc.egui_ctx, font_path);
            }
            cc.egui_ctx
                .set_pixels_per_point(presentation.pixels_per_point.max(0.5));

            let mut style = (*cc.egui_ctx.style()).clone();
            style
                .text_styles
                .insert(egui::TextStyle::Heading, egui::FontId::proportional(30.0));
            style
                .text_styles
                .insert(egui::TextStyle::Body, egui::FontId::proportional(16.0));
            style
                .text_styles
                .insert(egui::TextStyle::Button, egui::FontId::proportional(16.0));
            style.spacing.button_padding = egui::vec2(12.0, 6.0);
            cc.egui_ctx.set_style(style);

            Ok(Box::new(LeaderboardApp::new(config)))
        }),
    )
}
