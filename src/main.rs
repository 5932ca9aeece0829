mod app;
mod color;
mod state;
mod ui;

use anyhow::Context;
use app::RetailDashApp;
use clap::Parser;
use eframe::egui;

use retail_dash::cli::{load_filter_spec, run_headless, Args};
use state::AppState;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.is_headless() {
        let stdout = std::io::stdout();
        return run_headless(&args, stdout.lock());
    }

    let mut state = AppState::new(&args.data);
    state.options = args.report_options();
    state.load();
    if let Some(path) = &args.filters {
        state.filters = load_filter_spec(path)?;
        state.refilter();
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Retail Analytics Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(RetailDashApp::new(state)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
    .context("running the dashboard window")
}
