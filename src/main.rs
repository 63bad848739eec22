mod api;
mod app;
mod graph;
mod layout;
mod render;
mod util;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Base URL of the graph backend.
    #[arg(long, default_value = "http://localhost:8000")]
    base_url: String,

    /// Bearer token for authenticated backends.
    #[arg(long = "auth-token", env = "SEMAGRAPH_TOKEN")]
    token: Option<String>,

    /// Initial search query.
    #[arg(long, default_value = "type:document")]
    query: String,

    /// Nesting depth of the initial load.
    #[arg(long, default_value_t = 3)]
    depth: u32,

    /// Maximum number of root documents to load.
    #[arg(long, default_value_t = 100)]
    limit: u32,

    /// Load a local graph JSON file instead of talking to a backend.
    #[arg(long)]
    data_file: Option<PathBuf>,

    /// Also push the local graph file to the backend after loading it.
    #[arg(long, requires = "data_file")]
    upload: bool,

    /// Initial window size.
    #[arg(long, default_value_t = 1440.0)]
    window_width: f32,
    #[arg(long, default_value_t = 920.0)]
    window_height: f32,
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = app::AppConfig {
        base_url: args.base_url,
        token: args.token,
        query: args.query,
        depth: args.depth,
        limit: args.limit,
        data_file: args.data_file,
        upload: args.upload,
    };

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([args.window_width, args.window_height]),
        ..Default::default()
    };

    eframe::run_native(
        "semagraph",
        options,
        Box::new(move |cc| Ok(Box::new(app::SemaGraphApp::new(cc, config)))),
    )
}
