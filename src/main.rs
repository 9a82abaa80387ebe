mod audit;
mod config;
mod errors;
mod gallery;
mod logging;
mod media;
mod resolver;
mod security;
mod server;

use crate::config::Config;
use anyhow::Context;
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = PathBuf::from("safe-gallery.toml");
    let mut i = 1;
    while i < args.len() {
        if args[i].as_str() == "--config" {
            i += 1;
            if i >= args.len() { eprintln!("--config requires a path"); std::process::exit(2); }
            config_path = PathBuf::from(&args[i]);
        }
        i += 1;
    }

    let mut cfg = Config::load(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    cfg.apply_env();
    cfg.validate().context("validating config")?;

    logging::init(&cfg.logging);

    let base = gallery::seed::prepare(&cfg).context("preparing images directory")?;
    let addr = format!("{}:{}", cfg.server.bind_addr, cfg.server.port);

    info!(addr = %addr, images_dir = %base.path().display(), audit = cfg.audit.log_rejections, "safe-gallery ready");
    println!("safe-gallery ready on http://{addr}");

    server::serve(cfg, base).await
}
