mod app;
mod args;
mod assets;
mod headless;

use anyhow::Result;
use swarm_engine::device::GpuInit;
use swarm_engine::logging::{LoggingConfig, init_logging};
use swarm_engine::window::{Runtime, RuntimeConfig};

use crate::app::ViewerApp;
use crate::args::{Args, USAGE};

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let args = Args::parse(std::env::args().skip(1))?;
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }

    let config = assets::load_config(args.config.as_deref())?;
    config.validate()?;
    let sources = assets::load_shaders(args.shaders.as_deref())?;
    let sprite = assets::load_sprite(args.sprite.as_deref())?;

    if let Some(frames) = args.headless {
        return headless::run(&config, &sources, &sprite, frames);
    }

    let app = Runtime::run(
        RuntimeConfig::default(),
        GpuInit::default(),
        ViewerApp::new(config, sources, sprite),
    )?;

    match app.failure {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}
