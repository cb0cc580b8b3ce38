use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use swarm_engine::particles::SpriteImage;
use swarm_engine::shaders::{self, ShaderSources};
use swarm_engine::SimulationConfig;

pub fn load_config(path: Option<&Path>) -> Result<SimulationConfig> {
    let Some(path) = path else {
        return Ok(SimulationConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = SimulationConfig::from_json_str(&text)
        .with_context(|| format!("in {}", path.display()))?;
    log::info!("loaded config from {}", path.display());
    Ok(config)
}

/// Built-in sources, with any file in `dir` named after a stage replacing it.
pub fn load_shaders(dir: Option<&Path>) -> Result<ShaderSources> {
    let mut sources = ShaderSources::builtin();
    let Some(dir) = dir else {
        return Ok(sources);
    };
    for name in [shaders::UPDATE, shaders::RENDER_VERT, shaders::RENDER_FRAG] {
        let path = dir.join(name);
        if !path.is_file() {
            log::debug!("{name}: using built-in source");
            continue;
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read shader {}", path.display()))?;
        sources.set(name, text);
        log::info!("{name}: loaded from {}", path.display());
    }
    Ok(sources)
}

pub fn load_sprite(path: Option<&Path>) -> Result<SpriteImage> {
    let Some(path) = path else {
        return Ok(SpriteImage::soft_disc());
    };
    let img = image::open(path)
        .with_context(|| format!("failed to decode sprite {}", path.display()))?
        .to_rgba8();
    let (width, height) = img.dimensions();
    SpriteImage::from_rgba(width, height, img.into_raw())
        .with_context(|| format!("in {}", path.display()))
}
