use std::path::PathBuf;

use anyhow::{Context, Result, bail};

pub const USAGE: &str = "\
usage: swarm-viewer [--config <file.json>] [--shaders <dir>] [--sprite <file.png>] [--headless <frames>]";

/// Command line options.
#[derive(Debug, Default, PartialEq)]
pub struct Args {
    /// JSON `SimulationConfig`.
    pub config: Option<PathBuf>,
    /// Directory holding replacement WGSL sources, by logical name.
    pub shaders: Option<PathBuf>,
    /// 32x32 PNG sprite.
    pub sprite: Option<PathBuf>,
    /// Run this many ticks offscreen instead of opening a window.
    pub headless: Option<u32>,
    pub help: bool,
}

impl Args {
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut out = Args::default();
        let mut args = args.into_iter();
        while let Some(flag) = args.next() {
            let mut value = || {
                args.next()
                    .with_context(|| format!("{flag} expects a value"))
            };
            match flag.as_str() {
                "--config" => out.config = Some(value()?.into()),
                "--shaders" => out.shaders = Some(value()?.into()),
                "--sprite" => out.sprite = Some(value()?.into()),
                "--headless" => {
                    let v = value()?;
                    out.headless = Some(
                        v.parse()
                            .with_context(|| format!("--headless expects a frame count, got {v:?}"))?,
                    );
                }
                "-h" | "--help" => out.help = true,
                other => bail!("unknown argument {other:?}\n{USAGE}"),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args> {
        Args::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn no_arguments_means_defaults() {
        assert_eq!(parse(&[]).unwrap(), Args::default());
    }

    #[test]
    fn every_flag_is_recognised() {
        let args = parse(&[
            "--config", "swarm.json", "--shaders", "wgsl", "--sprite", "dot.png", "--headless", "120",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("swarm.json")));
        assert_eq!(args.shaders, Some(PathBuf::from("wgsl")));
        assert_eq!(args.sprite, Some(PathBuf::from("dot.png")));
        assert_eq!(args.headless, Some(120));
    }

    #[test]
    fn missing_value_is_an_error() {
        let err = parse(&["--config"]).unwrap_err();
        assert!(err.to_string().contains("--config"));
    }

    #[test]
    fn bad_frame_count_and_unknown_flags_are_errors() {
        assert!(parse(&["--headless", "many"]).is_err());
        assert!(parse(&["--fullscreen"]).is_err());
    }
}
