use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use clap::Parser;
use rollers_scene::{DEFAULT_STATE_FILE, ScenePreset};

#[derive(Parser, Debug)]
#[command(about = "Road scene viewer with scripted traffic and looping scenery", version)]
pub struct Args {
    /// Plain-text view state restored at startup and written back on exit
    #[arg(long, default_value = DEFAULT_STATE_FILE)]
    pub state_file: PathBuf,

    /// Optional JSON preset overriding fog, track speeds, exposure and clear colour
    #[arg(long)]
    pub preset: Option<PathBuf>,

    /// Skip creating a winit window/event loop and drive the scheduler with a fixed clock
    #[arg(long)]
    pub headless: bool,

    /// Number of frames to simulate in headless mode
    #[arg(long, default_value_t = 600)]
    pub frames: u32,

    /// Fixed frame delta in seconds used by headless mode
    #[arg(long, default_value_t = 1.0 / 60.0)]
    pub frame_dt: f32,

    /// Start with scripted motion enabled instead of waiting for the M key
    #[arg(long)]
    pub start_moving: bool,

    /// When set, write the final headless frame's render steps as JSON
    #[arg(long)]
    pub dump_steps: Option<PathBuf>,

    #[arg(long, default_value_t = 1920)]
    pub width: u32,

    #[arg(long, default_value_t = 1080)]
    pub height: u32,
}

impl Args {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.frame_dt.is_finite() && self.frame_dt > 0.0,
            "frame_dt must be a positive number of seconds (got {})",
            self.frame_dt
        );
        ensure!(
            self.width > 0 && self.height > 0,
            "window size must be non-zero (got {}x{})",
            self.width,
            self.height
        );
        Ok(())
    }
}

pub fn load_preset(path: &Path) -> Result<ScenePreset> {
    ScenePreset::load(path).with_context(|| format!("loading scene preset {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let args = Args::try_parse_from(["rollers_viewer"]).expect("parse defaults");
        assert_eq!(args.state_file, PathBuf::from("resources/program_state.txt"));
        assert_eq!(args.frames, 600);
        assert_eq!((args.width, args.height), (1920, 1080));
        assert!(!args.headless);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn headless_flags_parse() {
        let args = Args::try_parse_from([
            "rollers_viewer",
            "--headless",
            "--frames",
            "30",
            "--frame-dt",
            "0.05",
            "--start-moving",
            "--dump-steps",
            "out.json",
        ])
        .expect("parse headless args");
        assert!(args.headless && args.start_moving);
        assert_eq!(args.frames, 30);
        assert_eq!(args.frame_dt, 0.05);
        assert_eq!(args.dump_steps, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn zero_frame_dt_is_rejected() {
        let args = Args::try_parse_from(["rollers_viewer", "--frame-dt", "0"]).expect("parse");
        assert!(args.validate().is_err());
    }

    #[test]
    fn preset_errors_name_the_file() {
        let err = load_preset(Path::new("definitely/missing/preset.json")).expect_err("missing");
        assert!(format!("{err:#}").contains("definitely/missing/preset.json"));
    }
}
