use std::{fs, path::Path};

use anyhow::{Context, Result};
use rollers_scene::{
    FrameInput, FrameReport, FrameScheduler, RecordingRenderer, RenderStep, SceneState,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct StepDump<'a> {
    report: &'a FrameReport,
    steps: &'a [RenderStep],
}

#[derive(Debug, Clone, Copy)]
pub struct HeadlessRun {
    pub frames: u32,
    pub frame_dt: f32,
    pub viewport: (u32, u32),
}

/// Drives the scheduler on a fixed clock without a window. Returns the report
/// of the last simulated frame.
pub fn run(
    config: HeadlessRun,
    scene: &mut SceneState,
    dump_steps: Option<&Path>,
) -> Result<Option<FrameReport>> {
    let mut scheduler = FrameScheduler::default();
    scheduler.set_viewport(config.viewport.0, config.viewport.1);
    let mut renderer = RecordingRenderer::new();
    let input = FrameInput::default();

    let mut last = None;
    let mut wraps = 0;
    for frame in 1..=config.frames {
        let now = frame as f32 * config.frame_dt;
        let report = scheduler.run_frame(scene, now, &input, &mut renderer);
        wraps += report.wraps;
        last = Some(report);
    }

    if let Some(report) = last.as_ref() {
        println!(
            "Headless run: {} frames, t={:.3}s, {} draws in final frame, {} conveyor wraps",
            config.frames, report.time, report.draw_count, wraps
        );
        for binding in &scene.oscillators {
            if let Some(actor) = scene.actor(binding.actor) {
                log::info!(
                    "{} at {:?} heading {:?}",
                    actor.name,
                    actor.transform.position,
                    binding.oscillator.direction()
                );
            }
        }
    }

    if let Some(path) = dump_steps {
        let report = last.as_ref().context("no frames simulated, nothing to dump")?;
        let dump = StepDump {
            report,
            steps: renderer.steps(),
        };
        let json = serde_json::to_string_pretty(&dump).context("serializing render steps")?;
        fs::write(path, json)
            .with_context(|| format!("writing render steps to {}", path.display()))?;
        println!("Render steps written to {}", path.display());
    }

    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::Value;

    #[test]
    fn dump_contains_final_frame_in_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("steps.json");
        let mut scene = SceneState::road_scene();
        scene.controls.moving = true;

        let report = run(
            HeadlessRun {
                frames: 90,
                frame_dt: 1.0 / 30.0,
                viewport: (1920, 1080),
            },
            &mut scene,
            Some(&path),
        )?
        .expect("frames simulated");
        assert_eq!(report.frame_index, 89);
        assert!((report.time - 3.0).abs() < 1e-4);

        let dump: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        let steps = dump["steps"].as_array().expect("steps array");
        assert!(steps.first().and_then(|s| s.get("BeginFrame")).is_some());
        assert_eq!(steps.last().and_then(Value::as_str), Some("Present"));
        assert_eq!(dump["report"]["draw_count"], 45);
        Ok(())
    }

    #[test]
    fn zero_frames_cannot_dump() {
        let mut scene = SceneState::road_scene();
        let dir = tempfile::tempdir().expect("tempdir");
        let result = run(
            HeadlessRun {
                frames: 0,
                frame_dt: 0.1,
                viewport: (4, 3),
            },
            &mut scene,
            Some(&dir.path().join("steps.json")),
        );
        assert!(result.is_err());
    }
}
