use rollers_scene::{FpsTier, OverlayStats};
use winit::window::{CursorGrabMode, Window};

use super::ViewerState;

const TITLE: &str = "Rollers";

#[derive(Default)]
pub(super) struct HudState {
    title: String,
    tier: Option<FpsTier>,
    cursor_released: Option<bool>,
}

pub(super) fn title_for(stats: &OverlayStats) -> String {
    let tier = match stats.tier {
        FpsTier::Good => "good",
        FpsTier::Fair => "fair",
        FpsTier::Poor => "poor",
    };
    format!("{TITLE} - {:.0} fps ({tier})", stats.fps)
}

/// Mirrors the FPS overlay into the window title and applies the cursor mode.
pub(super) fn apply_overlay(state: &mut ViewerState, stats: &OverlayStats) {
    let title = title_for(stats);
    if title != state.hud.title {
        state.window.set_title(&title);
        state.hud.title = title;
    }
    if state.hud.tier != Some(stats.tier) {
        log::debug!("frame rate tier now {:?} ({:.1} fps)", stats.tier, stats.fps);
        state.hud.tier = Some(stats.tier);
    }
    if state.hud.cursor_released != Some(stats.interactive) {
        set_cursor_released(&state.window, stats.interactive);
        state.hud.cursor_released = Some(stats.interactive);
    }
}

fn set_cursor_released(window: &Window, released: bool) {
    if released {
        if let Err(err) = window.set_cursor_grab(CursorGrabMode::None) {
            log::warn!("failed to release cursor: {err}");
        }
        window.set_cursor_visible(true);
    } else {
        let grabbed = window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
        if let Err(err) = grabbed {
            log::warn!("failed to capture cursor: {err}");
        }
        window.set_cursor_visible(false);
    }
}
