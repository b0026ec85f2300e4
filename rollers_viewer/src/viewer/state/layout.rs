use super::super::post::RenderTargets;
use super::ViewerState;
use winit::dpi::PhysicalSize;

pub(super) fn resize(state: &mut ViewerState, new_size: PhysicalSize<u32>) {
    if new_size.width == 0 || new_size.height == 0 {
        return;
    }

    state.size = new_size;
    state.config.width = new_size.width;
    state.config.height = new_size.height;
    state.surface.configure(&state.device, &state.config);
    state.targets = RenderTargets::new(&state.device, new_size, &state.post);
    log::debug!("resized render targets to {}x{}", new_size.width, new_size.height);
}
