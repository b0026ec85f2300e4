use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use rollers_scene::{FrameUniforms, SkyboxKind, SpotLight};

/// Spot lights beyond this count are dropped from the uniform block.
pub(super) const MAX_SPOT_LIGHTS: usize = 16;

pub(super) const MESH_SHADER_SOURCE: &str = r#"
struct SpotLight {
    position: vec4<f32>,
    direction: vec4<f32>,
    attenuation: vec4<f32>,
    ambient: vec4<f32>,
    diffuse: vec4<f32>,
    specular: vec4<f32>,
};

struct SceneUniforms {
    view_proj: mat4x4<f32>,
    sky_inv_view_proj: mat4x4<f32>,
    camera_position: vec4<f32>,
    sun_direction: vec4<f32>,
    sun_ambient: vec4<f32>,
    sun_diffuse: vec4<f32>,
    sun_specular: vec4<f32>,
    fog_color: vec4<f32>,
    fog_range: vec4<f32>,
    spots: array<SpotLight, 16>,
};

@group(0) @binding(0)
var<uniform> scene: SceneUniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec3<f32>,
};

struct InstanceInput {
    @location(3) model_0: vec4<f32>,
    @location(4) model_1: vec4<f32>,
    @location(5) model_2: vec4<f32>,
    @location(6) model_3: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec3<f32>,
};

@vertex
fn mesh_vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(instance.model_0, instance.model_1, instance.model_2, instance.model_3);
    let world = model * vec4<f32>(vertex.position, 1.0);
    var out: VertexOutput;
    out.position = scene.view_proj * world;
    out.world_position = world.xyz;
    out.normal = normalize((model * vec4<f32>(vertex.normal, 0.0)).xyz);
    out.color = vertex.color;
    return out;
}

const SHININESS: f32 = 16.0;

fn sun_light(normal: vec3<f32>, view_dir: vec3<f32>, albedo: vec3<f32>) -> vec3<f32> {
    let light_dir = normalize(-scene.sun_direction.xyz);
    let diffuse = max(dot(normal, light_dir), 0.0);
    let halfway = normalize(light_dir + view_dir);
    let specular = pow(max(dot(normal, halfway), 0.0), SHININESS);
    return scene.sun_ambient.xyz * albedo
        + scene.sun_diffuse.xyz * diffuse * albedo
        + scene.sun_specular.xyz * specular * 0.2;
}

fn spot_light(light: SpotLight, normal: vec3<f32>, world: vec3<f32>, view_dir: vec3<f32>, albedo: vec3<f32>) -> vec3<f32> {
    let to_light = light.position.xyz - world;
    let dist = length(to_light);
    let light_dir = to_light / max(dist, 1e-4);
    let diffuse = max(dot(normal, light_dir), 0.0);
    let halfway = normalize(light_dir + view_dir);
    let specular = pow(max(dot(normal, halfway), 0.0), SHININESS);
    let attenuation = 1.0 / (light.attenuation.x + light.attenuation.y * dist + light.attenuation.z * dist * dist);
    let theta = dot(light_dir, normalize(-light.direction.xyz));
    let epsilon = max(light.position.w - light.direction.w, 1e-4);
    let intensity = clamp((theta - light.direction.w) / epsilon, 0.0, 1.0);
    let ambient = light.ambient.xyz * albedo * 0.05;
    let lit = (light.diffuse.xyz * diffuse * albedo + light.specular.xyz * specular) * intensity;
    return (ambient * intensity + lit) * attenuation;
}

@fragment
fn mesh_fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let normal = normalize(input.normal);
    let view_dir = normalize(scene.camera_position.xyz - input.world_position);
    var color = sun_light(normal, view_dir, input.color);
    let count = u32(scene.fog_range.z);
    for (var i = 0u; i < count; i = i + 1u) {
        color = color + spot_light(scene.spots[i], normal, input.world_position, view_dir, input.color);
    }
    // Emissive vertex colours stay above the bloom threshold.
    color = max(color, input.color - vec3<f32>(1.0));

    let eye_distance = length(scene.camera_position.xyz - input.world_position);
    let span = max(scene.fog_range.y - scene.fog_range.x, 1e-4);
    let t = clamp((eye_distance - scene.fog_range.x) / span, 0.0, 1.0);
    let fog = 1.0 - exp(-scene.fog_color.w * t * t);
    return vec4<f32>(mix(color, scene.fog_color.xyz, fog), 1.0);
}
"#;

pub(super) const SKY_SHADER_SOURCE: &str = r#"
struct SceneUniforms {
    view_proj: mat4x4<f32>,
    sky_inv_view_proj: mat4x4<f32>,
    camera_position: vec4<f32>,
    sun_direction: vec4<f32>,
    sun_ambient: vec4<f32>,
    sun_diffuse: vec4<f32>,
    sun_specular: vec4<f32>,
    fog_color: vec4<f32>,
    fog_range: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> scene: SceneUniforms;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) ndc: vec2<f32>,
};

@vertex
fn sky_vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    let ndc = vec2<f32>(f32((index << 1u) & 2u) * 2.0 - 1.0, f32(index & 2u) * 2.0 - 1.0);
    var out: VertexOutput;
    // Far plane, so only uncovered pixels pass the LessEqual test.
    out.position = vec4<f32>(ndc, 1.0, 1.0);
    out.ndc = ndc;
    return out;
}

@fragment
fn sky_fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let far = scene.sky_inv_view_proj * vec4<f32>(input.ndc, 1.0, 1.0);
    let dir = normalize(far.xyz / far.w);
    let height = clamp(dir.y, -1.0, 1.0);
    var horizon = vec3<f32>(0.75, 0.82, 0.92);
    var zenith = vec3<f32>(0.22, 0.42, 0.85);
    var ground = vec3<f32>(0.35, 0.33, 0.3);
    if (scene.fog_range.w > 0.5) {
        horizon = vec3<f32>(0.95, 0.45, 0.22);
        zenith = vec3<f32>(0.06, 0.05, 0.2);
        ground = vec3<f32>(0.12, 0.08, 0.08);
    }
    var color = mix(horizon, zenith, pow(max(height, 0.0), 0.6));
    if (height < 0.0) {
        color = mix(horizon, ground, min(-height * 4.0, 1.0));
    }
    return vec4<f32>(color, 1.0);
}
"#;

const FULLSCREEN_VERTEX: &str = r#"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn fullscreen_vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: VertexOutput;
    out.position = vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(uv.x, 1.0 - uv.y);
    return out;
}

@group(0) @binding(0)
var source_texture: texture_2d<f32>;
@group(0) @binding(1)
var source_sampler: sampler;
"#;

const BRIGHT_FRAGMENT: &str = r#"
@fragment
fn bright_fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureSample(source_texture, source_sampler, input.uv).rgb;
    let luminance = dot(color, vec3<f32>(0.2126, 0.7152, 0.0722));
    if (luminance > 1.0) {
        return vec4<f32>(color, 1.0);
    }
    return vec4<f32>(0.0, 0.0, 0.0, 1.0);
}
"#;

const BLUR_FRAGMENT: &str = r#"
struct BlurUniforms {
    direction: vec4<f32>,
};

@group(1) @binding(0)
var<uniform> blur: BlurUniforms;

@fragment
fn blur_fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    var weights = array<f32, 5>(0.227027, 0.1945946, 0.1216216, 0.054054, 0.016216);
    let texel = 1.0 / vec2<f32>(textureDimensions(source_texture));
    let texel_step = blur.direction.xy * texel;
    var result = textureSample(source_texture, source_sampler, input.uv).rgb * weights[0];
    for (var i = 1; i < 5; i = i + 1) {
        let offset = texel_step * f32(i);
        result = result + textureSample(source_texture, source_sampler, input.uv + offset).rgb * weights[i];
        result = result + textureSample(source_texture, source_sampler, input.uv - offset).rgb * weights[i];
    }
    return vec4<f32>(result, 1.0);
}
"#;

const COMPOSITE_FRAGMENT: &str = r#"
struct CompositeUniforms {
    // exposure, bloom enabled, gamma, unused
    settings: vec4<f32>,
};

@group(1) @binding(0)
var bloom_texture: texture_2d<f32>;
@group(1) @binding(1)
var bloom_sampler: sampler;
@group(2) @binding(0)
var<uniform> composite: CompositeUniforms;

@fragment
fn composite_fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    var hdr = textureSample(source_texture, source_sampler, input.uv).rgb;
    if (composite.settings.y > 0.5) {
        hdr = hdr + textureSample(bloom_texture, bloom_sampler, input.uv).rgb;
    }
    let mapped = vec3<f32>(1.0) - exp(-hdr * composite.settings.x);
    return vec4<f32>(pow(mapped, vec3<f32>(1.0 / composite.settings.z)), 1.0);
}
"#;

pub(super) fn bright_shader_source() -> String {
    format!("{FULLSCREEN_VERTEX}{BRIGHT_FRAGMENT}")
}

pub(super) fn blur_shader_source() -> String {
    format!("{FULLSCREEN_VERTEX}{BLUR_FRAGMENT}")
}

pub(super) fn composite_shader_source() -> String {
    format!("{FULLSCREEN_VERTEX}{COMPOSITE_FRAGMENT}")
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(super) struct SpotLightGpu {
    /// xyz position, w cosine of the inner cone.
    position: [f32; 4],
    /// xyz direction, w cosine of the outer cone.
    direction: [f32; 4],
    attenuation: [f32; 4],
    ambient: [f32; 4],
    diffuse: [f32; 4],
    specular: [f32; 4],
}

impl From<&SpotLight> for SpotLightGpu {
    fn from(light: &SpotLight) -> Self {
        Self {
            position: light.position.extend(light.cut_off).into(),
            direction: light.direction.extend(light.outer_cut_off).into(),
            attenuation: [light.constant, light.linear, light.quadratic, 0.0],
            ambient: light.ambient.extend(0.0).into(),
            diffuse: light.diffuse.extend(0.0).into(),
            specular: light.specular.extend(0.0).into(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(super) struct SceneUniforms {
    view_proj: [[f32; 4]; 4],
    sky_inv_view_proj: [[f32; 4]; 4],
    /// xyz camera position, w scene time.
    camera_position: [f32; 4],
    sun_direction: [f32; 4],
    sun_ambient: [f32; 4],
    sun_diffuse: [f32; 4],
    sun_specular: [f32; 4],
    /// rgb fog colour, w density.
    fog_color: [f32; 4],
    /// fog start, fog end, spot count, sky variant.
    fog_range: [f32; 4],
    spots: [SpotLightGpu; MAX_SPOT_LIGHTS],
}

impl SceneUniforms {
    pub(super) fn new(frame: &FrameUniforms, sky: SkyboxKind) -> Self {
        let mut spots = [SpotLightGpu::zeroed(); MAX_SPOT_LIGHTS];
        let count = frame.spot_lights.len().min(MAX_SPOT_LIGHTS);
        for (slot, light) in spots.iter_mut().zip(&frame.spot_lights) {
            *slot = SpotLightGpu::from(light);
        }

        // Sky samples directions only, so the view loses its translation.
        let rotation_only = Mat4::from_mat3(glam::Mat3::from_mat4(frame.view));
        let sky_inv_view_proj = (frame.projection * rotation_only).inverse();
        let sky_variant = match sky {
            SkyboxKind::Day => 0.0,
            SkyboxKind::Dusk => 1.0,
        };

        Self {
            view_proj: (frame.projection * frame.view).to_cols_array_2d(),
            sky_inv_view_proj: sky_inv_view_proj.to_cols_array_2d(),
            camera_position: frame.camera_position.extend(frame.time).into(),
            sun_direction: frame.sun.direction.extend(0.0).into(),
            sun_ambient: frame.sun.ambient.extend(0.0).into(),
            sun_diffuse: frame.sun.diffuse.extend(0.0).into(),
            sun_specular: frame.sun.specular.extend(0.0).into(),
            fog_color: frame.fog.color.extend(frame.fog.density).into(),
            fog_range: [frame.fog.start, frame.fog.end, count as f32, sky_variant],
            spots,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(super) struct BlurUniforms {
    direction: [f32; 4],
}

impl BlurUniforms {
    pub(super) fn new(horizontal: bool) -> Self {
        let direction = if horizontal { Vec3::X } else { Vec3::Y };
        Self {
            direction: direction.extend(0.0).into(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(super) struct CompositeUniforms {
    settings: [f32; 4],
}

impl CompositeUniforms {
    /// sRGB swapchains encode on write; linear ones get an explicit gamma.
    pub(super) fn new(exposure: f32, bloom: bool, srgb_target: bool) -> Self {
        let gamma = if srgb_target { 1.0 } else { 2.2 };
        Self {
            settings: [exposure, if bloom { 1.0 } else { 0.0 }, gamma, 0.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollers_scene::{DirLight, FogSettings};

    fn frame_with_lights(count: usize) -> FrameUniforms {
        FrameUniforms {
            view: Mat4::look_at_rh(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO, Vec3::Y),
            projection: Mat4::perspective_rh(1.0, 16.0 / 9.0, 0.1, 1000.0),
            camera_position: Vec3::new(0.0, 2.0, 5.0),
            clear_color: Vec3::ZERO,
            time: 2.5,
            sun: DirLight::default(),
            spot_lights: (0..count)
                .map(|i| SpotLight::street_lamp(Vec3::new(i as f32, 7.0, 0.0)))
                .collect(),
            fog: FogSettings::default(),
        }
    }

    #[test]
    fn uniform_blocks_are_vec4_aligned() {
        assert_eq!(std::mem::size_of::<SpotLightGpu>(), 96);
        assert_eq!(std::mem::size_of::<SceneUniforms>() % 16, 0);
        assert_eq!(
            std::mem::size_of::<SceneUniforms>(),
            2 * 64 + 7 * 16 + MAX_SPOT_LIGHTS * 96
        );
    }

    #[test]
    fn excess_spot_lights_are_truncated() {
        let uniforms = SceneUniforms::new(&frame_with_lights(MAX_SPOT_LIGHTS + 4), SkyboxKind::Day);
        assert_eq!(uniforms.fog_range[2] as usize, MAX_SPOT_LIGHTS);

        let few = SceneUniforms::new(&frame_with_lights(3), SkyboxKind::Dusk);
        assert_eq!(few.fog_range[2], 3.0);
        assert_eq!(few.fog_range[3], 1.0);
        assert_eq!(few.spots[2].position, [2.0, 7.0, 0.0, 10f32.to_radians().cos()]);
    }

    #[test]
    fn sky_matrix_ignores_camera_translation() {
        let mut near = frame_with_lights(0);
        let far = SceneUniforms::new(&near, SkyboxKind::Day).sky_inv_view_proj;
        near.view = Mat4::look_at_rh(Vec3::new(100.0, 2.0, 5.0), Vec3::new(100.0, 0.0, 0.0), Vec3::Y);
        let moved = SceneUniforms::new(&near, SkyboxKind::Day).sky_inv_view_proj;
        for (a, b) in far.iter().flatten().zip(moved.iter().flatten()) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn composite_gamma_depends_on_target() {
        assert_eq!(CompositeUniforms::new(0.5, true, true).settings, [0.5, 1.0, 1.0, 0.0]);
        assert_eq!(CompositeUniforms::new(0.5, false, false).settings[2], 2.2);
    }
}
