//! Procedural stand-in meshes, one per scene mesh kind.
//!
//! Each stand-in is baked from a handful of coloured primitives in the local
//! space the scene transforms expect: vehicles, trees, road and grass are
//! Y-up, while buildings, poles, lamps and terrain are authored Z-up and
//! stood upright by their actor rotations. All primitives wind
//! counter-clockwise when seen from outside.

use std::f32::consts::PI;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use rollers_scene::MeshKind;

const SPHERE_LAT_DIVS: u32 = 8;
const SPHERE_LON_DIVS: u32 = 12;
const ROUND_SEGMENTS: u32 = 16;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct MeshInstance {
    pub model: [[f32; 4]; 4],
}

impl MeshInstance {
    pub fn from_matrix(matrix: Mat4) -> Self {
        Self {
            model: to_matrix_columns(matrix),
        }
    }
}

#[derive(Default)]
pub struct MeshPrimitive {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u16>,
}

impl MeshPrimitive {
    /// Appends `other` transformed by `transform`, tinted with `color`.
    fn append(&mut self, other: &MeshPrimitive, transform: Mat4, color: [f32; 3]) {
        let base = self.vertices.len() as u16;
        let normal_matrix = transform.inverse().transpose();
        self.vertices.extend(other.vertices.iter().map(|vertex| MeshVertex {
            position: transform
                .transform_point3(Vec3::from(vertex.position))
                .into(),
            normal: normal_matrix
                .transform_vector3(Vec3::from(vertex.normal))
                .normalize_or_zero()
                .into(),
            color,
        }));
        self.indices
            .extend(other.indices.iter().map(|index| base + index));
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimitiveKind {
    Sphere,
    Cube,
    Cone,
    Cylinder,
}

pub fn primitive(kind: PrimitiveKind) -> MeshPrimitive {
    match kind {
        PrimitiveKind::Sphere => build_sphere(SPHERE_LAT_DIVS, SPHERE_LON_DIVS),
        PrimitiveKind::Cube => build_cube(),
        PrimitiveKind::Cone => build_cone(ROUND_SEGMENTS),
        PrimitiveKind::Cylinder => build_cylinder(ROUND_SEGMENTS),
    }
}

pub fn to_matrix_columns(matrix: Mat4) -> [[f32; 4]; 4] {
    matrix.to_cols_array_2d()
}

/// Accumulates coloured primitives into one mesh.
struct Builder {
    mesh: MeshPrimitive,
    cube: MeshPrimitive,
    cone: MeshPrimitive,
    cylinder: MeshPrimitive,
    sphere: MeshPrimitive,
}

impl Builder {
    fn new() -> Self {
        Self {
            mesh: MeshPrimitive::default(),
            cube: primitive(PrimitiveKind::Cube),
            cone: primitive(PrimitiveKind::Cone),
            cylinder: primitive(PrimitiveKind::Cylinder),
            sphere: primitive(PrimitiveKind::Sphere),
        }
    }

    fn part(&mut self, kind: PrimitiveKind, transform: Mat4, color: [f32; 3]) -> &mut Self {
        let source = match kind {
            PrimitiveKind::Cube => &self.cube,
            PrimitiveKind::Cone => &self.cone,
            PrimitiveKind::Cylinder => &self.cylinder,
            PrimitiveKind::Sphere => &self.sphere,
        };
        self.mesh.append(source, transform, color);
        self
    }

    /// Axis-aligned box spanning `min..max`.
    fn block(&mut self, min: Vec3, max: Vec3, color: [f32; 3]) -> &mut Self {
        let transform =
            Mat4::from_translation((min + max) * 0.5) * Mat4::from_scale(max - min);
        self.part(PrimitiveKind::Cube, transform, color)
    }

    /// Round part along the Y axis from `base` with the given radius and height.
    fn upright(
        &mut self,
        kind: PrimitiveKind,
        base: Vec3,
        radius: f32,
        height: f32,
        color: [f32; 3],
    ) -> &mut Self {
        let transform = Mat4::from_translation(base + Vec3::Y * (height * 0.5))
            * Mat4::from_scale(Vec3::new(radius * 2.0, height, radius * 2.0));
        self.part(kind, transform, color)
    }

    /// Round part along the Z axis, used by the Z-up props.
    fn standing(
        &mut self,
        kind: PrimitiveKind,
        base: Vec3,
        radius: f32,
        height: f32,
        color: [f32; 3],
    ) -> &mut Self {
        let transform = Mat4::from_translation(base + Vec3::Z * (height * 0.5))
            * Mat4::from_rotation_x(PI * 0.5)
            * Mat4::from_scale(Vec3::new(radius * 2.0, height, radius * 2.0));
        self.part(kind, transform, color)
    }

    fn finish(self) -> MeshPrimitive {
        self.mesh
    }
}

struct CarShape {
    /// Local direction the car's nose points at.
    front: Vec3,
    length: f32,
    width: f32,
    height: f32,
    /// Local y of the tyre contact patch.
    ground: f32,
    body: [f32; 3],
}

const ASPHALT: [f32; 3] = [0.12, 0.12, 0.13];
const LANE_PAINT: [f32; 3] = [0.9, 0.9, 0.85];
const TYRE: [f32; 3] = [0.05, 0.05, 0.05];
const GLASS: [f32; 3] = [0.2, 0.25, 0.3];
const BARK: [f32; 3] = [0.35, 0.22, 0.12];
const LEAVES: [f32; 3] = [0.12, 0.4, 0.15];
const CONCRETE: [f32; 3] = [0.55, 0.55, 0.58];
const WOOD: [f32; 3] = [0.4, 0.3, 0.2];
const STEEL: [f32; 3] = [0.3, 0.32, 0.35];
/// Above 1.0 so the lamp heads feed the bloom bright pass.
const LAMP_GLOW: [f32; 3] = [4.0, 3.0, 1.2];
const GRASS: [f32; 3] = [0.2, 0.5, 0.15];
const ROCK: [f32; 3] = [0.4, 0.38, 0.36];
const SNOW: [f32; 3] = [0.95, 0.95, 0.97];
const SOIL: [f32; 3] = [0.3, 0.35, 0.18];

pub fn stand_in(kind: MeshKind) -> MeshPrimitive {
    let mut builder = Builder::new();
    match kind {
        MeshKind::Road => {
            builder
                .block(Vec3::new(-15.5, 0.0, -4.0), Vec3::new(15.5, 0.4, 4.0), ASPHALT)
                .block(Vec3::new(-4.0, 0.4, -0.1), Vec3::new(4.0, 0.41, 0.1), LANE_PAINT);
        }
        MeshKind::NissanSx180 => car(
            &mut builder,
            CarShape {
                front: Vec3::NEG_Z,
                length: 6.2,
                width: 2.5,
                height: 1.9,
                ground: -1.67,
                body: [0.8, 0.1, 0.1],
            },
        ),
        MeshKind::Porsche911 => car(
            &mut builder,
            CarShape {
                front: Vec3::NEG_Z,
                length: 6.0,
                width: 2.6,
                height: 1.8,
                ground: -1.67,
                body: [0.85, 0.85, 0.8],
            },
        ),
        MeshKind::NissanS15 => car(
            &mut builder,
            CarShape {
                front: Vec3::X,
                length: 2.9,
                width: 1.2,
                height: 0.9,
                ground: -0.83,
                body: [0.1, 0.3, 0.8],
            },
        ),
        MeshKind::Nissan240sx => car(
            &mut builder,
            CarShape {
                front: Vec3::X,
                length: 2.9,
                width: 1.2,
                height: 0.85,
                ground: -0.83,
                body: [0.95, 0.6, 0.1],
            },
        ),
        MeshKind::Tree => {
            builder
                .upright(PrimitiveKind::Cylinder, Vec3::ZERO, 0.4, 4.0, BARK)
                .upright(PrimitiveKind::Cone, Vec3::new(0.0, 3.0, 0.0), 2.5, 6.0, LEAVES)
                .part(
                    PrimitiveKind::Sphere,
                    Mat4::from_translation(Vec3::new(0.0, 3.5, 0.0)) * Mat4::from_scale(Vec3::splat(3.5)),
                    LEAVES,
                );
        }
        MeshKind::Building => {
            builder
                .block(Vec3::new(-6.0, -8.0, -8.5), Vec3::new(6.0, 8.0, 15.0), CONCRETE)
                .block(Vec3::new(-4.0, -5.0, 15.0), Vec3::new(4.0, 5.0, 16.5), STEEL);
        }
        MeshKind::PowerPole => {
            builder
                .standing(PrimitiveKind::Cylinder, Vec3::new(0.0, 0.0, -1.3), 0.25, 20.0, WOOD)
                .block(Vec3::new(-0.2, -3.0, 16.5), Vec3::new(0.2, 3.0, 17.0), WOOD);
        }
        MeshKind::StreetLamp => {
            builder
                .standing(PrimitiveKind::Cylinder, Vec3::new(0.0, 0.0, -8.0), 1.5, 80.0, STEEL)
                .block(Vec3::new(-1.0, -1.0, 70.0), Vec3::new(1.0, 36.0, 72.0), STEEL)
                .block(Vec3::new(-3.0, 30.0, 66.5), Vec3::new(3.0, 38.0, 70.0), LAMP_GLOW);
        }
        MeshKind::Grass => {
            builder.block(Vec3::new(-30.0, -0.05, -3.0), Vec3::new(30.0, 0.05, 3.0), GRASS);
        }
        MeshKind::Mountain => {
            // Points down; the actor rotation flips it upright.
            let flipped = Mat4::from_rotation_x(PI);
            builder
                .part(
                    PrimitiveKind::Cone,
                    flipped * Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)) * Mat4::from_scale(Vec3::new(7.0, 2.0, 7.0)),
                    ROCK,
                )
                .part(
                    PrimitiveKind::Cone,
                    flipped
                        * Mat4::from_translation(Vec3::new(0.0, 1.75, 0.0))
                        * Mat4::from_scale(Vec3::new(1.75, 0.5, 1.75)),
                    SNOW,
                );
        }
        MeshKind::Terrain => {
            builder.block(
                Vec3::new(-214.0 / 60.0, -3.0, -0.15),
                Vec3::new(214.0 / 60.0, 3.0, -0.14),
                SOIL,
            );
        }
    }
    builder.finish()
}

fn car(builder: &mut Builder, shape: CarShape) {
    let forward = shape.front;
    let side = Vec3::Y.cross(forward).normalize();
    let basis = Mat4::from_cols(
        side.extend(0.0),
        Vec3::Y.extend(0.0),
        forward.extend(0.0),
        glam::Vec4::W,
    );
    let wheel_radius = shape.height * 0.22;
    let body_floor = shape.ground + wheel_radius;
    let half_length = shape.length * 0.5;
    let half_width = shape.width * 0.5;

    let local = |builder: &mut Builder, kind: PrimitiveKind, transform: Mat4, color: [f32; 3]| {
        builder.part(kind, basis * transform, color);
    };

    // Body in the car frame: x across, y up, z toward the nose.
    let body_height = shape.height * 0.45;
    local(
        builder,
        PrimitiveKind::Cube,
        Mat4::from_translation(Vec3::new(0.0, body_floor + body_height * 0.5, 0.0))
            * Mat4::from_scale(Vec3::new(shape.width, body_height, shape.length)),
        shape.body,
    );
    let cabin_height = shape.height - body_height - wheel_radius;
    local(
        builder,
        PrimitiveKind::Cube,
        Mat4::from_translation(Vec3::new(
            0.0,
            body_floor + body_height + cabin_height * 0.5,
            -shape.length * 0.1,
        )) * Mat4::from_scale(Vec3::new(shape.width * 0.85, cabin_height, shape.length * 0.5)),
        GLASS,
    );
    for (x, z) in [
        (half_width, half_length * 0.65),
        (-half_width, half_length * 0.65),
        (half_width, -half_length * 0.65),
        (-half_width, -half_length * 0.65),
    ] {
        local(
            builder,
            PrimitiveKind::Cylinder,
            Mat4::from_translation(Vec3::new(x, shape.ground + wheel_radius, z))
                * Mat4::from_rotation_z(PI * 0.5)
                * Mat4::from_scale(Vec3::new(wheel_radius * 2.0, shape.width * 0.15, wheel_radius * 2.0)),
            TYRE,
        );
    }
}

fn build_sphere(lat_divisions: u32, lon_divisions: u32) -> MeshPrimitive {
    let lat_steps = lat_divisions.max(3);
    let lon_steps = lon_divisions.max(6);
    let mut vertices = Vec::with_capacity(((lat_steps + 1) * (lon_steps + 1)) as usize);
    let mut indices = Vec::with_capacity((lat_steps * lon_steps * 6) as usize);

    for lat in 0..=lat_steps {
        let theta = lat as f32 / lat_steps as f32 * PI;
        for lon in 0..=lon_steps {
            let phi = lon as f32 / lon_steps as f32 * PI * 2.0;
            let normal = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
            vertices.push(MeshVertex {
                position: (normal * 0.5).into(),
                normal: normal.into(),
                color: [1.0; 3],
            });
        }
    }

    let ring = (lon_steps + 1) as usize;
    for lat in 0..lat_steps as usize {
        for lon in 0..lon_steps as usize {
            let current = lat * ring + lon;
            let next = current + ring;
            if lat != 0 {
                indices.extend_from_slice(&[current as u16, (current + 1) as u16, next as u16]);
            }
            if lat + 1 != lat_steps as usize {
                indices.extend_from_slice(&[
                    (current + 1) as u16,
                    (next + 1) as u16,
                    next as u16,
                ]);
            }
        }
    }

    MeshPrimitive { vertices, indices }
}

fn build_cube() -> MeshPrimitive {
    #[rustfmt::skip]
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        ([1.0, 0.0, 0.0], [[0.5, -0.5, -0.5], [0.5, 0.5, -0.5], [0.5, 0.5, 0.5], [0.5, -0.5, 0.5]]),
        ([-1.0, 0.0, 0.0], [[-0.5, -0.5, 0.5], [-0.5, 0.5, 0.5], [-0.5, 0.5, -0.5], [-0.5, -0.5, -0.5]]),
        ([0.0, 1.0, 0.0], [[-0.5, 0.5, -0.5], [-0.5, 0.5, 0.5], [0.5, 0.5, 0.5], [0.5, 0.5, -0.5]]),
        ([0.0, -1.0, 0.0], [[-0.5, -0.5, 0.5], [-0.5, -0.5, -0.5], [0.5, -0.5, -0.5], [0.5, -0.5, 0.5]]),
        ([0.0, 0.0, 1.0], [[-0.5, -0.5, 0.5], [0.5, -0.5, 0.5], [0.5, 0.5, 0.5], [-0.5, 0.5, 0.5]]),
        ([0.0, 0.0, -1.0], [[0.5, -0.5, -0.5], [-0.5, -0.5, -0.5], [-0.5, 0.5, -0.5], [0.5, 0.5, -0.5]]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (face_index, (normal, corners)) in faces.iter().enumerate() {
        let base = (face_index * 4) as u16;
        vertices.extend(corners.iter().map(|corner| MeshVertex {
            position: *corner,
            normal: *normal,
            color: [1.0; 3],
        }));
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    MeshPrimitive { vertices, indices }
}

fn ring_point(index: u32, segments: u32, y: f32) -> Vec3 {
    let angle = index as f32 / segments as f32 * PI * 2.0;
    Vec3::new(angle.cos() * 0.5, y, angle.sin() * 0.5)
}

fn push_cap(mesh: &mut MeshPrimitive, segments: u32, y: f32) {
    let normal = [0.0, y.signum(), 0.0];
    let center = mesh.vertices.len() as u16;
    mesh.vertices.push(MeshVertex {
        position: [0.0, y, 0.0],
        normal,
        color: [1.0; 3],
    });
    for i in 0..segments {
        mesh.vertices.push(MeshVertex {
            position: ring_point(i, segments, y).into(),
            normal,
            color: [1.0; 3],
        });
    }
    for i in 0..segments {
        let current = center + 1 + i as u16;
        let next = center + 1 + ((i + 1) % segments) as u16;
        if y > 0.0 {
            mesh.indices.extend_from_slice(&[center, next, current]);
        } else {
            mesh.indices.extend_from_slice(&[center, current, next]);
        }
    }
}

fn build_cone(segments: u32) -> MeshPrimitive {
    let ring = segments.max(3);
    let mut mesh = MeshPrimitive::default();

    for i in 0..ring {
        let current = ring_point(i, ring, -0.5);
        let next = ring_point(i + 1, ring, -0.5);
        let apex = Vec3::new(0.0, 0.5, 0.0);
        let normal = (next - apex).cross(current - apex).normalize();
        let base = mesh.vertices.len() as u16;
        for position in [apex, next, current] {
            mesh.vertices.push(MeshVertex {
                position: position.into(),
                normal: normal.into(),
                color: [1.0; 3],
            });
        }
        mesh.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }
    push_cap(&mut mesh, ring, -0.5);

    mesh
}

fn build_cylinder(segments: u32) -> MeshPrimitive {
    let ring = segments.max(3);
    let mut mesh = MeshPrimitive::default();

    let side_base = mesh.vertices.len() as u16;
    for i in 0..=ring {
        let bottom = ring_point(i, ring, -0.5);
        let normal = Vec3::new(bottom.x, 0.0, bottom.z).normalize();
        for position in [bottom, Vec3::new(bottom.x, 0.5, bottom.z)] {
            mesh.vertices.push(MeshVertex {
                position: position.into(),
                normal: normal.into(),
                color: [1.0; 3],
            });
        }
    }
    for i in 0..ring as u16 {
        let bottom = side_base + i * 2;
        let top = bottom + 1;
        let next_bottom = bottom + 2;
        let next_top = bottom + 3;
        mesh.indices
            .extend_from_slice(&[bottom, top, next_top, bottom, next_top, next_bottom]);
    }
    push_cap(&mut mesh, ring, 0.5);
    push_cap(&mut mesh, ring, -0.5);

    mesh
}
