use std::{f32::consts::PI, ops::BitOr};

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::{
    camera::CameraState,
    transform::{Transform, TransformStack},
};

/// Capabilities a material declares at construction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(u8);

impl Capabilities {
    pub const NONE: Self = Self(0);
    pub const TEXTURED: Self = Self(1 << 0);
    pub const LIT: Self = Self(1 << 1);
    pub const VERTEX_COLORED: Self = Self(1 << 2);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn bits(self) -> u32 {
        self.0 as u32
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MeshId {
    Sphere,
    Ship,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureId {
    Sun,
    Planet,
    Asteroid,
}

impl TextureId {
    pub const ALL: [TextureId; 3] = [Self::Sun, Self::Planet, Self::Asteroid];

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Sun => "sun.png",
            Self::Planet => "planet.png",
            Self::Asteroid => "asteroid.png",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Light {
    /// Direction the light travels in, normalized.
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl Light {
    pub fn new(direction: Vec3, color: Vec3) -> Self {
        Self {
            direction: direction.normalize_or_zero(),
            color,
            intensity: 1.0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Material {
    capabilities: Capabilities,
    texture: Option<TextureId>,
    light: Option<Light>,
    pub ambient: Vec3,
}

impl Material {
    pub fn textured_lit(texture: TextureId, light: Light) -> Self {
        Self {
            capabilities: Capabilities::TEXTURED | Capabilities::LIT,
            texture: Some(texture),
            light: Some(light),
            ambient: AMBIENT,
        }
    }

    pub fn vertex_colored_lit(light: Light) -> Self {
        Self {
            capabilities: Capabilities::VERTEX_COLORED | Capabilities::LIT,
            texture: None,
            light: Some(light),
            ambient: AMBIENT,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    pub fn light(&self) -> Option<&Light> {
        self.light.as_ref()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Sun,
    Planet,
    Asteroid,
    Ship,
}

impl EntityKind {
    /// Fixed draw order.
    pub const DRAW_ORDER: [EntityKind; 4] = [Self::Sun, Self::Planet, Self::Asteroid, Self::Ship];

    pub fn mesh(self) -> MeshId {
        match self {
            Self::Ship => MeshId::Ship,
            _ => MeshId::Sphere,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawItem {
    pub kind: EntityKind,
    pub mesh: MeshId,
    pub world: Mat4,
    pub material: Material,
}

const AMBIENT: Vec3 = Vec3::splat(0.05);
const SUN_LIGHT_COLOR: Vec3 = Vec3::new(1.0, 0.647, 0.0);

const PLANET_ORBIT: Vec3 = Vec3::new(5.0, 0.0, 0.0);
const ASTEROID_ORBIT: Vec3 = Vec3::new(2.0, 0.0, 0.0);
const SHIP_SCALE: f32 = 0.0005;
const SHIP_OFFSET: Vec3 = Vec3::new(0.0, -1.0, 1.0);
const SHIP_HEADING_DEGREES: f32 = 45.0;

/// Ship light keeps this rotation relative to the camera.
const SHIP_LIGHT_YAW: f32 = PI / 6.0;
const SHIP_LIGHT_PITCH: f32 = -PI / 8.0;
/// Distance below which the ship light stops brightening.
const MIN_LIGHT_DISTANCE: f32 = 0.5;

pub const ROLL_STEP: f32 = 0.2;

/// Animation state owned by the frame orchestrator.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct SceneState {
    /// Scene spin in degrees, wrapped to 0 once past 360.
    pub rotation_degrees: f32,
    /// Accumulated ship roll in radians.
    pub ship_roll: f32,
}

impl SceneState {
    pub fn advance_rotation(&mut self) {
        if self.rotation_degrees > 360.0 {
            self.rotation_degrees = 0.0;
        }
        self.rotation_degrees += 1.0;
    }

    pub fn roll(&mut self, roll_left: bool, roll_right: bool) {
        if roll_left {
            self.ship_roll += ROLL_STEP;
        }
        if roll_right {
            self.ship_roll -= ROLL_STEP;
        }
    }

    pub fn reset_roll(&mut self) {
        self.ship_roll = 0.0;
    }
}

pub fn ship_light(camera: &CameraState) -> Light {
    let offset = Quat::from_euler(EulerRot::YXZ, SHIP_LIGHT_YAW, SHIP_LIGHT_PITCH, 0.0);
    let direction = (camera.orientation() * offset) * Vec3::Z;
    let distance = camera.position.length().max(MIN_LIGHT_DISTANCE);
    Light {
        direction: direction.normalize_or_zero(),
        color: Vec3::ONE,
        intensity: 1.0 / distance,
    }
}

/// Builds this frame's draw list from scratch, in draw order.
pub fn compose_frame(state: &SceneState, camera: &CameraState) -> Vec<DrawItem> {
    let spin = state.rotation_degrees.to_radians();

    let sun = TransformStack::IDENTITY.then_rotate_y(spin);
    let planet = sun.then_translate(PLANET_ORBIT).then_rotate_y(spin);
    let asteroid = planet.then_translate(ASTEROID_ORBIT).then_rotate_z(spin);
    let ship = TransformStack::IDENTITY
        .then_transform(&Transform {
            position: SHIP_OFFSET,
            rotation: Quat::from_rotation_z(state.ship_roll),
            scale: Vec3::splat(SHIP_SCALE),
        })
        .then_rotate_y(SHIP_HEADING_DEGREES.to_radians());

    EntityKind::DRAW_ORDER
        .into_iter()
        .map(|kind| {
            let (world, material) = match kind {
                EntityKind::Sun => (
                    sun,
                    Material::textured_lit(
                        TextureId::Sun,
                        Light::new(Vec3::ONE, SUN_LIGHT_COLOR),
                    ),
                ),
                EntityKind::Planet => (
                    planet,
                    Material::textured_lit(TextureId::Planet, Light::new(Vec3::X, Vec3::ONE)),
                ),
                EntityKind::Asteroid => (
                    asteroid,
                    Material::textured_lit(TextureId::Asteroid, Light::new(Vec3::X, Vec3::ONE)),
                ),
                EntityKind::Ship => (ship, Material::vertex_colored_lit(ship_light(camera))),
            };
            DrawItem {
                kind,
                mesh: kind.mesh(),
                world: world.matrix(),
                material,
            }
        })
        .collect()
}
