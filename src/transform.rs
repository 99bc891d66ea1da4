use glam::{Mat4, Quat, Vec3};

/// Local scale, rotation and translation, applied in that order.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// Immutable chain of world-space operations.
///
/// Every `then_*` call returns a new stack with the operation applied after
/// all previous ones, so a child can branch off its parent by value without
/// touching it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TransformStack(Mat4);

impl Default for TransformStack {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl TransformStack {
    pub const IDENTITY: Self = Self(Mat4::IDENTITY);

    pub fn then(self, matrix: Mat4) -> Self {
        Self(matrix * self.0)
    }

    pub fn then_scale(self, factor: f32) -> Self {
        self.then(Mat4::from_scale(Vec3::splat(factor)))
    }

    pub fn then_rotate_y(self, radians: f32) -> Self {
        self.then(Mat4::from_rotation_y(radians))
    }

    pub fn then_rotate_z(self, radians: f32) -> Self {
        self.then(Mat4::from_rotation_z(radians))
    }

    pub fn then_translate(self, offset: Vec3) -> Self {
        self.then(Mat4::from_translation(offset))
    }

    pub fn then_transform(self, transform: &Transform) -> Self {
        self.then(transform.matrix())
    }

    pub fn matrix(self) -> Mat4 {
        self.0
    }
}
