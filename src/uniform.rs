use glam::{Mat4, Vec3};
use log::warn;
use serde::{Deserialize, Serialize};

/// Resolved handle of a named uniform inside a [`ShaderProgram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniformLocation(u32);

impl UniformLocation {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

/// Built-in meshes a draw call can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeshId {
    Cube,
    Sphere,
}

/// A linked shading program driven with one uniform write per value and
/// one draw call per mesh instance.
///
/// Setters take the lookup result directly. A `None` location is the
/// not-found sentinel and every setter silently ignores it, so callers can
/// keep pushing values to uniforms the program does not declare.
pub trait ShaderProgram {
    fn uniform_location(&self, name: &str) -> Option<UniformLocation>;

    fn set_f32(&mut self, location: Option<UniformLocation>, value: f32);

    fn set_u32(&mut self, location: Option<UniformLocation>, value: u32);

    fn set_vec3(&mut self, location: Option<UniformLocation>, value: Vec3);

    fn set_mat4(&mut self, location: Option<UniformLocation>, value: Mat4);

    /// Issues one draw of `mesh` with the current uniform state.
    fn draw(&mut self, mesh: MeshId);
}

/// Looks up `name`, logging a warning when the program does not declare it.
pub fn lookup_uniform<P: ShaderProgram + ?Sized>(
    program: &P,
    name: &str,
) -> Option<UniformLocation> {
    let location = program.uniform_location(name);
    if location.is_none() {
        warn!("uniform \"{name}\" was not found in the program");
    }
    location
}
