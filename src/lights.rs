use glam::{Mat4, Vec3};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::uniform::{lookup_uniform, MeshId, ShaderProgram, UniformLocation};

/// Uniform array holding the light parameter structs.
pub const LIGHT_ARRAY_UNIFORM: &str = "u_light";
/// Number of live entries in [`LIGHT_ARRAY_UNIFORM`].
pub const LIGHT_COUNT_UNIFORM: &str = "u_light_count";
/// Unlit color used when drawing a light's marker.
pub const LIGHT_COLOR_UNIFORM: &str = "u_light_color";

pub const DEFAULT_MARKER_SCALE: f32 = 0.2;

/// Returned by [`LightRegistry::append`] when every uniform slot is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("light registry is full: the program declares {capacity} light slot(s)")]
pub struct LightRegistryFull {
    pub capacity: usize,
}

/// Distance falloff `1 / (constant + linear * d + quadratic * d^2)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 2.0,
            linear: 0.2,
            quadratic: 0.01,
        }
    }
}

/// Point light parameters, editable in place between frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub position: Vec3,
    pub ambient: Vec3,
    pub color: Vec3,
    pub attenuation: Attenuation,
}

impl Light {
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self {
            position,
            ambient: Vec3::splat(0.3),
            color,
            attenuation: Attenuation::default(),
        }
    }
}

impl Default for Light {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ONE)
    }
}

/// Uniform locations of one `u_light[i]` element, resolved once on bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightSlot {
    index: usize,
    name: String,
    position: Option<UniformLocation>,
    ambient: Option<UniformLocation>,
    color: Option<UniformLocation>,
    constant: Option<UniformLocation>,
    linear: Option<UniformLocation>,
    quadratic: Option<UniformLocation>,
}

impl LightSlot {
    fn bind<P: ShaderProgram + ?Sized>(program: &P, index: usize) -> Self {
        let name = format!("{LIGHT_ARRAY_UNIFORM}[{index}]");
        let field = |field: &str| lookup_uniform(program, &format!("{name}.{field}"));
        Self {
            index,
            position: field("position"),
            ambient: field("ambient"),
            color: field("color"),
            constant: field("constant"),
            linear: field("linear"),
            quadratic: field("quadratic"),
            name,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// False when at least one field is missing from the program; such a
    /// light contributes only the fields that did resolve.
    pub fn is_complete(&self) -> bool {
        [
            self.position,
            self.ambient,
            self.color,
            self.constant,
            self.linear,
            self.quadratic,
        ]
        .iter()
        .all(Option::is_some)
    }

    fn push<P: ShaderProgram + ?Sized>(&self, program: &mut P, light: &Light) {
        program.set_vec3(self.position, light.position);
        program.set_vec3(self.ambient, light.ambient);
        program.set_vec3(self.color, light.color);
        program.set_f32(self.constant, light.attenuation.constant);
        program.set_f32(self.linear, light.attenuation.linear);
        program.set_f32(self.quadratic, light.attenuation.quadratic);
    }
}

#[derive(Debug, Clone)]
struct BoundLight {
    light: Light,
    slot: LightSlot,
}

/// Ordered set of point lights bound positionally to the program's
/// fixed-size light array.
///
/// Entry `i` is always bound to `u_light[i]`. Only the tail can be removed,
/// which keeps every remaining binding valid without rebinding.
#[derive(Debug, Clone)]
pub struct LightRegistry {
    entries: Vec<BoundLight>,
    capacity: usize,
    count_location: Option<UniformLocation>,
    marker_color_location: Option<UniformLocation>,
    marker_scale: f32,
}

impl LightRegistry {
    pub fn new<P: ShaderProgram + ?Sized>(program: &P, capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
            count_location: lookup_uniform(program, LIGHT_COUNT_UNIFORM),
            marker_color_location: lookup_uniform(program, LIGHT_COLOR_UNIFORM),
            marker_scale: DEFAULT_MARKER_SCALE,
        }
    }

    pub fn with_marker_scale(mut self, scale: f32) -> Self {
        self.marker_scale = scale;
        self
    }

    /// Appends a light with default ambient and attenuation.
    pub fn append<P: ShaderProgram + ?Sized>(
        &mut self,
        program: &P,
        position: Vec3,
        color: Vec3,
    ) -> Result<usize, LightRegistryFull> {
        self.push(program, Light::new(position, color))
    }

    /// Appends a fully specified light and returns its slot index.
    pub fn push<P: ShaderProgram + ?Sized>(
        &mut self,
        program: &P,
        light: Light,
    ) -> Result<usize, LightRegistryFull> {
        let index = self.entries.len();
        if index >= self.capacity {
            return Err(LightRegistryFull {
                capacity: self.capacity,
            });
        }
        let slot = LightSlot::bind(program, index);
        debug!("bound light {index} to {}", slot.name());
        self.entries.push(BoundLight { light, slot });
        Ok(index)
    }

    /// Pops the most recently appended light.
    pub fn remove_last(&mut self) -> Option<Light> {
        self.entries.pop().map(|entry| entry.light)
    }

    /// Re-resolves every slot against `program`, e.g. after it was relinked.
    pub fn rebind<P: ShaderProgram + ?Sized>(&mut self, program: &P) {
        self.count_location = lookup_uniform(program, LIGHT_COUNT_UNIFORM);
        self.marker_color_location = lookup_uniform(program, LIGHT_COLOR_UNIFORM);
        for (index, entry) in self.entries.iter_mut().enumerate() {
            entry.slot = LightSlot::bind(program, index);
        }
    }

    /// Pushes every light and the live light count to the program.
    ///
    /// Must run after the frame's appends and removals and before any draw
    /// that depends on lighting.
    pub fn sync_to_gpu<P: ShaderProgram + ?Sized>(&self, program: &mut P) {
        for entry in &self.entries {
            entry.slot.push(program, &entry.light);
        }
        program.set_u32(self.count_location, self.entries.len() as u32);
    }

    /// Draws one `mesh` marker per light, scaled down and placed at the
    /// light's position.
    pub fn draw_markers<P: ShaderProgram + ?Sized>(
        &self,
        program: &mut P,
        model_location: Option<UniformLocation>,
        mesh: MeshId,
    ) {
        for entry in &self.entries {
            let model = Mat4::from_translation(entry.light.position)
                * Mat4::from_scale(Vec3::splat(self.marker_scale));
            program.set_vec3(self.marker_color_location, entry.light.color);
            program.set_mat4(model_location, model);
            program.draw(mesh);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&Light> {
        self.entries.get(index).map(|entry| &entry.light)
    }

    /// Live access for editors; the slot binding is not affected.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Light> {
        self.entries.get_mut(index).map(|entry| &mut entry.light)
    }

    pub fn slot(&self, index: usize) -> Option<&LightSlot> {
        self.entries.get(index).map(|entry| &entry.slot)
    }

    pub fn lights(&self) -> impl Iterator<Item = &Light> + '_ {
        self.entries.iter().map(|entry| &entry.light)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Light> + '_ {
        self.entries.iter_mut().map(|entry| &mut entry.light)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{FrameProgram, UniformLayout};

    fn program(max_lights: usize) -> FrameProgram {
        FrameProgram::new(UniformLayout::phong(max_lights))
    }

    fn slots(registry: &LightRegistry) -> Vec<LightSlot> {
        (0..registry.len())
            .filter_map(|index| registry.slot(index).cloned())
            .collect()
    }

    #[test]
    fn append_binds_positional_slots() {
        let program = program(4);
        let mut registry = LightRegistry::new(&program, 4);
        assert_eq!(registry.append(&program, Vec3::X, Vec3::ONE), Ok(0));
        assert_eq!(registry.append(&program, Vec3::Y, Vec3::ONE), Ok(1));
        assert_eq!(registry.slot(1).unwrap().name(), "u_light[1]");
        assert!(registry.slot(1).unwrap().is_complete());
        assert_eq!(registry.slot(1).unwrap().index(), 1);
    }

    #[test]
    fn append_then_remove_restores_previous_state() {
        let program = program(4);
        let mut registry = LightRegistry::new(&program, 4);
        registry.append(&program, Vec3::X, Vec3::ONE).unwrap();
        let before = slots(&registry);

        registry
            .append(&program, Vec3::new(5.0, 0.0, 0.0), Vec3::Z)
            .unwrap();
        let removed = registry.remove_last().unwrap();

        assert_eq!(removed.position, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(registry.len(), 1);
        assert_eq!(slots(&registry), before);
    }

    #[test]
    fn remove_last_keeps_head() {
        let program = program(4);
        let mut registry = LightRegistry::new(&program, 4);
        registry
            .append(&program, Vec3::new(1.0, 0.0, 0.0), Vec3::ONE)
            .unwrap();
        registry
            .append(&program, Vec3::new(2.0, 0.0, 0.0), Vec3::ONE)
            .unwrap();
        registry.remove_last();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(0).unwrap().position, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(registry.slot(0).unwrap().index(), 0);
        assert_eq!(registry.slot(0).unwrap().name(), "u_light[0]");
    }

    #[test]
    fn remove_from_empty_registry_is_none() {
        let program = program(2);
        let mut registry = LightRegistry::new(&program, 2);
        assert!(registry.remove_last().is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn sync_pushes_light_count() {
        let mut program = program(8);
        let mut registry = LightRegistry::new(&program, 8);
        for k in 1..=5 {
            registry
                .append(&program, Vec3::splat(k as f32), Vec3::ONE)
                .unwrap();
            registry.sync_to_gpu(&mut program);
            assert_eq!(registry.len(), k);
            assert_eq!(program.read_u32(LIGHT_COUNT_UNIFORM), Some(k as u32));
        }
        assert_eq!(
            program.read_vec3("u_light[4].position"),
            Some(Vec3::splat(5.0))
        );
        assert_eq!(program.read_f32("u_light[2].constant"), Some(2.0));
    }

    #[test]
    fn append_past_capacity_is_rejected() {
        let program = program(2);
        let mut registry = LightRegistry::new(&program, 2);
        registry.append(&program, Vec3::ZERO, Vec3::ONE).unwrap();
        registry.append(&program, Vec3::ZERO, Vec3::ONE).unwrap();
        assert!(registry.is_full());
        assert_eq!(
            registry.append(&program, Vec3::ZERO, Vec3::ONE),
            Err(LightRegistryFull { capacity: 2 })
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn missing_slot_makes_light_inert() {
        // The program only declares two light slots but the registry allows three.
        let mut program = program(2);
        let mut registry = LightRegistry::new(&program, 3);
        for index in 0..3 {
            registry
                .append(&program, Vec3::splat(index as f32 + 1.0), Vec3::ONE)
                .unwrap();
        }
        assert!(!registry.slot(2).unwrap().is_complete());

        registry.sync_to_gpu(&mut program);
        assert_eq!(program.read_u32(LIGHT_COUNT_UNIFORM), Some(3));
        assert_eq!(
            program.read_vec3("u_light[1].position"),
            Some(Vec3::splat(2.0))
        );
        assert_eq!(program.read_vec3("u_light[2].position"), None);
    }

    #[test]
    fn draw_markers_issues_one_draw_per_light() {
        let mut program = program(4);
        let mut registry = LightRegistry::new(&program, 4);
        registry
            .append(&program, Vec3::new(1.0, 2.0, 3.0), Vec3::new(1.0, 0.0, 0.0))
            .unwrap();
        registry.append(&program, Vec3::ZERO, Vec3::ONE).unwrap();

        let model = program.uniform_location("u_model");
        registry.draw_markers(&mut program, model, MeshId::Sphere);

        let draws = program.draws();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].mesh, MeshId::Sphere);
        assert!(draws[0].unlit);
        assert_eq!(draws[0].color, Vec3::new(1.0, 0.0, 0.0));
        let expected = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0))
            * Mat4::from_scale(Vec3::splat(DEFAULT_MARKER_SCALE));
        assert!(draws[0].model.abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn edits_through_get_mut_reach_the_program() {
        let mut program = program(2);
        let mut registry = LightRegistry::new(&program, 2);
        registry.append(&program, Vec3::ZERO, Vec3::ONE).unwrap();
        registry.get_mut(0).unwrap().attenuation.linear = 0.5;
        registry.sync_to_gpu(&mut program);
        assert_eq!(program.read_f32("u_light[0].linear"), Some(0.5));
    }

    #[test]
    fn rebind_resolves_against_new_program() {
        let small = program(1);
        let mut registry = LightRegistry::new(&small, 2);
        registry.append(&small, Vec3::ZERO, Vec3::ONE).unwrap();
        registry.append(&small, Vec3::ZERO, Vec3::ONE).unwrap();
        assert!(!registry.slot(1).unwrap().is_complete());

        let large = program(2);
        registry.rebind(&large);
        assert!(registry.slot(1).unwrap().is_complete());
    }
}
