use anyhow::{Context, Result};
use glam::{Mat4, Vec3};
use log::{info, warn};
use serde::Serialize;

use crate::camera::{FreeLookCamera, MoveIntent};
use crate::input::{InputState, KeyCode, MouseButton, NamedKey};
use crate::lights::{Light, LightRegistry, LightRegistryFull, LIGHT_COUNT_UNIFORM};
use crate::render::{
    FrameProgram, MODEL_UNIFORM, OBJECT_COLOR_UNIFORM, PROJ_UNIFORM, VIEW_POS_UNIFORM,
    VIEW_UNIFORM,
};
use crate::scene::{Scene, SceneObject};
use crate::settings::Settings;
use crate::uniform::{lookup_uniform, MeshId, ShaderProgram, UniformLocation};

/// Colors handed out to lights added at runtime, in turn.
const LIGHT_PALETTE: [Vec3; 4] = [
    Vec3::new(1.0, 1.0, 1.0),
    Vec3::new(1.0, 0.6, 0.3),
    Vec3::new(0.3, 0.6, 1.0),
    Vec3::new(0.5, 1.0, 0.5),
];

/// Distance in front of the camera where new lights appear.
const SPAWN_DISTANCE: f32 = 2.0;
/// Units per second when nudging the selected light.
const LIGHT_NUDGE_SPEED: f32 = 2.0;

#[derive(Debug, Clone, Copy)]
struct FrameLocations {
    view: Option<UniformLocation>,
    proj: Option<UniformLocation>,
    view_pos: Option<UniformLocation>,
    model: Option<UniformLocation>,
    object_color: Option<UniformLocation>,
}

impl FrameLocations {
    fn resolve<P: ShaderProgram + ?Sized>(program: &P) -> Self {
        Self {
            view: lookup_uniform(program, VIEW_UNIFORM),
            proj: lookup_uniform(program, PROJ_UNIFORM),
            view_pos: lookup_uniform(program, VIEW_POS_UNIFORM),
            model: lookup_uniform(program, MODEL_UNIFORM),
            object_color: lookup_uniform(program, OBJECT_COLOR_UNIFORM),
        }
    }
}

/// Everything the render loop owns: camera, lights and static geometry.
///
/// Input is handed in explicitly every frame; editors get direct mutable
/// access through [`SceneState::camera_mut`] and [`SceneState::lights_mut`].
#[derive(Debug, Clone)]
pub struct SceneState {
    camera: FreeLookCamera,
    lights: LightRegistry,
    objects: Vec<SceneObject>,
    settings: Settings,
    selected: Option<usize>,
    locations: FrameLocations,
    spawned: usize,
}

impl SceneState {
    /// Builds the state for `scene` and binds its lights to `program`.
    pub fn new<P: ShaderProgram + ?Sized>(scene: &Scene, program: &P) -> Result<Self> {
        let settings = scene.settings.clone();
        let mut lights = LightRegistry::new(program, settings.max_lights)
            .with_marker_scale(settings.marker_scale);
        for (index, light) in scene.lights.iter().enumerate() {
            lights
                .push(program, *light)
                .with_context(|| format!("scene light #{index} does not fit"))?;
        }
        Ok(Self {
            camera: scene.camera(),
            lights,
            objects: scene.meshes().cloned().collect(),
            selected: None,
            locations: FrameLocations::resolve(program),
            spawned: 0,
            settings,
        })
    }

    pub fn camera(&self) -> &FreeLookCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut FreeLookCamera {
        &mut self.camera
    }

    pub fn lights(&self) -> &LightRegistry {
        &self.lights
    }

    pub fn lights_mut(&mut self) -> &mut LightRegistry {
        &mut self.lights
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn selected_light(&self) -> Option<usize> {
        self.selected
    }

    /// Adds a light a short distance in front of the camera.
    pub fn add_light<P: ShaderProgram + ?Sized>(
        &mut self,
        program: &P,
    ) -> Result<usize, LightRegistryFull> {
        let position = self.camera.position + self.camera.forward() * SPAWN_DISTANCE;
        let color = LIGHT_PALETTE[self.spawned % LIGHT_PALETTE.len()];
        let index = self.lights.append(program, position, color)?;
        self.spawned += 1;
        self.selected = Some(index);
        Ok(index)
    }

    pub fn remove_light(&mut self) -> Option<Light> {
        let removed = self.lights.remove_last()?;
        if self.selected.is_some_and(|index| index >= self.lights.len()) {
            self.selected = self.lights.len().checked_sub(1);
        }
        Some(removed)
    }

    /// Applies one frame of input: movement, mouse-look while the right
    /// button is held, then light editing.
    pub fn handle_input<P: ShaderProgram + ?Sized>(
        &mut self,
        program: &P,
        input: &InputState,
        dt: f32,
    ) {
        let bindings = &self.settings.bindings;
        let intent = MoveIntent::from_input(input, bindings);
        self.camera.translate(intent, dt);
        if input.is_mouse_button_down(MouseButton::RIGHT) {
            self.camera.look(input.cursor_delta(), dt);
        }

        let add = input.was_key_pressed(bindings.add_light);
        let remove = input.was_key_pressed(bindings.remove_light);
        let next = input.was_key_pressed(bindings.next_light);

        if add {
            match self.add_light(program) {
                Ok(index) => info!("added light {index}"),
                Err(err) => warn!("{err}"),
            }
        }
        if remove && self.remove_light().is_some() {
            info!("removed light {}", self.lights.len());
        }
        if next && !self.lights.is_empty() {
            let index = self
                .selected
                .map_or(0, |index| (index + 1) % self.lights.len());
            self.selected = Some(index);
            info!("selected light {index}");
        }

        let nudge = light_nudge(input) * LIGHT_NUDGE_SPEED * dt;
        if nudge != Vec3::ZERO {
            if let Some(light) = self.selected.and_then(|index| self.lights.get_mut(index)) {
                light.position += nudge;
            }
        }
    }

    /// Records the frame: camera uniforms, light sync, one marker per light,
    /// then one draw per mesh object.
    pub fn record_frame<P: ShaderProgram + ?Sized>(&self, program: &mut P, aspect: f32) {
        let locations = self.locations;
        program.set_mat4(locations.view, self.camera.view_matrix());
        program.set_mat4(locations.proj, self.camera.projection(aspect));
        program.set_vec3(locations.view_pos, self.camera.position);

        self.lights.sync_to_gpu(program);
        self.lights
            .draw_markers(program, locations.model, MeshId::Sphere);

        for object in &self.objects {
            program.set_vec3(locations.object_color, object.color);
            program.set_mat4(locations.model, object_model_matrix(object));
            program.draw(MeshId::Cube);
        }
    }

    /// Snapshot of what the last recorded frame pushed to `program`.
    pub fn summary(&self, program: &FrameProgram) -> FrameSummary {
        let lights = (0..self.lights.len())
            .filter_map(|index| {
                let light = self.lights.get(index)?;
                let slot = self.lights.slot(index)?;
                Some(LightSummary {
                    slot: slot.name().to_string(),
                    bound: slot.is_complete(),
                    light: *light,
                })
            })
            .collect();
        FrameSummary {
            camera_position: self.camera.position,
            camera_forward: self.camera.forward(),
            pitch: self.camera.orientation.pitch,
            yaw: self.camera.orientation.yaw,
            light_count: program.read_u32(LIGHT_COUNT_UNIFORM).unwrap_or(0),
            capacity: self.lights.capacity(),
            draw_calls: program.draws().len(),
            lights,
        }
    }
}

fn light_nudge(input: &InputState) -> Vec3 {
    let mut nudge = Vec3::ZERO;
    for (key, direction) in [
        (NamedKey::Left, Vec3::NEG_X),
        (NamedKey::Right, Vec3::X),
        (NamedKey::Up, Vec3::NEG_Z),
        (NamedKey::Down, Vec3::Z),
        (NamedKey::PageUp, Vec3::Y),
        (NamedKey::PageDown, Vec3::NEG_Y),
    ] {
        if input.is_key_down(KeyCode::Named(key)) {
            nudge += direction;
        }
    }
    nudge
}

fn object_model_matrix(object: &SceneObject) -> Mat4 {
    let translation = Mat4::from_translation(object.position);
    let rotation = Mat4::from_rotation_z(object.rotation.z.to_radians())
        * Mat4::from_rotation_y(object.rotation.y.to_radians())
        * Mat4::from_rotation_x(object.rotation.x.to_radians());
    let scale = Mat4::from_scale(object.scale);
    translation * rotation * scale
}

/// Serializable view of one light and its binding.
#[derive(Debug, Clone, Serialize)]
pub struct LightSummary {
    pub slot: String,
    pub bound: bool,
    #[serde(flatten)]
    pub light: Light,
}

/// Serializable view of the scene after a recorded frame.
#[derive(Debug, Clone, Serialize)]
pub struct FrameSummary {
    pub camera_position: Vec3,
    pub camera_forward: Vec3,
    pub pitch: f32,
    pub yaw: f32,
    pub light_count: u32,
    pub capacity: usize,
    pub draw_calls: usize,
    pub lights: Vec<LightSummary>,
}

impl FrameSummary {
    /// Plain-text rendering printed by the headless mode.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "Camera pos=({:.2}, {:.2}, {:.2}) forward=({:.2}, {:.2}, {:.2}) pitch={:.1} yaw={:.1}",
            self.camera_position.x,
            self.camera_position.y,
            self.camera_position.z,
            self.camera_forward.x,
            self.camera_forward.y,
            self.camera_forward.z,
            self.pitch,
            self.yaw,
        )];
        for entry in &self.lights {
            let light = &entry.light;
            lines.push(format!(
                " - {} pos=({:.2}, {:.2}, {:.2}) color=({:.2}, {:.2}, {:.2}){}",
                entry.slot,
                light.position.x,
                light.position.y,
                light.position.z,
                light.color.x,
                light.color.y,
                light.color.z,
                if entry.bound { "" } else { " [unbound]" },
            ));
        }
        lines.push(format!(
            "Light count {} of {} slot(s), {} draw call(s)",
            self.light_count, self.capacity, self.draw_calls
        ));
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::UniformLayout;
    use crate::scene::DEFAULT_SCENE;

    fn setup() -> (SceneState, FrameProgram) {
        let scene = Scene::from_xml(DEFAULT_SCENE).unwrap();
        let program = FrameProgram::new(UniformLayout::phong(scene.settings.max_lights));
        let state = SceneState::new(&scene, &program).unwrap();
        (state, program)
    }

    #[test]
    fn default_scene_records_markers_then_objects() {
        let (state, mut program) = setup();
        state.record_frame(&mut program, 16.0 / 9.0);

        let draws = program.draws();
        assert_eq!(draws.len(), 4);
        assert!(draws[..2].iter().all(|d| d.unlit && d.mesh == MeshId::Sphere));
        assert!(draws[2..].iter().all(|d| !d.unlit && d.mesh == MeshId::Cube));
        assert_eq!(program.read_u32(LIGHT_COUNT_UNIFORM), Some(2));
        assert_eq!(program.read_vec3(VIEW_POS_UNIFORM), Some(Vec3::new(0.0, 1.0, 5.0)));
        assert_eq!(
            program.read_mat4(VIEW_UNIFORM),
            Some(state.camera().view_matrix())
        );
        assert_eq!(
            program.read_mat4(PROJ_UNIFORM),
            Some(state.camera().projection(16.0 / 9.0))
        );
    }

    #[test]
    fn plus_and_minus_edit_the_registry() {
        let (mut state, mut program) = setup();
        let mut input = InputState::new();

        input.set_key_down(KeyCode::Named(NamedKey::Plus));
        state.handle_input(&program, &input, 0.016);
        input.end_frame();
        input.set_key_up(KeyCode::Named(NamedKey::Plus));
        assert_eq!(state.lights().len(), 3);
        assert_eq!(state.selected_light(), Some(2));

        let expected = state.camera().position + state.camera().forward() * SPAWN_DISTANCE;
        assert!(state.lights().get(2).unwrap().position.abs_diff_eq(expected, 1e-5));

        input.set_key_down(KeyCode::Named(NamedKey::Minus));
        state.handle_input(&program, &input, 0.016);
        assert_eq!(state.lights().len(), 2);
        assert_eq!(state.selected_light(), Some(1));

        state.record_frame(&mut program, 1.0);
        assert_eq!(program.read_u32(LIGHT_COUNT_UNIFORM), Some(2));
    }

    #[test]
    fn full_registry_is_not_fatal() {
        let mut scene = Scene::from_xml(DEFAULT_SCENE).unwrap();
        scene.settings.max_lights = 2;
        let program = FrameProgram::new(UniformLayout::phong(2));
        let mut state = SceneState::new(&scene, &program).unwrap();

        assert_eq!(
            state.add_light(&program),
            Err(LightRegistryFull { capacity: 2 })
        );
        let mut input = InputState::new();
        input.set_key_down(KeyCode::Named(NamedKey::Plus));
        state.handle_input(&program, &input, 0.016);
        assert_eq!(state.lights().len(), 2);
    }

    #[test]
    fn scene_with_too_many_lights_fails() {
        let mut scene = Scene::from_xml(DEFAULT_SCENE).unwrap();
        scene.settings.max_lights = 1;
        let program = FrameProgram::new(UniformLayout::phong(1));
        assert!(SceneState::new(&scene, &program).is_err());
    }

    #[test]
    fn tab_selects_and_arrows_move_light() {
        let (mut state, program) = setup();
        let mut input = InputState::new();
        input.set_key_down(KeyCode::Named(NamedKey::Tab));
        state.handle_input(&program, &input, 0.5);
        assert_eq!(state.selected_light(), Some(0));
        input.end_frame();

        let before = state.lights().get(0).unwrap().position;
        input.set_key_down(KeyCode::Named(NamedKey::Right));
        state.handle_input(&program, &input, 0.5);
        let after = state.lights().get(0).unwrap().position;
        assert!((after - before).abs_diff_eq(Vec3::X * LIGHT_NUDGE_SPEED * 0.5, 1e-5));
    }

    #[test]
    fn mouse_look_requires_right_button() {
        let (mut state, program) = setup();
        let yaw = state.camera().orientation.yaw;
        let mut input = InputState::new();
        input.set_viewport(100, 100);
        input.set_cursor_position(glam::Vec2::ZERO);
        input.set_cursor_position(glam::Vec2::new(10.0, 0.0));
        state.handle_input(&program, &input, 0.01);
        assert_eq!(state.camera().orientation.yaw, yaw);

        input.set_mouse_button_down(MouseButton::RIGHT);
        state.handle_input(&program, &input, 0.01);
        assert!(state.camera().orientation.yaw > yaw);
    }

    #[test]
    fn summary_reports_slots_and_counts() {
        let (state, mut program) = setup();
        state.record_frame(&mut program, 1.0);
        let summary = state.summary(&program);
        assert_eq!(summary.light_count, 2);
        assert_eq!(summary.draw_calls, 4);
        assert_eq!(summary.lights[1].slot, "u_light[1]");
        let lines = summary.lines();
        assert!(lines.iter().any(|l| l.starts_with(" - u_light[0] pos=(2.00, 2.00, 2.00)")));
        assert_eq!(lines.last().unwrap(), "Light count 2 of 16 slot(s), 4 draw call(s)");
    }
}
