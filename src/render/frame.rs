use std::collections::HashMap;

use bytemuck::{bytes_of, pod_read_unaligned, Pod};
use glam::{Mat4, Vec3};
use log::warn;
use serde::Serialize;

use crate::lights::{LIGHT_ARRAY_UNIFORM, LIGHT_COLOR_UNIFORM, LIGHT_COUNT_UNIFORM};
use crate::uniform::{MeshId, ShaderProgram, UniformLocation};

pub const VIEW_UNIFORM: &str = "u_view";
pub const PROJ_UNIFORM: &str = "u_proj";
pub const VIEW_POS_UNIFORM: &str = "u_view_pos";
pub const MODEL_UNIFORM: &str = "u_model";
pub const OBJECT_COLOR_UNIFORM: &str = "u_object_color";

/// Byte offset of `u_light[0]` inside the global block.
pub const LIGHTS_OFFSET: usize = 144;
/// Stride of one light struct; every vec3 is packed with a trailing f32.
pub const LIGHT_STRIDE: usize = 48;

/// Value type a uniform accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UniformKind {
    F32,
    U32,
    Vec3,
    Mat4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UniformTarget {
    Global { offset: usize },
    Model,
    ObjectColor,
    LightColor,
}

#[derive(Debug, Clone)]
struct UniformEntry {
    name: String,
    kind: UniformKind,
    target: UniformTarget,
}

/// Name to offset table mirroring the WGSL `Globals` struct, plus the
/// per-draw uniforms captured into each [`DrawCommand`].
#[derive(Debug, Clone)]
pub struct UniformLayout {
    entries: Vec<UniformEntry>,
    by_name: HashMap<String, UniformLocation>,
    size: usize,
    max_lights: usize,
}

impl UniformLayout {
    /// Layout of the Phong program with a light array of `max_lights` slots.
    pub fn phong(max_lights: usize) -> Self {
        let mut layout = Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
            size: LIGHTS_OFFSET + max_lights * LIGHT_STRIDE,
            max_lights,
        };

        layout.global(VIEW_UNIFORM, UniformKind::Mat4, 0);
        layout.global(PROJ_UNIFORM, UniformKind::Mat4, 64);
        layout.global(VIEW_POS_UNIFORM, UniformKind::Vec3, 128);
        layout.global(LIGHT_COUNT_UNIFORM, UniformKind::U32, 140);

        for index in 0..max_lights {
            let base = LIGHTS_OFFSET + index * LIGHT_STRIDE;
            let element = format!("{LIGHT_ARRAY_UNIFORM}[{index}]");
            for (field, kind, offset) in [
                ("position", UniformKind::Vec3, 0),
                ("constant", UniformKind::F32, 12),
                ("ambient", UniformKind::Vec3, 16),
                ("linear", UniformKind::F32, 28),
                ("color", UniformKind::Vec3, 32),
                ("quadratic", UniformKind::F32, 44),
            ] {
                layout.global(&format!("{element}.{field}"), kind, base + offset);
            }
        }

        layout.insert(MODEL_UNIFORM, UniformKind::Mat4, UniformTarget::Model);
        layout.insert(
            OBJECT_COLOR_UNIFORM,
            UniformKind::Vec3,
            UniformTarget::ObjectColor,
        );
        layout.insert(
            LIGHT_COLOR_UNIFORM,
            UniformKind::Vec3,
            UniformTarget::LightColor,
        );
        layout
    }

    fn global(&mut self, name: &str, kind: UniformKind, offset: usize) {
        self.insert(name, kind, UniformTarget::Global { offset });
    }

    fn insert(&mut self, name: &str, kind: UniformKind, target: UniformTarget) {
        let location = UniformLocation::new(self.entries.len() as u32);
        self.entries.push(UniformEntry {
            name: name.to_string(),
            kind,
            target,
        });
        self.by_name.insert(name.to_string(), location);
    }

    pub fn location(&self, name: &str) -> Option<UniformLocation> {
        self.by_name.get(name).copied()
    }

    /// Size in bytes of the global uniform block.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Length of the light array the shader is generated with.
    pub fn max_lights(&self) -> usize {
        self.max_lights
    }

    pub fn kind(&self, location: UniformLocation) -> Option<UniformKind> {
        self.entries
            .get(location.index() as usize)
            .map(|entry| entry.kind)
    }

    fn entry(&self, location: UniformLocation) -> Option<&UniformEntry> {
        self.entries.get(location.index() as usize)
    }
}

/// One recorded draw with the per-draw uniforms captured at call time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DrawCommand {
    pub mesh: MeshId,
    pub model: Mat4,
    pub color: Vec3,
    /// Markers are drawn with their light color and no shading.
    pub unlit: bool,
}

#[derive(Debug, Clone, Copy)]
struct DrawState {
    model: Mat4,
    color: Vec3,
    unlit: bool,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY,
            color: Vec3::ONE,
            unlit: false,
        }
    }
}

/// CPU-side program: global uniforms live in a byte block uploaded once
/// per frame, draws are recorded for the renderer to replay in order.
///
/// Uniform values persist across frames like the state of a linked GL
/// program; only the recorded draws are cleared by
/// [`FrameProgram::begin_frame`].
#[derive(Debug, Clone)]
pub struct FrameProgram {
    layout: UniformLayout,
    globals: Vec<u8>,
    state: DrawState,
    draws: Vec<DrawCommand>,
}

impl FrameProgram {
    pub fn new(layout: UniformLayout) -> Self {
        Self {
            globals: vec![0; layout.size()],
            layout,
            state: DrawState::default(),
            draws: Vec::new(),
        }
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    pub fn begin_frame(&mut self) {
        self.draws.clear();
    }

    /// Bytes of the global uniform block, ready for upload.
    pub fn globals(&self) -> &[u8] {
        &self.globals
    }

    pub fn draws(&self) -> &[DrawCommand] {
        &self.draws
    }

    pub fn read_f32(&self, name: &str) -> Option<f32> {
        self.read(name, UniformKind::F32)
    }

    pub fn read_u32(&self, name: &str) -> Option<u32> {
        self.read(name, UniformKind::U32)
    }

    pub fn read_vec3(&self, name: &str) -> Option<Vec3> {
        self.read::<[f32; 3]>(name, UniformKind::Vec3)
            .map(Vec3::from_array)
    }

    pub fn read_mat4(&self, name: &str) -> Option<Mat4> {
        self.read::<[f32; 16]>(name, UniformKind::Mat4)
            .map(|cols| Mat4::from_cols_array(&cols))
    }

    fn read<T: Pod>(&self, name: &str, kind: UniformKind) -> Option<T> {
        let entry = self.layout.entry(self.layout.location(name)?)?;
        match entry.target {
            UniformTarget::Global { offset } if entry.kind == kind => {
                let len = std::mem::size_of::<T>();
                Some(pod_read_unaligned(&self.globals[offset..offset + len]))
            }
            _ => None,
        }
    }

    fn target(
        &self,
        location: Option<UniformLocation>,
        kind: UniformKind,
    ) -> Option<UniformTarget> {
        let entry = self.layout.entry(location?)?;
        if entry.kind != kind {
            warn!(
                "uniform \"{}\" expects {:?} but was set with {:?}; ignored",
                entry.name, entry.kind, kind
            );
            return None;
        }
        Some(entry.target)
    }

    fn write_global<T: Pod>(&mut self, target: UniformTarget, value: T) {
        if let UniformTarget::Global { offset } = target {
            let bytes = bytes_of(&value);
            self.globals[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
    }
}

impl ShaderProgram for FrameProgram {
    fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        self.layout.location(name)
    }

    fn set_f32(&mut self, location: Option<UniformLocation>, value: f32) {
        if let Some(target) = self.target(location, UniformKind::F32) {
            self.write_global(target, value);
        }
    }

    fn set_u32(&mut self, location: Option<UniformLocation>, value: u32) {
        if let Some(target) = self.target(location, UniformKind::U32) {
            self.write_global(target, value);
        }
    }

    fn set_vec3(&mut self, location: Option<UniformLocation>, value: Vec3) {
        match self.target(location, UniformKind::Vec3) {
            Some(UniformTarget::ObjectColor) => {
                self.state.color = value;
                self.state.unlit = false;
            }
            Some(UniformTarget::LightColor) => {
                self.state.color = value;
                self.state.unlit = true;
            }
            Some(target) => self.write_global(target, value.to_array()),
            None => {}
        }
    }

    fn set_mat4(&mut self, location: Option<UniformLocation>, value: Mat4) {
        match self.target(location, UniformKind::Mat4) {
            Some(UniformTarget::Model) => self.state.model = value,
            Some(target) => self.write_global(target, value.to_cols_array()),
            None => {}
        }
    }

    fn draw(&mut self, mesh: MeshId) {
        self.draws.push(DrawCommand {
            mesh,
            model: self.state.model,
            color: self.state.color,
            unlit: self.state.unlit,
        });
    }
}
