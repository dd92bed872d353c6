//! A small Phong-lit 3D sandbox: a free-look camera, a registry of point
//! lights bound to a fixed-size uniform array, and a wgpu renderer.
//!
//! Everything up to the GPU boundary works against the [`ShaderProgram`]
//! trait, so scenes can be driven and inspected headlessly through
//! [`render::FrameProgram`]. Only [`Renderer`] needs a window and an adapter.

pub mod app;
pub mod camera;
pub mod input;
pub mod lights;
pub mod orientation;
pub mod render;
pub mod scene;
pub mod settings;
pub mod uniform;

pub use app::{FrameSummary, LightSummary, SceneState};
pub use camera::{FreeLookCamera, MoveIntent};
pub use input::{InputState, KeyCode, MouseButton, NamedKey};
pub use lights::{Attenuation, Light, LightRegistry, LightRegistryFull, LightSlot};
pub use orientation::Orientation;
pub use render::{FrameProgram, Renderer, UniformLayout};
pub use scene::{Scene, SceneObject, DEFAULT_SCENE};
pub use settings::{KeyBindings, Settings};
pub use uniform::{lookup_uniform, MeshId, ShaderProgram, UniformLocation};
