mod frame;
mod mesh;
mod native;
mod shader;

pub use frame::{
    DrawCommand, FrameProgram, UniformKind, UniformLayout, LIGHTS_OFFSET, LIGHT_STRIDE,
    MODEL_UNIFORM, OBJECT_COLOR_UNIFORM, PROJ_UNIFORM, VIEW_POS_UNIFORM, VIEW_UNIFORM,
};
pub use mesh::MeshData;
pub use native::Renderer;
pub use shader::phong_shader;
