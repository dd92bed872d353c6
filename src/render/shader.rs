const MAX_LIGHTS_TOKEN: &str = "__MAX_LIGHTS__";

/// WGSL source of the Phong program with a `max_lights` sized light array.
///
/// The `Globals` struct must stay in sync with
/// [`UniformLayout::phong`](super::UniformLayout::phong).
pub fn phong_shader(max_lights: usize) -> String {
    SHADER.replace(MAX_LIGHTS_TOKEN, &max_lights.max(1).to_string())
}

const SHADER: &str = r#"
struct PointLight {
    position: vec3<f32>,
    att_constant: f32,
    ambient: vec3<f32>,
    att_linear: f32,
    color: vec3<f32>,
    att_quadratic: f32,
}

struct Globals {
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
    view_pos: vec3<f32>,
    light_count: u32,
    lights: array<PointLight, __MAX_LIGHTS__>,
}

struct ObjectConstants {
    model: mat4x4<f32>,
    normal: mat3x4<f32>,
    // w is 1.0 for unlit light markers
    color: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> globals: Globals;

@group(1) @binding(0)
var<uniform> object: ObjectConstants;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world_position = object.model * vec4<f32>(input.position, 1.0);
    out.position = globals.proj * globals.view * world_position;
    out.world_pos = world_position.xyz;

    let world_normal = mat3x3<f32>(
        object.normal[0].xyz,
        object.normal[1].xyz,
        object.normal[2].xyz
    ) * input.normal;

    out.normal = normalize(world_normal);
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    if (object.color.w > 0.5) {
        return vec4<f32>(object.color.rgb, 1.0);
    }

    let normal = normalize(input.normal);
    let view_dir = normalize(globals.view_pos - input.world_pos);
    let count = min(globals.light_count, __MAX_LIGHTS__u);
    var lit = vec3<f32>(0.0);
    for (var i = 0u; i < count; i = i + 1u) {
        let light = globals.lights[i];
        let to_light = light.position - input.world_pos;
        let dist = length(to_light);
        let light_dir = to_light / max(dist, 0.0001);
        let diffuse = max(dot(normal, light_dir), 0.0);
        let reflected = reflect(-light_dir, normal);
        let specular = pow(max(dot(view_dir, reflected), 0.0), 32.0);
        let falloff = light.att_constant
            + light.att_linear * dist
            + light.att_quadratic * dist * dist;
        let attenuation = 1.0 / max(falloff, 0.0001);
        lit = lit + (light.ambient + (diffuse + 0.5 * specular) * light.color) * attenuation;
    }
    return vec4<f32>(lit * object.color.rgb, 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_array_length_is_substituted() {
        let source = phong_shader(8);
        assert!(source.contains("array<PointLight, 8>"));
        assert!(source.contains("min(globals.light_count, 8u)"));
        assert!(!source.contains(MAX_LIGHTS_TOKEN));
    }
}
