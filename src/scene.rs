use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::camera::FreeLookCamera;
use crate::input::KeyCode;
use crate::lights::{Attenuation, Light};
use crate::orientation::Orientation;
use crate::settings::{Settings, MAX_LIGHTS_LIMIT};

/// Scene used when no file is given on the command line.
pub const DEFAULT_SCENE: &str = r#"<scene>
    <object>
        <name>Camera</name>
        <type>camera</type>
        <position>0 1 5</position>
        <rotation>-10 -90 0</rotation>
    </object>
    <object>
        <name>Cube</name>
        <type>mesh</type>
        <color>200 120 80</color>
    </object>
    <object>
        <name>Floor</name>
        <type>mesh</type>
        <position>0 -1 0</position>
        <scale>10 0.1 10</scale>
        <color>160 160 160</color>
    </object>
    <object>
        <name>Key</name>
        <type>light</type>
        <position>2 2 2</position>
    </object>
    <object>
        <name>Fill</name>
        <type>light</type>
        <position>-2 1 -1</position>
        <color>80 120 255</color>
    </object>
</scene>
"#;

/// Runtime representation of a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Scene {
    pub objects: Vec<SceneObject>,
    pub lights: Vec<Light>,
    pub settings: Settings,
}

impl Scene {
    /// Parses a scene description.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid scene XML")?;
        let mut objects = Vec::new();

        for node in document.descendants().filter(|n| n.has_tag_name("object")) {
            let mut object = SceneObject::default();
            object.name = required_text(&node, "name")?;
            object.object_type = optional_text(&node, "type").unwrap_or_else(|| "mesh".to_string());
            object.color = parse_color(optional_text(&node, "color"), object.color)
                .with_context(|| format!("object {}", object.name))?;
            object.position = parse_vec3(optional_text(&node, "position"), object.position)
                .with_context(|| format!("object {}", object.name))?;
            object.rotation = parse_vec3(optional_text(&node, "rotation"), object.rotation)
                .with_context(|| format!("object {}", object.name))?;
            object.scale = parse_vec3(optional_text(&node, "scale"), object.scale)
                .with_context(|| format!("object {}", object.name))?;
            object.fov = optional_text(&node, "fov")
                .map(|text| parse_f32(Some(text), 0.0))
                .transpose()?;
            object.ambient = optional_text(&node, "ambient")
                .map(|text| parse_vec3(Some(text), Vec3::ZERO))
                .transpose()?;
            object.attenuation = optional_text(&node, "attenuation")
                .map(|text| parse_vec3(Some(text), Vec3::ZERO))
                .transpose()?
                .map(|v| Attenuation {
                    constant: v.x,
                    linear: v.y,
                    quadratic: v.z,
                });
            objects.push(object);
        }

        let lights = objects
            .iter()
            .filter(|obj| obj.object_type == "light")
            .map(SceneObject::to_light)
            .collect();

        let settings = match document.descendants().find(|n| n.has_tag_name("settings")) {
            Some(node) => parse_settings(&node).context("invalid <settings> block")?,
            None => Settings::default(),
        };

        Ok(Self {
            objects,
            lights,
            settings,
        })
    }

    /// Camera built from the first `camera` object, or the default camera.
    pub fn camera(&self) -> FreeLookCamera {
        let mut camera = self
            .objects
            .iter()
            .find(|o| o.object_type == "camera")
            .map(|object| {
                let rotation = object.rotation;
                let mut camera = FreeLookCamera::new(
                    object.position,
                    Orientation::new(rotation.x, rotation.y, rotation.z),
                );
                camera.apply_settings(&self.settings);
                if let Some(fov) = object.fov {
                    camera.fov = fov;
                }
                camera
            })
            .unwrap_or_else(|| {
                let mut camera = FreeLookCamera::default();
                camera.apply_settings(&self.settings);
                camera
            });
        camera.orientation.normalize();
        camera
    }

    /// Objects drawn as lit geometry.
    pub fn meshes(&self) -> impl Iterator<Item = &SceneObject> + '_ {
        self.objects
            .iter()
            .filter(|o| matches!(o.object_type.as_str(), "mesh" | "part"))
    }
}

/// Scene object as described in the scene file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    #[serde(rename = "type")]
    pub object_type: String,
    #[serde(default = "default_color")]
    pub color: Vec3,
    #[serde(default)]
    pub position: Vec3,
    /// Degrees; cameras read it as pitch, yaw and roll.
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
    /// Overrides the `<settings>` field of view for a camera object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fov: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambient: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attenuation: Option<Attenuation>,
}

impl Default for SceneObject {
    fn default() -> Self {
        Self {
            name: String::new(),
            object_type: String::new(),
            color: default_color(),
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: default_scale(),
            fov: None,
            ambient: None,
            attenuation: None,
        }
    }
}

impl SceneObject {
    pub fn to_light(&self) -> Light {
        let mut light = Light::new(self.position, self.color);
        if let Some(ambient) = self.ambient {
            light.ambient = ambient;
        }
        if let Some(attenuation) = self.attenuation {
            light.attenuation = attenuation;
        }
        light
    }
}

fn default_color() -> Vec3 {
    Vec3::ONE
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

fn parse_settings(node: &Node<'_, '_>) -> Result<Settings> {
    let mut settings = Settings::default();
    settings.move_speed = parse_f32(optional_text(node, "move_speed"), settings.move_speed)?;
    settings.look_sensitivity = parse_f32(
        optional_text(node, "look_sensitivity"),
        settings.look_sensitivity,
    )?;
    settings.marker_scale = parse_f32(optional_text(node, "marker_scale"), settings.marker_scale)?;
    settings.fov = parse_f32(optional_text(node, "fov"), settings.fov)?;
    settings.near = parse_f32(optional_text(node, "near"), settings.near)?;
    settings.far = parse_f32(optional_text(node, "far"), settings.far)?;
    if let Some(max_lights) = optional_text(node, "max_lights") {
        let max_lights = max_lights
            .parse::<usize>()
            .map_err(|err| anyhow!("failed to parse max_lights: {err}"))?;
        if !(1..=MAX_LIGHTS_LIMIT).contains(&max_lights) {
            return Err(anyhow!(
                "max_lights must be between 1 and {MAX_LIGHTS_LIMIT}, got {max_lights}"
            ));
        }
        settings.max_lights = max_lights;
    }

    for bind in node.children().filter(|child| child.has_tag_name("bind")) {
        let action = bind
            .attribute("action")
            .ok_or_else(|| anyhow!("<bind> is missing its action attribute"))?;
        let name = bind.text().map(str::trim).unwrap_or_default();
        let key = KeyCode::from_name(name).ok_or_else(|| anyhow!("unknown key name {name:?}"))?;
        if !settings.bindings.set(action, key) {
            return Err(anyhow!("unknown action {action:?}"));
        }
    }
    Ok(settings)
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_triplet(value: &str, what: &str) -> Result<[f32; 3]> {
    let mut numbers = value.split_whitespace().map(|component| {
        component
            .parse::<f32>()
            .map_err(|err| anyhow!("invalid {what} component {component:?}: {err}"))
    });
    let mut next = || {
        numbers
            .next()
            .unwrap_or_else(|| Err(anyhow!("{what} is missing components")))
    };
    Ok([next()?, next()?, next()?])
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    Ok(Vec3::from_array(parse_triplet(&value, "vector")?))
}

fn parse_color(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    Ok(Vec3::from_array(parse_triplet(&value, "color")?) / 255.0)
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float: {err}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::NamedKey;

    const SAMPLE: &str = r#"
    <scene>
        <object>
            <name>Camera</name>
            <type>camera</type>
            <position>0 2 4</position>
            <rotation>0 90 0</rotation>
            <fov>60</fov>
        </object>
        <object>
            <name>Lamp</name>
            <type>light</type>
            <position>0 5 0</position>
            <color>255 128 0</color>
            <ambient>0.1 0.1 0.1</ambient>
            <attenuation>1 0.09 0.032</attenuation>
        </object>
        <object>
            <name>Box</name>
        </object>
        <settings>
            <move_speed>6</move_speed>
            <max_lights>4</max_lights>
            <bind action="add_light">Enter</bind>
        </settings>
    </scene>
    "#;

    #[test]
    fn parse_scene_populates_objects_and_lights() {
        let scene = Scene::from_xml(SAMPLE).unwrap();
        assert_eq!(scene.objects.len(), 3);
        assert_eq!(scene.meshes().count(), 1);
        assert_eq!(scene.lights.len(), 1);

        let light = scene.lights[0];
        assert_eq!(light.position, Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(light.color, Vec3::new(1.0, 128.0 / 255.0, 0.0));
        assert_eq!(light.ambient, Vec3::splat(0.1));
        assert!((light.attenuation.quadratic - 0.032).abs() < f32::EPSILON);
    }

    #[test]
    fn lights_default_to_standard_falloff() {
        let scene = Scene::from_xml(DEFAULT_SCENE).unwrap();
        assert_eq!(scene.lights.len(), 2);
        assert_eq!(scene.lights[0].attenuation, Attenuation::default());
        assert_eq!(scene.lights[0].ambient, Vec3::splat(0.3));
        assert_eq!(scene.settings, Settings::default());
    }

    #[test]
    fn settings_block_overrides_defaults() {
        let scene = Scene::from_xml(SAMPLE).unwrap();
        assert_eq!(scene.settings.move_speed, 6.0);
        assert_eq!(scene.settings.max_lights, 4);
        assert_eq!(
            scene.settings.bindings.add_light,
            KeyCode::Named(NamedKey::Enter)
        );
    }

    #[test]
    fn camera_object_sets_orientation() {
        let scene = Scene::from_xml(SAMPLE).unwrap();
        let camera = scene.camera();
        assert_eq!(camera.position, Vec3::new(0.0, 2.0, 4.0));
        assert_eq!(camera.fov, 60.0);
        assert_eq!(camera.move_speed, 6.0);
        assert!(camera.forward().abs_diff_eq(Vec3::Z, 1e-6));
    }

    #[test]
    fn settings_fov_applies_unless_camera_overrides() {
        let xml = r#"<scene>
            <object><name>Camera</name><type>camera</type></object>
            <settings><fov>70</fov></settings>
        </scene>"#;
        let scene = Scene::from_xml(xml).unwrap();
        assert_eq!(scene.objects[0].fov, None);
        assert_eq!(scene.camera().fov, 70.0);

        let scene = Scene::from_xml(SAMPLE).unwrap();
        assert_eq!(scene.camera().fov, 60.0);
    }

    #[test]
    fn max_lights_out_of_range_is_rejected() {
        let scene_with = |value: String| {
            Scene::from_xml(&format!(
                "<scene><settings><max_lights>{value}</max_lights></settings></scene>"
            ))
        };
        for value in ["0", "1363", "18446744073709551615"] {
            assert!(scene_with(value.to_string()).is_err(), "{value} was accepted");
        }
        let scene = scene_with(MAX_LIGHTS_LIMIT.to_string()).unwrap();
        assert_eq!(scene.settings.max_lights, MAX_LIGHTS_LIMIT);
    }

    #[test]
    fn missing_name_is_an_error() {
        let bad = "<scene><object><type>mesh</type></object></scene>";
        assert!(Scene::from_xml(bad).is_err());
    }

    #[test]
    fn short_vectors_are_rejected() {
        let bad = "<scene><object><name>A</name><position>1 2</position></object></scene>";
        assert!(Scene::from_xml(bad).is_err());
    }

    #[test]
    fn unknown_binding_action_is_rejected() {
        let bad = r#"<scene><settings><bind action="jump">Space</bind></settings></scene>"#;
        assert!(Scene::from_xml(bad).is_err());
    }
}
