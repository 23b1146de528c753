//! Procedural 2D face whose shape is driven by named parameters.
//!
//! Stands in for a rigged character asset: each rig preset names its
//! controls differently, and the mesh is rebuilt from parameter values every
//! frame.

use std::f32::consts::TAU;

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use super::model::{ParameterDef, ParameterModel, ParameterSet};

/// Vertex data for the face mesh (position + color)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

/// Segments per ellipse
const ELLIPSE_SEGMENTS: usize = 32;

/// Triangles in one mesh: head, two eyes, two brows (2 tris each), lips + mouth interior
const TRIANGLE_COUNT: usize = ELLIPSE_SEGMENTS * 3 + 2 * 2 + ELLIPSE_SEGMENTS * 2;

/// Vertices in one mesh (non-indexed triangle list)
pub const FACE_VERTEX_COUNT: usize = TRIANGLE_COUNT * 3;

const SKIN: [f32; 4] = [0.93, 0.80, 0.70, 1.0];
const EYE: [f32; 4] = [0.12, 0.10, 0.16, 1.0];
const BROW: [f32; 4] = [0.30, 0.20, 0.16, 1.0];
const LIP: [f32; 4] = [0.78, 0.36, 0.42, 1.0];
const MOUTH: [f32; 4] = [0.32, 0.08, 0.12, 1.0];

/// Parameter naming schemes a loaded character might use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RigPreset {
    /// Cubism 3/4 style ids (`ParamMouthOpenY`)
    #[default]
    Cubism3,
    /// Cubism 2 style ids (`PARAM_MOUTH_OPEN_Y`)
    Cubism2,
    /// Mouth opener only; form and brows are absent
    Minimal,
}

impl RigPreset {
    pub fn name(&self) -> &'static str {
        match self {
            RigPreset::Cubism3 => "cubism3",
            RigPreset::Cubism2 => "cubism2",
            RigPreset::Minimal => "minimal",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "cubism3" | "cubism4" => Some(RigPreset::Cubism3),
            "cubism2" => Some(RigPreset::Cubism2),
            "minimal" => Some(RigPreset::Minimal),
            _ => None,
        }
    }

    /// Ids this rig uses for (mouth open, mouth form, left brow, right brow)
    fn control_ids(&self) -> RigIds {
        match self {
            RigPreset::Cubism3 => RigIds {
                mouth_open: "ParamMouthOpenY",
                mouth_form: Some("ParamMouthForm"),
                brow_left: Some("ParamBrowLY"),
                brow_right: Some("ParamBrowRY"),
                extras: &["ParamAngleX", "ParamAngleY", "ParamEyeLOpen", "ParamEyeROpen"],
            },
            RigPreset::Cubism2 => RigIds {
                mouth_open: "PARAM_MOUTH_OPEN_Y",
                mouth_form: Some("PARAM_MOUTH_FORM"),
                brow_left: Some("PARAM_BROW_L_Y"),
                brow_right: Some("PARAM_BROW_R_Y"),
                extras: &["PARAM_ANGLE_X", "PARAM_EYE_L_OPEN", "PARAM_EYE_R_OPEN"],
            },
            RigPreset::Minimal => RigIds {
                mouth_open: "MouthOpen",
                mouth_form: None,
                brow_left: None,
                brow_right: None,
                extras: &[],
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RigIds {
    mouth_open: &'static str,
    mouth_form: Option<&'static str>,
    brow_left: Option<&'static str>,
    brow_right: Option<&'static str>,
    extras: &'static [&'static str],
}

/// The demo character: a parameter set plus the geometry it drives
#[derive(Debug, Clone)]
pub struct FaceModel {
    rig: RigPreset,
    ids: RigIds,
    parameters: ParameterSet,
}

impl FaceModel {
    pub fn new(rig: RigPreset) -> Self {
        let ids = rig.control_ids();

        let mut defs = vec![ParameterDef::new(ids.mouth_open, 0.0, 1.0, 0.0)];
        if let Some(id) = ids.mouth_form {
            defs.push(ParameterDef::new(id, -1.0, 1.0, 0.0));
        }
        for id in [ids.brow_left, ids.brow_right].into_iter().flatten() {
            defs.push(ParameterDef::new(id, -1.0, 1.0, 0.0));
        }
        for id in ids.extras {
            defs.push(ParameterDef::new(*id, -1.0, 1.0, 0.0));
        }

        Self {
            rig,
            ids,
            parameters: ParameterSet::new(defs),
        }
    }

    pub fn rig(&self) -> RigPreset {
        self.rig
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn mouth_open(&self) -> f32 {
        self.parameters.get_or(self.ids.mouth_open, 0.0)
    }

    pub fn mouth_form(&self) -> f32 {
        self.ids
            .mouth_form
            .map(|id| self.parameters.get_or(id, 0.0))
            .unwrap_or(0.0)
    }

    fn brow(&self, id: Option<&'static str>) -> f32 {
        id.map(|id| self.parameters.get_or(id, 0.0)).unwrap_or(0.0)
    }

    /// Rebuild the face mesh from current parameter values
    pub fn build_mesh(&self, vertices: &mut Vec<Vertex>) {
        vertices.clear();

        let open = self.mouth_open();
        let form = self.mouth_form();
        let brow_left = self.brow(self.ids.brow_left);
        let brow_right = self.brow(self.ids.brow_right);

        // Head
        push_ellipse(vertices, Vec2::new(0.0, 0.0), Vec2::new(0.8, 1.0), 0.0, SKIN);

        // Eyes
        let eye_radius = Vec2::new(0.09, 0.12);
        push_ellipse(vertices, Vec2::new(-0.3, 0.2), eye_radius, 0.0, EYE);
        push_ellipse(vertices, Vec2::new(0.3, 0.2), eye_radius, 0.0, EYE);

        // Brows lift with their parameter
        let brow_lift = 0.12;
        let brow_half = Vec2::new(0.16, 0.03);
        push_bar(vertices, Vec2::new(-0.3, 0.42 + brow_left * brow_lift), brow_half, BROW);
        push_bar(vertices, Vec2::new(0.3, 0.42 + brow_right * brow_lift), brow_half, BROW);

        // Mouth: wider and curved up as it smiles, taller as it opens
        let smile = form.max(0.0);
        let mouth_center = Vec2::new(0.0, -0.45);
        let lip_radius = Vec2::new(0.22 + 0.06 * smile, 0.03 + 0.22 * open);
        let curve = 0.08 * smile;
        push_ellipse(vertices, mouth_center, lip_radius + Vec2::splat(0.025), curve, LIP);
        push_ellipse(vertices, mouth_center, lip_radius, curve, MOUTH);
    }
}

impl ParameterModel for FaceModel {
    fn parameter_ids(&self) -> Vec<String> {
        self.parameters.parameter_ids()
    }

    fn set_parameter(&mut self, id: &str, value: f32) {
        self.parameters.set_parameter(id, value);
    }
}

/// Triangle-fan ellipse as a triangle list; `curve` bends the shape upward at the edges
fn push_ellipse(out: &mut Vec<Vertex>, center: Vec2, radius: Vec2, curve: f32, color: [f32; 4]) {
    let point = |i: usize| {
        let angle = TAU * i as f32 / ELLIPSE_SEGMENTS as f32;
        let x = angle.cos();
        let offset = Vec2::new(x * radius.x, angle.sin() * radius.y + curve * x * x);
        center + offset
    };

    for i in 0..ELLIPSE_SEGMENTS {
        for p in [center, point(i), point(i + 1)] {
            out.push(Vertex {
                position: p.to_array(),
                color,
            });
        }
    }
}

/// Axis-aligned quad as two triangles
fn push_bar(out: &mut Vec<Vertex>, center: Vec2, half: Vec2, color: [f32; 4]) {
    let corners = [
        center + Vec2::new(-half.x, -half.y),
        center + Vec2::new(half.x, -half.y),
        center + Vec2::new(half.x, half.y),
        center + Vec2::new(-half.x, half.y),
    ];
    for i in [0, 1, 2, 0, 2, 3] {
        out.push(Vertex {
            position: corners[i].to_array(),
            color,
        });
    }
}

/// Height of the mouth interior for a given mesh (diagnostics and tests)
pub fn mouth_height(vertices: &[Vertex]) -> f32 {
    let mouth: Vec<f32> = vertices
        .iter()
        .filter(|v| v.color == MOUTH)
        .map(|v| v.position[1])
        .collect();
    let top = mouth.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let bottom = mouth.iter().copied().fold(f32::INFINITY, f32::min);
    if mouth.is_empty() {
        0.0
    } else {
        top - bottom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_count_is_constant() {
        let mut model = FaceModel::new(RigPreset::Cubism3);
        let mut vertices = Vec::new();

        model.build_mesh(&mut vertices);
        assert_eq!(vertices.len(), FACE_VERTEX_COUNT);

        model.set_parameter("ParamMouthOpenY", 1.0);
        model.build_mesh(&mut vertices);
        assert_eq!(vertices.len(), FACE_VERTEX_COUNT);
    }

    #[test]
    fn test_mouth_opens_with_parameter() {
        let mut model = FaceModel::new(RigPreset::Cubism2);
        let mut vertices = Vec::new();

        model.build_mesh(&mut vertices);
        let closed = mouth_height(&vertices);

        model.set_parameter("PARAM_MOUTH_OPEN_Y", 1.0);
        model.build_mesh(&mut vertices);
        assert!(mouth_height(&vertices) > closed + 0.3);
    }

    #[test]
    fn test_rig_vocabularies_differ() {
        let cubism3 = FaceModel::new(RigPreset::Cubism3).parameter_ids();
        let cubism2 = FaceModel::new(RigPreset::Cubism2).parameter_ids();
        let minimal = FaceModel::new(RigPreset::Minimal).parameter_ids();

        assert!(cubism3.contains(&"ParamMouthForm".to_string()));
        assert!(!cubism2.contains(&"ParamMouthForm".to_string()));
        assert_eq!(minimal, vec!["MouthOpen".to_string()]);
    }

    #[test]
    fn test_minimal_rig_ignores_missing_controls() {
        let mut model = FaceModel::new(RigPreset::Minimal);
        model.set_parameter("ParamBrowLY", 1.0);
        assert_eq!(model.mouth_form(), 0.0);
        assert_eq!(model.parameters().len(), 1);
    }

    #[test]
    fn test_rig_names_round_trip() {
        for rig in [RigPreset::Cubism3, RigPreset::Cubism2, RigPreset::Minimal] {
            assert_eq!(RigPreset::from_name(rig.name()), Some(rig));
            assert_eq!(FaceModel::new(rig).rig(), rig);
        }
        assert_eq!(RigPreset::from_name("unknown"), None);
    }
}
