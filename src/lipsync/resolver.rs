//! Mapping of smoothed openness onto a model's control parameters.
//!
//! Character assets do not agree on control names, so each semantic control
//! carries an ordered list of candidate ids. The list is resolved once per
//! model against the ids it actually exposes; every present candidate is then
//! written each frame.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::avatar::ParameterModel;
use crate::params::PoseTuning;

/// Semantic facial control written by the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceControl {
    MouthOpen,
    MouthForm,
    BrowLeftY,
    BrowRightY,
}

impl FaceControl {
    pub const ALL: [FaceControl; 4] = [
        FaceControl::MouthOpen,
        FaceControl::MouthForm,
        FaceControl::BrowLeftY,
        FaceControl::BrowRightY,
    ];
}

/// Values for one frame, derived from openness
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MouthPose {
    /// Mouth opening in [0, 1]
    pub openness: f32,
    /// 0 = open/round shape, 1 = smile
    pub form: f32,
    /// Symmetric brow raise
    pub brow: f32,
}

impl MouthPose {
    pub fn from_openness(openness: f32, tuning: &PoseTuning) -> Self {
        let openness = openness.clamp(0.0, 1.0);
        let form = if openness > tuning.open_form_threshold {
            0.0
        } else {
            (1.0 - openness * tuning.smile_slope).max(0.0)
        };

        Self {
            openness,
            form,
            brow: openness * tuning.brow_scale,
        }
    }

    pub fn value(&self, control: FaceControl) -> f32 {
        match control {
            FaceControl::MouthOpen => self.openness,
            FaceControl::MouthForm => self.form,
            FaceControl::BrowLeftY | FaceControl::BrowRightY => self.brow,
        }
    }
}

/// Semantic control -> candidate ids, in preference order
#[derive(Debug, Clone)]
pub struct ControlTable {
    entries: Vec<(FaceControl, Vec<String>)>,
}

impl Default for ControlTable {
    /// Cubism 3/4, Cubism 2 and plain naming schemes
    fn default() -> Self {
        Self::new(vec![
            (
                FaceControl::MouthOpen,
                vec!["ParamMouthOpenY", "PARAM_MOUTH_OPEN_Y", "MouthOpen"],
            ),
            (
                FaceControl::MouthForm,
                vec!["ParamMouthForm", "PARAM_MOUTH_FORM", "MouthForm"],
            ),
            (
                FaceControl::BrowLeftY,
                vec!["ParamBrowLY", "PARAM_BROW_L_Y", "BrowLY"],
            ),
            (
                FaceControl::BrowRightY,
                vec!["ParamBrowRY", "PARAM_BROW_R_Y", "BrowRY"],
            ),
        ])
    }
}

impl ControlTable {
    pub fn new(entries: Vec<(FaceControl, Vec<&str>)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(control, ids)| (control, ids.into_iter().map(String::from).collect()))
                .collect(),
        }
    }

    /// Candidate ids for `control`
    pub fn candidates(&self, control: FaceControl) -> &[String] {
        self.entries
            .iter()
            .find(|(c, _)| *c == control)
            .map(|(_, ids)| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Keep only the candidates `available` contains.
    ///
    /// An empty `available` means the model cannot enumerate; every candidate
    /// is kept and left to the model to ignore.
    pub fn resolve(&self, available: &[String]) -> Vec<Binding> {
        let blind = available.is_empty();
        let present: HashSet<&str> = available.iter().map(String::as_str).collect();

        self.entries
            .iter()
            .map(|(control, ids)| Binding {
                control: *control,
                ids: ids
                    .iter()
                    .filter(|id| blind || present.contains(id.as_str()))
                    .cloned()
                    .collect(),
            })
            .collect()
    }
}

/// Ids resolved for one semantic control
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub control: FaceControl,
    pub ids: Vec<String>,
}

/// Writes poses onto one model, resolving its vocabulary on first use
#[derive(Debug, Default)]
pub struct ParameterResolver {
    table: ControlTable,
    bindings: Option<Vec<Binding>>,
}

impl ParameterResolver {
    pub fn new(table: ControlTable) -> Self {
        Self {
            table,
            bindings: None,
        }
    }

    /// Whether the current model has been enumerated
    pub fn is_bound(&self) -> bool {
        self.bindings.is_some()
    }

    /// Forget the cached bindings; the next apply enumerates again
    pub fn unbind(&mut self) {
        self.bindings = None;
    }

    pub fn bindings(&self) -> Option<&[Binding]> {
        self.bindings.as_deref()
    }

    fn bind(&mut self, model: &dyn ParameterModel) -> &[Binding] {
        self.bindings.get_or_insert_with(|| {
            let available = model.parameter_ids();
            if available.is_empty() {
                info!("Model does not enumerate parameters, trying every known name");
            } else {
                info!(
                    count = available.len(),
                    "Model parameters: {}",
                    available.join(", ")
                );
            }

            let bindings = self.table.resolve(&available);
            for binding in &bindings {
                if binding.ids.is_empty() {
                    debug!(control = ?binding.control, "No matching parameter, control skipped");
                } else {
                    debug!(control = ?binding.control, ids = ?binding.ids, "Control bound");
                }
            }
            bindings
        })
    }

    /// Write `pose` to every bound id
    pub fn apply(&mut self, pose: &MouthPose, model: &mut dyn ParameterModel) {
        let bindings = self.bind(model);
        for binding in bindings {
            let value = pose.value(binding.control);
            for id in &binding.ids {
                model.set_parameter(id, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::{ParameterDef, ParameterSet};
    use std::cell::Cell;
    use std::collections::HashMap;

    /// Model that counts enumerations and records writes
    #[derive(Default)]
    struct ProbeModel {
        ids: Vec<String>,
        enumerations: Cell<usize>,
        writes: HashMap<String, f32>,
    }

    impl ParameterModel for ProbeModel {
        fn parameter_ids(&self) -> Vec<String> {
            self.enumerations.set(self.enumerations.get() + 1);
            self.ids.clone()
        }

        fn set_parameter(&mut self, id: &str, value: f32) {
            self.writes.insert(id.to_string(), value);
        }
    }

    #[test]
    fn test_form_smile_at_low_openness() {
        let tuning = PoseTuning::default();
        let pose = MouthPose::from_openness(0.2, &tuning);
        assert!(pose.form > 0.0);
        assert!((pose.form - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_form_open_at_high_openness() {
        let tuning = PoseTuning::default();
        assert_eq!(MouthPose::from_openness(0.8, &tuning).form, 0.0);

        // The threshold itself still carries some smile; just above it does not
        assert!((MouthPose::from_openness(0.5, &tuning).form - 0.25).abs() < 1e-6);
        assert_eq!(MouthPose::from_openness(0.51, &tuning).form, 0.0);
    }

    #[test]
    fn test_brow_follows_openness() {
        let pose = MouthPose::from_openness(1.0, &PoseTuning::default());
        assert!((pose.brow - 0.3).abs() < 1e-6);
        assert_eq!(
            pose.value(FaceControl::BrowLeftY),
            pose.value(FaceControl::BrowRightY)
        );
    }

    #[test]
    fn test_missing_ids_do_not_block_others() {
        // Only the mouth opener exists
        let mut model =
            ParameterSet::new(vec![ParameterDef::new("PARAM_MOUTH_OPEN_Y", 0.0, 1.0, 0.0)]);
        let mut resolver = ParameterResolver::default();

        let pose = MouthPose::from_openness(0.8, &PoseTuning::default());
        resolver.apply(&pose, &mut model);
        assert_eq!(model.get("PARAM_MOUTH_OPEN_Y"), Some(0.8));

        let bindings = resolver.bindings().unwrap();
        let form = bindings
            .iter()
            .find(|b| b.control == FaceControl::MouthForm)
            .unwrap();
        assert!(form.ids.is_empty());
    }

    #[test]
    fn test_every_present_variant_written() {
        let mut model = ProbeModel {
            ids: vec![
                "ParamMouthOpenY".to_string(),
                "PARAM_MOUTH_OPEN_Y".to_string(),
                "ParamBrowLY".to_string(),
            ],
            ..Default::default()
        };
        let mut resolver = ParameterResolver::default();
        resolver.apply(&MouthPose::from_openness(0.5, &PoseTuning::default()), &mut model);

        assert_eq!(model.writes.get("ParamMouthOpenY"), Some(&0.5));
        assert_eq!(model.writes.get("PARAM_MOUTH_OPEN_Y"), Some(&0.5));
        assert_eq!(model.writes.get("ParamBrowLY"), Some(&0.15));
        assert!(!model.writes.contains_key("MouthForm"));
    }

    #[test]
    fn test_enumerates_once_per_model() {
        let mut model = ProbeModel {
            ids: vec!["ParamMouthOpenY".to_string()],
            ..Default::default()
        };
        let mut resolver = ParameterResolver::default();
        let pose = MouthPose::default();

        for _ in 0..5 {
            resolver.apply(&pose, &mut model);
        }
        assert_eq!(model.enumerations.get(), 1);

        resolver.unbind();
        resolver.apply(&pose, &mut model);
        assert_eq!(model.enumerations.get(), 2);
    }

    #[test]
    fn test_blind_model_gets_every_candidate() {
        let mut model = ProbeModel::default();
        let mut resolver = ParameterResolver::default();
        resolver.apply(&MouthPose::from_openness(0.3, &PoseTuning::default()), &mut model);

        let table = ControlTable::default();
        let expected: usize = FaceControl::ALL
            .iter()
            .map(|c| table.candidates(*c).len())
            .sum();
        assert_eq!(model.writes.len(), expected);
    }

    #[test]
    fn test_custom_table() {
        let table = ControlTable::new(vec![(FaceControl::MouthOpen, vec!["JawOpen"])]);
        let mut model = ParameterSet::new(vec![ParameterDef::new("JawOpen", 0.0, 1.0, 0.0)]);
        let mut resolver = ParameterResolver::new(table);

        resolver.apply(&MouthPose::from_openness(0.4, &PoseTuning::default()), &mut model);
        assert_eq!(model.get("JawOpen"), Some(0.4));
        assert!(resolver.is_bound());
    }
}
