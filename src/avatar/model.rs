//! Named-parameter model interface and a concrete parameter store.

use std::collections::HashMap;

/// A loaded character whose controls are addressed by string id.
///
/// `set_parameter` must silently ignore ids the model does not have.
pub trait ParameterModel {
    /// Every control id the model exposes; empty if it cannot enumerate them
    fn parameter_ids(&self) -> Vec<String>;

    /// Set one control; unknown ids are a no-op
    fn set_parameter(&mut self, id: &str, value: f32);
}

/// Declared control with its valid range
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDef {
    pub id: String,
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl ParameterDef {
    pub fn new(id: impl Into<String>, min: f32, max: f32, default: f32) -> Self {
        Self {
            id: id.into(),
            min,
            max,
            default: default.clamp(min, max),
        }
    }
}

/// Range-checked parameter values keyed by id
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    defs: Vec<ParameterDef>,
    index: HashMap<String, usize>,
    values: Vec<f32>,
}

impl ParameterSet {
    pub fn new(defs: Vec<ParameterDef>) -> Self {
        let mut set = Self::default();
        for def in defs {
            set.declare(def);
        }
        set
    }

    /// Add a parameter, or replace the definition of an existing id
    pub fn declare(&mut self, def: ParameterDef) {
        match self.index.get(&def.id) {
            Some(&i) => {
                self.values[i] = def.default;
                self.defs[i] = def;
            }
            None => {
                self.index.insert(def.id.clone(), self.defs.len());
                self.values.push(def.default);
                self.defs.push(def);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<f32> {
        self.index.get(id).map(|&i| self.values[i])
    }

    /// Value of `id`, or its fallback when the model lacks it
    pub fn get_or(&self, id: &str, fallback: f32) -> f32 {
        self.get(id).unwrap_or(fallback)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Restore every parameter to its default
    pub fn reset(&mut self) {
        for (value, def) in self.values.iter_mut().zip(&self.defs) {
            *value = def.default;
        }
    }
}

impl ParameterModel for ParameterSet {
    fn parameter_ids(&self) -> Vec<String> {
        self.defs.iter().map(|d| d.id.clone()).collect()
    }

    fn set_parameter(&mut self, id: &str, value: f32) {
        let Some(&i) = self.index.get(id) else {
            return;
        };
        if !value.is_finite() {
            return;
        }
        let def = &self.defs[i];
        self.values[i] = value.clamp(def.min, def.max);
    }
}
