//! Application state shared by rendering, analysis, and export.

use crate::{PatientInputs, Recommendation};
use std::collections::BTreeSet;

/// Everything the result views read, owned in one place
///
/// There is a single writer (the analysis workflow or the CLI command that
/// owns the value); renderers and the exporter borrow it.
#[derive(Clone, Debug, Default)]
pub struct AppState {
    /// Symptom text as entered
    pub symptoms: String,
    /// Current age/weight/allergy form values
    pub patient: PatientInputs,
    /// Medicines from the latest successful prediction, in service order
    pub recommendations: Vec<Recommendation>,
    pub dark_mode: bool,
    expanded: BTreeSet<usize>,
}

impl AppState {
    pub fn new(symptoms: impl Into<String>, patient: PatientInputs) -> Self {
        Self {
            symptoms: symptoms.into(),
            patient,
            ..Default::default()
        }
    }

    /// Replace the current recommendations; every card starts collapsed
    pub fn set_recommendations(&mut self, recommendations: Vec<Recommendation>) {
        self.recommendations = recommendations;
        self.expanded.clear();
    }

    /// Flip one card between collapsed and expanded; returns the new state
    pub fn toggle_card(&mut self, index: usize) -> bool {
        if !self.expanded.remove(&index) {
            self.expanded.insert(index);
            true
        } else {
            false
        }
    }

    pub fn is_expanded(&self, index: usize) -> bool {
        self.expanded.contains(&index)
    }

    pub fn expand_all(&mut self) {
        self.expanded = (0..self.recommendations.len()).collect();
    }
}
