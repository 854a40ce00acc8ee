//! Core domain types for MediFlex.
//!
//! This module defines:
//! - Accounts and session flags
//! - Medicine information and recommendations as sent by the service
//! - Service payloads (severity, allergy conflicts, interactions, dosage)
//! - Patient inputs and the derived dosage plan
//! - User-facing notices

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Accounts
// ============================================================================

/// A registered account row
///
/// The password is kept as entered. There is no hashing anywhere in the
/// account flow; see [`crate::credentials`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Device-local login flags
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Session {
    #[serde(default)]
    pub logged_in: bool,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Persisted UI preferences
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Preferences {
    #[serde(default)]
    pub dark_mode: bool,
}

// ============================================================================
// Recommendation payloads
// ============================================================================

/// Medicine details supplied by the recommendation service
///
/// The service answers `{}` for medicines it has no details for, so every
/// field is optional.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct MedicineInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub usage: Option<String>,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub precautions: Vec<String>,
    #[serde(default)]
    pub side_effects: Vec<String>,
}

/// One recommended medicine with its model confidence (0-100)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub name: String,
    pub confidence: f64,
    #[serde(default)]
    pub info: MedicineInfo,
}

impl Recommendation {
    /// Display title: the service's full name when present, else the label
    pub fn title(&self) -> &str {
        self.info
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.name)
    }
}

/// Body of a successful `/predict` call
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Prediction {
    #[serde(default)]
    pub symptoms_analyzed: Option<String>,
    #[serde(default)]
    pub medicines: Vec<Recommendation>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of a successful `/assess-severity` call
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeverityAssessment {
    pub severity: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub urgency: String,
}

/// A medicine/allergy clash reported by `/check-allergies`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AllergyConflict {
    pub medicine: String,
    #[serde(default)]
    pub allergy: Option<String>,
    pub warning: String,
}

/// Body of a successful `/check-allergies` call
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AllergyReport {
    #[serde(default)]
    pub has_conflicts: bool,
    #[serde(default)]
    pub conflicts: Vec<AllergyConflict>,
}

/// A pairwise drug interaction reported by `/check-interactions`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interaction {
    pub medicines: Vec<String>,
    pub severity: String,
    pub warning: String,
    #[serde(default)]
    pub recommendation: String,
}

/// Body of a successful `/check-interactions` call
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct InteractionReport {
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

/// Server-side dosage guidance from `/calculate-dosage`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DosageGuidance {
    pub medicine: String,
    pub recommendation: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub age_group: Option<String>,
}

/// Patient profile kept by the service
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct UserProfile {
    #[serde(default)]
    pub age: Option<serde_json::Value>,
    #[serde(default)]
    pub weight: Option<serde_json::Value>,
    #[serde(default)]
    pub allergies: Vec<String>,
}

impl UserProfile {
    /// Age as form text, if the profile has a usable one
    pub fn age_text(&self) -> Option<String> {
        self.age.as_ref().and_then(value_as_text)
    }

    /// Weight as form text, if the profile has a usable one
    pub fn weight_text(&self) -> Option<String> {
        self.weight.as_ref().and_then(value_as_text)
    }
}

/// Profile values arrive as numbers or strings; 0, "" and null count as unset.
fn value_as_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Emergency numbers from `/emergency-contacts`
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct EmergencyContacts {
    #[serde(default)]
    pub ambulance: String,
    #[serde(default)]
    pub police: String,
    #[serde(default)]
    pub fire: String,
    #[serde(default)]
    pub poison_control: String,
    #[serde(default)]
    pub mental_health: String,
    #[serde(default)]
    pub covid_helpline: String,
}

// ============================================================================
// Patient context and dosage plan
// ============================================================================

/// Raw patient form values
///
/// Blank values are normalized to `None` ("not specified").
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatientInputs {
    pub age: Option<String>,
    pub weight: Option<String>,
    pub allergies: Option<String>,
}

impl PatientInputs {
    pub fn new(age: Option<&str>, weight: Option<&str>, allergies: Option<&str>) -> Self {
        Self {
            age: non_blank(age),
            weight: non_blank(weight),
            allergies: non_blank(allergies),
        }
    }

    /// Age in whole years, parsed leniently from the leading digits
    ///
    /// `"42"`, `" 42 "` and `"42 years"` all give 42. Input without leading
    /// digits, or with a minus sign, is treated as not specified. A digit run
    /// too long for `u32` saturates.
    pub fn age_years(&self) -> Option<u32> {
        let text = self.age.as_deref()?.trim_start();
        let text = text.strip_prefix('+').unwrap_or(text);
        let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return None;
        }
        Some(digits.parse().unwrap_or(u32::MAX))
    }

    /// Allergies split on commas, trimmed, blanks dropped
    pub fn allergy_list(&self) -> Vec<String> {
        self.allergies
            .as_deref()
            .map(|a| {
                a.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Fill only the blank fields from the service profile
    pub fn fill_blanks_from(&mut self, profile: &UserProfile) {
        if self.age.is_none() {
            self.age = profile.age_text();
        }
        if self.weight.is_none() {
            self.weight = profile.weight_text();
        }
        if self.allergies.is_none() && !profile.allergies.is_empty() {
            self.allergies = Some(profile.allergies.join(", "));
        }
    }

    /// Profile values take precedence; form values fill what the profile lacks
    pub fn preferring_profile(&self, profile: Option<&UserProfile>) -> PatientInputs {
        let mut merged = self.clone();
        if let Some(profile) = profile {
            if let Some(age) = profile.age_text() {
                merged.age = Some(age);
            }
            if let Some(weight) = profile.weight_text() {
                merged.weight = Some(weight);
            }
        }
        merged
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Personalized dosage for one medicine and one patient context
///
/// Derived on demand by [`crate::dosage::estimate_dosage`]; never stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DosagePlan {
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub total_tablets: u32,
    pub age_warning: Option<String>,
}

// ============================================================================
// History
// ============================================================================

/// A completed symptom analysis, kept in the local history log
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConsultationRecord {
    pub id: Uuid,
    pub symptoms: String,
    pub medicines: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}

impl ConsultationRecord {
    pub fn new(symptoms: &str, medicines: &[Recommendation], recorded_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            symptoms: symptoms.to_string(),
            medicines: medicines.iter().map(|m| m.name.clone()).collect(),
            recorded_at,
        }
    }
}

// ============================================================================
// Notices
// ============================================================================

/// Severity class of a user-facing notice
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
    Warning,
    Info,
}

/// A transient message shown to the user (the CLI prints it)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Warning,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let marker = match self.kind {
            NoticeKind::Success => "✓",
            NoticeKind::Error => "✗",
            NoticeKind::Warning => "!",
            NoticeKind::Info => "ℹ",
        };
        write!(f, "{} {}", marker, self.message)
    }
}
