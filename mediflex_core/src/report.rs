//! Plain-text consultation report.

use crate::app::AppState;
use crate::dosage::estimate_dosage;
use crate::render::format_confidence;
use crate::{Notice, PatientInputs, Recommendation, Result, UserProfile};
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const NOT_SPECIFIED: &str = "Not specified";

const CLOSING_NOTES: &str = "IMPORTANT NOTES:
- This prescription is personalized based on provided age and weight
- Take medicines exactly as prescribed
- Complete the full course even if you feel better
- Store medicines in a cool, dry place

DISCLAIMER: This is an AI-based recommendation. Please consult a
qualified healthcare professional before taking any medication.
Always inform your doctor about existing medical conditions and allergies.
";

/// Build the report text
///
/// Each medicine gets its dosage plan recomputed from `patient`.
pub fn export_report(
    recommendations: &[Recommendation],
    patient: &PatientInputs,
    symptoms: &str,
    generated_at: DateTime<Local>,
) -> String {
    let mut report = String::new();
    let _ = writeln!(report, "MEDIFLEX - PERSONALIZED CONSULTATION REPORT");
    let _ = writeln!(report, "{}\n", "=".repeat(70));
    let _ = writeln!(report, "Date: {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(report, "Symptoms: {}", symptoms);
    if let Some(age) = patient.age.as_deref() {
        let _ = writeln!(report, "Patient Age: {} years", age);
    }
    if let Some(weight) = patient.weight.as_deref() {
        let _ = writeln!(report, "Patient Weight: {} kg", weight);
    }
    report.push('\n');
    let _ = writeln!(report, "RECOMMENDED MEDICINES:");
    let _ = writeln!(report, "{}\n", "-".repeat(70));

    for (idx, med) in recommendations.iter().enumerate() {
        let info = &med.info;
        let plan = estimate_dosage(info, patient);

        let _ = writeln!(report, "{}. {}", idx + 1, med.title());
        let _ = writeln!(report, "   Confidence: {}%", format_confidence(med.confidence));
        let _ = writeln!(
            report,
            "   Category: {}",
            info.category.as_deref().unwrap_or(NOT_SPECIFIED)
        );
        let _ = writeln!(
            report,
            "   Usage: {}",
            info.usage.as_deref().unwrap_or(NOT_SPECIFIED)
        );
        let _ = writeln!(report, "   Dosage: {}", plan.dosage);
        let _ = writeln!(report, "   Duration: {}", plan.duration);
        let _ = writeln!(report, "   Frequency: {}", plan.frequency);
        let _ = writeln!(report, "   Total Tablets Needed: {} tablets", plan.total_tablets);
        let _ = writeln!(report, "   Precautions:");
        for precaution in &info.precautions {
            let _ = writeln!(report, "   - {}", precaution);
        }
        if let Some(warning) = plan.age_warning.as_deref() {
            let _ = writeln!(report, "   ⚠️  AGE WARNING: {}", warning);
        }
        report.push('\n');
    }

    let _ = writeln!(report, "\n{}", "=".repeat(70));
    report.push_str(CLOSING_NOTES);
    report
}

/// `MediFlex_Prescription_<epoch-ms>.txt`
pub fn report_file_name(epoch_ms: i64) -> String {
    format!("MediFlex_Prescription_{}.txt", epoch_ms)
}

/// Write `report` into `dir` atomically and return its path
pub fn write_report(dir: &Path, report: &str, epoch_ms: i64) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(report_file_name(epoch_ms));

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(report.as_bytes())?;
    temp.flush()?;
    temp.persist(&path).map_err(|e| e.error)?;

    tracing::info!("Wrote report to {:?}", path);
    Ok(path)
}

/// Result of exporting the current recommendations
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    NothingToExport,
    Written(PathBuf),
}

impl ExportOutcome {
    pub fn notice(&self) -> Notice {
        match self {
            ExportOutcome::NothingToExport => Notice::warning("No recommendations to export"),
            ExportOutcome::Written(_) => {
                Notice::success("Personalized prescription downloaded successfully!")
            }
        }
    }
}

/// Export the state's recommendations, preferring profile age/weight over
/// the form values
pub fn export_state(
    state: &AppState,
    profile: Option<&UserProfile>,
    dir: &Path,
    now: DateTime<Local>,
) -> Result<ExportOutcome> {
    if state.recommendations.is_empty() {
        return Ok(ExportOutcome::NothingToExport);
    }

    let patient = state.patient.preferring_profile(profile);
    let report = export_report(&state.recommendations, &patient, &state.symptoms, now);
    let path = write_report(dir, &report, now.timestamp_millis())?;
    Ok(ExportOutcome::Written(path))
}
