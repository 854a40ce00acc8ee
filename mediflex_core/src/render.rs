//! Text rendering of service results.
//!
//! Every function returns a `String` so the CLI decides where it goes. Colour
//! is opt-in through [`Theme`]; with colour off the output is plain text and
//! is what the tests compare against.

use crate::analysis::{login_redirect, Outcome};
use crate::app::AppState;
use crate::config::ServiceConfig;
use crate::dosage::estimate_dosage;
use crate::service::{interpret_confirmed, Reply, PREDICT_REDIRECT_DELAY};
use crate::{
    AllergyReport, DosageGuidance, EmergencyContacts, InteractionReport, Notice, NoticeKind,
    Prediction, Recommendation, SeverityAssessment,
};
use std::fmt::Write;

/// Shown when a prediction has no medicines and no message of its own
pub const NO_RECOMMENDATION_FALLBACK: &str =
    "Please consult a healthcare professional for proper diagnosis and treatment.";

/// Shown instead of results when a body cannot be parsed
pub const MALFORMED_RESPONSE: &str = "Error processing response.";

// ============================================================================
// Theme
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tone {
    Success,
    Warning,
    Danger,
    Info,
    Muted,
    Heading,
}

/// Output styling: ANSI colour on or off, light or dark palette
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Theme {
    pub color: bool,
    pub dark: bool,
}

impl Theme {
    pub fn plain() -> Self {
        Self::default()
    }

    /// Palette follows the state's dark-mode flag
    pub fn for_state(state: &AppState, color: bool) -> Self {
        Self {
            color,
            dark: state.dark_mode,
        }
    }

    fn code(&self, tone: Tone) -> &'static str {
        match (self.dark, tone) {
            (false, Tone::Success) => "32",
            (false, Tone::Warning) => "33",
            (false, Tone::Danger) => "31",
            (false, Tone::Info) => "34",
            (false, Tone::Muted) => "2",
            (false, Tone::Heading) => "1",
            (true, Tone::Success) => "92",
            (true, Tone::Warning) => "93",
            (true, Tone::Danger) => "91",
            (true, Tone::Info) => "96",
            (true, Tone::Muted) => "90",
            (true, Tone::Heading) => "1;97",
        }
    }

    fn paint(&self, tone: Tone, text: &str) -> String {
        if self.color {
            format!("\x1b[{}m{}\x1b[0m", self.code(tone), text)
        } else {
            text.to_string()
        }
    }
}

// ============================================================================
// Confidence
// ============================================================================

/// Confidence band of a recommendation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    /// `>= 90` high, `>= 70` medium, anything else (NaN included) low
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 90.0 {
            ConfidenceTier::High
        } else if confidence >= 70.0 {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceTier::High => "high",
            ConfidenceTier::Medium => "medium",
            ConfidenceTier::Low => "low",
        }
    }

    fn tone(&self) -> Tone {
        match self {
            ConfidenceTier::High => Tone::Success,
            ConfidenceTier::Medium => Tone::Warning,
            ConfidenceTier::Low => Tone::Danger,
        }
    }
}

/// Confidence with one decimal, exact ties rounded away from zero
///
/// `{:.1}` alone rounds ties to even. The only binary values sitting exactly
/// on a `.x5` tie end in `.25` or `.75`.
pub fn format_confidence(confidence: f64) -> String {
    let quarters = confidence * 4.0;
    if quarters.fract() == 0.0 && quarters.abs() % 2.0 == 1.0 {
        return format!("{:.1}", confidence + confidence.signum() * 0.05);
    }
    format!("{:.1}", confidence)
}

// ============================================================================
// Results
// ============================================================================

/// Severity badge: uppercased severity plus the urgency text
pub fn render_severity(severity: &SeverityAssessment, theme: Theme) -> String {
    let tone = match severity.color.as_str() {
        "danger" => Tone::Danger,
        "warning" => Tone::Warning,
        "success" => Tone::Success,
        _ => Tone::Info,
    };
    let badge = format!("Severity: {}", severity.severity.to_uppercase());
    let mut out = theme.paint(tone, &badge);
    if !severity.urgency.is_empty() {
        let _ = write!(out, "\n  {}", severity.urgency);
    }
    out.push('\n');
    out
}

/// Full results view for one prediction
///
/// Expansion and patient inputs come from `state`, so the dosage plan shown in
/// each expanded card always reflects the current form values.
pub fn render_results(
    state: &AppState,
    prediction: &Prediction,
    severity: Option<&SeverityAssessment>,
    theme: Theme,
) -> String {
    let mut out = String::new();

    if let Some(severity) = severity {
        out.push_str(&render_severity(severity, theme));
        out.push('\n');
    }

    if let Some(analyzed) = prediction.symptoms_analyzed.as_deref() {
        let _ = writeln!(out, "Based on symptoms: {}\n", analyzed);
    }

    if prediction.medicines.is_empty() {
        let message = prediction
            .message
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(NO_RECOMMENDATION_FALLBACK);
        let _ = writeln!(
            out,
            "{}",
            theme.paint(Tone::Info, "ℹ No Specific Recommendation")
        );
        let _ = writeln!(out, "  {}", message);
        return out;
    }

    for (index, recommendation) in prediction.medicines.iter().enumerate() {
        out.push_str(&render_card(state, index, recommendation, theme));
    }
    out
}

/// One medicine card; the body is only drawn when the card is expanded
pub fn render_card(
    state: &AppState,
    index: usize,
    recommendation: &Recommendation,
    theme: Theme,
) -> String {
    let info = &recommendation.info;
    let expanded = state.is_expanded(index);
    let tier = ConfidenceTier::from_confidence(recommendation.confidence);
    let mut out = String::new();

    let marker = if expanded { "▾" } else { "▸" };
    let title = format!("{} {}. {}", marker, index + 1, recommendation.title());
    let _ = writeln!(out, "{}", theme.paint(Tone::Heading, &title));
    let _ = writeln!(
        out,
        "   Confidence: {}",
        theme.paint(
            tier.tone(),
            &format!(
                "{}% ({})",
                format_confidence(recommendation.confidence),
                tier.label()
            )
        )
    );
    if let Some(category) = info.category.as_deref() {
        let _ = writeln!(out, "   Category: {}", category);
    }

    if expanded {
        let plan = estimate_dosage(info, &state.patient);

        if let Some(warning) = plan.age_warning.as_deref() {
            let _ = writeln!(out, "   {}", theme.paint(Tone::Warning, &format!("⚠ {}", warning)));
        }
        if let Some(usage) = info.usage.as_deref() {
            let _ = writeln!(out, "   Usage: {}", usage);
        }

        let _ = writeln!(out, "   Personalized Dosage Plan:");
        let _ = writeln!(out, "     Dosage:    {}", plan.dosage);
        let _ = writeln!(out, "     Frequency: {}", plan.frequency);
        let _ = writeln!(out, "     Duration:  {}", plan.duration);
        let _ = writeln!(out, "     Total:     {} tablets", plan.total_tablets);

        if !info.precautions.is_empty() {
            let _ = writeln!(out, "   Precautions:");
            for precaution in &info.precautions {
                let _ = writeln!(out, "     • {}", precaution);
            }
        }
        if !info.side_effects.is_empty() {
            let _ = writeln!(out, "   Possible Side Effects:");
            for effect in &info.side_effects {
                let _ = writeln!(out, "     • {}", theme.paint(Tone::Muted, effect));
            }
        }
    }

    out.push('\n');
    out
}

/// Parse a raw `/predict` body, envelope included
pub fn parse_prediction_body(body: &str) -> crate::Result<Reply<Prediction>> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| crate::Error::MalformedResponse(e.to_string()))?;
    interpret_confirmed(value)
}

/// Render a raw `/predict` body
///
/// A body that is not a usable prediction becomes an error notice, and a
/// `require_login` body becomes a redirect to the login page.
pub fn render_response_body(
    state: &AppState,
    body: &str,
    severity: Option<&SeverityAssessment>,
    theme: Theme,
    service: &ServiceConfig,
) -> Outcome<String> {
    match parse_prediction_body(body) {
        Ok(Reply::Ok(prediction)) => {
            Outcome::Done(render_results(state, &prediction, severity, theme))
        }
        Ok(Reply::LoginRequired { message }) => {
            Outcome::Redirect(login_redirect(message, service, PREDICT_REDIRECT_DELAY))
        }
        Ok(Reply::Failed { error }) => Outcome::Notice(Notice::error(error)),
        Err(e) => {
            tracing::warn!("Could not render response body: {}", e);
            Outcome::Notice(Notice::error(MALFORMED_RESPONSE))
        }
    }
}

// ============================================================================
// Safety panels
// ============================================================================

/// Allergy warning panel, or `None` when the report has no conflicts
pub fn render_allergy_conflicts(report: &AllergyReport, theme: Theme) -> Option<String> {
    if !report.has_conflicts || report.conflicts.is_empty() {
        return None;
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", theme.paint(Tone::Danger, "⚠ Allergy Alert"));
    for conflict in &report.conflicts {
        let _ = writeln!(out, "  {}: {}", conflict.medicine, conflict.warning);
    }
    Some(out)
}

/// Panel class for an interaction severity
pub fn interaction_class(severity: &str) -> &'static str {
    match severity {
        "severe" => "danger",
        "moderate" => "warning",
        _ => "info",
    }
}

/// Drug interaction panel, or `None` when there are no interactions
pub fn render_interactions(report: &InteractionReport, theme: Theme) -> Option<String> {
    if report.interactions.is_empty() {
        return None;
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        theme.paint(Tone::Warning, "⚠ Drug Interactions Detected")
    );
    for interaction in &report.interactions {
        let tone = match interaction_class(&interaction.severity) {
            "danger" => Tone::Danger,
            "warning" => Tone::Warning,
            _ => Tone::Info,
        };
        let badge = format!("[{}]", interaction.severity.to_uppercase());
        let _ = writeln!(
            out,
            "  {} {}: {}",
            theme.paint(tone, &badge),
            interaction.medicines.join(" + "),
            interaction.warning
        );
        if !interaction.recommendation.is_empty() {
            let _ = writeln!(out, "    Recommendation: {}", interaction.recommendation);
        }
    }
    Some(out)
}

// ============================================================================
// Auxiliary views
// ============================================================================

pub fn render_dosage_guidance(guidance: &DosageGuidance, theme: Theme) -> String {
    let mut out = String::new();
    let heading = format!("Dosage for {}", guidance.medicine);
    let _ = writeln!(out, "{}", theme.paint(Tone::Heading, &heading));
    let _ = writeln!(out, "  Recommendation: {}", guidance.recommendation);
    if let Some(note) = guidance.note.as_deref() {
        let _ = writeln!(out, "  Note: {}", note);
    }
    if let Some(group) = guidance.age_group.as_deref() {
        let _ = writeln!(out, "  Age group: {}", group);
    }
    out
}

pub fn render_contacts(contacts: &EmergencyContacts, theme: Theme) -> String {
    let rows = [
        ("Ambulance", &contacts.ambulance),
        ("Police", &contacts.police),
        ("Fire", &contacts.fire),
        ("Poison Control", &contacts.poison_control),
        ("Mental Health", &contacts.mental_health),
        ("COVID Helpline", &contacts.covid_helpline),
    ];

    let mut out = String::new();
    let _ = writeln!(out, "{}", theme.paint(Tone::Danger, "Emergency Contacts"));
    for (label, number) in rows {
        let _ = writeln!(out, "  {:<15} {}", format!("{}:", label), number);
    }
    out
}

pub fn render_notice(notice: &Notice, theme: Theme) -> String {
    let tone = match notice.kind {
        NoticeKind::Success => Tone::Success,
        NoticeKind::Error => Tone::Danger,
        NoticeKind::Warning => Tone::Warning,
        NoticeKind::Info => Tone::Info,
    };
    format!("{}\n", theme.paint(tone, &notice.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AllergyConflict, Interaction, MedicineInfo, PatientInputs};
    use serde_json::json;

    fn paracetamol(confidence: f64) -> Recommendation {
        Recommendation {
            name: "paracetamol".into(),
            confidence,
            info: MedicineInfo {
                name: Some("Paracetamol".into()),
                category: Some("Analgesic".into()),
                usage: Some("Fever and mild pain".into()),
                dosage: Some("500mg every 6 hours".into()),
                precautions: vec!["Do not exceed 4g per day".into()],
                side_effects: vec!["Nausea".into()],
            },
        }
    }

    #[test]
    fn test_confidence_tier_boundaries() {
        assert_eq!(ConfidenceTier::from_confidence(90.0), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from_confidence(89.9), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::from_confidence(70.0), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::from_confidence(69.9), ConfidenceTier::Low);
        assert_eq!(ConfidenceTier::from_confidence(f64::NAN), ConfidenceTier::Low);
    }

    #[test]
    fn test_confidence_ties_round_up() {
        assert_eq!(format_confidence(91.25), "91.3");
        assert_eq!(format_confidence(0.25), "0.3");
        assert_eq!(format_confidence(88.75), "88.8");
        assert_eq!(format_confidence(72.0), "72.0");
        assert_eq!(format_confidence(95.34), "95.3");
        assert_eq!(format_confidence(99.96), "100.0");
    }

    #[test]
    fn test_empty_prediction_uses_fallback() {
        let state = AppState::default();
        let out = render_results(&state, &Prediction::default(), None, Theme::plain());

        assert!(out.contains("No Specific Recommendation"));
        assert!(out.contains(NO_RECOMMENDATION_FALLBACK));
        assert!(!out.contains("Based on symptoms"));
    }

    #[test]
    fn test_empty_prediction_prefers_service_message() {
        let prediction = Prediction {
            message: Some("Symptoms unclear".into()),
            ..Default::default()
        };
        let out = render_results(&AppState::default(), &prediction, None, Theme::plain());
        assert!(out.contains("Symptoms unclear"));
        assert!(!out.contains(NO_RECOMMENDATION_FALLBACK));
    }

    #[test]
    fn test_collapsed_card_hides_body() {
        let state = AppState::default();
        let out = render_card(&state, 0, &paracetamol(95.3), Theme::plain());

        assert!(out.contains("▸ 1. Paracetamol"));
        assert!(out.contains("Confidence: 95.3% (high)"));
        assert!(out.contains("Category: Analgesic"));
        assert!(!out.contains("Personalized Dosage Plan"));
    }

    #[test]
    fn test_expanded_card_uses_current_patient_inputs() {
        let mut state = AppState::new("fever", PatientInputs::new(Some("10"), None, None));
        state.set_recommendations(vec![paracetamol(80.0)]);
        state.toggle_card(0);

        let out = render_card(&state, 0, &state.recommendations[0], Theme::plain());
        assert!(out.contains("▾ 1. Paracetamol"));
        assert!(out.contains("⚠ Pediatric dose required"));
        assert!(out.contains("Dosage:    250mg every 6 hours"));
        assert!(out.contains("Three times daily (every 6-8 hours)"));
        assert!(out.contains("Total:     15 tablets"));
        assert!(out.contains("• Do not exceed 4g per day"));
        assert!(out.contains("Possible Side Effects:"));

        state.patient = PatientInputs::new(Some("30"), None, None);
        let out = render_card(&state, 0, &state.recommendations[0], Theme::plain());
        assert!(out.contains("Dosage:    500mg every 6 hours"));
        assert!(!out.contains("Pediatric"));
    }

    #[test]
    fn test_results_include_severity_and_symptoms() {
        let prediction = Prediction {
            symptoms_analyzed: Some("fever, headache".into()),
            medicines: vec![paracetamol(72.0)],
            message: None,
        };
        let severity = SeverityAssessment {
            severity: "mild".into(),
            color: "success".into(),
            urgency: "Self-care recommended".into(),
        };
        let out = render_results(&AppState::default(), &prediction, Some(&severity), Theme::plain());

        assert!(out.starts_with("Severity: MILD\n  Self-care recommended\n"));
        assert!(out.contains("Based on symptoms: fever, headache"));
        assert!(out.contains("(medium)"));
    }

    fn render_body(body: &str) -> Outcome<String> {
        render_response_body(
            &AppState::default(),
            body,
            None,
            Theme::plain(),
            &ServiceConfig::default(),
        )
    }

    #[test]
    fn test_malformed_body_renders_error_panel() {
        let malformed = Outcome::Notice(Notice::error(MALFORMED_RESPONSE));
        assert_eq!(render_body("<html>oops"), malformed);
        assert_eq!(render_body(r#"{"success": true, "medicines": 3}"#), malformed);
    }

    #[test]
    fn test_body_with_failure_envelope() {
        let body = json!({"success": false, "error": "Model not loaded"}).to_string();
        assert_eq!(render_body(&body), Outcome::Notice(Notice::error("Model not loaded")));

        // No success flag at all
        assert_eq!(
            render_body(r#"{"medicines": []}"#),
            Outcome::Notice(Notice::error("An error occurred"))
        );
    }

    #[test]
    fn test_login_required_body_redirects_to_login() {
        let body = json!({
            "success": false,
            "require_login": true,
            "error": "Please login to get medicine recommendations."
        })
        .to_string();

        match render_body(&body) {
            Outcome::Redirect(redirect) => {
                assert_eq!(redirect.target, "/auth/login?redirect=%2F");
                assert_eq!(redirect.delay, PREDICT_REDIRECT_DELAY);
                assert_eq!(redirect.message, "Please login to get medicine recommendations.");
            }
            other => panic!("expected redirect, got {:?}", other),
        }
    }

    #[test]
    fn test_successful_body_renders_results() {
        let body = json!({
            "success": true,
            "symptoms_analyzed": "fever",
            "medicines": [{"name": "paracetamol", "confidence": 93.0, "info": {}}]
        })
        .to_string();

        match render_body(&body) {
            Outcome::Done(out) => {
                assert!(out.contains("Based on symptoms: fever"));
                assert!(out.contains("▸ 1. paracetamol"));
            }
            other => panic!("expected results, got {:?}", other),
        }
    }

    #[test]
    fn test_allergy_panel() {
        let report = AllergyReport {
            has_conflicts: true,
            conflicts: vec![AllergyConflict {
                medicine: "Aspirin".into(),
                allergy: Some("nsaids".into()),
                warning: "Contains NSAID".into(),
            }],
        };
        let out = render_allergy_conflicts(&report, Theme::plain()).unwrap();
        assert!(out.contains("Aspirin: Contains NSAID"));

        assert!(render_allergy_conflicts(&AllergyReport::default(), Theme::plain()).is_none());
    }

    #[test]
    fn test_interaction_panel() {
        assert_eq!(interaction_class("severe"), "danger");
        assert_eq!(interaction_class("moderate"), "warning");
        assert_eq!(interaction_class("mild"), "info");

        let report = InteractionReport {
            interactions: vec![Interaction {
                medicines: vec!["Warfarin".into(), "Aspirin".into()],
                severity: "severe".into(),
                warning: "Increased bleeding risk".into(),
                recommendation: "Avoid combination".into(),
            }],
        };
        let out = render_interactions(&report, Theme::plain()).unwrap();
        assert!(out.contains("[SEVERE] Warfarin + Aspirin: Increased bleeding risk"));
        assert!(out.contains("Recommendation: Avoid combination"));
    }

    #[test]
    fn test_colour_only_when_enabled() {
        let notice = Notice::success("Login Successful!");
        assert!(!render_notice(&notice, Theme::plain()).contains('\x1b'));

        let light = render_notice(&notice, Theme { color: true, dark: false });
        let dark = render_notice(&notice, Theme { color: true, dark: true });
        assert!(light.contains("\x1b[32m"));
        assert!(dark.contains("\x1b[92m"));
    }

    #[test]
    fn test_theme_follows_state_dark_mode() {
        let mut state = AppState::default();
        assert_eq!(Theme::for_state(&state, true), Theme { color: true, dark: false });

        state.dark_mode = true;
        let theme = Theme::for_state(&state, true);
        assert!(theme.dark);
        let out = render_results(&state, &Prediction::default(), None, theme);
        assert!(out.contains("\x1b[96m"));
    }

    #[test]
    fn test_contacts_rows() {
        let contacts = EmergencyContacts {
            ambulance: "108".into(),
            covid_helpline: "1075".into(),
            ..Default::default()
        };
        let out = render_contacts(&contacts, Theme::plain());
        assert!(out.contains("Ambulance:      108"));
        assert!(out.contains("COVID Helpline: 1075"));
    }
}
