//! The symptom analysis workflow.
//!
//! Calls run one after another on the caller's thread:
//! profile → severity → prediction → allergy check → interaction check.
//! Only the severity and prediction calls can stop the workflow; the later
//! safety checks log their failures and carry on.

use crate::app::AppState;
use crate::config::ServiceConfig;
use crate::history::ConsultationSink;
use crate::service::{
    LoginRedirect, Reply, ServiceClient, Transport, DEFAULT_REDIRECT_DELAY,
    PREDICT_REDIRECT_DELAY, SEVERITY_REDIRECT_DELAY,
};
use crate::render::MALFORMED_RESPONSE;
use crate::{
    AllergyReport, ConsultationRecord, Error, InteractionReport, Notice, Prediction,
    SeverityAssessment, UserProfile,
};
use chrono::Utc;
use std::time::Duration;

pub const NETWORK_ERROR: &str = "Network error. Please try again.";

/// What a service-backed operation ended with
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome<T> {
    Done(T),
    /// Validation or service failure to show the user
    Notice(Notice),
    /// The service asked for a login; follow `target` after `delay`
    Redirect(LoginRedirect),
}

/// Everything a completed analysis produced
#[derive(Clone, Debug, PartialEq)]
pub struct Analysis {
    pub severity: Option<SeverityAssessment>,
    pub prediction: Prediction,
    pub profile: Option<UserProfile>,
    pub allergies: Option<AllergyReport>,
    pub interactions: Option<InteractionReport>,
    /// Raised by a safety check after results were already produced
    pub redirect: Option<LoginRedirect>,
}

/// Run the full analysis for `symptoms`, updating `state` on success
pub fn analyze_symptoms<T: Transport>(
    client: &ServiceClient<T>,
    state: &mut AppState,
    symptoms: &str,
    sink: &mut dyn ConsultationSink,
    service: &ServiceConfig,
) -> Outcome<Analysis> {
    let symptoms = symptoms.trim();
    if symptoms.is_empty() {
        return Outcome::Notice(Notice::error("Please enter symptoms"));
    }
    state.symptoms = symptoms.to_string();

    let profile = match client.user_profile() {
        Ok(Reply::Ok(profile)) => profile,
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("Could not fetch user profile: {}", e);
            None
        }
    };
    if let Some(profile) = profile.as_ref() {
        state.patient.fill_blanks_from(profile);
    }

    let severity = match client.assess_severity(symptoms) {
        Ok(Reply::Ok(severity)) => Some(severity),
        Ok(Reply::LoginRequired { message }) => {
            return Outcome::Redirect(login_redirect(message, service, SEVERITY_REDIRECT_DELAY));
        }
        Ok(Reply::Failed { error }) => {
            tracing::warn!("Severity assessment failed: {}", error);
            None
        }
        Err(e) => {
            tracing::error!("Severity request failed: {}", e);
            return Outcome::Notice(Notice::error(NETWORK_ERROR));
        }
    };

    let prediction = match client.predict(symptoms) {
        Ok(Reply::Ok(prediction)) => prediction,
        Ok(Reply::LoginRequired { message }) => {
            return Outcome::Redirect(login_redirect(message, service, PREDICT_REDIRECT_DELAY));
        }
        Ok(Reply::Failed { error }) => return Outcome::Notice(Notice::error(error)),
        Err(Error::MalformedResponse(detail)) => {
            tracing::error!("Unusable prediction body: {}", detail);
            return Outcome::Notice(Notice::error(MALFORMED_RESPONSE));
        }
        Err(e) => {
            tracing::error!("Prediction request failed: {}", e);
            return Outcome::Notice(Notice::error(NETWORK_ERROR));
        }
    };

    tracing::info!(
        "Prediction returned {} medicine(s) for {:?}",
        prediction.medicines.len(),
        symptoms
    );
    state.set_recommendations(prediction.medicines.clone());

    let record = ConsultationRecord::new(symptoms, &prediction.medicines, Utc::now());
    if let Err(e) = sink.record(&record) {
        tracing::warn!("Could not record consultation: {}", e);
    }

    let names: Vec<String> = prediction.medicines.iter().map(|m| m.name.clone()).collect();
    let mut late_redirect = None;

    let allergy_list = state.patient.allergy_list();
    let allergies = if allergy_list.is_empty() {
        None
    } else {
        match client.check_allergies(&names, &allergy_list) {
            Ok(Reply::Ok(report)) => Some(report),
            Ok(Reply::LoginRequired { message }) => {
                late_redirect = Some(login_redirect(message, service, DEFAULT_REDIRECT_DELAY));
                None
            }
            Ok(Reply::Failed { error }) => {
                tracing::warn!("Allergy check failed: {}", error);
                None
            }
            Err(e) => {
                tracing::warn!("Allergy check error: {}", e);
                None
            }
        }
    };

    let interactions = if names.len() > 1 {
        match client.check_interactions(&names) {
            Ok(Reply::Ok(report)) => Some(report),
            Ok(Reply::LoginRequired { message }) => {
                late_redirect = Some(login_redirect(message, service, DEFAULT_REDIRECT_DELAY));
                None
            }
            Ok(Reply::Failed { error }) => {
                tracing::warn!("Interaction check failed: {}", error);
                None
            }
            Err(e) => {
                tracing::warn!("Interaction check error: {}", e);
                None
            }
        }
    } else {
        None
    };

    Outcome::Done(Analysis {
        severity,
        prediction,
        profile,
        allergies,
        interactions,
        redirect: late_redirect,
    })
}

pub(crate) fn login_redirect(message: String, service: &ServiceConfig, delay: Duration) -> LoginRedirect {
    LoginRedirect::new(message, &service.login_path, &service.redirect_from, delay)
}
