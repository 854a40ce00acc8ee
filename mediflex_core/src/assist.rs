//! Auxiliary operations around an analysis: server dosage lookup, symptom
//! suggestions, reminders, emergency numbers, theme, and history.

use crate::analysis::Outcome;
use crate::config::ServiceConfig;
use crate::history::JsonlHistory;
use crate::service::{LoginRedirect, Reply, ServiceClient, Transport, DEFAULT_REDIRECT_DELAY};
use crate::store::JsonDocument;
use crate::symptoms::suggestion_query;
use crate::{DosageGuidance, EmergencyContacts, Notice, Preferences, Result};
use std::path::Path;

/// Ask the service for dosage guidance; age and weight are both required
pub fn calculate_dosage<T: Transport>(
    client: &ServiceClient<T>,
    service: &ServiceConfig,
    medicine: &str,
    age: Option<&str>,
    weight: Option<&str>,
) -> Outcome<DosageGuidance> {
    let age = age.map(str::trim).filter(|a| !a.is_empty());
    let weight = weight.map(str::trim).filter(|w| !w.is_empty());
    let (Some(age), Some(weight)) = (age, weight) else {
        return Outcome::Notice(Notice::error("Please enter age and weight"));
    };

    match client.calculate_dosage(medicine, age, weight) {
        Ok(Reply::Ok(guidance)) => Outcome::Done(guidance),
        Ok(Reply::LoginRequired { message }) => Outcome::Redirect(LoginRedirect::new(
            message,
            &service.login_path,
            &service.redirect_from,
            DEFAULT_REDIRECT_DELAY,
        )),
        Ok(Reply::Failed { error }) => Outcome::Notice(Notice::error(error)),
        Err(e) => {
            tracing::error!("Dosage request failed: {}", e);
            Outcome::Notice(Notice::error("Calculation error. Please try again."))
        }
    }
}

/// Completions for the fragment being typed; empty when the fragment is too
/// short or the lookup fails
pub fn symptom_suggestions<T: Transport>(client: &ServiceClient<T>, input: &str) -> Vec<String> {
    let Some(query) = suggestion_query(input) else {
        return Vec::new();
    };

    match client.symptom_suggestions(query) {
        Ok(Reply::Ok(suggestions)) => suggestions,
        Ok(_) => Vec::new(),
        Err(e) => {
            tracing::debug!("Suggestion lookup failed: {}", e);
            Vec::new()
        }
    }
}

/// Register a reminder; a missing time or frequency cancels it
pub fn set_medication_reminder<T: Transport>(
    client: &ServiceClient<T>,
    service: &ServiceConfig,
    medicine: &str,
    time: Option<&str>,
    frequency: Option<&str>,
) -> Outcome<Notice> {
    let time = time.map(str::trim).filter(|t| !t.is_empty());
    let frequency = frequency.map(str::trim).filter(|f| !f.is_empty());
    let (Some(time), Some(frequency)) = (time, frequency) else {
        return Outcome::Notice(Notice::info("Reminder cancelled"));
    };

    match client.medication_reminder(medicine, time, frequency) {
        Ok(Reply::Ok(message)) => Outcome::Done(Notice::success(message)),
        // Reminders go to the bare login page, without a return path
        Ok(Reply::LoginRequired { message }) => Outcome::Redirect(LoginRedirect {
            message,
            target: service.login_path.clone(),
            delay: DEFAULT_REDIRECT_DELAY,
        }),
        Ok(Reply::Failed { error }) => Outcome::Notice(Notice::error(error)),
        Err(e) => {
            tracing::error!("Reminder request failed: {}", e);
            Outcome::Notice(Notice::error("Failed to set reminder"))
        }
    }
}

pub fn emergency_contacts<T: Transport>(client: &ServiceClient<T>) -> Outcome<EmergencyContacts> {
    match client.emergency_contacts() {
        Ok(Reply::Ok(contacts)) => Outcome::Done(contacts),
        Ok(Reply::LoginRequired { message }) => Outcome::Notice(Notice::warning(message)),
        Ok(Reply::Failed { error }) => Outcome::Notice(Notice::error(error)),
        Err(e) => {
            tracing::error!("Emergency contacts request failed: {}", e);
            Outcome::Notice(Notice::error("Failed to load emergency contacts"))
        }
    }
}

/// Flip the persisted dark-mode preference
pub fn toggle_theme(preferences_path: &Path) -> Result<(Preferences, Notice)> {
    let prefs = Preferences::update(preferences_path, |p| p.dark_mode = !p.dark_mode)?;
    let notice = if prefs.dark_mode {
        Notice::success("Dark mode enabled")
    } else {
        Notice::success("Light mode enabled")
    };
    Ok((prefs, notice))
}

pub fn clear_history(history: &JsonlHistory) -> Result<Notice> {
    let dropped = history.clear()?;
    Ok(Notice::success(format!(
        "Cleared {} consultation(s) from history",
        dropped
    )))
}
