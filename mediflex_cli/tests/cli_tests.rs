//! Integration tests for the mediflex binary.
//!
//! These tests verify end-to-end behavior including:
//! - Registration, login and logout against a temporary data directory
//! - Offline dosage estimation, rendering and report export
//! - Persisted preferences and consultation history
//! - Failure handling when the service is unreachable

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// CLI isolated from the user's real config and data
fn cli(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("mediflex"));
    cmd.arg("--data-dir")
        .arg(dir.join("data"))
        .arg("--config")
        .arg(dir.join("config.toml"))
        .arg("--no-color")
        .env_remove("RUST_LOG");
    cmd
}

const PREDICTION: &str = r#"{
    "success": true,
    "symptoms_analyzed": "fever, headache",
    "medicines": [
        {
            "name": "paracetamol",
            "confidence": 92.4,
            "info": {
                "name": "Paracetamol 650mg",
                "category": "Analgesic",
                "usage": "Fever and mild pain",
                "dosage": "650mg every 6 hours",
                "precautions": ["Avoid alcohol"],
                "side_effects": ["Nausea"]
            }
        },
        {"name": "ibuprofen", "confidence": 64.0, "info": {}}
    ]
}"#;

#[test]
fn test_cli_help() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Symptom-based medicine recommendations",
        ));
}

#[test]
fn test_fresh_install_shows_welcome() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Welcome to MediFlex"));
}

#[test]
fn test_register_login_logout_flow() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    cli(dir)
        .args(["register", "--name", "Asha", "--email", "asha@example.com"])
        .args(["--password", "secret"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Registration Successful!"));
    assert!(dir.join("data/mediflex.db").exists());

    cli(dir)
        .arg("start")
        .assert()
        .success()
        .stdout(predicate::str::contains("Welcome back, Asha!"));

    cli(dir)
        .arg("profile")
        .assert()
        .success()
        .stdout(predicate::str::contains("Name: Asha"))
        .stdout(predicate::str::contains("Email: asha@example.com"));

    cli(dir)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out successfully!"));

    cli(dir)
        .args(["login", "--email", "asha@example.com", "--password", "wrong"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Invalid email or password!"));

    cli(dir)
        .args(["login", "--email", " asha@example.com ", "--password", "secret"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Login Successful!"))
        .stdout(predicate::str::contains("Welcome, Asha!"));
}

#[test]
fn test_duplicate_registration_rejected() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    cli(dir)
        .args(["register", "--name", "A", "--email", "a@x.org", "--password", "p"])
        .assert()
        .success();

    cli(dir)
        .args(["register", "--name", "B", "--email", "a@x.org", "--password", "q"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Email already registered!"));

    cli(dir)
        .args(["register", "--name", "", "--email", "c@x.org", "--password", "q"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Please fill all fields!"));
}

#[test]
fn test_estimate_pediatric_paracetamol() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .args(["estimate", "--name", "Paracetamol", "--dosage", "650mg every 6 hours"])
        .args(["--age", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dosage:    250mg every 6 hours"))
        .stdout(predicate::str::contains(
            "Frequency: Three times daily (every 6-8 hours)",
        ))
        .stdout(predicate::str::contains("Total Tablets Needed: 15 tablets"))
        .stdout(predicate::str::contains("Pediatric dose required"));
}

#[test]
fn test_estimate_defaults_without_inputs() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .arg("estimate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dosage:    As directed"))
        .stdout(predicate::str::contains("Frequency: Twice daily"))
        .stdout(predicate::str::contains("Total Tablets Needed: 14 tablets"));
}

#[test]
fn test_render_expanded_cards() {
    let temp_dir = setup_test_dir();
    let input = temp_dir.path().join("prediction.json");
    fs::write(&input, PREDICTION).unwrap();

    cli(temp_dir.path())
        .arg("render")
        .arg("--input")
        .arg(&input)
        .args(["--age", "15", "--expand"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Based on symptoms: fever, headache"))
        .stdout(predicate::str::contains("▾ 1. Paracetamol 650mg"))
        .stdout(predicate::str::contains("92.4% (high)"))
        .stdout(predicate::str::contains("Dosage:    500mg every 6 hours"))
        .stdout(predicate::str::contains("▾ 2. ibuprofen"))
        .stdout(predicate::str::contains("64.0% (low)"));
}

#[test]
fn test_render_empty_and_malformed_bodies() {
    let temp_dir = setup_test_dir();
    let empty = temp_dir.path().join("empty.json");
    let broken = temp_dir.path().join("broken.json");
    fs::write(&empty, r#"{"success": true, "medicines": []}"#).unwrap();
    fs::write(&broken, "<!doctype html>").unwrap();

    cli(temp_dir.path())
        .arg("render")
        .arg("--input")
        .arg(&empty)
        .assert()
        .success()
        .stdout(predicate::str::contains("No Specific Recommendation"))
        .stdout(predicate::str::contains(
            "Please consult a healthcare professional",
        ));

    cli(temp_dir.path())
        .arg("render")
        .arg("--input")
        .arg(&broken)
        .assert()
        .success()
        .stdout(predicate::str::contains("Error processing response."));
}

#[test]
fn test_render_login_required_body_redirects() {
    let temp_dir = setup_test_dir();
    let input = temp_dir.path().join("login.json");
    fs::write(
        &input,
        r#"{"success": false, "require_login": true, "error": "Please login to get medicine recommendations."}"#,
    )
    .unwrap();

    cli(temp_dir.path())
        .arg("render")
        .arg("--input")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Please login to get medicine recommendations.",
        ))
        .stdout(predicate::str::contains(
            "Redirecting to http://localhost:5000/auth/login?redirect=%2F",
        ))
        .stdout(predicate::str::contains("Based on symptoms").not());
}

#[test]
fn test_export_writes_report() {
    let temp_dir = setup_test_dir();
    let input = temp_dir.path().join("prediction.json");
    let out = temp_dir.path().join("reports");
    fs::write(&input, PREDICTION).unwrap();

    cli(temp_dir.path())
        .arg("export")
        .arg("--input")
        .arg(&input)
        .args(["--age", "70", "--weight", "60"])
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Personalized prescription downloaded successfully!",
        ));

    let reports: Vec<_> = fs::read_dir(&out).unwrap().collect();
    assert_eq!(reports.len(), 1);
    let path = reports[0].as_ref().unwrap().path();
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("MediFlex_Prescription_"));
    assert!(name.ends_with(".txt"));

    let report = fs::read_to_string(&path).unwrap();
    assert!(report.contains("Symptoms: fever, headache"));
    assert!(report.contains("Patient Age: 70 years"));
    let first = report.find("1. Paracetamol 650mg\n").unwrap();
    let second = report.find("2. ibuprofen\n").unwrap();
    assert!(first < second);
    assert!(report[first..second].contains("   Precautions:\n   - Avoid alcohol\n"));
    assert!(report.contains("   Category: Not specified"));
    assert!(report.contains("⚠️  AGE WARNING: Elderly patient."));
}

#[test]
fn test_export_nothing_to_export() {
    let temp_dir = setup_test_dir();
    let input = temp_dir.path().join("prediction.json");
    let out = temp_dir.path().join("reports");
    fs::write(&input, r#"{"success": true, "medicines": []}"#).unwrap();

    cli(temp_dir.path())
        .arg("export")
        .arg("--input")
        .arg(&input)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("No recommendations to export"));
    assert!(!out.exists());
}

#[test]
fn test_theme_toggle_persists() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    cli(dir)
        .arg("theme")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dark mode enabled"));
    assert!(dir.join("data/preferences.json").exists());

    cli(dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dark mode:    on"));

    cli(dir)
        .arg("theme")
        .assert()
        .success()
        .stdout(predicate::str::contains("Light mode enabled"));
}

#[test]
fn test_corrupt_preferences_fall_back_to_defaults() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    fs::create_dir_all(dir.join("data")).unwrap();
    fs::write(dir.join("data/preferences.json"), "{not json").unwrap();

    cli(dir)
        .arg("theme")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dark mode enabled"));
}

#[test]
fn test_history_empty_and_clear() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    cli(dir)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("No consultations recorded yet."));

    let history_dir = dir.join("data/history");
    fs::create_dir_all(&history_dir).unwrap();
    fs::write(
        history_dir.join("consultations.jsonl"),
        concat!(
            r#"{"id":"6f1c1b2e-0d7c-4d7e-9b1e-2f9a3c4d5e6f","symptoms":"fever","medicines":["paracetamol"],"recorded_at":"2026-01-05T10:00:00Z"}"#,
            "\n",
            "garbage line\n"
        ),
    )
    .unwrap();

    cli(dir)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("fever"))
        .stdout(predicate::str::contains("→ paracetamol"));

    cli(dir)
        .args(["history", "--clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared 1 consultation(s) from history"));

    cli(dir)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("No consultations recorded yet."));
}

#[test]
fn test_analyze_blank_symptoms() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .args(["--server", "http://127.0.0.1:9", "analyze", "  "])
        .assert()
        .success()
        .stdout(predicate::str::contains("Please enter symptoms"));
}

#[test]
fn test_analyze_unreachable_service() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .args(["--server", "http://127.0.0.1:9", "analyze", "fever"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Network error. Please try again."));
    assert!(!temp_dir.path().join("data/history/consultations.jsonl").exists());
}

#[test]
fn test_dosage_and_reminder_validation() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["--server", "http://127.0.0.1:9", "dosage", "paracetamol", "--age", "30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Please enter age and weight"));

    cli(temp_dir.path())
        .args(["--server", "http://127.0.0.1:9", "remind", "Paracetamol", "--time", "09:00"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reminder cancelled"));
}

#[test]
fn test_invalid_server_url_fails() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .args(["--server", "localhost:5000", "start"])
        .assert()
        .failure();
}

#[test]
fn test_config_init_writes_file() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    cli(dir)
        .args(["config", "--init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote config"));

    let contents = fs::read_to_string(dir.join("config.toml")).unwrap();
    assert!(contents.contains("base_url"));
}
