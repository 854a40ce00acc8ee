#![forbid(unsafe_code)]

//! Core domain model and business logic for MediFlex.
//!
//! This crate provides:
//! - Domain types (recommendations, patient inputs, dosage plans, notices)
//! - Personalized dosage estimation
//! - Rendering of results and the exportable consultation report
//! - Local accounts, session flags, preferences and consultation history
//! - The recommendation service client and the analysis workflow

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod dosage;
pub mod store;
pub mod credentials;
pub mod gate;
pub mod history;
pub mod service;
pub mod app;
pub mod symptoms;
pub mod render;
pub mod report;
pub mod analysis;
pub mod assist;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use credentials::CredentialStore;
pub use store::JsonDocument;
pub use history::{ConsultationSink, JsonlHistory, NoHistory};
pub use dosage::estimate_dosage;
pub use app::AppState;
pub use service::{HttpTransport, LoginRedirect, Reply, ServiceClient, Transport};
pub use analysis::{analyze_symptoms, Analysis, Outcome};
pub use report::{export_report, export_state, write_report, ExportOutcome};
pub use render::Theme;
