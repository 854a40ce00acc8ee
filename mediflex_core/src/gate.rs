//! Start-up routing and the login/registration flow.

use crate::{CredentialStore, Notice, Result};

/// Where the app goes when it starts
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// First-run welcome screen that leads to login/registration
    Welcome,
    /// Authenticated home screen
    Home { display_name: String },
}

/// Decide the start screen from the persisted login flag
pub fn route_on_start(store: &CredentialStore) -> Result<Route> {
    if !store.is_logged_in()? {
        return Ok(Route::Welcome);
    }

    let display_name = store
        .logged_in_name()?
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "User".to_string());
    Ok(Route::Home { display_name })
}

/// Result of submitting the login or registration form
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthOutcome {
    pub notice: Notice,
    /// Set when the user is now logged in
    pub signed_in_as: Option<String>,
}

impl AuthOutcome {
    fn rejected(notice: Notice) -> Self {
        Self {
            notice,
            signed_in_as: None,
        }
    }
}

/// Validate and submit the login form
pub fn submit_login(store: &CredentialStore, email: &str, password: &str) -> Result<AuthOutcome> {
    let email = email.trim();
    let password = password.trim();

    if email.is_empty() || password.is_empty() {
        return Ok(AuthOutcome::rejected(Notice::error(
            "Please enter email and password",
        )));
    }

    match store.login(email, password)? {
        Some(name) => {
            store.set_logged_in(email, &name)?;
            Ok(AuthOutcome {
                notice: Notice::success("Login Successful!"),
                signed_in_as: Some(name),
            })
        }
        None => Ok(AuthOutcome::rejected(Notice::error(
            "Invalid email or password!",
        ))),
    }
}

/// Validate and submit the registration form
///
/// A successful registration also logs the new user in.
pub fn submit_registration(
    store: &CredentialStore,
    name: &str,
    email: &str,
    password: &str,
) -> Result<AuthOutcome> {
    let name = name.trim();
    let email = email.trim();
    let password = password.trim();

    if name.is_empty() || email.is_empty() || password.is_empty() {
        return Ok(AuthOutcome::rejected(Notice::error("Please fill all fields!")));
    }

    if !store.register(name, email, password)? {
        return Ok(AuthOutcome::rejected(Notice::error(
            "Email already registered!",
        )));
    }

    store.set_logged_in(email, name)?;
    Ok(AuthOutcome {
        notice: Notice::success("Registration Successful!"),
        signed_in_as: Some(name.to_string()),
    })
}

/// Clear the session
pub fn sign_out(store: &CredentialStore) -> Result<Notice> {
    store.logout()?;
    Ok(Notice::success("Logged out successfully!"))
}

/// Profile lines for the logged-in user
pub fn profile_lines(store: &CredentialStore) -> Result<Vec<String>> {
    let name = store.logged_in_name()?.unwrap_or_default();
    let email = store.logged_in_email()?.unwrap_or_default();
    Ok(vec![format!("Name: {}", name), format!("Email: {}", email)])
}
