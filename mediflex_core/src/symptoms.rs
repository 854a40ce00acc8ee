//! Editing helpers for the comma-separated symptom field.

/// Shortest fragment worth asking the service to complete
pub const MIN_SUGGESTION_QUERY: usize = 2;

/// Append `symptom` to the list unless it is already there
pub fn add_symptom(current: &str, symptom: &str) -> String {
    let current = current.trim();
    if current.is_empty() {
        return symptom.to_string();
    }

    let mut symptoms: Vec<&str> = current
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if !symptoms.contains(&symptom) {
        symptoms.push(symptom);
    }
    symptoms.join(", ")
}

/// The fragment being typed (after the last comma), if long enough to look up
pub fn suggestion_query(input: &str) -> Option<&str> {
    let fragment = input.rsplit(',').next().unwrap_or("").trim();
    (fragment.chars().count() >= MIN_SUGGESTION_QUERY).then_some(fragment)
}

/// Replace the fragment being typed with the chosen suggestion
pub fn apply_suggestion(input: &str, suggestion: &str) -> String {
    match input.rfind(',') {
        Some(idx) => format!("{}, {}", &input[..idx], suggestion),
        None => format!(" {}", suggestion),
    }
}
