//! Personalized dosage estimation.
//!
//! Derives a [`DosagePlan`] from a medicine's service-supplied details and the
//! patient's age:
//! 1. **Age tier**: pediatric and adolescent strength reduction, age warnings,
//!    tier frequency
//! 2. **Medicine rule**: name-based frequency/duration table, applied after
//!    the tier so it overrides the tier's frequency
//! 3. **Tablet count**: days × doses per day
//!
//! Strength rewriting works on parsed [`DosageText`] tokens rather than on raw
//! substrings, so `1500mg` is one strength and is never touched by a rule
//! about `500mg`.

use crate::{DosagePlan, MedicineInfo, PatientInputs};
use once_cell::sync::Lazy;
use std::fmt;

const DEFAULT_DOSAGE: &str = "As directed";
const DEFAULT_FREQUENCY: &str = "Twice daily";
const DEFAULT_DURATION: &str = "5-7 days";
const DEFAULT_DAYS: u32 = 7;
const DEFAULT_TIMES_PER_DAY: u32 = 2;

pub const PEDIATRIC_WARNING: &str = "Pediatric dose required. Consult pediatrician before use.";
pub const ELDERLY_WARNING: &str =
    "Elderly patient. Monitor for side effects. Consider reduced dose.";

// ============================================================================
// Structured dosage text
// ============================================================================

/// Unit of a strength token
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrengthUnit {
    Mg,
    Mcg,
    G,
    Ml,
}

impl StrengthUnit {
    fn suffix(self) -> &'static str {
        match self {
            StrengthUnit::Mg => "mg",
            StrengthUnit::Mcg => "mcg",
            StrengthUnit::G => "g",
            StrengthUnit::Ml => "ml",
        }
    }
}

/// A strength such as `500mg`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Strength {
    pub amount: u32,
    pub unit: StrengthUnit,
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.suffix())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Text(String),
    Strength(Strength),
}

/// Free-text dosage instructions split into literal text and strengths
///
/// A strength is a maximal run of ASCII digits immediately followed by a unit
/// suffix. Leading zeros of the run stay literal text, so `0500mg` is a `0`
/// followed by `500mg` and formatting reproduces the input exactly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DosageText {
    segments: Vec<Segment>,
}

impl DosageText {
    pub fn parse(input: &str) -> Self {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut rest = input;

        while let Some(ch) = rest.chars().next() {
            if ch.is_ascii_digit() {
                let digits_len = rest
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(rest.len());
                let digits = &rest[..digits_len];
                if let Some((unit, unit_len)) = unit_at(&rest[digits_len..]) {
                    let (zeros, significant) = split_leading_zeros(digits);
                    if let Ok(amount) = significant.parse() {
                        text.push_str(zeros);
                        if !text.is_empty() {
                            segments.push(Segment::Text(std::mem::take(&mut text)));
                        }
                        segments.push(Segment::Strength(Strength { amount, unit }));
                        rest = &rest[digits_len + unit_len..];
                        continue;
                    }
                }
                text.push_str(digits);
                rest = &rest[digits_len..];
            } else {
                text.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
        }

        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Self { segments }
    }

    /// All strengths in reading order
    pub fn strengths(&self) -> impl Iterator<Item = Strength> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Strength(strength) => Some(*strength),
            Segment::Text(_) => None,
        })
    }

    /// Replace every milligram strength whose amount is in `from` with `to` mg
    ///
    /// Returns how many strengths were rewritten.
    pub fn rewrite_mg(&mut self, from: &[u32], to: u32) -> usize {
        let mut rewritten = 0;
        for segment in &mut self.segments {
            if let Segment::Strength(strength) = segment {
                if strength.unit == StrengthUnit::Mg && from.contains(&strength.amount) {
                    strength.amount = to;
                    rewritten += 1;
                }
            }
        }
        rewritten
    }
}

impl fmt::Display for DosageText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => f.write_str(text)?,
                Segment::Strength(strength) => write!(f, "{}", strength)?,
            }
        }
        Ok(())
    }
}

/// `"0500"` -> `("0", "500")`; an all-zero run keeps its last zero
fn split_leading_zeros(digits: &str) -> (&str, &str) {
    let zeros = digits.len() - digits.trim_start_matches('0').len();
    let zeros = zeros.min(digits.len() - 1);
    digits.split_at(zeros)
}

fn unit_at(rest: &str) -> Option<(StrengthUnit, usize)> {
    // Longest suffix first so "mcg" is not read as "m" + "cg".
    [
        ("mcg", StrengthUnit::Mcg),
        ("mg", StrengthUnit::Mg),
        ("ml", StrengthUnit::Ml),
        ("g", StrengthUnit::G),
    ]
    .into_iter()
    .find(|(suffix, _)| rest.starts_with(suffix))
    .map(|(suffix, unit)| (unit, suffix.len()))
}

// ============================================================================
// Rules
// ============================================================================

/// Age band used for strength and frequency adjustment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgeTier {
    Child,
    Adolescent,
    Adult,
    Elderly,
    Unspecified,
}

impl AgeTier {
    pub fn from_age(age: Option<u32>) -> Self {
        match age {
            None => AgeTier::Unspecified,
            Some(a) if a < 12 => AgeTier::Child,
            Some(a) if a < 18 => AgeTier::Adolescent,
            Some(a) if a >= 65 => AgeTier::Elderly,
            Some(_) => AgeTier::Adult,
        }
    }
}

/// Schedule overrides for one family of medicines
#[derive(Clone, Debug)]
pub struct MedicineRule {
    pub name_fragments: &'static [&'static str],
    pub frequency: &'static str,
    pub times_per_day: u32,
    pub duration: &'static str,
    pub days: u32,
}

impl MedicineRule {
    fn matches(&self, lowercase_name: &str) -> bool {
        self.name_fragments
            .iter()
            .any(|fragment| lowercase_name.contains(fragment))
    }
}

/// Name rules in precedence order; the first match applies
static MEDICINE_RULES: Lazy<Vec<MedicineRule>> = Lazy::new(|| {
    vec![
        MedicineRule {
            name_fragments: &["paracetamol"],
            frequency: "Three times daily (every 6-8 hours)",
            times_per_day: 3,
            duration: "3-5 days",
            days: 5,
        },
        MedicineRule {
            name_fragments: &["cetirizine"],
            frequency: "Once daily (preferably at bedtime)",
            times_per_day: 1,
            duration: "5-7 days",
            days: 7,
        },
        MedicineRule {
            name_fragments: &["azithromycin"],
            frequency: "Once daily (same time each day)",
            times_per_day: 1,
            duration: "3-5 days (complete course)",
            days: 5,
        },
        MedicineRule {
            name_fragments: &["diclofenac"],
            frequency: "Twice daily (after meals)",
            times_per_day: 2,
            duration: "5-7 days",
            days: 7,
        },
        MedicineRule {
            name_fragments: &["aciloc", "omeprazole"],
            frequency: "Twice daily (30 min before meals)",
            times_per_day: 2,
            duration: "7-14 days",
            days: 14,
        },
    ]
});

/// Find the schedule rule for a medicine name (case-insensitive substring)
pub fn find_medicine_rule(name: &str) -> Option<&'static MedicineRule> {
    let lowercase = name.to_lowercase();
    MEDICINE_RULES.iter().find(|rule| rule.matches(&lowercase))
}

// ============================================================================
// Estimator
// ============================================================================

/// Derive the personalized dosage plan for one medicine
///
/// Pure and deterministic. Weight is accepted through `patient` but does not
/// influence the plan.
pub fn estimate_dosage(info: &MedicineInfo, patient: &PatientInputs) -> DosagePlan {
    let mut dosage = DosageText::parse(info.dosage.as_deref().unwrap_or(DEFAULT_DOSAGE));
    let mut frequency = DEFAULT_FREQUENCY;
    let mut duration = DEFAULT_DURATION;
    let mut days = DEFAULT_DAYS;
    let mut times_per_day = DEFAULT_TIMES_PER_DAY;
    let mut age_warning = None;

    let tier = AgeTier::from_age(patient.age_years());
    match tier {
        AgeTier::Child => {
            age_warning = Some(PEDIATRIC_WARNING.to_string());
            dosage.rewrite_mg(&[500, 650], 250);
            frequency = "Twice daily (with 8-hour gap)";
        }
        AgeTier::Adolescent => {
            dosage.rewrite_mg(&[650], 500);
            frequency = "Twice daily";
        }
        AgeTier::Elderly => {
            age_warning = Some(ELDERLY_WARNING.to_string());
            frequency = "Twice daily (start with lower dose)";
        }
        AgeTier::Adult | AgeTier::Unspecified => {}
    }

    let name = info.name.as_deref().unwrap_or("");
    if let Some(rule) = find_medicine_rule(name) {
        frequency = rule.frequency;
        times_per_day = rule.times_per_day;
        duration = rule.duration;
        days = rule.days;
    }

    let total_tablets = (f64::from(days) * f64::from(times_per_day)).ceil() as u32;

    tracing::debug!(
        "Dosage plan for {:?}: tier {:?}, {} x {} = {} tablets",
        name,
        tier,
        days,
        times_per_day,
        total_tablets
    );

    DosagePlan {
        dosage: dosage.to_string(),
        frequency: frequency.to_string(),
        duration: duration.to_string(),
        total_tablets,
        age_warning,
    }
}
