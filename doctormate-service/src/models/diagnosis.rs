use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Skin-lesion category, in the classifier's output order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LesionClass {
    Akiec,
    Bcc,
    Bkl,
    Df,
    Mel,
    Nv,
    Vasc,
}

impl LesionClass {
    pub const COUNT: usize = 7;

    /// Every class, indexed exactly like the model's output vector.
    pub const ALL: [LesionClass; Self::COUNT] = [
        LesionClass::Akiec,
        LesionClass::Bcc,
        LesionClass::Bkl,
        LesionClass::Df,
        LesionClass::Mel,
        LesionClass::Nv,
        LesionClass::Vasc,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn code(self) -> &'static str {
        match self {
            LesionClass::Akiec => "akiec",
            LesionClass::Bcc => "bcc",
            LesionClass::Bkl => "bkl",
            LesionClass::Df => "df",
            LesionClass::Mel => "mel",
            LesionClass::Nv => "nv",
            LesionClass::Vasc => "vasc",
        }
    }
}

impl fmt::Display for LesionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for LesionClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LesionClass::ALL
            .iter()
            .copied()
            .find(|class| class.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown lesion class: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    #[serde(alias = "mild", alias = "MILD")]
    Mild,
    #[serde(alias = "moderate", alias = "MODERATE")]
    Moderate,
    #[serde(alias = "severe", alias = "SEVERE")]
    Severe,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Mild => "Mild",
            Severity::Moderate => "Moderate",
            Severity::Severe => "Severe",
        };
        f.write_str(label)
    }
}

/// Integer certainty percentage, always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Confidence(u8);

impl Confidence {
    pub const MAX: u8 = 100;

    /// From a probability in `[0, 1]`. Out-of-range values are clamped and
    /// non-finite values count as zero.
    pub fn from_fraction(probability: f32) -> Self {
        if !probability.is_finite() {
            return Self(0);
        }
        let percent = (f64::from(probability) * 100.0).round().clamp(0.0, 100.0);
        Self(percent as u8)
    }

    /// From a percentage. Returns `None` outside `[0, 100]`.
    pub fn from_percent(percent: f64) -> Option<Self> {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return None;
        }
        Some(Self(percent.round() as u8))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Confidence {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > Self::MAX {
            return Err(format!("confidence {} exceeds {}", value, Self::MAX));
        }
        Ok(Self(value))
    }
}

impl From<Confidence> for u8 {
    fn from(confidence: Confidence) -> Self {
        confidence.0
    }
}

/// Static reference entry for one lesion class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisRecord {
    pub code: LesionClass,
    pub name: String,
    pub description: String,
    pub severity: Severity,
    pub recommendations: Vec<String>,
    pub emergency_care: String,
    pub risk_factors: Vec<String>,
    pub symptoms: Vec<String>,
    pub prognosis: String,
    pub treatment_options: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_order_matches_model_output() {
        let codes: Vec<&str> = LesionClass::ALL.iter().map(|c| c.code()).collect();
        assert_eq!(codes, ["akiec", "bcc", "bkl", "df", "mel", "nv", "vasc"]);

        for (i, class) in LesionClass::ALL.iter().enumerate() {
            assert_eq!(class.index(), i);
        }
    }

    #[test]
    fn class_parses_from_code() {
        assert_eq!("mel".parse::<LesionClass>(), Ok(LesionClass::Mel));
        assert_eq!(" NV ".parse::<LesionClass>(), Ok(LesionClass::Nv));
        assert!("melanoma".parse::<LesionClass>().is_err());
    }

    #[test]
    fn severity_accepts_case_variants() {
        let s: Severity = serde_json::from_str("\"severe\"").unwrap();
        assert_eq!(s, Severity::Severe);
        let s: Severity = serde_json::from_str("\"Moderate\"").unwrap();
        assert_eq!(s, Severity::Moderate);
        assert!(serde_json::from_str::<Severity>("\"Critical\"").is_err());
        assert_eq!(serde_json::to_string(&Severity::Mild).unwrap(), "\"Mild\"");
    }

    #[test]
    fn confidence_from_fraction_rounds_and_clamps() {
        assert_eq!(Confidence::from_fraction(0.95).value(), 95);
        assert_eq!(Confidence::from_fraction(0.0).value(), 0);
        assert_eq!(Confidence::from_fraction(1.0).value(), 100);
        assert_eq!(Confidence::from_fraction(1.7).value(), 100);
        assert_eq!(Confidence::from_fraction(-0.2).value(), 0);
        assert_eq!(Confidence::from_fraction(f32::NAN).value(), 0);
    }

    #[test]
    fn confidence_from_percent_rejects_out_of_range() {
        assert_eq!(Confidence::from_percent(72.4).map(Confidence::value), Some(72));
        assert_eq!(Confidence::from_percent(100.0).map(Confidence::value), Some(100));
        assert!(Confidence::from_percent(100.5).is_none());
        assert!(Confidence::from_percent(-1.0).is_none());
        assert!(Confidence::from_percent(f64::INFINITY).is_none());
    }

    #[test]
    fn confidence_deserialization_enforces_bound() {
        assert!(serde_json::from_str::<Confidence>("101").is_err());
        let c: Confidence = serde_json::from_str("88").unwrap();
        assert_eq!(c.value(), 88);
    }
}
