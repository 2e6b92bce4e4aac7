use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Paper size variants with dimensions in millimeters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaperSize {
    /// A4: 210 × 297 mm
    #[default]
    A4,
    /// US Letter: 215.9 × 279.4 mm (8.5 × 11 inches)
    Letter,
}

impl PaperSize {
    /// Returns (width, height) in millimeters
    pub fn dimensions_mm(&self) -> (f64, f64) {
        match self {
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::Letter => (215.9, 279.4),
        }
    }
}

impl fmt::Display for PaperSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaperSize::A4 => write!(f, "A4 (210×297mm)"),
            PaperSize::Letter => write!(f, "Letter (8.5×11in)"),
        }
    }
}

/// Longitudinal arch classification of a foot
///
/// `HalluxValgus` is never derived from an image; it is an override chosen
/// by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchType {
    Flat,
    High,
    Normal,
    HalluxValgus,
}

impl ArchType {
    pub const ALL: [ArchType; 4] = [
        ArchType::Flat,
        ArchType::High,
        ArchType::Normal,
        ArchType::HalluxValgus,
    ];
}

impl fmt::Display for ArchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchType::Flat => write!(f, "Flat"),
            ArchType::High => write!(f, "High"),
            ArchType::Normal => write!(f, "Normal"),
            ArchType::HalluxValgus => write!(f, "Hallux valgus"),
        }
    }
}

impl FromStr for ArchType {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "flat" => Ok(ArchType::Flat),
            "high" => Ok(ArchType::High),
            "normal" => Ok(ArchType::Normal),
            "halluxvalgus" | "外反母趾" => Ok(ArchType::HalluxValgus),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

/// Leg alignment as selected by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LegShape {
    Bowleg,
    KnockKnee,
    Normal,
}

impl LegShape {
    pub const ALL: [LegShape; 3] = [LegShape::Bowleg, LegShape::KnockKnee, LegShape::Normal];
}

impl fmt::Display for LegShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegShape::Bowleg => write!(f, "Bowleg"),
            LegShape::KnockKnee => write!(f, "Knock-knee"),
            LegShape::Normal => write!(f, "Normal"),
        }
    }
}

impl FromStr for LegShape {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "bowleg" | "o脚" => Ok(LegShape::Bowleg),
            "knockknee" | "x脚" => Ok(LegShape::KnockKnee),
            "normal" | "正常" => Ok(LegShape::Normal),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

/// A label that does not name any known arch type or leg shape
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown label: {0:?}")]
pub struct UnknownLabel(pub String);

/// Lowercase and drop separators so "Knock-knee", "knock_knee" and "KNOCK KNEE" compare equal
fn normalize_label(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Ratio bounds (percent) separating High / Normal / Flat arches
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchThresholds {
    /// Ratios strictly below this are a high arch
    pub high_below: f64,
    /// Ratios strictly above this are a flat arch
    pub flat_above: f64,
}

impl Default for ArchThresholds {
    fn default() -> Self {
        Self {
            high_below: 22.0,
            flat_above: 28.0,
        }
    }
}

impl ArchThresholds {
    /// Map a high-pressure area ratio to an arch type. Both bounds are Normal.
    pub fn classify(&self, ratio: f64) -> ArchType {
        if ratio < self.high_below {
            ArchType::High
        } else if ratio > self.flat_above {
            ArchType::Flat
        } else {
            ArchType::Normal
        }
    }
}

/// Outcome of one assessment request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub arch: ArchType,
    pub leg: LegShape,
    /// High-pressure area ratio in percent; absent when the arch was overridden
    pub pressure_ratio: Option<f64>,
    /// Recommended insole number, absent when the table has no entry
    pub insole: Option<u8>,
    pub arch_explanation: &'static str,
    pub leg_explanation: &'static str,
}
