// Insole recommendation table and explanatory text

use crate::types::{ArchType, LegShape};

/// (arch, leg) pairs and the insole number recommended for each
pub static RECOMMENDATIONS: [((ArchType, LegShape), u8); 12] = [
    ((ArchType::Flat, LegShape::Bowleg), 1),
    ((ArchType::Flat, LegShape::KnockKnee), 2),
    ((ArchType::Flat, LegShape::Normal), 3),
    ((ArchType::High, LegShape::Bowleg), 4),
    ((ArchType::High, LegShape::KnockKnee), 5),
    ((ArchType::High, LegShape::Normal), 6),
    ((ArchType::HalluxValgus, LegShape::Bowleg), 7),
    ((ArchType::HalluxValgus, LegShape::KnockKnee), 8),
    ((ArchType::HalluxValgus, LegShape::Normal), 9),
    ((ArchType::Normal, LegShape::Bowleg), 10),
    ((ArchType::Normal, LegShape::KnockKnee), 11),
    ((ArchType::Normal, LegShape::Normal), 12),
];

/// Shown when a label has no explanation
pub const NO_INFORMATION: &str = "No information available.";

/// Look up the insole number for an arch / leg pair
pub fn recommend(arch: ArchType, leg: LegShape) -> Option<u8> {
    RECOMMENDATIONS
        .iter()
        .find(|(key, _)| *key == (arch, leg))
        .map(|&(_, number)| number)
}

/// Look up the insole number from free-form labels
/// Returns None when either label is unknown or the pair is not in the table
pub fn recommend_labels(arch: &str, leg: &str) -> Option<u8> {
    let arch = arch.parse::<ArchType>().ok()?;
    let leg = leg.parse::<LegShape>().ok()?;
    recommend(arch, leg)
}

pub fn arch_explanation(arch: ArchType) -> &'static str {
    match arch {
        ArchType::Flat => {
            "The arch is low and absorbs shock poorly, so fatigue and pain develop easily."
        }
        ArchType::High => {
            "The arch is high and little of the sole touches the ground, so pressure concentrates on a few areas."
        }
        ArchType::Normal => "The arch is well balanced. This is the ideal foot shape.",
        ArchType::HalluxValgus => {
            "The base of the big toe protrudes, with a risk of pain and further deformity."
        }
    }
}

pub fn leg_explanation(leg: LegShape) -> &'static str {
    match leg {
        LegShape::Bowleg => "The knees open outward, which loads the knees and ankles.",
        LegShape::KnockKnee => "The knees turn inward, which tends to strain the joints.",
        LegShape::Normal => {
            "The legs are well balanced with little load on the joints. This is the ideal alignment."
        }
    }
}

/// Explanation for any arch or leg label, or [`NO_INFORMATION`]
pub fn explanation_for_label(label: &str) -> &'static str {
    if let Ok(arch) = label.parse::<ArchType>() {
        return arch_explanation(arch);
    }
    if let Ok(leg) = label.parse::<LegShape>() {
        return leg_explanation(leg);
    }
    NO_INFORMATION
}
