// Assessment pipeline
// arch (override or classifier) + leg shape -> insole number and explanations

use image::RgbImage;
use insole_common::{
    arch_explanation, leg_explanation, recommend, ArchType, Assessment, LegShape,
};
use tracing::{info, warn};

use crate::classification::{ArchClassifier, Classification};

/// Shown instead of an insole number when the table has no entry
pub const NO_RECOMMENDATION: &str = "No applicable insole recommendation was found.";

pub struct Outcome {
    pub assessment: Assessment,
    /// Present unless the hallux-valgus override skipped image analysis
    pub classification: Option<Classification>,
}

/// Assess one pressure image
pub fn assess(
    image: &RgbImage,
    hallux_valgus: bool,
    leg: LegShape,
    classifier: &ArchClassifier,
) -> Outcome {
    let classification = if hallux_valgus {
        info!("Hallux valgus selected; skipping image classification");
        None
    } else {
        Some(classifier.analyze(image))
    };

    let arch = classification
        .as_ref()
        .map_or(ArchType::HalluxValgus, |c| c.arch);

    let insole = recommend(arch, leg);
    if insole.is_none() {
        warn!("No insole recommendation for ({}, {})", arch, leg);
    }

    Outcome {
        assessment: Assessment {
            arch,
            leg,
            pressure_ratio: classification.as_ref().map(|c| c.ratio),
            insole,
            arch_explanation: arch_explanation(arch),
            leg_explanation: leg_explanation(leg),
        },
        classification,
    }
}

/// Plain-text summary for the terminal
pub fn render_text(assessment: &Assessment) -> String {
    let headline = match assessment.insole {
        Some(number) => format!("Recommended insole number: {}", number),
        None => NO_RECOMMENDATION.to_string(),
    };

    let arch_line = match assessment.pressure_ratio {
        Some(ratio) => format!("Arch type: {} (high-pressure ratio {:.1}%)", assessment.arch, ratio),
        None => format!("Arch type: {}", assessment.arch),
    };

    [
        headline,
        String::new(),
        arch_line,
        format!("  {}", assessment.arch_explanation),
        String::new(),
        format!("Leg shape: {}", assessment.leg),
        format!("  {}", assessment.leg_explanation),
    ]
    .join("\n")
}
