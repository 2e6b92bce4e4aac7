use anyhow::{Context, Result};
use image::RgbImage;
use insole_common::{Assessment, PaperSize};
use printpdf::{
    BuiltinFont, Image, ImageTransform, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::assessment::NO_RECOMMENDATION;

const MARGIN_MM: f32 = 20.0;
const SNAPSHOT_WIDTH_MM: f32 = 90.0;
const WRAP_COLUMNS: usize = 80;

/// Writes an assessment somewhere a user can keep it
pub trait ReportRenderer {
    /// Render the report and return where it was written
    fn render(&self, assessment: &Assessment, snapshot: &RgbImage) -> Result<PathBuf>;
}

/// One line of report text
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub text: String,
    pub size: f32,
    pub bold: bool,
}

impl ReportLine {
    fn heading(text: impl Into<String>) -> Self {
        Self { text: text.into(), size: 13.0, bold: true }
    }

    fn body(text: impl Into<String>) -> Self {
        Self { text: text.into(), size: 10.0, bold: false }
    }

    /// Vertical space the line takes, in mm
    fn advance_mm(&self) -> f32 {
        self.size * 0.55
    }
}

/// Text content of the report, top to bottom
pub fn report_lines(assessment: &Assessment) -> Vec<ReportLine> {
    let mut lines = vec![ReportLine {
        text: "Insole Recommendation Report".to_string(),
        size: 18.0,
        bold: true,
    }];

    lines.push(ReportLine::heading(match assessment.insole {
        Some(number) => format!("Recommended insole number: {}", number),
        None => NO_RECOMMENDATION.to_string(),
    }));

    lines.push(ReportLine::heading(format!("Arch type: {}", assessment.arch)));
    if let Some(ratio) = assessment.pressure_ratio {
        lines.push(ReportLine::body(format!("High-pressure area ratio: {:.1}%", ratio)));
    }
    lines.extend(wrap_text(assessment.arch_explanation, WRAP_COLUMNS).into_iter().map(ReportLine::body));

    lines.push(ReportLine::heading(format!("Leg shape: {}", assessment.leg)));
    lines.extend(wrap_text(assessment.leg_explanation, WRAP_COLUMNS).into_iter().map(ReportLine::body));

    lines
}

/// Greedy word wrap; words longer than `columns` get a line of their own
pub fn wrap_text(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > columns {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// PDF report with the assessment text and the pressure image
pub struct PdfReportRenderer {
    output_dir: PathBuf,
    paper_size: PaperSize,
}

impl PdfReportRenderer {
    pub fn new(output_dir: impl Into<PathBuf>, paper_size: PaperSize) -> Self {
        Self {
            output_dir: output_dir.into(),
            paper_size,
        }
    }

    /// Fresh file name so reports never overwrite each other
    fn report_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("insole_report_{}.pdf", Uuid::new_v4()))
    }

    /// Writes the text block and returns the y position (mm) below it
    fn add_text(
        &self,
        layer: &PdfLayerReference,
        doc: &PdfDocumentReference,
        assessment: &Assessment,
    ) -> Result<f32> {
        let (_, height_mm) = self.paper_size.dimensions_mm();
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

        let mut y = height_mm as f32 - MARGIN_MM;
        for line in report_lines(assessment) {
            if line.bold {
                // Extra space above headings
                y -= line.advance_mm() * 0.6;
            }
            y -= line.advance_mm();
            let font = if line.bold { &bold } else { &regular };
            layer.use_text(line.text, line.size, Mm(MARGIN_MM), Mm(y), font);
        }

        Ok(y)
    }

    fn embed_snapshot(&self, layer: &PdfLayerReference, snapshot: &RgbImage, top_mm: f32) -> Result<()> {
        let (width_px, height_px) = snapshot.dimensions();
        if width_px == 0 || height_px == 0 {
            return Ok(());
        }

        // Fit below the text: fixed width unless that would run past the bottom margin
        let available_mm = (top_mm - 10.0 - MARGIN_MM).max(10.0);
        let aspect = height_px as f32 / width_px as f32;
        let width_mm = SNAPSHOT_WIDTH_MM.min(available_mm / aspect);
        let height_mm = width_mm * aspect;
        let dpi = width_px as f32 / (width_mm / 25.4);

        // printpdf carries its own image crate version, so hand it the raw pixels
        let converted = printpdf::image_crate::RgbImage::from_raw(width_px, height_px, snapshot.as_raw().clone())
            .ok_or_else(|| anyhow::anyhow!("Failed to convert snapshot image"))?;
        let dynamic_img = printpdf::image_crate::DynamicImage::ImageRgb8(converted);
        let image = Image::from_dynamic_image(&dynamic_img);

        image.add_to_layer(
            layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(MARGIN_MM)),
                translate_y: Some(Mm(top_mm - 10.0 - height_mm)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );

        Ok(())
    }

    fn save(doc: PdfDocumentReference, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create report {}", path.display()))?;
        doc.save(&mut std::io::BufWriter::new(file))?;
        Ok(())
    }
}

impl ReportRenderer for PdfReportRenderer {
    fn render(&self, assessment: &Assessment, snapshot: &RgbImage) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create report directory {}", self.output_dir.display())
        })?;

        let (width_mm, height_mm) = self.paper_size.dimensions_mm();
        let (doc, page1, layer1) = PdfDocument::new(
            "Insole Recommendation Report",
            Mm(width_mm as f32),
            Mm(height_mm as f32),
            "Layer 1",
        );
        let layer = doc.get_page(page1).get_layer(layer1);

        let text_bottom = self.add_text(&layer, &doc, assessment)?;
        self.embed_snapshot(&layer, snapshot, text_bottom)?;

        let path = self.report_path();
        Self::save(doc, &path)?;

        info!("Report written to {}", path.display());
        Ok(path)
    }
}
