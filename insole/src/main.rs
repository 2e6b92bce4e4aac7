use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use insole_common::LegShape;
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod assessment;
mod classification;
mod config;
mod heatmap;
mod report;
mod sensor;
mod source;

use assessment::assess;
use classification::ArchClassifier;
use config::AppConfig;
use report::{PdfReportRenderer, ReportRenderer};
use source::{FileSource, ImageSource, SensorSource};

/// Recommend an insole from a foot-pressure image and the user's leg shape
#[derive(Parser, Debug)]
#[command(name = "insole")]
#[command(about = "Classify foot-pressure images and recommend an insole", long_about = None)]
#[command(group(ArgGroup::new("source").required(true).args(["input", "sensor"])))]
struct Args {
    /// Foot-pressure image (PNG or JPEG)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Fetch a live frame from the pressure sensor instead of reading a file
    #[arg(long)]
    sensor: bool,

    /// Leg shape
    #[arg(short, long, value_enum)]
    leg: LegArg,

    /// Hallux valgus is present (skips image classification)
    #[arg(long)]
    hallux_valgus: bool,

    /// Write a PDF report
    #[arg(short, long)]
    report: bool,

    /// Directory for reports and debug images
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Config file (defaults to ./insole.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the assessment as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug mode (save intermediate masks and footprint boxes)
    #[arg(short, long)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum LegArg {
    Bowleg,
    KnockKnee,
    Normal,
}

impl From<LegArg> for LegShape {
    fn from(arg: LegArg) -> Self {
        match arg {
            LegArg::Bowleg => LegShape::Bowleg,
            LegArg::KnockKnee => LegShape::KnockKnee,
            LegArg::Normal => LegShape::Normal,
        }
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    source: String,
    #[serde(flatten)]
    assessment: &'a insole_common::Assessment,
    report: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if args.report {
        config.report.enabled = true;
    }
    if let Some(dir) = &args.output_dir {
        config.report.output_dir = dir.clone();
    }

    run(&args, &config)
}

fn run(args: &Args, config: &AppConfig) -> Result<()> {
    let human = !args.json;
    let leg: LegShape = args.leg.into();

    let source: Box<dyn ImageSource> = match &args.input {
        Some(path) => Box::new(FileSource::new(path)),
        None => Box::new(SensorSource::new(config.sensor.clone(), config.heatmap.scale)),
    };

    if human {
        println!("Insole Advisor");
        println!("==============");
        println!("Source: {}", source.describe());
        println!("Leg shape: {}", leg);
        println!("Hallux valgus: {}", if args.hallux_valgus { "yes" } else { "no" });
        println!();
        println!("Step 1: Acquiring pressure image...");
    }
    let acquisition = source.acquire()?;

    let debug_prefix = if args.debug {
        std::fs::create_dir_all(&config.report.output_dir).with_context(|| {
            format!("Failed to create output directory {}", config.report.output_dir.display())
        })?;
        Some(config.report.output_dir.join("insole_debug").to_string_lossy().into_owned())
    } else {
        None
    };

    // Sensor frames have no file on disk, so keep the rendered heatmap for inspection
    if let (Some(prefix), Some(_)) = (&debug_prefix, &acquisition.pressure) {
        let heatmap_path = format!("{}_heatmap.png", prefix);
        acquisition.image.save(&heatmap_path)?;
        if human {
            println!("Saved heatmap to: {}", heatmap_path);
        }
    }

    if human {
        println!("Step 2: Classifying arch...");
    }
    let classifier = ArchClassifier::new(config.classifier);
    let outcome = assess(&acquisition.image, args.hallux_valgus, leg, &classifier);

    if let (true, Some(result)) = (human, &outcome.classification) {
        println!(
            "  {} footprint(s), {} red + {} yellow pixels over {} px² of footprint",
            result.footprints.len(),
            result.red_pixels,
            result.yellow_pixels,
            result.footprint_area
        );
    }

    if let (Some(prefix), Some(result)) = (&debug_prefix, &outcome.classification) {
        let written = classification::save_debug_images(&acquisition.image, result, prefix)?;
        if human {
            for path in written {
                println!("Saved debug image to: {}", path);
            }
        }
    }

    let renderer: Option<Box<dyn ReportRenderer>> = config.report.enabled.then(|| {
        Box::new(PdfReportRenderer::new(&config.report.output_dir, config.report.paper))
            as Box<dyn ReportRenderer>
    });

    let report_path = match &renderer {
        Some(renderer) => {
            if human {
                println!("Step 3: Writing report ({})...", config.report.paper);
            }
            Some(renderer.render(&outcome.assessment, &acquisition.image)?)
        }
        None => None,
    };

    if human {
        println!();
        println!("{}", assessment::render_text(&outcome.assessment));
        if let Some(path) = &report_path {
            println!();
            println!("✓ Report generated: {}", path.display());
        }
    } else {
        let output = JsonOutput {
            source: source.describe(),
            assessment: &outcome.assessment,
            report: report_path,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use insole_common::SENSOR_FRAME_LEN;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    #[test]
    fn test_requires_a_source() {
        assert!(Args::try_parse_from(["insole", "--leg", "normal"]).is_err());
    }

    #[test]
    fn test_input_and_sensor_conflict() {
        let result = Args::try_parse_from([
            "insole", "--input", "foot.png", "--sensor", "--leg", "normal",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_leg_values() {
        let args = Args::try_parse_from(["insole", "--sensor", "--leg", "knock-knee"]).unwrap();
        assert!(args.sensor);
        assert_eq!(LegShape::from(args.leg), LegShape::KnockKnee);
        assert!(Args::try_parse_from(["insole", "--sensor", "--leg", "sideways"]).is_err());
    }

    #[test]
    fn test_run_with_report_and_debug() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("foot.png");
        let mut image = RgbImage::from_pixel(80, 80, Rgb([0, 0, 0]));
        for y in 10..50 {
            for x in 10..50 {
                image.put_pixel(x, y, Rgb([255, 0, 0]));
            }
        }
        image.save(&image_path).unwrap();

        let out_dir = dir.path().join("out");
        let argv: [&std::ffi::OsStr; 10] = [
            "insole".as_ref(),
            "--input".as_ref(),
            image_path.as_os_str(),
            "--leg".as_ref(),
            "bowleg".as_ref(),
            "--report".as_ref(),
            "--debug".as_ref(),
            "--json".as_ref(),
            "--output-dir".as_ref(),
            out_dir.as_os_str(),
        ];
        let args = Args::try_parse_from(argv).unwrap();

        let mut config = AppConfig::default();
        config.report.enabled = args.report;
        config.report.output_dir = out_dir.clone();

        run(&args, &config).unwrap();

        let names: Vec<String> = std::fs::read_dir(&out_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().any(|n| n.starts_with("insole_report_") && n.ends_with(".pdf")));
        assert!(names.contains(&"insole_debug_footprints.png".to_string()));
        assert!(!names.contains(&"insole_debug_heatmap.png".to_string()));
    }

    #[test]
    fn test_run_sensor_debug_saves_heatmap() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 3];
            stream.read_exact(&mut request).unwrap();
            stream.write_all(&vec![0u8; SENSOR_FRAME_LEN]).unwrap();
        });

        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("out");
        let argv: [&std::ffi::OsStr; 8] = [
            "insole".as_ref(),
            "--sensor".as_ref(),
            "--leg".as_ref(),
            "normal".as_ref(),
            "--debug".as_ref(),
            "--json".as_ref(),
            "--output-dir".as_ref(),
            out_dir.as_os_str(),
        ];
        let args = Args::try_parse_from(argv).unwrap();

        let mut config = AppConfig::default();
        config.sensor.host = "127.0.0.1".to_string();
        config.sensor.port = port;
        config.report.output_dir = out_dir.clone();

        run(&args, &config).unwrap();
        server.join().unwrap();

        let heatmap = image::open(out_dir.join("insole_debug_heatmap.png")).unwrap().to_rgb8();
        assert_eq!(heatmap.dimensions(), (480, 480));
        assert!(out_dir.join("insole_debug_footprints.png").exists());
        assert!(!out_dir.read_dir().unwrap().any(|entry| {
            entry.unwrap().file_name().to_string_lossy().ends_with(".pdf")
        }));
    }
}
