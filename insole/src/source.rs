// Image acquisition
// Where the pressure image comes from: an uploaded file or a live sensor fetch

use anyhow::{Context, Result};
use image::RgbImage;
use insole_common::{decode_pressure, PressureMatrix};
use std::path::PathBuf;
use tracing::info;

use crate::config::SensorConfig;
use crate::heatmap::render_heatmap;
use crate::sensor::fetch_payload;

/// An acquired pressure image, plus the raw grid when it came from the sensor
pub struct Acquisition {
    pub image: RgbImage,
    pub pressure: Option<PressureMatrix>,
}

pub trait ImageSource {
    /// Human-readable origin, e.g. the file path or sensor address
    fn describe(&self) -> String;

    fn acquire(&self) -> Result<Acquisition>;
}

/// PNG or JPEG image on disk
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ImageSource for FileSource {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    fn acquire(&self) -> Result<Acquisition> {
        let image = image::open(&self.path)
            .with_context(|| format!("Failed to open image {}", self.path.display()))?
            .to_rgb8();

        info!("Loaded {}x{} image from {}", image.width(), image.height(), self.path.display());

        Ok(Acquisition {
            image,
            pressure: None,
        })
    }
}

/// Live fetch from the pressure sensor, rendered as a heatmap
pub struct SensorSource {
    config: SensorConfig,
    scale: u32,
}

impl SensorSource {
    pub fn new(config: SensorConfig, scale: u32) -> Self {
        Self { config, scale }
    }
}

impl ImageSource for SensorSource {
    fn describe(&self) -> String {
        format!("sensor {}", self.config.address())
    }

    fn acquire(&self) -> Result<Acquisition> {
        let payload = fetch_payload(&self.config).context("Sensor fetch failed")?;
        let pressure = decode_pressure(&payload).context("Sensor frame could not be decoded")?;

        info!("Decoded {}x{} pressure grid, peak {}", pressure.rows(), pressure.cols(), pressure.max());

        let image = render_heatmap(&pressure, self.scale);
        Ok(Acquisition {
            image,
            pressure: Some(pressure),
        })
    }
}
