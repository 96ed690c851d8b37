use crate::constants::DEFAULT_PDF_VERSION;
use crate::types::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Page size used for pages built from images
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ImagePageSize {
    /// Place each image on a sheet of paper
    Paper {
        size: PaperSize,
        orientation: Orientation,
    },
    /// One point per pixel, no margins
    MatchImage,
}

impl Default for ImagePageSize {
    fn default() -> Self {
        ImagePageSize::Paper {
            size: PaperSize::A4,
            orientation: Orientation::Portrait,
        }
    }
}

/// Output encoding configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EncodeOptions {
    /// Version written into the PDF header
    pub pdf_version: String,
    /// Flate-compress streams on output (JPEG data is always left as-is)
    pub compress: bool,

    // Image pages
    pub image_page: ImagePageSize,
    pub image_scaling: ScalingMode,
    /// Center images on the page instead of anchoring them top-left
    pub center_images: bool,

    /// Scaling for pages whose size was overridden in the plan
    pub override_scaling: ScalingMode,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            pdf_version: DEFAULT_PDF_VERSION.to_string(),
            compress: true,
            image_page: ImagePageSize::default(),
            image_scaling: ScalingMode::Fit,
            center_images: false,
            override_scaling: ScalingMode::Fit,
        }
    }
}

impl EncodeOptions {
    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options: Self = serde_json::from_slice(&bytes)
            .map_err(|e| AssembleError::Config(format!("Failed to parse config: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AssembleError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        let valid_version = match self.pdf_version.split_once('.') {
            Some((major, minor)) => {
                matches!(major, "1" | "2")
                    && !minor.is_empty()
                    && minor.chars().all(|c| c.is_ascii_digit())
            }
            None => false,
        };
        if !valid_version {
            return Err(AssembleError::Config(format!(
                "PDF version must look like 1.7 or 2.0, got {:?}",
                self.pdf_version
            )));
        }

        if let ImagePageSize::Paper {
            size: PaperSize::Custom {
                width_mm,
                height_mm,
            },
            ..
        } = self.image_page
        {
            if !(width_mm > 0.0 && height_mm > 0.0) {
                return Err(AssembleError::Config(format!(
                    "Custom paper size must be positive, got {}x{} mm",
                    width_mm, height_mm
                )));
            }
        }

        Ok(())
    }
}
