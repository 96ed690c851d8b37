use std::fmt;
use std::ops::Add;
use thiserror::Error;

use crate::plan::Violation;
use crate::source::{SourceId, SourceKind};

#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("{kind} input could not be read: {reason}")]
    Format { kind: SourceKind, reason: String },
    #[error("{what} index {index} is out of range (length {len})")]
    Index {
        what: &'static str,
        index: usize,
        len: usize,
    },
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    #[error("Plan validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("Source {0} is no longer available")]
    StaleSource(SourceId),
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("Operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, AssembleError>;

impl AssembleError {
    pub(crate) fn index(what: &'static str, index: usize, len: usize) -> Self {
        AssembleError::Index { what, index, len }
    }
}

/// Every policy violation found by a single `validate()` pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<Violation>);

impl ValidationErrors {
    pub fn violations(&self) -> &[Violation] {
        &self.0
    }

    pub fn contains(&self, violation: &Violation) -> bool {
        self.0.contains(violation)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        f.write_str(&messages.join("; "))
    }
}

/// Paper orientation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    /// Portrait: height > width (default for most paper sizes)
    #[default]
    Portrait,
    /// Landscape: width > height
    Landscape,
}

/// Standard paper sizes
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaperSize {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom { width_mm: f32, height_mm: f32 },
}

impl PaperSize {
    /// Get base dimensions (always portrait: width < height for standard sizes)
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PaperSize::A3 => (297.0, 420.0),
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::A5 => (148.0, 210.0),
            PaperSize::Letter => (215.9, 279.4),
            PaperSize::Legal => (215.9, 355.6),
            PaperSize::Tabloid => (279.4, 431.8),
            PaperSize::Custom {
                width_mm,
                height_mm,
            } => (width_mm, height_mm),
        }
    }

    /// Get dimensions with orientation applied
    pub fn dimensions_with_orientation(self, orientation: Orientation) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        match orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }

    /// Page size in points with orientation applied
    pub fn page_size(self, orientation: Orientation) -> PageSize {
        let (w, h) = self.dimensions_with_orientation(orientation);
        PageSize::new(crate::constants::mm_to_pt(w), crate::constants::mm_to_pt(h))
    }
}

/// How content is scaled when it does not match the page it is placed on
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScalingMode {
    /// Fit content to available space (preserve aspect ratio)
    #[default]
    Fit,
    /// Fill available space (may crop)
    Fill,
    /// Keep original size
    None,
    /// Stretch to fill (ignore aspect ratio)
    Stretch,
}

/// Clockwise page rotation, always one of the four quarter turns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Rotation {
    #[default]
    None,
    Clockwise90,
    Clockwise180,
    Clockwise270,
}

impl Rotation {
    pub fn degrees(self) -> i32 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 90,
            Rotation::Clockwise180 => 180,
            Rotation::Clockwise270 => 270,
        }
    }

    /// Build a rotation from any multiple of 90 degrees, negative values included.
    pub fn from_degrees(degrees: i64) -> Result<Self> {
        if degrees % 90 != 0 {
            return Err(AssembleError::InvalidValue(format!(
                "rotation must be a multiple of 90 degrees, got {degrees}"
            )));
        }
        Ok(match degrees.rem_euclid(360) {
            0 => Rotation::None,
            90 => Rotation::Clockwise90,
            180 => Rotation::Clockwise180,
            _ => Rotation::Clockwise270,
        })
    }

    /// Whether width and height trade places when displayed
    pub fn is_sideways(self) -> bool {
        matches!(self, Rotation::Clockwise90 | Rotation::Clockwise270)
    }
}

impl Add for Rotation {
    type Output = Rotation;

    fn add(self, rhs: Rotation) -> Rotation {
        match (self.degrees() + rhs.degrees()) % 360 {
            0 => Rotation::None,
            90 => Rotation::Clockwise90,
            180 => Rotation::Clockwise180,
            _ => Rotation::Clockwise270,
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Page width and height in points
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Intrinsic geometry of one source page.
///
/// PDF pages are measured in points (the MediaBox extent); image pages in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub rotation: Rotation,
}

impl PageGeometry {
    pub fn size(&self) -> PageSize {
        PageSize::new(self.width, self.height)
    }

    /// Size as a viewer shows it, after applying `/Rotate`
    pub fn displayed_size(&self) -> PageSize {
        if self.rotation.is_sideways() {
            PageSize::new(self.height, self.width)
        } else {
            self.size()
        }
    }

    /// MediaBox size in millimeters
    pub fn size_mm(&self) -> (f32, f32) {
        (
            crate::constants::pt_to_mm(self.width),
            crate::constants::pt_to_mm(self.height),
        )
    }
}
