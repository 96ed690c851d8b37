//! Content placement on output pages
//!
//! Used when content does not come with its own page: images, and pages whose
//! size was overridden in the plan.

use crate::types::ScalingMode;

/// Axis-aligned rectangle in PDF user space (origin bottom-left)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn top(&self) -> f32 {
        self.y + self.height
    }
}

/// Where content lands on the page
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Anchor {
    Center,
    /// Flush with the top-left corner
    TopLeft,
}

/// Final position and scale of content within an area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Rectangle the scaled content occupies
    pub content_rect: Rect,
    pub scale_x: f32,
    pub scale_y: f32,
}

impl Placement {
    /// `cm` operator arguments mapping a `src_width` x `src_height` box onto `content_rect`
    pub fn matrix(&self) -> [f32; 6] {
        [
            self.scale_x,
            0.0,
            0.0,
            self.scale_y,
            self.content_rect.x,
            self.content_rect.y,
        ]
    }
}

/// Scale `source_width` x `source_height` content into `area`.
pub fn place_content(
    area: &Rect,
    source_width: f32,
    source_height: f32,
    scaling_mode: ScalingMode,
    anchor: Anchor,
) -> Placement {
    let (scale_x, scale_y) = calculate_scale(
        source_width,
        source_height,
        area.width,
        area.height,
        scaling_mode,
    );

    let scaled_width = source_width * scale_x;
    let scaled_height = source_height * scale_y;

    let (x, y) = match anchor {
        Anchor::Center => (
            area.x + (area.width - scaled_width) / 2.0,
            area.y + (area.height - scaled_height) / 2.0,
        ),
        Anchor::TopLeft => (area.x, area.top() - scaled_height),
    };

    Placement {
        content_rect: Rect::new(x, y, scaled_width, scaled_height),
        scale_x,
        scale_y,
    }
}

/// Calculate horizontal and vertical scale for fitting source to target dimensions.
fn calculate_scale(
    src_width: f32,
    src_height: f32,
    target_width: f32,
    target_height: f32,
    mode: ScalingMode,
) -> (f32, f32) {
    let scale_w = target_width / src_width;
    let scale_h = target_height / src_height;
    match mode {
        ScalingMode::Fit => {
            let scale = scale_w.min(scale_h);
            (scale, scale)
        }
        ScalingMode::Fill => {
            let scale = scale_w.max(scale_h);
            (scale, scale)
        }
        ScalingMode::None => (1.0, 1.0),
        ScalingMode::Stretch => (scale_w, scale_h),
    }
}
