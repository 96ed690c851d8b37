//! Single-page sources backed by a JPEG file

use super::{PageBackend, SourceKind};
use crate::assemble::{CopyCache, ImageData, ObjectPool, PageContent};
use crate::types::*;
use image::ImageDecoder;
use image::codecs::jpeg::JpegDecoder;
use std::io::Cursor;
use std::sync::Arc;

#[derive(Debug)]
pub struct JpegBackend {
    image: ImageData,
}

impl JpegBackend {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
            return Err(format_error("missing JPEG start-of-image marker"));
        }

        let decoder = JpegDecoder::new(Cursor::new(bytes))
            .map_err(|e| format_error(&format!("invalid JPEG header: {e}")))?;
        let (width, height) = decoder.dimensions();
        if width == 0 || height == 0 {
            return Err(format_error("image has no pixels"));
        }

        // DCTDecode needs the component count as stored, not the decoded colour type
        let components = frame_components(bytes)
            .ok_or_else(|| format_error("no start-of-frame segment"))?;
        if !matches!(components, 1 | 3 | 4) {
            return Err(format_error(&format!(
                "unsupported component count {components}"
            )));
        }

        Ok(Self {
            image: ImageData {
                data: Arc::from(bytes),
                width,
                height,
                components,
            },
        })
    }
}

impl PageBackend for JpegBackend {
    fn kind(&self) -> SourceKind {
        SourceKind::Jpeg
    }

    fn geometries(&self) -> Vec<PageGeometry> {
        vec![PageGeometry {
            width: self.image.width as f32,
            height: self.image.height as f32,
            rotation: Rotation::None,
        }]
    }

    fn resolve(
        &self,
        _index: usize,
        _pool: &mut ObjectPool,
        _cache: &mut CopyCache,
    ) -> Result<PageContent> {
        Ok(PageContent::Image(self.image.clone()))
    }
}

fn format_error(reason: &str) -> AssembleError {
    AssembleError::Format {
        kind: SourceKind::Jpeg,
        reason: reason.to_string(),
    }
}

/// Component count from the first start-of-frame segment
fn frame_components(data: &[u8]) -> Option<u8> {
    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }

        let marker = data[pos + 1];
        pos += 2;

        // Fill bytes and standalone markers carry no length
        if marker == 0xFF || marker == 0x00 || marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            continue;
        }

        if matches!(
            marker,
            0xC0 | 0xC1 | 0xC2 | 0xC3 | 0xC5 | 0xC6 | 0xC7 | 0xC9 | 0xCA | 0xCB | 0xCD | 0xCE | 0xCF
        ) {
            // length(2) precision(1) height(2) width(2) components(1)
            return data.get(pos + 7).copied();
        }

        if pos + 2 > data.len() {
            break;
        }
        let length = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
        pos += length;
    }
    None
}
