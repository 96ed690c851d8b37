//! Page range parsing for split operations

use crate::types::*;
use std::fmt;

/// Inclusive range of 1-based page numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageRange {
    pub start: usize,
    pub end: usize,
}

impl PageRange {
    pub fn new(start: usize, end: usize) -> Result<Self> {
        if start == 0 {
            return Err(AssembleError::InvalidValue(
                "page numbers start at 1".to_string(),
            ));
        }
        if start > end {
            return Err(AssembleError::InvalidValue(format!(
                "range start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn single(page: usize) -> Result<Self> {
        Self::new(page, page)
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Zero-based page indices covered by the range
    pub fn indices(&self) -> std::ops::Range<usize> {
        self.start - 1..self.end
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Parse a range list like `"1-3, 5, 8-10"`.
///
/// Ranges are returned in the order written; overlaps are kept, so `"1-2, 2"`
/// yields page 2 twice when split.
pub fn parse_ranges(input: &str) -> Result<Vec<PageRange>> {
    let mut ranges = Vec::new();

    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let range = match part.split_once('-') {
            Some((start, end)) => PageRange::new(parse_page(start)?, parse_page(end)?)?,
            None => PageRange::single(parse_page(part)?)?,
        };
        ranges.push(range);
    }

    if ranges.is_empty() {
        return Err(AssembleError::InvalidValue(format!(
            "no page ranges in {:?}",
            input
        )));
    }
    Ok(ranges)
}

fn parse_page(text: &str) -> Result<usize> {
    let text = text.trim();
    text.parse()
        .map_err(|_| AssembleError::InvalidValue(format!("invalid page number: {:?}", text)))
}
