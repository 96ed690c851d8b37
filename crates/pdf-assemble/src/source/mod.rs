//! Page sources - read-only views of uploaded documents
//!
//! A [`PageSource`] is parsed once from raw bytes and never changes afterwards,
//! so it can be shared between any number of plans and assemblies through an
//! `Arc`. Format specifics live behind the [`PageBackend`] trait.

mod jpeg;
mod pdf;

pub use jpeg::JpegBackend;
pub use pdf::PdfBackend;
pub(crate) use pdf::extract_number;

use crate::assemble::{CopyCache, ObjectPool, PageContent};
use crate::types::*;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque handle identifying one loaded source for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceId(u64);

impl SourceId {
    fn next() -> Self {
        SourceId(NEXT_SOURCE_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Declared format of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SourceKind {
    Pdf,
    Jpeg,
}

impl SourceKind {
    /// Map a MIME type (`application/pdf`, `image/jpeg`) to a kind
    pub fn from_mime(mime: &str) -> Result<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "application/pdf" => Ok(SourceKind::Pdf),
            "image/jpeg" | "image/jpg" => Ok(SourceKind::Jpeg),
            other => Err(AssembleError::Format {
                kind: SourceKind::Pdf,
                reason: format!("unsupported input type {other:?}"),
            }),
        }
    }

    /// Guess the kind from a file extension
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        ext.parse().map_err(|_| AssembleError::Format {
            kind: SourceKind::Pdf,
            reason: format!("cannot tell the format of {}", path.display()),
        })
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            SourceKind::Pdf => "application/pdf",
            SourceKind::Jpeg => "image/jpeg",
        }
    }
}

impl FromStr for SourceKind {
    type Err = AssembleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(SourceKind::Pdf),
            "jpg" | "jpeg" => Ok(SourceKind::Jpeg),
            _ => Self::from_mime(s),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Pdf => f.write_str("PDF"),
            SourceKind::Jpeg => f.write_str("JPEG"),
        }
    }
}

/// Format-specific half of a [`PageSource`].
///
/// Implementations must be immutable after construction: `resolve` may be
/// called concurrently from several assemblies.
pub trait PageBackend: Send + Sync + fmt::Debug {
    fn kind(&self) -> SourceKind;

    /// Geometry of every page, in page order
    fn geometries(&self) -> Vec<PageGeometry>;

    /// Copy page `index` into `pool`, returning the self-contained page content.
    ///
    /// `cache` maps backend object ids to ids already copied into `pool`, so
    /// resources shared by several pages are copied once per pool.
    fn resolve(
        &self,
        index: usize,
        pool: &mut ObjectPool,
        cache: &mut CopyCache,
    ) -> Result<PageContent>;
}

/// A loaded input document exposed as an ordered list of pages
#[derive(Debug)]
pub struct PageSource {
    id: SourceId,
    name: String,
    pages: Vec<PageGeometry>,
    backend: Box<dyn PageBackend>,
}

impl PageSource {
    /// Parse `bytes` as the declared `kind`.
    ///
    /// Fails with [`AssembleError::Format`] when the bytes are not a readable
    /// document of that kind. An image yields a one-page source.
    pub fn open(name: impl Into<String>, bytes: &[u8], kind: SourceKind) -> Result<Self> {
        let backend: Box<dyn PageBackend> = match kind {
            SourceKind::Pdf => Box::new(PdfBackend::parse(bytes)?),
            SourceKind::Jpeg => Box::new(JpegBackend::parse(bytes)?),
        };
        Ok(Self::from_backend(name, backend))
    }

    /// Wrap an already constructed backend
    pub fn from_backend(name: impl Into<String>, backend: Box<dyn PageBackend>) -> Self {
        let source = Self {
            id: SourceId::next(),
            name: name.into(),
            pages: backend.geometries(),
            backend,
        };
        log::debug!(
            "Opened {} source {} {:?} with {} page(s)",
            source.kind(),
            source.id,
            source.name,
            source.pages.len()
        );
        source
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SourceKind {
        self.backend.kind()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Width, height and intrinsic rotation of page `index`
    pub fn page_geometry(&self, index: usize) -> Result<PageGeometry> {
        self.pages
            .get(index)
            .copied()
            .ok_or_else(|| AssembleError::index("page", index, self.pages.len()))
    }

    pub fn pages(&self) -> impl Iterator<Item = &PageGeometry> {
        self.pages.iter()
    }

    pub(crate) fn resolve(
        &self,
        index: usize,
        pool: &mut ObjectPool,
        cache: &mut CopyCache,
    ) -> Result<PageContent> {
        if index >= self.pages.len() {
            return Err(AssembleError::index("page", index, self.pages.len()));
        }
        self.backend.resolve(index, pool, cache)
    }
}
