use std::path::PathBuf;

mod worker;

pub use worker::worker_task;

// Re-export types from the engine crate
pub use pdf_assemble::{EncodeOptions, Rotation, SourceId, SourceKind, SplitMode};

/// Caller-chosen handle for one run of a tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(pub u64);

/// The tool to run and the open sources it works on
#[derive(Debug, Clone)]
pub enum ToolRequest {
    Merge {
        sources: Vec<SourceId>,
    },
    Split {
        source: SourceId,
        mode: SplitMode,
    },
    Rotate {
        source: SourceId,
        rotation: Rotation,
    },
    ImagesToPdf {
        sources: Vec<SourceId>,
    },
}

/// Commands sent from UI to worker
#[derive(Debug)]
pub enum ToolCommand {
    /// Load a file; the kind comes from its extension
    Open {
        path: PathBuf,
    },
    Close {
        source: SourceId,
    },
    Run {
        job: JobId,
        request: ToolRequest,
        options: EncodeOptions,
        output_dir: PathBuf,
    },
    /// Stop a running job between pages
    Cancel {
        job: JobId,
    },
}

/// Updates sent from worker to UI
#[derive(Debug, Clone)]
pub enum ToolUpdate {
    Opened {
        source: SourceId,
        name: String,
        kind: SourceKind,
        page_count: usize,
    },
    Closed {
        source: SourceId,
    },
    Progress {
        job: JobId,
        current: usize,
        total: usize,
    },
    Completed {
        job: JobId,
        files: Vec<PathBuf>,
    },
    Cancelled {
        job: JobId,
    },
    Error {
        job: Option<JobId>,
        message: String,
    },
}
