use crate::{JobId, ToolCommand, ToolRequest, ToolUpdate};
use pdf_assemble::{
    AssembleError, Assembler, AssemblyPlan, CancelFlag, EncodeOptions, IMAGES_FILE_NAME,
    MERGED_FILE_NAME, OutputFormat, PageSource, SourceId, SourceStore, images_plan, load_source,
    merge_plan, process_with, rotate_plan, rotated_file_name, save_files, split_plan,
};
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Why a tool request could not be turned into a plan
#[derive(Error, Debug)]
enum RequestError {
    #[error("Source {0} is not open")]
    UnknownSource(SourceId),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
}

/// What a task on the worker's `JoinSet` hands back when it ends
enum Finished {
    Job(JobId),
    Opened {
        path: PathBuf,
        result: Result<PageSource, AssembleError>,
    },
}

struct Worker {
    store: SourceStore,
    jobs: HashMap<JobId, CancelFlag>,
    update_tx: mpsc::UnboundedSender<ToolUpdate>,
}

/// Async worker task that processes tool commands and sends updates.
///
/// Opening files and running jobs both happen on tasks next to command
/// handling, so a `Cancel` reaches a job that is still assembling even while
/// a large file loads. Returns once the command channel closes and all
/// pending tasks have finished.
pub async fn worker_task(
    mut command_rx: mpsc::UnboundedReceiver<ToolCommand>,
    update_tx: mpsc::UnboundedSender<ToolUpdate>,
) {
    let mut worker = Worker {
        store: SourceStore::new(),
        jobs: HashMap::new(),
        update_tx,
    };
    let mut running: JoinSet<Finished> = JoinSet::new();

    loop {
        tokio::select! {
            cmd = command_rx.recv() => match cmd {
                Some(cmd) => worker.process_command(cmd, &mut running),
                None => break,
            },
            Some(finished) = running.join_next(), if !running.is_empty() => {
                worker.finish(finished);
            }
        }
    }

    while let Some(finished) = running.join_next().await {
        worker.finish(finished);
    }
    log::debug!("Worker stopped");
}

impl Worker {
    fn process_command(&mut self, cmd: ToolCommand, running: &mut JoinSet<Finished>) {
        log::debug!("Processing {:?}", cmd);
        match cmd {
            ToolCommand::Open { path } => {
                running.spawn(async move {
                    let result = load_source(&path).await;
                    Finished::Opened { path, result }
                });
            }
            ToolCommand::Close { source } => self.handle_close(source),
            ToolCommand::Run {
                job,
                request,
                options,
                output_dir,
            } => self.handle_run(job, request, options, output_dir, running),
            ToolCommand::Cancel { job } => match self.jobs.get(&job) {
                Some(flag) => flag.cancel(),
                None => log::debug!("Job {:?} is not running, nothing to cancel", job),
            },
        }
    }

    fn handle_opened(&mut self, path: PathBuf, result: Result<PageSource, AssembleError>) {
        match result {
            Ok(source) => {
                let source = self.store.insert(source);
                let _ = self.update_tx.send(ToolUpdate::Opened {
                    source: source.id(),
                    name: source.name().to_string(),
                    kind: source.kind(),
                    page_count: source.page_count(),
                });
            }
            Err(e) => self.report(None, format!("Failed to open {}: {}", path.display(), e)),
        }
    }

    fn handle_close(&mut self, source: SourceId) {
        if self.store.close(source) {
            let _ = self.update_tx.send(ToolUpdate::Closed { source });
        } else {
            self.report(None, format!("Source {} is not open", source));
        }
    }

    fn handle_run(
        &mut self,
        job: JobId,
        request: ToolRequest,
        options: EncodeOptions,
        output_dir: PathBuf,
        running: &mut JoinSet<Finished>,
    ) {
        if self.jobs.contains_key(&job) {
            self.report(Some(job), format!("Job {:?} is already running", job));
            return;
        }

        let (plan, output_name) = match self.build_plan(request) {
            Ok(built) => built,
            Err(e) => {
                self.report(Some(job), e.to_string());
                return;
            }
        };

        let flag = CancelFlag::new();
        self.jobs.insert(job, flag.clone());

        let progress_tx = self.update_tx.clone();
        let assembler = Assembler::new()
            .with_cancel(flag)
            .with_progress(move |current, total| {
                let _ = progress_tx.send(ToolUpdate::Progress {
                    job,
                    current,
                    total,
                });
            });

        let work = async move {
            let files =
                process_with(assembler, plan, OutputFormat::Pdf, options, output_name).await?;
            save_files(&files, &output_dir).await
        };
        running.spawn(supervise(job, work, self.update_tx.clone()));
    }

    /// Plan for `request` plus the file name used when it yields one document
    fn build_plan(&self, request: ToolRequest) -> Result<(AssemblyPlan, String), RequestError> {
        match request {
            ToolRequest::Merge { sources } => {
                let sources = self.sources(&sources)?;
                Ok((merge_plan(&sources)?, MERGED_FILE_NAME.to_string()))
            }
            ToolRequest::Split { source, mode } => {
                let source = self.source(source)?;
                // Split output is always named per page or per part
                Ok((split_plan(&source, &mode)?, String::new()))
            }
            ToolRequest::Rotate { source, rotation } => {
                let source = self.source(source)?;
                let name = rotated_file_name(source.name(), rotation);
                Ok((rotate_plan(&source, rotation)?, name))
            }
            ToolRequest::ImagesToPdf { sources } => {
                let sources = self.sources(&sources)?;
                Ok((images_plan(&sources)?, IMAGES_FILE_NAME.to_string()))
            }
        }
    }

    fn source(&self, id: SourceId) -> Result<Arc<PageSource>, RequestError> {
        self.store.get(id).ok_or(RequestError::UnknownSource(id))
    }

    fn sources(&self, ids: &[SourceId]) -> Result<Vec<Arc<PageSource>>, RequestError> {
        ids.iter().map(|&id| self.source(id)).collect()
    }

    fn finish(&mut self, finished: Result<Finished, tokio::task::JoinError>) {
        match finished {
            Ok(Finished::Job(job)) => {
                self.jobs.remove(&job);
            }
            Ok(Finished::Opened { path, result }) => self.handle_opened(path, result),
            Err(e) => log::error!("Worker task failed: {}", e),
        }
    }

    fn report(&self, job: Option<JobId>, message: String) {
        log::error!("{}", message);
        let _ = self.update_tx.send(ToolUpdate::Error { job, message });
    }
}

/// Run a job on its own task and report how it ended.
///
/// Always yields the job id, even when the job panics, so the worker can
/// release it.
async fn supervise<F>(
    job: JobId,
    work: F,
    update_tx: mpsc::UnboundedSender<ToolUpdate>,
) -> Finished
where
    F: Future<Output = Result<Vec<PathBuf>, AssembleError>> + Send + 'static,
{
    let update = match tokio::spawn(work).await {
        Ok(Ok(files)) => {
            log::info!("Job {:?} wrote {} file(s)", job, files.len());
            ToolUpdate::Completed { job, files }
        }
        Ok(Err(AssembleError::Cancelled)) => ToolUpdate::Cancelled { job },
        Ok(Err(e)) => {
            log::error!("Job {:?} failed: {}", job, e);
            ToolUpdate::Error {
                job: Some(job),
                message: e.to_string(),
            }
        }
        Err(e) => {
            log::error!("Job {:?} stopped unexpectedly: {}", job, e);
            ToolUpdate::Error {
                job: Some(job),
                message: format!("Job stopped unexpectedly: {}", e),
            }
        }
    };
    let _ = update_tx.send(update);
    Finished::Job(job)
}
