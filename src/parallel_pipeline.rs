// THEORY:
// The `parallel_pipeline` module is the batch driver that surrounds the metric engine.
// Every image is an independent, pure computation, so a batch is embarrassingly
// parallel: a dispatcher hands image paths round-robin to a fixed pool of workers,
// and each worker decodes, analyzes and persists one image at a time.
//
// Key architectural principles:
// 1.  **One image per task**: Tasks share nothing but a cloned `ComplexityAnalyzer`
//     (read-only config). No locks are needed around images or records.
// 2.  **CPU work off the async threads**: Decoding and analysis are blocking, so each
//     worker runs them on `spawn_blocking` and awaits the result.
// 3.  **Skip and continue**: A failing image becomes a `BatchFailure` in the summary.
//     It never stops the remaining images.
// 4.  **One writer per record**: Record paths are assigned before dispatch. Images that
//     share a stem get `<file name>_metrics.json`, so no two workers write one file.

use crate::core_modules::utils::image_helper::{
    display_name, load_raster, qualified_record_path, record_path, save_record,
};
use crate::error::{Error, Result};
use crate::pipeline::ComplexityAnalyzer;
use futures::future::join_all;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};

pub const DEFAULT_INPUT_DIR: &str = "data/raw";
pub const DEFAULT_OUTPUT_DIR: &str = "data/processed";
pub const DEFAULT_REPORT_DIR: &str = "data/output";
pub const SUPPORTED_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"];

/// Configuration for a batch run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Where the `_metrics.json` records are written.
    pub output_dir: PathBuf,
    /// Number of concurrent workers.
    pub workers: usize,
    /// Keep records that already exist instead of recomputing them.
    pub skip_existing: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            workers: num_cpus::get(),
            skip_existing: false,
        }
    }
}

/// What happened to one image that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageOutcome {
    Written { image: PathBuf, record: PathBuf },
    Skipped { image: PathBuf, record: PathBuf },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    pub image: PathBuf,
    pub reason: String,
}

/// Result of a whole batch, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failures: Vec<BatchFailure>,
}

impl BatchSummary {
    pub fn processed(&self) -> usize {
        self.written.len() + self.skipped.len()
    }
}

pub struct AnalysisTask {
    pub image_path: PathBuf,
    pub record_path: PathBuf,
    pub result_sender: oneshot::Sender<Result<ImageOutcome>>,
}

pub struct WorkerPool {
    task_sender: mpsc::UnboundedSender<AnalysisTask>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns the dispatcher and workers. Must be called inside a tokio runtime.
    pub fn new(analyzer: ComplexityAnalyzer, config: BatchConfig) -> Self {
        let worker_count = config.workers.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<AnalysisTask>();
        let mut workers = Vec::with_capacity(worker_count);

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<AnalysisTask>())
            .unzip();

        // Dispatcher: round-robin over the workers
        tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                if let Err(mpsc::error::SendError(task)) = worker_senders[worker_idx].send(task) {
                    let _ = task
                        .result_sender
                        .send(Err(Error::WorkerUnavailable("worker stopped")));
                }
                worker_idx = (worker_idx + 1) % worker_count;
            }
        });

        for mut worker_receiver in worker_receivers {
            let worker_analyzer = analyzer.clone();
            let worker_config = config.clone();

            let worker = tokio::spawn(async move {
                while let Some(task) = worker_receiver.recv().await {
                    let outcome = Self::process_image_worker(
                        &worker_analyzer,
                        &worker_config,
                        task.image_path,
                        task.record_path,
                    )
                    .await;
                    let _ = task.result_sender.send(outcome);
                }
            });

            workers.push(worker);
        }

        Self { task_sender, workers }
    }

    async fn process_image_worker(
        analyzer: &ComplexityAnalyzer,
        config: &BatchConfig,
        image_path: PathBuf,
        record_path: PathBuf,
    ) -> Result<ImageOutcome> {
        let analyzer = analyzer.clone();
        let config = config.clone();
        tokio::task::spawn_blocking(move || {
            process_image(&analyzer, &config, &image_path, record_path)
        })
        .await
        .map_err(|_| Error::WorkerUnavailable("analysis task panicked"))?
    }

    pub async fn process_image(
        &self,
        image_path: PathBuf,
        record_path: PathBuf,
    ) -> Result<ImageOutcome> {
        let (result_sender, result_receiver) = oneshot::channel();

        let task = AnalysisTask {
            image_path,
            record_path,
            result_sender,
        };

        self.task_sender
            .send(task)
            .map_err(|_| Error::WorkerUnavailable("failed to send task to worker pool"))?;

        result_receiver
            .await
            .map_err(|_| Error::WorkerUnavailable("failed to receive result from worker"))?
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Closes the task queue and waits for every worker to drain.
    pub async fn shutdown(self) {
        drop(self.task_sender);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

/// Decodes, analyzes and persists a single image to `record`. Blocking.
pub fn process_image(
    analyzer: &ComplexityAnalyzer,
    config: &BatchConfig,
    image_path: &Path,
    record: PathBuf,
) -> Result<ImageOutcome> {
    if config.skip_existing && record.exists() {
        return Ok(ImageOutcome::Skipped {
            image: image_path.to_path_buf(),
            record,
        });
    }

    let raster = load_raster(image_path)?;
    let filename = display_name(image_path);
    let view = raster.view().map_err(|source| Error::shape(&filename, source))?;
    let metrics = analyzer.analyze(&view, &filename)?;
    save_record(&metrics, &record)?;

    Ok(ImageOutcome::Written {
        image: image_path.to_path_buf(),
        record,
    })
}

/// Assigns a record path to every image, in input order.
///
/// Images whose stems are unique keep `<stem>_metrics.json`. Images that share a stem
/// fall back to `<file name>_metrics.json`. An image whose path is still claimed by an
/// earlier one (the same file listed twice, or equal names in different directories)
/// gets a `RecordCollision` instead.
pub fn plan_records(images: &[PathBuf], output_dir: &Path) -> Vec<Result<PathBuf>> {
    let mut stem_counts: HashMap<PathBuf, usize> = HashMap::new();
    for image in images {
        *stem_counts.entry(record_path(output_dir, image)).or_default() += 1;
    }

    let mut owners: HashMap<PathBuf, PathBuf> = HashMap::new();
    images
        .iter()
        .map(|image| {
            let by_stem = record_path(output_dir, image);
            let record = if stem_counts.get(&by_stem).copied().unwrap_or(0) > 1 {
                qualified_record_path(output_dir, image)
            } else {
                by_stem
            };
            match owners.get(&record) {
                Some(owner) => Err(Error::RecordCollision {
                    image: image.clone(),
                    record,
                    owner: owner.clone(),
                }),
                None => {
                    owners.insert(record.clone(), image.clone());
                    Ok(record)
                }
            }
        })
        .collect()
}

/// Runs whole batches through a `WorkerPool`.
pub struct BatchDriver {
    worker_pool: WorkerPool,
    output_dir: PathBuf,
}

impl BatchDriver {
    pub fn new(analyzer: ComplexityAnalyzer, config: BatchConfig) -> Self {
        let output_dir = config.output_dir.clone();
        Self {
            worker_pool: WorkerPool::new(analyzer, config),
            output_dir,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_pool.worker_count()
    }

    pub async fn run(&self, images: Vec<PathBuf>) -> BatchSummary {
        tracing::info!(
            images = images.len(),
            workers = self.worker_count(),
            "analyzing images"
        );

        let records = plan_records(&images, &self.output_dir);
        let pending = images.into_iter().zip(records).map(|(image, record)| async move {
            let outcome = match record {
                Ok(record) => self.worker_pool.process_image(image.clone(), record).await,
                Err(err) => Err(err),
            };
            (image, outcome)
        });

        let mut summary = BatchSummary::default();
        for (image, outcome) in join_all(pending).await {
            match outcome {
                Ok(ImageOutcome::Written { record, .. }) => {
                    tracing::info!(
                        image = %image.display(),
                        record = %record.display(),
                        "metrics written"
                    );
                    summary.written.push(record);
                }
                Ok(ImageOutcome::Skipped { record, .. }) => {
                    tracing::info!(image = %image.display(), "metrics already exist, skipping");
                    summary.skipped.push(record);
                }
                Err(err) => {
                    tracing::error!(image = %image.display(), "failed to analyze: {err}");
                    summary.failures.push(BatchFailure {
                        image,
                        reason: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            written = summary.written.len(),
            skipped = summary.skipped.len(),
            failed = summary.failures.len(),
            "batch complete"
        );
        summary
    }

    pub async fn shutdown(self) {
        self.worker_pool.shutdown().await;
    }
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Expands directories (one level deep) into the image files they contain. Files are
/// passed through as given; directory listings are sorted. A missing input is an error.
pub fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found = Vec::new();
            for entry in std::fs::read_dir(input)? {
                let path = entry?.path();
                if path.is_file() && is_supported_image(&path) {
                    found.push(path);
                }
            }
            found.sort();
            images.extend(found);
        } else if input.exists() {
            images.push(input.clone());
        } else {
            return Err(Error::InputNotFound(input.clone()));
        }
    }
    Ok(images)
}

/// Creates the raw, processed and output data directories under `root`.
pub fn bootstrap_directories(root: &Path) -> Result<Vec<PathBuf>> {
    let dirs: Vec<PathBuf> = [DEFAULT_INPUT_DIR, DEFAULT_OUTPUT_DIR, DEFAULT_REPORT_DIR]
        .iter()
        .map(|dir| root.join(dir))
        .collect();
    for dir in &dirs {
        std::fs::create_dir_all(dir)?;
    }
    Ok(dirs)
}
