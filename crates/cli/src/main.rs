use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use sightline_core::catalog::domain::model_files;
use sightline_core::catalog::domain::model_record::ModelRecord;
use sightline_core::catalog::domain::model_repository::{
    ModelPaths, ModelRepository, RepositoryError,
};
use sightline_core::catalog::domain::selection::{normalize_selection, SelectionStore};
use sightline_core::catalog::infrastructure::builtin_assets::{self, ProgressFn};
use sightline_core::catalog::infrastructure::file_model_repository::FileModelRepository;
use sightline_core::catalog::infrastructure::json_selection_store::JsonSelectionStore;
use sightline_core::detection::domain::detection::RawDetection;
use sightline_core::detection::domain::detection_engine::{
    DetectionEngine, EngineError, EngineLoader,
};
use sightline_core::pipeline::frame_scheduler::Admission;
use sightline_core::pipeline::session_controller::{DetectionSession, SessionConfig, SessionEvent};
use sightline_core::shared::bounding_box::BoundingBox;
use sightline_core::shared::constants::BUILT_IN_MODEL_ID;
use sightline_core::shared::frame::Frame;
use sightline_core::shared::viewport::{oriented_size, ViewportTransform};

/// Manage detection models and exercise live detection sessions.
#[derive(Parser)]
#[command(name = "sightline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the models in the local catalog.
    List,

    /// Validate and import a darknet model triple into the catalog.
    Import(ImportArgs),

    /// Delete an imported model from the catalog.
    Delete {
        /// Model id as shown by `list`.
        id: Uuid,
    },

    /// Persist which model detection sessions start with.
    Select {
        /// Model id as shown by `list`, or the built-in model's name.
        model: String,
    },

    /// Download the built-in model files into the catalog.
    FetchBuiltin,

    /// Validate a darknet model triple without importing it.
    Validate(FilesArgs),

    /// Show how frames from an image would map onto a viewport.
    Inspect(InspectArgs),

    /// Feed synthetic frames through a session with an emulated engine.
    Simulate(SimulateArgs),
}

#[derive(Args)]
struct FilesArgs {
    /// Path to the .weights file.
    weights: PathBuf,

    /// Path to the .cfg file.
    config: PathBuf,

    /// Path to the class names file.
    names: PathBuf,
}

#[derive(Args)]
struct ImportArgs {
    /// Display name for the imported model.
    name: String,

    /// Path to the .weights file.
    #[arg(long)]
    weights: PathBuf,

    /// Path to the .cfg file.
    #[arg(long)]
    config: PathBuf,

    /// Path to the class names file.
    #[arg(long)]
    names: PathBuf,
}

#[derive(Args)]
struct InspectArgs {
    /// Image standing in for a camera frame.
    image: PathBuf,

    /// Viewport width in pixels.
    #[arg(long, default_value = "1080")]
    view_width: u32,

    /// Viewport height in pixels.
    #[arg(long, default_value = "2280")]
    view_height: u32,
}

#[derive(Args)]
struct SimulateArgs {
    /// Number of frames to feed.
    #[arg(long, default_value = "120")]
    frames: u64,

    /// Capture rate in frames per second.
    #[arg(long, default_value = "30.0")]
    fps: f64,

    /// Sensor frame width.
    #[arg(long, default_value = "1280")]
    width: u32,

    /// Sensor frame height.
    #[arg(long, default_value = "720")]
    height: u32,

    /// Viewport width boxes are mapped into.
    #[arg(long, default_value = "1080")]
    view_width: u32,

    /// Viewport height boxes are mapped into.
    #[arg(long, default_value = "2280")]
    view_height: u32,

    /// Emulated inference time per frame in milliseconds.
    #[arg(long, default_value = "45")]
    latency_ms: u64,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::List => run_list(),
        Commands::Import(args) => run_import(&args),
        Commands::Delete { id } => run_delete(id),
        Commands::Select { model } => run_select(&model),
        Commands::FetchBuiltin => run_fetch_builtin(),
        Commands::Validate(args) => run_validate(&args),
        Commands::Inspect(args) => run_inspect(&args),
        Commands::Simulate(args) => run_simulate(&args),
    }
}

// ── list ──

fn run_list() -> Result<(), Box<dyn std::error::Error>> {
    let repository = FileModelRepository::open_default()?;
    let selected = selected_model_id();

    for record in repository.list()? {
        let marker = if record.id == selected { "*" } else { " " };
        let origin = if record.is_built_in() {
            "built-in"
        } else {
            "imported"
        };
        println!(
            "{marker} {}  {:<24} {:>9}  {:>3} classes  {origin}",
            record.id,
            record.display_name(),
            record.input_size_label(),
            record.class_count,
        );
    }
    Ok(())
}

fn selected_model_id() -> Uuid {
    let stored = JsonSelectionStore::open_default().and_then(|store| store.load());
    normalize_selection(stored.as_deref()).unwrap_or(BUILT_IN_MODEL_ID)
}

// ── import / delete / select ──

fn run_import(args: &ImportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut repository = FileModelRepository::open_default()?;
    let files = ModelPaths {
        weights: args.weights.clone(),
        config: args.config.clone(),
        names: args.names.clone(),
    };

    let record = repository.import(&args.name, &files)?;
    println!(
        "Imported '{}' ({}, {} classes)",
        record.display_name(),
        record.input_size_label(),
        record.class_count
    );
    println!("  id: {}", record.id);
    Ok(())
}

fn run_delete(id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
    let mut repository = FileModelRepository::open_default()?;
    repository.delete(id)?;
    println!("Deleted {id}");

    if selected_model_id() == id {
        if let Some(mut store) = JsonSelectionStore::open_default() {
            store.save(BUILT_IN_MODEL_ID);
            log::info!("Selection reset to the built-in model");
        }
    }
    Ok(())
}

fn run_select(model: &str) -> Result<(), Box<dyn std::error::Error>> {
    let id =
        normalize_selection(Some(model)).ok_or_else(|| format!("'{model}' is not a model id"))?;

    let repository = FileModelRepository::open_default()?;
    let record = repository
        .find(id)?
        .ok_or_else(|| format!("no model with id {id} in the catalog"))?;

    let mut store = JsonSelectionStore::open_default().ok_or("no config directory available")?;
    store.save(record.id);
    println!("Selected '{}' ({})", record.display_name(), record.id);
    Ok(())
}

// ── fetch-builtin / validate ──

fn run_fetch_builtin() -> Result<(), Box<dyn std::error::Error>> {
    let repository = FileModelRepository::open_default()?;
    let builtin_dir = repository.builtin_dir();

    let progress: ProgressFn = Box::new(download_progress);
    let fetched = builtin_assets::fetch(&builtin_dir, Some(progress))?;
    eprintln!();

    if fetched == 0 {
        log::info!(
            "Built-in model files already present in {}",
            builtin_dir.display()
        );
    } else {
        log::info!("Fetched {fetched} file(s) into {}", builtin_dir.display());
    }
    Ok(())
}

fn download_progress(file: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {file}... {pct}%");
    } else {
        eprint!("\rDownloading {file}... {downloaded} bytes");
    }
}

fn run_validate(args: &FilesArgs) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = model_files::validate(&args.weights, &args.config, &args.names)?;
    println!(
        "OK: {}x{} network input, {} classes",
        parsed.input_width,
        parsed.input_height,
        parsed.class_names.len()
    );
    Ok(())
}

// ── inspect ──

fn run_inspect(args: &InspectArgs) -> Result<(), Box<dyn std::error::Error>> {
    let frame = Frame::from_image_path(&args.image)?;
    let (frame_w, frame_h) = (frame.width(), frame.height());
    let (oriented_w, oriented_h) = oriented_size(frame_w, frame_h);
    let transform = ViewportTransform::aspect_fit(
        (oriented_w as f32, oriented_h as f32),
        (args.view_width as f32, args.view_height as f32),
    );
    let frame_rect = transform.map(&BoundingBox::new(
        0.0,
        0.0,
        oriented_w as f32,
        oriented_h as f32,
    ));
    let (x_offset, y_offset) = transform.offsets();

    println!("{}", args.image.display());
    println!("  frame size:    {frame_w}x{frame_h}");
    println!("  oriented size: {oriented_w}x{oriented_h}");
    println!("  viewport:      {}x{}", args.view_width, args.view_height);
    println!("  scale:         {:.4}", transform.scale());
    println!("  offsets:       ({x_offset:.1}, {y_offset:.1})");
    println!(
        "  frame rect:    ({:.1}, {:.1}) {:.1}x{:.1}",
        frame_rect.x, frame_rect.y, frame_rect.width, frame_rect.height
    );
    Ok(())
}

// ── simulate ──

/// In-memory catalog holding only the built-in record. The emulated engine
/// never reads the files its paths point at.
struct SyntheticRepository {
    record: ModelRecord,
}

impl SyntheticRepository {
    fn new() -> Self {
        Self {
            record: ModelRecord::built_in(builtin_assets::embedded_class_names()),
        }
    }
}

impl ModelRepository for SyntheticRepository {
    fn list(&self) -> Result<Vec<ModelRecord>, RepositoryError> {
        Ok(vec![self.record.clone()])
    }

    fn find(&self, id: Uuid) -> Result<Option<ModelRecord>, RepositoryError> {
        Ok((id == self.record.id).then(|| self.record.clone()))
    }

    fn import(&mut self, _name: &str, _files: &ModelPaths) -> Result<ModelRecord, RepositoryError> {
        Err(RepositoryError::Persistence(std::io::Error::other(
            "the simulation catalog is read-only",
        )))
    }

    fn delete(&mut self, _id: Uuid) -> Result<(), RepositoryError> {
        Err(RepositoryError::ForbiddenDelete)
    }

    fn resolve_paths(&self, _record: &ModelRecord) -> Result<ModelPaths, RepositoryError> {
        Ok(ModelPaths {
            weights: PathBuf::from("synthetic.weights"),
            config: PathBuf::from("synthetic.cfg"),
            names: PathBuf::from("synthetic.names"),
        })
    }
}

struct TransientSelectionStore {
    value: Option<String>,
}

impl SelectionStore for TransientSelectionStore {
    fn load(&self) -> Option<String> {
        self.value.clone()
    }

    fn save(&mut self, id: Uuid) {
        self.value = Some(id.to_string());
    }
}

/// Burns the configured latency per pass and returns two boxes that drift
/// with the frame index.
struct SyntheticEngine {
    latency: Duration,
}

impl DetectionEngine for SyntheticEngine {
    fn detect(
        &mut self,
        frame: &Frame,
        confidence_threshold: f32,
        _nms_threshold: f32,
    ) -> Result<Vec<RawDetection>, EngineError> {
        thread::sleep(self.latency);

        let w = frame.width() as f32;
        let h = frame.height() as f32;
        let phase = (frame.index() % 60) as f32 / 60.0;
        let boxes = vec![
            RawDetection {
                class_id: 0,
                confidence: 0.93,
                bounding_box: BoundingBox::new(w * (0.1 + 0.5 * phase), h * 0.3, w * 0.15, h * 0.4),
            },
            RawDetection {
                class_id: 16,
                confidence: 0.78,
                bounding_box: BoundingBox::new(
                    w * 0.6,
                    h * (0.55 - 0.2 * phase),
                    w * 0.2,
                    h * 0.25,
                ),
            },
        ];
        Ok(boxes
            .into_iter()
            .filter(|b| b.confidence >= confidence_threshold)
            .collect())
    }

    fn last_latency_ms(&self) -> f64 {
        self.latency.as_secs_f64() * 1000.0
    }

    fn input_size(&self) -> (u32, u32) {
        (416, 416)
    }
}

struct SyntheticLoader {
    latency: Duration,
}

impl EngineLoader for SyntheticLoader {
    fn load(&self, _paths: &ModelPaths) -> Result<Box<dyn DetectionEngine>, EngineError> {
        Ok(Box::new(SyntheticEngine {
            latency: self.latency,
        }))
    }
}

fn run_simulate(args: &SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.fps <= 0.0 {
        return Err(format!("fps must be positive, got {}", args.fps).into());
    }
    if args.frames == 0 || args.width == 0 || args.height == 0 {
        return Err("frames and frame dimensions must be positive".into());
    }

    let session = DetectionSession::start(
        Box::new(SyntheticRepository::new()),
        Box::new(TransientSelectionStore { value: None }),
        Box::new(SyntheticLoader {
            latency: Duration::from_millis(args.latency_ms),
        }),
        SessionConfig::default(),
    );
    session.set_viewport(args.view_width, args.view_height);

    let interval = Duration::from_secs_f64(1.0 / args.fps);
    let pixels = vec![0u8; args.width as usize * args.height as usize * 3];
    let mut accepted = 0u64;
    let mut dropped = 0u64;

    for index in 0..args.frames {
        let frame = Frame::new(pixels.clone(), args.width, args.height, 3, index);
        match session.offer_frame(frame) {
            Admission::Accepted => accepted += 1,
            Admission::Dropped => dropped += 1,
        }
        drain_events(&session);
        thread::sleep(interval);
    }

    // Let the last pass finish before the final drain.
    thread::sleep(Duration::from_millis(args.latency_ms + 50));
    drain_events(&session);

    println!(
        "{accepted} frames admitted, {dropped} dropped ({} offered)",
        accepted + dropped
    );
    Ok(())
}

fn drain_events(session: &DetectionSession) {
    for event in session.events().try_iter() {
        print_event(&event);
    }
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::ModelChanged(record) => {
            log::info!(
                "Active model: '{}' ({})",
                record.display_name(),
                record.input_size_label()
            );
        }
        SessionEvent::ModelLoadFailed { model, message } => {
            log::warn!("Could not load '{model}': {message}");
        }
        SessionEvent::Detections(detections) => {
            if detections.is_empty() {
                println!("(no detections)");
            } else {
                let boxes: Vec<String> = detections
                    .iter()
                    .map(|d| {
                        format!(
                            "{} @ ({:.0}, {:.0}) {:.0}x{:.0}",
                            d.confidence_label(),
                            d.bounding_box.x,
                            d.bounding_box.y,
                            d.bounding_box.width,
                            d.bounding_box.height
                        )
                    })
                    .collect();
                println!("{}", boxes.join(" | "));
            }
        }
        SessionEvent::Stats(stats) => {
            println!(
                "-- capture {:.1} fps, detection {:.1} fps, inference {:.1} ms, {} boxes",
                stats.capture_fps,
                stats.detection_fps,
                stats.last_inference_ms,
                stats.detection_count
            );
        }
    }
}
