use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use uuid::Uuid;

use crate::catalog::domain::model_record::ModelRecord;
use crate::catalog::domain::model_repository::{ModelPaths, ModelRepository, RepositoryError};
use crate::catalog::domain::selection::{normalize_selection, SelectionStore};
use crate::detection::domain::detection::Detection;
use crate::detection::domain::detection_engine::EngineLoader;
use crate::detection::domain::inference_adapter::InferenceAdapter;
use crate::pipeline::frame_scheduler::{Admission, FrameScheduler};
use crate::pipeline::pipeline_stats::{PipelineStats, StatsSampler};
use crate::shared::constants::{
    BUILT_IN_MODEL_ID, BUILT_IN_MODEL_NAME, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_NMS_THRESHOLD,
    STATS_INTERVAL,
};
use crate::shared::frame::Frame;
use crate::shared::viewport::{oriented_size, ViewportTransform};

/// Tuning knobs for a detection session. Thresholds seed the first passes
/// and can be changed later through
/// [`set_thresholds`](DetectionSession::set_thresholds).
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
    /// Start detecting immediately instead of paused.
    pub detect_on_start: bool,
    pub stats_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            nms_threshold: DEFAULT_NMS_THRESHOLD,
            detect_on_start: true,
            stats_interval: STATS_INTERVAL,
        }
    }
}

/// Notifications published by a running session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A model finished loading and is now the active one.
    ModelChanged(ModelRecord),
    /// A model could not be loaded; the previously active one, if any,
    /// keeps running.
    ModelLoadFailed { model: String, message: String },
    /// Detections for the most recent completed pass, mapped into the
    /// current viewport. An empty list clears the overlay.
    Detections(Vec<Detection>),
    /// Periodic pipeline health snapshot.
    Stats(PipelineStats),
}

enum SessionCommand {
    SwitchModel(Uuid),
    SetViewport(u32, u32),
    ClearOverlay,
}

/// Result of one detection pass, reported by the worker to the control loop.
struct Completion {
    epoch: u64,
    frame_width: u32,
    frame_height: u32,
    detections: Vec<Detection>,
    latency_ms: f64,
}

/// A live detection session over a stream of camera frames.
///
/// The session owns two threads: a worker that runs detection passes one
/// frame at a time, and a control loop that applies model switches, maps
/// completed detections into the viewport, and publishes [`SessionEvent`]s.
/// Frames enter through [`offer_frame`](Self::offer_frame), which never
/// blocks; frames arriving while a pass is in flight are dropped.
///
/// Model switches rebuild the inference adapter from scratch. Every switch
/// and every pause advances an epoch counter, and completions stamped with
/// a superseded epoch are discarded, so detections from a replaced model or
/// a paused stream never reach the overlay.
pub struct DetectionSession {
    scheduler: FrameScheduler,
    paused: Arc<AtomicBool>,
    epoch: Arc<AtomicU64>,
    thresholds: Arc<Mutex<(f32, f32)>>,
    cmd_tx: Option<Sender<SessionCommand>>,
    event_rx: Receiver<SessionEvent>,
    control: Option<thread::JoinHandle<()>>,
}

impl DetectionSession {
    /// Spawns the worker and control threads and loads the persisted model
    /// selection, falling back to the built-in model when the selection is
    /// absent or unusable.
    pub fn start(
        repository: Box<dyn ModelRepository>,
        selection_store: Box<dyn SelectionStore>,
        loader: Box<dyn EngineLoader>,
        config: SessionConfig,
    ) -> Self {
        let initial =
            normalize_selection(selection_store.load().as_deref()).unwrap_or(BUILT_IN_MODEL_ID);

        let adapter: Arc<Mutex<Option<InferenceAdapter>>> = Arc::new(Mutex::new(None));
        let epoch = Arc::new(AtomicU64::new(0));
        let paused = Arc::new(AtomicBool::new(!config.detect_on_start));
        let thresholds = Arc::new(Mutex::new((
            config.confidence_threshold,
            config.nms_threshold,
        )));

        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded::<SessionCommand>();
        let (done_tx, done_rx) = crossbeam_channel::unbounded::<Completion>();
        let (event_tx, event_rx) = crossbeam_channel::unbounded::<SessionEvent>();

        let job_adapter = adapter.clone();
        let job_epoch = epoch.clone();
        let job_paused = paused.clone();
        let job_thresholds = thresholds.clone();
        let scheduler = FrameScheduler::new(move |frame: Frame| {
            // Epoch before the paused check: `pause` flips the flag before
            // bumping, so a pass that slips past one is caught by the other.
            let epoch = job_epoch.load(Ordering::Acquire);
            if job_paused.load(Ordering::Acquire) {
                return;
            }
            let (confidence, nms) = *job_thresholds.lock().unwrap();
            let mut slot = job_adapter.lock().unwrap();
            let Some(active) = slot.as_mut() else {
                return;
            };
            let detections = active.detect(&frame, confidence, nms);
            let latency_ms = active.last_latency_ms();
            drop(slot);
            let _ = done_tx.send(Completion {
                epoch,
                frame_width: frame.width(),
                frame_height: frame.height(),
                detections,
                latency_ms,
            });
        });

        let control_loop = ControlLoop {
            repository,
            selection_store,
            loader,
            adapter,
            epoch: epoch.clone(),
            cmd_rx,
            done_rx,
            event_tx,
            sampler: StatsSampler::new(scheduler.counters()),
            view_size: None,
            last_latency_ms: 0.0,
            last_detection_count: 0,
        };
        let stats_interval = config.stats_interval;
        let control = thread::spawn(move || control_loop.run(initial, stats_interval));

        Self {
            scheduler,
            paused,
            epoch,
            thresholds,
            cmd_tx: Some(cmd_tx),
            event_rx,
            control: Some(control),
        }
    }

    /// Stream of session notifications. There is one event queue; feed it
    /// to a single consumer.
    pub fn events(&self) -> &Receiver<SessionEvent> {
        &self.event_rx
    }

    /// Offers a camera frame for detection. Returns [`Admission::Dropped`]
    /// without touching the counters while the session is paused.
    pub fn offer_frame(&self, frame: Frame) -> Admission {
        if self.paused.load(Ordering::Acquire) {
            return Admission::Dropped;
        }
        self.scheduler.offer(frame)
    }

    /// Requests a switch to the given catalog model. Progress is reported
    /// through the event stream.
    pub fn switch_model(&self, id: Uuid) {
        self.send(SessionCommand::SwitchModel(id));
    }

    /// Sets the destination size that detection boxes are mapped into.
    /// Until a viewport is set, boxes pass through in frame coordinates.
    pub fn set_viewport(&self, width: u32, height: u32) {
        self.send(SessionCommand::SetViewport(width, height));
    }

    /// Updates the confidence and NMS thresholds. Takes effect on the next
    /// pass; the pipeline keeps running.
    pub fn set_thresholds(&self, confidence: f32, nms: f32) {
        *self.thresholds.lock().unwrap() = (confidence, nms);
    }

    /// Stops admitting frames, clears the overlay, and discards the result
    /// of any pass still in flight.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.send(SessionCommand::ClearOverlay);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    fn send(&self, cmd: SessionCommand) {
        if let Some(tx) = &self.cmd_tx {
            let _ = tx.send(cmd);
        }
    }
}

impl Drop for DetectionSession {
    fn drop(&mut self) {
        self.cmd_tx.take();
        if let Some(control) = self.control.take() {
            let _ = control.join();
        }
        // The scheduler field drops next and joins the worker.
    }
}

struct ControlLoop {
    repository: Box<dyn ModelRepository>,
    selection_store: Box<dyn SelectionStore>,
    loader: Box<dyn EngineLoader>,
    adapter: Arc<Mutex<Option<InferenceAdapter>>>,
    epoch: Arc<AtomicU64>,
    cmd_rx: Receiver<SessionCommand>,
    done_rx: Receiver<Completion>,
    event_tx: Sender<SessionEvent>,
    sampler: StatsSampler,
    view_size: Option<(u32, u32)>,
    last_latency_ms: f64,
    last_detection_count: usize,
}

impl ControlLoop {
    fn run(mut self, initial: Uuid, stats_interval: Duration) {
        self.apply_switch(initial);

        let ticker = crossbeam_channel::tick(stats_interval);
        loop {
            crossbeam_channel::select! {
                recv(self.cmd_rx) -> msg => match msg {
                    Ok(cmd) => self.handle_command(cmd),
                    Err(_) => break,
                },
                recv(self.done_rx) -> msg => match msg {
                    Ok(completion) => self.handle_completion(completion),
                    Err(_) => break,
                },
                recv(ticker) -> _ => self.publish_stats(),
            }
        }
    }

    fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::SwitchModel(id) => self.apply_switch(id),
            SessionCommand::SetViewport(width, height) => {
                self.view_size = Some((width, height));
            }
            SessionCommand::ClearOverlay => {
                self.last_detection_count = 0;
                self.send_event(SessionEvent::Detections(Vec::new()));
            }
        }
    }

    /// Loads `target` and installs it as the active model. A model that is
    /// missing from the catalog, or whose files are gone, falls back to the
    /// built-in model; an engine load failure keeps the current model.
    fn apply_switch(&mut self, target: Uuid) {
        let (record, paths) = match self.locate(target) {
            Ok(found) => found,
            Err(e) if target == BUILT_IN_MODEL_ID => {
                log::warn!("built-in model is unavailable: {e}");
                self.send_event(SessionEvent::ModelLoadFailed {
                    model: BUILT_IN_MODEL_NAME.to_string(),
                    message: e.to_string(),
                });
                return;
            }
            Err(e) => {
                log::warn!("model {target} is unavailable ({e}), reverting to the built-in model");
                self.apply_switch(BUILT_IN_MODEL_ID);
                return;
            }
        };

        let name = record.display_name().to_string();
        let id = record.id;
        match InferenceAdapter::load(self.loader.as_ref(), record, &paths) {
            Ok(loaded) => {
                let installed = loaded.record().clone();
                // Bump before the swap so passes that began against the old
                // model report a stale epoch.
                self.epoch.fetch_add(1, Ordering::AcqRel);
                *self.adapter.lock().unwrap() = Some(loaded);
                self.selection_store.save(id);
                self.send_event(SessionEvent::ModelChanged(installed));
            }
            Err(e) => {
                log::warn!("failed to load model {name}: {e}");
                self.send_event(SessionEvent::ModelLoadFailed {
                    model: name,
                    message: e.to_string(),
                });
            }
        }
    }

    fn locate(&self, id: Uuid) -> Result<(ModelRecord, ModelPaths), RepositoryError> {
        let record = self
            .repository
            .find(id)?
            .ok_or(RepositoryError::UnknownModel(id))?;
        let paths = self.repository.resolve_paths(&record)?;
        Ok((record, paths))
    }

    fn handle_completion(&mut self, completion: Completion) {
        if completion.epoch != self.epoch.load(Ordering::Acquire) {
            return;
        }

        self.last_latency_ms = completion.latency_ms;
        self.last_detection_count = completion.detections.len();

        let transform = self.viewport_transform(completion.frame_width, completion.frame_height);
        let detections = completion
            .detections
            .into_iter()
            .map(|d| Detection {
                bounding_box: transform.map(&d.bounding_box),
                ..d
            })
            .collect();
        self.send_event(SessionEvent::Detections(detections));
    }

    fn viewport_transform(&self, frame_width: u32, frame_height: u32) -> ViewportTransform {
        let Some((view_width, view_height)) = self.view_size else {
            return ViewportTransform::identity();
        };
        let (w, h) = oriented_size(frame_width, frame_height);
        ViewportTransform::aspect_fit(
            (w as f32, h as f32),
            (view_width as f32, view_height as f32),
        )
    }

    fn publish_stats(&mut self) {
        let stats = self
            .sampler
            .sample(self.last_latency_ms, self.last_detection_count);
        self.send_event(SessionEvent::Stats(stats));
    }

    fn send_event(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }
}
