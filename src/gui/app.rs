//! Main window: live camera view on the left, controls and session
//! statistics on the right.
//!
//! The capture loop is driven by a timer subscription; every tick reads one
//! frame, runs the detection pipeline and refreshes the displayed image.
//! Model loading happens on a background task so the window opens instantly.

use std::sync::Arc;
use std::time::Duration;

use iced::widget::{button, checkbox, column, container, image as iced_image, row, slider, text};
use iced::{Element, Length, Subscription, Task, Theme};
use image::RgbImage;

use crate::camera::{self, FrameSource};
use crate::config::{clamp_threshold, AppConfig};
use crate::imaging;
use crate::output::{DetectionLog, FrameRecorder, OutputPaths};
use crate::pipeline::{DetectionOptions, DetectionPipeline};
use crate::stats::{FpsCounter, SessionStats};

use super::Message;

/// Bounds of the confidence sliders; values are clamped here before they
/// reach the pipeline.
const CONF_SLIDER_MIN: f32 = 0.05;
const CONF_SLIDER_MAX: f32 = 0.95;

pub fn run(config: AppConfig) -> iced::Result {
    iced::application("BottleSight", App::update, App::view)
        .subscription(App::subscription)
        .theme(|_| Theme::Dark)
        .run_with(move || App::new(config))
}

struct App {
    config: AppConfig,
    options: DetectionOptions,
    outputs: OutputPaths,
    pipeline: Option<Arc<DetectionPipeline>>,
    source: Option<Box<dyn FrameSource>>,
    recorder: Option<FrameRecorder>,
    detection_log: Option<DetectionLog>,
    running: bool,
    last_frame: Option<RgbImage>,
    frame_handle: Option<iced_image::Handle>,
    fps: FpsCounter,
    stats: SessionStats,
    status: String,
}

impl App {
    fn new(config: AppConfig) -> (Self, Task<Message>) {
        let options = DetectionOptions::from_config(&config);
        let outputs = OutputPaths::new(config.output_dir.clone());
        let load_config = config.clone();
        let load = Task::perform(
            async move {
                DetectionPipeline::load(&load_config)
                    .map(Arc::new)
                    .map_err(|err| format!("{err:#}"))
            },
            Message::PipelineLoaded,
        );

        let app = Self {
            config,
            options,
            outputs,
            pipeline: None,
            source: None,
            recorder: None,
            detection_log: None,
            running: false,
            last_frame: None,
            frame_handle: None,
            fps: FpsCounter::new(),
            stats: SessionStats::new(),
            status: String::from("loading models..."),
        };
        (app, load)
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::PipelineLoaded(Ok(pipeline)) => {
                let mut missing = Vec::new();
                if !pipeline.has_cap_detector() {
                    missing.push("cap detection");
                }
                if !pipeline.has_brand_classifier() {
                    missing.push("brand classification");
                }
                self.status = if missing.is_empty() {
                    String::from("models loaded")
                } else {
                    format!("models loaded ({} unavailable)", missing.join(", "))
                };
                self.pipeline = Some(pipeline);
            }
            Message::PipelineLoaded(Err(err)) => {
                log::error!("model load failed: {err}");
                self.status = format!("model load failed: {err}");
            }
            Message::Tick(_) => self.on_tick(),
            Message::ToggleCapture => {
                if self.running {
                    self.stop_capture();
                } else {
                    self.start_capture();
                }
            }
            Message::Screenshot => {
                if let Some(frame) = &self.last_frame {
                    match self.outputs.save_screenshot(frame) {
                        Ok(path) => self.status = format!("saved {}", path.display()),
                        Err(err) => {
                            log::error!("screenshot failed: {err:#}");
                            self.status = format!("screenshot failed: {err}");
                        }
                    }
                }
            }
            Message::ToggleRecording => {
                if let Some(recorder) = self.recorder.take() {
                    self.status = format!(
                        "recording stopped ({} frames in {})",
                        recorder.frames_written(),
                        recorder.dir().display()
                    );
                } else {
                    match self.outputs.start_recording() {
                        Ok(recorder) => {
                            self.status = format!("recording to {}", recorder.dir().display());
                            self.recorder = Some(recorder);
                        }
                        Err(err) => {
                            log::error!("failed to start recording: {err:#}");
                            self.status = format!("recording failed: {err}");
                        }
                    }
                }
            }
            Message::BottleConfChanged(value) => {
                self.options.bottle_conf =
                    clamp_threshold(value).clamp(CONF_SLIDER_MIN, CONF_SLIDER_MAX);
            }
            Message::CapConfChanged(value) => {
                self.options.cap_conf =
                    clamp_threshold(value).clamp(CONF_SLIDER_MIN, CONF_SLIDER_MAX);
            }
            Message::BottlesToggled(enabled) => self.options.enable_bottle = enabled,
            Message::CapsToggled(enabled) => self.options.enable_cap = enabled,
            Message::BrandsToggled(enabled) => self.options.enable_brand = enabled,
            Message::ContrastToggled(enabled) => self.options.enhance_contrast = enabled,
        }
        Task::none()
    }

    fn start_capture(&mut self) {
        if self.pipeline.is_none() {
            return;
        }
        match camera::open_source(&self.config.camera) {
            Ok(source) => {
                self.status = format!("capturing from {}", source.describe());
                self.source = Some(source);
                self.stats.reset();
                self.fps.reset();
                match self.outputs.open_detection_log() {
                    Ok(log) => self.detection_log = Some(log),
                    Err(err) => log::warn!("detection log unavailable: {err:#}"),
                }
                self.running = true;
            }
            Err(err) => {
                log::error!("failed to open camera: {err:#}");
                self.status = format!("camera unavailable: {err}");
            }
        }
    }

    fn stop_capture(&mut self) {
        self.running = false;
        self.source = None;
        if let Some(recorder) = self.recorder.take() {
            log::info!("recording stopped, {} frames", recorder.frames_written());
        }
        if let Some(mut log) = self.detection_log.take() {
            if let Err(err) = log.flush() {
                log::warn!("{err:#}");
            }
        }
        self.status = String::from("stopped");
    }

    /// One iteration of the capture loop.
    fn on_tick(&mut self) {
        let (Some(pipeline), Some(source)) = (&self.pipeline, &mut self.source) else {
            return;
        };

        let frame = match source.read_frame() {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("frame capture failed: {err:#}");
                return;
            }
        };

        let result = pipeline.process_frame(&frame, &self.options);
        let mut annotated = frame;
        imaging::annotate_frame(&mut annotated, &result, &self.config.palette);

        self.stats.record(&result.counts(), &result.brands());
        let fps = self.fps.tick();

        if let Some(recorder) = &mut self.recorder {
            if let Err(err) = recorder.write_frame(&annotated) {
                log::error!("{err:#}");
                self.recorder = None;
            }
        }
        if let Some(log) = &mut self.detection_log {
            if let Err(err) = log.record(source.frames_captured(), &result) {
                log::warn!("{err:#}");
                self.detection_log = None;
            }
        }

        self.status = format!("{} | {fps:.1} fps", source.describe());
        let (width, height) = (annotated.width(), annotated.height());
        let rgba = image::DynamicImage::ImageRgb8(annotated.clone()).into_rgba8();
        self.frame_handle = Some(iced_image::Handle::from_rgba(width, height, rgba.into_raw()));
        self.last_frame = Some(annotated);
    }

    fn subscription(&self) -> Subscription<Message> {
        if !self.running {
            return Subscription::none();
        }
        let interval = Duration::from_millis(1000 / u64::from(self.config.camera.fps.max(1)));
        iced::time::every(interval).map(Message::Tick)
    }

    fn view(&self) -> Element<'_, Message> {
        let viewer: Element<'_, Message> = match &self.frame_handle {
            Some(handle) => iced_image(handle.clone())
                .width(Length::Fill)
                .height(Length::Fill)
                .into(),
            None => container(text("no signal"))
                .width(Length::Fill)
                .height(Length::Fill)
                .center_x(Length::Fill)
                .center_y(Length::Fill)
                .into(),
        };

        let capture_label = if self.running { "Stop" } else { "Start" };
        let record_label = if self.recorder.is_some() {
            "Stop recording"
        } else {
            "Record"
        };

        let controls = column![
            button(capture_label)
                .on_press_maybe(self.pipeline.is_some().then_some(Message::ToggleCapture)),
            button("Screenshot")
                .on_press_maybe(self.last_frame.is_some().then_some(Message::Screenshot)),
            button(record_label)
                .on_press_maybe(self.running.then_some(Message::ToggleRecording)),
            checkbox("bottles", self.options.enable_bottle).on_toggle(Message::BottlesToggled),
            checkbox("caps", self.options.enable_cap).on_toggle(Message::CapsToggled),
            checkbox("brands", self.options.enable_brand).on_toggle(Message::BrandsToggled),
            checkbox("enhance contrast", self.options.enhance_contrast)
                .on_toggle(Message::ContrastToggled),
            text(format!("bottle conf: {:.2}", self.options.bottle_conf)),
            slider(
                CONF_SLIDER_MIN..=CONF_SLIDER_MAX,
                self.options.bottle_conf,
                Message::BottleConfChanged
            )
            .step(0.05),
            text(format!("cap conf: {:.2}", self.options.cap_conf)),
            slider(
                CONF_SLIDER_MIN..=CONF_SLIDER_MAX,
                self.options.cap_conf,
                Message::CapConfChanged
            )
            .step(0.05),
            self.stats_panel(),
        ]
        .spacing(8)
        .width(220);

        let content = row![viewer, controls].spacing(12).padding(12);

        column![content, text(&self.status).size(14)]
            .spacing(4)
            .padding(8)
            .into()
    }

    fn stats_panel(&self) -> Element<'_, Message> {
        let summary = self.stats.summary();
        let mut panel = column![
            text("session").size(16),
            text(format!("frames: {}", summary.total_frames)),
            text(format!("bottles: {}", summary.bottles)),
            text(format!("with cap: {}", summary.with_cap)),
            text(format!("without cap: {}", summary.without_cap)),
            text(format!("fps: {:.1}", self.fps.fps())),
        ]
        .spacing(2);

        if !summary.brands.is_empty() {
            panel = panel.push(text("brands").size(16));
            for (name, count) in &summary.brands {
                panel = panel.push(text(format!("{name}: {count}")));
            }
        }
        panel.into()
    }
}
