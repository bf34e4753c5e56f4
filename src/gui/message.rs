use std::fmt;
use std::sync::Arc;

use crate::pipeline::DetectionPipeline;

#[derive(Clone)]
pub enum Message {
    /// Background model load finished.
    PipelineLoaded(Result<Arc<DetectionPipeline>, String>),
    /// Capture-loop heartbeat; one frame is read and processed per tick.
    Tick(iced::time::Instant),
    ToggleCapture,
    Screenshot,
    ToggleRecording,
    BottleConfChanged(f32),
    CapConfChanged(f32),
    BottlesToggled(bool),
    CapsToggled(bool),
    BrandsToggled(bool),
    ContrastToggled(bool),
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::PipelineLoaded(Ok(_)) => write!(f, "PipelineLoaded(Ok)"),
            Message::PipelineLoaded(Err(err)) => write!(f, "PipelineLoaded(Err({err}))"),
            Message::Tick(_) => write!(f, "Tick"),
            Message::ToggleCapture => write!(f, "ToggleCapture"),
            Message::Screenshot => write!(f, "Screenshot"),
            Message::ToggleRecording => write!(f, "ToggleRecording"),
            Message::BottleConfChanged(v) => write!(f, "BottleConfChanged({v})"),
            Message::CapConfChanged(v) => write!(f, "CapConfChanged({v})"),
            Message::BottlesToggled(v) => write!(f, "BottlesToggled({v})"),
            Message::CapsToggled(v) => write!(f, "CapsToggled({v})"),
            Message::BrandsToggled(v) => write!(f, "BrandsToggled({v})"),
            Message::ContrastToggled(v) => write!(f, "ContrastToggled({v})"),
        }
    }
}
