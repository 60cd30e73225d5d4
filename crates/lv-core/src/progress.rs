use std::sync::mpsc::Sender;

use image::RgbImage;

/// Label attached to every per-step event while the sampler is denoising
pub const DENOISING_LABEL: &str = "Denoising";

/// One progress notification handed to the observer
#[derive(Clone, Debug)]
pub struct ProgressEvent {
    pub label: String,

    /// Completion in [0, 1], if known
    pub percentage: Option<f32>,

    /// Low resolution approximation of the image being generated
    pub preview_image: Option<RgbImage>,

    /// Pixel (width, height) the preview stands in for
    pub display_dimensions: Option<(u32, u32)>,
}

impl ProgressEvent {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            percentage: None,
            preview_image: None,
            display_dimensions: None,
        }
    }

    pub fn with_percentage(mut self, percentage: f32) -> Self {
        self.percentage = Some(percentage);
        self
    }

    pub fn with_preview(mut self, image: RgbImage, display_dimensions: (u32, u32)) -> Self {
        self.preview_image = Some(image);
        self.display_dimensions = Some(display_dimensions);
        self
    }
}

/// Receiver of progress events.
///
/// Called synchronously from the sampling thread, once per event, in order.
pub trait ProgressSink {
    fn emit(&mut self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: FnMut(ProgressEvent),
{
    fn emit(&mut self, event: ProgressEvent) {
        self(event)
    }
}

impl ProgressSink for Sender<ProgressEvent> {
    fn emit(&mut self, event: ProgressEvent) {
        if let Err(e) = self.send(event) {
            log::warn!("Dropping progress event '{}': receiver gone", e.0.label);
        }
    }
}

/// Fraction of denoising work completed.
///
/// Second order solvers evaluate the model twice per reported step index, so
/// their progress is counted in pairs. Degenerate schedules report 0.0.
pub fn estimate_percentage(step: usize, total_steps: usize, order: usize) -> f32 {
    if total_steps == 0 {
        return 0.0;
    }

    if order == 2 {
        let denominator = total_steps / 2;
        if denominator == 0 {
            return 0.0;
        }
        return (step / 2) as f32 / denominator as f32;
    }

    step as f32 / total_steps as f32
}
