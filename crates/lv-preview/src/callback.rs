// ===========================================================================
// lv-preview/src/callback.rs
// ===========================================================================

use burn::tensor::backend::Backend;
use lv_core::cancel::CancellationCheck;
use lv_core::error::{Error, Result};
use lv_core::progress::{estimate_percentage, ProgressEvent, ProgressSink, DENOISING_LABEL};
use lv_core::BaseModel;

use crate::profiles::{self, AdaptedProfile};
use crate::projector::{LatentProjector, LinearProjector};
use crate::state::IntermediateState;

/// Per-step hook the sampler calls after every denoising iteration.
///
/// Each call checks for cancellation, projects the best available latent
/// estimate to a preview and emits exactly one progress event.
#[derive(Clone, Debug)]
pub struct StepCallback<P = LinearProjector> {
    projector: P,
    label: String,
}

impl Default for StepCallback<LinearProjector> {
    fn default() -> Self {
        Self::new(LinearProjector)
    }
}

impl<P> StepCallback<P> {
    pub fn new(projector: P) -> Self {
        Self {
            projector,
            label: DENOISING_LABEL.to_string(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn projector(&self) -> &P {
        &self.projector
    }

    /// Handle one intermediate state.
    ///
    /// Fails with [`Error::Canceled`] before doing any work if cancellation
    /// was requested, and with [`Error::UnsupportedArchitecture`] if the
    /// architecture has no preview profile. Nothing is emitted on failure.
    pub fn on_step<B, S, C>(
        &self,
        emit: &mut S,
        state: &IntermediateState<B>,
        base_model: BaseModel,
        is_canceled: &C,
    ) -> Result<()>
    where
        B: Backend,
        P: LatentProjector<B>,
        S: ProgressSink + ?Sized,
        C: CancellationCheck + ?Sized,
    {
        if is_canceled.is_canceled() {
            log::info!("Cancellation observed at step {}/{}", state.step, state.total_steps);
            return Err(Error::Canceled);
        }

        let sample = state.preview_sample().clone();
        let profile = profiles::resolve(base_model)?;
        let adapted = AdaptedProfile::for_sample(profile, &sample);

        let image = self.projector.project(sample, &adapted)?;
        let display_dimensions = (
            image.width() * adapted.spatial_downscale,
            image.height() * adapted.spatial_downscale,
        );
        let percentage = estimate_percentage(state.step, state.total_steps, state.order);

        log::debug!(
            "{} step {}/{} (order {}) -> {:.1}%, preview {}x{} from {}",
            self.label,
            state.step,
            state.total_steps,
            state.order,
            percentage * 100.0,
            image.width(),
            image.height(),
            profile.name,
        );

        emit.emit(
            ProgressEvent::new(self.label.clone())
                .with_percentage(percentage)
                .with_preview(image, display_dimensions),
        );

        Ok(())
    }
}

/// [`StepCallback::on_step`] with the default linear projector
pub fn on_step<B, S, C>(
    emit: &mut S,
    state: &IntermediateState<B>,
    base_model: BaseModel,
    is_canceled: &C,
) -> Result<()>
where
    B: Backend,
    S: ProgressSink + ?Sized,
    C: CancellationCheck + ?Sized,
{
    StepCallback::default().on_step(emit, state, base_model, is_canceled)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use burn::tensor::{DType, Tensor};
    use burn_ndarray::NdArray;
    use image::RgbImage;
    use lv_core::cancel::CancelFlag;
    use super::*;
    use crate::state::LatentSample;

    type TestBackend = NdArray;

    /// Linear projection that counts how often it ran
    #[derive(Default)]
    struct CountingProjector {
        calls: Cell<usize>,
    }

    impl<B: Backend> LatentProjector<B> for CountingProjector {
        fn project(&self, sample: LatentSample<B>, profile: &AdaptedProfile<B>) -> Result<RgbImage> {
            self.calls.set(self.calls.get() + 1);
            LinearProjector.project(sample, profile)
        }
    }

    fn state(channels: usize, step: usize) -> IntermediateState<TestBackend> {
        let device = Default::default();
        IntermediateState::new(step, 10, 1, Tensor::<TestBackend, 3>::zeros([channels, 4, 6], &device))
    }

    #[test]
    fn test_emits_one_denoising_event() {
        let mut events = Vec::new();
        let mut sink = |event: ProgressEvent| events.push(event);

        on_step(&mut sink, &state(4, 5), BaseModel::StableDiffusion1, &|| false).unwrap();

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.label, "Denoising");
        assert_eq!(event.percentage, Some(0.5));
        assert_eq!(event.display_dimensions, Some((48, 32)));

        let image = event.preview_image.as_ref().unwrap();
        assert_eq!((image.width(), image.height()), (6, 4));
    }

    #[test]
    fn test_prefers_predicted_original() {
        let device = Default::default();
        let latents = Tensor::<TestBackend, 3>::zeros([4, 3, 3], &device);
        let predicted = Tensor::<TestBackend, 3>::ones([4, 3, 3], &device);

        let profile = AdaptedProfile::new(profiles::resolve(BaseModel::StableDiffusion1).unwrap(), &device, DType::F32);
        let from_latents = LinearProjector.project(latents.clone().into(), &profile).unwrap();
        let from_predicted = LinearProjector.project(predicted.clone().into(), &profile).unwrap();
        assert_ne!(from_latents.as_raw(), from_predicted.as_raw());

        let state = IntermediateState::new(2, 10, 1, latents).with_predicted_original(predicted);
        let mut emitted = None;
        let mut sink = |event: ProgressEvent| emitted = event.preview_image;

        on_step(&mut sink, &state, BaseModel::StableDiffusion1, &|| false).unwrap();

        assert_eq!(emitted.unwrap().as_raw(), from_predicted.as_raw());
    }

    #[test]
    fn test_canceled_step_emits_nothing() {
        let flag = CancelFlag::new();
        flag.cancel();

        let callback = StepCallback::new(CountingProjector::default());
        let mut emitted = 0;
        let mut sink = |_: ProgressEvent| emitted += 1;

        let result = callback.on_step(&mut sink, &state(4, 1), BaseModel::StableDiffusionXL, &flag);

        assert!(matches!(result, Err(Error::Canceled)));
        assert_eq!(emitted, 0);
        assert_eq!(callback.projector().calls.get(), 0);
    }

    #[test]
    fn test_cancellation_checked_once_per_step() {
        let checks = Cell::new(0);
        let is_canceled = || {
            checks.set(checks.get() + 1);
            false
        };

        let mut sink = |_: ProgressEvent| {};
        on_step(&mut sink, &state(16, 3), BaseModel::Flux, &is_canceled).unwrap();

        assert_eq!(checks.get(), 1);
    }

    #[test]
    fn test_unsupported_architecture_skips_projection() {
        let callback = StepCallback::new(CountingProjector::default());
        let mut emitted = 0;
        let mut sink = |_: ProgressEvent| emitted += 1;

        let result = callback.on_step(&mut sink, &state(4, 1), BaseModel::Imagen4, &|| false);

        assert!(matches!(result, Err(Error::UnsupportedArchitecture(_))));
        assert_eq!(emitted, 0);
        assert_eq!(callback.projector().calls.get(), 0);
    }

    #[test]
    fn test_display_dimensions_for_every_architecture() {
        let device = Default::default();

        for model in profiles::registered() {
            let channels = profiles::resolve(model).unwrap().latent_channels();
            let latents = Tensor::<TestBackend, 4>::zeros([2, channels, 5, 7], &device);
            let state = IntermediateState::new(0, 20, 2, latents);

            let mut emitted = None;
            let mut sink = |event: ProgressEvent| emitted = Some(event);
            on_step(&mut sink, &state, model, &|| false).unwrap();

            let event = emitted.unwrap();
            let image = event.preview_image.unwrap();
            assert_eq!((image.width(), image.height()), (7, 5), "{model}");
            assert_eq!(
                event.display_dimensions,
                Some((image.width() * 8, image.height() * 8)),
                "{model}"
            );
            assert_eq!(event.percentage, Some(0.0));
        }
    }

    #[test]
    fn test_double_precision_sample_matches_single() {
        let device = Default::default();
        let single = Tensor::<TestBackend, 3>::ones([4, 5, 5], &device);
        let double = single.clone().cast(DType::F64);
        assert_eq!(double.dtype(), DType::F64);

        let mut previews = Vec::new();
        let mut sink = |event: ProgressEvent| previews.push(event.preview_image.unwrap());

        // SDXL runs both the projection matmul and the smoothing kernel
        for latents in [single, double] {
            let state = IntermediateState::new(3, 10, 1, latents);
            on_step(&mut sink, &state, BaseModel::StableDiffusionXL, &|| false).unwrap();
        }

        assert_eq!(previews.len(), 2);
        assert_eq!(previews[0].as_raw(), previews[1].as_raw());
    }

    #[test]
    fn test_custom_label() {
        let callback = StepCallback::default().with_label("Refining");
        let mut labels = Vec::new();
        let mut sink = |event: ProgressEvent| labels.push(event.label);

        callback.on_step(&mut sink, &state(4, 0), BaseModel::StableDiffusionXLRefiner, &|| false).unwrap();

        assert_eq!(labels, vec!["Refining".to_string()]);
    }
}
