use burn::tensor::{backend::Backend, Device, Distribution, Tensor};
use lv_core::error::Result;
use lv_preview::IntermediateState;

/// Shape and schedule of a synthetic run
#[derive(Clone, Debug)]
pub struct SamplerConfig {
    pub steps: usize,
    pub order: usize,
    pub channels: usize,
    pub latent_size: usize,
    pub predict_original: bool,
}

impl SamplerConfig {
    /// Reported step indices; second order solvers report each evaluation
    pub fn total_steps(&self) -> usize {
        self.steps * self.order.max(1)
    }
}

/// Stand-in for a diffusion scheduler.
///
/// Latents move linearly from gaussian noise to a fixed smooth pattern, so
/// previews visibly sharpen over the run without any model weights.
pub struct SyntheticSampler<B: Backend> {
    config: SamplerConfig,
    target: Tensor<B, 4>,
    noise: Tensor<B, 4>,
}

impl<B: Backend> SyntheticSampler<B> {
    pub fn new(config: SamplerConfig, device: &Device<B>) -> Self {
        let shape = [1, config.channels, config.latent_size, config.latent_size];
        let target = target_pattern(config.channels, config.latent_size, device);
        let noise = Tensor::random(shape, Distribution::Normal(0.0, 1.0), device);

        Self { config, target, noise }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Run the schedule, calling `on_step` after every iteration.
    ///
    /// Stops at the first error from `on_step` and returns it; otherwise
    /// returns the number of steps reported.
    pub fn run<F>(&self, mut on_step: F) -> Result<usize>
    where
        F: FnMut(&IntermediateState<B>) -> Result<()>,
    {
        let total_steps = self.config.total_steps();

        for step in 1..=total_steps {
            let alpha = step as f32 / total_steps as f32;
            let latents = self.target.clone().mul_scalar(alpha)
                + self.noise.clone().mul_scalar(1.0 - alpha);

            let mut state = IntermediateState::new(step, total_steps, self.config.order, latents);
            if self.config.predict_original {
                // The denoised estimate carries a quarter of the remaining noise
                let predicted = self.target.clone()
                    + self.noise.clone().mul_scalar((1.0 - alpha) * 0.25);
                state = state.with_predicted_original(predicted);
            }

            on_step(&state)?;
        }

        Ok(total_steps)
    }
}

/// Interference bands, a different phase per channel, within [-0.8, 0.8]
fn target_pattern<B: Backend>(channels: usize, size: usize, device: &Device<B>) -> Tensor<B, 4> {
    let freq = std::f32::consts::TAU / size.max(1) as f32;
    let mut values = Vec::with_capacity(channels * size * size);

    for c in 0..channels {
        let phase = c as f32 * 0.7;
        for y in 0..size {
            for x in 0..size {
                let v = (x as f32 * freq * 2.0 + phase).sin() * (y as f32 * freq + phase).cos();
                values.push(v * 0.8);
            }
        }
    }

    Tensor::<B, 1>::from_floats(values.as_slice(), device).reshape([1, channels, size, size])
}
