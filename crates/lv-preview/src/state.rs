use burn::tensor::{backend::Backend, DType, Device, Tensor};

/// Latent tensor handed over by the sampler.
///
/// Samplers report either a single `[C, H, W]` latent or a batched
/// `[N, C, H, W]` one; previews only ever look at the first batch element.
#[derive(Clone, Debug)]
pub enum LatentSample<B: Backend> {
    Unbatched(Tensor<B, 3>),
    Batched(Tensor<B, 4>),
}

impl<B: Backend> LatentSample<B> {
    pub fn device(&self) -> Device<B> {
        match self {
            LatentSample::Unbatched(t) => t.device(),
            LatentSample::Batched(t) => t.device(),
        }
    }

    /// Float precision the sampler produced the latents in
    pub fn dtype(&self) -> DType {
        match self {
            LatentSample::Unbatched(t) => t.dtype(),
            LatentSample::Batched(t) => t.dtype(),
        }
    }

    /// Latent channel depth
    pub fn channels(&self) -> usize {
        match self {
            LatentSample::Unbatched(t) => t.dims()[0],
            LatentSample::Batched(t) => t.dims()[1],
        }
    }

    /// `[C, H, W]` view of the first batch element; the rest are dropped
    pub fn into_first(self) -> Tensor<B, 3> {
        match self {
            LatentSample::Unbatched(t) => t,
            LatentSample::Batched(t) => {
                let [_batch, c, h, w] = t.dims();
                t.narrow(0, 0, 1).reshape([c, h, w])
            }
        }
    }
}

impl<B: Backend> From<Tensor<B, 3>> for LatentSample<B> {
    fn from(tensor: Tensor<B, 3>) -> Self {
        LatentSample::Unbatched(tensor)
    }
}

impl<B: Backend> From<Tensor<B, 4>> for LatentSample<B> {
    fn from(tensor: Tensor<B, 4>) -> Self {
        LatentSample::Batched(tensor)
    }
}

/// Snapshot of the sampler after one denoising iteration
#[derive(Clone, Debug)]
pub struct IntermediateState<B: Backend> {
    pub step: usize,
    pub total_steps: usize,

    /// Model evaluations per reported step index
    pub order: usize,

    /// Current noisy latents
    pub latents: LatentSample<B>,

    /// Solver's estimate of the fully denoised latents, when it has one
    pub predicted_original: Option<LatentSample<B>>,
}

impl<B: Backend> IntermediateState<B> {
    pub fn new(
        step: usize,
        total_steps: usize,
        order: usize,
        latents: impl Into<LatentSample<B>>,
    ) -> Self {
        Self {
            step,
            total_steps,
            order,
            latents: latents.into(),
            predicted_original: None,
        }
    }

    pub fn with_predicted_original(mut self, predicted: impl Into<LatentSample<B>>) -> Self {
        self.predicted_original = Some(predicted.into());
        self
    }

    /// Best available estimate of the final latents
    pub fn preview_sample(&self) -> &LatentSample<B> {
        self.predicted_original.as_ref().unwrap_or(&self.latents)
    }
}
