use std::path::PathBuf;

use clap::{Parser, ValueHint};
use lv_core::BaseModel;

use crate::sampler::SamplerConfig;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run a synthetic diffusion schedule and write latent previews for every step"
)]
pub struct Cli {
    /// Base model whose latent layout is previewed (sd-1, sd-2, sdxl, sdxl-refiner, sd-3, cogview4, flux)
    #[arg(long, default_value = "sdxl")]
    pub architecture: BaseModel,

    /// Denoising steps
    #[arg(long, default_value_t = 20)]
    pub steps: usize,

    /// Solver order; order 2 reports two evaluations per step
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
    pub order: u8,

    /// Latent grid edge length in cells
    #[arg(long, default_value_t = 64)]
    pub latent_size: usize,

    /// Directory receiving one PNG per step
    #[arg(long, default_value = "previews", value_hint = ValueHint::DirPath)]
    pub output_dir: PathBuf,

    /// Request cancellation once this many steps have been reported
    #[arg(long)]
    pub cancel_after: Option<usize>,

    /// Preview the noisy latents instead of the solver's denoised estimate
    #[arg(long)]
    pub no_predicted_original: bool,
}

impl Cli {
    pub fn sampler_config(&self, channels: usize) -> SamplerConfig {
        SamplerConfig {
            steps: self.steps,
            order: self.order as usize,
            channels,
            latent_size: self.latent_size,
            predict_original: !self.no_predicted_original,
        }
    }
}
