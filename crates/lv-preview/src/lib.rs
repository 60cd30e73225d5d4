//! Cheap latent previews for diffusion sampling.
//!
//! A linear, per-architecture color fit turns intermediate latents into a
//! small RGB image at every denoising step, without running the decoder.
//! The step callback pairs that preview with a completion percentage and
//! hands both to a [`ProgressSink`](lv_core::ProgressSink).
//!
//! Everything here is generic over a `burn` backend; tests use `burn-ndarray`.

pub mod callback;
pub mod profiles;
pub mod projector;
pub mod state;


pub use callback::{on_step, StepCallback};
pub use profiles::{resolve, AdaptedProfile, ArchitectureProfile, LATENT_SCALE_FACTOR};
pub use projector::{LatentProjector, LinearProjector};
pub use state::{IntermediateState, LatentSample};
