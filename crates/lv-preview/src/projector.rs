use burn::tensor::module::conv2d;
use burn::tensor::ops::ConvOptions;
use burn::tensor::{backend::Backend, Tensor};
use image::RgbImage;
use lv_core::error::{Error, Result};

use crate::profiles::AdaptedProfile;
use crate::state::LatentSample;

/// Turns a latent sample into a small RGB raster, one pixel per latent cell
pub trait LatentProjector<B: Backend> {
    fn project(&self, sample: LatentSample<B>, profile: &AdaptedProfile<B>) -> Result<RgbImage>;
}

/// Per-cell linear color fit, optionally smoothed.
///
/// Cheap and lossy: this is not the autoencoder decode, only an estimate
/// good enough to watch an image take shape.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinearProjector;

impl<B: Backend> LatentProjector<B> for LinearProjector {
    fn project(&self, sample: LatentSample<B>, profile: &AdaptedProfile<B>) -> Result<RgbImage> {
        let sample = sample.into_first();
        let [channels, height, width] = sample.dims();

        if channels != profile.latent_channels() {
            return Err(Error::InvalidSample(format!(
                "Expected {} latent channels, got {}",
                profile.latent_channels(),
                channels
            )));
        }

        // [C, H, W] -> [H*W, C] -> [H*W, 3]
        let cells = sample.reshape([channels, height * width]).swap_dims(0, 1);
        let mut rgb = cells.matmul(profile.factors.clone());

        if let Some(kernel) = &profile.kernel {
            rgb = smooth(rgb, kernel.clone(), height, width);
        }

        to_rgb_image(rgb, height, width)
    }
}

/// Depthwise 3x3 convolution over [H*W, 3] colors, zero padded so the
/// spatial size is unchanged
fn smooth<B: Backend>(rgb: Tensor<B, 2>, kernel: Tensor<B, 4>, height: usize, width: usize) -> Tensor<B, 2> {
    let planes = rgb.swap_dims(0, 1).reshape([1, 3, height, width]);
    let options = ConvOptions::new([1, 1], [1, 1], [1, 1], 3);
    let planes = conv2d(planes, kernel, None, options);

    planes.reshape([3, height * width]).swap_dims(0, 1)
}

/// Map [-1, 1] to bytes; values outside are clamped, fractions truncated
fn to_rgb_image<B: Backend>(rgb: Tensor<B, 2>, height: usize, width: usize) -> Result<RgbImage> {
    let scaled = rgb
        .add_scalar(1.0)
        .div_scalar(2.0)
        .clamp(0.0, 1.0)
        .mul_scalar(255.0);

    let bytes: Vec<u8> = scaled
        .into_data()
        .iter::<f32>()
        .map(|v| v as u8)
        .collect();

    RgbImage::from_raw(width as u32, height as u32, bytes).ok_or_else(|| {
        Error::InvalidSample(format!("Projected buffer does not fit a {}x{} image", width, height))
    })
}
