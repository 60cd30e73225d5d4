// ===========================================================================
// lv-preview/src/profiles.rs
// ===========================================================================

use burn::tensor::{backend::Backend, DType, Device, Tensor};
use lv_core::error::{Error, Result};
use lv_core::BaseModel;

use crate::state::LatentSample;

/// Pixels per latent cell along each axis, for every supported autoencoder
pub const LATENT_SCALE_FACTOR: u32 = 8;

// Factors are linear fits of autoencoder output color against latent
// channels; rows are latent channels, columns are R, G, B.

/// Stable Diffusion 1.x / 2.x
pub const SD1_5_LATENT_RGB_FACTORS: [[f32; 3]; 4] = [
    [0.3444, 0.1385, 0.0670],
    [0.1247, 0.4027, 0.1494],
    [-0.3192, 0.2513, 0.2103],
    [-0.1307, -0.1874, -0.7445],
];

/// Stable Diffusion XL base and refiner
pub const SDXL_LATENT_RGB_FACTORS: [[f32; 3]; 4] = [
    [0.3816, 0.4930, 0.5320],
    [-0.3753, 0.1631, 0.1739],
    [0.1770, 0.3588, -0.2048],
    [-0.4350, -0.2644, -0.4289],
];

pub const SDXL_SMOOTH_KERNEL: [[f32; 3]; 3] = [
    [0.0358, 0.0964, 0.0358],
    [0.0964, 0.4711, 0.0964],
    [0.0358, 0.0964, 0.0358],
];

/// Stable Diffusion 3.5
pub const SD3_5_LATENT_RGB_FACTORS: [[f32; 3]; 16] = [
    [-0.05240681, 0.03251581, 0.0749016],
    [-0.0580572, 0.00759826, 0.05729818],
    [0.16144888, 0.01270368, -0.03768577],
    [0.14418615, 0.08460266, 0.15941818],
    [0.04894035, 0.0056485, -0.06686988],
    [0.05187166, 0.19222395, 0.06261094],
    [0.1539433, 0.04818359, 0.07103094],
    [-0.08601796, 0.09013458, 0.10893912],
    [-0.12398469, -0.06766567, 0.0033688],
    [-0.0439737, 0.07825329, 0.02258823],
    [0.03101129, 0.06382551, 0.07753657],
    [-0.01315361, 0.08554491, -0.08772475],
    [0.06464487, 0.05914605, 0.13262741],
    [-0.07863674, -0.02261737, -0.12761454],
    [-0.09923835, -0.08010759, -0.06264447],
    [-0.03392309, -0.0804029, -0.06078822],
];

pub const FLUX_LATENT_RGB_FACTORS: [[f32; 3]; 16] = [
    [-0.0412, 0.0149, 0.0521],
    [0.0056, 0.0291, 0.0768],
    [0.0342, -0.0681, -0.0427],
    [-0.0258, 0.0092, 0.0463],
    [0.0863, 0.0784, 0.0547],
    [-0.0017, 0.0402, 0.0158],
    [0.0501, 0.1058, 0.1152],
    [-0.0209, -0.0218, -0.0329],
    [-0.0314, 0.0083, 0.0896],
    [0.0851, 0.0665, -0.0472],
    [-0.0534, 0.0238, -0.0024],
    [0.0452, -0.0026, 0.0048],
    [0.0892, 0.0831, 0.0881],
    [-0.1117, -0.0304, -0.0789],
    [0.0027, -0.0479, -0.0043],
    [-0.1146, -0.0827, -0.0598],
];

pub const COGVIEW4_LATENT_RGB_FACTORS: [[f32; 3]; 16] = [
    [0.00408832, -0.00082485, -0.00214816],
    [0.00084172, 0.00132241, 0.00842067],
    [-0.00466737, -0.00983181, -0.00699561],
    [0.03698397, -0.04797235, 0.03585809],
    [0.00234701, -0.00124326, 0.00080869],
    [-0.00723903, -0.00388422, -0.00656606],
    [-0.00970917, -0.00467356, -0.00971113],
    [0.17292486, -0.03452463, -0.1457515],
    [0.02330308, 0.02942557, 0.02704329],
    [-0.00903131, -0.01499841, -0.01432564],
    [0.01250298, 0.0019407, -0.02168986],
    [0.01371188, 0.00498283, -0.01302135],
    [0.42396525, 0.4280575, 0.42148206],
    [0.00983825, 0.00613302, 0.00610316],
    [0.00473307, -0.00889551, -0.00915924],
    [-0.00955853, -0.00980067, -0.00977842],
];

/// Color approximation constants for one latent layout
#[derive(Debug)]
pub struct ArchitectureProfile {
    pub name: &'static str,

    /// [C, 3] latent channel to RGB projection
    pub latent_rgb_factors: &'static [[f32; 3]],

    /// Optional 3x3 smoothing applied to each color channel after projection
    pub smooth_kernel: Option<&'static [[f32; 3]; 3]>,

    /// Pixels per latent cell
    pub spatial_downscale: u32,
}

impl ArchitectureProfile {
    pub fn latent_channels(&self) -> usize {
        self.latent_rgb_factors.len()
    }
}

static SD1_PROFILE: ArchitectureProfile = ArchitectureProfile {
    name: "sd-1.5",
    latent_rgb_factors: &SD1_5_LATENT_RGB_FACTORS,
    smooth_kernel: None,
    spatial_downscale: LATENT_SCALE_FACTOR,
};

static SDXL_PROFILE: ArchitectureProfile = ArchitectureProfile {
    name: "sdxl",
    latent_rgb_factors: &SDXL_LATENT_RGB_FACTORS,
    smooth_kernel: Some(&SDXL_SMOOTH_KERNEL),
    spatial_downscale: LATENT_SCALE_FACTOR,
};

static SD3_PROFILE: ArchitectureProfile = ArchitectureProfile {
    name: "sd-3.5",
    latent_rgb_factors: &SD3_5_LATENT_RGB_FACTORS,
    smooth_kernel: None,
    spatial_downscale: LATENT_SCALE_FACTOR,
};

static COGVIEW4_PROFILE: ArchitectureProfile = ArchitectureProfile {
    name: "cogview4",
    latent_rgb_factors: &COGVIEW4_LATENT_RGB_FACTORS,
    smooth_kernel: None,
    spatial_downscale: LATENT_SCALE_FACTOR,
};

static FLUX_PROFILE: ArchitectureProfile = ArchitectureProfile {
    name: "flux",
    latent_rgb_factors: &FLUX_LATENT_RGB_FACTORS,
    smooth_kernel: None,
    spatial_downscale: LATENT_SCALE_FACTOR,
};

/// Architectures with a preview profile. New architectures get a row here.
static REGISTRY: [(BaseModel, &ArchitectureProfile); 7] = [
    (BaseModel::StableDiffusion1, &SD1_PROFILE),
    (BaseModel::StableDiffusion2, &SD1_PROFILE),
    (BaseModel::StableDiffusionXL, &SDXL_PROFILE),
    (BaseModel::StableDiffusionXLRefiner, &SDXL_PROFILE),
    (BaseModel::StableDiffusion3, &SD3_PROFILE),
    (BaseModel::CogView4, &COGVIEW4_PROFILE),
    (BaseModel::Flux, &FLUX_PROFILE),
];

/// Look up the preview profile for an architecture
pub fn resolve(base_model: BaseModel) -> Result<&'static ArchitectureProfile> {
    REGISTRY
        .iter()
        .find(|(model, _)| *model == base_model)
        .map(|(_, profile)| *profile)
        .ok_or_else(|| Error::UnsupportedArchitecture(base_model.to_string()))
}

pub fn is_supported(base_model: BaseModel) -> bool {
    resolve(base_model).is_ok()
}

/// Architectures that can be previewed
pub fn registered() -> impl Iterator<Item = BaseModel> {
    REGISTRY.iter().map(|(model, _)| *model)
}

/// Profile constants materialized as tensors in a sample's numeric context.
///
/// The factors are cast to the sample's float dtype and live on the
/// sample's device, so projection never mixes precisions or devices.
#[derive(Clone, Debug)]
pub struct AdaptedProfile<B: Backend> {
    /// [C, 3]
    pub factors: Tensor<B, 2>,

    /// Depthwise weights [3, 1, 3, 3], one copy of the kernel per color channel
    pub kernel: Option<Tensor<B, 4>>,

    pub spatial_downscale: u32,
}

impl<B: Backend> AdaptedProfile<B> {
    pub fn new(profile: &ArchitectureProfile, device: &Device<B>, dtype: DType) -> Self {
        let channels = profile.latent_channels();
        let factors: Vec<f32> = profile
            .latent_rgb_factors
            .iter()
            .flat_map(|row| row.iter().copied())
            .collect();
        let factors = Tensor::<B, 1>::from_floats(factors.as_slice(), device)
            .reshape([channels, 3])
            .cast(dtype);

        let kernel = profile.smooth_kernel.map(|kernel| {
            let weights: Vec<f32> = (0..3)
                .flat_map(|_| kernel.iter().flat_map(|row| row.iter().copied()))
                .collect();
            Tensor::<B, 1>::from_floats(weights.as_slice(), device)
                .reshape([3, 1, 3, 3])
                .cast(dtype)
        });

        Self {
            factors,
            kernel,
            spatial_downscale: profile.spatial_downscale,
        }
    }

    /// Adapt to wherever and in whatever precision `sample` lives
    pub fn for_sample(profile: &ArchitectureProfile, sample: &LatentSample<B>) -> Self {
        Self::new(profile, &sample.device(), sample.dtype())
    }

    pub fn latent_channels(&self) -> usize {
        self.factors.dims()[0]
    }
}

#[cfg(test)]
mod tests {
    use burn_ndarray::NdArray;
    use super::*;

    type TestBackend = NdArray;

    #[test]
    fn test_registered_profiles() {
        let expected = [
            (BaseModel::StableDiffusion1, 4, false),
            (BaseModel::StableDiffusion2, 4, false),
            (BaseModel::StableDiffusionXL, 4, true),
            (BaseModel::StableDiffusionXLRefiner, 4, true),
            (BaseModel::StableDiffusion3, 16, false),
            (BaseModel::CogView4, 16, false),
            (BaseModel::Flux, 16, false),
        ];

        for (model, channels, smoothed) in expected {
            let profile = resolve(model).unwrap();
            assert_eq!(profile.latent_channels(), channels, "{model}");
            assert_eq!(profile.smooth_kernel.is_some(), smoothed, "{model}");
            assert_eq!(profile.spatial_downscale, 8);
        }

        assert_eq!(registered().count(), expected.len());
    }

    #[test]
    fn test_sub_variants_share_profiles() {
        let sd1 = resolve(BaseModel::StableDiffusion1).unwrap();
        let sd2 = resolve(BaseModel::StableDiffusion2).unwrap();
        assert!(std::ptr::eq(sd1, sd2));

        let base = resolve(BaseModel::StableDiffusionXL).unwrap();
        let refiner = resolve(BaseModel::StableDiffusionXLRefiner).unwrap();
        assert!(std::ptr::eq(base, refiner));
    }

    #[test]
    fn test_unsupported_architectures() {
        for model in [
            BaseModel::Any,
            BaseModel::FluxKontext,
            BaseModel::Imagen3,
            BaseModel::Imagen4,
            BaseModel::ChatGpt4o,
        ] {
            assert!(!is_supported(model));
            match resolve(model) {
                Err(Error::UnsupportedArchitecture(tag)) => assert_eq!(tag, model.tag()),
                other => panic!("Expected UnsupportedArchitecture, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_adapted_profile_shapes() {
        let device = Default::default();

        let sd3 = AdaptedProfile::<TestBackend>::new(resolve(BaseModel::StableDiffusion3).unwrap(), &device, DType::F32);
        assert_eq!(sd3.factors.dims(), [16, 3]);
        assert_eq!(sd3.latent_channels(), 16);
        assert!(sd3.kernel.is_none());

        let sdxl = AdaptedProfile::<TestBackend>::new(resolve(BaseModel::StableDiffusionXL).unwrap(), &device, DType::F32);
        let kernel = sdxl.kernel.unwrap();
        assert_eq!(kernel.dims(), [3, 1, 3, 3]);

        let weights: Vec<f32> = kernel.into_data().iter::<f32>().collect();
        assert_eq!(weights[4], 0.4711);
        assert_eq!(weights[9 + 4], 0.4711);
        assert_eq!(weights[18], 0.0358);
    }

    #[test]
    fn test_adapted_factors_keep_row_order() {
        let device = Default::default();
        let adapted = AdaptedProfile::<TestBackend>::new(resolve(BaseModel::Flux).unwrap(), &device, DType::F32);

        let values: Vec<f32> = adapted.factors.into_data().iter::<f32>().collect();
        assert_eq!(&values[..3], &FLUX_LATENT_RGB_FACTORS[0]);
        assert_eq!(&values[45..], &FLUX_LATENT_RGB_FACTORS[15]);
    }

    #[test]
    fn test_adapted_profile_follows_sample_dtype() {
        let device = Default::default();
        let sample = LatentSample::from(Tensor::<TestBackend, 3>::ones([4, 2, 2], &device).cast(DType::F64));

        let adapted = AdaptedProfile::for_sample(resolve(BaseModel::StableDiffusionXL).unwrap(), &sample);

        assert_eq!(adapted.factors.dtype(), DType::F64);
        assert_eq!(adapted.kernel.unwrap().dtype(), DType::F64);
    }
}
