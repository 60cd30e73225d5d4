use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Model architecture a generation session runs on.
///
/// Only some of these carry a latent preview profile; the rest are part of
/// the wider model taxonomy and are rejected when a preview is requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseModel {
    #[serde(rename = "any")]
    Any,
    #[serde(rename = "sd-1")]
    StableDiffusion1,
    #[serde(rename = "sd-2")]
    StableDiffusion2,
    #[serde(rename = "sdxl")]
    StableDiffusionXL,
    #[serde(rename = "sdxl-refiner")]
    StableDiffusionXLRefiner,
    #[serde(rename = "sd-3")]
    StableDiffusion3,
    #[serde(rename = "cogview4")]
    CogView4,
    #[serde(rename = "flux")]
    Flux,
    #[serde(rename = "flux-kontext")]
    FluxKontext,
    #[serde(rename = "imagen3")]
    Imagen3,
    #[serde(rename = "imagen4")]
    Imagen4,
    #[serde(rename = "chatgpt-4o")]
    ChatGpt4o,
}

impl BaseModel {
    pub const ALL: [BaseModel; 12] = [
        BaseModel::Any,
        BaseModel::StableDiffusion1,
        BaseModel::StableDiffusion2,
        BaseModel::StableDiffusionXL,
        BaseModel::StableDiffusionXLRefiner,
        BaseModel::StableDiffusion3,
        BaseModel::CogView4,
        BaseModel::Flux,
        BaseModel::FluxKontext,
        BaseModel::Imagen3,
        BaseModel::Imagen4,
        BaseModel::ChatGpt4o,
    ];

    /// Wire tag, as used in serialized sessions and on the command line
    pub fn tag(&self) -> &'static str {
        match self {
            BaseModel::Any => "any",
            BaseModel::StableDiffusion1 => "sd-1",
            BaseModel::StableDiffusion2 => "sd-2",
            BaseModel::StableDiffusionXL => "sdxl",
            BaseModel::StableDiffusionXLRefiner => "sdxl-refiner",
            BaseModel::StableDiffusion3 => "sd-3",
            BaseModel::CogView4 => "cogview4",
            BaseModel::Flux => "flux",
            BaseModel::FluxKontext => "flux-kontext",
            BaseModel::Imagen3 => "imagen3",
            BaseModel::Imagen4 => "imagen4",
            BaseModel::ChatGpt4o => "chatgpt-4o",
        }
    }
}

impl fmt::Display for BaseModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for BaseModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        BaseModel::ALL
            .iter()
            .copied()
            .find(|model| model.tag().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnsupportedArchitecture(s.to_string()))
    }
}
