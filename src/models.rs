//! Segmentation model identifiers
//!
//! The set of models is closed: every identifier that reaches the session
//! cache has already been validated by parsing it into a [`ModelId`].

use crate::error::BgRemovalError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported segmentation networks
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum ModelId {
    #[serde(rename = "u2net")]
    U2Net,
    #[serde(rename = "u2netp")]
    U2NetP,
    #[serde(rename = "u2net_human_seg")]
    U2NetHumanSeg,
    #[serde(rename = "u2net_cloth_seg")]
    U2NetClothSeg,
    #[serde(rename = "silueta")]
    Silueta,
    #[default]
    #[serde(rename = "isnet-general-use")]
    IsnetGeneralUse,
    #[serde(rename = "isnet-anime")]
    IsnetAnime,
}

/// Input geometry and normalization expected by a model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelProfile {
    /// Square input resolution in pixels
    pub input_size: u32,
    /// Per-channel mean subtracted after scaling to [0, 1]
    pub mean: [f32; 3],
    /// Per-channel divisor applied after mean subtraction
    pub std: [f32; 3],
}

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

impl ModelId {
    /// All supported models, in presentation order
    pub const ALL: [ModelId; 7] = [
        ModelId::U2Net,
        ModelId::U2NetP,
        ModelId::U2NetHumanSeg,
        ModelId::U2NetClothSeg,
        ModelId::Silueta,
        ModelId::IsnetGeneralUse,
        ModelId::IsnetAnime,
    ];

    /// Canonical identifier string
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::U2Net => "u2net",
            Self::U2NetP => "u2netp",
            Self::U2NetHumanSeg => "u2net_human_seg",
            Self::U2NetClothSeg => "u2net_cloth_seg",
            Self::Silueta => "silueta",
            Self::IsnetGeneralUse => "isnet-general-use",
            Self::IsnetAnime => "isnet-anime",
        }
    }

    /// File name of the ONNX weights inside the model directory
    #[must_use]
    pub fn file_name(self) -> String {
        format!("{}.onnx", self.as_str())
    }

    /// Preprocessing profile for this model
    #[must_use]
    pub fn profile(self) -> ModelProfile {
        match self {
            Self::U2Net | Self::U2NetP | Self::U2NetHumanSeg | Self::Silueta => ModelProfile {
                input_size: 320,
                mean: IMAGENET_MEAN,
                std: IMAGENET_STD,
            },
            Self::U2NetClothSeg => ModelProfile {
                input_size: 768,
                mean: IMAGENET_MEAN,
                std: IMAGENET_STD,
            },
            Self::IsnetGeneralUse => ModelProfile {
                input_size: 1024,
                mean: [0.5, 0.5, 0.5],
                std: [1.0, 1.0, 1.0],
            },
            Self::IsnetAnime => ModelProfile {
                input_size: 1024,
                mean: IMAGENET_MEAN,
                std: [1.0, 1.0, 1.0],
            },
        }
    }

    /// Whether the model emits per-class logits instead of a single saliency map
    #[must_use]
    pub fn is_multiclass(self) -> bool {
        matches!(self, Self::U2NetClothSeg)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = BgRemovalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|model| model.as_str() == s)
            .ok_or_else(|| BgRemovalError::ModelIdentifier(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_id_round_trip_through_strings() {
        for model in ModelId::ALL {
            assert_eq!(model.as_str().parse::<ModelId>().unwrap(), model);
            assert_eq!(model.to_string(), model.as_str());
        }
    }

    #[test]
    fn test_unknown_identifier_rejected() {
        let err = "birefnet".parse::<ModelId>().unwrap_err();
        assert!(matches!(err, BgRemovalError::ModelIdentifier(ref id) if id == "birefnet"));

        // Identifiers are case sensitive, like the model file names
        assert!("U2NET".parse::<ModelId>().is_err());
        assert!("".parse::<ModelId>().is_err());
    }

    #[test]
    fn test_default_model() {
        assert_eq!(ModelId::default(), ModelId::IsnetGeneralUse);
        assert_eq!(ModelId::default().file_name(), "isnet-general-use.onnx");
    }

    #[test]
    fn test_serde_uses_canonical_names() {
        let json = serde_json::to_string(&ModelId::U2NetHumanSeg).unwrap();
        assert_eq!(json, "\"u2net_human_seg\"");
        let parsed: ModelId = serde_json::from_str("\"isnet-anime\"").unwrap();
        assert_eq!(parsed, ModelId::IsnetAnime);
    }

    #[test]
    fn test_profiles() {
        assert_eq!(ModelId::U2NetP.profile().input_size, 320);
        assert_eq!(ModelId::U2NetClothSeg.profile().input_size, 768);
        assert_eq!(ModelId::IsnetGeneralUse.profile().mean, [0.5, 0.5, 0.5]);
        assert!(ModelId::U2NetClothSeg.is_multiclass());
        assert!(!ModelId::Silueta.is_multiclass());
    }
}
