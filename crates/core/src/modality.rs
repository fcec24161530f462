//! Modality selection.
//!
//! A run always corrects the T1w image and additionally corrects and registers
//! the T2w image when one is supplied. The active set is fixed when the
//! configuration is built and never changes during a run.

use crate::config::{PipelineConfig, T2wSettings};
use crate::image::ImagePath;
use dcreg_types::PositiveDecimal;
use std::fmt;

/// Structural scan type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Modality {
    T1w,
    T2w,
}

impl Modality {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::T1w => "T1w",
            Self::T2w => "T2w",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The image pair and readout timing for one modality.
#[derive(Clone, Debug)]
pub struct ModalityInputs {
    pub modality: Modality,
    pub image: ImagePath,
    pub brain: ImagePath,
    pub sample_spacing: PositiveDecimal,
}

/// Destinations for the published T1w artifacts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct T1wOutputs {
    pub image: ImagePath,
    pub brain: ImagePath,
    pub transform: ImagePath,
}

/// One iteration of the distortion-correction loop.
///
/// Only the T1w pass carries output slots; the corrected T2w images stay in the
/// working directory for the registration stage.
#[derive(Clone, Copy, Debug)]
pub struct ModalityPass<'a> {
    pub inputs: &'a ModalityInputs,
    pub publish_to: Option<&'a T1wOutputs>,
}

/// Whether the T2w branch (registration stage and extra QA lines) runs.
pub fn using_t2(config: &PipelineConfig) -> bool {
    config.t2w().is_some()
}

/// The T1w pass, which publishes its corrected images.
pub fn t1w_pass(config: &PipelineConfig) -> ModalityPass<'_> {
    ModalityPass {
        inputs: config.t1w(),
        publish_to: Some(config.t1w_outputs()),
    }
}

/// The T2w pass; its corrected images stay in the working directory.
pub fn t2w_pass(t2w: &T2wSettings) -> ModalityPass<'_> {
    ModalityPass {
        inputs: &t2w.inputs,
        publish_to: None,
    }
}

/// Active modalities in processing order, T1w first.
pub fn active_modalities(config: &PipelineConfig) -> Vec<ModalityPass<'_>> {
    let mut passes = vec![t1w_pass(config)];
    passes.extend(config.t2w().map(t2w_pass));
    passes
}
