//! Per-modality distortion-correction artifacts.
//!
//! Names embed the modality tag or the brain image's base name so the T1w
//! and T2w passes never write to the same file.

use crate::image::ImagePath;
use crate::modality::{Modality, ModalityInputs};
use std::path::{Path, PathBuf};

/// Paths written by one pass of the distortion-correction loop.
#[derive(Debug, Clone)]
pub struct ModalityPaths {
    root: PathBuf,
    modality: Modality,
    image_base: String,
    brain_base: String,
}

impl ModalityPaths {
    pub fn new(working_dir: &Path, inputs: &ModalityInputs) -> Self {
        Self {
            root: working_dir.to_path_buf(),
            modality: inputs.modality,
            image_base: inputs.image.base_name(),
            brain_base: inputs.brain.base_name(),
        }
    }

    fn image(&self, name: String) -> ImagePath {
        ImagePath::from_base(self.root.join(name))
    }

    /// Fieldmap magnitude forward-warped with this modality's dwell time.
    pub fn warped_magnitude(&self) -> ImagePath {
        self.image(format!("Magnitude_brain_warpped{}", self.modality))
    }

    /// Warped magnitude resampled onto the modality's brain image.
    pub fn registered_magnitude(&self) -> ImagePath {
        self.image(format!(
            "Magnitude_brain_warpped{}2{}",
            self.modality, self.brain_base
        ))
    }

    /// Rigid transform from fieldmap space to the modality's brain image.
    pub fn fieldmap_matrix(&self) -> PathBuf {
        self.root.join(format!("Fieldmap2{}.mat", self.brain_base))
    }

    /// Field map resampled into the modality's space.
    pub fn aligned_fieldmap(&self) -> ImagePath {
        self.image(format!("FieldMap2{}", self.brain_base))
    }

    pub fn shift_map(&self) -> ImagePath {
        self.image(format!("FieldMap2{}_ShiftMap", self.brain_base))
    }

    /// Dense deformation field that undoes the distortion.
    pub fn warp(&self) -> ImagePath {
        self.image(format!("FieldMap2{}_Warp", self.brain_base))
    }

    pub fn corrected_image(&self) -> ImagePath {
        self.image(self.image_base.clone())
    }

    pub fn corrected_brain(&self) -> ImagePath {
        self.image(self.brain_base.clone())
    }
}
