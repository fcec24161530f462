//! Fieldmap preprocessing outputs.

use crate::image::ImagePath;
use std::path::{Path, PathBuf};

/// Subdirectory owned by the fieldmap preprocessing stage.
#[derive(Debug, Clone, Copy)]
pub struct FieldMapDir;

impl FieldMapDir {
    pub const NAME: &'static str = "FieldMap";
}

/// Fieldmap magnitude image.
#[derive(Debug, Clone, Copy)]
pub struct MagnitudeImage;

impl MagnitudeImage {
    pub const NAME: &'static str = "Magnitude";
}

/// Brain-extracted fieldmap magnitude image.
#[derive(Debug, Clone, Copy)]
pub struct MagnitudeBrainImage;

impl MagnitudeBrainImage {
    pub const NAME: &'static str = "Magnitude_brain";
}

/// Fieldmap phase image.
#[derive(Debug, Clone, Copy)]
pub struct PhaseImage;

impl PhaseImage {
    pub const NAME: &'static str = "Phase";
}

/// Field map in the backend's native units (rad/s).
#[derive(Debug, Clone, Copy)]
pub struct FieldMapImage;

impl FieldMapImage {
    pub const NAME: &'static str = "FieldMap";
}

/// Paths under `<workingdir>/FieldMap/`.
#[derive(Debug, Clone)]
pub struct FieldMapPaths {
    dir: PathBuf,
}

impl FieldMapPaths {
    pub fn new(working_dir: &Path) -> Self {
        Self {
            dir: working_dir.join(FieldMapDir::NAME),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn magnitude(&self) -> ImagePath {
        ImagePath::from_base(self.dir.join(MagnitudeImage::NAME))
    }

    pub fn magnitude_brain(&self) -> ImagePath {
        ImagePath::from_base(self.dir.join(MagnitudeBrainImage::NAME))
    }

    pub fn phase(&self) -> ImagePath {
        ImagePath::from_base(self.dir.join(PhaseImage::NAME))
    }

    pub fn fieldmap(&self) -> ImagePath {
        ImagePath::from_base(self.dir.join(FieldMapImage::NAME))
    }
}
