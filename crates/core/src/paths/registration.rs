//! T2w-to-T1w registration artifacts.

use crate::image::ImagePath;
use std::path::{Path, PathBuf};

/// Subdirectory owned by the registration stage.
#[derive(Debug, Clone, Copy)]
pub struct RegistrationDir;

impl RegistrationDir {
    pub const NAME: &'static str = "T2w2T1w";
}

/// Output prefix of the cross-modal registration; also the final T2w image.
#[derive(Debug, Clone, Copy)]
pub struct RegisteredT2wImage;

impl RegisteredT2wImage {
    pub const NAME: &'static str = "T2w_reg";
}

/// Distortion-correction warp composed with the registration affine.
#[derive(Debug, Clone, Copy)]
pub struct ComposedWarpImage;

impl ComposedWarpImage {
    pub const NAME: &'static str = "T2w_dc_reg";
}

/// Geometric mean of the registered T2w and the T1w, for inspection.
#[derive(Debug, Clone, Copy)]
pub struct GeometricMeanImage;

impl GeometricMeanImage {
    pub const NAME: &'static str = "sqrtT1wbyT2w";
}

/// Paths under `<workingdir>/T2w2T1w/`.
#[derive(Debug, Clone)]
pub struct RegistrationPaths {
    dir: PathBuf,
}

impl RegistrationPaths {
    pub fn new(working_dir: &Path) -> Self {
        Self {
            dir: working_dir.join(RegistrationDir::NAME),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Registered T2w image. The cross-modal tool writes it first and the
    /// single-step resampling later overwrites it.
    pub fn registered_t2w(&self) -> ImagePath {
        ImagePath::from_base(self.dir.join(RegisteredT2wImage::NAME))
    }

    /// Affine written alongside the registration output prefix.
    pub fn registration_matrix(&self) -> PathBuf {
        self.dir.join(format!("{}.mat", RegisteredT2wImage::NAME))
    }

    pub fn composed_warp(&self) -> ImagePath {
        ImagePath::from_base(self.dir.join(ComposedWarpImage::NAME))
    }

    pub fn geometric_mean(&self) -> ImagePath {
        ImagePath::from_base(self.dir.join(GeometricMeanImage::NAME))
    }
}
