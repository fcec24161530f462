//! Constants used throughout the dcreg core crate.
//!
//! Tool names, sentinel values and file-name fragments live here so every
//! stage refers to the same spelling.

/// Value that callers pass for an optional input they do not have.
pub const NONE_SENTINEL: &str = "NONE";

/// Image container extensions recognised when stripping or resolving image names.
///
/// Compound extensions come first so `.nii.gz` is not mistaken for `.gz`.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    ".nii.gz", ".hdr.gz", ".img.gz", ".mnc.gz", ".nii", ".hdr", ".img", ".mnc",
];

/// Working-directory fallback when `--workingdir` is not supplied.
pub const DEFAULT_WORKING_DIR: &str = ".";

/// Viewer named in the inspection script.
pub const QA_VIEWER: &str = "fslview";

/// Output datatype requested from the voxel-arithmetic tool.
pub const FLOAT_DATATYPE: &str = "float";

/// Intensity offset added to the registered T2w image so no voxel is exactly zero.
pub const T2W_INTENSITY_OFFSET: f64 = 1.0;

/// Degrees of freedom for both rigid registrations.
pub const RIGID_DOF: u8 = 6;

/// Rotation search range (degrees) for the fieldmap-to-structural registration.
pub const SEARCH_RANGE_DEGREES: i32 = 30;

/// FSL executables, resolved against `$FSLDIR/bin` when available.
pub mod fsl {
    pub const FUGUE: &str = "fugue";
    pub const FLIRT: &str = "flirt";
    pub const CONVERTWARP: &str = "convertwarp";
    pub const APPLYWARP: &str = "applywarp";
    pub const FSLMATHS: &str = "fslmaths";
    pub const IMCP: &str = "imcp";
}

/// Pipeline-suite scripts, resolved against the global scripts directory.
pub mod scripts {
    pub const FIELDMAP_PREPROCESSING: &str = "FieldMapPreprocessingAll.sh";
    pub const EPI_REG_DOF: &str = "epi_reg_dof";
}
