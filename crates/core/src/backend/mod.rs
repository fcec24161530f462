//! Imaging backend contracts.
//!
//! Every numerical step of the pipeline is delegated to an external toolkit.
//! [`ImagingBackend`] names those steps by what they produce, so the pipeline
//! can drive any toolkit that honours the same file contracts. [`FslBackend`]
//! is the implementation that shells out to FSL and the pipeline-suite scripts.
//!
//! Images are passed as extension-free base paths; matrices as full paths.

mod fsl;
mod runner;

pub use fsl::FslBackend;
pub use runner::{CommandRunner, SystemRunner, ToolInvocation};

use crate::image::ImagePath;
use dcreg_types::{PositiveDecimal, UnwarpDirection};
use std::path::{Path, PathBuf};

/// Errors raised while running an external tool.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The executable could not be started (not found, not executable, ...).
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and reported failure.
    #[error("{program} exited with {}", describe_code(.code))]
    Failed { program: String, code: Option<i32> },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_owned(),
    }
}

pub type ToolResult<T> = std::result::Result<T, ToolError>;

/// Resampling kernel for warp application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interpolation {
    /// Smooth kernel for intensity images.
    Spline,
    /// Preserves label and mask values.
    NearestNeighbour,
}

impl Interpolation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spline => "spline",
            Self::NearestNeighbour => "nn",
        }
    }
}

/// One voxel-wise operation, applied left to right.
#[derive(Clone, Debug, PartialEq)]
pub enum MathsOp {
    /// Zero every voxel outside the non-zero region of the given image.
    Mask(ImagePath),
    Add(f64),
    Mul(ImagePath),
    Sqrt,
}

/// A voxel-wise arithmetic request: `output = ops(input)`.
#[derive(Clone, Debug, PartialEq)]
pub struct MathsExpr {
    pub input: ImagePath,
    pub ops: Vec<MathsOp>,
    pub output: ImagePath,
    pub output_datatype: Option<&'static str>,
}

impl MathsExpr {
    pub fn new(input: ImagePath, output: ImagePath) -> Self {
        Self {
            input,
            ops: Vec::new(),
            output,
            output_datatype: None,
        }
    }

    pub fn op(mut self, op: MathsOp) -> Self {
        self.ops.push(op);
        self
    }

    pub fn datatype(mut self, datatype: &'static str) -> Self {
        self.output_datatype = Some(datatype);
        self
    }
}

/// Inputs and output locations for fieldmap preprocessing.
#[derive(Clone, Debug)]
pub struct FieldMapRequest<'a> {
    pub working_dir: &'a Path,
    pub magnitude: &'a ImagePath,
    pub phase: &'a ImagePath,
    pub echo_diff: &'a PositiveDecimal,
    pub gd_coeffs: Option<&'a Path>,
    pub out_magnitude: ImagePath,
    pub out_magnitude_brain: ImagePath,
    pub out_phase: ImagePath,
    pub out_fieldmap: ImagePath,
}

/// Forward distortion of an image by a field map.
#[derive(Clone, Debug)]
pub struct ForwardWarpRequest<'a> {
    pub input: &'a ImagePath,
    pub fieldmap: &'a ImagePath,
    pub dwell: &'a PositiveDecimal,
    pub direction: UnwarpDirection,
    pub output: &'a ImagePath,
}

/// Outputs of a registration: the resampled moving image and its affine.
#[derive(Clone, Debug)]
pub struct RegistrationOutputs {
    pub image: ImagePath,
    pub matrix: PathBuf,
}

/// Contract every imaging toolkit must satisfy.
///
/// Calls block until the underlying work has finished. An `Err` means the
/// outputs must not be trusted.
pub trait ImagingBackend {
    /// Turn magnitude/phase acquisitions into a field map plus magnitude images.
    fn prepare_fieldmap(&self, request: &FieldMapRequest<'_>) -> ToolResult<()>;

    /// Simulate the distortion a field map causes, with intensity correction.
    fn forward_warp(&self, request: &ForwardWarpRequest<'_>) -> ToolResult<()>;

    /// Rigid (6 dof) registration of `moving` onto `fixed`.
    fn register_rigid(
        &self,
        moving: &ImagePath,
        fixed: &ImagePath,
        outputs: &RegistrationOutputs,
    ) -> ToolResult<()>;

    /// Resample `input` onto `reference` through an affine.
    fn apply_affine(
        &self,
        input: &ImagePath,
        reference: &ImagePath,
        matrix: &Path,
        output: &ImagePath,
    ) -> ToolResult<()>;

    /// Convert a field map into a voxel-shift map for the given dwell time.
    fn fieldmap_to_shiftmap(
        &self,
        fieldmap: &ImagePath,
        dwell: &PositiveDecimal,
        output: &ImagePath,
    ) -> ToolResult<()>;

    /// Convert a shift map into a relative-displacement deformation field.
    fn shiftmap_to_warp(
        &self,
        shiftmap: &ImagePath,
        reference: &ImagePath,
        direction: UnwarpDirection,
        output: &ImagePath,
    ) -> ToolResult<()>;

    /// Resample `input` onto `reference` through a relative deformation field.
    fn apply_warp(
        &self,
        input: &ImagePath,
        reference: &ImagePath,
        warp: &ImagePath,
        interpolation: Interpolation,
        output: &ImagePath,
    ) -> ToolResult<()>;

    /// Voxel-wise arithmetic.
    fn maths(&self, expr: &MathsExpr) -> ToolResult<()>;

    /// Boundary-based registration of a brain image onto a structural pair.
    fn register_cross_modal(
        &self,
        moving_brain: &ImagePath,
        fixed: &ImagePath,
        fixed_brain: &ImagePath,
        outputs: &RegistrationOutputs,
    ) -> ToolResult<()>;

    /// Chain a deformation field with a post-affine into one relative field.
    fn compose_warp(
        &self,
        reference: &ImagePath,
        warp: &ImagePath,
        post_affine: &Path,
        output: &ImagePath,
    ) -> ToolResult<()>;

    /// Container-aware image copy (overwrites `destination`).
    fn copy_image(&self, source: &ImagePath, destination: &ImagePath) -> ToolResult<()>;
}
