//! FSL-backed implementation of [`ImagingBackend`].
//!
//! Each contract method renders one tool invocation with the fixed flag set the
//! pipeline relies on, then hands it to a [`CommandRunner`].

use super::{
    CommandRunner, FieldMapRequest, ForwardWarpRequest, ImagingBackend, Interpolation, MathsExpr,
    MathsOp, RegistrationOutputs, SystemRunner, ToolInvocation, ToolResult,
};
use crate::config::ToolLocations;
use crate::constants::{fsl, scripts, NONE_SENTINEL, RIGID_DOF, SEARCH_RANGE_DEGREES};
use crate::image::ImagePath;
use dcreg_types::{PositiveDecimal, UnwarpDirection};
use std::ffi::OsStr;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct FslBackend<R = SystemRunner> {
    tools: ToolLocations,
    runner: R,
}

impl FslBackend<SystemRunner> {
    pub fn new(tools: ToolLocations) -> Self {
        Self::with_runner(tools, SystemRunner)
    }
}

impl<R: CommandRunner> FslBackend<R> {
    pub fn with_runner(tools: ToolLocations, runner: R) -> Self {
        Self { tools, runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn fsl(&self, name: &str) -> ToolInvocation {
        ToolInvocation::new(self.tools.fsl_program(name))
    }

    fn script(&self, name: &str) -> ToolInvocation {
        ToolInvocation::new(self.tools.script(name))
    }
}

fn path_arg(path: &impl AsRef<Path>) -> &OsStr {
    path.as_ref().as_os_str()
}

impl<R: CommandRunner> ImagingBackend for FslBackend<R> {
    fn prepare_fieldmap(&self, request: &FieldMapRequest<'_>) -> ToolResult<()> {
        let gd_coeffs = request
            .gd_coeffs
            .map(|p| p.as_os_str())
            .unwrap_or(OsStr::new(NONE_SENTINEL));

        let inv = self
            .script(scripts::FIELDMAP_PREPROCESSING)
            .flag("workingdir", request.working_dir)
            .flag("fmapmag", path_arg(request.magnitude))
            .flag("fmapphase", path_arg(request.phase))
            .flag("echodiff", request.echo_diff.as_str())
            .flag("ofmapmag", path_arg(&request.out_magnitude))
            .flag("ofmapmagbrain", path_arg(&request.out_magnitude_brain))
            .flag("ofmapphase", path_arg(&request.out_phase))
            .flag("ofmap", path_arg(&request.out_fieldmap))
            .flag("gdcoeffs", gd_coeffs);
        self.runner.run(&inv)
    }

    fn forward_warp(&self, request: &ForwardWarpRequest<'_>) -> ToolResult<()> {
        let inv = self
            .fsl(fsl::FUGUE)
            .arg("-v")
            .arg("-i")
            .arg(path_arg(request.input))
            .arg("--icorr")
            .flag("unwarpdir", request.direction.as_str())
            .flag("dwell", request.dwell.as_str())
            .flag("loadfmap", path_arg(request.fieldmap))
            .arg("-w")
            .arg(path_arg(request.output));
        self.runner.run(&inv)
    }

    fn register_rigid(
        &self,
        moving: &ImagePath,
        fixed: &ImagePath,
        outputs: &RegistrationOutputs,
    ) -> ToolResult<()> {
        let range_lo = (-SEARCH_RANGE_DEGREES).to_string();
        let range_hi = SEARCH_RANGE_DEGREES.to_string();

        let mut inv = self
            .fsl(fsl::FLIRT)
            .arg("-interp")
            .arg(Interpolation::Spline.as_str())
            .arg("-dof")
            .arg(RIGID_DOF.to_string())
            .arg("-in")
            .arg(path_arg(moving))
            .arg("-ref")
            .arg(path_arg(fixed))
            .arg("-out")
            .arg(path_arg(&outputs.image))
            .arg("-omat")
            .arg(&outputs.matrix);
        for axis in ["-searchrx", "-searchry", "-searchrz"] {
            inv = inv.arg(axis).arg(&range_lo).arg(&range_hi);
        }
        self.runner.run(&inv)
    }

    fn apply_affine(
        &self,
        input: &ImagePath,
        reference: &ImagePath,
        matrix: &Path,
        output: &ImagePath,
    ) -> ToolResult<()> {
        let inv = self
            .fsl(fsl::FLIRT)
            .arg("-in")
            .arg(path_arg(input))
            .arg("-ref")
            .arg(path_arg(reference))
            .arg("-applyxfm")
            .arg("-init")
            .arg(matrix)
            .arg("-out")
            .arg(path_arg(output));
        self.runner.run(&inv)
    }

    fn fieldmap_to_shiftmap(
        &self,
        fieldmap: &ImagePath,
        dwell: &PositiveDecimal,
        output: &ImagePath,
    ) -> ToolResult<()> {
        let inv = self
            .fsl(fsl::FUGUE)
            .flag("loadfmap", path_arg(fieldmap))
            .flag("dwell", dwell.as_str())
            .flag("saveshift", path_arg(output));
        self.runner.run(&inv)
    }

    fn shiftmap_to_warp(
        &self,
        shiftmap: &ImagePath,
        reference: &ImagePath,
        direction: UnwarpDirection,
        output: &ImagePath,
    ) -> ToolResult<()> {
        let inv = self
            .fsl(fsl::CONVERTWARP)
            .arg("--relout")
            .arg("--rel")
            .flag("ref", path_arg(reference))
            .flag("shiftmap", path_arg(shiftmap))
            .flag("shiftdir", direction.as_str())
            .flag("out", path_arg(output));
        self.runner.run(&inv)
    }

    fn apply_warp(
        &self,
        input: &ImagePath,
        reference: &ImagePath,
        warp: &ImagePath,
        interpolation: Interpolation,
        output: &ImagePath,
    ) -> ToolResult<()> {
        let inv = self
            .fsl(fsl::APPLYWARP)
            .arg("--rel")
            .flag("interp", interpolation.as_str())
            .flag("in", path_arg(input))
            .flag("ref", path_arg(reference))
            .flag("warp", path_arg(warp))
            .flag("out", path_arg(output));
        self.runner.run(&inv)
    }

    fn maths(&self, expr: &MathsExpr) -> ToolResult<()> {
        let mut inv = self.fsl(fsl::FSLMATHS).arg(path_arg(&expr.input));
        for op in &expr.ops {
            inv = match op {
                MathsOp::Mask(mask) => inv.arg("-mas").arg(path_arg(mask)),
                MathsOp::Add(value) => inv.arg("-add").arg(value.to_string()),
                MathsOp::Mul(other) => inv.arg("-mul").arg(path_arg(other)),
                MathsOp::Sqrt => inv.arg("-sqrt"),
            };
        }
        inv = inv.arg(path_arg(&expr.output));
        if let Some(datatype) = expr.output_datatype {
            inv = inv.arg("-odt").arg(datatype);
        }
        self.runner.run(&inv)
    }

    /// `epi_reg_dof` names its matrix after the output prefix, so
    /// `outputs.matrix` is expected to be `<outputs.image>.mat`.
    fn register_cross_modal(
        &self,
        moving_brain: &ImagePath,
        fixed: &ImagePath,
        fixed_brain: &ImagePath,
        outputs: &RegistrationOutputs,
    ) -> ToolResult<()> {
        let inv = self
            .script(scripts::EPI_REG_DOF)
            .flag("dof", RIGID_DOF.to_string())
            .flag("epi", path_arg(moving_brain))
            .flag("t1", path_arg(fixed))
            .flag("t1brain", path_arg(fixed_brain))
            .flag("out", path_arg(&outputs.image));
        self.runner.run(&inv)
    }

    fn compose_warp(
        &self,
        reference: &ImagePath,
        warp: &ImagePath,
        post_affine: &Path,
        output: &ImagePath,
    ) -> ToolResult<()> {
        let inv = self
            .fsl(fsl::CONVERTWARP)
            .arg("--relout")
            .arg("--rel")
            .flag("ref", path_arg(reference))
            .flag("warp1", path_arg(warp))
            .flag("postmat", post_affine)
            .flag("out", path_arg(output));
        self.runner.run(&inv)
    }

    fn copy_image(&self, source: &ImagePath, destination: &ImagePath) -> ToolResult<()> {
        let inv = self
            .fsl(fsl::IMCP)
            .arg(path_arg(source))
            .arg(path_arg(destination));
        self.runner.run(&inv)
    }
}
