//! End-to-end orchestration.
//!
//! Order of work:
//!
//! 1. check every input exists (no tool runs if one is missing)
//! 2. create the working directory and append to `log.txt`
//! 3. fieldmap preprocessing
//! 4. distortion correction for each active modality, T1w first
//! 5. T2w-to-T1w registration when a T2w image was supplied
//! 6. regenerate `qa.txt`
//!
//! Every step blocks until its tool exits and the first failure ends the run.
//! Nothing is cleaned up on failure. Two runs sharing a working directory
//! write the same file names, so keeping runs apart is the caller's job.

use crate::backend::ImagingBackend;
use crate::config::PipelineConfig;
use crate::image::ImagePath;
use crate::modality::{active_modalities, t1w_pass, t2w_pass, using_t2};
use crate::paths::WorkingDirPaths;
use crate::qa::QaScript;
use crate::run_log::append_run_log;
use crate::stages::distortion::correct_modality;
use crate::stages::fieldmap::prepare_fieldmap;
use crate::stages::registration::register_t2w_to_t1w;
use crate::{PipelineError, PipelineResult};
use std::fs;
use std::path::PathBuf;

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub using_t2: bool,
    /// Output copies in the order they were written.
    pub published: Vec<ImagePath>,
    pub qa_script: PathBuf,
}

/// One configured run against a backend.
#[derive(Debug)]
pub struct Pipeline<'a, B> {
    config: &'a PipelineConfig,
    backend: &'a B,
}

impl<'a, B: ImagingBackend> Pipeline<'a, B> {
    pub fn new(config: &'a PipelineConfig, backend: &'a B) -> Self {
        Self { config, backend }
    }

    pub fn run(&self) -> PipelineResult<RunSummary> {
        let config = self.config;
        config.verify_inputs()?;

        let working_dir = WorkingDirPaths::new(config.working_dir());
        fs::create_dir_all(working_dir.root()).map_err(|source| {
            PipelineError::WorkingDirCreation {
                path: working_dir.root().to_path_buf(),
                source,
            }
        })?;
        append_run_log(
            &working_dir.run_log(),
            config.invocation(),
            config.launch_dir(),
            chrono::Local::now(),
        )?;

        tracing::info!(
            "START: distortion correction in {}",
            working_dir.root().display()
        );
        let modalities: Vec<&str> = active_modalities(config)
            .iter()
            .map(|pass| pass.inputs.modality.as_str())
            .collect();
        tracing::info!("modalities: {}", modalities.join(", "));

        let fieldmap = prepare_fieldmap(config, &working_dir, self.backend)?;

        let t1w = correct_modality(
            t1w_pass(config),
            config,
            &working_dir,
            &fieldmap,
            self.backend,
        )?;
        let mut published = t1w.published.clone();

        if let Some(t2w_settings) = config.t2w() {
            let t2w = correct_modality(
                t2w_pass(t2w_settings),
                config,
                &working_dir,
                &fieldmap,
                self.backend,
            )?;
            published.extend(register_t2w_to_t1w(
                config,
                t2w_settings,
                &t1w,
                &t2w,
                &working_dir,
                self.backend,
            )?);
        }

        let qa_script = working_dir.qa_script();
        QaScript::for_run(config, &working_dir).write(&qa_script)?;

        tracing::info!("END: distortion correction");

        Ok(RunSummary {
            using_t2: using_t2(config),
            published,
            qa_script,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        FieldMapRequest, ForwardWarpRequest, Interpolation, MathsExpr, RegistrationOutputs,
        ToolError, ToolResult,
    };
    use crate::config::test_support::{create_inputs, full_args, t1w_only_args};
    use crate::config::PipelineArgs;
    use crate::stages::Stage;
    use std::cell::RefCell;
    use std::path::Path;
    use tempfile::TempDir;

    /// One recorded backend call.
    #[derive(Debug, Clone)]
    struct Call {
        method: &'static str,
        inputs: Vec<PathBuf>,
        output: PathBuf,
        interpolation: Option<Interpolation>,
    }

    /// Backend that records calls and creates the images they would produce.
    #[derive(Default)]
    struct FakeBackend {
        calls: RefCell<Vec<Call>>,
        fail_on: Option<&'static str>,
    }

    impl FakeBackend {
        fn failing_on(method: &'static str) -> Self {
            Self {
                fail_on: Some(method),
                ..Self::default()
            }
        }

        fn methods(&self) -> Vec<&'static str> {
            self.calls.borrow().iter().map(|c| c.method).collect()
        }

        fn calls_to(&self, method: &str) -> Vec<Call> {
            self.calls
                .borrow()
                .iter()
                .filter(|c| c.method == method)
                .cloned()
                .collect()
        }

        fn record(
            &self,
            method: &'static str,
            inputs: &[&Path],
            output: &ImagePath,
            interpolation: Option<Interpolation>,
        ) -> ToolResult<()> {
            self.calls.borrow_mut().push(Call {
                method,
                inputs: inputs.iter().map(|p| p.to_path_buf()).collect(),
                output: output.base().to_path_buf(),
                interpolation,
            });
            if self.fail_on == Some(method) {
                return Err(ToolError::Failed {
                    program: method.into(),
                    code: Some(3),
                });
            }
            touch_image(output);
            Ok(())
        }
    }

    fn touch_image(image: &ImagePath) {
        if let Some(parent) = image.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(format!("{}.nii.gz", image.base().display()), b"img").unwrap();
    }

    impl ImagingBackend for FakeBackend {
        fn prepare_fieldmap(&self, request: &FieldMapRequest<'_>) -> ToolResult<()> {
            self.record(
                "prepare_fieldmap",
                &[request.magnitude.base(), request.phase.base()],
                &request.out_fieldmap,
                None,
            )?;
            for image in [
                &request.out_magnitude,
                &request.out_magnitude_brain,
                &request.out_phase,
            ] {
                touch_image(image);
            }
            Ok(())
        }

        fn forward_warp(&self, request: &ForwardWarpRequest<'_>) -> ToolResult<()> {
            self.record(
                "forward_warp",
                &[request.input.base(), request.fieldmap.base()],
                request.output,
                None,
            )
        }

        fn register_rigid(
            &self,
            moving: &ImagePath,
            fixed: &ImagePath,
            outputs: &RegistrationOutputs,
        ) -> ToolResult<()> {
            self.record("register_rigid", &[moving.base(), fixed.base()], &outputs.image, None)?;
            fs::write(&outputs.matrix, b"1 0 0 0\n").unwrap();
            Ok(())
        }

        fn apply_affine(
            &self,
            input: &ImagePath,
            reference: &ImagePath,
            matrix: &Path,
            output: &ImagePath,
        ) -> ToolResult<()> {
            self.record("apply_affine", &[input.base(), reference.base(), matrix], output, None)
        }

        fn fieldmap_to_shiftmap(
            &self,
            fieldmap: &ImagePath,
            _dwell: &dcreg_types::PositiveDecimal,
            output: &ImagePath,
        ) -> ToolResult<()> {
            self.record("fieldmap_to_shiftmap", &[fieldmap.base()], output, None)
        }

        fn shiftmap_to_warp(
            &self,
            shiftmap: &ImagePath,
            reference: &ImagePath,
            _direction: dcreg_types::UnwarpDirection,
            output: &ImagePath,
        ) -> ToolResult<()> {
            self.record("shiftmap_to_warp", &[shiftmap.base(), reference.base()], output, None)
        }

        fn apply_warp(
            &self,
            input: &ImagePath,
            reference: &ImagePath,
            warp: &ImagePath,
            interpolation: Interpolation,
            output: &ImagePath,
        ) -> ToolResult<()> {
            self.record(
                "apply_warp",
                &[input.base(), reference.base(), warp.base()],
                output,
                Some(interpolation),
            )
        }

        fn maths(&self, expr: &MathsExpr) -> ToolResult<()> {
            self.record("maths", &[expr.input.base()], &expr.output, None)
        }

        fn register_cross_modal(
            &self,
            moving_brain: &ImagePath,
            fixed: &ImagePath,
            fixed_brain: &ImagePath,
            outputs: &RegistrationOutputs,
        ) -> ToolResult<()> {
            self.record(
                "register_cross_modal",
                &[moving_brain.base(), fixed.base(), fixed_brain.base()],
                &outputs.image,
                None,
            )?;
            fs::write(&outputs.matrix, b"1 0 0 0\n").unwrap();
            Ok(())
        }

        fn compose_warp(
            &self,
            reference: &ImagePath,
            warp: &ImagePath,
            post_affine: &Path,
            output: &ImagePath,
        ) -> ToolResult<()> {
            self.record(
                "compose_warp",
                &[reference.base(), warp.base(), post_affine],
                output,
                None,
            )
        }

        fn copy_image(&self, source: &ImagePath, destination: &ImagePath) -> ToolResult<()> {
            self.record("copy_image", &[source.base()], destination, None)
        }
    }

    fn config_for(args: PipelineArgs) -> PipelineConfig {
        PipelineConfig::from_args(args, PathBuf::from("/launch"), "dcreg --t1=...".into()).unwrap()
    }

    fn image_exists(path: &Path) -> bool {
        ImagePath::from_base(path).exists()
    }

    fn viewer_lines(qa: &Path) -> usize {
        fs::read_to_string(qa)
            .unwrap()
            .lines()
            .filter(|line| line.starts_with("fslview "))
            .count()
    }

    #[test]
    fn t1w_only_run_publishes_only_t1w_outputs() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        create_inputs(root);
        let config = config_for(t1w_only_args(root));
        let backend = FakeBackend::default();

        let summary = Pipeline::new(&config, &backend).run().unwrap();

        assert!(!summary.using_t2);
        assert_eq!(summary.published.len(), 3);
        for name in ["T1w_acpc_dc", "T1w_acpc_dc_brain", "T1w_dc_warp"] {
            assert!(image_exists(&root.join("out").join(name)), "{name} missing");
        }
        for name in ["T2w_acpc_dc", "T2w_reg_dc_warp"] {
            assert!(!image_exists(&root.join("out").join(name)), "{name} written");
        }
        assert!(backend.calls_to("register_cross_modal").is_empty());
        assert!(backend.calls_to("compose_warp").is_empty());
        assert!(!root.join("wd/T2w2T1w").exists());
        assert_eq!(viewer_lines(&summary.qa_script), 1);
    }

    #[test]
    fn full_run_publishes_t1w_and_t2w_outputs() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        create_inputs(root);
        let coeffs = root.join("in/coeff.grad");
        fs::write(&coeffs, b"coefficients").unwrap();
        let args = PipelineArgs {
            gd_coeffs: Some(coeffs.to_string_lossy().into_owned()),
            ..full_args(root)
        };
        let config = config_for(args);
        let backend = FakeBackend::default();

        let summary = Pipeline::new(&config, &backend).run().unwrap();

        assert!(summary.using_t2);
        assert_eq!(summary.published.len(), 5);
        for name in [
            "T1w_acpc_dc",
            "T1w_acpc_dc_brain",
            "T1w_dc_warp",
            "T2w_acpc_dc",
            "T2w_reg_dc_warp",
        ] {
            assert!(image_exists(&root.join("out").join(name)), "{name} missing");
        }
        assert!(image_exists(&root.join("wd/T2w2T1w/sqrtT1wbyT2w")));
        assert_eq!(viewer_lines(&summary.qa_script), 3);
    }

    #[test]
    fn stages_run_in_dependency_order() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        create_inputs(root);
        let config = config_for(full_args(root));
        let backend = FakeBackend::default();

        Pipeline::new(&config, &backend).run().unwrap();

        let per_modality = [
            "forward_warp",
            "register_rigid",
            "apply_affine",
            "fieldmap_to_shiftmap",
            "shiftmap_to_warp",
            "apply_warp",
            "apply_warp",
            "maths",
        ];
        let mut expected = vec!["prepare_fieldmap"];
        expected.extend(per_modality);
        expected.extend(["copy_image"; 3]);
        expected.extend(per_modality);
        expected.extend([
            "register_cross_modal",
            "compose_warp",
            "apply_warp",
            "maths",
            "maths",
            "copy_image",
            "copy_image",
        ]);
        assert_eq!(backend.methods(), expected);
    }

    #[test]
    fn brain_images_use_nearest_neighbour() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        create_inputs(root);
        let config = config_for(t1w_only_args(root));
        let backend = FakeBackend::default();

        Pipeline::new(&config, &backend).run().unwrap();

        let warps = backend.calls_to("apply_warp");
        assert_eq!(warps.len(), 2);
        assert_eq!(warps[0].output, root.join("wd/T1w_acpc"));
        assert_eq!(warps[0].interpolation, Some(Interpolation::Spline));
        assert_eq!(warps[1].output, root.join("wd/T1w_acpc_brain"));
        assert_eq!(warps[1].interpolation, Some(Interpolation::NearestNeighbour));
    }

    #[test]
    fn composed_warp_is_applied_once_to_original_t2w() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        create_inputs(root);
        let config = config_for(full_args(root));
        let backend = FakeBackend::default();

        Pipeline::new(&config, &backend).run().unwrap();

        let compose = backend.calls_to("compose_warp");
        assert_eq!(compose.len(), 1);
        assert_eq!(
            compose[0].inputs,
            vec![
                root.join("in/T1w_acpc"),
                root.join("wd/FieldMap2T2w_acpc_brain_Warp"),
                root.join("wd/T2w2T1w/T2w_reg.mat"),
            ]
        );

        let final_resample: Vec<Call> = backend
            .calls_to("apply_warp")
            .into_iter()
            .filter(|c| c.output == root.join("wd/T2w2T1w/T2w_reg"))
            .collect();
        assert_eq!(final_resample.len(), 1);
        assert_eq!(
            final_resample[0].inputs,
            vec![
                root.join("in/T2w_acpc"),
                root.join("in/T1w_acpc"),
                root.join("wd/T2w2T1w/T2w_dc_reg"),
            ]
        );
    }

    #[test]
    fn cross_modal_registration_uses_both_corrected_passes() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        create_inputs(root);
        let config = config_for(full_args(root));
        let backend = FakeBackend::default();

        Pipeline::new(&config, &backend).run().unwrap();

        let registrations = backend.calls_to("register_cross_modal");
        assert_eq!(registrations.len(), 1);
        assert_eq!(
            registrations[0].inputs,
            vec![
                root.join("wd/T2w_acpc_brain"),
                root.join("wd/T1w_acpc"),
                root.join("wd/T1w_acpc_brain"),
            ]
        );
    }

    #[test]
    fn fieldmap_failure_stops_before_modality_loop() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        create_inputs(root);
        let config = config_for(full_args(root));
        let backend = FakeBackend::failing_on("prepare_fieldmap");

        let err = Pipeline::new(&config, &backend).run().unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Stage {
                stage: Stage::FieldMapPreprocessing,
                ..
            }
        ));
        assert_ne!(err.exit_code(), 0);
        assert_eq!(backend.methods(), vec!["prepare_fieldmap"]);
        assert!(!root.join("out").exists());
        assert!(!image_exists(&root.join("wd/T1w_acpc")));
    }

    #[test]
    fn registration_failure_leaves_t1w_outputs() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        create_inputs(root);
        let config = config_for(full_args(root));
        let backend = FakeBackend::failing_on("register_cross_modal");

        let err = Pipeline::new(&config, &backend).run().unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Stage {
                stage: Stage::CrossModalRegistration,
                ..
            }
        ));
        assert_eq!(err.exit_code(), 3);
        assert!(image_exists(&root.join("out/T1w_acpc_dc")));
        assert!(!image_exists(&root.join("out/T2w_acpc_dc")));
        assert!(!root.join("wd/qa.txt").exists());
    }

    #[test]
    fn missing_input_runs_no_tools() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        create_inputs(root);
        fs::remove_file(root.join("in/T1w_acpc_brain.nii.gz")).unwrap();
        let config = config_for(full_args(root));
        let backend = FakeBackend::default();

        let err = Pipeline::new(&config, &backend).run().unwrap_err();

        assert!(matches!(err, PipelineError::MissingInput { role: "--t1brain", .. }));
        assert!(backend.methods().is_empty());
        assert!(!root.join("wd").exists());
    }

    #[test]
    fn rerun_in_same_working_dir_succeeds() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        create_inputs(root);
        let config = config_for(full_args(root));

        let first = Pipeline::new(&config, &FakeBackend::default()).run().unwrap();
        let qa_first = fs::read_to_string(&first.qa_script).unwrap();
        let second = Pipeline::new(&config, &FakeBackend::default()).run().unwrap();
        let qa_second = fs::read_to_string(&second.qa_script).unwrap();

        assert_eq!(qa_first, qa_second);
        assert_eq!(first.published, second.published);
        let log = fs::read_to_string(root.join("wd/log.txt")).unwrap();
        assert_eq!(log.matches("dcreg --t1=...").count(), 2);
    }
}
