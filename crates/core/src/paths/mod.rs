//! On-disk layout of the working directory.
//!
//! This module defines where every intermediate artifact of a run lives.
//! It contains **no I/O logic** - only typed path construction, so that file
//! names are defined in exactly one place.
//!
//! ```text
//! <workingdir>/
//!     log.txt
//!     qa.txt
//!     FieldMap/
//!         Magnitude, Magnitude_brain, Phase, FieldMap
//!     Magnitude_brain_warpped<M>
//!     Magnitude_brain_warpped<M>2<brain>
//!     Fieldmap2<brain>.mat
//!     FieldMap2<brain>, FieldMap2<brain>_ShiftMap, FieldMap2<brain>_Warp
//!     <image>, <brain>
//!     T2w2T1w/
//!         T2w_reg, T2w_reg.mat, T2w_dc_reg, sqrtT1wbyT2w
//! ```

pub mod fieldmap;
pub mod modality;
pub mod registration;

pub use fieldmap::FieldMapPaths;
pub use modality::ModalityPaths;
pub use registration::RegistrationPaths;

use crate::modality::ModalityInputs;
use std::path::{Path, PathBuf};

/// Append-only record of every invocation.
pub struct RunLogFile;

impl RunLogFile {
    pub const NAME: &'static str = "log.txt";
}

/// Inspection script, rewritten on every run.
pub struct QaScriptFile;

impl QaScriptFile {
    pub const NAME: &'static str = "qa.txt";
}

/// Root of one run's working directory.
#[derive(Debug, Clone)]
pub struct WorkingDirPaths {
    root: PathBuf,
}

impl WorkingDirPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run_log(&self) -> PathBuf {
        self.root.join(RunLogFile::NAME)
    }

    pub fn qa_script(&self) -> PathBuf {
        self.root.join(QaScriptFile::NAME)
    }

    pub fn fieldmap(&self) -> FieldMapPaths {
        FieldMapPaths::new(&self.root)
    }

    pub fn modality(&self, inputs: &ModalityInputs) -> ModalityPaths {
        ModalityPaths::new(&self.root, inputs)
    }

    pub fn registration(&self) -> RegistrationPaths {
        RegistrationPaths::new(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_files() {
        let wd = WorkingDirPaths::new("/wd");
        assert_eq!(wd.run_log(), PathBuf::from("/wd/log.txt"));
        assert_eq!(wd.qa_script(), PathBuf::from("/wd/qa.txt"));
    }
}
