//! Per-job workspace layout.
//!
//! `<workspace_root>/<job_id>/{input,output,temp}` plus a `receipt.json`
//! written immutable (chmod 0444) once the job reaches a terminal state,
//! matching `redletters_receipt::write_receipt`'s own atomic-then-readonly
//! contract.

use camino::Utf8PathBuf;

#[derive(Debug, Clone)]
pub struct JobWorkspace {
    pub root: Utf8PathBuf,
}

impl JobWorkspace {
    /// Create `<workspace_root>/<job_id>/{input,output,temp}`.
    pub fn create(workspace_root: &camino::Utf8Path, job_id: &str) -> std::io::Result<Self> {
        let root = workspace_root.join(job_id);
        for sub in ["input", "output", "temp"] {
            std::fs::create_dir_all(root.join(sub).as_std_path())?;
        }
        Ok(Self { root })
    }

    #[must_use]
    pub fn input_dir(&self) -> Utf8PathBuf {
        self.root.join("input")
    }

    #[must_use]
    pub fn output_dir(&self) -> Utf8PathBuf {
        self.root.join("output")
    }

    #[must_use]
    pub fn temp_dir(&self) -> Utf8PathBuf {
        self.root.join("temp")
    }

    #[must_use]
    pub fn receipt_path(&self) -> Utf8PathBuf {
        self.root.join("receipt.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_lays_out_the_three_subdirectories() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let ws = JobWorkspace::create(&root, "job-1").unwrap();
        assert!(ws.input_dir().exists());
        assert!(ws.output_dir().exists());
        assert!(ws.temp_dir().exists());
    }
}
