//! `bundle verify`.

use std::path::Path;

use camino::Utf8PathBuf;

use super::common::print_json;
use crate::error::RedlettersError;

pub fn verify(path: &Path, json: bool) -> anyhow::Result<()> {
    let bundle_dir = Utf8PathBuf::from_path_buf(path.to_path_buf())
        .map_err(|p| anyhow::anyhow!("path is not valid UTF-8: {}", p.display()))?;
    let result = redletters_bundle::verify(&bundle_dir).map_err(RedlettersError::from)?;

    if json {
        return print_json(&result);
    }
    if result.valid {
        println!("bundle valid: {}", bundle_dir);
    } else {
        for failure in &result.failures {
            println!("{failure:?}");
        }
        anyhow::bail!("bundle verification failed ({} issue(s))", result.failures.len());
    }
    Ok(())
}
