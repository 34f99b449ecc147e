//! `lock generate|verify|sync`.

use std::path::Path;

use camino::Utf8PathBuf;
use redletters_config::RedlettersConfig;
use redletters_lock::{Lockfile, LockfileGenerator};

use super::common::{installer, print_json};
use crate::error::RedlettersError;

fn utf8(path: &Path) -> anyhow::Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path.to_path_buf())
        .map_err(|p| anyhow::anyhow!("path is not valid UTF-8: {}", p.display()))
}

pub fn generate(config: &RedlettersConfig, out: &Path) -> anyhow::Result<()> {
    let inst = installer(config);
    let manifest = inst.manifest().map_err(RedlettersError::from)?;
    let out = utf8(out)?;
    let lockfile = LockfileGenerator::save(&manifest, &out).map_err(RedlettersError::from)?;
    println!("wrote {out} (lockfile_hash={})", lockfile.lockfile_hash);
    Ok(())
}

pub fn verify(config: &RedlettersConfig, path: &Path, json: bool) -> anyhow::Result<()> {
    let inst = installer(config);
    let manifest = inst.manifest().map_err(RedlettersError::from)?;
    let lockfile = Lockfile::load(&utf8(path)?).map_err(RedlettersError::from)?;
    let result = redletters_lock::verify(&lockfile, &manifest);

    if json {
        return print_json(&result);
    }
    println!("ok: {}  missing: {}  mismatched: {}", result.ok_count(), result.missing().len(), result.mismatched().len());
    if !result.valid {
        anyhow::bail!("lockfile verification failed");
    }
    Ok(())
}

pub fn sync(config: &RedlettersConfig, path: &Path, force: bool) -> anyhow::Result<()> {
    let inst = installer(config);
    let manifest = inst.manifest().map_err(RedlettersError::from)?;
    let lockfile = Lockfile::load(&utf8(path)?).map_err(RedlettersError::from)?;
    let result = redletters_lock::sync(&lockfile, &manifest, force).map_err(RedlettersError::from)?;
    println!("{result:?}");
    Ok(())
}
