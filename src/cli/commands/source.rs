//! `source install|uninstall|status`.

use redletters_config::RedlettersConfig;

use super::common::{installer, print_json};
use crate::error::RedlettersError;

pub fn install(config: &RedlettersConfig, pack_id: &str, accept_eula: bool, force: bool) -> anyhow::Result<()> {
    let inst = installer(config);
    let installed =
        inst.install(&redletters_utils::PackId::from(pack_id), accept_eula, force).map_err(RedlettersError::from)?;
    println!("installed {} {} at {}", installed.pack.pack_id, installed.pack.version, installed.install_path);
    Ok(())
}

pub fn uninstall(config: &RedlettersConfig, pack_id: &str) -> anyhow::Result<()> {
    let inst = installer(config);
    inst.uninstall(&redletters_utils::PackId::from(pack_id)).map_err(RedlettersError::from)?;
    println!("uninstalled {pack_id}");
    Ok(())
}

pub fn status(config: &RedlettersConfig, json: bool) -> anyhow::Result<()> {
    let inst = installer(config);
    let statuses = inst.status().map_err(RedlettersError::from)?;
    if json {
        return print_json(&statuses);
    }
    for (pack_id, status) in &statuses {
        println!(
            "{pack_id}  installed={}  requires_eula={}  role={}  license={}",
            status.installed, status.requires_eula, status.role, status.license
        );
    }
    Ok(())
}
