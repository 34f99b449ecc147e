//! `doctor`: diagnose configuration and environment (SPEC_FULL.md §4.0e).

use redletters_config::RedlettersConfig;
use serde::Serialize;

use super::common::{gate_ledger_path, installer, job_engine_path, variant_store_path};

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: String,
    ok: bool,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    ok: bool,
    checks: Vec<DoctorCheck>,
}

fn check_dir_writable(name: &str, path: &camino::Utf8Path) -> DoctorCheck {
    match std::fs::create_dir_all(path.as_std_path()) {
        Ok(()) => DoctorCheck { name: name.to_string(), ok: true, detail: format!("{path} is writable") },
        Err(e) => DoctorCheck { name: name.to_string(), ok: false, detail: format!("{path}: {e}") },
    }
}

fn check_store(name: &str, path: &camino::Utf8Path) -> DoctorCheck {
    match rusqlite::Connection::open(path.as_std_path()) {
        Ok(_) => DoctorCheck { name: name.to_string(), ok: true, detail: format!("{path} opens") },
        Err(e) => DoctorCheck { name: name.to_string(), ok: false, detail: format!("{path}: {e}") },
    }
}

pub fn doctor(config: &RedlettersConfig, json: bool) -> anyhow::Result<()> {
    let mut checks = vec![
        check_dir_writable("data_root", &config.data_root),
        check_dir_writable("workspace_root", &config.workspace_root),
        check_store("variant_store", &variant_store_path(config)),
        check_store("gate_ledger", &gate_ledger_path(config)),
        check_store("job_engine", &job_engine_path(config)),
    ];

    let inst = installer(config);
    checks.push(match inst.status() {
        Ok(statuses) => DoctorCheck {
            name: "catalog".to_string(),
            ok: true,
            detail: format!("{} pack(s) catalogued, {} installed", statuses.len(), statuses.values().filter(|s| s.installed).count()),
        },
        Err(e) => DoctorCheck { name: "catalog".to_string(), ok: false, detail: e.to_string() },
    });

    let ok = checks.iter().all(|c| c.ok);
    let report = DoctorReport { ok, checks };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for check in &report.checks {
            let mark = if check.ok { "ok" } else { "FAIL" };
            println!("[{mark}] {}: {}", check.name, check.detail);
        }
    }

    if !ok {
        anyhow::bail!("doctor found unhealthy checks");
    }
    Ok(())
}
