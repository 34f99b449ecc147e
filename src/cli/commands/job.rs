//! `job status|cancel|list`.

use redletters_config::RedlettersConfig;

use super::common::{job_engine, print_json};
use crate::error::RedlettersError;

pub fn status(config: &RedlettersConfig, job_id: &str) -> anyhow::Result<()> {
    let engine = job_engine(config)?;
    let job = engine.get_job(job_id).map_err(RedlettersError::from)?;
    print_json(&job)
}

pub fn cancel(config: &RedlettersConfig, job_id: &str) -> anyhow::Result<()> {
    let mut engine = job_engine(config)?;
    let requested = engine.request_cancel(job_id).map_err(RedlettersError::from)?;
    if requested {
        println!("cancellation requested for {job_id}");
    } else {
        println!("{job_id} already terminal or not claimed; no cancellation sent");
    }
    Ok(())
}

pub fn list(config: &RedlettersConfig, json: bool) -> anyhow::Result<()> {
    let engine = job_engine(config)?;
    let jobs = engine.list_jobs().map_err(RedlettersError::from)?;
    if json {
        return print_json(&jobs);
    }
    for job in &jobs {
        println!("{}  {}  {}%", job.job_id, job.state.as_str(), job.progress.percent);
    }
    Ok(())
}
