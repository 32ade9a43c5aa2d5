use std::sync::Arc;

use anyhow::Context;
use rsm_audit::{
    audit, cli::config_path_from_args, config::Config, logging::init_tracing,
    manager::RestManagerClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = config_path_from_args()?;
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let _logging_guard = init_tracing(&config.logging).context("failed to initialize logging")?;

    let manager = RestManagerClient::new(&config.manager)
        .context("failed to construct manager client")?;
    let errors = audit::run(&config, Arc::new(manager)).await?;

    if errors.is_empty() {
        eprintln!("profile validation passed for project {}", config.run.project_id);
    } else {
        eprintln!(
            "profile validation found {} issue(s) for project {}",
            errors.len(),
            config.run.project_id
        );
        for error in &errors {
            eprintln!("* {}", error);
        }
    }
    Ok(())
}
