use std::env;

use ditto_core::config::{DEFAULT_REQUEST_TIMEOUT, ENV_SYNC_URL};

use crate::cli::ConfigCommands;
use crate::cli_config::{default_config_path, CliConfig};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => run_config_show(),
        ConfigCommands::Set {
            endpoint,
            timeout_secs,
        } => run_config_set(endpoint, timeout_secs),
    }
}

pub fn run_config_show() -> Result<(), CliError> {
    let config = CliConfig::load().map_err(CliError::Config)?;
    let env_endpoint = env::var(ENV_SYNC_URL).ok();

    for line in render_config_lines(&config, env_endpoint.as_deref()) {
        println!("{line}");
    }
    println!("config file: {}", default_config_path().display());
    Ok(())
}

pub fn run_config_set(endpoint: Option<String>, timeout_secs: Option<u64>) -> Result<(), CliError> {
    if endpoint.is_none() && timeout_secs.is_none() {
        return Err(CliError::Config(
            "nothing to set; pass --endpoint and/or --timeout-secs".into(),
        ));
    }

    let mut config = CliConfig::load().map_err(CliError::Config)?;
    config
        .apply(endpoint, timeout_secs)
        .map_err(CliError::Config)?;
    let path = config.save().map_err(CliError::Config)?;

    println!("Saved config to {}", path.display());
    Ok(())
}

pub fn render_config_lines(config: &CliConfig, env_endpoint: Option<&str>) -> Vec<String> {
    let endpoint = config.endpoint.as_deref().unwrap_or("(not set)");
    let timeout = config
        .timeout_secs
        .unwrap_or_else(|| DEFAULT_REQUEST_TIMEOUT.as_secs());

    let mut lines = vec![
        format!("endpoint: {endpoint}"),
        format!("timeout: {timeout}s"),
    ];
    if let Some(env_endpoint) = env_endpoint.filter(|value| !value.trim().is_empty()) {
        lines.push(format!("{ENV_SYNC_URL} overrides endpoint: {env_endpoint}"));
    }
    lines
}
