use anyhow::Result;
use std::process::Command;

use super::common::TestEnvironment;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Run the built binary with its config and data directories inside `env`
pub fn run_userdeck_command(
    env: &TestEnvironment,
    args: &[&str],
    vars: &[(&str, &str)],
) -> Result<CommandOutput> {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_userdeck"));
    cmd.args(args)
        .current_dir(env.path())
        .env("HOME", env.path())
        .env("XDG_CONFIG_HOME", env.config_home())
        .env("XDG_DATA_HOME", env.data_home())
        .env_remove("USERDECK_PANEL_URL")
        .env_remove("USERDECK_API_KEY");
    for (key, value) in vars {
        cmd.env(key, value);
    }

    let output = cmd.output()?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}
