//! The external packaging tool (SqlPackage) run as a subprocess.

use crate::config::AppConfig;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Exit code when the tool cannot be launched at all.
pub const TOOL_MISSING_EXIT_CODE: i32 = -1;

#[async_trait::async_trait]
pub trait PackageTool: Send + Sync {
    /// Version string reported by the tool; errors when it cannot be launched.
    async fn probe(&self) -> anyhow::Result<String>;

    /// Run with the given `key+value` arguments, relaying output, and return its exit code.
    async fn run(&self, args: &[String]) -> anyhow::Result<i32>;
}

#[derive(Debug, Clone)]
pub struct SqlPackage {
    program: String,
}

#[async_trait::async_trait]
impl PackageTool for SqlPackage {
    async fn probe(&self) -> anyhow::Result<String> {
        let output = Command::new(&self.program)
            .arg("/version:true")
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            anyhow::bail!(
                "{} version check failed: {}",
                self.program,
                String::from_utf8_lossy(&output.stderr)
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn run(&self, args: &[String]) -> anyhow::Result<i32> {
        let mut cmd = Command::new(&self.program);
        push_arguments(&mut cmd, args);

        debug!("Launching {} with {} argument(s)", self.program, args.len());
        let status = cmd.status().await?;

        // killed by a signal
        Ok(status.code().unwrap_or(1))
    }
}

impl SqlPackage {
    pub fn new(config: &AppConfig) -> Self {
        SqlPackage {
            program: config.package_tool.clone(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

/// Windows hands the joined line to the tool as-is, quotes included.
#[cfg(windows)]
fn push_arguments(cmd: &mut Command, args: &[String]) {
    cmd.raw_arg(args.join(" "));
}

/// Each argument is its own argv entry, so wrapping quotes would reach the tool verbatim.
#[cfg(not(windows))]
fn push_arguments(cmd: &mut Command, args: &[String]) {
    cmd.args(argv(args));
}

#[cfg(not(windows))]
fn argv(args: &[String]) -> Vec<String> {
    use crate::arguments::CliArgument;
    use crate::utils::remove_wrapped_quotes;

    args.iter()
        .map(|arg| match CliArgument::parse(arg) {
            Some(parsed) => format!("{}{}", parsed.key, remove_wrapped_quotes(&parsed.value)),
            None => arg.clone(),
        })
        .collect()
}
