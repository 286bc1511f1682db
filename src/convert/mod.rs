//! External tool execution.
//!
//! This module locates the converters docstack drives (pandoc, a Chromium
//! family browser, weasyprint, LaTeX engines) and runs them with captured
//! output.
//!
//! # Module Organization
//!
//! - `pandoc` - Argument building, presets and single conversions
//! - `print` - HTML to PDF through a headless browser or weasyprint
//! - `logging` - Per-job failure logs

pub mod logging;
pub mod pandoc;
pub mod print;

use crate::error::{Error, Result};
use crate::types::Tool;
use log::debug;
use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Captured result of a finished tool invocation
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: Option<i32>,
    pub duration: Duration,
}

/// Availability of one tool, for `check-tools`
#[derive(Debug, Clone)]
pub struct ToolStatus {
    pub tool: Tool,
    pub path: Option<PathBuf>,
    pub version: Option<String>,
}

impl ToolStatus {
    pub fn available(&self) -> bool {
        self.path.is_some()
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata().map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Search the `PATH` entries for `name`
pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path).find_map(|dir| {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = dir.join(format!("{}.exe", name));
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

/// Locate a tool: environment override first, then its candidates on PATH
pub fn which_tool(tool: Tool) -> Result<PathBuf> {
    if let Some(value) = env::var_os(tool.env_override()).filter(|v| !v.is_empty()) {
        let path = PathBuf::from(&value);
        if path.components().count() > 1 || path.is_absolute() {
            if is_executable(&path) {
                debug!("{} from {}: {}", tool, tool.env_override(), path.display());
                return Ok(path);
            }
        } else if let Some(found) = find_in_path(&path.to_string_lossy()) {
            return Ok(found);
        }
        debug!("{}={} does not point at an executable", tool.env_override(), path.display());
    }

    tool.candidates()
        .iter()
        .find_map(|name| find_in_path(name))
        .ok_or_else(|| Error::ToolNotFound { tool: tool.name().to_string() })
}

/// First line of `<tool> --version`, if the tool runs
pub fn tool_version(tool: Tool) -> Option<String> {
    let path = which_tool(tool).ok()?;
    let args = vec!["--version".to_string()];
    let output = run_program(tool.name(), &path, &args, None).ok()?;
    output.stdout.lines().chain(output.stderr.lines()).map(str::trim).find(|l| !l.is_empty()).map(str::to_string)
}

pub fn check_tools(tools: &[Tool]) -> Vec<ToolStatus> {
    tools
        .iter()
        .map(|&tool| {
            let path = which_tool(tool).ok();
            let version = path.as_ref().and_then(|_| tool_version(tool));
            ToolStatus { tool, path, version }
        })
        .collect()
}

/// Run a located program and capture its output.
///
/// A nonzero exit status is a `ToolFailed` error carrying stderr.
pub fn run_program(name: &str, program: &Path, args: &[String], cwd: Option<&Path>) -> Result<ToolOutput> {
    debug!("Running {} {:?}", program.display(), args);
    let start = Instant::now();

    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let output = cmd.output().map_err(|e| Error::ToolFailed {
        tool: name.to_string(),
        status: "not started".to_string(),
        stderr: e.to_string(),
    })?;

    let duration = start.elapsed();
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !output.status.success() {
        debug!("{} failed in {:?}", name, duration);
        return Err(Error::ToolFailed { tool: name.to_string(), status: output.status.to_string(), stderr });
    }
    debug!("{} succeeded in {:?}", name, duration);
    Ok(ToolOutput { stdout, stderr, status: output.status.code(), duration })
}

/// Locate `tool` and run it
pub fn run_tool(tool: Tool, args: &[String], cwd: Option<&Path>) -> Result<ToolOutput> {
    let program = which_tool(tool)?;
    run_program(tool.name(), &program, args, cwd)
}
