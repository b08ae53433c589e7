//! The external typesetting step behind a narrow, fakeable interface.

use super::RenderError;
use super::config::CompilerConfig;
use std::fs::{self, File};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const OUTPUT_LOG: &str = "compiler-output.log";

/// Result of one compilation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutcome {
    pub success: bool,
    /// Combined standard output and error of the pass.
    pub log: String,
}

/// One pass of a document compiler over `source`, run with `workdir` as the
/// current directory. The compiled document is expected next to the source with a
/// `.pdf` extension.
pub trait DocumentCompiler: Send + Sync {
    fn compile(&self, source: &Path, workdir: &Path) -> Result<CompileOutcome, RenderError>;
}

/// Runs a LaTeX engine as a child process with a per-pass timeout.
#[derive(Debug, Clone)]
pub struct LatexCompiler {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl LatexCompiler {
    pub fn from_config(config: &CompilerConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

impl DocumentCompiler for LatexCompiler {
    fn compile(&self, source: &Path, workdir: &Path) -> Result<CompileOutcome, RenderError> {
        let log_path = workdir.join(OUTPUT_LOG);
        let stdout = File::create(&log_path)?;
        let stderr = stdout.try_clone()?;
        let source_arg = source.file_name().unwrap_or(source.as_os_str());

        log::debug!(
            "Running {} {} {} in {}",
            self.program,
            self.args.join(" "),
            source_arg.to_string_lossy(),
            workdir.display()
        );
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(source_arg)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|source| RenderError::CompilerLaunch {
                program: self.program.clone(),
                source,
            })?;

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break Some(status);
            }
            if started.elapsed() >= self.timeout {
                // The child may exit between the check and the kill.
                let _ = child.kill();
                child.wait()?;
                break None;
            }
            thread::sleep(POLL_INTERVAL);
        };

        let mut log = String::from_utf8_lossy(&fs::read(&log_path)?).into_owned();
        let success = match status {
            Some(status) => status.success(),
            None => {
                log.push_str(&format!(
                    "\n{} timed out after {} s\n",
                    self.program,
                    self.timeout.as_secs()
                ));
                false
            }
        };
        Ok(CompileOutcome { success, log })
    }
}
