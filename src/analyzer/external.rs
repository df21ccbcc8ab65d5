use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::analyzer::line_count::count_file_lines;
use crate::analyzer::output::decode_analyzer_output;
use crate::analyzer::{AnalyzerError, FileAnalyzer, Language};
use crate::core::model::FileModel;

/// How to launch the external analyzer.
#[derive(Debug, Clone)]
pub struct AnalyzerCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Duration,
}

/// Runs `<program> <args..> -f <file> -t <language> -c Initial` per file.
#[derive(Debug, Clone)]
pub struct ExternalAnalyzer {
    command: AnalyzerCommand,
}

impl ExternalAnalyzer {
    pub fn new(command: AnalyzerCommand) -> Self {
        Self { command }
    }

    fn build(&self, path: &Path, language: Language) -> Command {
        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .arg("-f")
            .arg(path)
            .arg("-t")
            .arg(language.as_str())
            .arg("-c")
            .arg("Initial")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.command.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[async_trait]
impl FileAnalyzer for ExternalAnalyzer {
    async fn analyze(&self, path: &Path, language: Language) -> Result<FileModel, AnalyzerError> {
        let lines = count_file_lines(path).await.map_err(AnalyzerError::LineCount)?;

        let child = self.build(path, language).spawn().map_err(AnalyzerError::Spawn)?;
        // Dropping the timed-out future drops the child, which kills it.
        let output = tokio::time::timeout(self.command.timeout, child.wait_with_output())
            .await
            .map_err(|_| AnalyzerError::Timeout(self.command.timeout))?
            .map_err(AnalyzerError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AnalyzerError::Exit {
                status: output.status.to_string(),
                stderr: stderr.trim().chars().take(512).collect(),
            });
        }

        decode_analyzer_output(&output.stdout, &path.to_string_lossy(), lines)
    }
}
