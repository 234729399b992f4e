use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Instant;

use tracing::{debug, trace};

use crate::{CompletionBackend, JudgeError};

/// Completion backend that runs an external program.
///
/// The system prompt and the prompt, separated by a blank line, are written
/// to the program's stdin; its stdout is the answer. Any model CLI that reads
/// a prompt from stdin fits, e.g. `llm -m gpt-4o`.
pub struct CommandBackend {
    program: PathBuf,
    args: Vec<String>,
    name: String,
}

impl CommandBackend {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        let program = program.into();
        let name = std::iter::once(program.display().to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            program,
            args,
            name,
        }
    }
}

impl CompletionBackend for CommandBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String, JudgeError> {
        let start = Instant::now();
        debug!(command = %self.name, "Spawning judge process");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| JudgeError::Backend(format!("Failed to run {}: {}", self.name, e)))?;

        let input = format!("{}\n\n{}", system_prompt, prompt);
        // Written from a separate thread so a chatty child can't fill stdout first
        let writer = child.stdin.take().map(|mut stdin| {
            std::thread::spawn(move || stdin.write_all(input.as_bytes()))
        });

        let output = child
            .wait_with_output()
            .map_err(|e| JudgeError::Backend(format!("Failed to wait for {}: {}", self.name, e)))?;

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Err(e)) => trace!(error = %e, "Judge process closed stdin early"),
                Ok(Ok(())) => {}
                Err(_) => {
                    return Err(JudgeError::Backend("Prompt writer thread panicked".into()));
                }
            }
        }

        debug!(
            exit_code = output.status.code().unwrap_or(-1),
            duration_ms = start.elapsed().as_millis(),
            "Judge process completed"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(JudgeError::Backend(format!(
                "{} exited with {}: {}",
                self.name,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::{Judge, JudgeRequest, LlmJudge, LLM_JUDGE};
    use ontoeval_diff::DiffInput;

    fn sh(script: &str) -> CommandBackend {
        CommandBackend::new("sh", vec!["-c".into(), script.into()])
    }

    #[test]
    fn test_prompt_goes_to_stdin() {
        let backend = CommandBackend::new("cat", vec![]);
        let answer = backend.complete("be strict", "compare these").unwrap();
        assert_eq!(answer, "be strict\n\ncompare these");
        assert_eq!(backend.name(), "cat");
    }

    #[test]
    fn test_failing_command_reports_stderr() {
        let backend = sh("cat >/dev/null; echo 'quota exceeded' >&2; exit 3");
        let err = backend.complete("system", "prompt").unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, JudgeError::Backend(_)));
        assert!(message.contains("quota exceeded"), "{}", message);
    }

    #[test]
    fn test_missing_program() {
        let backend = CommandBackend::new("/nonexistent/ontoeval-judge-model", vec![]);
        let err = backend.complete("system", "prompt").unwrap_err();
        assert!(err.to_string().contains("Failed to run"));
    }

    #[test]
    fn test_llm_judge_over_command() {
        let verdict = r#"<verdict>{"similarity": 0.5, "difficulty": 0.2, "issue_clarity": 1.0, "logical_consistency": 0.7, "confidence": 0.9, "left_evaluation": {"overall_score": 0.8, "evaluation": "ok"}, "right_evaluation": {"overall_score": 0.4, "evaluation": "partial"}}</verdict>"#;
        let backend = sh(&format!("cat >/dev/null; printf '%s' '{}'", verdict));
        let judge = LlmJudge::new(Box::new(backend)).with_retries(0);

        let target = DiffInput::from("+is_a: A");
        let predicted = DiffInput::from("+is_a: B");
        let result = judge
            .compare(&JudgeRequest {
                target: &target,
                predicted: &predicted,
                issue_text: None,
            })
            .unwrap();

        assert_eq!(result.judge_name(), LLM_JUDGE);
        assert!((result.as_llm().unwrap().score_diff - 0.4).abs() < 1e-9);
    }
}
