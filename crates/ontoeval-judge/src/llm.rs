use tracing::{debug, info, warn};

use crate::{
    Judge, JudgeComparison, JudgeError, JudgePrompts, JudgeRequest, LlmJudgeComparison, LLM_JUDGE,
};

/// Sends a prompt to a language model and returns its raw text answer
pub trait CompletionBackend: Send + Sync {
    /// Human-readable name of the backend (e.g. the model)
    fn name(&self) -> &str;

    fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String, JudgeError>;
}

/// Judge that asks a language model to compare the two diffs
pub struct LlmJudge {
    backend: Box<dyn CompletionBackend>,
    retries: usize,
}

impl LlmJudge {
    pub fn new(backend: Box<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            retries: 3,
        }
    }

    /// Number of extra attempts when the answer has no usable verdict
    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }
}

impl Judge for LlmJudge {
    fn name(&self) -> &str {
        LLM_JUDGE
    }

    fn compare(&self, request: &JudgeRequest<'_>) -> Result<JudgeComparison, JudgeError> {
        let prompt = JudgePrompts::build_comparison_prompt(
            request.issue_text,
            &request.target.text(),
            &request.predicted.text(),
        );

        debug!(
            prompt_len = prompt.len(),
            backend = self.backend.name(),
            "Running LLM judge"
        );

        let mut current_prompt = prompt.clone();
        let attempts = self.retries + 1;
        let mut attempt = 1;

        loop {
            let output = self
                .backend
                .complete(JudgePrompts::system_prompt(), &current_prompt)?;

            match LlmJudgeComparison::parse(&output) {
                Ok(verdict) => {
                    info!(attempt, verdict = %verdict.short_description(), "LLM judge completed");
                    return Ok(JudgeComparison::LlmJudge(verdict));
                }
                Err(e) if attempt < attempts => {
                    warn!(attempt, error = %e, "Unusable judge verdict, retrying");
                    current_prompt = JudgePrompts::build_retry_prompt(&prompt, &e.to_string());
                    attempt += 1;
                }
                Err(e) => {
                    return Err(JudgeError::RetriesExhausted {
                        attempts,
                        last_error: e,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontoeval_diff::DiffInput;
    use std::sync::{Arc, Mutex};

    struct ScriptedBackend {
        answers: Mutex<Vec<String>>,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedBackend {
        fn new(answers: &[&str]) -> (Self, Arc<Mutex<Vec<String>>>) {
            let prompts = Arc::new(Mutex::new(Vec::new()));
            let backend = Self {
                answers: Mutex::new(answers.iter().rev().map(|a| a.to_string()).collect()),
                prompts: prompts.clone(),
            };
            (backend, prompts)
        }
    }

    impl CompletionBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        fn complete(&self, _system_prompt: &str, prompt: &str) -> Result<String, JudgeError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.answers
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| JudgeError::Backend("no more answers".into()))
        }
    }

    const GOOD: &str = r#"<verdict>{"similarity": 0.5, "difficulty": 0.2, "issue_clarity": 1.0, "logical_consistency": 0.7, "confidence": 0.9, "left_evaluation": {"overall_score": 0.8, "evaluation": "ok"}, "right_evaluation": {"overall_score": 0.4, "evaluation": "partial"}}</verdict>"#;

    #[test]
    fn test_llm_judge_parses_verdict() {
        let (backend, prompts) = ScriptedBackend::new(&[GOOD]);
        let judge = LlmJudge::new(Box::new(backend));
        let target = DiffInput::from("+is_a: A");
        let predicted = DiffInput::from("+is_a: B");

        let result = judge
            .compare(&JudgeRequest {
                target: &target,
                predicted: &predicted,
                issue_text: Some("New term please"),
            })
            .unwrap();

        assert_eq!(result.judge_name(), LLM_JUDGE);
        let verdict = result.as_llm().unwrap();
        assert!((verdict.score_diff - 0.4).abs() < 1e-9);

        let prompts = prompts.lock().unwrap();
        assert!(prompts[0].contains("New term please"));
        assert!(prompts[0].contains("+is_a: A"));
        assert!(prompts[0].contains("+is_a: B"));
    }

    #[test]
    fn test_llm_judge_retries_then_succeeds() {
        let (backend, prompts) = ScriptedBackend::new(&["no idea", GOOD]);
        let judge = LlmJudge::new(Box::new(backend)).with_retries(1);
        let diff = DiffInput::from("+a");

        let result = judge.compare(&JudgeRequest {
            target: &diff,
            predicted: &diff,
            issue_text: None,
        });

        assert!(result.is_ok());
        let prompts = prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("could not be used"));
    }

    #[test]
    fn test_llm_judge_gives_up() {
        let (backend, _prompts) = ScriptedBackend::new(&["nothing", "still nothing"]);
        let judge = LlmJudge::new(Box::new(backend)).with_retries(1);
        let diff = DiffInput::from("+a");

        let result = judge.compare(&JudgeRequest {
            target: &diff,
            predicted: &diff,
            issue_text: None,
        });

        assert!(matches!(
            result,
            Err(JudgeError::RetriesExhausted { attempts: 2, .. })
        ));
    }
}
