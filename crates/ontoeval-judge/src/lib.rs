//! # ontoeval-judge
//!
//! Judges score a predicted diff against a target diff. Every judge
//! implements [`Judge`] and returns a [`JudgeComparison`] tagged with its
//! name, which the batch runner stores on each benchmark record.
//!
//! - [`MetadiffJudge`] runs the deterministic diff comparison, optionally
//!   through a comparison cache
//! - [`LlmJudge`] asks a language model for a structured verdict
//!
//! ## Plugging in a model
//!
//! [`LlmJudge`] does not talk to any model API itself. It builds the prompt,
//! hands it to a [`CompletionBackend`] and parses the `<verdict>` block out
//! of the answer, retrying with the parse error when the answer is unusable.
//! [`CommandBackend`] pipes the prompt through an external program (this is
//! what `ontoeval batch --judge-command` uses); anything else only needs the
//! two trait methods:
//!
//! ```
//! use ontoeval_diff::DiffInput;
//! use ontoeval_judge::{CompletionBackend, Judge, JudgeError, JudgeRequest, LlmJudge};
//!
//! struct CannedModel;
//!
//! impl CompletionBackend for CannedModel {
//!     fn name(&self) -> &str {
//!         "canned"
//!     }
//!
//!     fn complete(&self, _system_prompt: &str, _prompt: &str) -> Result<String, JudgeError> {
//!         Ok(r#"<verdict>{"similarity": 0.5, "difficulty": 0.2, "issue_clarity": 1.0,
//!             "logical_consistency": 0.7, "confidence": 0.9,
//!             "left_evaluation": {"overall_score": 0.8, "evaluation": "complete"},
//!             "right_evaluation": {"overall_score": 0.4, "evaluation": "partial"}}</verdict>"#
//!             .to_string())
//!     }
//! }
//!
//! let judge = LlmJudge::new(Box::new(CannedModel)).with_retries(1);
//! let target = DiffInput::from("+is_a: UBERON:0001016");
//! let predicted = DiffInput::from("+is_a: UBERON:0000061");
//!
//! let result = judge
//!     .compare(&JudgeRequest {
//!         target: &target,
//!         predicted: &predicted,
//!         issue_text: Some("NTR: nerve root"),
//!     })
//!     .unwrap();
//! let verdict = result.as_llm().unwrap();
//! assert!((verdict.score_diff - 0.4).abs() < 1e-9);
//! ```
//!
//! A judge is shared across worker threads, so pass it to the batch runner
//! as an `Arc<dyn Judge>`; its results land in the output under
//! `llm_judge_<field>` keys.

mod command;
mod judge;
pub mod llm;
mod prompts;
mod verdict;

pub use command::CommandBackend;
pub use judge::{
    Judge, JudgeComparison, JudgeError, JudgeRequest, MetadiffJudge, LLM_JUDGE, METADIFF_JUDGE,
};
pub use llm::{CompletionBackend, LlmJudge};
pub use prompts::JudgePrompts;
pub use verdict::{LlmJudgeComparison, ProposedChangeEvaluation, VerdictParseError};
