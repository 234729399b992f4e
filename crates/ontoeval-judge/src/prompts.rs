/// Prompt templates for the LLM judge
pub struct JudgePrompts;

impl JudgePrompts {
    /// System prompt describing the judge's role
    pub fn system_prompt() -> &'static str {
        r#"You are a judge comparing two proposed changes made in response to the same user issue.

The issue describes the problem. It may also contain details of how the problem was eventually solved; you may use these in your evaluation.

You are shown a LEFT and a RIGHT proposed change, each as a text diff. Evaluate each change on its own, and assess how consistent the two changes are with each other.

Weigh concrete semantic differences above stylistic ones. Stylistic and grammatical differences may be noted in the text fields. Placement of a term in the graph (is_a and part_of relationships) matters most.

Apply ontology-specific best practices and design patterns.

For new term requests the identifiers of newly minted terms are not expected to match between the two changes. Do not count differing IDs as semantic differences, and do not prefer one ID range over the other."#
    }

    /// Build the comparison prompt for one left/right pair
    pub fn build_comparison_prompt(issue_text: Option<&str>, left_diff: &str, right_diff: &str) -> String {
        format!(
            r#"## User Issue
{issue}

## Left Diff
```diff
{left}
```

## Right Diff
```diff
{right}
```

---

## Required Response Format

Explain your reasoning first, then end your response with a verdict block containing a single JSON object:

<verdict>
{{"similarity": 0.0, "difficulty": 0.0, "issue_clarity": 0.0, "logical_consistency": 0.0, "confidence": 0.0, "suggestions_for_users": "How the issue could have been worded more clearly", "left_evaluation": {{"overall_score": 0.0, "evaluation": "...", "incorrect_changes": [], "missing_changes": []}}, "right_evaluation": {{"overall_score": 0.0, "evaluation": "...", "incorrect_changes": [], "missing_changes": []}}, "comments": "..."}}
</verdict>

All scores are between 0 and 1. Difficulty 0 is a trivial single-line change and 1 a complex multi-file change involving decisions."#,
            issue = issue_text.unwrap_or("(no issue text available)"),
            left = truncate_output(left_diff, 20000),
            right = truncate_output(right_diff, 20000),
        )
    }

    /// Appended to the prompt when the previous answer had no usable verdict
    pub fn build_retry_prompt(prompt: &str, error: &str) -> String {
        format!(
            r#"{prompt}

Your previous answer could not be used: {error}
Respond again and make sure to end with a valid <verdict> block."#
        )
    }
}

fn truncate_output(output: &str, max_len: usize) -> &str {
    if output.len() <= max_len {
        return output;
    }

    let mut cut = max_len;
    while !output.is_char_boundary(cut) {
        cut -= 1;
    }

    // Prefer a line boundary
    match output[..cut].rfind('\n') {
        Some(pos) => &output[..pos],
        None => &output[..cut],
    }
}
