//! The fixed controller template interpolated with `contextPack`, `task`,
//! `candidate`, and `rubric` before being handed to C1 (§4.8 step 8, §6).

use gan_core::SessionConfig;

const TEMPLATE: &str = "\
You are auditing a single candidate submission against the stated task.

## Task
{task}

## Context
{context_pack}

## Candidate
{candidate}

## Rubric
{rubric}

Respond with a single JSON object matching the Review schema.
";

pub fn build(config: &SessionConfig, candidate: &str, context_pack: &str) -> String {
    let task = if config.task.is_empty() {
        "(no task description supplied)"
    } else {
        &config.task
    };
    let judges = if config.judges.is_empty() {
        "default judge".to_string()
    } else {
        config.judges.join(", ")
    };
    let rubric = format!(
        "Score against a threshold of {}, weighing input from: {}. Requested candidate count: {}.",
        config.threshold, judges, config.candidates
    );

    TEMPLATE
        .replace("{task}", task)
        .replace("{context_pack}", context_pack)
        .replace("{candidate}", candidate)
        .replace("{rubric}", &rubric)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_every_placeholder() {
        let config = SessionConfig {
            task: "review the diff".into(),
            ..Default::default()
        };
        let prompt = build(&config, "fn main() {}", "pack contents");
        assert!(prompt.contains("review the diff"));
        assert!(prompt.contains("pack contents"));
        assert!(prompt.contains("fn main() {}"));
        assert!(!prompt.contains("{task}"));
        assert!(!prompt.contains("{rubric}"));
    }

    #[test]
    fn empty_task_gets_a_placeholder() {
        let prompt = build(&SessionConfig::default(), "x", "y");
        assert!(prompt.contains("no task description supplied"));
    }
}
