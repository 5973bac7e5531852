//! Range and consistency checks for a loaded [`GanConfig`] (§6.6). Unlike the
//! teacher's fail-fast `anyhow::bail!` validators, this collects every
//! problem found and returns them as a `Vec<String>` rather than stopping at
//! the first one, per the spec's explicit choice of reporting style.

use crate::config::GanConfig;

pub fn validate_config(config: &GanConfig) -> Vec<String> {
    let mut problems = Vec::new();

    if config.audit_timeout_millis == 0 {
        problems.push("auditTimeoutMillis must be > 0".to_string());
    }
    if config.max_concurrent_audits == 0 {
        problems.push("maxConcurrentAudits must be > 0".to_string());
    }
    if config.max_session_age_millis == 0 {
        problems.push("maxSessionAgeMillis must be > 0".to_string());
    }
    if config.sweep_interval_millis == 0 {
        problems.push("sweepIntervalMillis must be > 0".to_string());
    }
    if !(0.0..=1.0).contains(&config.stagnation_similarity_threshold) {
        problems.push(format!(
            "stagnationSimilarityThreshold must be in [0, 1] (got {})",
            config.stagnation_similarity_threshold
        ));
    }
    if config.completion_tiers.len() != 3 {
        problems.push(format!(
            "completionTiers must have exactly 3 entries (got {})",
            config.completion_tiers.len()
        ));
    }
    for (i, tier) in config.completion_tiers.iter().enumerate() {
        if !(0.0..=100.0).contains(&tier.score) {
            problems.push(format!(
                "completionTiers[{i}].score must be in [0, 100] (got {})",
                tier.score
            ));
        }
        if tier.max_loops == 0 {
            problems.push(format!("completionTiers[{i}].maxLoops must be > 0"));
        }
    }
    if let Some(prev) = config
        .completion_tiers
        .windows(2)
        .find(|w| w[0].max_loops > w[1].max_loops)
    {
        problems.push(format!(
            "completionTiers must have non-decreasing maxLoops (found {} before {})",
            prev[0].max_loops, prev[1].max_loops
        ));
    }
    if config.hard_stop_loops == 0 {
        problems.push("hardStopLoops must be > 0".to_string());
    }
    if let Some(last_tier) = config.completion_tiers.last() {
        if last_tier.max_loops > config.hard_stop_loops {
            problems.push(format!(
                "the last completion tier's maxLoops ({}) exceeds hardStopLoops ({})",
                last_tier.max_loops, config.hard_stop_loops
            ));
        }
    }
    if config.max_memory_usage_bytes == 0 {
        problems.push("maxMemoryUsageBytes must be > 0".to_string());
    }
    if config.max_iterations_in_memory == 0 {
        problems.push("maxIterationsInMemory must be > 0".to_string());
    }
    if config.state_directory.as_os_str().is_empty() {
        problems.push("stateDirectory must not be empty".to_string());
    }
    if config.judge_executable.as_os_str().is_empty() {
        problems.push("judgeExecutable must not be empty".to_string());
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TierConfig;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&GanConfig::default()).is_empty());
    }

    #[test]
    fn zero_timeouts_are_reported() {
        let config = GanConfig {
            audit_timeout_millis: 0,
            max_concurrent_audits: 0,
            ..GanConfig::default()
        };
        let problems = validate_config(&config);
        assert!(problems.iter().any(|p| p.contains("auditTimeoutMillis")));
        assert!(problems.iter().any(|p| p.contains("maxConcurrentAudits")));
    }

    #[test]
    fn out_of_range_similarity_threshold_is_reported() {
        let config = GanConfig {
            stagnation_similarity_threshold: 1.5,
            ..GanConfig::default()
        };
        let problems = validate_config(&config);
        assert!(
            problems
                .iter()
                .any(|p| p.contains("stagnationSimilarityThreshold"))
        );
    }

    #[test]
    fn decreasing_tier_max_loops_is_reported() {
        let config = GanConfig {
            completion_tiers: vec![
                TierConfig {
                    score: 95.0,
                    max_loops: 20,
                },
                TierConfig {
                    score: 90.0,
                    max_loops: 10,
                },
            ],
            ..GanConfig::default()
        };
        let problems = validate_config(&config);
        assert!(
            problems
                .iter()
                .any(|p| p.contains("non-decreasing maxLoops"))
        );
    }

    #[test]
    fn multiple_problems_are_all_collected_not_just_the_first() {
        let config = GanConfig {
            audit_timeout_millis: 0,
            max_concurrent_audits: 0,
            max_memory_usage_bytes: 0,
            ..GanConfig::default()
        };
        assert_eq!(validate_config(&config).len(), 3);
    }
}
