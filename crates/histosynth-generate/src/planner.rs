use histosynth_core::{PipelineConfig, Stage};

use crate::errors::GenerationError;
use crate::history::HistoryProfile;
use crate::model::{GenerationIssue, codes};

/// Planned execution of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTask {
    pub stage: Stage,
    pub depends_on: Vec<Stage>,
}

/// Resolved run: stage order, generated years and planning warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub years: Vec<i32>,
    pub tasks: Vec<StageTask>,
    pub issues: Vec<GenerationIssue>,
}

/// Build a deterministic run plan for `config` on top of `profile`.
pub fn plan_run(
    config: &PipelineConfig,
    profile: &HistoryProfile,
) -> Result<RunPlan, GenerationError> {
    config.validate()?;

    if config.start_year <= profile.last_year {
        return Err(GenerationError::Configuration(format!(
            "start_year {} must be after the last historical year {}",
            config.start_year, profile.last_year
        )));
    }

    let mut issues = Vec::new();
    if config.start_year > profile.last_year + 1 {
        issues.push(GenerationIssue::warning(
            codes::HISTORY_GAP,
            format!(
                "history ends in {} but generation starts in {}; trends are extrapolated across the gap",
                profile.last_year, config.start_year
            ),
        ));
    }

    let tasks: Vec<StageTask> = histosynth_core::stage_order()?
        .into_iter()
        .map(|stage| StageTask {
            stage,
            depends_on: stage.dependencies().to_vec(),
        })
        .collect();

    if tasks.len() != Stage::ALL.len() {
        return Err(GenerationError::StageOrder(
            "stage graph did not resolve every stage".to_string(),
        ));
    }

    Ok(RunPlan {
        years: config.years(),
        tasks,
        issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_history;

    fn profile() -> HistoryProfile {
        HistoryProfile::analyze(&sample_history()).expect("profile")
    }

    #[test]
    fn plan_orders_stages_after_their_dependencies() {
        let plan = plan_run(&PipelineConfig::new(2022, 4), &profile()).expect("plan");
        assert_eq!(plan.years, vec![2022, 2023, 2024, 2025]);
        for (idx, task) in plan.tasks.iter().enumerate() {
            for dependency in &task.depends_on {
                let position = plan
                    .tasks
                    .iter()
                    .position(|candidate| candidate.stage == *dependency)
                    .expect("dependency planned");
                assert!(position < idx, "{} must follow {}", task.stage, dependency);
            }
        }
        assert!(plan.issues.is_empty());
    }

    #[test]
    fn start_year_inside_history_is_rejected() {
        let err = plan_run(&PipelineConfig::new(2021, 2), &profile()).unwrap_err();
        assert!(matches!(err, GenerationError::Configuration(_)));
    }

    #[test]
    fn gap_after_history_is_a_warning() {
        let plan = plan_run(&PipelineConfig::new(2024, 1), &profile()).expect("plan");
        assert_eq!(plan.issues.len(), 1);
        assert_eq!(plan.issues[0].code, codes::HISTORY_GAP);
    }
}
