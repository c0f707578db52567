use std::collections::BTreeSet;

use tracing::debug;

use histosynth_core::{History, Stage, TerminationParams, TerminationReason};

use crate::errors::GenerationError;
use crate::history::HistoryProfile;
use crate::random::SeedSource;
use crate::sampling::label_mix;
use crate::synth::employees::EmployeeOutput;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerminationReasonOutput {
    pub reasons: Vec<TerminationReason>,
}

/// Attaches a reason to every termination that falls in a generated year.
#[derive(Debug, Clone)]
pub struct TerminationReasonSynthesizer<'a> {
    history: &'a History,
    profile: &'a HistoryProfile,
    params: &'a TerminationParams,
    years: &'a [i32],
}

impl<'a> TerminationReasonSynthesizer<'a> {
    pub fn new(
        history: &'a History,
        profile: &'a HistoryProfile,
        params: &'a TerminationParams,
        years: &'a [i32],
    ) -> Self {
        Self {
            history,
            profile,
            params,
            years,
        }
    }

    pub fn run(
        &self,
        employees: &EmployeeOutput,
        seeds: &SeedSource,
    ) -> Result<TerminationReasonOutput, GenerationError> {
        let mix = label_mix(&self.profile.termination_reason_counts, &self.params.reasons)?;
        let recorded: BTreeSet<u64> = self
            .history
            .termination_reasons
            .iter()
            .map(|reason| reason.employee_id)
            .collect();

        let mut output = TerminationReasonOutput::default();
        for &year in self.years {
            let mut rng = seeds.year_rng(Stage::TerminationReasons, year);
            let mut terminated: Vec<_> = employees
                .periods
                .iter()
                .filter(|period| period.year == year && !recorded.contains(&period.employee_id))
                .filter_map(|period| period.terminated_on.map(|date| (date, period.employee_id)))
                .collect();
            terminated.sort();
            for (terminated_on, employee_id) in terminated {
                output.reasons.push(TerminationReason {
                    employee_id,
                    terminated_on,
                    reason: mix.sample(&mut rng).clone(),
                });
            }
        }
        debug!(reasons = output.reasons.len(), "termination reasons");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use histosynth_core::EmployeeParams;

    use super::*;
    use crate::fixtures::sample_history;
    use crate::synth::employees::EmployeeSynthesizer;
    use crate::synth::locations::LocationSynthesizer;

    fn run(history: &History, years: &[i32]) -> (EmployeeOutput, TerminationReasonOutput) {
        let profile = HistoryProfile::analyze(history).expect("profile");
        let locations = LocationSynthesizer::new(&profile, years).run().expect("locations");
        let employee_params = EmployeeParams {
            termination_rate: 0.5,
            ..EmployeeParams::default()
        };
        let employees =
            EmployeeSynthesizer::new(history, &profile, &employee_params, &locations, years)
                .run(&SeedSource::new(1234))
                .expect("employees");
        let params = TerminationParams::default();
        let reasons = TerminationReasonSynthesizer::new(history, &profile, &params, years)
            .run(&employees, &SeedSource::new(1234))
            .expect("reasons");
        (employees, reasons)
    }

    #[test]
    fn every_generated_termination_gets_one_reason() {
        let mut history = sample_history();
        history.termination_reasons.clear();
        let (employees, output) = run(&history, &[2022, 2023, 2024]);

        let terminations: BTreeMap<u64, _> = employees
            .periods
            .iter()
            .filter_map(|period| period.terminated_on.map(|date| (period.employee_id, date)))
            .collect();
        assert!(!terminations.is_empty());
        assert_eq!(output.reasons.len(), terminations.len());
        for reason in &output.reasons {
            assert_eq!(terminations.get(&reason.employee_id), Some(&reason.terminated_on));
            assert!(["Another Job", "Moved", "Terminated"].contains(&reason.reason.as_str()));
        }
    }

    #[test]
    fn historical_reason_mix_takes_precedence() {
        let history = sample_history();
        let (_, output) = run(&history, &[2022, 2023, 2024]);
        assert!(!output.reasons.is_empty());
        assert!(output.reasons.iter().all(|reason| reason.reason == "Moved"));
    }
}
