use sweep_summary_model::RunOutcomeSummary;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::types::SweepResult;

/// The post-processing outcome of one run.
#[derive(Debug)]
pub struct RunOutcome {
    pub run_name: String,
    pub from_id: u32,
    pub to_id: u32,
    pub result: SweepResult<()>,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    pub fn to_summary(&self) -> RunOutcomeSummary {
        RunOutcomeSummary {
            name: self.run_name.clone(),
            from_id: self.from_id,
            to_id: self.to_id,
            error: self.result.as_ref().err().map(|e| format!("{e:#}")),
        }
    }
}

/// One outcome per run, in the order the runs were post-processed.
#[derive(Debug, Default)]
pub struct PostProcessReport {
    pub outcomes: Vec<RunOutcome>,
}

impl PostProcessReport {
    pub fn push(&mut self, outcome: RunOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn succeeded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &RunOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    pub fn run_names(&self) -> Vec<&str> {
        self.outcomes.iter().map(|o| o.run_name.as_str()).collect()
    }

    pub fn print_summary(&self) {
        let rows = self
            .outcomes
            .iter()
            .map(|outcome| OutcomeRow {
                run: outcome.run_name.clone(),
                from: outcome.from_id,
                to: outcome.to_id,
                post_processing: match &outcome.result {
                    Ok(()) => "ok".to_string(),
                    Err(e) => format!("failed: {e}"),
                },
            })
            .collect::<Vec<_>>();

        let mut table = Table::new(&rows);
        table.with(Style::modern());

        println!("{}", table);
        println!(
            "{} of {} run(s) post-processed successfully",
            self.succeeded_count(),
            self.outcomes.len()
        );
    }
}

#[derive(Tabled)]
struct OutcomeRow {
    run: String,
    from: u32,
    to: u32,
    post_processing: String,
}
