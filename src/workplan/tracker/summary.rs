use std::collections::BTreeMap;

use crate::workplan::tracker::model::{Status, Task, TaskTable};

/// Tasks without a program area are left out of every statistic.
fn in_statistics(task: &Task) -> bool {
    !task.program_area.trim().is_empty()
}

/// Task counts per status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSummary {
    pub total: usize,
    pub counts: BTreeMap<Status, usize>,
}

impl StatusSummary {
    pub fn from_table(table: &TaskTable) -> Self {
        let mut summary = Self::default();
        for task in table.tasks.iter().filter(|task| in_statistics(task)) {
            summary.total += 1;
            *summary.counts.entry(task.status).or_default() += 1;
        }
        summary
    }

    pub fn count(&self, status: Status) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    /// Share of tasks in `status`, in percent; 0 for an empty summary.
    pub fn percent(&self, status: Status) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.count(status) as f64 / self.total as f64 * 100.0
        }
    }

    pub fn completed(&self) -> usize {
        self.count(Status::Completed)
    }

    pub fn in_progress(&self) -> usize {
        self.count(Status::InProgress)
    }

    pub fn delayed(&self) -> usize {
        self.count(Status::Delayed)
    }
}

/// Status counts for one program area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaStatusRow {
    pub program_area: String,
    pub summary: StatusSummary,
}

/// Per-area status breakdown, largest areas first.
pub fn status_by_program_area(table: &TaskTable) -> Vec<AreaStatusRow> {
    let mut areas: BTreeMap<String, StatusSummary> = BTreeMap::new();
    for task in table.tasks.iter().filter(|task| in_statistics(task)) {
        let summary = areas
            .entry(task.program_area.trim().to_string())
            .or_default();
        summary.total += 1;
        *summary.counts.entry(task.status).or_default() += 1;
    }

    let mut rows: Vec<AreaStatusRow> = areas
        .into_iter()
        .map(|(program_area, summary)| AreaStatusRow {
            program_area,
            summary,
        })
        .collect();
    rows.sort_by(|lhs, rhs| rhs.summary.total.cmp(&lhs.summary.total));
    rows
}

/// Budget for one program area across both quarters.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaBudget {
    pub program_area: String,
    pub q1: f64,
    pub q2: f64,
}

impl AreaBudget {
    pub fn total(&self) -> f64 {
        self.q1 + self.q2
    }
}

/// Budget totals for the two tracked quarters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialSummary {
    pub total_q1: f64,
    pub total_q2: f64,
    /// Largest total first.
    pub by_area: Vec<AreaBudget>,
}

impl FinancialSummary {
    pub fn from_table(table: &TaskTable) -> Self {
        let mut areas: BTreeMap<String, (f64, f64)> = BTreeMap::new();
        let mut summary = Self::default();

        for task in table.tasks.iter().filter(|task| in_statistics(task)) {
            summary.total_q1 += task.budget_q1;
            summary.total_q2 += task.budget_q2;
            let entry = areas
                .entry(task.program_area.trim().to_string())
                .or_insert((0.0, 0.0));
            entry.0 += task.budget_q1;
            entry.1 += task.budget_q2;
        }

        summary.by_area = areas
            .into_iter()
            .map(|(program_area, (q1, q2))| AreaBudget {
                program_area,
                q1,
                q2,
            })
            .collect();
        summary
            .by_area
            .sort_by(|lhs, rhs| rhs.total().total_cmp(&lhs.total()));
        summary
    }

    pub fn total(&self) -> f64 {
        self.total_q1 + self.total_q2
    }
}
