use crate::workplan::tracker::model::{Column, Region, TaskId, TaskTable};

/// Number of regions every task is split across; budgets are divided by it.
const REGION_COUNT: f64 = Region::ALL.len() as f64;

/// Whether `table` predates the regional split.
pub fn needs_region_split(table: &TaskTable) -> bool {
    !table.has_column(&Column::Region)
}

/// Splits every task into one copy per region.
///
/// Each copy carries a third of both quarterly budgets and blank audit
/// fields. IDs are reassigned sequentially over the expanded set, the
/// `Region` column becomes the second column and the audit columns are
/// appended when missing.
pub fn split_regions(table: &TaskTable) -> TaskTable {
    let mut tasks = Vec::with_capacity(table.len() * Region::ALL.len());
    for task in &table.tasks {
        for region in Region::ALL {
            let mut copy = task.clone();
            copy.region = Some(region);
            copy.budget_q1 = task.budget_q1 / REGION_COUNT;
            copy.budget_q2 = task.budget_q2 / REGION_COUNT;
            copy.last_modified_by.clear();
            copy.last_modified_date = None;
            tasks.push(copy);
        }
    }

    for (idx, task) in tasks.iter_mut().enumerate() {
        task.id = (idx + 1) as TaskId;
    }

    let mut columns: Vec<Column> = table
        .columns
        .iter()
        .filter(|column| **column != Column::Region)
        .cloned()
        .collect();
    if !columns.contains(&Column::LastModifiedBy) {
        columns.push(Column::LastModifiedBy);
    }
    if !columns.contains(&Column::LastModifiedDate) {
        columns.push(Column::LastModifiedDate);
    }
    columns.insert(1.min(columns.len()), Column::Region);

    TaskTable::new(columns, tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workplan::tracker::model::Task;

    fn legacy_table() -> TaskTable {
        let mut first = Task::new(1);
        first.program_area = "HTS".into();
        first.budget_q1 = 300.0;
        first.budget_q2 = 90.0;
        first.last_modified_by = "old@example.org".into();

        let mut second = Task::new(2);
        second.program_area = "PMTCT".into();

        TaskTable::new(
            vec![
                Column::Id,
                Column::ProgramArea,
                Column::BudgetQ1,
                Column::BudgetQ2,
                Column::Status,
            ],
            vec![first, second],
        )
    }

    #[test]
    fn each_row_becomes_one_row_per_region_with_a_third_of_the_budget() {
        let split = split_regions(&legacy_table());

        assert_eq!(split.len(), 6);
        let first_three = &split.tasks[..3];
        assert_eq!(
            first_three
                .iter()
                .map(|task| task.region)
                .collect::<Vec<_>>(),
            vec![
                Some(Region::North),
                Some(Region::Adamawa),
                Some(Region::ExtremeNorth)
            ]
        );
        for task in first_three {
            assert_eq!(task.budget_q1, 100.0);
            assert_eq!(task.budget_q2, 30.0);
            assert_eq!(task.program_area, "HTS");
            assert!(task.last_modified_by.is_empty());
        }
        assert_eq!(split.tasks[3].budget_q1, 0.0);
    }

    #[test]
    fn ids_are_reassigned_and_region_is_the_second_column() {
        let split = split_regions(&legacy_table());

        let ids: Vec<TaskId> = split.tasks.iter().map(|task| task.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(split.columns[0], Column::Id);
        assert_eq!(split.columns[1], Column::Region);
        assert_eq!(
            &split.columns[split.columns.len() - 2..],
            &[Column::LastModifiedBy, Column::LastModifiedDate]
        );
        assert!(!needs_region_split(&split));
    }
}
