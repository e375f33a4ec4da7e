use std::collections::BTreeSet;

use crate::workplan::tracker::model::{Region, Status, Task, TaskTable};

/// Conjunctive row filter. `None` on a field means "All".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub region: Option<Region>,
    pub status: Option<Status>,
    /// Compared against the trimmed program area.
    pub program_area: Option<String>,
    /// Case-insensitive substring over Activities and ACMS Sub-Activities.
    pub search: Option<String>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if self.region.is_some_and(|region| task.region != Some(region)) {
            return false;
        }
        if self.status.is_some_and(|status| task.status != status) {
            return false;
        }
        if let Some(area) = &self.program_area {
            if task.program_area.trim() != area.trim() {
                return false;
            }
        }
        if let Some(query) = self.search.as_deref().map(str::trim) {
            if !query.is_empty() {
                let query = query.to_lowercase();
                let hit = task.activities.to_lowercase().contains(&query)
                    || task.sub_activities.to_lowercase().contains(&query);
                if !hit {
                    return false;
                }
            }
        }
        true
    }

    /// Rows of `table` accepted by the filter, keeping the table's columns.
    pub fn apply(&self, table: &TaskTable) -> TaskTable {
        table.subset(|task| self.matches(task))
    }
}

/// Distinct values offered for each filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub regions: Vec<Region>,
    pub statuses: Vec<Status>,
    pub program_areas: Vec<String>,
}

impl FilterOptions {
    pub fn from_table(table: &TaskTable) -> Self {
        let regions: BTreeSet<Region> = table.tasks.iter().filter_map(|task| task.region).collect();
        let statuses: BTreeSet<Status> = table.tasks.iter().map(|task| task.status).collect();
        let program_areas: BTreeSet<String> = table
            .tasks
            .iter()
            .map(|task| task.program_area.trim())
            .filter(|area| !area.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            regions: regions.into_iter().collect(),
            statuses: statuses.into_iter().collect(),
            program_areas: program_areas.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workplan::tracker::model::Column;

    fn task(id: u32, region: Region, status: Status, area: &str, activity: &str) -> Task {
        let mut task = Task::new(id);
        task.region = Some(region);
        task.status = status;
        task.program_area = area.to_string();
        task.activities = activity.to_string();
        task
    }

    fn table() -> TaskTable {
        TaskTable::new(
            vec![Column::Id, Column::Region, Column::Status],
            vec![
                task(1, Region::North, Status::Pending, "HTS", "Community testing"),
                task(2, Region::Adamawa, Status::Completed, "PMTCT", "Mentor mothers"),
                task(3, Region::North, Status::Completed, "HTS ", "Index TESTING"),
            ],
        )
    }

    #[test]
    fn status_filter_selects_matching_rows() {
        let filter = TaskFilter {
            status: Some(Status::Completed),
            ..TaskFilter::default()
        };
        let ids: Vec<u32> = filter.apply(&table()).tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn filters_combine() {
        let filter = TaskFilter {
            region: Some(Region::North),
            program_area: Some("HTS".into()),
            search: Some("testing".into()),
            ..TaskFilter::default()
        };
        let ids: Vec<u32> = filter.apply(&table()).tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn options_are_distinct_and_sorted() {
        let options = FilterOptions::from_table(&table());
        assert_eq!(options.regions, vec![Region::North, Region::Adamawa]);
        assert_eq!(options.statuses, vec![Status::Pending, Status::Completed]);
        assert_eq!(options.program_areas, vec!["HTS".to_string(), "PMTCT".to_string()]);
    }
}
