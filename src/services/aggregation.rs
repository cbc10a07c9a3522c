//! Per-cohort driver/rider matching for one announcement.
//!
//! Everything here is a pure function of its inputs: no storage, no transport.

use serde::Serialize;

use crate::models::registration::Role;

/// A registration with the participant's display name already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntry {
    pub display_name: String,
    pub cohort: String,
    pub role: Role,
    pub capacity: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CohortSummary {
    pub cohort: String,
    pub drivers: usize,
    pub riders: usize,
    pub capacity: i64,
    pub covered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverLine {
    pub name: String,
    pub capacity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CohortRoster {
    pub cohort: String,
    pub drivers: Vec<DriverLine>,
    pub riders: Vec<String>,
}

impl CohortRoster {
    fn new(cohort: &str) -> Self {
        Self {
            cohort: cohort.to_string(),
            drivers: Vec::new(),
            riders: Vec::new(),
        }
    }

    pub fn capacity(&self) -> i64 {
        self.drivers.iter().map(|d| d.capacity).sum()
    }

    pub fn summary(&self) -> CohortSummary {
        let capacity = self.capacity();
        CohortSummary {
            cohort: self.cohort.clone(),
            drivers: self.drivers.len(),
            riders: self.riders.len(),
            capacity,
            covered: capacity >= self.riders.len() as i64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DashboardPage {
    Summary { cohorts: Vec<CohortSummary> },
    Cohort { roster: CohortRoster, summary: CohortSummary },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    /// One roster per configured cohort, in declared order.
    pub rosters: Vec<CohortRoster>,
}

impl Aggregation {
    pub fn summaries(&self) -> Vec<CohortSummary> {
        self.rosters.iter().map(CohortRoster::summary).collect()
    }

    /// Page 0 is the summary, followed by one page per cohort.
    pub fn pages(&self) -> Vec<DashboardPage> {
        let mut pages = Vec::with_capacity(self.rosters.len() + 1);
        pages.push(DashboardPage::Summary {
            cohorts: self.summaries(),
        });
        pages.extend(self.rosters.iter().map(|roster| DashboardPage::Cohort {
            roster: roster.clone(),
            summary: roster.summary(),
        }));
        pages
    }

    pub fn roster(&self, cohort: &str) -> Option<&CohortRoster> {
        self.rosters.iter().find(|r| r.cohort == cohort)
    }
}

/// Partition `entries` (in insertion order) by cohort, then by role.
/// Entries whose cohort is not in `cohorts` are dropped.
pub fn aggregate(cohorts: &[String], entries: &[ResolvedEntry]) -> Aggregation {
    let mut rosters: Vec<CohortRoster> = cohorts.iter().map(|c| CohortRoster::new(c)).collect();

    for entry in entries {
        let Some(roster) = rosters.iter_mut().find(|r| r.cohort == entry.cohort) else {
            continue;
        };
        match entry.role {
            Role::Driver => roster.drivers.push(DriverLine {
                name: entry.display_name.clone(),
                capacity: entry.capacity.unwrap_or(0),
            }),
            Role::Rider => roster.riders.push(entry.display_name.clone()),
        }
    }

    Aggregation { rosters }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cohorts() -> Vec<String> {
        vec!["GT".into(), "Emory".into(), "GSU".into()]
    }

    fn driver(name: &str, cohort: &str, capacity: i64) -> ResolvedEntry {
        ResolvedEntry {
            display_name: name.into(),
            cohort: cohort.into(),
            role: Role::Driver,
            capacity: Some(capacity),
        }
    }

    fn rider(name: &str, cohort: &str) -> ResolvedEntry {
        ResolvedEntry {
            display_name: name.into(),
            cohort: cohort.into(),
            role: Role::Rider,
            capacity: None,
        }
    }

    #[test]
    fn empty_snapshot_is_covered_everywhere() {
        let agg = aggregate(&cohorts(), &[]);
        let summaries = agg.summaries();
        assert_eq!(summaries.len(), 3);
        for s in summaries {
            assert_eq!((s.drivers, s.riders, s.capacity, s.covered), (0, 0, 0, true));
        }
        assert_eq!(agg.pages().len(), 4);
    }

    #[test]
    fn coverage_compares_capacity_with_riders() {
        let mut entries = vec![driver("Ana", "GT", 2), rider("Ben", "GT"), rider("Cy", "GT")];
        let gt = aggregate(&cohorts(), &entries).summaries().remove(0);
        assert_eq!((gt.drivers, gt.riders, gt.capacity, gt.covered), (1, 2, 2, true));

        entries.push(rider("Di", "GT"));
        let gt = aggregate(&cohorts(), &entries).summaries().remove(0);
        assert_eq!((gt.riders, gt.covered), (3, false));
    }

    #[test]
    fn cohorts_follow_declared_order_and_entries_keep_insertion_order() {
        let entries = vec![
            rider("Zed", "GSU"),
            driver("Bo", "Emory", 4),
            rider("Al", "GSU"),
            driver("Ava", "Emory", 1),
        ];
        let agg = aggregate(&cohorts(), &entries);
        let names: Vec<_> = agg.rosters.iter().map(|r| r.cohort.as_str()).collect();
        assert_eq!(names, vec!["GT", "Emory", "GSU"]);
        assert_eq!(agg.roster("GSU").unwrap().riders, vec!["Zed", "Al"]);
        let emory = agg.roster("Emory").unwrap();
        assert_eq!(emory.drivers[0].name, "Bo");
        assert_eq!(emory.capacity(), 5);
    }

    #[test]
    fn unknown_cohorts_are_excluded() {
        let agg = aggregate(&cohorts(), &[rider("Eve", "MIT"), driver("Fay", "GT", 1)]);
        let total_riders: usize = agg.summaries().iter().map(|s| s.riders).sum();
        assert_eq!(total_riders, 0);
        assert_eq!(agg.roster("GT").unwrap().drivers.len(), 1);
    }

    #[test]
    fn aggregation_is_deterministic() {
        let entries = vec![driver("A", "GT", 3), rider("B", "Emory"), rider("C", "GT")];
        let first = aggregate(&cohorts(), &entries);
        let second = aggregate(&cohorts(), &entries);
        assert_eq!(first.pages(), second.pages());
        assert_eq!(first.summaries(), second.summaries());
    }
}
