use uuid::Uuid;

use crate::{
    error::AppError,
    models::interaction::ExportFile,
    services::{aggregation::Aggregation, dashboard::DashboardService},
    AppState,
};

pub const EXPORT_FILENAME: &str = "rides_export.txt";

/// Tab-separated snapshot meant to be pasted into a spreadsheet.
///
/// Row `i` holds the `i`-th driver and rider of every cohort, four columns per
/// cohort: driver name, driver seats, rider name, and a blank spacer.
pub fn to_tsv(aggregation: &Aggregation) -> anyhow::Result<String> {
    let rows = aggregation
        .rosters
        .iter()
        .map(|r| r.drivers.len().max(r.riders.len()))
        .max()
        .unwrap_or(0);

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(Vec::new());

    for i in 0..rows {
        let mut record: Vec<String> = Vec::with_capacity(aggregation.rosters.len() * 4);
        for roster in &aggregation.rosters {
            let (driver, seats) = match roster.drivers.get(i) {
                Some(d) => (d.name.clone(), d.capacity.to_string()),
                None => (String::new(), String::new()),
            };
            let rider = roster.riders.get(i).cloned().unwrap_or_default();
            record.extend([driver, seats, rider, String::new()]);
        }
        writer.write_record(&record)?;
    }

    let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!("{}", e))?;
    Ok(String::from_utf8(bytes)?)
}

pub async fn export(state: &AppState, announcement_id: Uuid) -> Result<ExportFile, AppError> {
    let aggregation = DashboardService::aggregate_for(state, announcement_id).await?;
    let body = to_tsv(&aggregation).map_err(|e| AppError::Internal(format!("Export failed: {e}")))?;
    Ok(ExportFile {
        filename: EXPORT_FILENAME.to_string(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::registration::Role;
    use crate::services::aggregation::{aggregate, ResolvedEntry};

    fn entry(name: &str, cohort: &str, role: Role, capacity: Option<i64>) -> ResolvedEntry {
        ResolvedEntry {
            display_name: name.into(),
            cohort: cohort.into(),
            role,
            capacity,
        }
    }

    #[test]
    fn empty_snapshot_exports_nothing() {
        let agg = aggregate(&["GT".to_string()], &[]);
        assert_eq!(to_tsv(&agg).unwrap(), "");
    }

    #[test]
    fn rows_line_up_across_cohorts() {
        let cohorts = vec!["GT".to_string(), "Emory".to_string()];
        let agg = aggregate(
            &cohorts,
            &[
                entry("Ana", "GT", Role::Driver, Some(3)),
                entry("Ben", "GT", Role::Rider, None),
                entry("Cy", "GT", Role::Rider, None),
                entry("Di", "Emory", Role::Rider, None),
            ],
        );
        let tsv = to_tsv(&agg).unwrap();
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Ana\t3\tBen\t\t\t\tDi\t");
        assert_eq!(lines[1], "\t\tCy\t\t\t\t\t");
    }
}
