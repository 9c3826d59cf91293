//! Household history as a table.
//!
//! One row per (month, town, household) history entry, ordered by month, then
//! town insertion order, then household insertion order. CSV files are
//! written to a sibling temporary file and renamed into place, so a failed
//! export never leaves a partial file at the destination.

use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::*;

use crate::error::{EngineError, ExportError, Result};
use crate::simulation::Simulation;

pub const CSV_COLUMNS: [&str; 10] = [
    "month",
    "town_id",
    "household_id",
    "wealth",
    "income",
    "expenses",
    "member_count",
    "dependents",
    "location_x",
    "location_y",
];

#[derive(Default)]
struct HistoryColumns {
    month: Vec<u32>,
    town_id: Vec<String>,
    household_id: Vec<String>,
    wealth: Vec<f64>,
    income: Vec<f64>,
    expenses: Vec<f64>,
    member_count: Vec<u32>,
    dependents: Vec<u32>,
    location_x: Vec<f64>,
    location_y: Vec<f64>,
}

/// Build the export table for every month completed so far.
pub fn history_frame(sim: &Simulation) -> PolarsResult<DataFrame> {
    let mut cols = HistoryColumns::default();

    for month in 0..sim.current_month() {
        for town in sim.towns() {
            for household in town.households() {
                // Households added mid-run have no rows for earlier months
                let Some(record) = household.history().at_month(month) else {
                    continue;
                };
                let (x, y) = household.location();
                cols.month.push(record.month);
                cols.town_id.push(town.id().to_string());
                cols.household_id.push(household.id().to_string());
                cols.wealth.push(record.wealth);
                cols.income.push(record.income);
                cols.expenses.push(record.expenses);
                cols.member_count.push(household.member_count() as u32);
                cols.dependents.push(household.dependents());
                cols.location_x.push(x);
                cols.location_y.push(y);
            }
        }
    }

    let [month, town_id, household_id, wealth, income, expenses, member_count, dependents, location_x, location_y] =
        CSV_COLUMNS;
    DataFrame::new(vec![
        Column::new(month.into(), cols.month),
        Column::new(town_id.into(), cols.town_id),
        Column::new(household_id.into(), cols.household_id),
        Column::new(wealth.into(), cols.wealth),
        Column::new(income.into(), cols.income),
        Column::new(expenses.into(), cols.expenses),
        Column::new(member_count.into(), cols.member_count),
        Column::new(dependents.into(), cols.dependents),
        Column::new(location_x.into(), cols.location_x),
        Column::new(location_y.into(), cols.location_y),
    ])
}

/// Write the history table to `path` as CSV with a header row. Returns the
/// number of data rows written.
pub(crate) fn write_csv(sim: &Simulation, path: &Path) -> Result<usize> {
    let fail = |source: ExportError| EngineError::ExportFailure {
        path: path.to_path_buf(),
        source,
    };

    let mut frame = history_frame(sim).map_err(|e| fail(e.into()))?;
    let rows = frame.height();
    let tmp = temp_path(path).map_err(|e| fail(e.into()))?;

    if let Err(source) = write_then_rename(&mut frame, &tmp, path) {
        // Best effort: the temporary file may not exist
        let _ = std::fs::remove_file(&tmp);
        tracing::warn!(path = %path.display(), error = %source, "export failed");
        return Err(fail(source));
    }

    tracing::info!(target: "export", path = %path.display(), rows = rows as u64);
    Ok(rows)
}

fn write_then_rename(
    frame: &mut DataFrame,
    tmp: &Path,
    path: &Path,
) -> std::result::Result<(), ExportError> {
    let mut file = File::create(tmp)?;
    // Plain decimals in every float column, however small or large
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_float_scientific(Some(false))
        .finish(frame)?;
    file.sync_all()?;
    std::fs::rename(tmp, path)?;
    Ok(())
}

/// Hidden file next to `path`, so the final rename stays on one filesystem.
fn temp_path(path: &Path) -> std::io::Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} has no file name", path.display()),
        )
    })?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(name);
    tmp_name.push(format!(".{}.tmp", std::process::id()));
    Ok(path.with_file_name(tmp_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::household::Household;
    use crate::member::{Member, Occupation};
    use crate::town::Town;
    use crate::variation::FixedVariation;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "circleverse-export-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn small_sim() -> Simulation {
        let mut sim = Simulation::new(EngineConfig::default(), FixedVariation(1.0)).unwrap();
        let mut town = Town::new("North", 1.0, 1.0).unwrap();
        town.add_household(
            Household::new(
                "N1",
                vec![Member::employed(30, Occupation::Retail)],
                2,
                500.0,
                0.1,
            )
            .unwrap()
            .with_location((1.5, -2.5)),
        )
        .unwrap();
        sim.add_town(town).unwrap();
        sim
    }

    #[test]
    fn test_frame_columns_in_order() {
        let mut sim = small_sim();
        sim.run_until(3);
        let frame = history_frame(&sim).unwrap();
        let names: Vec<&str> = frame.get_column_names().iter().map(|s| s.as_str()).collect();
        assert_eq!(names, CSV_COLUMNS);
        assert_eq!(frame.height(), 3);
    }

    #[test]
    fn test_households_added_mid_run_start_at_their_first_month() {
        let mut sim = small_sim();
        sim.run_until(2);
        sim.add_household(
            "North",
            Household::new("N2", vec![Member::unemployed(70)], 0, 0.0, 0.0).unwrap(),
        )
        .unwrap();
        sim.run_until(4);

        let frame = history_frame(&sim).unwrap();
        // N1 for 4 months, N2 for months 2 and 3
        assert_eq!(frame.height(), 6);
    }

    #[test]
    fn test_csv_header_and_row_shape() {
        let dir = scratch_dir("shape");
        let path = dir.join("out.csv");
        let mut sim = small_sim();
        sim.run_until(2);

        let rows = sim.export_to_csv(&path).unwrap();
        assert_eq!(rows, 2);

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), CSV_COLUMNS.join(","));
        let first: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(first[0], "0");
        assert_eq!(first[1], "North");
        assert_eq!(first[2], "N1");
        assert_eq!(first[6], "1");
        assert_eq!(first[7], "2");
        assert_eq!(first[8].parse::<f64>().unwrap(), 1.5);
        assert_eq!(first[9].parse::<f64>().unwrap(), -2.5);
        assert_eq!(lines.count(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_extreme_floats_written_as_plain_decimals() {
        let dir = scratch_dir("decimals");
        let path = dir.join("out.csv");
        let mut sim = Simulation::new(EngineConfig::default(), FixedVariation(1.0)).unwrap();
        let mut town = Town::new("T", 1.0, 1.0).unwrap();
        town.add_household(
            Household::new("tiny", vec![Member::unemployed(80)], 0, 2.5e16, 0.0)
                .unwrap()
                .with_location((1e-7, 0.00001234)),
        )
        .unwrap();
        sim.add_town(town).unwrap();
        sim.run_until(1);

        sim.export_to_csv(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let row: Vec<&str> = text.lines().nth(1).unwrap().split(',').collect();
        for (idx, expected) in [(3, 2.5e16), (8, 1e-7), (9, 0.00001234)] {
            let field = row[idx];
            assert!(!field.contains(['e', 'E']), "column {} written as {field}", CSV_COLUMNS[idx]);
            let value: f64 = field.parse().unwrap();
            assert!((value - expected).abs() <= expected * 1e-9, "{field} != {expected}");
        }

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_directory_fails_without_leftovers() {
        let dir = scratch_dir("missing");
        let path = dir.join("no-such-dir").join("out.csv");
        let err = small_sim().export_to_csv(&path).unwrap_err();
        assert!(matches!(err, EngineError::ExportFailure { .. }));
        assert!(!path.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_failed_rename_keeps_destination_and_cleans_temp() {
        let dir = scratch_dir("rename");
        // A non-empty directory at the destination cannot be replaced by a file
        let path = dir.join("taken.csv");
        std::fs::create_dir_all(path.join("inner")).unwrap();

        let mut sim = small_sim();
        sim.run_until(1);
        let err = sim.export_to_csv(&path).unwrap_err();
        assert!(matches!(err, EngineError::ExportFailure { .. }));
        assert!(path.join("inner").is_dir());

        let leftovers: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temporary files left behind: {leftovers:?}");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_replaces_existing_file_on_success() {
        let dir = scratch_dir("replace");
        let path = dir.join("out.csv");
        std::fs::write(&path, "old contents\n").unwrap();

        let mut sim = small_sim();
        sim.run_until(1);
        sim.export_to_csv(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("month,town_id"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
