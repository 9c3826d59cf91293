//! Captures simulation events as column-oriented tables.
//!
//! The engine reports each month through `tracing` events with a fixed
//! target (`household_month`, `town_month`, `shock`, `export`). The
//! [`RecordingSubscriber`] turns each event into a row of the table named
//! after its target; columns appear the first time a field is seen.
//!
//! ```ignore
//! let recorder = instrument::record(|| sim.run_until(12));
//! let households = recorder.table("household_month").unwrap().to_frame()?;
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Level, Metadata, Subscriber};

/// Event targets the engine emits once per month, shock or export.
pub const SIMULATION_TARGETS: [&str; 4] = ["household_month", "town_month", "shock", "export"];

// === Tables ===

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    U64(Vec<u64>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Text(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::U64(v) => v.len(),
            ColumnData::I64(v) => v.len(),
            ColumnData::F64(v) => v.len(),
            ColumnData::Bool(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill with zero values (empty text) up to `rows`.
    fn pad_to(&mut self, rows: usize) {
        let missing = rows.saturating_sub(self.len());
        if missing == 0 {
            return;
        }
        match self {
            ColumnData::U64(v) => v.extend(std::iter::repeat_n(0, missing)),
            ColumnData::I64(v) => v.extend(std::iter::repeat_n(0, missing)),
            ColumnData::F64(v) => v.extend(std::iter::repeat_n(0.0, missing)),
            ColumnData::Bool(v) => v.extend(std::iter::repeat_n(false, missing)),
            ColumnData::Text(v) => v.extend(std::iter::repeat_n(String::new(), missing)),
        }
    }

    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            ColumnData::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<&[u64]> {
        match self {
            ColumnData::U64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&[String]> {
        match self {
            ColumnData::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// Rows of one event target. Columns keep the order fields were first seen,
/// and every column always has `rows` entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTable {
    columns: Vec<(String, ColumnData)>,
    rows: usize,
}

impl EventTable {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    /// Column for `name`, created (and back-filled) with `empty` on first use.
    fn column_mut(&mut self, name: &str, empty: fn() -> ColumnData) -> &mut ColumnData {
        let idx = match self.columns.iter().position(|(n, _)| n == name) {
            Some(idx) => idx,
            None => {
                let mut column = empty();
                column.pad_to(self.rows);
                self.columns.push((name.to_string(), column));
                self.columns.len() - 1
            }
        };
        &mut self.columns[idx].1
    }

    /// Close the current row: fields the event did not carry get zero values.
    fn finish_row(&mut self) {
        self.rows += 1;
        for (_, column) in &mut self.columns {
            column.pad_to(self.rows);
        }
    }

    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let columns = self
            .columns
            .iter()
            .map(|(name, data)| {
                let name: PlSmallStr = name.as_str().into();
                match data {
                    ColumnData::U64(v) => Column::new(name, v),
                    ColumnData::I64(v) => Column::new(name, v),
                    ColumnData::F64(v) => Column::new(name, v),
                    ColumnData::Bool(v) => Column::new(name, v),
                    ColumnData::Text(v) => Column::new(name, v),
                }
            })
            .collect();
        DataFrame::new(columns)
    }
}

/// Tables keyed by event target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recorder {
    pub tables: BTreeMap<String, EventTable>,
}

impl Recorder {
    pub fn table(&self, target: &str) -> Option<&EventTable> {
        self.tables.get(target)
    }

    pub fn to_frames(&self) -> PolarsResult<BTreeMap<String, DataFrame>> {
        self.tables
            .iter()
            .map(|(name, table)| Ok((name.clone(), table.to_frame()?)))
            .collect()
    }
}

thread_local! {
    static RECORDER: RefCell<Recorder> = RefCell::default();
}

// === Subscriber ===

/// Appends one field to the current row. A field whose type differs from
/// the existing column is dropped and the cell is zero-filled.
struct RowVisitor<'a> {
    table: &'a mut EventTable,
}

impl Visit for RowVisitor<'_> {
    fn record_u64(&mut self, field: &Field, value: u64) {
        if let ColumnData::U64(v) = self.table.column_mut(field.name(), || ColumnData::U64(Vec::new())) {
            v.push(value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if let ColumnData::I64(v) = self.table.column_mut(field.name(), || ColumnData::I64(Vec::new())) {
            v.push(value);
        }
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let ColumnData::F64(v) = self.table.column_mut(field.name(), || ColumnData::F64(Vec::new())) {
            v.push(value);
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if let ColumnData::Bool(v) = self.table.column_mut(field.name(), || ColumnData::Bool(Vec::new())) {
            v.push(value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if let ColumnData::Text(v) = self.table.column_mut(field.name(), || ColumnData::Text(Vec::new())) {
            v.push(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record_str(field, &format!("{value:?}"));
    }
}

/// Subscriber that stores info-level events from selected targets in the
/// thread-local [`Recorder`]. Spans are ignored.
#[derive(Debug, Clone)]
pub struct RecordingSubscriber {
    targets: Vec<String>,
}

impl RecordingSubscriber {
    /// Records only the simulation's own event targets.
    pub fn simulation() -> Self {
        Self::for_targets(SIMULATION_TARGETS)
    }

    pub fn for_targets<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for RecordingSubscriber {
    fn default() -> Self {
        Self::simulation()
    }
}

impl Subscriber for RecordingSubscriber {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_event()
            && *metadata.level() <= Level::INFO
            && self.targets.iter().any(|t| t == metadata.target())
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let target = event.metadata().target();
        RECORDER.with(|r| {
            let mut recorder = r.borrow_mut();
            let table = recorder.tables.entry(target.to_string()).or_default();
            event.record(&mut RowVisitor { table: &mut *table });
            table.finish_row();
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Take everything recorded on this thread so far.
pub fn drain() -> Recorder {
    RECORDER.with(|r| std::mem::take(&mut *r.borrow_mut()))
}

pub fn clear() {
    RECORDER.with(|r| *r.borrow_mut() = Recorder::default());
}

/// Run `f` with a recording subscriber scoped to this thread and return what
/// it emitted. Earlier recordings on this thread are discarded.
pub fn record<T>(f: impl FnOnce() -> T) -> (T, Recorder) {
    clear();
    let out = tracing::subscriber::with_default(RecordingSubscriber::simulation(), f);
    (out, drain())
}

// === Output ===

fn io_error(error: std::io::Error) -> PolarsError {
    PolarsError::IO {
        error: error.into(),
        msg: None,
    }
}

/// Write each frame to `{dir}/{name}.csv`, creating `dir` if needed.
pub fn save_csv(frames: &mut BTreeMap<String, DataFrame>, dir: &Path) -> PolarsResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).map_err(io_error)?;
    let mut written = Vec::with_capacity(frames.len());
    for (name, frame) in frames.iter_mut() {
        let path = dir.join(format!("{name}.csv"));
        let mut file = std::fs::File::create(&path).map_err(io_error)?;
        CsvWriter::new(&mut file).include_header(true).finish(frame)?;
        written.push(path);
    }
    Ok(written)
}

/// Keep ASCII letters and digits; everything else becomes `_`.
fn sanitize(name: &str) -> String {
    name.chars()
        .take(60)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Guard that records a whole run and writes it out as CSV.
///
/// The recording subscriber is this thread's default until the guard goes
/// away, so it takes over from any global subscriber for that time. Output
/// lands in `{parent}/{name}_{unix_seconds}/`, one file per table plus an
/// empty `_complete` marker once every file is written. Call
/// [`RunCapture::finish`] to see write errors; a plain drop only reports
/// them on stderr.
///
/// ```ignore
/// let capture = instrument::RunCapture::start("runs", "struggleville baseline");
/// sim.run_until(120);
/// let tables = capture.finish()?;
/// ```
pub struct RunCapture {
    run_dir: PathBuf,
    frames: Option<BTreeMap<String, DataFrame>>,
    written: bool,
    _guard: tracing::subscriber::DefaultGuard,
}

impl RunCapture {
    pub fn start(parent: impl Into<PathBuf>, name: &str) -> Self {
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let run_dir = parent.into().join(format!("{}_{stamp}", sanitize(name)));
        clear();
        let guard = tracing::subscriber::set_default(RecordingSubscriber::simulation());
        Self {
            run_dir,
            frames: None,
            written: false,
            _guard: guard,
        }
    }

    /// Drain the recorder on first call; later calls return the same frames.
    pub fn frames(&mut self) -> PolarsResult<&BTreeMap<String, DataFrame>> {
        if self.frames.is_none() {
            self.frames = Some(drain().to_frames()?);
        }
        Ok(self.frames.get_or_insert_with(BTreeMap::new))
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Write the run and stop recording. Returns the number of tables
    /// written; nothing touches disk when no event was recorded.
    pub fn finish(mut self) -> PolarsResult<usize> {
        self.write()
    }

    fn write(&mut self) -> PolarsResult<usize> {
        if self.written {
            return Ok(0);
        }
        self.written = true;
        let mut frames = match self.frames.take() {
            Some(frames) => frames,
            None => drain().to_frames()?,
        };
        if frames.is_empty() {
            return Ok(0);
        }
        let written = save_csv(&mut frames, &self.run_dir)?;
        std::fs::File::create(self.run_dir.join("_complete")).map_err(io_error)?;
        Ok(written.len())
    }
}

impl Drop for RunCapture {
    fn drop(&mut self) {
        // Still the default subscriber here, so tracing would record the error
        match self.write() {
            Ok(0) => {}
            Ok(n) => eprintln!("RunCapture: wrote {n} tables to {}", self.run_dir.display()),
            Err(e) => eprintln!("RunCapture({}): {e}", self.run_dir.display()),
        }
    }
}
