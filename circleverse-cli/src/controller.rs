//! Line-oriented control of a running simulation.

use std::fmt::Write as _;
use std::io::{BufRead, Write};
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use circleverse_core::instrument::RunCapture;
use circleverse_core::{EngineError, Simulation};

pub const DEFAULT_EXPORT_FILE: &str = "circleverse_export.csv";

/// One parsed controller command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Step(u32),
    RunUntil(u32),
    Pause,
    Resume,
    Stats,
    Shock {
        town: String,
        household: String,
        kind: String,
        amount: f64,
    },
    Export(String),
    Reset,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((&head, args)) = parts.split_first() else {
            return Ok(Command::Help);
        };

        let cmd = match head.to_lowercase().as_str() {
            "s" | "step" => match args.first() {
                Some(n) => Command::Step(n.parse().with_context(|| format!("invalid month count {n:?}"))?),
                None => Command::Step(1),
            },
            "r" | "run" => {
                let target = args.first().ok_or_else(|| anyhow!("usage: run <month>"))?;
                Command::RunUntil(target.parse().with_context(|| format!("invalid month {target:?}"))?)
            }
            "p" | "pause" => Command::Pause,
            "u" | "unpause" | "resume" => Command::Resume,
            "stats" => Command::Stats,
            "shock" => {
                let [town, household, kind, amount] = args else {
                    bail!("usage: shock <town> <household> <kind> <amount>");
                };
                Command::Shock {
                    town: town.to_string(),
                    household: household.to_string(),
                    kind: kind.to_string(),
                    amount: amount.parse().with_context(|| format!("invalid amount {amount:?}"))?,
                }
            }
            "e" | "export" => Command::Export(args.first().unwrap_or(&DEFAULT_EXPORT_FILE).to_string()),
            "reset" => Command::Reset,
            "h" | "?" | "help" => Command::Help,
            "q" | "quit" | "exit" => Command::Quit,
            other => bail!("unknown command: {other} (type 'help' for the list)"),
        };
        Ok(cmd)
    }
}

/// Whether the loop should keep reading commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Controller {
    sim: Simulation,
}

impl Controller {
    pub fn new(sim: Simulation) -> Self {
        Self { sim }
    }

    #[cfg(test)]
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    pub fn execute(&mut self, command: Command, out: &mut impl Write) -> Result<Flow> {
        match command {
            Command::Step(months) => {
                self.sim.step_months(months);
                writeln!(out, "Stepped {months} month(s). Current month: {}", self.sim.current_month())?;
            }
            Command::RunUntil(target) => {
                self.sim.run_until(target);
                writeln!(out, "Current month: {}", self.sim.current_month())?;
            }
            Command::Pause => {
                self.sim.pause();
                writeln!(out, "Simulation paused.")?;
            }
            Command::Resume => {
                self.sim.resume();
                writeln!(out, "Simulation resumed.")?;
            }
            Command::Stats => out.write_all(statistics_report(&self.sim).as_bytes())?,
            Command::Shock {
                town,
                household,
                kind,
                amount,
            } => {
                let found = self
                    .sim
                    .town(&town)
                    .ok_or_else(|| EngineError::UnknownTown(town.clone()))?
                    .household(&household)
                    .is_some();
                if !found {
                    return Err(EngineError::UnknownHousehold(format!("{household} in {town}")).into());
                }
                self.sim.apply_named_shock(&household, &kind, amount)?;
                let wealth = self.sim.household(&household).map_or(0.0, |h| h.wealth());
                writeln!(out, "Applied {kind} to {household}. Wealth now {}", money(wealth))?;
            }
            Command::Export(file) => {
                let rows = self
                    .sim
                    .export_to_csv(&file)
                    .with_context(|| format!("exporting to {file}"))?;
                writeln!(out, "Exported {rows} rows to {file}")?;
            }
            Command::Reset => {
                self.sim.reset();
                writeln!(out, "Simulation reset to month 0.")?;
            }
            Command::Help => out.write_all(menu(&self.sim).as_bytes())?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Run to `months` and print the statistics report. With `capture`, every
    /// simulation event of the run is also written as CSV tables under it.
    pub fn run_batch(&mut self, months: u32, capture: Option<&Path>, out: &mut impl Write) -> Result<()> {
        let recording = capture.map(|parent| RunCapture::start(parent, &format!("until_month_{months}")));
        self.sim.run_until(months);
        if let Some(recording) = recording {
            let run_dir = recording.run_dir().to_path_buf();
            let tables = recording
                .finish()
                .with_context(|| format!("writing capture to {}", run_dir.display()))?;
            writeln!(out, "Captured {tables} event tables in {}", run_dir.display())?;
        }
        out.write_all(statistics_report(&self.sim).as_bytes())?;
        Ok(())
    }

    /// Read commands until `quit` or end of input. Bad commands are reported
    /// and the loop carries on.
    pub fn run_interactive(&mut self, input: impl BufRead, mut out: impl Write) -> Result<()> {
        out.write_all(menu(&self.sim).as_bytes())?;
        write!(out, "> ")?;
        out.flush()?;

        for line in input.lines() {
            let line = line.context("reading command")?;
            let result = line.parse::<Command>().and_then(|cmd| self.execute(cmd, &mut out));
            match result {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => {
                    tracing::debug!(command = line.as_str(), error = %e, "command failed");
                    writeln!(out, "Error: {e:#}")?;
                }
            }
            write!(out, "> ")?;
            out.flush()?;
        }
        writeln!(out, "Goodbye!")?;
        Ok(())
    }
}

fn menu(sim: &Simulation) -> String {
    let status = if sim.is_paused() { "PAUSED" } else { "RUNNING" };
    format!(
        "\
Current month: {month} ({status})
Commands:
  step [n]                                 advance n months (default 1)
  run <month>                              advance until the given month
  pause | resume                           toggle the automatic driver
  stats                                    print statistics
  shock <town> <household> <kind> <amount> job_loss, medical or windfall
  export [file]                            write history as CSV (default {DEFAULT_EXPORT_FILE})
  reset                                    back to month 0
  help | quit
",
        month = sim.current_month(),
    )
}

/// Dollar amount with thousands separators, e.g. `-$12,345.68`.
pub fn money(value: f64) -> String {
    let cents = format!("{:.2}", value.abs());
    let (whole, frac) = cents.split_once('.').unwrap_or((&cents, "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if value < 0.0 && cents != "0.00" { "-" } else { "" };
    format!("{sign}${grouped}.{frac}")
}

fn inequality_label(gini: f64) -> &'static str {
    if gini > 0.5 {
        "high inequality"
    } else if gini > 0.3 {
        "moderate inequality"
    } else {
        "low inequality"
    }
}

pub fn statistics_report(sim: &Simulation) -> String {
    let stats = sim.global_statistics();
    let mut report = String::new();
    // Writing to a String cannot fail
    let _ = writeln!(report, "Statistics at month {}", stats.current_month);
    let _ = writeln!(report, "  Households: {}", stats.total_households);
    let _ = writeln!(report, "  Towns: {}", stats.total_towns);
    let _ = writeln!(report, "  Average wealth: {}", money(stats.average_wealth));
    let _ = writeln!(report, "  Total wealth: {}", money(stats.total_wealth));
    let _ = writeln!(
        report,
        "  Wealth range: {} to {}",
        money(stats.min_wealth),
        money(stats.max_wealth)
    );

    for town in sim.towns() {
        let dist = town.wealth_distribution();
        let gini = town.gini_coefficient();
        let _ = writeln!(report, "{}:", town.id());
        let _ = writeln!(report, "  Households: {}", dist.count);
        let _ = writeln!(report, "  Economic multiplier: {:.2}", town.economic_multiplier());
        let _ = writeln!(report, "  Cost of living: {:.2}", town.cost_of_living());
        if dist.count > 0 {
            let _ = writeln!(report, "  Average wealth: {}", money(dist.mean));
            let _ = writeln!(report, "  Median wealth: {}", money(dist.median));
            let _ = writeln!(report, "  Wealth range: {} to {}", money(dist.min), money(dist.max));
        }
        let _ = writeln!(report, "  Gini: {gini:.3} ({})", inequality_label(gini));
    }
    report
}
