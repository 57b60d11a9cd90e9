//! # Period Subcommand
//!
//! Shows how a display month/year maps to the stored date range, which is
//! the first thing to check when an archive looks empty.

use anyhow::Result;
use billbook_core::{ExportPeriod, YearCalendar, BUDDHIST_ERA_OFFSET};
use clap::Args;
use serde::Serialize;

/// Arguments for `billbook period`.
#[derive(Args, Debug)]
pub struct PeriodArgs {
    /// Month, 1-12.
    #[arg(long)]
    pub month: u32,

    /// Display year (Buddhist Era by default).
    #[arg(long)]
    pub year: i32,

    /// Display year minus stored year.
    #[arg(long, env = "YEAR_OFFSET", default_value_t = BUDDHIST_ERA_OFFSET)]
    pub year_offset: i32,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct PeriodReport {
    label: String,
    display: String,
    storage_year: i32,
    start: String,
    end: String,
    days: u32,
}

impl PeriodReport {
    fn new(period: &ExportPeriod) -> Self {
        Self {
            label: period.label(),
            display: period.display_label(),
            storage_year: period.storage_year(),
            start: period.start().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            end: period.end().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            days: period.days(),
        }
    }
}

/// Execute `billbook period`.
pub fn run_period(args: &PeriodArgs) -> Result<u8> {
    let period = ExportPeriod::resolve(args.month, args.year, YearCalendar::with_offset(args.year_offset))?;
    let report = PeriodReport::new(&period);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{} ({})", report.display, report.label);
        println!("  stored year: {}", report.storage_year);
        println!("  from:        {}", report.start);
        println!("  to:          {}", report.end);
        println!("  days:        {}", report.days);
    }
    Ok(0)
}
