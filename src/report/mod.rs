//! Reports
//!
//! Console tables for solved assignments and sensitivity sweeps.

use std::io;

use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{solvers::Assignment, sweep::SweepResult};

/// Errors that can occur when writing a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// IO error
    #[error("IO error")]
    IO,
}

/// Line-by-line breakdown of an [`Assignment`].
#[derive(Debug, Clone, Copy)]
pub struct AssignmentReport<'a> {
    assignment: &'a Assignment,
    currency: &'static Currency,
}

impl<'a> AssignmentReport<'a> {
    /// Report an assignment with amounts in `currency`.
    pub fn new(assignment: &'a Assignment, currency: &'static Currency) -> Self {
        Self {
            assignment,
            currency,
        }
    }

    /// Currency used for all monetary values.
    #[must_use]
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Writes the report.
    ///
    /// Items are grouped by vendor, followed by the access cost of every visited
    /// vendor and the item, access and overall totals.
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be written.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReportError> {
        let mut builder = Builder::default();

        builder.push_record(["Vendor", "Item", "Unit Price"]);

        let mut vendor_boundary_rows = Vec::new();

        for vendor in self.assignment.visited() {
            vendor_boundary_rows.push(builder.count_records());

            for line in self.assignment.lines_for(vendor) {
                builder.push_record([
                    line.vendor.clone(),
                    line.item.clone(),
                    self.money(line.unit_price).to_string(),
                ]);
            }
        }

        let mut table = builder.build();
        let mut theme = Theme::from(Style::modern_rounded());
        let separator = HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤'));

        theme.remove_horizontal_lines();
        theme.insert_horizontal_line(1, separator);

        for &row in &vendor_boundary_rows {
            if row > 1 {
                theme.insert_horizontal_line(row, separator);
            }
        }

        table.with(theme);
        table.modify(Rows::first(), Color::BOLD);
        table.modify(Columns::new(2..3), Alignment::right());

        writeln!(out, "\n{table}").map_err(|_err| ReportError::IO)?;

        for vendor in self.assignment.visited() {
            let access = self.assignment.access_cost(vendor).unwrap_or_default();

            writeln!(out, " Access ({vendor}): {}", self.money(access))
                .map_err(|_err| ReportError::IO)?;
        }

        writeln!(
            out,
            " Items: {}\n Access: {}\n \x1b[1mTotal: {}\x1b[0m\n",
            self.money(self.assignment.item_cost()),
            self.money(self.assignment.access_cost_total()),
            self.money(self.assignment.total_cost()),
        )
        .map_err(|_err| ReportError::IO)
    }

    fn money(&self, amount: Decimal) -> Money<'static, Currency> {
        Money::from_decimal(amount, self.currency)
    }
}

/// One row per swept value with the tipping point highlighted.
#[derive(Debug, Clone, Copy)]
pub struct SweepReport<'a> {
    result: &'a SweepResult,
    currency: &'static Currency,
}

impl<'a> SweepReport<'a> {
    /// Report a sweep with amounts in `currency`.
    pub fn new(result: &'a SweepResult, currency: &'static Currency) -> Self {
        Self { result, currency }
    }

    /// Writes the report.
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be written.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReportError> {
        let target = self.result.target_vendor();
        let tipping_index = self.result.tipping_index();

        let mut builder = Builder::default();

        builder.push_record([
            "Access Cost".to_string(),
            format!("Visits {target}"),
            "Total".to_string(),
            "Vendors".to_string(),
            String::new(),
        ]);

        for (idx, sample) in self.result.samples().iter().enumerate() {
            let marker = if Some(idx) == tipping_index {
                "◀ tipping point"
            } else {
                ""
            };

            builder.push_record([
                sample.value.to_string(),
                if sample.visited_target { "yes" } else { "no" }.to_string(),
                Money::from_decimal(sample.total_cost, self.currency).to_string(),
                sample
                    .visited
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
                marker.to_string(),
            ]);
        }

        let mut table = builder.build();

        table.with(Style::modern_rounded());
        table.modify(Rows::first(), Color::BOLD);
        table.modify(Columns::new(0..1), Alignment::right());
        table.modify(Columns::new(2..3), Alignment::right());

        if let Some(idx) = tipping_index {
            table.modify(Rows::one(idx + 1), Color::FG_YELLOW);
        }

        writeln!(out, "\n{table}").map_err(|_err| ReportError::IO)?;

        match self.result.tipping_point() {
            Some(value) => writeln!(
                out,
                " Tipping point: {target} visit decision changes at access cost {value}\n"
            ),
            None => writeln!(out, " No tipping point in the swept range\n"),
        }
        .map_err(|_err| ReportError::IO)
    }
}
