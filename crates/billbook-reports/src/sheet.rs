//! Shared worksheet plumbing: formats, title block, header row, money cells.

use chrono::Datelike;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{DocProperties, ExcelDateTime, Format, FormatBorder, Workbook, Worksheet, XlsxError};

use crate::ReportContext;

const MONEY_FORMAT: &str = "#,##0.00";

/// Cell formats used by every report.
pub(crate) struct Formats {
    pub title: Format,
    pub header: Format,
    pub money: Format,
    pub total_label: Format,
    pub total_money: Format,
}

impl Formats {
    pub fn new() -> Self {
        Self {
            title: Format::new().set_bold().set_font_size(14),
            header: Format::new().set_bold().set_border_bottom(FormatBorder::Thin),
            money: Format::new().set_num_format(MONEY_FORMAT),
            total_label: Format::new().set_bold().set_border_top(FormatBorder::Thin),
            total_money: Format::new()
                .set_bold()
                .set_num_format(MONEY_FORMAT)
                .set_border_top(FormatBorder::Thin),
        }
    }
}

/// New workbook whose document properties depend only on the context.
///
/// The creation date is pinned to the first day of the period so the same
/// inputs always produce the same document metadata.
pub(crate) fn workbook(ctx: &ReportContext, title: &str) -> Result<Workbook, XlsxError> {
    let start = ctx.period.start_date();
    let created = ExcelDateTime::from_ymd(
        u16::try_from(start.year()).unwrap_or(1900),
        start.month() as u8,
        1,
    )?;
    let properties = DocProperties::new()
        .set_title(title)
        .set_company(&ctx.company_name)
        .set_creation_datetime(&created);

    let mut workbook = Workbook::new();
    workbook.set_properties(&properties);
    Ok(workbook)
}

/// Sequential row writer over one worksheet.
pub(crate) struct SheetWriter<'a> {
    sheet: &'a mut Worksheet,
    formats: &'a Formats,
    row: u32,
}

impl<'a> SheetWriter<'a> {
    pub fn new(sheet: &'a mut Worksheet, formats: &'a Formats) -> Self {
        Self {
            sheet,
            formats,
            row: 0,
        }
    }

    /// Title, company line, period line, blank spacer.
    pub fn title_block(&mut self, title: &str, ctx: &ReportContext) -> Result<(), XlsxError> {
        self.sheet
            .write_string_with_format(self.row, 0, title, &self.formats.title)?;
        self.row += 1;
        let company = match &ctx.company_tax_id {
            Some(tax_id) => format!("{} (Tax ID {tax_id})", ctx.company_name),
            None => ctx.company_name.clone(),
        };
        self.sheet.write_string(self.row, 0, company)?;
        self.row += 1;
        self.sheet
            .write_string(self.row, 0, format!("Period: {}", ctx.period.display_label()))?;
        self.row += 2;
        Ok(())
    }

    /// Bold header row; also sets column widths.
    pub fn header(&mut self, columns: &[(&str, f64)]) -> Result<(), XlsxError> {
        for (col, (name, width)) in columns.iter().enumerate() {
            let col = col as u16;
            self.sheet
                .write_string_with_format(self.row, col, *name, &self.formats.header)?;
            self.sheet.set_column_width(col, *width)?;
        }
        self.row += 1;
        Ok(())
    }

    /// Section heading in the first column.
    pub fn section(&mut self, text: &str) -> Result<(), XlsxError> {
        self.sheet
            .write_string_with_format(self.row, 0, text, &self.formats.header)?;
        self.row += 1;
        Ok(())
    }

    pub fn text(&mut self, col: u16, value: &str) -> Result<(), XlsxError> {
        if !value.is_empty() {
            self.sheet.write_string(self.row, col, value)?;
        }
        Ok(())
    }

    pub fn number(&mut self, col: u16, value: f64) -> Result<(), XlsxError> {
        self.sheet.write_number(self.row, col, value)?;
        Ok(())
    }

    pub fn money(&mut self, col: u16, value: Decimal) -> Result<(), XlsxError> {
        self.sheet
            .write_number_with_format(self.row, col, to_f64(value), &self.formats.money)?;
        Ok(())
    }

    pub fn total_label(&mut self, col: u16, value: &str) -> Result<(), XlsxError> {
        self.sheet
            .write_string_with_format(self.row, col, value, &self.formats.total_label)?;
        Ok(())
    }

    pub fn total_money(&mut self, col: u16, value: Decimal) -> Result<(), XlsxError> {
        self.sheet
            .write_number_with_format(self.row, col, to_f64(value), &self.formats.total_money)?;
        Ok(())
    }

    /// Advance to the next row.
    pub fn next_row(&mut self) {
        self.row += 1;
    }

    /// Leave one empty row.
    pub fn gap(&mut self) {
        self.row += 1;
    }
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}
