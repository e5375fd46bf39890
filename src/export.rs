use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::display;
use crate::rankings::PlayerAggregate;

/// Write the ranked rows to an .xlsx workbook with a single "Rankings"
/// sheet. Cells reuse the display formatting, so the spreadsheet shows the
/// same numbers the terminal does.
pub fn export_rankings(path: &Path, rows: &[PlayerAggregate]) -> Result<()> {
    let mut sheet_rows = vec![display::HEADERS.map(str::to_string).to_vec()];
    sheet_rows.extend(display::format_rows(rows));

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Rankings")?;
        write_rows(sheet, &sheet_rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(())
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
