//! Spreadsheet export of a user's expenses.

use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};

use crate::analysis::category_totals;
use crate::schemas::Expense;

pub const CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const FILE_NAME: &str = "expense_report.xlsx";

const DETAILS_SHEET: &str = "Expense Details";
const SUMMARY_SHEET: &str = "Category Summary";

#[derive(Clone, Debug, PartialEq)]
pub struct ExpenseRow {
    pub amount: f64,
    pub category: String,
    pub description: Option<String>,
    pub split_with: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CategoryRow {
    pub category: String,
    pub total_spent: f64,
}

/// The two logical tables behind the report.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReportTables {
    pub expenses: Vec<ExpenseRow>,
    pub categories: Vec<CategoryRow>,
}

/// `"Bob (Unpaid), Alice (Paid)"`
fn split_summary(expense: &Expense) -> String {
    expense
        .split_details
        .iter()
        .map(|split| {
            let status = if split.has_paid { "Paid" } else { "Unpaid" };
            format!("{} ({})", split.name, status)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn build_tables(expenses: &[Expense]) -> ReportTables {
    let rows = expenses
        .iter()
        .map(|expense| ExpenseRow {
            amount: expense.amount,
            category: expense.category.clone(),
            description: expense.description.clone(),
            split_with: split_summary(expense),
        })
        .collect();
    let categories = category_totals(expenses)
        .iter()
        .map(|(category, total_spent)| CategoryRow {
            category: category.to_string(),
            total_spent,
        })
        .collect();
    ReportTables {
        expenses: rows,
        categories,
    }
}

fn write_header(worksheet: &mut Worksheet, columns: &[&str]) -> Result<(), XlsxError> {
    for (col, title) in columns.iter().enumerate() {
        worksheet.write_string(0, col as u16, *title)?;
    }
    Ok(())
}

/// Renders both tables into an in-memory XLSX workbook.
pub fn render_xlsx(tables: &ReportTables) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();

    let details = workbook.add_worksheet().set_name(DETAILS_SHEET)?;
    write_header(details, &["Amount", "Category", "Description", "SplitWith"])?;
    for (i, row) in tables.expenses.iter().enumerate() {
        let r = i as u32 + 1;
        details.write_number(r, 0, row.amount)?;
        details.write_string(r, 1, &row.category)?;
        if let Some(description) = &row.description {
            details.write_string(r, 2, description)?;
        }
        details.write_string(r, 3, &row.split_with)?;
    }

    let summary = workbook.add_worksheet().set_name(SUMMARY_SHEET)?;
    write_header(summary, &["Category", "TotalSpent"])?;
    for (i, row) in tables.categories.iter().enumerate() {
        let r = i as u32 + 1;
        summary.write_string(r, 0, &row.category)?;
        summary.write_number(r, 1, row.total_spent)?;
    }

    workbook.save_to_buffer()
}
