use crate::employees::GeneratorError;
use std::io::Write;
use std::path::Path;

pub const EMPLOYEE_CSV_HEADER: [&str; 6] = [
    "Employee Id",
    "Name",
    "Department",
    "Basic Salary",
    "Incentives",
    "Date of Joining",
];

/// Splits model output into rows: one per non-blank line, fields split on
/// every comma exactly as generated.
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    text.trim()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.trim_end_matches('\r').split(',').map(str::to_string).collect())
        .collect()
}

/// Writes the header, then one record per row. Rows with the wrong field
/// count are written unchanged and logged.
pub fn write_employee_csv<W: Write>(writer: W, rows: &[Vec<String>]) -> Result<(), GeneratorError> {
    let mut csv_writer = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    csv_writer.write_record(EMPLOYEE_CSV_HEADER)?;

    for (line, row) in rows.iter().enumerate() {
        if row.len() != EMPLOYEE_CSV_HEADER.len() {
            log::warn!(
                "Generated row {} has {} fields, expected {}: {:?}",
                line + 1,
                row.len(),
                EMPLOYEE_CSV_HEADER.len(),
                row.join(",")
            );
        }
        csv_writer.write_record(row)?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn write_employee_csv_file(path: &Path, rows: &[Vec<String>]) -> Result<(), GeneratorError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_employee_csv(file, rows)?;
    log::info!("Wrote {} employee rows to {}", rows.len(), path.display());
    Ok(())
}

pub fn employee_csv_bytes(rows: &[Vec<String>]) -> Result<Vec<u8>, GeneratorError> {
    let mut buffer = Vec::new();
    write_employee_csv(&mut buffer, rows)?;
    Ok(buffer)
}
