use crate::commands::spinner;
use crate::employees::{write_employee_csv_file, EmployeeDataGenerator, RecordCount};
use anyhow::Result;
use colored::Colorize;
use std::path::Path;

pub async fn run(
    generator: &EmployeeDataGenerator,
    count: RecordCount,
    output: &Path,
) -> Result<()> {
    let pb = spinner(format!("Generating {} employee records...", count.get()));
    let result = generator.generate(count).await;
    pb.finish_and_clear();
    let generated = result?;

    write_employee_csv_file(output, &generated.rows)?;

    println!(
        "{}",
        format!(
            "✅ Wrote {} rows to {}",
            generated.rows.len(),
            output.display()
        )
        .bright_green()
    );
    let malformed = generated.rows.len() - generated.well_formed();
    if malformed > 0 {
        println!(
            "{}",
            format!("⚠️ {} row(s) do not have six fields", malformed).yellow()
        );
    }
    if generated.rows.len() != generated.requested as usize {
        println!(
            "{}",
            format!(
                "⚠️ Asked for {} records, model returned {}",
                generated.requested,
                generated.rows.len()
            )
            .yellow()
        );
    }
    Ok(())
}
