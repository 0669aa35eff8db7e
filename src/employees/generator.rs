use crate::employees::csv_writer::{parse_rows, EMPLOYEE_CSV_HEADER};
use crate::employees::GeneratorError;
use crate::providers::traits::CompletionProvider;
use crate::providers::utils::strip_code_fence;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const MIN_RECORDS: u32 = 1;
pub const MAX_RECORDS: u32 = 100;
pub const DEFAULT_RECORDS: u32 = 20;

pub const EMPLOYEE_TEMPLATE: &str = "
You are creating test data for an employee database.
Generate information for {num_employees} employees with the following fields, separated by commas:

Employee Id, Name, Department, Basic Salary, Incentives, Date of Joining (YYYY-MM-DD)

Make sure the data is diverse and realistic.
";

/// Number of records to generate, always within 1..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct RecordCount(u32);

impl RecordCount {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for RecordCount {
    fn default() -> Self {
        Self(DEFAULT_RECORDS)
    }
}

impl TryFrom<u32> for RecordCount {
    type Error = GeneratorError;

    fn try_from(count: u32) -> Result<Self, Self::Error> {
        if (MIN_RECORDS..=MAX_RECORDS).contains(&count) {
            Ok(Self(count))
        } else {
            Err(GeneratorError::CountOutOfRange(count))
        }
    }
}

impl From<RecordCount> for u32 {
    fn from(count: RecordCount) -> Self {
        count.0
    }
}

pub fn build_employee_prompt(count: RecordCount) -> String {
    EMPLOYEE_TEMPLATE.replace("{num_employees}", &count.get().to_string())
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedEmployees {
    pub requested: u32,
    pub raw: String,
    pub rows: Vec<Vec<String>>,
}

impl GeneratedEmployees {
    /// Rows with exactly the six expected fields.
    pub fn well_formed(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| row.len() == EMPLOYEE_CSV_HEADER.len())
            .count()
    }
}

pub struct EmployeeDataGenerator {
    llm: Arc<dyn CompletionProvider>,
}

impl EmployeeDataGenerator {
    pub fn new(llm: Arc<dyn CompletionProvider>) -> Self {
        Self { llm }
    }

    pub async fn generate(&self, count: RecordCount) -> Result<GeneratedEmployees> {
        let prompt = build_employee_prompt(count);
        log::info!("Generating {} employee records with {}", count.get(), self.llm.model_name());

        let raw = self
            .llm
            .complete(&prompt)
            .await
            .context("Failed to generate employee data")?;
        let rows = parse_rows(strip_code_fence(&raw));

        Ok(GeneratedEmployees {
            requested: count.get(),
            raw,
            rows,
        })
    }
}
