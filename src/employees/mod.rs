pub mod csv_writer;
pub mod generator;

use thiserror::Error;

pub use csv_writer::{employee_csv_bytes, parse_rows, write_employee_csv_file, EMPLOYEE_CSV_HEADER};
pub use generator::{EmployeeDataGenerator, GeneratedEmployees, RecordCount};

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Number of employees must be between 1 and 100, got {0}")]
    CountOutOfRange(u32),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
