use crate::commands::spinner;
use crate::document::{is_pdf, PdfDocument};
use crate::invoice::{InvoiceExtraction, InvoiceExtractor, INVOICE_FIELDS};
use anyhow::{bail, Result};
use colored::Colorize;
use std::path::PathBuf;

pub async fn run(extractor: &InvoiceExtractor, files: &[PathBuf], json: bool) -> Result<()> {
    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        if !is_pdf(&path.to_string_lossy()) {
            bail!("{} is not a PDF file", path.display());
        }
        documents.push(PdfDocument::open(path).await?);
    }

    let mut extractions = Vec::with_capacity(documents.len());
    for document in &documents {
        let pb = spinner(format!("Extracting {}...", document.name));
        let result = extractor.extract(document).await;
        pb.finish_and_clear();
        extractions.push(result?);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&extractions)?);
    } else {
        for extraction in &extractions {
            print_extraction(extraction);
        }
        println!("{}", format!("✅ Extracted {} invoice(s)", extractions.len()).bright_green());
    }
    Ok(())
}

fn print_extraction(extraction: &InvoiceExtraction) {
    println!(
        "\n📄 {} ({} page{})",
        extraction.file_name.bright_yellow(),
        extraction.pages,
        if extraction.pages == 1 { "" } else { "s" }
    );

    match &extraction.fields {
        Some(record) => {
            for field in INVOICE_FIELDS {
                let value = record.get(field).unwrap_or("-");
                println!("  {:<14} {}", format!("{}:", field).bold(), value);
            }
            for (key, value) in &record.fields {
                if !INVOICE_FIELDS.iter().any(|f| f.eq_ignore_ascii_case(key)) {
                    println!("  {:<14} {}", format!("{}:", key).bold(), value);
                }
            }
        }
        None => {
            println!("  {}", "Model reply was not JSON, raw output:".yellow());
            println!("{}", extraction.raw);
        }
    }
}
