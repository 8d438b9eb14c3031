//! Human-readable text output

use super::ResultSet;
use crate::config::OutputFormat;
use crate::distributed::RunReport;
use std::io::{self, Write};
use std::path::Path;

/// Write one line per document: the path, then its counters
pub fn write_text<W: Write>(w: &mut W, results: &ResultSet<'_>) -> io::Result<()> {
    for (doc, vector) in results.rows() {
        write!(w, "{}", doc.name())?;
        for count in vector {
            write!(w, " {}", count)?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Print run results to console
pub fn print_summary(report: &RunReport, output_path: &Path, format: OutputFormat) {
    println!("═══════════════════════════════════════════════════════════");
    println!("                    RUN SUMMARY");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    println!("Elapsed Time: {:.3}s", report.elapsed.as_secs_f64());
    println!();

    println!("Documents:  {}", format_number(report.documents as u64));
    println!("Dictionary: {} words", format_number(report.dict_size as u64));
    println!("Workers:    {}", report.workers);
    println!();

    println!("Documents per worker:");
    for (i, assigned) in report.assigned_per_worker.iter().enumerate() {
        println!("  Worker {:>3}: {}", i + 1, format_number(*assigned as u64));
    }
    println!();

    if report.elapsed.as_secs_f64() > 0.0 {
        let rate = report.documents as f64 / report.elapsed.as_secs_f64();
        println!("Rate: {:.1} documents/s", rate);
        println!();
    }

    println!("Results: {} ({})", output_path.display(), format);
    println!("═══════════════════════════════════════════════════════════");
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();

    for (count, c) in s.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result.chars().rev().collect()
}
