//! Writers for the batch result: CSV, JSON and a terminal table.

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use std::io::Write;

use crate::models::OutputRecord;
use crate::utils::{csv_escape, truncate_at_word};

/// Write records as CSV with a header row
pub fn write_csv<W: Write>(records: &[OutputRecord], mut out: W) -> std::io::Result<()> {
    writeln!(out, "{}", OutputRecord::CSV_HEADERS.join(","))?;
    for record in records {
        let line: Vec<String> = record.csv_fields().iter().map(|f| csv_escape(f)).collect();
        writeln!(out, "{}", line.join(","))?;
    }
    out.flush()
}

/// Write records as a pretty-printed JSON array
pub fn write_json<W: Write>(records: &[OutputRecord], mut out: W) -> std::io::Result<()> {
    serde_json::to_writer_pretty(&mut out, records)?;
    writeln!(out)?;
    out.flush()
}

/// Render a compact summary table
pub fn render_table(records: &[OutputRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["File", "Title", "Author", "Journal", "Found", "Score"]);

    for record in records {
        let found = if record.found {
            Cell::new("Yes").fg(Color::Green)
        } else {
            Cell::new("No").fg(Color::Red)
        };

        table.add_row(vec![
            Cell::new(&record.filename).add_attribute(Attribute::Bold),
            Cell::new(truncate_at_word(&record.title, 50)),
            Cell::new(truncate_at_word(&record.author, 30)),
            Cell::new(truncate_at_word(&record.journal, 30)),
            found,
            Cell::new(format!("{:.2}", record.score)),
        ]);
    }

    table
}
