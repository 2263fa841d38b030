//! Protagonist list input

use csv::{ReaderBuilder, Trim};
use masterforge_common::Author;
use std::io::Read;
use std::path::Path;
use tracing::warn;

/// Read `pid,name` rows. A leading `pid` header row, `#` comments and rows
/// without a PID are skipped; the name column is optional.
pub fn read_protagonists<R: Read>(reader: R) -> csv::Result<Vec<Author>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut authors = Vec::new();
    for (index, record) in rdr.records().enumerate() {
        let record = record?;
        let pid = record.get(0).unwrap_or_default();
        let name = record.get(1).unwrap_or_default();

        if index == 0 && pid.eq_ignore_ascii_case("pid") {
            continue;
        }
        if pid.is_empty() {
            warn!(record = index + 1, "Skipping row without PID");
            continue;
        }
        authors.push(Author::new(pid, name));
    }

    Ok(authors)
}

pub fn read_protagonists_file(path: &Path) -> anyhow::Result<Vec<Author>> {
    let file = std::fs::File::open(path)?;
    Ok(read_protagonists(file)?)
}
