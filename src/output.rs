use std::io::{self, Write};

use serde::Serialize;

use crate::domain::{DocKey, Row};

#[derive(Debug, Clone, Serialize)]
pub struct RowsResult<'a> {
    pub count: usize,
    pub rows: &'a [Row],
}

#[derive(Debug, Clone, Serialize)]
pub struct CountResult {
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveResult<'a> {
    pub id: &'a DocKey,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_rows(rows: &[Row]) -> io::Result<()> {
        Self::print_json(&RowsResult {
            count: rows.len(),
            rows,
        })
    }

    pub fn print_count(count: u64) -> io::Result<()> {
        Self::print_json(&CountResult { count })
    }

    pub fn print_saved(id: &DocKey) -> io::Result<()> {
        Self::print_json(&SaveResult { id })
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
