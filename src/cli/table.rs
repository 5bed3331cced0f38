//! Plain-text tables whose columns line up, and which stay usable with `awk`
//! when the header is dropped.

use serde::Serialize;
use std::fmt::{self, Write};

use crate::{die, ListingFormat};

pub(crate) struct Row {
    cells: Vec<String>,
}

impl Row {
    fn is_awk_safe(&self) -> bool {
        !self
            .cells
            .iter()
            .any(|cell| cell.contains(|c: char| c.is_whitespace()))
    }
}

impl From<Vec<String>> for Row {
    fn from(cells: Vec<String>) -> Self {
        Row { cells }
    }
}

impl From<Vec<&str>> for Row {
    fn from(value: Vec<&str>) -> Self {
        Row {
            cells: value.into_iter().map(str::to_owned).collect(),
        }
    }
}

pub(crate) struct Table {
    header: Row,
    body: Vec<Row>,
    print_header: bool,
}

impl Table {
    /// The header fixes the number of columns. Header cells must not contain
    /// whitespace.
    pub(crate) fn new(header: impl Into<Row>) -> Table {
        let header = header.into();

        assert!(
            header.is_awk_safe(),
            "table header is not awk safe, contains whitespace"
        );

        Table {
            header,
            body: Vec::new(),
            print_header: true,
        }
    }

    pub(crate) fn print_header(&mut self, print_header: bool) {
        self.print_header = print_header;
    }

    pub(crate) fn add_row(&mut self, row: impl Into<Row>) {
        let row = row.into();

        assert_eq!(
            row.cells.len(),
            self.header.cells.len(),
            "row width does not match the header"
        );

        self.body.push(row);
    }

    fn rows(&self) -> impl Iterator<Item = &Row> {
        let header = self.print_header.then_some(&self.header);

        header.into_iter().chain(self.body.iter())
    }

    fn column_widths(&self) -> Vec<usize> {
        let mut widths = vec![0usize; self.header.cells.len()];

        for row in self.rows() {
            for (width, cell) in widths.iter_mut().zip(&row.cells) {
                *width = (*width).max(cell.chars().count());
            }
        }

        widths
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.column_widths();

        for row in self.rows() {
            let last = row.cells.len().saturating_sub(1);

            for (i, cell) in row.cells.iter().enumerate() {
                if i == last {
                    // No trailing padding
                    f.write_str(cell)?;
                } else {
                    write!(f, "{:<width$}  ", cell, width = widths[i])?;
                }
            }

            f.write_char('\n')?;
        }

        Ok(())
    }
}

/// Prints `object` to stdout in the requested format.
pub(crate) fn format_output<O>(object: O, format: ListingFormat)
where
    O: Into<Table> + Serialize,
{
    match format {
        ListingFormat::Json => match serde_json::to_string_pretty(&object) {
            Ok(output) => println!("{}", output),
            Err(err) => die!("failed to serialize output: {}", err),
        },
        ListingFormat::Table => {
            let table: Table = object.into();

            print!("{}", table);
        }
        ListingFormat::HeaderlessTable => {
            let mut table: Table = object.into();

            table.print_header(false);

            print!("{}", table);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        let mut table = Table::new(vec!["MODEL", "PROVIDER"]);
        table.add_row(vec!["llama3.2:latest", "ollama"]);
        table.add_row(vec!["phi-3", "lmstudio"]);
        table
    }

    #[test]
    fn columns_are_aligned() {
        assert_eq!(
            table().to_string(),
            "MODEL            PROVIDER\n\
             llama3.2:latest  ollama\n\
             phi-3            lmstudio\n"
        );
    }

    #[test]
    fn header_can_be_hidden() {
        let mut table = table();
        table.print_header(false);

        assert_eq!(
            table.to_string(),
            "llama3.2:latest  ollama\n\
             phi-3            lmstudio\n"
        );
    }

    #[test]
    #[should_panic(expected = "awk safe")]
    fn header_cells_cannot_contain_spaces() {
        Table::new(vec!["BASE URL"]);
    }
}
