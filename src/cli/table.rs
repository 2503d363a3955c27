use ansi_term::Style;
use pad::{Alignment, PadStr};
use std::fmt::{Display, Error, Formatter};
use unicode_width::UnicodeWidthStr;

/// A table printed with its first row in bold and every column padded to its widest cell.
pub struct Table {
    alignments: Vec<Alignment>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Make a table from its header row. Headers starting with `>` are aligned to the right.
    pub fn new(headers: &[&str]) -> Table {
        let alignments = headers
            .iter()
            .map(|x| {
                if x.starts_with('>') {
                    Alignment::Right
                } else {
                    Alignment::Left
                }
            })
            .collect();
        let header = headers
            .iter()
            .map(|x| x.trim_start_matches('>').to_string())
            .collect();

        Table {
            alignments,
            rows: vec![header],
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        assert_eq!(row.len(), self.alignments.len(), "wrong number of cells");
        self.rows.push(row);
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        let widths = (0..self.alignments.len())
            .map(|i| {
                self.rows
                    .iter()
                    .map(|row| UnicodeWidthStr::width(row[i].as_str()))
                    .max()
                    .unwrap_or(0)
            })
            .collect::<Vec<_>>();

        for (i, row) in self.rows.iter().enumerate() {
            let line = row
                .iter()
                .zip(widths.iter().zip(self.alignments.iter()))
                .map(|(cell, (width, align))| cell.pad_to_width_with_alignment(*width, *align))
                .collect::<Vec<_>>()
                .join(" ");

            if i == 0 {
                writeln!(f, "{}", Style::new().bold().paint(line.trim_end()))?;
            } else {
                writeln!(f, "{}", line.trim_end())?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn columns_are_padded() {
        let mut table = Table::new(&["Name", ">Size"]);
        table.add_row(vec!["esp".to_string(), "600".to_string()]);
        table.add_row(vec!["root".to_string(), "1024".to_string()]);

        let s = table.to_string();
        let lines = s.lines().collect::<Vec<_>>();
        assert_eq!(lines[1], "esp   600");
        assert_eq!(lines[2], "root 1024");
    }
}
