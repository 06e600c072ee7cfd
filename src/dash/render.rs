//! Fixed-width text tables for the terminal.

/// A small left-aligned table. Column widths follow the widest cell.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Table {
        Table {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row(&mut self, cells: Vec<String>) {
        debug_assert_eq!(cells.len(), self.headers.len());
        self.rows.push(cells);
    }

    pub fn print(&self, title: &str) {
        println!();
        println!("{}", title);
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.len()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if cell.len() > widths[i] {
                    widths[i] = cell.len();
                }
            }
        }
        println!("{}", format_row(&self.headers, &widths));
        let rule: usize = widths.iter().sum::<usize>() + 2 * (widths.len() - 1);
        println!("{}", "-".repeat(rule));
        for row in &self.rows {
            println!("{}", format_row(row, &widths));
        }
    }
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths.iter())
        .map(|(cell, w)| format!("{:<1$}", cell, w))
        .collect::<Vec<String>>()
        .join("  ")
}

/// Percentages and other ratios are shown with two decimals.
pub fn fmt_f64(x: f64) -> String {
    format!("{:.2}", x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_follow_the_widest_cell() {
        let row = format_row(
            &["a".to_string(), "bb".to_string()],
            &[3, 2],
        );
        assert_eq!(row, "a    bb");
    }

    #[test]
    fn fmt_rounds_to_two_decimals() {
        assert_eq!(fmt_f64(61.678), "61.68");
        assert_eq!(fmt_f64(0.0), "0.00");
    }
}
