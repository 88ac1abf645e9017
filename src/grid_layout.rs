use anyhow::Result;
use std::io::Write;

//------------------------------------------

/// Collects rows of text cells and renders them as right aligned
/// columns.
pub struct GridLayout {
    grid: Vec<Vec<String>>,
    current: Vec<String>,
    max_columns: usize,
}

impl GridLayout {
    pub fn new_with_size(rows: usize, columns: usize) -> GridLayout {
        GridLayout {
            grid: Vec::with_capacity(rows),
            current: Vec::with_capacity(columns),
            max_columns: columns,
        }
    }

    pub fn field(&mut self, s: String) {
        self.current.push(s)
    }

    pub fn new_row(&mut self) {
        if self.current.len() > self.max_columns {
            self.max_columns = self.current.len();
        }
        let last = std::mem::replace(&mut self.current, Vec::with_capacity(self.max_columns));
        self.grid.push(last);
    }

    fn calc_field_widths(&self) -> Vec<usize> {
        let mut widths = vec![0; self.max_columns];
        for row in self.grid.iter() {
            for (col, width) in row.iter().zip(widths.iter_mut()) {
                *width = std::cmp::max(*width, col.len());
            }
        }
        widths
    }

    // right align the string
    fn push_justified(buf: &mut String, s: &str, width: usize) {
        for _ in s.len()..width {
            buf.push(' ');
        }
        buf.push_str(s);
        buf.push(' ');
    }

    pub fn render(&self, w: &mut dyn Write) -> Result<()> {
        let widths = self.calc_field_widths();

        for row in self.grid.iter() {
            let mut line = String::new();
            for (col, width) in row.iter().zip(widths.iter()) {
                Self::push_justified(&mut line, col.as_str(), *width);
            }
            line.push('\n');
            w.write_all(line.as_bytes())?;
        }

        Ok(())
    }
}

//------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn render(grid: &GridLayout) -> String {
        let mut out = Vec::new();
        grid.render(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn columns_are_right_aligned() {
        let mut grid = GridLayout::new_with_size(2, 2);
        grid.field("DEV".to_string());
        grid.field("MAPPED".to_string());
        grid.new_row();
        grid.field("1".to_string());
        grid.field("192KiB".to_string());
        grid.new_row();

        assert_eq!(render(&grid), "DEV MAPPED \n  1 192KiB \n");
    }

    #[test]
    fn empty_grid_renders_nothing() {
        let grid = GridLayout::new_with_size(0, 0);
        assert_eq!(render(&grid), "");
    }
}

//------------------------------------------
