use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use snafu::{ResultExt, Snafu};

/// A single cell of a [`Frame`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Num(f64),
    Null,
}

static NULL: Value = Value::Null;

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn number(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// Tolerant numeric read: accepts numbers and numeric text, including
    /// the comma decimal separator used by the source region.
    pub fn decimal(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            Value::Str(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
            Value::Null => None,
        }
    }

    /// Text form used for CSV output and grouping keys. Whole numbers are
    /// printed without a fractional part, nulls as the empty string.
    pub fn render(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Num(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Value::Num(n) => n.to_string(),
            Value::Null => String::new(),
        }
    }
}

#[derive(Debug, Snafu)]
pub enum FrameError {
    #[snafu(display("could not write {}: {source}", path.display()))]
    WritingCsv { source: csv::Error, path: PathBuf },
}

/// An in-memory table: an ordered collection of rows over a named column
/// list. Rows may hold nulls where a source file did not carry a column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// A borrowed view over one row of a [`Frame`].
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    frame: &'a Frame,
    idx: usize,
}

impl<'a> Row<'a> {
    /// The cell under `column`, or null when the column does not exist.
    pub fn value(&self, column: &str) -> &'a Value {
        match self.frame.column_index(column) {
            Some(c) => &self.frame.rows[self.idx][c],
            None => &NULL,
        }
    }

    pub fn text(&self, column: &str) -> Option<&'a str> {
        self.value(column).text()
    }

    pub fn number(&self, column: &str) -> Option<f64> {
        self.value(column).number()
    }
}

impl Frame {
    pub fn empty() -> Frame {
        Frame::default()
    }

    pub fn with_columns<I, S>(columns: I) -> Frame
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Frame {
            columns: columns.into_iter().map(|c| c.into()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends a row, padding short rows with nulls and dropping any excess
    /// cells beyond the column count.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn row(&self, idx: usize) -> Row<'_> {
        Row { frame: self, idx }
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        (0..self.rows.len()).map(move |idx| Row { frame: self, idx })
    }

    /// Concatenates frames into one. The output column set is the union of
    /// all input column sets in first-seen order; cells for columns a source
    /// frame does not carry become null. Row order within each source is
    /// preserved and sources are appended in submission order, so no row is
    /// ever lost and the result is reproducible for a fixed input order.
    pub fn concat<I>(frames: I) -> Frame
    where
        I: IntoIterator<Item = Frame>,
    {
        let frames: Vec<Frame> = frames.into_iter().collect();
        let mut columns: Vec<String> = Vec::new();
        for frame in &frames {
            for column in &frame.columns {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }
        let mut out = Frame {
            columns: columns.clone(),
            rows: Vec::new(),
        };
        for frame in frames {
            let mapping: Vec<Option<usize>> =
                columns.iter().map(|c| frame.column_index(c)).collect();
            for row in frame.rows {
                let merged: Vec<Value> = mapping
                    .iter()
                    .map(|m| m.map(|i| row[i].clone()).unwrap_or(Value::Null))
                    .collect();
                out.rows.push(merged);
            }
        }
        out
    }

    pub fn filter<F>(&self, keep: F) -> Frame
    where
        F: Fn(Row<'_>) -> bool,
    {
        let mut out = Frame {
            columns: self.columns.clone(),
            rows: Vec::new(),
        };
        for idx in 0..self.rows.len() {
            if keep(self.row(idx)) {
                out.rows.push(self.rows[idx].clone());
            }
        }
        out
    }

    /// A copy of the frame with one derived column appended.
    pub fn add_column<F>(&self, name: &str, derive: F) -> Frame
    where
        F: Fn(Row<'_>) -> Value,
    {
        let mut out = Frame {
            columns: self.columns.clone(),
            rows: self.rows.clone(),
        };
        out.columns.push(name.to_string());
        for idx in 0..out.rows.len() {
            let value = derive(self.row(idx));
            out.rows[idx].push(value);
        }
        out
    }

    /// Mean of the tolerant numeric reads of a column; `None` when no cell
    /// parses as a number.
    pub fn mean(&self, column: &str) -> Option<f64> {
        let idx = self.column_index(column)?;
        let values: Vec<f64> = self.rows.iter().filter_map(|r| r[idx].decimal()).collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }

    /// Row counts grouped by the given key columns. Rows with a null in any
    /// key column are dropped from the grouping. The output is sorted by the
    /// key columns so it does not depend on hash iteration order.
    pub fn group_count(&self, keys: &[&str], count_name: &str) -> Frame {
        let mut counts: BTreeMap<Vec<String>, u64> = BTreeMap::new();
        'rows: for row in self.rows() {
            let mut key = Vec::with_capacity(keys.len());
            for k in keys {
                let v = row.value(k);
                if v.is_null() {
                    continue 'rows;
                }
                key.push(v.render());
            }
            *counts.entry(key).or_insert(0) += 1;
        }
        let mut out = Frame::with_columns(
            keys.iter()
                .map(|k| k.to_string())
                .chain(std::iter::once(count_name.to_string())),
        );
        for (key, n) in counts {
            let mut row: Vec<Value> = key.into_iter().map(Value::Str).collect();
            row.push(Value::Num(n as f64));
            out.rows.push(row);
        }
        out
    }

    /// For each distinct value of `group_col`, keeps the row with the
    /// largest `value_col`. The first row wins on ties. Output rows are
    /// sorted by group key.
    pub fn top_by_group(&self, group_col: &str, value_col: &str) -> Frame {
        let mut best: BTreeMap<String, (f64, Vec<Value>)> = BTreeMap::new();
        for idx in 0..self.rows.len() {
            let row = self.row(idx);
            let key = row.value(group_col);
            if key.is_null() {
                continue;
            }
            let value = match row.value(value_col).decimal() {
                Some(v) => v,
                None => continue,
            };
            let key = key.render();
            match best.get(&key) {
                Some((current, _)) if *current >= value => {}
                _ => {
                    best.insert(key, (value, self.rows[idx].clone()));
                }
            }
        }
        let mut out = Frame {
            columns: self.columns.clone(),
            rows: Vec::new(),
        };
        for (_, (_, row)) in best {
            out.rows.push(row);
        }
        out
    }

    /// Inner join on a single key column. The output carries all of this
    /// frame's columns plus the other frame's columns that are neither the
    /// key nor already present. Row order follows this frame.
    pub fn inner_join(&self, other: &Frame, key: &str) -> Frame {
        let self_key = match self.column_index(key) {
            Some(i) => i,
            None => return Frame::empty(),
        };
        let other_key = match other.column_index(key) {
            Some(i) => i,
            None => return Frame::empty(),
        };
        let extra: Vec<usize> = other
            .columns
            .iter()
            .enumerate()
            .filter(|(i, name)| *i != other_key && !self.columns.contains(name))
            .map(|(i, _)| i)
            .collect();

        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, row) in other.rows.iter().enumerate() {
            if !row[other_key].is_null() {
                index.entry(row[other_key].render()).or_default().push(i);
            }
        }

        let mut columns = self.columns.clone();
        columns.extend(extra.iter().map(|&i| other.columns[i].clone()));
        let mut out = Frame {
            columns,
            rows: Vec::new(),
        };
        for row in &self.rows {
            if row[self_key].is_null() {
                continue;
            }
            if let Some(matches) = index.get(&row[self_key].render()) {
                for &m in matches {
                    let mut merged = row.clone();
                    merged.extend(extra.iter().map(|&i| other.rows[m][i].clone()));
                    out.rows.push(merged);
                }
            }
        }
        out
    }

    /// A copy sorted by one column: numeric cells first in numeric order,
    /// then non-numeric cells in lexical order of their text form. Unknown
    /// columns leave the order untouched.
    pub fn sort_by(&self, column: &str) -> Frame {
        let mut out = self.clone();
        if let Some(idx) = self.column_index(column) {
            out.rows.sort_by(|a, b| compare_values(&a[idx], &b[idx]));
        }
        out
    }

    /// The distinct non-null values of one column in sorted order. An
    /// unknown column yields nothing.
    pub fn unique(&self, column: &str) -> Vec<String> {
        let idx = match self.column_index(column) {
            Some(i) => i,
            None => return Vec::new(),
        };
        let mut values: Vec<String> = self
            .rows
            .iter()
            .filter(|r| !r[idx].is_null())
            .map(|r| r[idx].render())
            .collect();
        values.sort();
        values.dedup();
        values
    }

    /// Writes the frame as comma-delimited UTF-8 text with a header row.
    pub fn write_csv(&self, path: &Path) -> Result<(), FrameError> {
        let mut writer = csv::Writer::from_path(path).context(WritingCsvSnafu { path })?;
        writer
            .write_record(&self.columns)
            .context(WritingCsvSnafu { path })?;
        for row in &self.rows {
            writer
                .write_record(row.iter().map(Value::render))
                .context(WritingCsvSnafu { path })?;
        }
        writer
            .flush()
            .map_err(csv::Error::from)
            .context(WritingCsvSnafu { path })?;
        Ok(())
    }
}

// Total order over cells: numerics before non-numerics, numerics by
// `total_cmp`, the rest by their text form. Mixing the two classes into one
// lexical comparison would not be transitive.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a.decimal(), b.decimal()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.render().cmp(&b.render()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_ab() -> Frame {
        let mut f = Frame::with_columns(["A", "B"]);
        f.push_row(vec![Value::Str("a1".into()), Value::Num(1.0)]);
        f.push_row(vec![Value::Str("a2".into()), Value::Num(2.0)]);
        f.push_row(vec![Value::Str("a3".into()), Value::Num(3.0)]);
        f
    }

    fn frame_ac() -> Frame {
        let mut f = Frame::with_columns(["A", "C"]);
        f.push_row(vec![Value::Str("a4".into()), Value::Str("c1".into())]);
        f.push_row(vec![Value::Str("a5".into()), Value::Str("c2".into())]);
        f
    }

    #[test]
    fn concat_takes_column_union_and_fills_nulls() {
        let merged = Frame::concat(vec![frame_ab(), frame_ac()]);
        assert_eq!(merged.columns(), &["A", "B", "C"]);
        assert_eq!(merged.num_rows(), 5);
        // Rows from the first frame carry no C, rows from the second no B.
        assert!(merged.row(0).value("C").is_null());
        assert!(merged.row(4).value("B").is_null());
        assert_eq!(merged.row(4).text("C"), Some("c2"));
        assert_eq!(merged.row(1).number("B"), Some(2.0));
    }

    #[test]
    fn concat_of_empty_inputs_is_empty() {
        let merged = Frame::concat(vec![Frame::empty(), Frame::empty()]);
        assert!(merged.is_empty());
        assert!(merged.columns().is_empty());
    }

    #[test]
    fn push_row_pads_and_truncates() {
        let mut f = Frame::with_columns(["A", "B"]);
        f.push_row(vec![Value::Num(1.0)]);
        f.push_row(vec![Value::Num(1.0), Value::Num(2.0), Value::Num(3.0)]);
        assert!(f.row(0).value("B").is_null());
        assert_eq!(f.row(1).number("B"), Some(2.0));
    }

    #[test]
    fn group_count_sorts_keys_and_drops_null_keys() {
        let mut f = Frame::with_columns(["UF", "P"]);
        f.push_row(vec![Value::Str("SP".into()), Value::Str("x".into())]);
        f.push_row(vec![Value::Str("BA".into()), Value::Str("x".into())]);
        f.push_row(vec![Value::Str("SP".into()), Value::Str("x".into())]);
        f.push_row(vec![Value::Null, Value::Str("x".into())]);
        let counts = f.group_count(&["UF"], "N");
        assert_eq!(counts.num_rows(), 2);
        assert_eq!(counts.row(0).text("UF"), Some("BA"));
        assert_eq!(counts.row(0).number("N"), Some(1.0));
        assert_eq!(counts.row(1).text("UF"), Some("SP"));
        assert_eq!(counts.row(1).number("N"), Some(2.0));
    }

    #[test]
    fn top_by_group_keeps_first_max() {
        let mut f = Frame::with_columns(["UF", "P", "N"]);
        f.push_row(vec![
            Value::Str("SP".into()),
            Value::Str("p1".into()),
            Value::Num(5.0),
        ]);
        f.push_row(vec![
            Value::Str("SP".into()),
            Value::Str("p2".into()),
            Value::Num(5.0),
        ]);
        f.push_row(vec![
            Value::Str("BA".into()),
            Value::Str("p3".into()),
            Value::Num(1.0),
        ]);
        f.push_row(vec![
            Value::Str("BA".into()),
            Value::Str("p4".into()),
            Value::Num(9.0),
        ]);
        let top = f.top_by_group("UF", "N");
        assert_eq!(top.num_rows(), 2);
        assert_eq!(top.row(0).text("P"), Some("p4"));
        assert_eq!(top.row(1).text("P"), Some("p1"));
    }

    #[test]
    fn inner_join_matches_on_rendered_key() {
        let mut left = Frame::with_columns(["SQ", "NAME"]);
        left.push_row(vec![Value::Num(10.0), Value::Str("one".into())]);
        left.push_row(vec![Value::Num(20.0), Value::Str("two".into())]);
        left.push_row(vec![Value::Num(30.0), Value::Str("three".into())]);
        let mut right = Frame::with_columns(["SQ", "N"]);
        right.push_row(vec![Value::Str("20".into()), Value::Num(7.0)]);
        right.push_row(vec![Value::Str("30".into()), Value::Num(8.0)]);
        let joined = left.inner_join(&right, "SQ");
        assert_eq!(joined.columns(), &["SQ", "NAME", "N"]);
        assert_eq!(joined.num_rows(), 2);
        assert_eq!(joined.row(0).text("NAME"), Some("two"));
        assert_eq!(joined.row(0).number("N"), Some(7.0));
    }

    #[test]
    fn mean_reads_comma_decimals() {
        let mut f = Frame::with_columns(["V"]);
        f.push_row(vec![Value::Str("10,5".into())]);
        f.push_row(vec![Value::Num(9.5)]);
        f.push_row(vec![Value::Str("not a number".into())]);
        f.push_row(vec![Value::Null]);
        assert_eq!(f.mean("V"), Some(10.0));
        assert_eq!(f.mean("MISSING"), None);
    }

    #[test]
    fn render_prints_whole_numbers_without_fraction() {
        assert_eq!(Value::Num(5.0).render(), "5");
        assert_eq!(Value::Num(5.25).render(), "5.25");
        assert_eq!(Value::Null.render(), "");
        assert_eq!(Value::Str("x".into()).render(), "x");
    }

    #[test]
    fn sort_by_is_numeric_when_possible() {
        let mut f = Frame::with_columns(["N"]);
        f.push_row(vec![Value::Num(10.0)]);
        f.push_row(vec![Value::Num(2.0)]);
        f.push_row(vec![Value::Num(33.0)]);
        let sorted = f.sort_by("N");
        assert_eq!(sorted.row(0).number("N"), Some(2.0));
        assert_eq!(sorted.row(2).number("N"), Some(33.0));
    }

    #[test]
    fn sort_by_mixed_column_is_order_independent() {
        let cells = [Value::Num(9.0), Value::Num(10.0), Value::Str("1x".into())];
        // Any input permutation must yield the same sorted output: numbers
        // in numeric order, then the non-numeric text.
        let permutations = [[0, 1, 2], [2, 0, 1], [1, 2, 0], [2, 1, 0]];
        for perm in permutations {
            let mut f = Frame::with_columns(["N"]);
            for &i in &perm {
                f.push_row(vec![cells[i].clone()]);
            }
            let sorted = f.sort_by("N");
            let rendered: Vec<String> =
                sorted.rows().map(|r| r.value("N").render()).collect();
            assert_eq!(rendered, ["9", "10", "1x"], "input order {perm:?}");
        }
    }

    #[test]
    fn unique_sorts_and_drops_nulls() {
        let mut f = Frame::with_columns(["UF"]);
        for v in [
            Value::Str("SP".into()),
            Value::Str("BA".into()),
            Value::Null,
            Value::Str("SP".into()),
            Value::Str("AC".into()),
        ] {
            f.push_row(vec![v]);
        }
        assert_eq!(f.unique("UF"), vec!["AC", "BA", "SP"]);
        assert!(f.unique("MISSING").is_empty());
    }

    #[test]
    fn write_csv_emits_header_and_rendered_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut f = Frame::with_columns(["A", "B"]);
        f.push_row(vec![Value::Str("x".into()), Value::Num(3.0)]);
        f.push_row(vec![Value::Null, Value::Num(4.5)]);
        f.write_csv(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "A,B\nx,3\n,4.5\n");
    }
}
