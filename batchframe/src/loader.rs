use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use snafu::{ResultExt, Snafu};

use crate::frame::{Frame, Value};
use crate::pool::{run_batch, Task};

/// File-name pattern matched when the caller does not supply one.
pub const DEFAULT_PATTERN: &str = "*.csv";

// Fixed external contract of the source exports: semicolon-delimited text in
// Latin-1. Files that deviate fail per file, never the whole load.
const FIELD_DELIMITER: u8 = b';';

#[derive(Debug, Snafu)]
pub enum LoadError {
    #[snafu(display("invalid file pattern {pattern}: {source}"))]
    BadPattern {
        source: glob::PatternError,
        pattern: String,
    },
    #[snafu(display("could not read {}: {source}", path.display()))]
    ReadingFile {
        source: std::io::Error,
        path: PathBuf,
    },
    #[snafu(display("could not parse {}: {source}", path.display()))]
    ParsingCsv { source: csv::Error, path: PathBuf },
}

/// Loads every file under `dir` matching `pattern` and concatenates them
/// into one [`Frame`].
///
/// Files are parsed in parallel, one task per file, and collected in
/// submission order, so the result is reproducible for a fixed directory
/// listing (the match list is sorted). A file that fails to read or parse is
/// logged and contributes an empty frame; the other shards still aggregate.
/// No match at all yields an empty frame, not an error. Every call re-reads
/// the directory; nothing is cached.
pub async fn load_folder(
    dir: &Path,
    pattern: &str,
    workers: usize,
) -> Result<Frame, LoadError> {
    // Only `pattern` may glob; metacharacters in the directory path itself
    // are literal.
    let escaped_dir = glob::Pattern::escape(&dir.to_string_lossy());
    let full_pattern = Path::new(&escaped_dir)
        .join(pattern)
        .to_string_lossy()
        .into_owned();
    let paths: Vec<PathBuf> = glob::glob(&full_pattern)
        .context(BadPatternSnafu {
            pattern: full_pattern.clone(),
        })?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("skipping unreadable entry under {}: {}", dir.display(), e);
                None
            }
        })
        .collect();

    if paths.is_empty() {
        warn!("no files matching {} under {}", pattern, dir.display());
        return Ok(Frame::empty());
    }
    debug!("loading {} files from {}", paths.len(), dir.display());

    let tasks: Vec<Task<Frame, LoadError>> = paths
        .into_iter()
        .map(|path| {
            let label = path.display().to_string();
            Task::new(label, move || parse_file(&path))
        })
        .collect();
    let outcomes = run_batch(tasks, workers, |_| {}).await;

    let mut shards = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome.result {
            Ok(frame) => shards.push(frame),
            Err(e) => {
                warn!("skipping shard {}: {}", outcome.label, e);
                shards.push(Frame::empty());
            }
        }
    }
    Ok(Frame::concat(shards))
}

fn parse_file(path: &Path) -> Result<Frame, LoadError> {
    let bytes = fs::read(path).context(ReadingFileSnafu { path })?;
    // Latin-1 maps every byte to the Unicode code point of the same value,
    // so decoding is a direct widening.
    let text: String = bytes.iter().map(|&b| b as char).collect();

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(FIELD_DELIMITER)
        .has_headers(true)
        .from_reader(text.as_bytes());
    let headers = reader.headers().context(ParsingCsvSnafu { path })?.clone();
    let mut frame = Frame::with_columns(headers.iter());
    for record in reader.records() {
        let record = record.context(ParsingCsvSnafu { path })?;
        frame.push_row(record.iter().map(parse_cell).collect());
    }
    debug!("parsed {}: {} rows", path.display(), frame.num_rows());
    Ok(frame)
}

fn parse_cell(cell: &str) -> Value {
    if cell.is_empty() {
        Value::Null
    } else if let Ok(n) = cell.parse::<f64>() {
        Value::Num(n)
    } else {
        Value::Str(cell.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, bytes: &[u8]) {
        let mut f = fs::File::create(dir.join(name)).unwrap();
        f.write_all(bytes).unwrap();
    }

    #[tokio::test]
    async fn shards_concatenate_with_column_union() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "part_1.csv", b"A;B\n1;x\n2;y\n3;z\n");
        write_file(dir.path(), "part_2.csv", b"A;C\n4;u\n5;v\n");
        let frame = load_folder(dir.path(), DEFAULT_PATTERN, 2).await.unwrap();
        assert_eq!(frame.columns(), &["A", "B", "C"]);
        assert_eq!(frame.num_rows(), 5);
        assert!(frame.row(0).value("C").is_null());
        assert!(frame.row(3).value("B").is_null());
        assert_eq!(frame.row(3).text("C"), Some("u"));
    }

    #[tokio::test]
    async fn latin1_bytes_decode_exactly() {
        let dir = tempfile::tempdir().unwrap();
        // "São;Paulo" with the Latin-1 encoding of ã (0xE3).
        write_file(dir.path(), "uf.csv", b"NM;SG\nS\xE3o Paulo;SP\n");
        let frame = load_folder(dir.path(), DEFAULT_PATTERN, 1).await.unwrap();
        assert_eq!(frame.row(0).text("NM"), Some("São Paulo"));
    }

    #[tokio::test]
    async fn directory_names_with_glob_metacharacters_are_literal() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("shards [2024]");
        fs::create_dir_all(&data).unwrap();
        write_file(&data, "part.csv", b"A;B\n1;2\n");
        let frame = load_folder(&data, DEFAULT_PATTERN, 1).await.unwrap();
        assert_eq!(frame.num_rows(), 1);
        assert_eq!(frame.row(0).number("A"), Some(1.0));
    }

    #[tokio::test]
    async fn empty_directory_yields_empty_frame() {
        let dir = tempfile::tempdir().unwrap();
        let frame = load_folder(dir.path(), DEFAULT_PATTERN, 2).await.unwrap();
        assert!(frame.is_empty());
    }

    #[tokio::test]
    async fn non_matching_pattern_yields_empty_frame() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "data.tsv", b"A\tB\n1\t2\n");
        let frame = load_folder(dir.path(), DEFAULT_PATTERN, 2).await.unwrap();
        assert!(frame.is_empty());
    }

    #[tokio::test]
    async fn ragged_shard_contributes_nothing_but_does_not_abort() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "good.csv", b"A;B\n1;2\n");
        write_file(dir.path(), "ragged.csv", b"A;B\n1;2;3;4\n5\n");
        let frame = load_folder(dir.path(), DEFAULT_PATTERN, 2).await.unwrap();
        assert_eq!(frame.num_rows(), 1);
        assert_eq!(frame.row(0).number("A"), Some(1.0));
    }

    #[tokio::test]
    async fn wrong_delimiter_degrades_to_one_column() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "comma.csv", b"A,B\n1,2\n3,4\n");
        let frame = load_folder(dir.path(), DEFAULT_PATTERN, 1).await.unwrap();
        // Silent per-file failure: everything lands in one mangled column.
        assert_eq!(frame.columns(), &["A,B"]);
        assert_eq!(frame.num_rows(), 2);
    }

    #[tokio::test]
    async fn numeric_and_empty_cells_are_typed() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "typed.csv", b"A;B;C\n1.5;;texto\n");
        let frame = load_folder(dir.path(), DEFAULT_PATTERN, 1).await.unwrap();
        assert_eq!(frame.row(0).number("A"), Some(1.5));
        assert!(frame.row(0).value("B").is_null());
        assert_eq!(frame.row(0).text("C"), Some("texto"));
    }
}
