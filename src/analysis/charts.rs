//! Minimal SVG chart rendering for the report artifacts.
//!
//! Each emitter writes one self-contained SVG file. The charts carry the
//! data faithfully (scaled bars, positioned points, value labels) without
//! trying to be a plotting library: no axes ticks, no legends beyond the
//! inline labels the reports need.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

const WIDTH: f64 = 960.0;
const MARGIN: f64 = 60.0;
const ROW_HEIGHT: f64 = 28.0;

/// A seaborn-like categorical palette.
const PALETTE: &[&str] = &[
    "#4c72b0", "#dd8452", "#55a868", "#c44e52", "#8172b3", "#937860", "#da8bc3", "#8c8c8c",
    "#ccb974", "#64b5cd",
];

fn color_for(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

fn document(height: f64, title: &str, body: &str) -> String {
    format!(
        concat!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" ",
            "font-family=\"sans-serif\">\n",
            "<rect width=\"{w}\" height=\"{h}\" fill=\"white\"/>\n",
            "<text x=\"{cx}\" y=\"30\" font-size=\"18\" text-anchor=\"middle\">{title}</text>\n",
            "{body}</svg>\n"
        ),
        w = WIDTH,
        h = height,
        cx = WIDTH / 2.0,
        title = escape(title),
        body = body,
    )
}

/// Vertical bars, one per labelled value.
pub fn bar_chart(path: &Path, title: &str, values: &[(&str, f64)]) -> io::Result<()> {
    let height = 420.0;
    let plot_height = height - 2.0 * MARGIN;
    let max = values.iter().map(|(_, v)| *v).fold(0.0, f64::max).max(1.0);
    let slot = (WIDTH - 2.0 * MARGIN) / values.len().max(1) as f64;

    let mut body = String::new();
    for (i, (label, value)) in values.iter().enumerate() {
        let bar_height = plot_height * value / max;
        let x = MARGIN + slot * i as f64 + slot * 0.15;
        let y = MARGIN + plot_height - bar_height;
        let _ = writeln!(
            body,
            "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"{}\"/>",
            x,
            y,
            slot * 0.7,
            bar_height,
            color_for(i)
        );
        let _ = writeln!(
            body,
            "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"12\" text-anchor=\"middle\">{}</text>",
            x + slot * 0.35,
            y - 6.0,
            format_value(*value)
        );
        let _ = writeln!(
            body,
            "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"12\" text-anchor=\"middle\">{}</text>",
            x + slot * 0.35,
            MARGIN + plot_height + 18.0,
            escape(label)
        );
    }
    fs::write(path, document(height, title, &body))
}

/// Horizontal bars, one row per entry, annotated with a second label
/// (for example the party that tops a state).
pub fn hbar_chart(path: &Path, title: &str, rows: &[(String, f64, String)]) -> io::Result<()> {
    let height = (2.0 * MARGIN + ROW_HEIGHT * rows.len() as f64).max(160.0);
    let plot_width = WIDTH - 2.0 * MARGIN - 140.0;
    let max = rows.iter().map(|(_, v, _)| *v).fold(0.0, f64::max).max(1.0);

    let mut body = String::new();
    for (i, (label, value, annotation)) in rows.iter().enumerate() {
        let y = MARGIN + ROW_HEIGHT * i as f64;
        let bar_width = plot_width * value / max;
        let _ = writeln!(
            body,
            "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"12\" text-anchor=\"end\">{}</text>",
            MARGIN - 8.0,
            y + ROW_HEIGHT * 0.65,
            escape(label)
        );
        let _ = writeln!(
            body,
            "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"{}\"/>",
            MARGIN,
            y + ROW_HEIGHT * 0.15,
            bar_width,
            ROW_HEIGHT * 0.7,
            color_for(i)
        );
        let _ = writeln!(
            body,
            "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"12\">{} ({})</text>",
            MARGIN + bar_width + 6.0,
            y + ROW_HEIGHT * 0.65,
            escape(annotation),
            format_value(*value)
        );
    }
    fs::write(path, document(height, title, &body))
}

/// Grouped vertical bars: entries are (group, series, value). Groups keep
/// their input order; series are colored consistently across groups.
pub fn grouped_bar_chart(
    path: &Path,
    title: &str,
    entries: &[(String, String, f64)],
) -> io::Result<()> {
    let mut groups: Vec<&str> = Vec::new();
    let mut series: Vec<&str> = Vec::new();
    for (group, serie, _) in entries {
        if !groups.contains(&group.as_str()) {
            groups.push(group);
        }
        if !series.contains(&serie.as_str()) {
            series.push(serie);
        }
    }

    let height = 460.0;
    let plot_height = height - 2.0 * MARGIN - 20.0;
    let max = entries.iter().map(|(_, _, v)| *v).fold(0.0, f64::max).max(1.0);
    let group_slot = (WIDTH - 2.0 * MARGIN) / groups.len().max(1) as f64;
    let bar_width = (group_slot * 0.8 / series.len().max(1) as f64).max(1.0);

    let mut body = String::new();
    for (group, serie, value) in entries {
        let gi = groups.iter().position(|g| g == group).unwrap_or(0);
        let si = series.iter().position(|s| s == serie).unwrap_or(0);
        let bar_height = plot_height * value / max;
        let x = MARGIN + group_slot * gi as f64 + group_slot * 0.1 + bar_width * si as f64;
        let y = MARGIN + plot_height - bar_height;
        let _ = writeln!(
            body,
            "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"{}\"><title>{}: {}</title></rect>",
            x,
            y,
            bar_width * 0.9,
            bar_height,
            color_for(si),
            escape(serie),
            format_value(*value)
        );
    }
    for (gi, group) in groups.iter().enumerate() {
        let _ = writeln!(
            body,
            "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"12\" text-anchor=\"middle\">{}</text>",
            MARGIN + group_slot * (gi as f64 + 0.5),
            MARGIN + plot_height + 18.0,
            escape(group)
        );
    }
    for (si, serie) in series.iter().enumerate() {
        let y = MARGIN + 16.0 * si as f64;
        let _ = writeln!(
            body,
            "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"12\" height=\"12\" fill=\"{}\"/>",
            WIDTH - MARGIN - 120.0,
            y - 10.0,
            color_for(si)
        );
        let _ = writeln!(
            body,
            "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"12\">{}</text>",
            WIDTH - MARGIN - 102.0,
            y,
            escape(serie)
        );
    }
    fs::write(path, document(height, title, &body))
}

/// A scatter plot over numeric (x, y) pairs.
pub fn scatter_plot(
    path: &Path,
    title: &str,
    x_label: &str,
    y_label: &str,
    points: &[(f64, f64)],
) -> io::Result<()> {
    let height = 480.0;
    let plot_width = WIDTH - 2.0 * MARGIN;
    let plot_height = height - 2.0 * MARGIN;
    let max_x = points.iter().map(|(x, _)| *x).fold(0.0, f64::max).max(1.0);
    let max_y = points.iter().map(|(_, y)| *y).fold(0.0, f64::max).max(1.0);

    let mut body = String::new();
    let _ = writeln!(
        body,
        "<line x1=\"{m}\" y1=\"{b:.1}\" x2=\"{r:.1}\" y2=\"{b:.1}\" stroke=\"#444\"/>\n\
         <line x1=\"{m}\" y1=\"{t}\" x2=\"{m}\" y2=\"{b:.1}\" stroke=\"#444\"/>",
        m = MARGIN,
        t = MARGIN,
        r = MARGIN + plot_width,
        b = MARGIN + plot_height,
    );
    for (x, y) in points {
        let px = MARGIN + plot_width * x / max_x;
        let py = MARGIN + plot_height - plot_height * y / max_y;
        let _ = writeln!(
            body,
            "<circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"5\" fill=\"{}\" fill-opacity=\"0.7\"/>",
            px,
            py,
            color_for(0)
        );
    }
    let _ = writeln!(
        body,
        "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"13\" text-anchor=\"middle\">{}</text>",
        MARGIN + plot_width / 2.0,
        MARGIN + plot_height + 34.0,
        escape(x_label)
    );
    let _ = writeln!(
        body,
        "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"13\" text-anchor=\"middle\" \
         transform=\"rotate(-90 {x:.1} {y:.1})\">{label}</text>",
        MARGIN - 36.0,
        MARGIN + plot_height / 2.0,
        x = MARGIN - 36.0,
        y = MARGIN + plot_height / 2.0,
        label = escape(y_label)
    );
    fs::write(path, document(height, title, &body))
}

/// A word cloud: terms laid out on a grid, font size proportional to
/// frequency. Expects the terms ranked most frequent first.
pub fn word_cloud(path: &Path, title: &str, terms: &[(String, u64)]) -> io::Result<()> {
    let height = 420.0;
    let max = terms.iter().map(|(_, c)| *c).max().unwrap_or(1).max(1) as f64;
    let columns = 3usize;
    let cell_w = (WIDTH - 2.0 * MARGIN) / columns as f64;
    let cell_h = (height - 2.0 * MARGIN) / ((terms.len() + columns - 1) / columns).max(1) as f64;

    let mut body = String::new();
    for (i, (term, count)) in terms.iter().enumerate() {
        let size = 14.0 + 34.0 * (*count as f64 / max);
        let x = MARGIN + cell_w * (i % columns) as f64 + cell_w / 2.0;
        let y = MARGIN + cell_h * (i / columns) as f64 + cell_h / 2.0;
        let _ = writeln!(
            body,
            "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"{:.1}\" text-anchor=\"middle\" \
             fill=\"{}\">{}</text>",
            x,
            y,
            size,
            color_for(i),
            escape(term)
        );
    }
    fs::write(path, document(height, title, &body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_chart_scales_and_escapes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.svg");
        bar_chart(&path, "A & B", &[("Eleitos", 10.0), ("Não Eleitos", 2.5)]).unwrap();
        let svg = fs::read_to_string(&path).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("A &amp; B"));
        assert!(svg.contains("2.50"));
    }

    #[test]
    fn empty_data_still_renders_a_document() {
        let dir = tempfile::tempdir().unwrap();
        for (name, render) in [
            ("b.svg", bar_chart(&dir.path().join("b.svg"), "t", &[])),
            (
                "h.svg",
                hbar_chart(&dir.path().join("h.svg"), "t", &[]),
            ),
            (
                "g.svg",
                grouped_bar_chart(&dir.path().join("g.svg"), "t", &[]),
            ),
            (
                "s.svg",
                scatter_plot(&dir.path().join("s.svg"), "t", "x", "y", &[]),
            ),
            (
                "w.svg",
                word_cloud(&dir.path().join("w.svg"), "t", &[]),
            ),
        ] {
            render.unwrap();
            let svg = fs::read_to_string(dir.path().join(name)).unwrap();
            assert!(svg.starts_with("<svg"), "{name} is not an svg");
        }
    }

    #[test]
    fn grouped_bars_keep_series_colors_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grouped.svg");
        grouped_bar_chart(
            &path,
            "t",
            &[
                ("Sul".to_string(), "AAA".to_string(), 3.0),
                ("Sul".to_string(), "BBB".to_string(), 1.0),
                ("Norte".to_string(), "AAA".to_string(), 2.0),
            ],
        )
        .unwrap();
        let svg = fs::read_to_string(&path).unwrap();
        // AAA is the first series in both groups, so its color appears twice.
        assert_eq!(svg.matches(PALETTE[0]).count(), 3); // 2 bars + legend swatch
        assert!(svg.contains("Norte"));
    }

    #[test]
    fn word_cloud_sizes_follow_counts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloud.svg");
        word_cloud(
            &path,
            "t",
            &[("saude".to_string(), 10), ("escola".to_string(), 1)],
        )
        .unwrap();
        let svg = fs::read_to_string(&path).unwrap();
        assert!(svg.contains("font-size=\"48.0\"")); // 14 + 34 * 10/10
        assert!(svg.contains("saude"));
    }
}
