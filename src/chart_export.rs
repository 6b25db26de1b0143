//! Chart export to PNG (plotters bitmap) and EPS (minimal PostScript, no deps).

use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::parse_hex;
use crate::view_model::{format_si, ChartKind, ChartView};

/// Export format for chart: PNG or EPS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartExportFormat {
    #[default]
    Png,
    Eps,
}

impl ChartExportFormat {
    pub const ALL: [Self; 2] = [Self::Png, Self::Eps];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Eps => "eps",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "PNG",
            Self::Eps => "EPS",
        }
    }

    /// Case-insensitive lookup by extension ("png", "eps").
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|f| f.extension() == name)
    }
}

/// Escape a string for PostScript ( and ) and \.
fn ps_escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// "Nice" tick values in [min, max] with roughly max_ticks steps.
fn nice_ticks(min: f64, max: f64, max_ticks: usize) -> Vec<f64> {
    let range = if max > min { max - min } else { 1.0 };
    if max_ticks == 0 {
        return vec![min];
    }
    let raw_step = range / max_ticks as f64;
    let mag = 10.0_f64.powf(raw_step.log10().floor());
    let norm = if mag > 0.0 { raw_step / mag } else { raw_step };
    let step = if norm <= 1.0 {
        mag
    } else if norm <= 2.0 {
        2.0 * mag
    } else if norm <= 5.0 {
        5.0 * mag
    } else {
        10.0 * mag
    };
    let step = step.max(f64::EPSILON);
    let mut ticks = Vec::new();
    let mut v = (min / step).floor() * step;
    while v <= max + step * 0.001 && ticks.len() <= max_ticks + 2 {
        if v >= min - step * 0.001 {
            ticks.push(v);
        }
        v += step;
    }
    if ticks.is_empty() {
        ticks.push(min);
    }
    ticks
}

/// Upper bound of the value axis, with headroom for bar labels.
fn value_axis_max(view: &ChartView) -> f64 {
    let max = view.max_value();
    if max > 0.0 {
        max * 1.1
    } else {
        1.0
    }
}

fn rgb(hex: &str) -> (u8, u8, u8) {
    parse_hex(hex).unwrap_or((0x18, 0x79, 0xF4))
}

fn series_color(view: &ChartView, series: usize, index: usize) -> (u8, u8, u8) {
    view.series
        .get(series)
        .and_then(|s| s.colors.get(index).or_else(|| s.colors.first()))
        .map(|hex| rgb(hex))
        .unwrap_or((0x18, 0x79, 0xF4))
}

fn ensure_exportable(view: &ChartView) -> Result<()> {
    if view.is_empty() {
        return Err(eyre!("No data to export"));
    }
    Ok(())
}

/// Write one chart in the given format.
pub fn write_chart(
    path: &Path,
    view: &ChartView,
    format: ChartExportFormat,
    size: (u32, u32),
) -> Result<()> {
    match format {
        ChartExportFormat::Png => write_chart_png(path, view, size),
        ChartExportFormat::Eps => write_chart_eps(path, view),
    }
}

/// Writes every non-empty chart as `<slug>.<ext>` under `dir` and returns the written paths.
/// Empty charts are skipped; an error is returned only if nothing could be written.
pub fn export_page(
    dir: &Path,
    charts: &[&ChartView],
    format: ChartExportFormat,
    size: (u32, u32),
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .map_err(|e| eyre!("Cannot create export directory {}: {}", dir.display(), e))?;

    let mut written = Vec::new();
    for view in charts {
        if view.is_empty() {
            tracing::warn!(chart = view.slug, "skipping empty chart");
            continue;
        }
        let path = dir.join(format!("{}.{}", view.slug, format.extension()));
        write_chart(&path, view, format, size)?;
        tracing::info!(path = %path.display(), format = format.as_str(), "chart exported");
        written.push(path);
    }

    if written.is_empty() {
        return Err(eyre!("No data to export"));
    }
    Ok(written)
}

/// Write chart to EPS (Encapsulated PostScript). No external dependencies.
pub fn write_chart_eps(path: &Path, view: &ChartView) -> Result<()> {
    ensure_exportable(view)?;

    const W: f64 = 480.0;
    const H: f64 = 320.0;
    const MARGIN_RIGHT: f64 = 30.0;
    const MARGIN_BOTTOM: f64 = 50.0;
    const MARGIN_TOP: f64 = 40.0;
    const CHAR_W: f64 = 5.0;

    let horizontal = view.kind == ChartKind::HorizontalBar;
    let margin_left = if horizontal {
        let longest = view.categories.iter().map(|c| c.len()).max().unwrap_or(0);
        (longest as f64 * CHAR_W + 16.0).clamp(60.0, 160.0)
    } else {
        60.0
    };
    let plot_w = W - margin_left - MARGIN_RIGHT;
    let plot_h = H - MARGIN_BOTTOM - MARGIN_TOP;

    let n = view.categories.len() as f64;
    let v_max = value_axis_max(view);
    let ticks = nice_ticks(0.0, v_max, 6);

    let mut f = File::create(path)?;

    writeln!(f, "%!PS-Adobe-3.0 EPSF-3.0")?;
    writeln!(f, "%%BoundingBox: 0 0 {} {}", W as i32, H as i32)?;
    writeln!(f, "%%Title: {}", view.title)?;
    writeln!(f, "%%Creator: shopdash")?;
    writeln!(f, "%%EndComments")?;
    writeln!(f, "gsave")?;

    // Title
    writeln!(f, "0 setgray")?;
    writeln!(f, "/Helvetica-Bold findfont 12 scalefont setfont")?;
    let title_w = view.title.len() as f64 * 6.0;
    writeln!(
        f,
        "{} {} moveto ({}) show",
        ((W - title_w) / 2.0).max(4.0),
        H - 20.0,
        ps_escape(&view.title)
    )?;

    // Value grid
    writeln!(f, "0.9 setgray")?;
    writeln!(f, "0.5 setlinewidth")?;
    for &t in &ticks {
        if horizontal {
            let px = margin_left + t / v_max * plot_w;
            writeln!(f, "{} {} moveto 0 {} rlineto stroke", px, MARGIN_BOTTOM, plot_h)?;
        } else {
            let py = MARGIN_BOTTOM + t / v_max * plot_h;
            writeln!(f, "{} {} moveto {} 0 rlineto stroke", margin_left, py, plot_w)?;
        }
    }

    // Axis box
    writeln!(f, "1 setlinewidth")?;
    writeln!(f, "0 setgray")?;
    writeln!(f, "{} {} moveto", margin_left, MARGIN_BOTTOM)?;
    writeln!(f, "{} 0 rlineto", plot_w)?;
    writeln!(f, "0 {} rlineto", plot_h)?;
    writeln!(f, "{} 0 rlineto", -plot_w)?;
    writeln!(f, "closepath stroke")?;

    // Tick labels on the value axis, category labels on the other
    writeln!(f, "/Helvetica findfont 8 scalefont setfont")?;
    for &t in &ticks {
        let s = format_si(t, 3);
        let label_w = s.len() as f64 * CHAR_W;
        if horizontal {
            let px = margin_left + t / v_max * plot_w;
            writeln!(
                f,
                "{} {} moveto ({}) show",
                px - label_w / 2.0,
                MARGIN_BOTTOM - 12.0,
                ps_escape(&s)
            )?;
        } else {
            let py = MARGIN_BOTTOM + t / v_max * plot_h;
            writeln!(
                f,
                "{} {} moveto ({}) show",
                (margin_left - label_w - 4.0).max(2.0),
                py - 3.0,
                ps_escape(&s)
            )?;
        }
    }
    for (i, category) in view.categories.iter().enumerate() {
        let label_w = category.len() as f64 * CHAR_W;
        if horizontal {
            let slot = plot_h / n;
            let py = MARGIN_BOTTOM + plot_h - (i as f64 + 0.5) * slot;
            writeln!(
                f,
                "{} {} moveto ({}) show",
                (margin_left - label_w - 4.0).max(2.0),
                py - 3.0,
                ps_escape(category)
            )?;
        } else {
            let slot = plot_w / n;
            let px = margin_left + (i as f64 + 0.5) * slot;
            writeln!(
                f,
                "{} {} moveto ({}) show",
                px - label_w / 2.0,
                MARGIN_BOTTOM - 12.0,
                ps_escape(category)
            )?;
        }
    }

    // Axis titles
    writeln!(f, "/Helvetica findfont 9 scalefont setfont")?;
    let (bottom_label, left_label) = if horizontal {
        (&view.y_label, &view.x_label)
    } else {
        (&view.x_label, &view.y_label)
    };
    if !bottom_label.is_empty() {
        let w = bottom_label.len() as f64 * CHAR_W;
        writeln!(
            f,
            "{} {} moveto ({}) show",
            margin_left + (plot_w - w) / 2.0,
            MARGIN_BOTTOM - 28.0,
            ps_escape(bottom_label)
        )?;
    }
    if !left_label.is_empty() && !horizontal {
        let w = left_label.len() as f64 * CHAR_W;
        writeln!(f, "gsave")?;
        writeln!(f, "12 {} translate 90 rotate", MARGIN_BOTTOM + plot_h / 2.0)?;
        writeln!(f, "{} 0 moveto ({}) show", -w / 2.0, ps_escape(left_label))?;
        writeln!(f, "grestore")?;
    }

    // Series
    let series_count = view.series.len().max(1) as f64;
    for (si, series) in view.series.iter().enumerate() {
        match view.kind {
            ChartKind::Line => {
                let slot = plot_w / n;
                let (r, g, b) = series_color(view, si, 0);
                writeln!(f, "{} {} {} setrgbcolor", r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0)?;
                writeln!(f, "1.5 setlinewidth")?;
                for (i, v) in series.values.iter().enumerate() {
                    let px = margin_left + (i as f64 + 0.5) * slot;
                    let py = MARGIN_BOTTOM + v / v_max * plot_h;
                    let op = if i == 0 { "moveto" } else { "lineto" };
                    writeln!(f, "{} {} {}", px, py, op)?;
                }
                writeln!(f, "stroke")?;
            }
            ChartKind::HorizontalBar => {
                let slot = plot_h / n;
                let bar_h = slot * 0.7;
                for (i, v) in series.values.iter().enumerate() {
                    let (r, g, b) = series_color(view, si, i);
                    writeln!(f, "{} {} {} setrgbcolor", r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0)?;
                    let py = MARGIN_BOTTOM + plot_h - (i as f64 + 0.5) * slot - bar_h / 2.0;
                    writeln!(f, "{} {} {} {} rectfill", margin_left, py, v / v_max * plot_w, bar_h)?;
                }
            }
            ChartKind::Bar | ChartKind::Share | ChartKind::GroupedBar => {
                let slot = plot_w / n;
                let bar_w = slot * 0.7 / series_count;
                for (i, v) in series.values.iter().enumerate() {
                    let (r, g, b) = series_color(view, si, i);
                    writeln!(f, "{} {} {} setrgbcolor", r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0)?;
                    let px = margin_left + i as f64 * slot + slot * 0.15 + si as f64 * bar_w;
                    writeln!(f, "{} {} {} {} rectfill", px, MARGIN_BOTTOM, bar_w, v / v_max * plot_h)?;
                }
            }
        }
    }

    // Bar annotations for single-series charts
    if view.series.len() == 1 && view.kind != ChartKind::Line {
        writeln!(f, "0 setgray")?;
        writeln!(f, "/Helvetica findfont 7 scalefont setfont")?;
        for (i, (label, v)) in view
            .value_labels(0)
            .iter()
            .zip(&view.series[0].values)
            .enumerate()
        {
            if horizontal {
                let slot = plot_h / n;
                let py = MARGIN_BOTTOM + plot_h - (i as f64 + 0.5) * slot;
                writeln!(
                    f,
                    "{} {} moveto ({}) show",
                    margin_left + v / v_max * plot_w + 3.0,
                    py - 2.0,
                    ps_escape(label)
                )?;
            } else {
                let slot = plot_w / n;
                let px = margin_left + (i as f64 + 0.5) * slot - label.len() as f64 * 2.0;
                writeln!(
                    f,
                    "{} {} moveto ({}) show",
                    px,
                    MARGIN_BOTTOM + v / v_max * plot_h + 3.0,
                    ps_escape(label)
                )?;
            }
        }
    }

    // Legend for multi-series charts
    if view.series.len() > 1 {
        writeln!(f, "/Helvetica findfont 8 scalefont setfont")?;
        let mut lx = margin_left;
        for (si, series) in view.series.iter().enumerate() {
            let (r, g, b) = series_color(view, si, 0);
            writeln!(f, "{} {} {} setrgbcolor", r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0)?;
            writeln!(f, "{} {} 8 8 rectfill", lx, H - MARGIN_TOP + 6.0)?;
            writeln!(f, "0 setgray")?;
            writeln!(f, "{} {} moveto ({}) show", lx + 11.0, H - MARGIN_TOP + 7.0, ps_escape(&series.name))?;
            lx += 20.0 + series.name.len() as f64 * CHAR_W;
        }
    }

    writeln!(f, "grestore")?;
    writeln!(f, "%%EOF")?;
    f.sync_all()?;
    Ok(())
}

/// Write chart to PNG using plotters bitmap backend. Size is (width, height) in pixels.
pub fn write_chart_png(path: &Path, view: &ChartView, (width, height): (u32, u32)) -> Result<()> {
    use plotters::prelude::*;

    ensure_exportable(view)?;

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let n = view.categories.len();
    let c_min = -0.5;
    let c_max = n as f64 - 0.5;
    let v_max = value_axis_max(view);
    let categories = view.categories.clone();
    let category_label = move |v: &f64| {
        let idx = v.round();
        if (v - idx).abs() < 0.25 && idx >= 0.0 {
            categories.get(idx as usize).cloned().unwrap_or_default()
        } else {
            String::new()
        }
    };
    let color_at = |series: usize, index: usize| {
        let (r, g, b) = series_color(view, series, index);
        RGBColor(r, g, b)
    };

    if view.kind == ChartKind::HorizontalBar {
        let label_area = view
            .categories
            .iter()
            .map(|c| c.len() as u32 * 7)
            .max()
            .unwrap_or(0)
            .clamp(60, 200);
        let mut chart = ChartBuilder::on(&root)
            .caption(view.title.as_str(), ("sans-serif", 20))
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(label_area)
            .build_cartesian_2d(0.0..v_max, c_min..c_max)?;

        // First category at the top
        let top_down = |v: &f64| category_label(&(n as f64 - 1.0 - v));
        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(n)
            .x_desc(view.y_label.as_str())
            .y_label_formatter(&top_down)
            .x_label_formatter(&|v| format_si(*v, 3))
            .draw()?;

        for (si, series) in view.series.iter().enumerate() {
            chart.draw_series(series.values.iter().enumerate().map(|(i, v)| {
                let y = (n - 1 - i) as f64;
                Rectangle::new([(0.0, y - 0.35), (*v, y + 0.35)], color_at(si, i).filled())
            }))?;
        }
        root.present()?;
        return Ok(());
    }

    let mut chart = ChartBuilder::on(&root)
        .caption(view.title.as_str(), ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(c_min..c_max, 0.0..v_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_desc(view.x_label.as_str())
        .y_desc(view.y_label.as_str())
        .x_label_formatter(&category_label)
        .y_label_formatter(&|v| format_si(*v, 3))
        .draw()?;

    let series_count = view.series.len().max(1) as f64;
    for (si, series) in view.series.iter().enumerate() {
        match view.kind {
            ChartKind::Line => {
                let color = color_at(si, 0);
                chart.draw_series(LineSeries::new(
                    series.values.iter().enumerate().map(|(i, v)| (i as f64, *v)),
                    color.stroke_width(2),
                ))?;
                chart.draw_series(series.values.iter().enumerate().map(|(i, v)| {
                    Circle::new((i as f64, *v), 3, color.filled())
                }))?;
            }
            _ => {
                let bar_w = 0.7 / series_count;
                let drawn = chart.draw_series(series.values.iter().enumerate().map(|(i, v)| {
                    let x0 = i as f64 - 0.35 + si as f64 * bar_w;
                    Rectangle::new([(x0, 0.0), (x0 + bar_w, *v)], color_at(si, i).filled())
                }))?;
                if view.series.len() > 1 {
                    let color = color_at(si, 0);
                    drawn
                        .label(series.name.as_str())
                        .legend(move |(x, y)| Rectangle::new([(x, y - 4), (x + 10, y + 4)], color.filled()));
                }
            }
        }
    }

    if view.series.len() > 1 {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view_model::SeriesView;
    use std::io::Read;

    fn sample_view(kind: ChartKind) -> ChartView {
        ChartView {
            slug: "sales_per_mall",
            title: "Total Sales For Each Shopping Malls".to_string(),
            kind,
            x_label: "Shopping Mall".to_string(),
            y_label: "Total Sales In Liras".to_string(),
            categories: vec!["Kanyon".to_string(), "Zorlu (Center)".to_string()],
            series: vec![SeriesView {
                name: "Total Sales In Liras".to_string(),
                values: vec![1500.0, 320.0],
                colors: vec!["#1879F4", "#1879F4"],
            }],
        }
    }

    fn read(path: &Path) -> String {
        let mut content = String::new();
        std::fs::File::open(path)
            .expect("open")
            .read_to_string(&mut content)
            .expect("read");
        content
    }

    /// EPS output has the header, axis box, escaped labels, titles and filled bars.
    #[test]
    fn eps_contains_desired_elements() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("chart.eps");
        write_chart_eps(&path, &sample_view(ChartKind::Bar)).expect("write_chart_eps");

        let content = read(&path);
        assert!(content.contains("%!PS-Adobe-3.0 EPSF-3.0"));
        assert!(content.contains("%%BoundingBox:"));
        assert!(content.contains("%%Creator: shopdash"));
        assert!(content.contains("closepath stroke"), "axis box");
        assert!(content.contains("(Total Sales For Each Shopping Malls) show"));
        assert!(content.contains("(Kanyon) show"));
        assert!(content.contains("(Zorlu \\(Center\\)) show"), "escaped label");
        assert!(content.contains("(1.5k) show"), "bar annotation");
        assert!(content.contains("rectfill"));
        assert!(content.trim_end().ends_with("%%EOF"));
    }

    #[test]
    fn eps_line_chart_strokes_a_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("line.eps");
        write_chart_eps(&path, &sample_view(ChartKind::Line)).expect("write");
        let content = read(&path);
        assert!(content.contains("moveto"));
        assert!(content.contains("lineto"));
    }

    #[test]
    fn empty_view_is_not_exported() {
        let mut view = sample_view(ChartKind::Bar);
        view.categories.clear();
        view.series[0].values.clear();
        let dir = tempfile::tempdir().expect("temp dir");

        let err = write_chart_eps(&dir.path().join("a.eps"), &view).unwrap_err();
        assert!(err.to_string().contains("No data"));
        assert!(write_chart_png(&dir.path().join("a.png"), &view, (640, 480)).is_err());
        assert!(export_page(dir.path(), &[&view], ChartExportFormat::Eps, (640, 480)).is_err());
    }

    #[test]
    fn png_written_for_every_chart_kind() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut grouped = sample_view(ChartKind::GroupedBar);
        grouped.series.push(SeriesView {
            name: "Male".to_string(),
            values: vec![40.0, 75.0],
            colors: vec!["#FFED8F", "#FFED8F"],
        });
        let views = [
            sample_view(ChartKind::Bar),
            sample_view(ChartKind::HorizontalBar),
            sample_view(ChartKind::Line),
            sample_view(ChartKind::Share),
            grouped,
        ];

        for (i, view) in views.iter().enumerate() {
            let path = dir.path().join(format!("chart_{}.png", i));
            write_chart_png(&path, view, (640, 480)).expect("write_chart_png");
            let bytes = std::fs::read(&path).expect("read png");
            assert!(bytes.len() > 8, "{:?} png is empty", view.kind);
            assert_eq!(&bytes[1..4], b"PNG");
        }
    }

    #[test]
    fn export_page_names_files_by_slug() {
        let dir = tempfile::tempdir().expect("temp dir");
        let bar = sample_view(ChartKind::Bar);
        let mut horizontal = sample_view(ChartKind::HorizontalBar);
        horizontal.slug = "quantity_per_category";

        let written = export_page(
            dir.path(),
            &[&bar, &horizontal],
            ChartExportFormat::Eps,
            (640, 480),
        )
        .expect("export");
        assert_eq!(
            written,
            vec![
                dir.path().join("sales_per_mall.eps"),
                dir.path().join("quantity_per_category.eps"),
            ]
        );
        assert!(written.iter().all(|p| p.exists()));
    }

    #[test]
    fn format_lookup() {
        assert_eq!(ChartExportFormat::from_name("PNG"), Some(ChartExportFormat::Png));
        assert_eq!(ChartExportFormat::from_name("eps"), Some(ChartExportFormat::Eps));
        assert_eq!(ChartExportFormat::from_name("svg"), None);
    }
}
