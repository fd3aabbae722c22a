use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
pub mod charts;
pub mod error;
pub mod plot;

use charts::{
    ChartStyle, Marker, LABEL_PT, PACKETS_PER_SLOT, PORTS, THROUGHPUT_PERCENT, TICK_PT, TITLE_PT,
};
pub use error::PlotError;

pub const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");
pub const DEFAULT_CSV: &str = "throughput_vs_ports.csv";

const REQUIRED_COLUMNS: [&str; 3] = [PORTS, PACKETS_PER_SLOT, THROUGHPUT_PERCENT];

#[derive(Debug, Deserialize)]
struct Row {
    ports: u32,
    avg_packets_per_slot: f64,
    avg_throughput_percent: f64,
}

/// The main struct for the throughput measurements,
/// one entry per simulated port count,
/// with the metric columns stored by name next to the ports.
#[derive(Debug, Clone)]
pub struct PortThroughput {
    pub ports: Vec<u32>,
    pub columns: BTreeMap<String, Vec<f64>>,
}

impl PortThroughput {
    pub fn new(capacity: usize) -> PortThroughput {
        let ports: Vec<u32> = Vec::with_capacity(capacity);
        let mut columns: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        columns.insert(String::from(PACKETS_PER_SLOT), Vec::with_capacity(capacity));
        columns.insert(String::from(THROUGHPUT_PERCENT), Vec::with_capacity(capacity));
        PortThroughput { ports, columns }
    }

    /// Init a PortThroughput from csv.
    /// The header must name the three columns, in any order,
    /// extra columns are ignored.
    /// Fails on the first value that does not parse,
    /// and when the ports are not strictly increasing.
    pub fn from_csv<P>(fin: P) -> Result<PortThroughput, PlotError>
    where
        P: AsRef<Path>,
    {
        let fin = fin.as_ref();
        let file = File::open(fin).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PlotError::NotFound(fin.to_path_buf()),
            _ => PlotError::Read {
                path: fin.to_path_buf(),
                source: e,
            },
        })?;
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers = reader.headers().map_err(|e| csv_error(fin, e))?;
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| !headers.iter().any(|h| h == **c))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(PlotError::format(
                fin,
                format!("missing column(s): {}", missing.join(", ")),
            ));
        }

        let mut pt = PortThroughput::new(16);
        for (i, result) in reader.deserialize::<Row>().enumerate() {
            let row = result.map_err(|e| csv_error(fin, e))?;
            let nrow = i + 1;
            debug!("row {}: {:?}", nrow, row);
            if row.ports == 0 {
                return Err(PlotError::format(
                    fin,
                    format!("row {}: ports must be positive", nrow),
                ));
            }
            if let Some(&previous) = pt.ports.last() {
                if row.ports <= previous {
                    return Err(PlotError::format(
                        fin,
                        format!(
                            "row {}: ports are not strictly increasing, {} after {}",
                            nrow, row.ports, previous
                        ),
                    ));
                }
            }
            for (name, value) in [
                (PACKETS_PER_SLOT, row.avg_packets_per_slot),
                (THROUGHPUT_PERCENT, row.avg_throughput_percent),
            ] {
                if !value.is_finite() {
                    return Err(PlotError::format(
                        fin,
                        format!("row {}: {} is not a finite number", nrow, name),
                    ));
                }
            }
            pt.ports.push(row.ports);
            pt.push_metric(PACKETS_PER_SLOT, row.avg_packets_per_slot);
            pt.push_metric(THROUGHPUT_PERCENT, row.avg_throughput_percent);
        }
        if pt.ports.is_empty() {
            return Err(PlotError::format(fin, "no data rows"));
        }
        info!("read {} rows from {}", pt.ports.len(), fin.display());
        Ok(pt)
    }

    fn push_metric(&mut self, name: &str, value: f64) {
        self.columns
            .entry(String::from(name))
            .or_insert_with(Vec::new)
            .push(value);
    }

    /// the values of the named metric column
    pub fn metric(&self, name: &str) -> Result<&[f64], PlotError> {
        self.columns
            .get(name)
            .map(|v| &v[..])
            .ok_or_else(|| PlotError::ColumnNotFound(String::from(name)))
    }

    /// distinct port values in the order they appear,
    /// these are the x tick positions of every chart
    pub fn x_ticks(&self) -> Vec<u32> {
        let mut ticks: Vec<u32> = Vec::with_capacity(self.ports.len());
        for &p in self.ports.iter() {
            if !ticks.contains(&p) {
                ticks.push(p);
            }
        }
        ticks
    }

    /// writes the ports and all the metric columns as a csv at the given path
    pub fn to_csv<P>(&self, fout: P) -> Result<(), PlotError>
    where
        P: AsRef<Path>,
    {
        let fout = fout.as_ref();
        let write_error = |reason: String| PlotError::Write {
            path: fout.to_path_buf(),
            reason,
        };
        let mut writer = csv::Writer::from_path(fout).map_err(|e| write_error(e.to_string()))?;
        let mut header: Vec<&str> = vec![PORTS];
        header.extend(self.columns.keys().map(|k| k.as_str()));
        writer
            .write_record(&header)
            .map_err(|e| write_error(e.to_string()))?;
        for (i, p) in self.ports.iter().enumerate() {
            let mut record: Vec<String> = vec![p.to_string()];
            record.extend(self.columns.values().map(|c| c[i].to_string()));
            writer
                .write_record(&record)
                .map_err(|e| write_error(e.to_string()))?;
        }
        writer.flush().map_err(|e| write_error(e.to_string()))?;
        Ok(())
    }

    /// Plots one metric against the ports to png in outdir.
    /// Every call builds and drops its own backend and chart,
    /// nothing is shared between two charts.
    pub fn plot_metric(&self, style: &ChartStyle, outdir: &Path) -> Result<PathBuf, PlotError> {
        let y = self.metric(&style.metric)?;
        let fout = outdir.join(&style.output);
        let draw_error = |e| drawing_error(&fout, e);
        let nothing_to_plot = || PlotError::Render {
            path: fout.clone(),
            reason: format!("no {} values to plot", style.metric),
        };

        let (xmin, xmax) = x_range(&self.ports).ok_or_else(nothing_to_plot)?;
        let ticks = self.x_ticks();
        let (ymin, ymax, yprecision) = y_range(y).ok_or_else(nothing_to_plot)?;
        let ylabel_area = suitable_ylabel_area(style, ymin, ymax, yprecision);

        info!("plotting {} to {}", style.metric, fout.display());
        debug!("x ticks {:?}, y range {}..{}", ticks, ymin, ymax);

        {
            let root = BitMapBackend::new(&fout, style.pixel_size()).into_drawing_area();
            root.fill(&WHITE).map_err(draw_error)?;
            let mut chart = ChartBuilder::on(&root)
                .caption(style.title.as_str(), ("sans-serif", style.px(TITLE_PT)))
                .margin(style.px(10.))
                .x_label_area_size(style.px(3. * LABEL_PT))
                .y_label_area_size(ylabel_area)
                .build_cartesian_2d((xmin..xmax).with_key_points(ticks), ymin..ymax)
                .map_err(draw_error)?;
            chart
                .configure_mesh()
                .light_line_style(&TRANSPARENT)
                .bold_line_style(RGBColor(176, 176, 176).stroke_width(style.px(0.8)))
                .axis_style(BLACK.stroke_width(style.px(0.8)))
                .set_all_tick_mark_size(style.px(TICK_PT) as i32)
                .label_style(("sans-serif", style.px(LABEL_PT)))
                .axis_desc_style(("sans-serif", style.px(LABEL_PT)))
                .x_desc(style.x_label.as_str())
                .y_desc(style.y_label.as_str())
                .y_label_formatter(&|v: &f64| format!("{:.*}", yprecision, v))
                .draw()
                .map_err(draw_error)?;

            let points: Vec<(u32, f64)> = self.ports.iter().copied().zip(y.iter().copied()).collect();
            chart
                .draw_series(LineSeries::new(
                    points.iter().copied(),
                    style.color.stroke_width(style.px(style.line_width)),
                ))
                .map_err(draw_error)?;
            if style.marker == Marker::Circle {
                let radius = style.px(style.marker_size / 2.);
                chart
                    .draw_series(
                        points
                            .iter()
                            .map(|&(px, py)| Circle::new((px, py), radius, style.color.filled())),
                    )
                    .map_err(draw_error)?;
            }

            root.present().map_err(|e| PlotError::Write {
                path: fout.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(fout)
    }

    /// Plots every style in order, stops at the first failure.
    pub fn plot_all(&self, styles: &[ChartStyle], outdir: &Path) -> Result<Vec<PathBuf>, PlotError> {
        std::fs::create_dir_all(outdir).map_err(|e| PlotError::Write {
            path: outdir.to_path_buf(),
            reason: e.to_string(),
        })?;
        let mut written: Vec<PathBuf> = Vec::with_capacity(styles.len());
        for style in styles {
            written.push(self.plot_metric(style, outdir)?);
        }
        Ok(written)
    }
}

impl std::fmt::Display for PortThroughput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", PORTS)?;
        for name in self.columns.keys() {
            write!(f, ",{}", name)?;
        }
        write!(f, "\n")?;
        for (i, p) in self.ports.iter().enumerate() {
            write!(f, "{}", p)?;
            for column in self.columns.values() {
                write!(f, ",{}", column[i])?;
            }
            write!(f, "\n")?;
        }
        Ok(())
    }
}

fn csv_error(fin: &Path, e: csv::Error) -> PlotError {
    if e.is_io_error() {
        PlotError::Read {
            path: fin.to_path_buf(),
            source: e.into(),
        }
    } else {
        PlotError::format(fin, e.to_string())
    }
}

fn drawing_error<E>(fout: &Path, e: DrawingAreaErrorKind<E>) -> PlotError
where
    E: std::error::Error + Send + Sync,
{
    PlotError::Render {
        path: fout.to_path_buf(),
        reason: e.to_string(),
    }
}

pub fn min_and_max<'a, I, T>(mut s: I) -> Option<(T, T)>
where
    I: Iterator<Item = &'a T>,
    T: 'a + std::cmp::PartialOrd + Copy,
{
    let (mut min, mut max) = match s.next() {
        Some(v) => (*v, *v),
        None => return None,
    };
    for es in s {
        if *es > max {
            max = *es
        }
        if *es < min {
            min = *es
        }
    }
    Some((min, max))
}

/// x axis extent, padded by a twentieth of the span and at least one port
pub fn x_range(ports: &[u32]) -> Option<(u32, u32)> {
    let (xmin, xmax) = min_and_max(ports.iter())?;
    let xmargin = ((xmax - xmin) / 20).max(1);
    Some((xmin.saturating_sub(xmargin), xmax.saturating_add(xmargin)))
}

/// y axis extent padded by a twentieth of the span,
/// with the number of decimals for its labels
pub fn y_range(values: &[f64]) -> Option<(f64, f64, usize)> {
    let (ymin, ymax) = min_and_max(values.iter())?;
    let yspan = ymax - ymin;
    let ymargin = if yspan > 0. {
        yspan / 20.
    } else {
        (ymax.abs() / 20.).max(0.5)
    };
    let yprecision = suitable_yprecision(yspan + 2. * ymargin);
    Some((ymin - ymargin, ymax + ymargin, yprecision))
}

/// Width in pixels of the y label area:
/// the widest tick label, the tick marks, and the rotated axis title with a gap.
/// The widest label is at one of the two ends of the axis.
pub fn suitable_ylabel_area(style: &ChartStyle, ymin: f64, ymax: f64, yprecision: usize) -> u32 {
    let widest = format!("{:.*}", yprecision, ymin)
        .len()
        .max(format!("{:.*}", yprecision, ymax).len());
    style.px(widest as f64 * 0.6 * LABEL_PT + TICK_PT + 2.5 * LABEL_PT)
}

/// Number of decimals for the y labels,
/// enough to tell apart about a hundredth of the axis span.
pub fn suitable_yprecision(span: f64) -> usize {
    if !(span > 0.) || !span.is_finite() {
        return 2;
    }
    let digits = 2 - span.log10().floor() as i32;
    digits.clamp(0, 6) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use charts::{chart_table, DEFAULT_DPI};
    use std::fs;

    // cargo test -- --nocapture
    // to allow println! to stdout

    fn f64vec_close(va: &[f64], vb: &[f64]) -> bool {
        (va.len() == vb.len()) && va.iter().zip(vb).all(|(a, b)| (a - b).abs() < 1e-12)
    }

    pub(crate) fn fresh_dir(name: &str) -> PathBuf {
        let dir = PathBuf::from("./test").join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn small_dataset() -> PortThroughput {
        let mut pt = PortThroughput::new(3);
        for (p, packets, percent) in [(1, 0.5, 50.0), (2, 0.9, 75.0), (4, 1.2, 88.0)] {
            pt.ports.push(p);
            pt.push_metric(PACKETS_PER_SLOT, packets);
            pt.push_metric(THROUGHPUT_PERCENT, percent);
        }
        pt
    }

    #[test]
    fn load_keeps_rows_and_order() {
        let pt = PortThroughput::from_csv("./test/throughput_vs_ports.csv").unwrap();
        println!("{}", pt);
        assert_eq!(pt.ports, vec![4, 5, 6, 7, 8]);
        assert!(f64vec_close(
            pt.metric(PACKETS_PER_SLOT).unwrap(),
            &[3.99995451, 4.99990147, 5.99983323, 6.99970424, 7.99962102]
        ));
        assert!(f64vec_close(
            pt.metric(THROUGHPUT_PERCENT).unwrap(),
            &[99.99886281, 99.99802943, 99.99722054, 99.99577489, 99.99526277]
        ));
    }

    #[test]
    fn load_ignores_column_order_and_extra_columns() {
        let pt = PortThroughput::from_csv("./test/reordered_columns.csv").unwrap();
        assert_eq!(pt.ports, vec![1, 2, 4]);
        assert!(f64vec_close(
            pt.metric(PACKETS_PER_SLOT).unwrap(),
            &[0.5, 0.9, 1.2]
        ));
        assert!(f64vec_close(
            pt.metric(THROUGHPUT_PERCENT).unwrap(),
            &[50.0, 75.0, 88.0]
        ));
        assert_eq!(pt.columns.len(), 2);
    }

    #[test]
    fn load_then_save_then_load() {
        let dir = fresh_dir("roundtrip");
        let pt = PortThroughput::from_csv("./test/throughput_vs_ports.csv").unwrap();
        let fout = dir.join("saved.csv");
        pt.to_csv(&fout).unwrap();
        let reloaded = PortThroughput::from_csv(&fout).unwrap();
        assert_eq!(pt.ports, reloaded.ports);
        for name in [PACKETS_PER_SLOT, THROUGHPUT_PERCENT] {
            assert!(f64vec_close(
                pt.metric(name).unwrap(),
                reloaded.metric(name).unwrap()
            ));
        }
    }

    #[test]
    fn missing_file_is_not_found() {
        match PortThroughput::from_csv("./test/does_not_exist.csv") {
            Err(PlotError::NotFound(p)) => assert!(p.ends_with("does_not_exist.csv")),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn missing_column_is_format_error() {
        match PortThroughput::from_csv("./test/missing_percent.csv") {
            Err(PlotError::Format { reason, .. }) => {
                assert!(reason.contains(THROUGHPUT_PERCENT), "{}", reason)
            }
            other => panic!("expected Format, got {:?}", other),
        }
    }

    #[test]
    fn bad_values_are_format_errors() {
        for fin in [
            "./test/bad_value.csv",
            "./test/unsorted_ports.csv",
            "./test/duplicated_ports.csv",
            "./test/zero_ports.csv",
            "./test/header_only.csv",
        ] {
            match PortThroughput::from_csv(fin) {
                Err(PlotError::Format { reason, .. }) => println!("{}: {}", fin, reason),
                other => panic!("{}: expected Format, got {:?}", fin, other),
            }
        }
    }

    #[test]
    fn ticks_are_the_distinct_ports() {
        let pt = small_dataset();
        assert_eq!(pt.x_ticks(), vec![1, 2, 4]);
        let mut dup = pt.clone();
        dup.ports = vec![2, 2, 3];
        assert_eq!(dup.x_ticks().len(), 2);
    }

    #[test]
    fn unknown_metric_writes_nothing() {
        let dir = fresh_dir("unknown_metric");
        let mut pt = small_dataset();
        pt.columns.remove(THROUGHPUT_PERCENT);
        let style = chart_table(DEFAULT_DPI).remove(1);
        match pt.plot_metric(&style, &dir) {
            Err(PlotError::ColumnNotFound(c)) => assert_eq!(c, THROUGHPUT_PERCENT),
            other => panic!("expected ColumnNotFound, got {:?}", other),
        }
        assert!(!dir.join(&style.output).exists());
    }

    #[test]
    fn plot_both_charts() {
        let dir = fresh_dir("both_charts");
        let pt = small_dataset();
        let written = pt.plot_all(&chart_table(DEFAULT_DPI), &dir).unwrap();
        assert_eq!(
            written,
            vec![
                dir.join("throughput_packets_per_slot.png"),
                dir.join("throughput_percent.png")
            ]
        );
        for fout in written.iter() {
            assert!(fs::metadata(fout).unwrap().len() > 0);
        }
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 2);
    }

    #[test]
    fn plot_with_custom_style() {
        let dir = fresh_dir("custom_style");
        let pt = small_dataset();
        let mut style = chart_table(50).remove(0);
        style.output = PathBuf::from("plain_line.png");
        style.marker = Marker::Off;
        style.color = RED;
        let fout = pt.plot_metric(&style, &dir).unwrap();
        assert_eq!(fout, dir.join("plain_line.png"));
        assert!(fout.exists());
    }

    #[test]
    fn single_row_still_plots() {
        let dir = fresh_dir("single_row");
        let mut pt = PortThroughput::new(1);
        pt.ports.push(4);
        pt.push_metric(PACKETS_PER_SLOT, 3.9);
        pt.push_metric(THROUGHPUT_PERCENT, 97.5);
        let written = pt.plot_all(&chart_table(50), &dir).unwrap();
        assert_eq!(written.len(), 2);
    }

    #[test]
    fn largest_port_does_not_overflow() {
        let dir = fresh_dir("largest_port");
        let mut pt = PortThroughput::new(1);
        pt.ports.push(u32::MAX);
        pt.push_metric(PACKETS_PER_SLOT, 1.0);
        pt.push_metric(THROUGHPUT_PERCENT, 50.0);
        assert_eq!(x_range(&pt.ports), Some((u32::MAX - 1, u32::MAX)));
        let written = pt.plot_all(&chart_table(50), &dir).unwrap();
        assert_eq!(written.len(), 2);
    }

    #[test]
    fn ylabel_area_fits_labels_and_title() {
        let dir = fresh_dir("ylabel_area");
        let pt = PortThroughput::from_csv("./test/throughput_vs_ports.csv").unwrap();
        for style in chart_table(DEFAULT_DPI) {
            let (ymin, ymax, yprecision) = y_range(pt.metric(&style.metric).unwrap()).unwrap();
            let longest = format!("{:.*}", yprecision, ymin)
                .len()
                .max(format!("{:.*}", yprecision, ymax).len());
            println!("{}: longest label {} chars", style.metric, longest);
            let area = suitable_ylabel_area(&style, ymin, ymax, yprecision);
            // labels about 0.6 em per char, plus one line for the axis title
            assert!(area >= style.px(longest as f64 * 0.6 * LABEL_PT + 2. * LABEL_PT));
            assert!(area > style.px(5. * LABEL_PT));
            pt.plot_metric(&style, &dir).unwrap();
        }
    }

    #[test]
    fn empty_dataset_is_render_error() {
        let dir = fresh_dir("empty_dataset");
        let pt = PortThroughput::new(0);
        let style = chart_table(50).remove(0);
        match pt.plot_metric(&style, &dir) {
            Err(PlotError::Render { .. }) => {}
            other => panic!("expected Render, got {:?}", other),
        }
        assert!(!dir.join(&style.output).exists());
    }

    #[test]
    fn min_max_and_precision() {
        assert_eq!(min_and_max([3u32, 1, 7, 2].iter()), Some((1, 7)));
        assert_eq!(min_and_max(Vec::<f64>::new().iter()), None);
        assert_eq!(suitable_yprecision(38.), 1);
        assert_eq!(suitable_yprecision(0.7), 3);
        assert_eq!(suitable_yprecision(0.), 2);
        assert_eq!(suitable_yprecision(1e-9), 6);
        assert_eq!(suitable_yprecision(5000.), 0);
    }
}
