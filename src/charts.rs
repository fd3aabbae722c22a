use plotters::style::RGBColor;
use std::path::PathBuf;

pub const PORTS: &str = "ports";
pub const PACKETS_PER_SLOT: &str = "avg_packets_per_slot";
pub const THROUGHPUT_PERCENT: &str = "avg_throughput_percent";

pub const DEFAULT_DPI: u32 = 300;
pub const DEFAULT_FIGSIZE: (f64, f64) = (6.4, 4.8);

pub const BLUE: RGBColor = RGBColor(31, 119, 180);
pub const GREEN: RGBColor = RGBColor(0, 128, 0);

// font sizes in points, title is one step larger than the rest
pub const TITLE_PT: f64 = 12.;
pub const LABEL_PT: f64 = 10.;
pub const TICK_PT: f64 = 3.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Marker {
    Circle,
    Off,
}

/// Styling record for a single chart.
/// Sizes are in points (1/72 inch) and inches,
/// converted to pixels with the dpi when drawing.
#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub metric: String,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub output: PathBuf,
    pub figsize: (f64, f64),
    pub dpi: u32,
    pub color: RGBColor,
    pub line_width: f64,
    pub marker: Marker,
    pub marker_size: f64,
}

impl ChartStyle {
    /// image size in pixels
    pub fn pixel_size(&self) -> (u32, u32) {
        let (w, h) = self.figsize;
        (
            (w * self.dpi as f64).round() as u32,
            (h * self.dpi as f64).round() as u32,
        )
    }

    /// converts points to pixels, never less than one pixel
    pub fn px(&self, pt: f64) -> u32 {
        ((pt * self.dpi as f64 / 72.).round() as u32).max(1)
    }
}

/// The two APSARA charts, one per metric column.
pub fn chart_table(dpi: u32) -> Vec<ChartStyle> {
    vec![
        ChartStyle {
            metric: String::from(PACKETS_PER_SLOT),
            title: String::from("Average Throughput vs Number of Ports (APSARA)"),
            x_label: String::from("Number of Input Ports"),
            y_label: String::from("Average Throughput (packets/slot)"),
            output: PathBuf::from("throughput_packets_per_slot.png"),
            figsize: DEFAULT_FIGSIZE,
            dpi,
            color: BLUE,
            line_width: 2.,
            marker: Marker::Circle,
            marker_size: 6.,
        },
        ChartStyle {
            metric: String::from(THROUGHPUT_PERCENT),
            title: String::from("Average Throughput (%) vs Number of Ports (APSARA)"),
            x_label: String::from("Number of Input Ports"),
            y_label: String::from("Average Throughput (%)"),
            output: PathBuf::from("throughput_percent.png"),
            figsize: (8., 5.),
            dpi,
            color: GREEN,
            line_width: 2.,
            marker: Marker::Circle,
            marker_size: 6.,
        },
    ]
}
