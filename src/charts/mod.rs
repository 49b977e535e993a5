//! Hand-rolled vector charts used by the report templates.
//!
//! Every chart produces a list of [`Shape`] primitives in its own coordinate space
//! (origin in the top-left corner, y growing downwards).  The same shapes are written
//! out as a standalone SVG document by [`Chart::to_svg`] and painted pixel by pixel by
//! the raster backend, so a chart looks identical in both outputs.

mod bar;
mod line;
mod pie;
mod svg;

pub use bar::{Bar, BarChart, BarGeometry};
pub use line::{LineChart, LineGeometry, LinePoint};
pub use pie::{PieChart, PieGeometry, PieSegment};

use crate::model::{palette, Color};

/// A point in chart coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position, growing downwards.
    pub y: f64,
}

impl Point {
    /// Creates a new point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A labelled value fed into pie and bar charts.
#[derive(Clone, Debug, PartialEq)]
pub struct Datum {
    label: String,
    value: f64,
    color: Option<Color>,
}

impl Datum {
    /// Creates a datum without an explicit color.
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
            color: None,
        }
    }

    /// Returns the label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the value clamped to a finite, non-negative number.
    pub fn value(&self) -> f64 {
        sanitize(self.value)
    }

    /// Returns the explicit color, if any.
    pub fn color(&self) -> Option<Color> {
        self.color
    }

    /// Sets the color and returns the updated datum.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }
}

/// Drawing primitives shared by the SVG writer and the rasterizer.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// Straight stroked segment.
    Line {
        from: Point,
        to: Point,
        stroke: Color,
        width: f64,
    },
    /// Filled, optionally rounded rectangle.
    Rect {
        origin: Point,
        width: f64,
        height: f64,
        fill: Color,
        radius: f64,
    },
    /// Ring segment between two radii; angles in degrees, clockwise from the x axis.
    Annulus {
        center: Point,
        inner_radius: f64,
        outer_radius: f64,
        start_deg: f64,
        sweep_deg: f64,
        fill: Color,
    },
    /// Open stroked path through the given points.
    Polyline {
        points: Vec<Point>,
        stroke: Color,
        width: f64,
    },
    /// Filled circle.
    Circle {
        center: Point,
        radius: f64,
        fill: Color,
    },
    /// Text centered horizontally on `anchor`, with `anchor.y` as the baseline.
    Label {
        anchor: Point,
        text: String,
        size: f64,
        color: Color,
    },
}

/// Any of the supported chart kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum Chart {
    /// Donut chart.
    Pie(PieChart),
    /// Vertical bar chart.
    Bar(BarChart),
    /// Dual-series line chart.
    Line(LineChart),
}

impl Chart {
    /// Width of the drawing.
    pub fn width(&self) -> f64 {
        match self {
            Chart::Pie(chart) => chart.width(),
            Chart::Bar(chart) => chart.width(),
            Chart::Line(chart) => chart.width(),
        }
    }

    /// Height of the drawing.
    pub fn height(&self) -> f64 {
        match self {
            Chart::Pie(chart) => chart.height(),
            Chart::Bar(chart) => chart.height(),
            Chart::Line(chart) => chart.height(),
        }
    }

    /// Returns the same chart resized to the given box.
    pub fn resized(self, width: f64, height: f64) -> Self {
        match self {
            Chart::Pie(chart) => Chart::Pie(chart.with_size(width, height)),
            Chart::Bar(chart) => Chart::Bar(chart.with_size(width, height)),
            Chart::Line(chart) => Chart::Line(chart.with_size(width, height)),
        }
    }

    /// Computes the primitives making up the chart.
    pub fn shapes(&self) -> Vec<Shape> {
        match self {
            Chart::Pie(chart) => chart.shapes(),
            Chart::Bar(chart) => chart.shapes(),
            Chart::Line(chart) => chart.shapes(),
        }
    }

    /// Serializes the chart into a self-contained SVG document.
    pub fn to_svg(&self) -> String {
        svg::render(self.width(), self.height(), &self.shapes())
    }
}

impl From<PieChart> for Chart {
    fn from(chart: PieChart) -> Self {
        Chart::Pie(chart)
    }
}

impl From<BarChart> for Chart {
    fn from(chart: BarChart) -> Self {
        Chart::Bar(chart)
    }
}

impl From<LineChart> for Chart {
    fn from(chart: LineChart) -> Self {
        Chart::Line(chart)
    }
}

const SERIES_COLORS: [Color; 5] = [
    palette::PINK,
    palette::BLUE,
    palette::PURPLE,
    palette::EMERALD,
    palette::SLATE_500,
];

fn series_color(index: usize) -> Color {
    SERIES_COLORS[index % SERIES_COLORS.len()]
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

// Shared axes of the bar and line charts, matching their 40px gutter.
fn axes(width: f64, height: f64) -> [Shape; 2] {
    let baseline = height - 30.0;
    [
        Shape::Line {
            from: Point::new(40.0, 10.0),
            to: Point::new(40.0, baseline),
            stroke: palette::AXIS,
            width: 1.0,
        },
        Shape::Line {
            from: Point::new(40.0, baseline),
            to: Point::new(width - 20.0, baseline),
            stroke: palette::AXIS,
            width: 1.0,
        },
    ]
}

fn axis_label(x: f64, height: f64, text: &str) -> Shape {
    Shape::Label {
        anchor: Point::new(x, height - 15.0),
        text: text.to_owned(),
        size: 10.0,
        color: palette::SLATE_400,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resized_chart_reports_new_box() {
        let chart = Chart::from(BarChart::new(vec![Datum::new("a", 1.0)])).resized(320.0, 160.0);
        assert_eq!(chart.width(), 320.0);
        assert_eq!(chart.height(), 160.0);
    }

    #[test]
    fn negative_and_nan_values_are_clamped() {
        assert_eq!(Datum::new("x", -4.0).value(), 0.0);
        assert_eq!(Datum::new("x", f64::NAN).value(), 0.0);
        assert_eq!(Datum::new("x", 2.5).value(), 2.5);
    }

    #[test]
    fn svg_output_is_self_contained() {
        let svg = Chart::from(PieChart::new(vec![Datum::new("a", 1.0)])).to_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("xmlns=\"http://www.w3.org/2000/svg\""));
        assert!(svg.trim_end().ends_with("</svg>"));
    }
}
