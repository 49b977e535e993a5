use crate::model::{palette, Color};

use super::{axes, axis_label, Datum, Point, Shape};

/// Vertical bar chart scaled against the largest value.
#[derive(Clone, Debug, PartialEq)]
pub struct BarChart {
    data: Vec<Datum>,
    width: f64,
    height: f64,
    color: Color,
}

/// A single laid-out bar.
#[derive(Clone, Debug, PartialEq)]
pub struct Bar {
    /// Category label.
    pub label: String,
    /// Source value.
    pub value: f64,
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Bar width.
    pub width: f64,
    /// Bar height; zero for empty categories.
    pub height: f64,
}

/// Computed layout of a [`BarChart`].
#[derive(Clone, Debug, PartialEq)]
pub struct BarGeometry {
    /// Height available to the tallest bar.
    pub chart_height: f64,
    /// Y coordinate of the x axis.
    pub baseline: f64,
    /// Largest value in the series.
    pub max_value: f64,
    /// Bars in input order.
    pub bars: Vec<Bar>,
}

impl BarChart {
    /// Creates a 400x200 bar chart.
    pub fn new(data: Vec<Datum>) -> Self {
        Self {
            data,
            width: 400.0,
            height: 200.0,
            color: palette::PINK,
        }
    }

    /// Returns the width of the drawing.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Returns the height of the drawing.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Sets the drawing size and returns the updated chart.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets the bar fill and returns the updated chart.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Lays out every bar.
    pub fn geometry(&self) -> BarGeometry {
        let chart_height = (self.height - 40.0).max(0.0);
        let baseline = self.height - 30.0;
        let max_value = self.data.iter().map(Datum::value).fold(0.0, f64::max);

        let count = self.data.len().max(1) as f64;
        let bar_width = ((self.width - 60.0) / count - 10.0).max(1.0);

        let bars = self
            .data
            .iter()
            .enumerate()
            .map(|(index, datum)| {
                let height = if max_value > 0.0 {
                    datum.value() / max_value * chart_height
                } else {
                    0.0
                };
                Bar {
                    label: datum.label().to_owned(),
                    value: datum.value(),
                    x: 50.0 + index as f64 * (bar_width + 10.0),
                    y: baseline - height,
                    width: bar_width,
                    height,
                }
            })
            .collect();

        BarGeometry {
            chart_height,
            baseline,
            max_value,
            bars,
        }
    }

    /// Returns axes, bars and category labels.
    pub fn shapes(&self) -> Vec<Shape> {
        let geometry = self.geometry();
        let mut shapes = axes(self.width, self.height).to_vec();
        for bar in &geometry.bars {
            if bar.height > 0.0 {
                shapes.push(Shape::Rect {
                    origin: Point::new(bar.x, bar.y),
                    width: bar.width,
                    height: bar.height,
                    fill: self.color,
                    radius: 4.0_f64.min(bar.height / 2.0),
                });
            }
            shapes.push(axis_label(bar.x + bar.width / 2.0, self.height, &bar.label));
        }
        shapes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn daily() -> BarChart {
        let values = [22.0, 28.0, 32.0, 35.0, 38.0, 42.0, 25.0];
        let labels = ["Pon", "Wt", "Śr", "Czw", "Pt", "Sob", "Nie"];
        BarChart::new(
            labels
                .iter()
                .zip(values)
                .map(|(label, value)| Datum::new(*label, value))
                .collect(),
        )
    }

    #[test]
    fn heights_scale_against_the_maximum() {
        let geometry = daily().geometry();
        assert_eq!(geometry.chart_height, 160.0);
        for bar in &geometry.bars {
            let ratio = bar.height / geometry.chart_height;
            assert!((ratio - bar.value / 42.0).abs() < 1e-9);
            assert!((bar.y + bar.height - geometry.baseline).abs() < 1e-9);
        }
    }

    #[test]
    fn zero_height_bars_are_kept() {
        let chart = BarChart::new(vec![Datum::new("a", 0.0), Datum::new("b", 4.0)]);
        let geometry = chart.geometry();
        assert_eq!(geometry.bars.len(), 2);
        assert_eq!(geometry.bars[0].height, 0.0);
        let rects = chart
            .shapes()
            .into_iter()
            .filter(|shape| matches!(shape, Shape::Rect { .. }))
            .count();
        assert_eq!(rects, 1);
    }

    #[test]
    fn all_zero_series_does_not_divide_by_zero() {
        let geometry = BarChart::new(vec![Datum::new("a", 0.0)]).geometry();
        assert_eq!(geometry.bars[0].height, 0.0);
        assert!(geometry.bars[0].y.is_finite());
    }

    #[test]
    fn bars_are_spaced_evenly() {
        let geometry = daily().geometry();
        let bars = &geometry.bars;
        assert_eq!(bars[0].x, 50.0);
        let spacing = bars[1].x - bars[0].x;
        assert!((spacing - (bars[0].width + 10.0)).abs() < 1e-9);
    }

    #[test]
    fn empty_series_draws_only_axes() {
        assert_eq!(BarChart::new(Vec::new()).shapes().len(), 2);
    }
}
