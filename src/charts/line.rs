use log::warn;

use crate::model::{palette, Color};

use super::{axes, axis_label, sanitize, Point, Shape};

/// One x position of a [`LineChart`] carrying both series values.
#[derive(Clone, Debug, PartialEq)]
pub struct LinePoint {
    /// Label printed under the axis.
    pub label: String,
    /// Value of the first series.
    pub primary: f64,
    /// Value of the second series.
    pub secondary: f64,
}

impl LinePoint {
    /// Creates a new point.
    pub fn new(label: impl Into<String>, primary: f64, secondary: f64) -> Self {
        Self {
            label: label.into(),
            primary,
            secondary,
        }
    }
}

/// Two series drawn against a shared y scale.
#[derive(Clone, Debug, PartialEq)]
pub struct LineChart {
    points: Vec<LinePoint>,
    width: f64,
    height: f64,
    primary_color: Color,
    secondary_color: Color,
}

/// Computed layout of a [`LineChart`].
#[derive(Clone, Debug, PartialEq)]
pub struct LineGeometry {
    /// Largest value of both series.
    pub max_value: f64,
    /// Horizontal distance between neighbouring points.
    pub step_x: f64,
    /// Positions of the first series.
    pub primary: Vec<Point>,
    /// Positions of the second series.
    pub secondary: Vec<Point>,
}

impl LineChart {
    /// Creates a 400x200 chart from paired points.
    pub fn new(points: Vec<LinePoint>) -> Self {
        Self {
            points,
            width: 400.0,
            height: 200.0,
            primary_color: palette::PINK,
            secondary_color: palette::BLUE,
        }
    }

    /// Pairs two series by index, truncating to the shorter one.
    pub fn from_series<S: AsRef<str>>(labels: &[S], primary: &[f64], secondary: &[f64]) -> Self {
        if primary.len() != secondary.len() {
            warn!(
                "Line chart series differ in length ({} vs {}); truncating to the shorter one",
                primary.len(),
                secondary.len()
            );
        }
        let points = primary
            .iter()
            .zip(secondary)
            .enumerate()
            .map(|(index, (first, second))| {
                let label = labels
                    .get(index)
                    .map(|label| label.as_ref().to_owned())
                    .unwrap_or_else(|| (index + 1).to_string());
                LinePoint::new(label, *first, *second)
            })
            .collect();
        Self::new(points)
    }

    /// Returns the width of the drawing.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Returns the height of the drawing.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Returns the paired points.
    pub fn points(&self) -> &[LinePoint] {
        &self.points
    }

    /// Sets the drawing size and returns the updated chart.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets both series colors and returns the updated chart.
    pub fn with_colors(mut self, primary: Color, secondary: Color) -> Self {
        self.primary_color = primary;
        self.secondary_color = secondary;
        self
    }

    /// Positions every point of both series.
    pub fn geometry(&self) -> LineGeometry {
        let max_value = self
            .points
            .iter()
            .map(|point| sanitize(point.primary).max(sanitize(point.secondary)))
            .fold(0.0, f64::max);
        let chart_height = (self.height - 40.0).max(0.0);
        let baseline = self.height - 30.0;
        let step_x = if self.points.len() > 1 {
            (self.width - 60.0) / (self.points.len() - 1) as f64
        } else {
            0.0
        };

        let y_for = |value: f64| {
            if max_value > 0.0 {
                baseline - sanitize(value) / max_value * chart_height
            } else {
                baseline
            }
        };

        let mut primary = Vec::with_capacity(self.points.len());
        let mut secondary = Vec::with_capacity(self.points.len());
        for (index, point) in self.points.iter().enumerate() {
            let x = 40.0 + index as f64 * step_x;
            primary.push(Point::new(x, y_for(point.primary)));
            secondary.push(Point::new(x, y_for(point.secondary)));
        }

        LineGeometry {
            max_value,
            step_x,
            primary,
            secondary,
        }
    }

    /// Returns axes, both polylines, the point markers and labels.
    pub fn shapes(&self) -> Vec<Shape> {
        let geometry = self.geometry();
        let mut shapes = axes(self.width, self.height).to_vec();

        for (points, color) in [
            (&geometry.primary, self.primary_color),
            (&geometry.secondary, self.secondary_color),
        ] {
            if points.len() > 1 {
                shapes.push(Shape::Polyline {
                    points: points.clone(),
                    stroke: color,
                    width: 3.0,
                });
            }
        }

        for (index, point) in self.points.iter().enumerate() {
            shapes.push(Shape::Circle {
                center: geometry.primary[index],
                radius: 4.0,
                fill: self.primary_color,
            });
            shapes.push(Shape::Circle {
                center: geometry.secondary[index],
                radius: 4.0,
                fill: self.secondary_color,
            });
            shapes.push(axis_label(geometry.primary[index].x, self.height, &point.label));
        }
        shapes
    }
}
