use crate::model::{palette, Color};

use super::{series_color, Datum, Point, Shape};

const START_DEG: f64 = -90.0;
const RING_MARGIN: f64 = 20.0;

/// Donut chart whose slices start at the top and proceed clockwise.
#[derive(Clone, Debug, PartialEq)]
pub struct PieChart {
    data: Vec<Datum>,
    width: f64,
    height: f64,
    track: Color,
}

/// One slice of a laid-out pie chart.
#[derive(Clone, Debug, PartialEq)]
pub struct PieSegment {
    /// Label of the source datum.
    pub label: String,
    /// Value of the source datum.
    pub value: f64,
    /// Start angle in degrees, clockwise from the positive x axis.
    pub start_deg: f64,
    /// Angular extent in degrees.
    pub sweep_deg: f64,
    /// Fill color.
    pub color: Color,
}

/// Computed layout of a [`PieChart`].
#[derive(Clone, Debug, PartialEq)]
pub struct PieGeometry {
    /// Center of the donut.
    pub center: Point,
    /// Radius of the outer edge.
    pub outer_radius: f64,
    /// Radius of the hole.
    pub inner_radius: f64,
    /// Slices in input order; empty when the total is zero.
    pub segments: Vec<PieSegment>,
}

impl PieChart {
    /// Creates a 200x200 donut chart from the given data.
    pub fn new(data: Vec<Datum>) -> Self {
        Self {
            data,
            width: 200.0,
            height: 200.0,
            track: palette::TRACK,
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

    /// Returns the input data.
    pub fn data(&self) -> &[Datum] {
        &self.data
    }

    /// Sets the drawing size and returns the updated chart.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets the color of the empty ring behind the slices.
    pub fn with_track(mut self, track: Color) -> Self {
        self.track = track;
        self
    }

    /// Lays the slices out around the ring.
    pub fn geometry(&self) -> PieGeometry {
        let outer_radius = (self.width.min(self.height) / 2.0 - RING_MARGIN).max(1.0);
        let inner_radius = outer_radius / 2.0;
        let center = Point::new(self.width / 2.0, self.height / 2.0);

        let total: f64 = self.data.iter().map(Datum::value).sum();
        let mut segments = Vec::new();
        if total > 0.0 {
            let mut angle = START_DEG;
            for (index, datum) in self.data.iter().enumerate() {
                let sweep = datum.value() / total * 360.0;
                segments.push(PieSegment {
                    label: datum.label().to_owned(),
                    value: datum.value(),
                    start_deg: angle,
                    sweep_deg: sweep,
                    color: datum.color().unwrap_or_else(|| series_color(index)),
                });
                angle += sweep;
            }
        }

        PieGeometry {
            center,
            outer_radius,
            inner_radius,
            segments,
        }
    }

    /// Returns the primitives: the track ring first, then every non-empty slice.
    pub fn shapes(&self) -> Vec<Shape> {
        let geometry = self.geometry();
        let mut shapes = vec![Shape::Annulus {
            center: geometry.center,
            inner_radius: geometry.inner_radius,
            outer_radius: geometry.outer_radius,
            start_deg: START_DEG,
            sweep_deg: 360.0,
            fill: self.track,
        }];
        shapes.extend(
            geometry
                .segments
                .iter()
                .filter(|segment| segment.sweep_deg > 0.0)
                .map(|segment| Shape::Annulus {
                    center: geometry.center,
                    inner_radius: geometry.inner_radius,
                    outer_radius: geometry.outer_radius,
                    start_deg: segment.start_deg,
                    sweep_deg: segment.sweep_deg,
                    fill: segment.color,
                }),
        );
        shapes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PieChart {
        PieChart::new(vec![
            Datum::new("Rezerwacje", 72.0),
            Datum::new("Pozostałe", 28.0),
        ])
    }

    #[test]
    fn angles_sum_to_full_circle() {
        let geometry = sample().geometry();
        let total: f64 = geometry.segments.iter().map(|s| s.sweep_deg).sum();
        assert!((total - 360.0).abs() < 1e-9);
    }

    #[test]
    fn angles_are_proportional_and_start_at_top() {
        let geometry = PieChart::new(vec![
            Datum::new("a", 1.0),
            Datum::new("b", 2.0),
            Datum::new("c", 5.0),
        ])
        .geometry();

        assert_eq!(geometry.segments[0].start_deg, -90.0);
        for segment in &geometry.segments {
            let expected = segment.value / 8.0 * 360.0;
            assert!((segment.sweep_deg - expected).abs() < 1e-9);
        }
        let second = &geometry.segments[1];
        assert!((second.start_deg - (-90.0 + 45.0)).abs() < 1e-9);
    }

    #[test]
    fn zero_total_renders_only_the_track() {
        let chart = PieChart::new(vec![Datum::new("a", 0.0), Datum::new("b", 0.0)]);
        assert!(chart.geometry().segments.is_empty());
        assert_eq!(chart.shapes().len(), 1);
    }

    #[test]
    fn donut_leaves_a_hole() {
        let geometry = sample().with_size(300.0, 220.0).geometry();
        assert_eq!(geometry.outer_radius, 90.0);
        assert_eq!(geometry.inner_radius, 45.0);
        assert_eq!(geometry.center, Point::new(150.0, 110.0));
    }

    #[test]
    fn explicit_colors_win_over_palette() {
        let chart = PieChart::new(vec![Datum::new("a", 1.0).with_color(palette::BLUE)]);
        assert_eq!(chart.geometry().segments[0].color, palette::BLUE);
    }

    #[test]
    fn track_color_fills_the_ring() {
        let shapes = sample().with_track(palette::SLATE_700).shapes();
        match &shapes[0] {
            Shape::Annulus { fill, sweep_deg, .. } => {
                assert_eq!(*fill, palette::SLATE_700);
                assert_eq!(*sweep_deg, 360.0);
            }
            other => panic!("expected the track ring first, got {:?}", other),
        }
    }
}
