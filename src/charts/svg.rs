use std::fmt::Write as _;

use super::{Point, Shape};

const FULL_CIRCLE_EPSILON: f64 = 1e-6;

pub(super) fn render(width: f64, height: f64, shapes: &[Shape]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
        w = num(width),
        h = num(height)
    );
    for shape in shapes {
        write_shape(&mut out, shape);
    }
    out.push_str("</svg>\n");
    out
}

fn write_shape(out: &mut String, shape: &Shape) {
    let _ = match shape {
        Shape::Line {
            from,
            to,
            stroke,
            width,
        } => writeln!(
            out,
            "  <line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"{}\" stroke-width=\"{}\"/>",
            num(from.x),
            num(from.y),
            num(to.x),
            num(to.y),
            stroke.to_hex(),
            num(*width)
        ),
        Shape::Rect {
            origin,
            width,
            height,
            fill,
            radius,
        } => writeln!(
            out,
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" rx=\"{}\" fill=\"{}\"/>",
            num(origin.x),
            num(origin.y),
            num(*width),
            num(*height),
            num(*radius),
            fill.to_hex()
        ),
        Shape::Annulus {
            center,
            inner_radius,
            outer_radius,
            start_deg,
            sweep_deg,
            fill,
        } => {
            let path = if *sweep_deg >= 360.0 - FULL_CIRCLE_EPSILON {
                // a single arc cannot start and end on the same point
                let half = sweep_deg / 2.0;
                format!(
                    "{} {}",
                    annulus_path(*center, *inner_radius, *outer_radius, *start_deg, half),
                    annulus_path(
                        *center,
                        *inner_radius,
                        *outer_radius,
                        start_deg + half,
                        half
                    )
                )
            } else {
                annulus_path(*center, *inner_radius, *outer_radius, *start_deg, *sweep_deg)
            };
            writeln!(out, "  <path d=\"{}\" fill=\"{}\"/>", path, fill.to_hex())
        }
        Shape::Polyline {
            points,
            stroke,
            width,
        } => {
            let data = points
                .iter()
                .enumerate()
                .map(|(index, point)| {
                    let command = if index == 0 { 'M' } else { 'L' };
                    format!("{} {} {}", command, num(point.x), num(point.y))
                })
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(
                out,
                "  <path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" stroke-linecap=\"round\" stroke-linejoin=\"round\"/>",
                data,
                stroke.to_hex(),
                num(*width)
            )
        }
        Shape::Circle {
            center,
            radius,
            fill,
        } => writeln!(
            out,
            "  <circle cx=\"{}\" cy=\"{}\" r=\"{}\" fill=\"{}\"/>",
            num(center.x),
            num(center.y),
            num(*radius),
            fill.to_hex()
        ),
        Shape::Label {
            anchor,
            text,
            size,
            color,
        } => writeln!(
            out,
            "  <text x=\"{}\" y=\"{}\" text-anchor=\"middle\" fill=\"{}\" font-size=\"{}\">{}</text>",
            num(anchor.x),
            num(anchor.y),
            color.to_hex(),
            num(*size),
            escape(text)
        ),
    };
}

fn polar(center: Point, radius: f64, deg: f64) -> Point {
    let rad = deg.to_radians();
    Point::new(center.x + radius * rad.cos(), center.y + radius * rad.sin())
}

fn annulus_path(center: Point, inner: f64, outer: f64, start: f64, sweep: f64) -> String {
    let end = start + sweep;
    let large_arc = if sweep > 180.0 { 1 } else { 0 };
    let outer_start = polar(center, outer, start);
    let outer_end = polar(center, outer, end);

    if inner <= 0.0 {
        return format!(
            "M {} {} L {} {} A {r} {r} 0 {large} 1 {} {} Z",
            num(center.x),
            num(center.y),
            num(outer_start.x),
            num(outer_start.y),
            num(outer_end.x),
            num(outer_end.y),
            r = num(outer),
            large = large_arc
        );
    }

    let inner_start = polar(center, inner, start);
    let inner_end = polar(center, inner, end);
    format!(
        "M {} {} A {ro} {ro} 0 {large} 1 {} {} L {} {} A {ri} {ri} 0 {large} 0 {} {} Z",
        num(outer_start.x),
        num(outer_start.y),
        num(outer_end.x),
        num(outer_end.y),
        num(inner_end.x),
        num(inner_end.y),
        num(inner_start.x),
        num(inner_start.y),
        ro = num(outer),
        ri = num(inner),
        large = large_arc
    )
}

fn num(value: f64) -> String {
    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-0" => "0".to_owned(),
        other => other.to_owned(),
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::{BarChart, Chart, Datum, PieChart};

    #[test]
    fn numbers_are_trimmed() {
        assert_eq!(num(40.0), "40");
        assert_eq!(num(12.5), "12.5");
        assert_eq!(num(-0.001), "0");
        assert_eq!(num(1.234), "1.23");
    }

    #[test]
    fn labels_are_escaped() {
        let svg = Chart::from(BarChart::new(vec![Datum::new("<T&1>", 3.0)])).to_svg();
        assert!(svg.contains("&lt;T&amp;1&gt;"));
    }

    #[test]
    fn full_circle_slice_is_split_into_two_arcs() {
        let svg = Chart::from(PieChart::new(vec![Datum::new("all", 5.0)])).to_svg();
        // track ring plus the single slice, each drawn as two closed sub-paths
        assert_eq!(svg.matches(" Z").count(), 4);
    }
}
