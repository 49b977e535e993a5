//! Campaign report in two layouts: a tall portrait page and a 16:9 slide.

use crate::charts::{BarChart, Chart, Datum, LineChart, PieChart};
use crate::model::{
    palette, Block, ChartPanel, Color, Columns, Document, HorizontalAlignment, MetricCard,
    MetricGrid, Orientation, Panel, RichParagraph, PLACEHOLDER,
};
use crate::records::{format_date, MetricsRecord};
use crate::richtext::{parse_markup_lenient, Span};

use super::{agency_header, header_row, or_placeholder, running_footer, RenderContext};

/// Minimum height of the portrait report; it is taller than one page on purpose.
pub const PORTRAIT_MIN_HEIGHT: f32 = 1400.0;

const PORTRAIT_WEEKS: &str = "Tydz";
const LANDSCAPE_WEEKS: &str = "T";
const PORTRAIT_DAYS: [&str; 7] = ["Pon", "Wt", "Śr", "Czw", "Pt", "Sob", "Nie"];
const LANDSCAPE_DAYS: [&str; 7] = ["Pn", "Wt", "Śr", "Cz", "Pt", "Sb", "Nd"];

/// Builds the report for the requested orientation.
pub fn render(
    record: &MetricsRecord,
    orientation: Orientation,
    context: &RenderContext,
) -> Document {
    match orientation {
        Orientation::Portrait => portrait(record, context),
        Orientation::Landscape => landscape(record, context),
    }
}

/// Tall single-column report, at least [`PORTRAIT_MIN_HEIGHT`] pixels.
pub fn portrait(record: &MetricsRecord, context: &RenderContext) -> Document {
    let title = format!(
        "Raport {} {}",
        or_placeholder(&record.client_name),
        or_placeholder(&record.period)
    );
    let mut document = Document::new(title, Orientation::Portrait.layout())
        .with_min_height(PORTRAIT_MIN_HEIGHT)
        .with_footer(running_footer(context));

    document.push(header_row(
        agency_header(context, false),
        vec![
            right_text(or_placeholder(&record.client_name), 22.0, palette::WHITE, true),
            right_text(
                format!("{} · {}", or_placeholder(&record.city), or_placeholder(&record.period)),
                13.0,
                palette::SLATE_400,
                false,
            ),
            right_text(
                format!("Budżet kampanii: {} PLN", or_placeholder(&record.budget)),
                15.0,
                palette::PINK,
                true,
            ),
        ],
    ));
    document.push(Block::Spacer(28.0));
    document.push(Block::Panel(summary_panel(record)));
    if let Some(details) = campaign_details(record) {
        document.push(Block::Spacer(12.0));
        document.push(details);
    }

    document.push(Block::Spacer(28.0));
    document.push(Block::heading("Kluczowe metryki", 22.0));
    document.push(Block::Spacer(12.0));
    document.push(Block::Metrics(MetricGrid {
        columns: 4,
        cards: volume_cards(record, true),
        value_size: 24.0,
    }));
    document.push(Block::Spacer(12.0));
    document.push(Block::Metrics(MetricGrid {
        columns: 3,
        cards: rate_cards(record, true),
        value_size: 24.0,
    }));

    document.push(Block::Spacer(28.0));
    document.push(Block::heading("Analiza wydajności", 22.0));
    document.push(Block::Spacer(12.0));
    document.push(Block::Columns(Columns::equal(vec![
        vec![Block::Chart(efficiency_panel(record, 200.0, true))],
        vec![Block::Chart(engagement_panel(record, 200.0, true))],
    ])));
    document.push(Block::Spacer(16.0));
    document.push(Block::Columns(Columns::equal(vec![
        vec![Block::Chart(weekly_panel(
            record,
            PORTRAIT_WEEKS,
            180.0,
            "Tygodniowy zasięg i kliknięcia",
        ))],
        vec![Block::Chart(daily_panel(
            record,
            &PORTRAIT_DAYS,
            180.0,
            "Rezerwacje według dni tygodnia",
        ))],
    ])));

    document.push(Block::Spacer(28.0));
    document.push(Block::Panel(
        Panel::new(palette::PINK, palette::ZINC_900)
            .with_title("Rekomendacje marketingowe")
            .with_blocks(recommendation_blocks(record, 14.0)),
    ));

    document.push(Block::Spacer(32.0));
    document.push(Block::Rule(palette::BORDER));
    document.push(Block::Spacer(12.0));
    document.extend(report_footer(context));
    document
}

/// Single 1600x900 slide.
pub fn landscape(record: &MetricsRecord, context: &RenderContext) -> Document {
    let title = format!(
        "Raport 16:9 {} {}",
        or_placeholder(&record.client_name),
        or_placeholder(&record.period)
    );
    let mut document = Document::new(title, Orientation::Landscape.layout())
        .with_padding(40.0)
        .with_footer(running_footer(context));

    document.push(header_row(
        vec![
            Block::Heading {
                text: or_placeholder(&record.client_name),
                size: 30.0,
                color: palette::WHITE,
            },
            Block::text(
                format!("{} · {}", or_placeholder(&record.period), or_placeholder(&record.city)),
                14.0,
                palette::SLATE_400,
            ),
        ],
        vec![
            right_text("Budżet", 12.0, palette::SLATE_400, false),
            right_text(format!("{} PLN", or_placeholder(&record.budget)), 26.0, palette::PINK, true),
        ],
    ));
    document.push(Block::Spacer(20.0));

    let left = vec![
        Block::heading("Kluczowe metryki", 18.0),
        Block::Spacer(10.0),
        Block::Metrics(MetricGrid {
            columns: 2,
            cards: volume_cards(record, false),
            value_size: 22.0,
        }),
        Block::Spacer(10.0),
        Block::Metrics(MetricGrid {
            columns: 3,
            cards: rate_cards(record, false),
            value_size: 16.0,
        }),
    ];
    let right = vec![
        Block::Columns(Columns::equal(vec![
            vec![Block::Chart(efficiency_panel(record, 150.0, false))],
            vec![Block::Chart(engagement_panel(record, 150.0, false))],
        ])),
        Block::Spacer(10.0),
        Block::Columns(Columns::equal(vec![
            vec![Block::Chart(weekly_panel(
                record,
                LANDSCAPE_WEEKS,
                150.0,
                "Zasięg i kliknięcia",
            ))],
            vec![Block::Chart(daily_panel(
                record,
                &LANDSCAPE_DAYS,
                150.0,
                "Rezerwacje wg dni",
            ))],
        ])),
    ];
    document.push(Block::Columns(Columns::weighted(vec![1.0, 1.5], vec![left, right])));

    document.push(Block::Spacer(16.0));
    document.push(Block::Panel(
        Panel::new(palette::PINK, palette::ZINC_900)
            .with_title("Rekomendacje")
            .with_blocks(recommendation_blocks(record, 12.0)),
    ));
    document.push(Block::Spacer(12.0));
    document.extend(report_footer(context));
    document
}

fn right_text(text: impl Into<String>, size: f32, color: Color, bold: bool) -> Block {
    let span = Span::new(text).with_bold(bold);
    Block::Paragraph(
        RichParagraph::new(vec![span])
            .with_size(size)
            .with_color(color)
            .with_alignment(HorizontalAlignment::Right),
    )
}

fn summary_panel(record: &MetricsRecord) -> Panel {
    let strong = |text: String| Span::new(text).bold().colored(palette::WHITE);
    let spans = vec![
        Span::new("Kampania Facebook Ads dla salonu "),
        strong(or_placeholder(&record.client_name)),
        Span::new(" osiągnęła wybitne rezultaty. Zainwestowany budżet "),
        strong(format!("{} PLN", or_placeholder(&record.budget))),
        Span::new(" przyniósł "),
        strong(format!("{} rezerwacji wizyt", or_placeholder(&record.bookings))),
        Span::new(", co przekłada się na doskonały zwrot z inwestycji. Kampania dotarła do "),
        strong(or_placeholder(&record.reach)),
        Span::new(" unikalnych użytkowników, generując wysokie zaangażowanie i konwersje."),
    ];
    Panel::new(palette::BLUE, Color::rgb(0x25, 0x63, 0xeb))
        .with_title("Podsumowanie kampanii")
        .with_block(Block::Paragraph(
            RichParagraph::new(spans)
                .with_size(15.0)
                .with_color(palette::WHITE.mix(palette::BLUE, 0.1)),
        ))
}

fn campaign_details(record: &MetricsRecord) -> Option<Block> {
    let objective = record
        .campaign_objective
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if objective.is_none() && record.campaign_status.is_none() {
        return None;
    }
    let mut spans = vec![Span::new("Cel kampanii: ").bold()];
    spans.push(Span::new(objective.unwrap_or(PLACEHOLDER)));
    spans.push(Span::new("   Status: ").bold());
    spans.push(Span::new(
        record
            .campaign_status
            .map(|status| status.label())
            .unwrap_or(PLACEHOLDER),
    ));
    Some(Block::Paragraph(
        RichParagraph::new(spans)
            .with_size(13.0)
            .with_color(palette::SLATE_300),
    ))
}

fn volume_cards(record: &MetricsRecord, with_captions: bool) -> Vec<MetricCard> {
    let cards = [
        ("Wyświetlenia", &record.impressions, "Zasięg Facebook", palette::PINK),
        ("Zasięg", &record.reach, "Unikalni użytkownicy", palette::PURPLE),
        ("Kliknięcia", &record.clicks, "Akcje użytkowników", palette::BLUE),
        ("Rezerwacje", &record.bookings, "Wizyt zarezerwowanych", palette::EMERALD),
    ];
    cards
        .into_iter()
        .map(|(label, value, caption, accent)| {
            let card = MetricCard::new(label, or_placeholder(value), accent);
            if with_captions {
                card.with_caption(caption)
            } else {
                card
            }
        })
        .collect()
}

fn rate_cards(record: &MetricsRecord, portrait: bool) -> Vec<MetricCard> {
    let ctr = or_placeholder(&record.ctr);
    let ctr = if ctr == PLACEHOLDER || ctr.ends_with('%') {
        ctr
    } else {
        format!("{}%", ctr)
    };
    let cost_label = if portrait { "Koszt / konwersja" } else { "Koszt/konw." };
    let cost = or_placeholder(&record.cost_per_conversion);
    let cost = if cost == PLACEHOLDER {
        cost
    } else {
        format!("{} PLN", cost)
    };

    let mut cards = vec![
        MetricCard::new("CTR", ctr, palette::PINK).highlighted(),
        MetricCard::new("Konwersje", or_placeholder(&record.conversions), palette::PURPLE)
            .highlighted(),
        MetricCard::new(cost_label, cost, palette::BLUE).highlighted(),
    ];
    if portrait {
        for (card, caption) in cards.iter_mut().zip(["Wysoki", "Sukces", "Optymalne"]) {
            card.caption = Some(caption.to_owned());
        }
    }
    cards
}

fn share_chart(primary_label: &str, rest_label: &str, percent: f64, color: Color) -> Chart {
    let percent = percent.clamp(0.0, 100.0);
    PieChart::new(vec![
        Datum::new(primary_label, percent).with_color(color),
        Datum::new(rest_label, 100.0 - percent).with_color(palette::SLATE_700),
    ])
    .into()
}

fn efficiency_panel(record: &MetricsRecord, height: f32, portrait: bool) -> ChartPanel {
    let efficiency = record.conversion_efficiency();
    let counts = if portrait {
        format!(
            "{} rezerwacji z {} konwersji",
            or_placeholder(&record.bookings),
            or_placeholder(&record.conversions)
        )
    } else {
        format!(
            "{} z {}",
            or_placeholder(&record.bookings),
            or_placeholder(&record.conversions)
        )
    };
    ChartPanel {
        title: "Efektywność rezerwacji".into(),
        chart: Some(share_chart("Rezerwacje", "Pozostałe", efficiency, palette::PINK)),
        caption: Some(format!("{:.2}% · {}", efficiency, counts)),
        chart_height: height,
    }
}

fn engagement_panel(record: &MetricsRecord, height: f32, portrait: bool) -> ChartPanel {
    let engagement = record.engagement();
    let title = if portrait { "Zaangażowanie odbiorców" } else { "Zaangażowanie" };
    ChartPanel {
        title: title.into(),
        chart: Some(share_chart("Zaangażowani", "Pozostali", engagement, palette::BLUE)),
        caption: Some(format!("{}% · Wysoki poziom interakcji", trim_percent(engagement))),
        chart_height: height,
    }
}

fn trim_percent(value: f64) -> String {
    let formatted = format!("{:.2}", value);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_owned()
}

fn weekly_panel(record: &MetricsRecord, prefix: &str, height: f32, title: &str) -> ChartPanel {
    let chart = match (record.weekly_reach(), record.weekly_clicks()) {
        (Some(reach), Some(clicks)) => {
            let weeks = reach.len().max(clicks.len());
            let labels: Vec<String> = (1..=weeks)
                .map(|week| {
                    if prefix == PORTRAIT_WEEKS {
                        format!("{} {}", prefix, week)
                    } else {
                        format!("{}{}", prefix, week)
                    }
                })
                .collect();
            Some(LineChart::from_series(&labels, reach.values(), clicks.values()).into())
        }
        _ => None,
    };
    ChartPanel {
        title: title.into(),
        chart,
        caption: Some("Zasięg (różowy) · Kliknięcia (niebieski)".into()),
        chart_height: height,
    }
}

fn daily_panel(record: &MetricsRecord, days: &[&str; 7], height: f32, title: &str) -> ChartPanel {
    let chart = record.daily_bookings().map(|series| {
        let data = series
            .values()
            .iter()
            .enumerate()
            .map(|(index, value)| {
                let label = days
                    .get(index)
                    .map(|day| (*day).to_owned())
                    .unwrap_or_else(|| (index + 1).to_string());
                Datum::new(label, *value)
            })
            .collect();
        BarChart::new(data).into()
    });
    ChartPanel {
        title: title.into(),
        chart,
        caption: None,
        chart_height: height,
    }
}

/// Splits recommendation text into one paragraph per non-empty line.
///
/// Leading list markers (`-`, `•`, `* `, `1.`, `2)`) are dropped and inline markup is honoured
/// when it parses.
pub fn recommendation_blocks(record: &MetricsRecord, size: f32) -> Vec<Block> {
    let Some(text) = record.recommendations_text() else {
        return vec![Block::text(PLACEHOLDER, size, palette::SLATE_300)];
    };
    text.lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let mut spans = vec![Span::new("• ").colored(palette::PINK)];
            spans.extend(parse_markup_lenient(line));
            Block::Paragraph(
                RichParagraph::new(spans)
                    .with_size(size)
                    .with_color(palette::SLATE_300),
            )
        })
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    for marker in ["- ", "• ", "* ", "– "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return rest.trim_start();
        }
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return rest.trim_start();
        }
    }
    line
}

fn report_footer(context: &RenderContext) -> Vec<Block> {
    let agency = &context.agency;
    let centered = |text: String, size: f32, color: Color| {
        Block::Paragraph(
            RichParagraph::plain(text)
                .with_size(size)
                .with_color(color)
                .with_alignment(HorizontalAlignment::Center),
        )
    };
    vec![
        centered(
            format!("Raport wygenerowany przez {}", agency.name),
            12.0,
            palette::SLATE_300,
        ),
        centered(
            format!(
                "{} · {} · {}",
                agency.report_website,
                agency.email,
                format_date(context.generated_on)
            ),
            10.0,
            palette::SLATE_500,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn context() -> RenderContext {
        RenderContext::new(NaiveDate::from_ymd_opt(2025, 2, 1).expect("date"))
    }

    fn record() -> MetricsRecord {
        MetricsRecord {
            client_name: "Salon Bella".into(),
            city: "Kraków".into(),
            period: "Styczeń 2025".into(),
            budget: "2000".into(),
            impressions: "120,000".into(),
            reach: "85,000".into(),
            clicks: "3,400".into(),
            ctr: "2.8".into(),
            conversions: "245".into(),
            cost_per_conversion: "8.16".into(),
            bookings: "178".into(),
            weekly_reach_data: Some("15000,19000,25000,26000".into()),
            weekly_clicks_data: Some("650,820,1100,930".into()),
            daily_bookings_data: Some("22,28,32,35,38,42,25".into()),
            recommendations: Some("- **Budżet:** zwiększ o 20%\n\n2. Testuj wideo".into()),
            ..MetricsRecord::default()
        }
    }

    fn charts(document: &Document) -> Vec<ChartPanel> {
        let mut panels = Vec::new();
        document.visit_blocks(&mut |block| {
            if let Block::Chart(panel) = block {
                panels.push(panel.clone());
            }
        });
        panels
    }

    #[test]
    fn portrait_is_taller_than_a_page() {
        let document = portrait(&record(), &context());
        assert_eq!(document.layout(), Orientation::Portrait.layout());
        assert_eq!(document.min_height(), Some(PORTRAIT_MIN_HEIGHT));
    }

    #[test]
    fn efficiency_caption_shows_two_decimals() {
        let document = portrait(&record(), &context());
        assert!(document.plain_text().contains("72.65%"));
    }

    #[test]
    fn weekly_chart_keeps_point_order() {
        let panels = charts(&portrait(&record(), &context()));
        let weekly = panels
            .iter()
            .find_map(|panel| match &panel.chart {
                Some(Chart::Line(chart)) => Some(chart.clone()),
                _ => None,
            })
            .expect("line chart present");
        let points = weekly.points();
        assert_eq!(points.len(), 4);
        assert_eq!(points[0].label, "Tydz 1");
        assert_eq!(points[3].primary, 26000.0);
        assert_eq!(points[2].secondary, 1100.0);
    }

    #[test]
    fn landscape_uses_short_labels() {
        let panels = charts(&landscape(&record(), &context()));
        let labels: Vec<String> = panels
            .iter()
            .filter_map(|panel| match &panel.chart {
                Some(Chart::Line(chart)) => Some(chart.points()[0].label.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec!["T1".to_owned()]);
    }

    #[test]
    fn missing_series_render_placeholders() {
        let mut record = record();
        record.weekly_clicks_data = None;
        record.daily_bookings_data = Some("1,two,3".into());
        let panels = charts(&portrait(&record, &context()));
        let empty = panels.iter().filter(|panel| panel.chart.is_none()).count();
        assert_eq!(empty, 2);
    }

    #[test]
    fn blank_fields_never_render_empty() {
        let document = portrait(&MetricsRecord::default(), &context());
        let text = document.plain_text();
        assert!(text.contains(PLACEHOLDER));
        assert!(!text.contains("undefined"));
    }

    #[test]
    fn recommendation_lines_are_cleaned() {
        let blocks = recommendation_blocks(&record(), 14.0);
        assert_eq!(blocks.len(), 2);
        let Block::Paragraph(first) = &blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(first.text(), "• Budżet: zwiększ o 20%");
        assert!(first.spans()[1].is_bold());
        let Block::Paragraph(second) = &blocks[1] else {
            panic!("expected paragraph");
        };
        assert_eq!(second.text(), "• Testuj wideo");
    }

    #[test]
    fn status_line_is_optional() {
        let mut record = record();
        assert!(campaign_details(&record).is_none());
        record.campaign_status = Some(crate::records::CampaignStatus::Active);
        assert!(campaign_details(&record).is_some());
    }
}
