use crate::model::{
    palette, Block, Columns, Document, HorizontalAlignment, Orientation, Panel, RichParagraph,
    Table,
};
use crate::records::{format_date, InvoiceKind, InvoiceRecord};
use crate::richtext::Span;

use super::{
    agency_header, business_footer, document_badge, header_row, money, opt_or_placeholder,
    or_placeholder, running_footer, RenderContext,
};

/// VAT line printed on every invoice.
pub const VAT_EXEMPT: &str = "Zwolnione z VAT";

/// Builds the portrait invoice.
pub fn render(record: &InvoiceRecord, context: &RenderContext) -> Document {
    let due = money(record.displayed_amount());
    let mut document = Document::new(
        format!("{} {}", record.kind.title(), or_placeholder(&record.invoice_number)),
        Orientation::Portrait.layout(),
    )
    .with_footer(running_footer(context));

    document.push(header_row(
        agency_header(context, true),
        document_badge(record.kind.title(), &record.invoice_number, palette::PINK),
    ));
    document.push(Block::Spacer(16.0));
    document.push(Block::Rule(palette::BORDER));
    document.push(Block::Spacer(24.0));

    document.push(Block::Columns(Columns::equal(vec![
        vec![Block::Panel(
            Panel::new(palette::PURPLE, palette::ZINC_900)
                .with_title("Nabywca")
                .with_block(Block::Paragraph(
                    RichParagraph::new(vec![Span::new(or_placeholder(&record.client_name)).bold()])
                        .with_color(palette::WHITE),
                ))
                .with_block(Block::text(
                    opt_or_placeholder(record.client_address.as_deref()),
                    13.0,
                    palette::ZINC_400,
                )),
        )],
        vec![Block::Panel(
            Panel::new(palette::PINK, palette::ZINC_900)
                .with_title("Data wystawienia")
                .with_block(Block::Paragraph(
                    RichParagraph::new(vec![Span::new(format_date(record.issue_date)).bold()])
                        .with_size(18.0)
                        .with_color(palette::WHITE),
                )),
        )],
    ])));

    document.push(Block::Spacer(24.0));
    document.push(Block::heading("Usługi", 18.0));
    document.push(Block::Spacer(8.0));
    document.push(Block::Table(
        Table::new(
            vec![
                "Nazwa usługi".into(),
                "Ilość".into(),
                "Cena netto".into(),
                "Wartość netto".into(),
            ],
            vec![vec![
                or_placeholder(&record.service_description),
                "1".into(),
                due.clone(),
                due.clone(),
            ]],
        )
        .with_weights(vec![3.0, 1.0, 1.5, 1.5])
        .with_alignments(vec![
            HorizontalAlignment::Left,
            HorizontalAlignment::Center,
            HorizontalAlignment::Right,
            HorizontalAlignment::Right,
        ]),
    ));

    document.push(Block::Spacer(24.0));
    document.push(Block::Columns(Columns::weighted(
        vec![1.0, 1.2],
        vec![Vec::new(), vec![Block::Panel(summary(&due))]],
    )));

    if let InvoiceKind::Final { advance_amount } = &record.kind {
        document.push(Block::Spacer(20.0));
        document.push(Block::Panel(
            Panel::new(palette::PURPLE, palette::ZINC_900).with_block(Block::Paragraph(
                RichParagraph::new(vec![
                    Span::new("Informacja: ").bold().colored(palette::PURPLE),
                    Span::new("Zaliczka w wysokości "),
                    Span::new(money(*advance_amount)).bold().colored(palette::WHITE),
                    Span::new(" została uiszczona wcześniej. Pozostała kwota do zapłaty: "),
                    Span::new(due.clone()).bold().colored(palette::WHITE),
                ])
                .with_size(13.0),
            )),
        ));
    }

    document.extend(business_footer(context));
    document
}

fn summary(due: &str) -> Panel {
    let row = |label: &str, value: &str, color, size: f32, bold: bool| {
        Block::Columns(Columns::equal(vec![
            vec![Block::text(label, 13.0, palette::ZINC_400)],
            vec![Block::Paragraph(
                RichParagraph::new(vec![Span::new(value).with_bold(bold)])
                    .with_size(size)
                    .with_color(color)
                    .with_alignment(HorizontalAlignment::Right),
            )],
        ]))
    };
    Panel::new(palette::EMERALD, palette::ZINC_900)
        .with_block(row("Wartość netto:", due, palette::WHITE, 16.0, true))
        .with_block(row("VAT:", VAT_EXEMPT, palette::WHITE, 13.0, false))
        .with_block(Block::Rule(palette::BORDER))
        .with_block(row("Razem do zapłaty:", due, palette::EMERALD, 22.0, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn record(kind: InvoiceKind) -> InvoiceRecord {
        InvoiceRecord {
            client_name: "Studio Urody Anna".into(),
            client_address: None,
            invoice_number: "FV/03/2025".into(),
            issue_date: NaiveDate::from_ymd_opt(2025, 3, 14).expect("date"),
            service_description: "Usługi marketingowe Facebook Ads".into(),
            amount: Decimal::from(5000),
            kind,
        }
    }

    fn context() -> RenderContext {
        RenderContext::new(NaiveDate::from_ymd_opt(2025, 3, 14).expect("date"))
    }

    #[test]
    fn final_invoice_shows_remainder_and_note() {
        let document = render(
            &record(InvoiceKind::Final {
                advance_amount: Decimal::from(2000),
            }),
            &context(),
        );
        let text = document.plain_text();
        assert!(text.contains("Faktura Końcowa"));
        assert!(text.contains("3000.00 PLN"));
        assert!(text.contains("2000.00 PLN"));
        assert!(text.contains(VAT_EXEMPT));
        assert!(text.contains("14.03.2025"));
    }

    #[test]
    fn full_invoice_has_no_advance_note() {
        let text = render(&record(InvoiceKind::Full), &context()).plain_text();
        assert!(text.contains("Faktura Pełna"));
        assert!(text.contains("5000.00 PLN"));
        assert!(!text.contains("Zaliczka"));
    }

    #[test]
    fn missing_address_uses_placeholder() {
        let text = render(&record(InvoiceKind::Full), &context()).plain_text();
        assert!(text.contains(crate::model::PLACEHOLDER));
    }
}
