use crate::model::{
    palette, Block, Columns, Document, HorizontalAlignment, Orientation, Panel, RichParagraph,
};
use crate::records::{format_date, ContractRecord};
use crate::richtext::Span;

use super::{
    agency_header, business_footer, document_badge, header_row, money, opt_or_placeholder,
    or_placeholder, running_footer, RenderContext,
};

/// Fixed closing clauses of every contract.
pub const CLAUSES: [&str; 4] = [
    "§1 Zleceniobiorca zobowiązuje się do wykonania usług marketingowych zgodnie z najlepszą wiedzą i praktyką branżową.",
    "§2 Wszelkie zmiany umowy wymagają formy pisemnej pod rygorem nieważności.",
    "§3 W sprawach nieuregulowanych niniejszą umową mają zastosowanie przepisy Kodeksu Cywilnego.",
    "§4 Ewentualne spory będą rozstrzygane przez sąd właściwy dla siedziby Zleceniobiorcy.",
];

/// Builds the portrait contract.
pub fn render(record: &ContractRecord, context: &RenderContext) -> Document {
    let agency = &context.agency;
    let mut document = Document::new(
        format!("Umowa {}", or_placeholder(&record.contract_number)),
        Orientation::Portrait.layout(),
    )
    .with_footer(running_footer(context));

    document.push(header_row(
        agency_header(context, true),
        document_badge("Umowa Marketingowa", &record.contract_number, palette::ROSE),
    ));
    document.push(Block::Spacer(16.0));
    document.push(Block::Rule(palette::BORDER));
    document.push(Block::Spacer(24.0));

    document.push(Block::Paragraph(
        RichParagraph::new(vec![Span::new("UMOWA O ŚWIADCZENIE USŁUG MARKETINGOWYCH").bold()])
            .with_size(22.0)
            .with_color(palette::PINK)
            .with_alignment(HorizontalAlignment::Center),
    ));
    document.push(Block::Paragraph(
        RichParagraph::plain(format!("zawarta w dniu {}", format_date(record.sign_date)))
            .with_size(13.0)
            .with_color(palette::ZINC_400)
            .with_alignment(HorizontalAlignment::Center),
    ));
    document.push(Block::Spacer(24.0));

    let client_nip = record
        .client_nip
        .as_deref()
        .map(|nip| format!("NIP: {}", or_placeholder(nip)));
    document.push(Block::Columns(Columns::equal(vec![
        vec![party(
            "ZLECENIODAWCA:",
            palette::PINK,
            or_placeholder(&record.client_name),
            vec![
                opt_or_placeholder(record.client_address.as_deref()),
                opt_or_placeholder(client_nip.as_deref()),
            ],
        )],
        vec![party(
            "ZLECENIOBIORCA:",
            palette::PURPLE,
            agency.name.clone(),
            vec![
                format!("{}, {}", agency.street, agency.postal_city),
                format!("NIP: {}", agency.nip),
            ],
        )],
    ])));

    document.push(Block::Spacer(24.0));
    document.push(Block::Panel(
        Panel::new(palette::BORDER, palette::ZINC_900)
            .with_title("Przedmiot umowy")
            .with_block(Block::text(
                or_placeholder(&record.service_scope),
                14.0,
                palette::SLATE_300,
            )),
    ));

    document.push(Block::Spacer(16.0));
    document.push(Block::Columns(Columns::equal(vec![
        vec![term(
            "Wartość umowy",
            Span::new(money(record.contract_value)).bold().colored(palette::EMERALD),
            Some("netto, zwolnione z VAT"),
        )],
        vec![term(
            "Warunki płatności",
            Span::new(or_placeholder(&record.payment_terms)),
            None,
        )],
        vec![term(
            "Czas trwania",
            Span::new(or_placeholder(&record.contract_duration)),
            None,
        )],
    ])));

    document.push(Block::Spacer(24.0));
    document.push(Block::heading("Postanowienia końcowe", 18.0));
    document.push(Block::Spacer(8.0));
    for clause in CLAUSES {
        document.push(Block::text(clause, 12.0, palette::ZINC_400));
        document.push(Block::Spacer(4.0));
    }

    document.push(Block::Spacer(48.0));
    document.push(Block::Columns(Columns::equal(vec![
        signature("Podpis Zleceniodawcy"),
        signature("Podpis Zleceniobiorcy"),
    ])));

    document.extend(business_footer(context));
    document
}

fn party(title: &str, accent: crate::model::Color, name: String, lines: Vec<String>) -> Block {
    let mut panel = Panel::new(accent, palette::ZINC_900)
        .with_title(title)
        .with_block(Block::Paragraph(
            RichParagraph::new(vec![Span::new(name).bold()])
                .with_size(15.0)
                .with_color(palette::WHITE),
        ));
    for line in lines {
        panel = panel.with_block(Block::text(line, 12.0, palette::ZINC_400));
    }
    Block::Panel(panel)
}

fn term(title: &str, value: Span, note: Option<&str>) -> Block {
    let mut panel = Panel::new(palette::BORDER, palette::ZINC_900)
        .with_title(title)
        .with_block(Block::Paragraph(
            RichParagraph::new(vec![value])
                .with_size(15.0)
                .with_color(palette::SLATE_300),
        ));
    if let Some(note) = note {
        panel = panel.with_block(Block::text(note, 11.0, palette::ZINC_400));
    }
    Block::Panel(panel)
}

fn signature(label: &str) -> Vec<Block> {
    let centered = |text: &str, size: f32| {
        Block::Paragraph(
            RichParagraph::plain(text)
                .with_size(size)
                .with_color(palette::SLATE_500)
                .with_alignment(HorizontalAlignment::Center),
        )
    };
    vec![centered(label, 12.0), Block::Spacer(24.0), centered("________________________", 11.0)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn record() -> ContractRecord {
        ContractRecord {
            client_name: "Salon Bella".into(),
            client_address: Some("ul. Różana 5, Kraków".into()),
            client_nip: None,
            contract_number: "UM/2025/01".into(),
            sign_date: NaiveDate::from_ymd_opt(2025, 1, 9).expect("date"),
            service_scope: "Prowadzenie kampanii Facebook Ads".into(),
            contract_value: Decimal::new(15005, 1),
            payment_terms: "7 dni od wystawienia faktury".into(),
            contract_duration: "3 miesiące".into(),
        }
    }

    #[test]
    fn contract_lists_every_clause() {
        let context = RenderContext::new(NaiveDate::from_ymd_opt(2025, 1, 9).expect("date"));
        let text = render(&record(), &context).plain_text();
        for clause in CLAUSES {
            assert!(text.contains(clause));
        }
        assert!(text.contains("1500.50 PLN"));
        assert!(text.contains("zawarta w dniu 09.01.2025"));
    }

    #[test]
    fn missing_nip_renders_placeholder() {
        let context = RenderContext::new(NaiveDate::from_ymd_opt(2025, 1, 9).expect("date"));
        let text = render(&record(), &context).plain_text();
        assert!(text.contains(crate::model::PLACEHOLDER));
    }
}
