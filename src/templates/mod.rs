//! Pure mappings from a record to a [`Document`](crate::model::Document).
//!
//! Each template receives the record plus a [`RenderContext`] carrying everything that is not
//! part of the record (generation date, agency details, logo).  Templates never fail and never
//! print an empty value: missing data is rendered as [`PLACEHOLDER`].

pub mod contract;
pub mod invoice;
pub mod report;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::model::{
    palette, Block, Columns, HorizontalAlignment, ImageBlock, ImageSource, Orientation,
    RichParagraph, PLACEHOLDER,
};
use crate::records::format_amount;
use crate::richtext::Span;

/// Contact and registration details printed on every document.
#[derive(Clone, Debug, PartialEq)]
pub struct AgencyProfile {
    pub name: String,
    pub tagline: String,
    pub street: String,
    pub postal_city: String,
    pub nip: String,
    pub website: String,
    pub report_website: String,
    pub email: String,
    pub phone: String,
}

impl Default for AgencyProfile {
    fn default() -> Self {
        Self {
            name: "Aurine Agency".into(),
            tagline: "Digital Marketing Excellence".into(),
            street: "ul. Przykładowa 123".into(),
            postal_city: "00-000 Warszawa".into(),
            nip: "1234567890".into(),
            website: "aurine.pl".into(),
            report_website: "aurine-agency.com".into(),
            email: "kontakt@aurine-agency.com".into(),
            phone: "+48 731 856 524".into(),
        }
    }
}

/// Inputs shared by every template besides the record itself.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderContext {
    /// Date printed as the generation date.
    pub generated_on: NaiveDate,
    /// Agency details.
    pub agency: AgencyProfile,
    /// Optional logo drawn in document headers.
    pub logo: Option<ImageSource>,
}

impl RenderContext {
    /// Context for the default agency without a logo.
    pub fn new(generated_on: NaiveDate) -> Self {
        Self {
            generated_on,
            agency: AgencyProfile::default(),
            logo: None,
        }
    }

    /// Context dated today in local time.
    pub fn today() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }

    /// Sets the logo and returns the updated context.
    pub fn with_logo(mut self, logo: ImageSource) -> Self {
        self.logo = Some(logo);
        self
    }
}

/// Fails for document types that only exist in portrait.
pub fn require_portrait(orientation: Orientation, document: &str) -> Result<()> {
    match orientation {
        Orientation::Portrait => Ok(()),
        Orientation::Landscape => Err(Error::Unsupported(format!(
            "{} is only available in the portrait layout",
            document
        ))),
    }
}

/// Returns the trimmed value, or the placeholder glyph when it is blank.
pub fn or_placeholder(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        PLACEHOLDER.to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// Same as [`or_placeholder`] for optional values.
pub fn opt_or_placeholder(value: Option<&str>) -> String {
    or_placeholder(value.unwrap_or_default())
}

pub(crate) fn money(amount: Decimal) -> String {
    format!("{} PLN", format_amount(amount))
}

// Logo (when present) or the agency name, followed by the address lines.
pub(crate) fn agency_header(context: &RenderContext, with_address: bool) -> Vec<Block> {
    let agency = &context.agency;
    let mut blocks = Vec::new();
    match &context.logo {
        Some(logo) => blocks.push(Block::Image(ImageBlock::new(logo.clone(), 160.0, 48.0))),
        None => blocks.push(Block::Heading {
            text: agency.name.clone(),
            size: 26.0,
            color: palette::PINK,
        }),
    }
    if with_address {
        blocks.push(Block::Paragraph(
            RichParagraph::new(vec![Span::new(agency.name.clone()).bold()])
                .with_size(12.0)
                .with_color(palette::WHITE),
        ));
        for line in [
            agency.street.clone(),
            agency.postal_city.clone(),
            format!("NIP: {}", agency.nip),
        ] {
            blocks.push(Block::text(line, 12.0, palette::ZINC_400));
        }
    } else {
        blocks.push(Block::text(agency.tagline.clone(), 12.0, palette::SLATE_400));
    }
    blocks
}

// Right-aligned document label and number shown opposite the agency header.
pub(crate) fn document_badge(label: &str, number: &str, accent: crate::model::Color) -> Vec<Block> {
    vec![
        Block::Paragraph(
            RichParagraph::new(vec![Span::new(label).bold()])
                .with_size(14.0)
                .with_color(accent)
                .with_alignment(HorizontalAlignment::Right),
        ),
        Block::Paragraph(
            RichParagraph::new(vec![Span::new(or_placeholder(number)).bold()])
                .with_size(24.0)
                .with_color(palette::WHITE)
                .with_alignment(HorizontalAlignment::Right),
        ),
    ]
}

pub(crate) fn header_row(left: Vec<Block>, right: Vec<Block>) -> Block {
    Block::Columns(Columns::weighted(vec![1.3, 1.0], vec![left, right]))
}

// Footer of invoices and contracts.
pub(crate) fn business_footer(context: &RenderContext) -> Vec<Block> {
    let agency = &context.agency;
    let centered = |text: String, size: f32, color| {
        Block::Paragraph(
            RichParagraph::plain(text)
                .with_size(size)
                .with_color(color)
                .with_alignment(HorizontalAlignment::Center),
        )
    };
    vec![
        Block::Spacer(24.0),
        Block::Rule(palette::BORDER),
        Block::Spacer(12.0),
        Block::Paragraph(
            RichParagraph::new(vec![Span::new("Powered by Aurine").bold()])
                .with_size(12.0)
                .with_color(palette::PINK)
                .with_alignment(HorizontalAlignment::Center),
        ),
        centered(
            format!(
                "© {} {} · Kampanie Facebook ads dla salonów beauty",
                context.generated_on.year(),
                agency.name
            ),
            10.0,
            palette::SLATE_500,
        ),
        centered(
            format!("{} · {}", agency.website, agency.phone),
            10.0,
            palette::SLATE_500,
        ),
    ]
}

// Running footer used by paginating backends.
pub(crate) fn running_footer(context: &RenderContext) -> String {
    format!("{} · {}", context.agency.name, context.agency.website)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_become_placeholders() {
        assert_eq!(or_placeholder("   "), PLACEHOLDER);
        assert_eq!(or_placeholder(" Kraków "), "Kraków");
        assert_eq!(opt_or_placeholder(None), PLACEHOLDER);
    }

    #[test]
    fn landscape_is_rejected_for_portrait_only_documents() {
        assert!(require_portrait(Orientation::Portrait, "invoice").is_ok());
        let err = require_portrait(Orientation::Landscape, "invoice").unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[test]
    fn logo_replaces_the_agency_heading() {
        let context = RenderContext::new(NaiveDate::from_ymd_opt(2025, 1, 2).expect("date"))
            .with_logo(ImageSource::from_path("logo.png"));
        let blocks = agency_header(&context, false);
        assert!(matches!(blocks[0], Block::Image(_)));
    }
}
