//! Validated records describing one report, invoice or contract.
//!
//! Report metrics stay strings exactly as entered so the document shows what the user typed;
//! they are parsed lazily with [`parse_number`] when a template needs a value.  Invoice and
//! contract money is held as [`Decimal`] so amounts never pick up binary rounding noise.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use log::warn;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ratio shown when the conversion efficiency cannot be computed.
pub const DEFAULT_CONVERSION_EFFICIENCY: f64 = 72.0;

/// Engagement shown when the record has no engagement rate.
pub const DEFAULT_ENGAGEMENT_RATE: f64 = 65.0;

/// Lifecycle state of the advertised campaign.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CampaignStatus {
    /// Still running.
    #[serde(rename = "Aktywna")]
    Active,
    /// Finished.
    #[serde(rename = "Zakończona")]
    Finished,
    /// Temporarily halted.
    #[serde(rename = "Wstrzymana")]
    Paused,
    /// Not started yet.
    #[serde(rename = "Planowana")]
    Planned,
}

impl CampaignStatus {
    /// Every status in display order.
    pub const ALL: [CampaignStatus; 4] = [
        CampaignStatus::Active,
        CampaignStatus::Finished,
        CampaignStatus::Paused,
        CampaignStatus::Planned,
    ];

    /// Polish label used in forms and documents.
    pub fn label(self) -> &'static str {
        match self {
            CampaignStatus::Active => "Aktywna",
            CampaignStatus::Finished => "Zakończona",
            CampaignStatus::Paused => "Wstrzymana",
            CampaignStatus::Planned => "Planowana",
        }
    }

    /// Looks a status up by its label, ignoring case.
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.label().to_lowercase() == wanted)
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Campaign metrics feeding the report template.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsRecord {
    pub client_name: String,
    pub city: String,
    pub period: String,
    pub budget: String,
    pub impressions: String,
    pub reach: String,
    pub clicks: String,
    pub ctr: String,
    pub conversions: String,
    pub cost_per_conversion: String,
    pub bookings: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement_rate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_reach_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_clicks_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_bookings_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_objective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_status: Option<CampaignStatus>,
}

impl MetricsRecord {
    /// Bookings per conversion in percent, rounded to two decimals.
    ///
    /// Falls back to [`DEFAULT_CONVERSION_EFFICIENCY`] when either number is missing or there
    /// were no conversions.
    pub fn conversion_efficiency(&self) -> f64 {
        match (parse_number(&self.bookings), parse_number(&self.conversions)) {
            (Some(bookings), Some(conversions)) if conversions > 0.0 => {
                (bookings / conversions * 10_000.0).round() / 100.0
            }
            _ => DEFAULT_CONVERSION_EFFICIENCY,
        }
    }

    /// Engagement rate in percent, or [`DEFAULT_ENGAGEMENT_RATE`].
    pub fn engagement(&self) -> f64 {
        self.engagement_rate
            .as_deref()
            .and_then(parse_number)
            .unwrap_or(DEFAULT_ENGAGEMENT_RATE)
    }

    /// Weekly reach values, if entered and valid.
    pub fn weekly_reach(&self) -> Option<Series> {
        self.weekly_reach_data.as_deref().and_then(Series::parse)
    }

    /// Weekly click values, if entered and valid.
    pub fn weekly_clicks(&self) -> Option<Series> {
        self.weekly_clicks_data.as_deref().and_then(Series::parse)
    }

    /// Bookings per weekday, if entered and valid.
    pub fn daily_bookings(&self) -> Option<Series> {
        self.daily_bookings_data.as_deref().and_then(Series::parse)
    }

    /// Recommendation text when it holds anything besides whitespace.
    pub fn recommendations_text(&self) -> Option<&str> {
        self.recommendations
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

/// A parsed list of chart values.
#[derive(Clone, Debug, PartialEq)]
pub struct Series(Vec<f64>);

impl Series {
    /// Parses a `,` or `;` separated list.
    ///
    /// Returns `None` for blank input or when any element is not a number, so a typo never
    /// produces a half-drawn chart.
    pub fn parse(input: &str) -> Option<Self> {
        if input.trim().is_empty() {
            return None;
        }
        input
            .split(|c| c == ',' || c == ';')
            .map(|part| parse_number(part).filter(|value| *value >= 0.0))
            .collect::<Option<Vec<_>>>()
            .map(Series)
    }

    /// The values in input order.
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the series holds no values.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<f64>> for Series {
    fn from(values: Vec<f64>) -> Self {
        Series(values)
    }
}

/// The three invoice kinds together with the data each one needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "invoiceType", rename_all = "lowercase")]
pub enum InvoiceKind {
    /// Advance payment; the amount billed now may differ from the contract total.
    Advance {
        #[serde(
            rename = "advanceAmount",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        advance_amount: Option<Decimal>,
    },
    /// Settlement of the remainder after an earlier advance.
    Final {
        #[serde(rename = "advanceAmount")]
        advance_amount: Decimal,
    },
    /// Single invoice for the whole amount.
    Full,
}

impl InvoiceKind {
    /// Machine name used in forms and file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceKind::Advance { .. } => "advance",
            InvoiceKind::Final { .. } => "final",
            InvoiceKind::Full => "full",
        }
    }

    /// Document title printed on the invoice.
    pub fn title(&self) -> &'static str {
        match self {
            InvoiceKind::Advance { .. } => "Faktura Zaliczkowa",
            InvoiceKind::Final { .. } => "Faktura Końcowa",
            InvoiceKind::Full => "Faktura Pełna",
        }
    }
}

/// A billable invoice.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    pub client_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_address: Option<String>,
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub service_description: String,
    pub amount: Decimal,
    #[serde(flatten)]
    pub kind: InvoiceKind,
}

impl InvoiceRecord {
    /// The amount due on this invoice.
    ///
    /// A final invoice whose advance exceeds the total yields a negative remainder; it is
    /// shown as is and logged.
    pub fn displayed_amount(&self) -> Decimal {
        match &self.kind {
            InvoiceKind::Advance { advance_amount } => advance_amount.unwrap_or(self.amount),
            InvoiceKind::Final { advance_amount } => {
                let remainder = self.amount - *advance_amount;
                if remainder.is_sign_negative() && !remainder.is_zero() {
                    warn!(
                        "Invoice {}: advance {} exceeds total {}, remainder is negative",
                        self.invoice_number, advance_amount, self.amount
                    );
                }
                remainder
            }
            InvoiceKind::Full => self.amount,
        }
    }
}

/// A service agreement between the agency and a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRecord {
    pub client_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_address: Option<String>,
    #[serde(rename = "clientNIP", default, skip_serializing_if = "Option::is_none")]
    pub client_nip: Option<String>,
    pub contract_number: String,
    pub sign_date: NaiveDate,
    pub service_scope: String,
    pub contract_value: Decimal,
    pub payment_terms: String,
    pub contract_duration: String,
}

/// Formats money with exactly two decimals, e.g. `3000.00`.
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

/// Formats a date the Polish way, `dd.mm.yyyy`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Parses a number typed by a person.
///
/// Accepts surrounding and embedded whitespace (including non-breaking spaces), a trailing
/// `%`, thousands separators (`5,000`, `150 000`, `1.234.567`) and a decimal comma (`20,41`).
/// A lone comma followed by exactly three digits is read as a thousands separator; a lone dot
/// is always the decimal point.
pub fn parse_number(input: &str) -> Option<f64> {
    normalize_number(input)?
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Same rules as [`parse_number`] but keeps the exact decimal value.
pub fn parse_decimal(input: &str) -> Option<Decimal> {
    Decimal::from_str(&normalize_number(input)?).ok()
}

fn normalize_number(input: &str) -> Option<String> {
    let mut compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.ends_with('%') {
        compact.pop();
    }
    if compact.is_empty() {
        return None;
    }

    let (sign, digits) = match compact.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", compact.as_str()),
    };
    if digits.is_empty()
        || !digits
            .chars()
            .all(|c| c.is_ascii_digit() || c == ',' || c == '.')
    {
        return None;
    }

    let commas = digits.matches(',').count();
    let dots = digits.matches('.').count();
    let normalized = match (commas, dots) {
        (0, 0) => digits.to_owned(),
        (_, 0) => split_separators(digits, ',')?,
        (0, 1) => digits.to_owned(),
        (0, _) => split_separators(digits, '.')?,
        _ => {
            // both present: the last one is the decimal point
            let last_comma = digits.rfind(',')?;
            let last_dot = digits.rfind('.')?;
            let (thousands, decimal) = if last_dot > last_comma {
                (',', '.')
            } else {
                ('.', ',')
            };
            let (integer, fraction) = digits.rsplit_once(decimal)?;
            if fraction.contains(thousands) || !valid_groups(integer, thousands) {
                return None;
            }
            format!("{}.{}", integer.replace(thousands, ""), fraction)
        }
    };
    Some(format!("{}{}", sign, normalized))
}

fn split_separators(digits: &str, separator: char) -> Option<String> {
    if valid_groups(digits, separator) {
        return Some(digits.replace(separator, ""));
    }
    let (integer, fraction) = digits.split_once(separator)?;
    if fraction.contains(separator) || integer.is_empty() && fraction.is_empty() {
        return None;
    }
    Some(format!("{}.{}", integer, fraction))
}

fn valid_groups(digits: &str, separator: char) -> bool {
    let mut groups = digits.split(separator);
    let head = groups.next().unwrap_or_default();
    let mut rest = groups.peekable();
    if rest.peek().is_none() {
        return !head.is_empty();
    }
    (1..=3).contains(&head.len()) && rest.all(|group| group.len() == 3)
}
