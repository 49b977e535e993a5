//! Download file names.

use chrono::Datelike;

use crate::model::Orientation;
use crate::records::{ContractRecord, InvoiceRecord, MetricsRecord};

use super::ExportFormat;

const FALLBACK_NAME: &str = "dokument";

const MONTHS: [(&str, &str); 18] = [
    ("styczeń", "01"),
    ("styczen", "01"),
    ("luty", "02"),
    ("marzec", "03"),
    ("kwiecień", "04"),
    ("kwiecien", "04"),
    ("maj", "05"),
    ("czerwiec", "06"),
    ("lipiec", "07"),
    ("sierpień", "08"),
    ("sierpien", "08"),
    ("wrzesień", "09"),
    ("wrzesien", "09"),
    ("październik", "10"),
    ("pazdziernik", "10"),
    ("listopad", "11"),
    ("grudzień", "12"),
    ("grudzien", "12"),
];

/// Lowercases, joins whitespace runs with `-` and drops everything outside `[a-z0-9-]`.
///
/// Falls back to a generic name when nothing survives.
pub fn sanitize(name: &str) -> String {
    let sanitized: String = name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect();
    if sanitized.is_empty() {
        FALLBACK_NAME.to_owned()
    } else {
        sanitized
    }
}

/// Turns a period such as `"Listopad 2025"` into `"2025-11"`.
///
/// Unknown months become `01`; a missing four-digit year becomes `current_year`.
pub fn period_code(period: &str, current_year: i32) -> String {
    let mut month = "01";
    let mut year = current_year.to_string();
    for part in period.to_lowercase().split_whitespace() {
        if let Some((_, code)) = MONTHS.iter().find(|(name, _)| *name == part) {
            month = *code;
        }
        if part.len() == 4 && part.chars().all(|c| c.is_ascii_digit()) {
            year = part.to_owned();
        }
    }
    format!("{}-{}", year, month)
}

fn current_year() -> i32 {
    chrono::Local::now().year()
}

/// File name of an exported report.
pub fn report_file_name(
    record: &MetricsRecord,
    orientation: Orientation,
    format: ExportFormat,
) -> String {
    report_file_name_in(record, orientation, format, current_year())
}

/// [`report_file_name`] with an explicit fallback year.
pub fn report_file_name_in(
    record: &MetricsRecord,
    orientation: Orientation,
    format: ExportFormat,
    current_year: i32,
) -> String {
    let stem = format!(
        "{}-{}",
        period_code(&record.period, current_year),
        sanitize(&record.client_name)
    );
    match (format, orientation) {
        (ExportFormat::Pdf, Orientation::Portrait) => format!("{}-pionowy.pdf", stem),
        (ExportFormat::Pdf, Orientation::Landscape) => format!("{}-16-9.pdf", stem),
        (ExportFormat::Png, Orientation::Portrait) => format!("{}-pionowy.png", stem),
        (ExportFormat::Png, Orientation::Landscape) => format!("{}.png", stem),
    }
}

/// File name of an exported invoice.
pub fn invoice_file_name(record: &InvoiceRecord, format: ExportFormat) -> String {
    format!(
        "faktura-{}-{}-{}.{}",
        record.kind.as_str(),
        sanitize(&record.invoice_number),
        sanitize(&record.client_name),
        format.extension()
    )
}

/// File name of an exported contract.
pub fn contract_file_name(record: &ContractRecord, format: ExportFormat) -> String {
    format!(
        "umowa-{}-{}.{}",
        sanitize(&record.contract_number),
        sanitize(&record.client_name),
        format.extension()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::InvoiceKind;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    #[test]
    fn sanitize_follows_the_download_rules() {
        assert_eq!(sanitize("Salon  Bella Beauty"), "salon-bella-beauty");
        assert_eq!(sanitize("Studio Urody \"Anna\"!"), "studio-urody-anna");
        assert_eq!(sanitize("Łódź"), "d");
        assert_eq!(sanitize("!!!"), FALLBACK_NAME);
    }

    #[test]
    fn period_codes() {
        assert_eq!(period_code("Listopad 2025", 2030), "2025-11");
        assert_eq!(period_code("październik 2024", 2030), "2024-10");
        assert_eq!(period_code("Pazdziernik", 2030), "2030-10");
        assert_eq!(period_code("Q3 2024", 2030), "2024-01");
    }

    #[test]
    fn report_names_per_variant() {
        let record = MetricsRecord {
            client_name: "Salon Bella".into(),
            period: "Marzec 2025".into(),
            ..MetricsRecord::default()
        };
        let name = |orientation, format| report_file_name_in(&record, orientation, format, 2030);
        assert_eq!(
            name(Orientation::Portrait, ExportFormat::Pdf),
            "2025-03-salon-bella-pionowy.pdf"
        );
        assert_eq!(
            name(Orientation::Landscape, ExportFormat::Pdf),
            "2025-03-salon-bella-16-9.pdf"
        );
        assert_eq!(name(Orientation::Landscape, ExportFormat::Png), "2025-03-salon-bella.png");
        assert_eq!(
            name(Orientation::Portrait, ExportFormat::Png),
            "2025-03-salon-bella-pionowy.png"
        );
    }

    #[test]
    fn invoice_and_contract_names() {
        let invoice = InvoiceRecord {
            client_name: "Salon Bella".into(),
            client_address: None,
            invoice_number: "FV/03/2025".into(),
            issue_date: NaiveDate::from_ymd_opt(2025, 3, 1).expect("date"),
            service_description: "Facebook Ads".into(),
            amount: Decimal::from(100),
            kind: InvoiceKind::Full,
        };
        assert_eq!(
            invoice_file_name(&invoice, ExportFormat::Pdf),
            "faktura-full-fv032025-salon-bella.pdf"
        );

        let contract = ContractRecord {
            client_name: "Salon Bella".into(),
            client_address: None,
            client_nip: None,
            contract_number: "UM 7".into(),
            sign_date: NaiveDate::from_ymd_opt(2025, 3, 1).expect("date"),
            service_scope: String::new(),
            contract_value: Decimal::from(100),
            payment_terms: String::new(),
            contract_duration: String::new(),
        };
        assert_eq!(
            contract_file_name(&contract, ExportFormat::Pdf),
            "umowa-um-7-salon-bella.pdf"
        );
    }
}
