//! Raw form values, their validation, and the submit flow of each generator.
//!
//! Forms hold strings exactly as typed (every field optional on input, so a partially
//! filled JSON file still deserializes).  `validate` collects every problem at once into
//! [`ValidationErrors`] instead of stopping at the first one, mirroring inline field errors.

use std::fmt;

use chrono::NaiveDate;
use log::warn;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::records::{
    parse_decimal, parse_number, CampaignStatus, ContractRecord, InvoiceKind, InvoiceRecord,
    MetricsRecord, Series,
};
use crate::recommend::{default_recommendations, RecommendationSource};

/// Longest accepted client or city name.
pub const MAX_NAME_LENGTH: usize = 100;

/// Service description prefilled on invoices.
pub const DEFAULT_SERVICE_DESCRIPTION: &str = "Usługi marketingowe Facebook Ads";
/// Scope prefilled on contracts.
pub const DEFAULT_SERVICE_SCOPE: &str = "Kampanie reklamowe Facebook Ads dla salonu beauty";
/// Payment terms prefilled on contracts.
pub const DEFAULT_PAYMENT_TERMS: &str = "7 dni od wystawienia faktury";
/// Duration prefilled on contracts.
pub const DEFAULT_CONTRACT_DURATION: &str = "3 miesiące";

const REQUIRED: &str = "Pole wymagane";
const NOT_A_NUMBER: &str = "Wartość musi być liczbą";
const TOO_LONG: &str = "Maksymalnie 100 znaków";
const BAD_SERIES: &str = "Podaj liczby oddzielone przecinkami";
const BAD_DATE: &str = "Nieprawidłowa data";

/// A problem with one form field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Form field name, as used in the JSON input.
    pub field: &'static str,
    /// Message shown next to the field.
    pub message: String,
}

/// Every problem found while validating a form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a problem with `field`.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Returns all collected problems in field order.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Returns the first message recorded for `field`.
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }

    /// Whether no problem was recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self
            .errors
            .iter()
            .map(|error| format!("{}: {}", error.field, error.message))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&fields)
    }
}

impl std::error::Error for ValidationErrors {}

/// What the preview pane shows for the current form values.
#[derive(Clone, Debug, PartialEq)]
pub enum PreviewState<R> {
    /// Nothing submitted yet.
    Empty,
    /// The last submit failed validation.
    Invalid(ValidationErrors),
    /// A record is ready to render and export.
    Ready(R),
}

impl<R> Default for PreviewState<R> {
    fn default() -> Self {
        PreviewState::Empty
    }
}

impl<R> PreviewState<R> {
    /// Moves to `Ready` or `Invalid` depending on the validation outcome.
    pub fn from_validation(result: Result<R, ValidationErrors>) -> Self {
        match result {
            Ok(record) => PreviewState::Ready(record),
            Err(errors) => PreviewState::Invalid(errors),
        }
    }

    /// The ready record, if any.
    pub fn record(&self) -> Option<&R> {
        match self {
            PreviewState::Ready(record) => Some(record),
            _ => None,
        }
    }

    /// Whether the preview can be exported.
    pub fn is_ready(&self) -> bool {
        matches!(self, PreviewState::Ready(_))
    }
}

/// Result of a successful report submit.
#[derive(Clone, Debug, PartialEq)]
pub struct Submission<R> {
    /// The record to render.
    pub record: R,
    /// Non-blocking problems, e.g. the recommendation service being down.
    pub warnings: Vec<String>,
}

struct Checker<'a> {
    errors: &'a mut ValidationErrors,
}

impl<'a> Checker<'a> {
    fn required(&mut self, field: &'static str, value: &str, message: &str) -> bool {
        if value.trim().is_empty() {
            self.errors.add(field, message);
            false
        } else {
            true
        }
    }

    fn name(&mut self, field: &'static str, value: &str, message: &str) {
        if self.required(field, value, message) && value.trim().chars().count() > MAX_NAME_LENGTH {
            self.errors.add(field, TOO_LONG);
        }
    }

    fn number(&mut self, field: &'static str, value: &str) {
        if self.required(field, value, REQUIRED) && parse_number(value).is_none() {
            self.errors.add(field, NOT_A_NUMBER);
        }
    }

    fn decimal(&mut self, field: &'static str, value: &str) -> Option<Decimal> {
        if !self.required(field, value, REQUIRED) {
            return None;
        }
        let parsed = parse_decimal(value);
        if parsed.is_none() {
            self.errors.add(field, NOT_A_NUMBER);
        }
        parsed
    }

    fn optional_number(&mut self, field: &'static str, value: &str) {
        if !value.trim().is_empty() && parse_number(value).is_none() {
            self.errors.add(field, NOT_A_NUMBER);
        }
    }

    fn optional_series(&mut self, field: &'static str, value: &str) {
        if !value.trim().is_empty() && Series::parse(value).is_none() {
            self.errors.add(field, BAD_SERIES);
        }
    }

    fn date(&mut self, field: &'static str, value: &str, today: NaiveDate) -> NaiveDate {
        if value.trim().is_empty() {
            return today;
        }
        parse_date(value).unwrap_or_else(|| {
            self.errors.add(field, BAD_DATE);
            today
        })
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    ["%Y-%m-%d", "%d.%m.%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn or_default(value: &str, default: &str) -> String {
    non_empty(value).unwrap_or_else(|| default.to_owned())
}

/// Report generator form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportForm {
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
    pub campaign_objective: String,
    pub campaign_status: String,
    pub engagement_rate: String,
    pub weekly_reach_data: String,
    pub weekly_clicks_data: String,
    pub daily_bookings_data: String,
    pub recommendations: String,
}

impl ReportForm {
    /// Checks every field and builds the metrics record.
    pub fn validate(&self) -> Result<MetricsRecord, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut check = Checker {
            errors: &mut errors,
        };

        check.name("clientName", &self.client_name, "Nazwa klienta wymagana");
        check.name("city", &self.city, "Miasto salonu wymagane");
        check.required("period", &self.period, REQUIRED);
        for (field, value) in [
            ("budget", &self.budget),
            ("impressions", &self.impressions),
            ("reach", &self.reach),
            ("clicks", &self.clicks),
            ("ctr", &self.ctr),
            ("conversions", &self.conversions),
            ("costPerConversion", &self.cost_per_conversion),
            ("bookings", &self.bookings),
        ] {
            check.number(field, value);
        }
        check.optional_number("engagementRate", &self.engagement_rate);
        check.optional_series("weeklyReachData", &self.weekly_reach_data);
        check.optional_series("weeklyClicksData", &self.weekly_clicks_data);
        check.optional_series("dailyBookingsData", &self.daily_bookings_data);

        let campaign_status = non_empty(&self.campaign_status).and_then(|label| {
            let status = CampaignStatus::from_label(&label);
            if status.is_none() {
                check.errors.add("campaignStatus", "Nieznany status kampanii");
            }
            status
        });

        errors.into_result(|| MetricsRecord {
            client_name: self.client_name.trim().to_owned(),
            city: self.city.trim().to_owned(),
            period: self.period.trim().to_owned(),
            budget: self.budget.trim().to_owned(),
            impressions: self.impressions.trim().to_owned(),
            reach: self.reach.trim().to_owned(),
            clicks: self.clicks.trim().to_owned(),
            ctr: self.ctr.trim().to_owned(),
            conversions: self.conversions.trim().to_owned(),
            cost_per_conversion: self.cost_per_conversion.trim().to_owned(),
            bookings: self.bookings.trim().to_owned(),
            engagement_rate: non_empty(&self.engagement_rate),
            weekly_reach_data: non_empty(&self.weekly_reach_data),
            weekly_clicks_data: non_empty(&self.weekly_clicks_data),
            daily_bookings_data: non_empty(&self.daily_bookings_data),
            recommendations: non_empty(&self.recommendations),
            campaign_objective: non_empty(&self.campaign_objective),
            campaign_status,
        })
    }

    /// Validates the form and completes missing recommendations.
    ///
    /// When the recommendations field is empty the source is asked once; if there is no
    /// source or the request fails, the default bullets are used and a warning is returned
    /// alongside the record.
    pub async fn submit(
        &self,
        source: Option<&dyn RecommendationSource>,
    ) -> Result<Submission<MetricsRecord>, ValidationErrors> {
        let mut record = self.validate()?;
        let mut warnings = Vec::new();

        if record.recommendations_text().is_none() {
            let generated = match source {
                Some(source) => match source.recommend(&record).await {
                    Ok(text) => Some(text),
                    Err(err) => {
                        warn!("Falling back to default recommendations: {}", err);
                        warnings.push(format!(
                            "Nie udało się wygenerować rekomendacji ({}); użyto domyślnych.",
                            err
                        ));
                        None
                    }
                },
                None => None,
            };
            record.recommendations = Some(generated.unwrap_or_else(default_recommendations));
        }

        Ok(Submission { record, warnings })
    }
}

/// Invoice generator form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceForm {
    pub invoice_type: String,
    pub client_name: String,
    pub client_address: String,
    pub invoice_number: String,
    pub issue_date: String,
    pub service_description: String,
    pub amount: String,
    pub advance_amount: String,
}

impl InvoiceForm {
    /// Checks every field and builds the invoice record.
    ///
    /// `today` fills a blank issue date.  A final invoice needs an advance amount.
    pub fn validate(&self, today: NaiveDate) -> Result<InvoiceRecord, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut check = Checker {
            errors: &mut errors,
        };

        check.name("clientName", &self.client_name, "Nazwa klienta wymagana");
        check.required("invoiceNumber", &self.invoice_number, REQUIRED);
        let amount = check.decimal("amount", &self.amount);
        let issue_date = check.date("issueDate", &self.issue_date, today);

        let advance_amount = if self.advance_amount.trim().is_empty() {
            None
        } else {
            let parsed = parse_decimal(&self.advance_amount);
            if parsed.is_none() {
                check.errors.add("advanceAmount", NOT_A_NUMBER);
            }
            parsed
        };

        let kind = match self.invoice_type.trim() {
            "" | "full" => Some(InvoiceKind::Full),
            "advance" => Some(InvoiceKind::Advance { advance_amount }),
            "final" => match advance_amount {
                Some(advance_amount) => Some(InvoiceKind::Final { advance_amount }),
                None => {
                    if self.advance_amount.trim().is_empty() {
                        check
                            .errors
                            .add("advanceAmount", "Kwota zaliczki wymagana dla faktury końcowej");
                    }
                    None
                }
            },
            _ => {
                check.errors.add("invoiceType", "Nieznany typ faktury");
                None
            }
        };

        match (amount, kind) {
            (Some(amount), Some(kind)) if errors.is_empty() => Ok(InvoiceRecord {
                client_name: self.client_name.trim().to_owned(),
                client_address: non_empty(&self.client_address),
                invoice_number: self.invoice_number.trim().to_owned(),
                issue_date,
                service_description: or_default(
                    &self.service_description,
                    DEFAULT_SERVICE_DESCRIPTION,
                ),
                amount,
                kind,
            }),
            _ => Err(errors),
        }
    }
}

/// Contract generator form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContractForm {
    pub client_name: String,
    pub client_address: String,
    #[serde(rename = "clientNIP")]
    pub client_nip: String,
    pub contract_number: String,
    pub sign_date: String,
    pub service_scope: String,
    pub contract_value: String,
    pub payment_terms: String,
    pub contract_duration: String,
}

impl ContractForm {
    /// Checks every field and builds the contract record; blank terms get the defaults.
    pub fn validate(&self, today: NaiveDate) -> Result<ContractRecord, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut check = Checker {
            errors: &mut errors,
        };

        check.name("clientName", &self.client_name, "Nazwa klienta wymagana");
        check.required("contractNumber", &self.contract_number, REQUIRED);
        let contract_value = check.decimal("contractValue", &self.contract_value);
        let sign_date = check.date("signDate", &self.sign_date, today);

        match contract_value {
            Some(contract_value) if errors.is_empty() => Ok(ContractRecord {
                client_name: self.client_name.trim().to_owned(),
                client_address: non_empty(&self.client_address),
                client_nip: non_empty(&self.client_nip),
                contract_number: self.contract_number.trim().to_owned(),
                sign_date,
                service_scope: or_default(&self.service_scope, DEFAULT_SERVICE_SCOPE),
                contract_value,
                payment_terms: or_default(&self.payment_terms, DEFAULT_PAYMENT_TERMS),
                contract_duration: or_default(&self.contract_duration, DEFAULT_CONTRACT_DURATION),
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result as CrateResult};
    use async_trait::async_trait;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 1).expect("date")
    }

    fn report_form() -> ReportForm {
        ReportForm {
            client_name: "Salon Bella".into(),
            city: "Kraków".into(),
            period: "Marzec 2025".into(),
            budget: "2 000".into(),
            impressions: "120000".into(),
            reach: "85,000".into(),
            clicks: "3400".into(),
            ctr: "2.8".into(),
            conversions: "245".into(),
            cost_per_conversion: "8,16".into(),
            bookings: "178".into(),
            ..ReportForm::default()
        }
    }

    struct Fixed(&'static str);

    #[async_trait]
    impl RecommendationSource for Fixed {
        async fn recommend(&self, _record: &MetricsRecord) -> CrateResult<String> {
            Ok(self.0.to_owned())
        }
    }

    struct Broken;

    #[async_trait]
    impl RecommendationSource for Broken {
        async fn recommend(&self, _record: &MetricsRecord) -> CrateResult<String> {
            Err(Error::Recommendation("service answered with status 500".into()))
        }
    }

    #[test]
    fn empty_report_lists_every_required_field() {
        let errors = ReportForm::default().validate().unwrap_err();
        assert_eq!(errors.message_for("clientName"), Some("Nazwa klienta wymagana"));
        assert_eq!(errors.message_for("city"), Some("Miasto salonu wymagane"));
        assert_eq!(errors.message_for("bookings"), Some(REQUIRED));
        assert_eq!(errors.errors().len(), 11);
    }

    #[test]
    fn report_checks_shapes() {
        let mut form = report_form();
        form.client_name = "x".repeat(101);
        form.clicks = "dużo".into();
        form.weekly_reach_data = "1,2,trzy".into();
        form.campaign_status = "Archiwalna".into();
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.message_for("clientName"), Some(TOO_LONG));
        assert_eq!(errors.message_for("clicks"), Some(NOT_A_NUMBER));
        assert_eq!(errors.message_for("weeklyReachData"), Some(BAD_SERIES));
        assert!(errors.message_for("campaignStatus").is_some());
    }

    #[test]
    fn preview_moves_to_ready_after_validation() {
        let state: PreviewState<MetricsRecord> = PreviewState::default();
        assert!(!state.is_ready());
        let state = PreviewState::from_validation(report_form().validate());
        assert!(state.is_ready());
        assert_eq!(state.record().map(|r| r.city.as_str()), Some("Kraków"));
        let state = PreviewState::from_validation(ReportForm::default().validate());
        assert!(matches!(state, PreviewState::Invalid(_)));
    }

    #[tokio::test]
    async fn submit_uses_generated_recommendations() {
        let source = Fixed("Zwiększ budżet w weekendy");
        let submission = report_form().submit(Some(&source)).await.expect("valid form");
        assert_eq!(
            submission.record.recommendations.as_deref(),
            Some("Zwiększ budżet w weekendy")
        );
        assert!(submission.warnings.is_empty());
    }

    #[tokio::test]
    async fn submit_falls_back_when_the_service_fails() {
        let submission = report_form().submit(Some(&Broken)).await.expect("valid form");
        assert_eq!(
            submission.record.recommendations,
            Some(default_recommendations())
        );
        assert_eq!(submission.warnings.len(), 1);
    }

    #[tokio::test]
    async fn submit_keeps_typed_recommendations() {
        let mut form = report_form();
        form.recommendations = "Własna rada".into();
        let submission = form.submit(Some(&Broken)).await.expect("valid form");
        assert_eq!(submission.record.recommendations.as_deref(), Some("Własna rada"));
        assert!(submission.warnings.is_empty());
    }

    #[test]
    fn final_invoice_requires_advance() {
        let form = InvoiceForm {
            invoice_type: "final".into(),
            client_name: "Salon Bella".into(),
            invoice_number: "FV/1".into(),
            amount: "5000".into(),
            ..InvoiceForm::default()
        };
        let errors = form.validate(today()).unwrap_err();
        assert!(errors.message_for("advanceAmount").is_some());
    }

    #[test]
    fn invoice_defaults_are_filled() {
        let form = InvoiceForm {
            client_name: "Salon Bella".into(),
            invoice_number: "FV/1".into(),
            amount: "1 500,50".into(),
            ..InvoiceForm::default()
        };
        let record = form.validate(today()).expect("valid invoice");
        assert_eq!(record.kind, InvoiceKind::Full);
        assert_eq!(record.issue_date, today());
        assert_eq!(record.service_description, DEFAULT_SERVICE_DESCRIPTION);
        assert_eq!(record.amount, Decimal::new(150050, 2));
    }

    #[test]
    fn invoice_accepts_polish_dates() {
        let form = InvoiceForm {
            client_name: "Salon Bella".into(),
            invoice_number: "FV/1".into(),
            amount: "100".into(),
            issue_date: "05.03.2025".into(),
            ..InvoiceForm::default()
        };
        let record = form.validate(today()).expect("valid invoice");
        assert_eq!(record.issue_date, NaiveDate::from_ymd_opt(2025, 3, 5).expect("date"));
    }

    #[test]
    fn unknown_invoice_type_is_rejected() {
        let form = InvoiceForm {
            invoice_type: "proforma".into(),
            client_name: "Salon Bella".into(),
            invoice_number: "FV/1".into(),
            amount: "100".into(),
            ..InvoiceForm::default()
        };
        let errors = form.validate(today()).unwrap_err();
        assert!(errors.message_for("invoiceType").is_some());
    }

    #[test]
    fn contract_defaults_are_filled() {
        let form = ContractForm {
            client_name: "Salon Bella".into(),
            contract_number: "UM/1".into(),
            contract_value: "4500".into(),
            ..ContractForm::default()
        };
        let record = form.validate(today()).expect("valid contract");
        assert_eq!(record.payment_terms, DEFAULT_PAYMENT_TERMS);
        assert_eq!(record.contract_duration, DEFAULT_CONTRACT_DURATION);
        assert_eq!(record.service_scope, DEFAULT_SERVICE_SCOPE);
        assert_eq!(record.client_nip, None);
    }

    #[test]
    fn contract_value_must_be_numeric() {
        let form = ContractForm {
            client_name: "Salon Bella".into(),
            contract_number: "UM/1".into(),
            contract_value: "dużo".into(),
            ..ContractForm::default()
        };
        let errors = form.validate(today()).unwrap_err();
        assert_eq!(errors.message_for("contractValue"), Some(NOT_A_NUMBER));
    }

    #[test]
    fn forms_deserialize_from_partial_json() {
        let form: InvoiceForm =
            serde_json::from_str(r#"{"invoiceType":"advance","amount":"100"}"#).expect("json");
        assert_eq!(form.invoice_type, "advance");
        assert!(form.client_name.is_empty());
    }
}
