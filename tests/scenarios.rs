use std::thread;
use std::time::Duration;

use aurine_docs::charts::Chart;
use aurine_docs::forms::{InvoiceForm, ReportForm};
use aurine_docs::model::{Block, Orientation};
use aurine_docs::recommend::{HttpRecommendationClient, DEFAULT_RECOMMENDATIONS};
use aurine_docs::records::format_amount;
use aurine_docs::templates::{invoice, report, RenderContext};
use chrono::NaiveDate;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 30).expect("valid date")
}

fn report_form() -> ReportForm {
    ReportForm {
        client_name: "Salon Bella".into(),
        city: "Kraków".into(),
        period: "Listopad 2025".into(),
        budget: "3 500".into(),
        impressions: "180000".into(),
        reach: "85000".into(),
        clicks: "3500".into(),
        ctr: "1,94".into(),
        conversions: "245".into(),
        cost_per_conversion: "14.29".into(),
        bookings: "178".into(),
        ..ReportForm::default()
    }
}

fn line_charts(document: &aurine_docs::model::Document) -> Vec<aurine_docs::charts::LineChart> {
    let mut charts = Vec::new();
    document.visit_blocks(&mut |block| {
        if let Block::Chart(panel) = block {
            if let Some(Chart::Line(chart)) = &panel.chart {
                charts.push(chart.clone());
            }
        }
    });
    charts
}

#[tokio::test]
async fn report_shows_conversion_efficiency() {
    let submission = report_form().submit(None).await.expect("valid form");
    assert!((submission.record.conversion_efficiency() - 72.65).abs() < 1e-9);

    let document = report::render(
        &submission.record,
        Orientation::Portrait,
        &RenderContext::new(today()),
    );
    assert!(document.plain_text().contains("72.65%"));
}

#[test]
fn final_invoice_shows_the_remainder() {
    let form = InvoiceForm {
        invoice_type: "final".into(),
        client_name: "Salon Bella".into(),
        invoice_number: "FV/11/2025".into(),
        amount: "5000".into(),
        advance_amount: "2000".into(),
        ..InvoiceForm::default()
    };
    let record = form.validate(today()).expect("valid invoice");
    assert_eq!(format_amount(record.displayed_amount()), "3000.00");

    let document = invoice::render(&record, &RenderContext::new(today()));
    assert!(document.plain_text().contains("3000.00"));
}

#[tokio::test]
async fn failing_service_falls_back_to_default_bullets() {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("bind test server");
    let addr = server.server_addr();
    let handle = thread::spawn(move || {
        if let Ok(request) = server.recv() {
            let response =
                tiny_http::Response::from_string("{\"error\":\"boom\"}").with_status_code(500);
            let _ = request.respond(response);
        }
    });

    let client = HttpRecommendationClient::with_timeout(
        format!("http://{}/recommend", addr),
        Duration::from_secs(5),
    )
    .expect("client");
    let submission = report_form()
        .submit(Some(&client))
        .await
        .expect("submission still succeeds");
    handle.join().expect("server thread");

    let text = submission.record.recommendations.expect("recommendations");
    let bullets: Vec<&str> = text.lines().collect();
    assert_eq!(bullets, DEFAULT_RECOMMENDATIONS.to_vec());
    assert_eq!(submission.warnings.len(), 1);
}

#[tokio::test]
async fn weekly_series_become_four_points() {
    let form = ReportForm {
        weekly_reach_data: "15000,19000,25000,26000".into(),
        weekly_clicks_data: "650,820,1100,930".into(),
        ..report_form()
    };
    let submission = form.submit(None).await.expect("valid form");

    for orientation in [Orientation::Portrait, Orientation::Landscape] {
        let document = report::render(
            &submission.record,
            orientation,
            &RenderContext::new(today()),
        );
        let charts = line_charts(&document);
        assert_eq!(charts.len(), 1, "{:?}", orientation);

        let points = charts[0].points();
        let reach: Vec<f64> = points.iter().map(|point| point.primary).collect();
        let clicks: Vec<f64> = points.iter().map(|point| point.secondary).collect();
        assert_eq!(reach, vec![15000.0, 19000.0, 25000.0, 26000.0]);
        assert_eq!(clicks, vec![650.0, 820.0, 1100.0, 930.0]);
    }
}
