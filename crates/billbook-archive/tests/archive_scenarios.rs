//! End-to-end archive scenarios against a mock object store.
//!
//! Evidence files are served by wiremock; archives are read back with the
//! `zip` crate to check entry names, counts and contents.

use std::io::{Cursor, Read};
use std::sync::Arc;
use std::time::Duration;

use billbook_archive::{
    spawn_export, ArchiveAssembler, ArchiveError, AssemblerOptions, AssemblyState, ExportBundle,
    HttpEvidenceFetcher, StreamOptions,
};
use billbook_core::{
    Amounts, CompanyId, CompanyProfile, DocKind, EvidenceSet, ExportPeriod, TransactionKind,
    TransactionRecord, TransactionSet, YearCalendar,
};
use billbook_reports::{generate_all, ReportContext};
use chrono::NaiveDate;
use futures::StreamExt;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ROOT: &str = "ACME_2567-03";

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

fn company() -> CompanyProfile {
    CompanyProfile {
        id: CompanyId::new(),
        code: "ACME".into(),
        name: "ACME Trading".into(),
        tax_id: Some("0105555000001".into()),
    }
}

fn bundle_for(transactions: TransactionSet) -> ExportBundle {
    let company = company();
    let period = ExportPeriod::resolve(3, 2567, YearCalendar::BUDDHIST).unwrap();
    let ctx = ReportContext {
        company_name: company.name.clone(),
        company_tax_id: company.tax_id.clone(),
        period,
    };
    let reports = generate_all(&ctx, &transactions).unwrap();
    ExportBundle {
        company,
        period,
        transactions,
        reports,
    }
}

/// Two expenses (one with a slip, one without) and one income with a slip
/// and a withholding certificate.
fn march_records(base: &str) -> TransactionSet {
    TransactionSet {
        expenses: vec![
            TransactionRecord::new(TransactionKind::Expense, day(3), "Office Mart")
                .with_amounts(Amounts::from_parts(dec!(1200), dec!(84), dec!(0)))
                .with_evidence(EvidenceSet::default().with_url(DocKind::Slip, format!("{base}/e1/slip.jpg"))),
            TransactionRecord::new(TransactionKind::Expense, day(11), "City Water")
                .with_amounts(Amounts::from_parts(dec!(300), dec!(21), dec!(0))),
        ],
        incomes: vec![TransactionRecord::new(TransactionKind::Income, day(25), "Client Ltd")
            .with_amounts(Amounts::from_parts(dec!(40000), dec!(2800), dec!(1200)))
            .with_evidence(
                EvidenceSet::default()
                    .with_url(DocKind::Slip, format!("{base}/i1/slip.png"))
                    .with_url(DocKind::Withholding, format!("{base}/i1/wht.pdf")),
            )],
    }
}

async fn serve(server: &MockServer, file: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(file))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

fn assembler() -> ArchiveAssembler<HttpEvidenceFetcher> {
    ArchiveAssembler::new(
        HttpEvidenceFetcher::with_client(reqwest::Client::new(), 1024 * 1024),
        AssemblerOptions::default(),
    )
}

async fn build(bundle: &ExportBundle) -> (billbook_archive::ArchiveSummary, Vec<u8>) {
    let mut out = Vec::new();
    let summary = assembler()
        .assemble(bundle, &mut out, &CancellationToken::new())
        .await
        .unwrap();
    (summary, out)
}

fn entry_names(bytes: &[u8]) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

fn entry_bytes(bytes: &[u8], name: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut out = Vec::new();
    file.read_to_end(&mut out).unwrap();
    out
}

#[tokio::test]
async fn march_export_has_nine_entries() {
    let server = MockServer::start().await;
    serve(&server, "/e1/slip.jpg", b"expense slip").await;
    serve(&server, "/i1/slip.png", b"income slip").await;
    serve(&server, "/i1/wht.pdf", b"wht certificate").await;

    let bundle = bundle_for(march_records(&server.uri()));
    let (summary, bytes) = build(&bundle).await;

    assert_eq!(summary.state, AssemblyState::Done);
    assert_eq!(summary.entries_written, 9);
    let names = entry_names(&bytes);
    assert_eq!(names.len(), 9);
    assert_eq!(names[0], format!("{ROOT}/README.txt"));
    assert!(names.contains(&format!("{ROOT}/expenses/slips/2024-03-03-Office-Mart-slip.jpg")));
    assert!(names.contains(&format!("{ROOT}/incomes/slips/2024-03-25-Client-Ltd-slip.png")));
    assert!(names.contains(&format!(
        "{ROOT}/incomes/wht-certificates/2024-03-25-Client-Ltd-wht-cert.pdf"
    )));
    assert_eq!(
        entry_bytes(&bytes, &format!("{ROOT}/incomes/wht-certificates/2024-03-25-Client-Ltd-wht-cert.pdf")),
        b"wht certificate"
    );
}

#[tokio::test]
async fn unreachable_file_is_skipped_without_renaming_others() {
    let server = MockServer::start().await;
    serve(&server, "/e1/slip.jpg", b"expense slip").await;
    Mock::given(method("GET"))
        .and(path("/i1/slip.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    serve(&server, "/i1/wht.pdf", b"wht certificate").await;

    let bundle = bundle_for(march_records(&server.uri()));
    let (summary, bytes) = build(&bundle).await;

    assert_eq!(summary.entries_written, 8);
    assert_eq!(summary.omitted.len(), 1);
    assert!(summary.omitted[0].url.ends_with("/i1/slip.png"));

    let names = entry_names(&bytes);
    assert_eq!(names.len(), 8);
    assert!(!names.iter().any(|n| n.contains("incomes/slips/")));
    assert!(names.contains(&format!(
        "{ROOT}/incomes/wht-certificates/2024-03-25-Client-Ltd-wht-cert.pdf"
    )));
}

#[tokio::test]
async fn same_day_same_counterparty_slips_get_numbered() {
    let server = MockServer::start().await;
    serve(&server, "/a.jpg", b"first").await;
    serve(&server, "/b.jpg", b"second").await;
    let base = server.uri();

    let transactions = TransactionSet {
        expenses: vec![
            TransactionRecord::new(TransactionKind::Expense, day(7), "Office Mart")
                .with_evidence(EvidenceSet::default().with_url(DocKind::Slip, format!("{base}/a.jpg"))),
            TransactionRecord::new(TransactionKind::Expense, day(7), "Office Mart")
                .with_evidence(EvidenceSet::default().with_url(DocKind::Slip, format!("{base}/b.jpg"))),
        ],
        incomes: vec![],
    };
    let bundle = bundle_for(transactions);
    let (_, bytes) = build(&bundle).await;

    let first = format!("{ROOT}/expenses/slips/2024-03-07-Office-Mart-slip.jpg");
    let second = format!("{ROOT}/expenses/slips/2024-03-07-Office-Mart-slip-2.jpg");
    assert_eq!(entry_bytes(&bytes, &first), b"first");
    assert_eq!(entry_bytes(&bytes, &second), b"second");
}

#[tokio::test]
async fn empty_month_still_has_readme_and_reports() {
    let bundle = bundle_for(TransactionSet::default());
    let (summary, bytes) = build(&bundle).await;

    assert_eq!(summary.entries_written, 6);
    assert_eq!(summary.evidence_written, 0);
    let names = entry_names(&bytes);
    assert_eq!(names.len(), 6);
    assert!(names.iter().skip(1).all(|n| n.starts_with(&format!("{ROOT}/reports/"))));
}

#[tokio::test]
async fn report_entries_match_generated_workbooks() {
    let bundle = bundle_for(march_records("http://127.0.0.1:1"));
    let mut out = Vec::new();
    let assembler = ArchiveAssembler::new(
        HttpEvidenceFetcher::with_client(
            reqwest::Client::builder()
                .timeout(Duration::from_millis(50))
                .build()
                .unwrap(),
            1024,
        ),
        AssemblerOptions::default(),
    );
    let summary = assembler
        .assemble(&bundle, &mut out, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.omitted.len(), 3);

    for report in &bundle.reports {
        let stored = entry_bytes(&out, &format!("{ROOT}/reports/{}", report.name));
        assert_eq!(stored, report.bytes, "{} differs", report.name);
    }
}

#[tokio::test]
async fn planned_paths_are_identical_across_runs() {
    let first = bundle_for(march_records("https://files.example"));
    let mut second = first.clone();
    second.reports.clear();
    assert_eq!(first.evidence_plan(), second.evidence_plan());
}

#[tokio::test]
async fn streamed_export_matches_direct_assembly() {
    let server = MockServer::start().await;
    serve(&server, "/e1/slip.jpg", b"expense slip").await;
    serve(&server, "/i1/slip.png", b"income slip").await;
    serve(&server, "/i1/wht.pdf", b"wht certificate").await;

    let bundle = bundle_for(march_records(&server.uri()));
    let task = spawn_export(
        Arc::new(assembler()),
        bundle,
        StreamOptions {
            channel_capacity: 2,
            deadline: Some(Duration::from_secs(30)),
        },
    );
    assert_eq!(task.file_name, "ACME_2567-03.zip");

    let mut body = task.body;
    let mut bytes = Vec::new();
    while let Some(chunk) = body.next().await {
        bytes.extend_from_slice(&chunk.unwrap());
    }
    let summary = task.handle.await.unwrap().unwrap();
    assert_eq!(summary.entries_written, 9);
    assert_eq!(entry_names(&bytes).len(), 9);
}

#[tokio::test]
async fn deadline_truncates_the_stream_with_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let bundle = bundle_for(march_records(&server.uri()));
    let task = spawn_export(
        Arc::new(assembler()),
        bundle,
        StreamOptions {
            channel_capacity: 64,
            deadline: Some(Duration::from_millis(300)),
        },
    );

    let mut body = task.body;
    let mut saw_error = false;
    while let Some(chunk) = body.next().await {
        if chunk.is_err() {
            saw_error = true;
        }
    }
    assert!(saw_error, "stream must end with an error item");
    let result = task.handle.await.unwrap();
    assert!(matches!(result, Err(ArchiveError::DeadlineExceeded { .. })));
}

#[tokio::test]
async fn client_disconnect_stops_further_fetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"slow file".to_vec())
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;
    let base = server.uri();

    let expenses: Vec<TransactionRecord> = (1..=6)
        .map(|d| {
            TransactionRecord::new(TransactionKind::Expense, day(d), "Office Mart")
                .with_evidence(EvidenceSet::default().with_url(DocKind::Slip, format!("{base}/e{d}.jpg")))
        })
        .collect();
    let bundle = bundle_for(TransactionSet {
        expenses,
        incomes: vec![],
    });
    let planned = bundle.evidence_plan().len();
    assert_eq!(planned, 6);

    let task = spawn_export(Arc::new(assembler()), bundle, StreamOptions::default());

    // wait for the first download to start, then hang up
    tokio::time::timeout(Duration::from_secs(5), async {
        while server.received_requests().await.unwrap_or_default().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    drop(task.body);

    let result = tokio::time::timeout(Duration::from_secs(5), task.handle)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(result, Err(ArchiveError::Cancelled)), "{result:?}");

    tokio::time::sleep(Duration::from_millis(200)).await;
    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.len() < planned, "fetched {} of {planned}", requests.len());
}
