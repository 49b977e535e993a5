use aurine_docs::history::{
    regenerate, DocumentType, FileStore, HistoryEntry, HistoryStore, KeyValueStore, StoredRecord,
    HISTORY_KEY,
};
use aurine_docs::records::ContractRecord;
use aurine_docs::Error;
use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

fn contract() -> ContractRecord {
    ContractRecord {
        client_name: "Salon Bella".into(),
        client_address: Some("ul. Długa 5, Kraków".into()),
        client_nip: None,
        contract_number: "UM/2025/07".into(),
        sign_date: NaiveDate::from_ymd_opt(2025, 7, 1).expect("date"),
        service_scope: "Prowadzenie kampanii".into(),
        contract_value: Decimal::new(250000, 2),
        payment_terms: "14 dni".into(),
        contract_duration: "3 miesiące".into(),
    }
}

fn entry(seconds: i64, file_name: &str) -> HistoryEntry {
    let at = Utc.timestamp_opt(1_750_000_000 + seconds, 0).single().expect("timestamp");
    HistoryEntry::new(DocumentType::Contract, None, &contract(), file_name, at).expect("entry")
}

#[test]
fn entries_survive_reopening_the_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    {
        let history = HistoryStore::new(FileStore::new(dir.path()));
        history.append(entry(0, "first.pdf")).expect("append");
        history.append(entry(1, "second.pdf")).expect("append");
    }

    let reopened = HistoryStore::new(FileStore::new(dir.path()));
    let names: Vec<String> = reopened
        .list()
        .expect("list")
        .into_iter()
        .map(|entry| entry.file_name)
        .collect();
    assert_eq!(names, vec!["second.pdf", "first.pdf"]);
    assert!(dir.path().join(format!("{}.json", HISTORY_KEY)).is_file());
}

#[test]
fn removing_an_entry_rewrites_the_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let history = HistoryStore::new(FileStore::new(dir.path()));
    let first = history.append(entry(0, "first.pdf")).expect("append");
    history.append(entry(1, "second.pdf")).expect("append");

    assert!(history.remove(&first.id).expect("remove"));
    assert!(!history.remove(&first.id).expect("second remove"));

    let reopened = HistoryStore::new(FileStore::new(dir.path()));
    let remaining = reopened.list().expect("list");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].file_name, "second.pdf");
}

#[test]
fn stored_json_uses_the_shared_shape() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::new(dir.path());
    let history = HistoryStore::new(store);
    history.append(entry(0, "umowa.pdf")).expect("append");

    let raw = history
        .store()
        .get(HISTORY_KEY)
        .expect("read")
        .expect("present");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
    let stored = &value[0];
    assert_eq!(stored["type"], "contract");
    assert_eq!(stored["fileName"], "umowa.pdf");
    assert_eq!(stored["data"]["contractNumber"], "UM/2025/07");
}

#[test]
fn corrupt_files_are_reported_and_kept() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::new(dir.path());
    store.set(HISTORY_KEY, "{not json").expect("seed");

    let history = HistoryStore::new(store);
    let err = history.append(entry(0, "lost.pdf")).expect_err("corrupt list");
    assert!(matches!(err, Error::Storage(_)));

    let raw = history
        .store()
        .get(HISTORY_KEY)
        .expect("read")
        .expect("present");
    assert_eq!(raw, "{not json");
}

#[test]
fn entries_restore_their_records() {
    let dir = tempfile::tempdir().expect("tempdir");
    let history = HistoryStore::new(FileStore::new(dir.path()));
    let stored = history.append(entry(0, "umowa.pdf")).expect("append");

    let loaded = history.get(&stored.id).expect("get").expect("present");
    assert_eq!(regenerate(&loaded).expect("restore"), StoredRecord::Contract(contract()));

    let mut broken = loaded;
    broken.record = serde_json::json!("not a record");
    assert!(matches!(regenerate(&broken), Err(Error::Storage(_))));
}
