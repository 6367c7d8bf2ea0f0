use std::{cell::RefCell, rc::Rc};

use anyhow::Result;
use chrono::NaiveDate;
use insta::assert_snapshot;

use crate::{
    backend::{self, CategoryMap, MockBackend, SaveRequest, StatementFile},
    config::Config,
    filter::FilterState,
    session::{self, Change, Session},
    transaction::{OriginalLine, Transaction},
    upload::{self, UploadOutcome},
};

fn transaction(index: u64, date: Option<&str>, description: &str) -> Transaction {
    Transaction {
        date: date.and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
        description: description.into(),
        original_line: OriginalLine::Index(index),
    }
}

fn statement_file() -> StatementFile {
    StatementFile::new("statement.pdf", b"%PDF-1.4".to_vec())
}

async fn session_with(backend: &MockBackend) -> Session {
    let mut session = Session::new(Config::default());
    session.load_memory(backend).await;
    session.select_file(Some(statement_file()));
    session
}

#[tokio::test]
async fn test_uber_trip_scenario() -> Result<()> {
    let backend = MockBackend::new();
    backend.push_upload(Ok(vec![transaction(0, Some("2024-03-01"), "UBER TRIP")]));
    let mut session = session_with(&backend).await;

    session.upload_statement(&backend).await?;
    session.set_filter(FilterState::from_codes("03", "2024")?);
    assert_eq!(session.view().rows.len(), 1);
    assert_eq!(session.view().get("UBER TRIP"), Some(""));

    session
        .change_category(&backend, "UBER TRIP", "Travel")
        .await?;
    assert_eq!(session.view().get("UBER TRIP"), Some("Travel"));
    assert_eq!(
        backend.save_requests(),
        vec![SaveRequest {
            description: "UBER TRIP".into(),
            category: "Travel".into(),
        }]
    );
    Ok(())
}

#[tokio::test]
async fn test_saved_category_survives_restart() -> Result<()> {
    let backend = MockBackend::new();
    let mut session = session_with(&backend).await;
    session
        .change_category(&backend, "STARBUCKS #123", "Dining")
        .await?;
    assert_eq!(session.memory().get("STARBUCKS #123"), "Dining");

    let restarted = session_with(&backend).await;
    assert_eq!(restarted.memory().get("STARBUCKS #123"), "Dining");
    Ok(())
}

#[tokio::test]
async fn test_second_upload_replaces_store() -> Result<()> {
    let backend = MockBackend::new();
    backend.push_upload(Ok(vec![
        transaction(0, Some("2024-03-01"), "A1"),
        transaction(1, Some("2024-03-02"), "SHARED"),
    ]));
    backend.push_upload(Ok(vec![
        transaction(0, Some("2024-04-01"), "SHARED"),
        transaction(1, Some("2024-04-02"), "B1"),
    ]));
    let mut session = session_with(&backend).await;

    session.upload_statement(&backend).await?;
    session.upload_statement(&backend).await?;
    let descriptions = session
        .transactions()
        .iter()
        .map(|t| t.description.as_str())
        .collect::<Vec<_>>();
    assert_eq!(descriptions, vec!["SHARED", "B1"]);
    Ok(())
}

#[tokio::test]
async fn test_failed_upload_keeps_store() -> Result<()> {
    let backend = MockBackend::new();
    backend.push_upload(Ok(vec![transaction(0, None, "RENT")]));
    backend.push_upload(Err(backend::Error::Backend("not a statement".into())));
    backend.push_upload(Err(backend::Error::Transport("connection reset".into())));
    let mut session = session_with(&backend).await;

    session.upload_statement(&backend).await?;
    let before = session.transactions().to_vec();

    let error = session.upload_statement(&backend).await.unwrap_err();
    assert_eq!(
        error,
        upload::Error::Backend(backend::Error::Backend("not a statement".into()))
    );
    assert_eq!(session.transactions(), before.as_slice());
    assert!(!session.upload().is_loading());
    assert!(session.upload().error().is_some());

    assert!(session.upload_statement(&backend).await.is_err());
    assert_eq!(session.transactions(), before.as_slice());
    assert!(!session.upload().is_loading());
    Ok(())
}

#[tokio::test]
async fn test_upload_without_file_makes_no_request() {
    let backend = MockBackend::new();
    let mut session = Session::new(Config::default());
    let result = session.upload_statement(&backend).await;
    assert_eq!(result, Err(upload::Error::NoFileSelected));
    assert_eq!(backend.upload_calls(), 0);
    assert_eq!(
        session.upload().error(),
        Some("select a statement to upload first")
    );
}

#[tokio::test]
async fn test_stale_upload_never_wins() -> Result<()> {
    let backend = MockBackend::new();
    let mut session = session_with(&backend).await;

    let older = session.begin_upload()?;
    let newer = session.begin_upload()?;
    session.finish_upload(newer.attempt, Ok(vec![transaction(0, None, "NEW")]));
    let outcome = session.finish_upload(older.attempt, Ok(vec![transaction(0, None, "OLD")]));

    assert_eq!(outcome, UploadOutcome::Stale);
    assert_eq!(session.transactions()[0].description, "NEW");
    assert!(!session.upload().is_loading());
    Ok(())
}

#[tokio::test]
async fn test_failed_save_keeps_edit() -> Result<()> {
    let backend = MockBackend::new();
    backend.push_upload(Ok(vec![
        transaction(0, Some("2024-03-01"), "UBER TRIP"),
        transaction(1, Some("2024-04-01"), "GROCER"),
    ]));
    backend.fail_saves(Some(backend::Error::Transport("offline".into())));
    let mut session = session_with(&backend).await;
    session.upload_statement(&backend).await?;

    let result = session.change_category(&backend, "UBER TRIP", "Travel").await;
    assert!(matches!(result, Err(session::Error::Save(_))));
    assert_eq!(session.view().get("UBER TRIP"), Some("Travel"));
    assert_eq!(session.memory().get("UBER TRIP"), "");
    assert_eq!(
        session.save_error(),
        Some("saving category failed: could not reach the backend: offline")
    );

    session.set_filter(FilterState::from_codes("04", "all")?);
    assert_eq!(session.view().get("UBER TRIP"), None);
    session.set_filter(FilterState::default());
    assert_eq!(session.view().get("UBER TRIP"), Some("Travel"));
    assert_eq!(backend.save_requests().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_edit_survives_filter_change_while_save_in_flight() -> Result<()> {
    let backend = MockBackend::new();
    backend.push_upload(Ok(vec![
        transaction(0, Some("2024-03-01"), "UBER TRIP"),
        transaction(1, Some("2024-03-09"), "GROCER"),
    ]));
    let mut session = session_with(&backend).await;
    session.upload_statement(&backend).await?;

    let ticket = session.begin_category_change("UBER TRIP", "Travel")?;
    session.set_filter(FilterState::from_codes("03", "all")?);
    assert_eq!(session.view().get("UBER TRIP"), Some("Travel"));

    session.finish_save(&ticket, Ok(()))?;
    assert!(session.pending().is_empty());
    assert_eq!(session.view().get("UBER TRIP"), Some("Travel"));
    Ok(())
}

#[tokio::test]
async fn test_same_description_last_save_wins() -> Result<()> {
    let backend = MockBackend::new();
    let mut session = session_with(&backend).await;

    let first = session.begin_category_change("UBER TRIP", "Other")?;
    let second = session.begin_category_change("UBER TRIP", "Travel")?;
    session.finish_save(&second, Ok(()))?;
    session.finish_save(&first, Ok(()))?;
    assert_eq!(session.memory().get("UBER TRIP"), "Travel");
    Ok(())
}

#[tokio::test]
async fn test_unknown_category_is_rejected() {
    let backend = MockBackend::new();
    let mut session = session_with(&backend).await;
    let result = session.change_category(&backend, "UBER TRIP", "Crypto").await;
    assert_eq!(result, Err(session::Error::UnknownCategory("Crypto".into())));
    assert!(backend.save_requests().is_empty());
    assert!(session.pending().is_empty());
}

#[tokio::test]
async fn test_failed_memory_load_degrades() -> Result<()> {
    let backend = MockBackend::with_memory(
        [("RENT".to_string(), "Bills".to_string())]
            .into_iter()
            .collect::<CategoryMap>(),
    );
    backend.fail_loads(Some(backend::Error::Backend("maintenance".into())));
    backend.push_upload(Ok(vec![transaction(0, None, "RENT")]));
    let mut session = session_with(&backend).await;
    assert!(session.memory_loaded());
    assert!(session.memory().is_empty());

    session.upload_statement(&backend).await?;
    assert_eq!(session.view().get("RENT"), Some(""));
    Ok(())
}

#[tokio::test]
async fn test_late_memory_load_keeps_confirmed_save() -> Result<()> {
    let backend = MockBackend::new();
    let mut session = Session::new(Config::default());
    session.change_category(&backend, "UBER TRIP", "Travel").await?;

    let mut stale = CategoryMap::new();
    stale.insert("UBER TRIP".into(), "Other".into());
    stale.insert("GROCER".into(), "Groceries".into());
    session.finish_memory_load(Ok(stale));

    assert_eq!(session.memory().get("UBER TRIP"), "Travel");
    assert_eq!(session.memory().get("GROCER"), "Groceries");
    Ok(())
}

#[tokio::test]
async fn test_subscribers_see_every_change() -> Result<()> {
    let backend = MockBackend::new();
    backend.push_upload(Ok(vec![transaction(0, Some("2024-03-01"), "UBER TRIP")]));
    let changes = Rc::new(RefCell::new(Vec::new()));
    let mut session = Session::new(Config::default());
    let seen = changes.clone();
    session.subscribe(move |change, view| seen.borrow_mut().push((change, view.rows.len())));

    session.load_memory(&backend).await;
    session.select_file(Some(statement_file()));
    session.upload_statement(&backend).await?;
    session.set_filter(FilterState::from_codes("04", "all")?);
    session.set_filter(FilterState::from_codes("04", "all")?);

    assert_eq!(
        *changes.borrow(),
        vec![
            (Change::Memory, 0),
            (Change::Upload, 0),
            (Change::Upload, 0),
            (Change::Transactions, 1),
            (Change::Filter, 0),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_view_table() -> Result<()> {
    let backend = MockBackend::with_memory(
        [("GROCER".to_string(), "Groceries".to_string())]
            .into_iter()
            .collect::<CategoryMap>(),
    );
    backend.push_upload(Ok(vec![
        transaction(0, Some("2024-03-01"), "UBER TRIP"),
        transaction(1, Some("2024-03-02"), "GROCER"),
        transaction(2, None, "INTEREST"),
    ]));
    let mut session = session_with(&backend).await;
    session.upload_statement(&backend).await?;
    session.change_category(&backend, "UBER TRIP", "Travel").await?;

    assert_snapshot!(session.view().to_table().to_string(), @r###"
    +------------+-------------+-----------+
    | date       | description | category  |
    +======================================+
    | 2024-03-01 | UBER TRIP   | Travel    |
    |------------+-------------+-----------|
    | 2024-03-02 | GROCER      | Groceries |
    |------------+-------------+-----------|
    |            | INTEREST    |           |
    +------------+-------------+-----------+
    "###);
    Ok(())
}

#[tokio::test]
async fn test_edit_kept_until_its_own_save_confirms() -> Result<()> {
    let backend = MockBackend::with_memory(
        [("UBER TRIP".to_string(), "Travel".to_string())]
            .into_iter()
            .collect::<CategoryMap>(),
    );
    backend.push_upload(Ok(vec![
        transaction(0, Some("2024-03-01"), "UBER TRIP"),
        transaction(1, Some("2024-03-02"), "GROCER"),
    ]));
    let mut session = session_with(&backend).await;
    session.upload_statement(&backend).await?;

    let abandoned = session.begin_category_change("UBER TRIP", "Other")?;
    let chosen = session.begin_category_change("UBER TRIP", "Travel")?;
    let unrelated = session.begin_category_change("GROCER", "Groceries")?;

    session.finish_save(&unrelated, Ok(()))?;
    assert_eq!(session.pending().len(), 1);
    session.finish_save(&abandoned, Ok(()))?;
    let failed = session.finish_save(&chosen, Err(backend::Error::Transport("offline".into())));

    assert!(failed.is_err());
    assert_eq!(session.view().get("UBER TRIP"), Some("Travel"));
    assert_eq!(session.view().get("GROCER"), Some("Groceries"));
    Ok(())
}

#[tokio::test]
async fn test_memory_load_never_resolves_edit() -> Result<()> {
    let backend = MockBackend::new();
    backend.push_upload(Ok(vec![transaction(0, None, "UBER TRIP")]));
    let mut session = Session::new(Config::default());
    session.select_file(Some(statement_file()));
    session.upload_statement(&backend).await?;

    let ticket = session.begin_category_change("UBER TRIP", "Travel")?;
    let mut snapshot = CategoryMap::new();
    snapshot.insert("UBER TRIP".into(), "Travel".into());
    session.finish_memory_load(Ok(snapshot));
    assert_eq!(session.pending().len(), 1);

    assert!(session
        .finish_save(&ticket, Err(backend::Error::Backend("db down".into())))
        .is_err());
    assert_eq!(session.pending().len(), 1);
    assert_eq!(session.view().get("UBER TRIP"), Some("Travel"));
    Ok(())
}
