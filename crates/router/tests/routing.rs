//! End-to-end routing passes against in-memory source and destination
//! workbooks.

use assert_matches::assert_matches;

use ares_core::clock::Clock;
use ares_router::{Router, RouterConfig, RouterError};
use ares_sheets::memory::{MemoryStore, Op};
use ares_sheets::{RetryPolicy, StoreError, Workbook};

fn router(source: &MemoryStore, destination: &MemoryStore) -> Router {
    Router::new(
        Workbook::new(source.clone(), RetryPolicy::immediate(5)),
        Workbook::new(destination.clone(), RetryPolicy::immediate(5)),
        Clock::default(),
        RouterConfig::default(),
    )
}

fn strings(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|s| s.to_string()).collect()
}

/// Data rows of a destination table (header excluded).
fn entries(store: &MemoryStore, table: &str) -> Vec<Vec<String>> {
    store
        .rows(table)
        .map(|rows| rows.into_iter().skip(1).collect())
        .unwrap_or_default()
}

fn person_list(rows: &[[&str; 4]]) -> MemoryStore {
    let mut all = vec![strings(&[
        "PersonelID",
        "AdSoyad",
        "NormName",
        "Durum",
        "BaslamaTarihi",
        "CikisTarihi",
        "Olusturuldu",
        "Guncellendi",
    ])];
    all.extend(rows.iter().map(|r| strings(r)));
    MemoryStore::new().with_table("PersonelListesi", all)
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

#[tokio::test]
async fn attendance_row_creates_person_and_routes_entry() {
    let mut rows = vec![strings(&["Kisi", "LogTs", "MsgID"])];
    rows.extend((2..10).map(|_| strings(&["", "", ""])));
    rows.push(strings(&["Ayşe Yılmaz", "2024-01-01 09:00", "abc123"]));
    let source = MemoryStore::new().with_table("MesaiLog", rows);
    let destination = MemoryStore::new();
    let mut router = router(&source, &destination);

    let summary = router.route_once().await.unwrap();
    assert_eq!(summary.to_string(), "MesaiLog:1, BonusLog:0, FinansLog:0");

    // Person index
    assert_eq!(destination.cell_by_name("PersonelListesi", 2, "PersonelID").as_deref(), Some("RD-001"));
    assert_eq!(destination.cell_by_name("PersonelListesi", 2, "AdSoyad").as_deref(), Some("Ayşe Yılmaz"));
    assert_eq!(destination.cell_by_name("PersonelListesi", 2, "NormName").as_deref(), Some("ayseyilmaz"));
    assert_eq!(destination.cell_by_name("PersonelListesi", 2, "Durum").as_deref(), Some("Aktif"));

    // Destination entry
    let page = destination.rows("RD-001").unwrap();
    assert_eq!(page[0], strings(&["Kaynak", "SourceKey", "Zaman", "AlanlarJSON", "ProcessedAt"]));
    assert_eq!(page.len(), 2);
    assert_eq!(page[1][0], "Mesai");
    assert_eq!(page[1][1], "MesaiLog:abc123");
    assert_eq!(page[1][2], "2024-01-01 09:00");
    assert_eq!(
        page[1][3],
        r#"{"Kisi":"Ayşe Yılmaz","LogTs":"2024-01-01 09:00","MsgID":"abc123","ProcessedAt":"","RoutedTo":""}"#
    );
    assert!(!page[1][4].is_empty());

    // Source marks
    assert!(!source.cell_by_name("MesaiLog", 10, "ProcessedAt").unwrap().is_empty());
    assert_eq!(source.cell_by_name("MesaiLog", 10, "RoutedTo").as_deref(), Some("RD-001"));
    assert_eq!(source.cell_by_name("MesaiLog", 9, "ProcessedAt").as_deref(), Some(""));

    assert_eq!(router.checkpoints().get_last_row("MesaiLog").await.unwrap(), 10);
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn spellings_with_equal_keys_share_one_person() {
    let source = MemoryStore::new().with_table(
        "MesaiLog",
        [
            vec!["Kisi", "MsgID"],
            vec!["Ayşe Yılmaz", "a"],
            vec!["AYSE  YILMAZ", "b"],
            vec!["ayse.yilmaz", "c"],
        ],
    );
    let destination = MemoryStore::new();
    let mut router = router(&source, &destination);

    router.route_once().await.unwrap();

    assert_eq!(entries(&destination, "PersonelListesi").len(), 1);
    assert_eq!(entries(&destination, "RD-001").len(), 3);
    for row in 2..=4 {
        assert_eq!(source.cell_by_name("MesaiLog", row, "RoutedTo").as_deref(), Some("RD-001"));
    }
    // Last-seen spelling is kept.
    assert_eq!(destination.cell_by_name("PersonelListesi", 2, "AdSoyad").as_deref(), Some("ayse.yilmaz"));
}

#[tokio::test]
async fn new_ids_continue_from_highest_existing() {
    let source = MemoryStore::new().with_table(
        "BonusLog",
        [vec!["AdSoyad", "ID"], vec!["Zeynep Kaya", "1"]],
    );
    let destination = person_list(&[
        ["RD-001", "Ali Veli", "aliveli", "Aktif"],
        ["RD-003", "Can Demir", "candemir", "Aktif"],
    ]);
    let mut router = router(&source, &destination);

    router.route_once().await.unwrap();

    assert_eq!(destination.cell_by_name("PersonelListesi", 4, "PersonelID").as_deref(), Some("RD-004"));
    assert_eq!(source.cell_by_name("BonusLog", 2, "RoutedTo").as_deref(), Some("RD-004"));
    assert_eq!(entries(&destination, "RD-004").len(), 1);
}

#[tokio::test]
async fn existing_person_is_refreshed_not_duplicated() {
    let source = MemoryStore::new().with_table(
        "FinansLog",
        [vec!["ClosedByFull", "CloseMsgID"], vec!["Ali VELİ | @ali", "x-9"]],
    );
    let destination = person_list(&[["RD-007", "ali veli", "", "aktif"]]);
    let mut router = router(&source, &destination);

    router.route_once().await.unwrap();

    let list = entries(&destination, "PersonelListesi");
    assert_eq!(list.len(), 1);
    assert_eq!(list[0][..4], strings(&["RD-007", "Ali VELİ", "aliveli", "aktif"]));
    assert!(!list[0][7].is_empty());
    assert_eq!(entries(&destination, "RD-007")[0][1], "FinansLog:x-9");
}

#[tokio::test]
async fn index_entry_without_id_is_ignored() {
    let source = MemoryStore::new().with_table("MesaiLog", [vec!["Kisi"], vec!["Ali Veli"]]);
    let destination = person_list(&[["", "Ali Veli", "aliveli", "Aktif"]]);
    let mut router = router(&source, &destination);

    router.route_once().await.unwrap();

    assert_eq!(destination.cell_by_name("PersonelListesi", 3, "PersonelID").as_deref(), Some("RD-001"));
    assert_eq!(source.cell_by_name("MesaiLog", 2, "RoutedTo").as_deref(), Some("RD-001"));
}

#[tokio::test]
async fn name_collision_routes_to_first_entry() {
    let source = MemoryStore::new().with_table("MesaiLog", [vec!["Kisi"], vec!["Ali Veli"]]);
    let destination = person_list(&[
        ["RD-002", "Ali Veli", "aliveli", "Aktif"],
        ["RD-001", "ALI VELI", "aliveli", "Aktif"],
    ]);
    let mut router = router(&source, &destination);

    router.route_once().await.unwrap();

    assert_eq!(source.cell_by_name("MesaiLog", 2, "RoutedTo").as_deref(), Some("RD-002"));
    assert_eq!(entries(&destination, "PersonelListesi").len(), 2);
}

#[tokio::test]
async fn new_person_fills_index_gap_without_moving_others() {
    let source = MemoryStore::new().with_table(
        "MesaiLog",
        [vec!["Kisi"], vec!["Zeynep Kara"], vec!["Ayşe Yılmaz"], vec!["Mehmet Kaya"]],
    );
    let destination = person_list(&[
        ["RD-001", "Ali Veli", "aliveli", "Aktif"],
        ["RD-002", "Can Demir", "candemir", "Aktif"],
        ["", "", "", ""],
        ["RD-003", "Ayşe Yılmaz", "ayseyilmaz", "Pasif"],
        ["RD-004", "Mehmet Kaya", "mehmetkaya", "Aktif"],
    ]);
    let mut router = router(&source, &destination);

    router.route_once().await.unwrap();

    let list = entries(&destination, "PersonelListesi");
    assert_eq!(list.len(), 5);
    assert_eq!(list[2][..4], strings(&["RD-005", "Zeynep Kara", "zeynepkara", "Aktif"]));
    assert_eq!(list[3][..4], strings(&["RD-003", "Ayşe Yılmaz", "ayseyilmaz", "Pasif"]));
    assert_eq!(list[4][..4], strings(&["RD-004", "Mehmet Kaya", "mehmetkaya", "Aktif"]));

    assert_eq!(source.cell_by_name("MesaiLog", 2, "RoutedTo").as_deref(), Some("RD-005"));
    assert_eq!(source.cell_by_name("MesaiLog", 3, "RoutedTo").as_deref(), Some("PASIF"));
    assert_eq!(source.cell_by_name("MesaiLog", 4, "RoutedTo").as_deref(), Some("RD-004"));
    assert_eq!(entries(&destination, "RD-004").len(), 1);
    assert!(!destination.has_table("RD-003"));
}

// ---------------------------------------------------------------------------
// Source keys and idempotency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn source_keys_use_message_id_or_row() {
    let source = MemoryStore::new().with_table(
        "BonusLog",
        [
            vec!["FirstByFull", "MsgID", "OrigMsgID", "TalepTs"],
            vec!["Can Demir / Operasyon", "", "orig-1", "2024-02-01 10:00"],
            vec!["Can Demir", "", "", ""],
        ],
    );
    let destination = MemoryStore::new();
    let mut router = router(&source, &destination);

    router.route_once().await.unwrap();

    let page = entries(&destination, "RD-001");
    assert_eq!(page.len(), 2);
    assert_eq!(page[0][..3], strings(&["Bonus", "BonusLog:orig-1", "2024-02-01 10:00"]));
    assert_eq!(page[1][..3], strings(&["Bonus", "BonusLog:row3", ""]));
}

#[tokio::test]
async fn rerun_routes_nothing_twice() {
    let source = MemoryStore::new().with_table(
        "MesaiLog",
        [vec!["Kisi", "MsgID"], vec!["Ali Veli", "m1"], vec!["Can Demir", "m2"]],
    );
    let destination = MemoryStore::new();
    let mut router = router(&source, &destination);

    assert_eq!(router.route_once().await.unwrap().get("MesaiLog"), Some(2));
    assert_eq!(router.route_once().await.unwrap().get("MesaiLog"), Some(0));

    // Even with the checkpoint rewound, ProcessedAt keeps rows from being
    // routed again.
    destination.insert_table("_State", [vec!["LogName", "LastRow"], vec!["MesaiLog", "1"]]);
    assert_eq!(router.route_once().await.unwrap().get("MesaiLog"), Some(0));

    assert_eq!(entries(&destination, "RD-001").len(), 1);
    assert_eq!(entries(&destination, "RD-002").len(), 1);
}

#[tokio::test]
async fn appended_rows_are_picked_up_next_pass() {
    let source = MemoryStore::new().with_table("MesaiLog", [vec!["Kisi"], vec!["Ali Veli"]]);
    let destination = MemoryStore::new();
    let mut router = router(&source, &destination);

    router.route_once().await.unwrap();
    source.insert_table(
        "MesaiLog",
        [
            strings(&["Kisi", "ProcessedAt", "RoutedTo"]),
            source.rows("MesaiLog").unwrap()[1].clone(),
            strings(&["Can Demir"]),
        ],
    );

    let summary = router.route_once().await.unwrap();
    assert_eq!(summary.get("MesaiLog"), Some(1));
    assert_eq!(source.cell_by_name("MesaiLog", 3, "RoutedTo").as_deref(), Some("RD-002"));
    assert_eq!(router.checkpoints().get_last_row("MesaiLog").await.unwrap(), 3);
}

// ---------------------------------------------------------------------------
// Checkpoints and windows
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unnamed_rows_advance_checkpoint_but_stay_unprocessed() {
    let source = MemoryStore::new().with_table(
        "BonusLog",
        [
            vec!["Kisi", "Tutar"],
            vec!["Ali Veli", "100"],
            vec!["", "200"],
        ],
    );
    let destination = MemoryStore::new();
    let mut router = router(&source, &destination);

    // `Kisi` only names people in attendance logs.
    assert_eq!(router.route_once().await.unwrap().get("BonusLog"), Some(0));
    assert_eq!(router.checkpoints().get_last_row("BonusLog").await.unwrap(), 3);
    assert_eq!(source.cell_by_name("BonusLog", 2, "ProcessedAt").as_deref(), Some(""));
    assert!(!destination.has_table("PersonelListesi"));
}

#[tokio::test]
async fn checkpoint_never_decreases() {
    let source = MemoryStore::new().with_table("MesaiLog", [vec!["Kisi"], vec!["Ali Veli"]]);
    let destination = MemoryStore::new().with_table(
        "_State",
        [vec!["LogName", "LastRow"], vec!["MesaiLog", "40"]],
    );
    let mut router = router(&source, &destination);

    assert_eq!(router.route_once().await.unwrap().get("MesaiLog"), Some(0));
    assert_eq!(router.checkpoints().get_last_row("MesaiLog").await.unwrap(), 40);
    assert_eq!(source.cell_by_name("MesaiLog", 2, "ProcessedAt").as_deref(), Some(""));
}

#[tokio::test]
async fn only_trailing_window_is_scanned() {
    let mut rows = vec![strings(&["Kisi", "MsgID"])];
    rows.extend((1..=500).map(|n| vec!["Ali Veli".to_string(), format!("m{n}")]));
    let source = MemoryStore::new().with_table("MesaiLog", rows);
    let destination = MemoryStore::new();
    let mut router = router(&source, &destination);

    assert_eq!(router.route_once().await.unwrap().get("MesaiLog"), Some(200));

    let page = entries(&destination, "RD-001");
    assert_eq!(page.len(), 200);
    assert_eq!(page[0][1], "MesaiLog:m301");
    assert_eq!(page[199][1], "MesaiLog:m500");
    // Data row 300 sits at row 301 and is outside the window.
    assert_eq!(source.cell_by_name("MesaiLog", 301, "ProcessedAt").as_deref(), Some(""));
    assert_eq!(router.checkpoints().get_last_row("MesaiLog").await.unwrap(), 501);
}

// ---------------------------------------------------------------------------
// Inactive persons
// ---------------------------------------------------------------------------

#[tokio::test]
async fn inactive_person_is_marked_without_entry() {
    let source = MemoryStore::new().with_table(
        "MesaiLog",
        [vec!["Kisi"], vec!["Ali Veli"], vec!["Can Demir"]],
    );
    let destination = person_list(&[
        ["RD-001", "Ali Veli", "aliveli", "PASIF - izinli"],
        ["RD-002", "Can Demir", "candemir", "PASİF"],
    ]);
    let mut router = router(&source, &destination);

    let summary = router.route_once().await.unwrap();
    assert_eq!(summary.get("MesaiLog"), Some(2));
    assert_eq!(source.cell_by_name("MesaiLog", 2, "RoutedTo").as_deref(), Some("PASIF"));
    assert_eq!(source.cell_by_name("MesaiLog", 3, "RoutedTo").as_deref(), Some("PASIF"));
    assert!(!source.cell_by_name("MesaiLog", 2, "ProcessedAt").unwrap().is_empty());
    assert!(!destination.has_table("RD-001"));
    assert!(!destination.has_table("RD-002"));
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fatal_error_keeps_completed_checkpoints() {
    let source = MemoryStore::new()
        .with_table("MesaiLog", [vec!["Kisi"], vec!["Ali Veli"]])
        .with_table("BonusLog", [vec!["AdSoyad"], vec!["Can Demir"]]);
    let destination = MemoryStore::new();
    let mut router = router(&source, &destination);
    source.fail_next_on(
        Op::ReadRange,
        "BonusLog",
        StoreError::Api {
            status: 500,
            body: "backend error".into(),
        },
    );

    let result = router.route_once().await;
    assert_matches!(result, Err(RouterError::Store(StoreError::Api { status: 500, .. })));
    assert_eq!(router.checkpoints().get_last_row("MesaiLog").await.unwrap(), 2);
    assert_eq!(router.checkpoints().get_last_row("BonusLog").await.unwrap(), 1);

    let summary = router.route_once().await.unwrap();
    assert_eq!(summary.to_string(), "MesaiLog:0, BonusLog:1, FinansLog:0");
}

#[tokio::test]
async fn quota_errors_are_invisible_to_the_router() {
    let source = MemoryStore::new().with_table("MesaiLog", [vec!["Kisi"], vec!["Ali Veli"]]);
    let destination = MemoryStore::new();
    let mut router = router(&source, &destination);
    destination.fail_next(Op::AppendRow, StoreError::RateLimited("quota".into()));
    destination.fail_next(Op::AppendRow, StoreError::RateLimited("quota".into()));
    source.fail_next(Op::WriteRange, StoreError::RateLimited("quota".into()));

    let summary = router.route_once().await.unwrap();
    assert_eq!(summary.get("MesaiLog"), Some(1));
    assert_eq!(entries(&destination, "RD-001").len(), 1);
    assert_eq!(source.cell_by_name("MesaiLog", 2, "RoutedTo").as_deref(), Some("RD-001"));
}

#[tokio::test]
async fn crash_between_append_and_mark_duplicates_entry() {
    let source = MemoryStore::new().with_table(
        "MesaiLog",
        [vec!["Kisi", "MsgID", "ProcessedAt", "RoutedTo"], vec!["Ali Veli", "m1", "", ""]],
    );
    let destination = MemoryStore::new();
    let mut router = router(&source, &destination);
    source.fail_next_on(
        Op::WriteRange,
        "MesaiLog",
        StoreError::Api {
            status: 503,
            body: "unavailable".into(),
        },
    );

    assert!(router.route_once().await.is_err());
    assert_eq!(entries(&destination, "RD-001").len(), 1);

    router.route_once().await.unwrap();
    let page = entries(&destination, "RD-001");
    assert_eq!(page.len(), 2);
    assert_eq!(page[0][1], page[1][1]);
}

#[tokio::test]
async fn custom_source_list_and_marker() {
    let source = MemoryStore::new().with_table("IzinLog", [vec!["UserName"], vec!["Ali Veli"]]);
    let destination = person_list(&[["RD-001", "Ali Veli", "aliveli", "Ayrıldı"]]);
    let config = RouterConfig {
        source_tables: vec!["IzinLog".to_string()],
        inactive_marker: "ayr".to_string(),
        ..RouterConfig::default()
    };
    let mut router = Router::new(
        Workbook::new(source.clone(), RetryPolicy::immediate(5)),
        Workbook::new(destination.clone(), RetryPolicy::immediate(5)),
        Clock::default(),
        config,
    );

    let summary = router.route_once().await.unwrap();
    assert_eq!(summary.to_string(), "IzinLog:1");
    assert_eq!(source.cell_by_name("IzinLog", 2, "RoutedTo").as_deref(), Some("PASIF"));
}
