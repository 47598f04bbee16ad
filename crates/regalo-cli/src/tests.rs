use std::io::Cursor;
use std::path::PathBuf;

use clap::Parser;
use pretty_assertions::assert_eq;
use regalo_core::config::parse_site_config;
use regalo_core::feed::ChangeEvent;
use regalo_core::models::{BankAccount, Gift, GiftCatalog, ReservationRow, TRANSFER_GIFT_URL};
use regalo_core::remote::MemoryBackend;
use regalo_core::{GiftId, GiftReservation, GiftStatus, ReservationStore};

use crate::cli::{Cli, Commands, CompletionShell};
use crate::commands::common::{
    confirm, deposit_reference, format_gift_line, format_price, is_affirmative, load_site,
    resolve_site_path,
};
use crate::commands::completions::render_completions;
use crate::commands::gifts::list_gifts;
use crate::commands::release::release_gift;
use crate::commands::reserve::reserve_gift;
use crate::commands::watch::{event_to_item, format_event_line};
use crate::error::CliError;

fn gift(id: &str, title: &str, url: Option<&str>) -> Gift {
    Gift {
        id: GiftId::from(id),
        title: title.to_string(),
        price: 150.0,
        currency: "USD".to_string(),
        url: url.map(str::to_string),
        image: None,
    }
}

fn catalog() -> GiftCatalog {
    GiftCatalog::new(vec![
        gift("g1", "Mesa Comedor", Some(TRANSFER_GIFT_URL)),
        gift("g2", "Juego de sábanas", Some("#")),
        gift("g3", "Cafetera", Some("https://shop.example/cafetera")),
    ])
    .unwrap()
}

fn row(gift_id: &str, reserved_by: &str) -> ReservationRow {
    ReservationRow {
        gift_id: GiftId::from(gift_id),
        reserved_by: reserved_by.to_string(),
        note: None,
        created_at: None,
    }
}

fn store_with(backend: MemoryBackend) -> ReservationStore<MemoryBackend> {
    ReservationStore::new(backend, catalog())
}

#[test]
fn cli_parses_reserve_with_global_site_flag() {
    let cli = Cli::parse_from([
        "regalo", "reserve", "g3", "--name", "Ana", "--note", "Con cariño", "--site", "/tmp/site.json",
    ]);
    assert_eq!(cli.site, Some(PathBuf::from("/tmp/site.json")));
    match cli.command {
        Commands::Reserve {
            gift_id,
            name,
            note,
            force,
        } => {
            assert_eq!(gift_id, "g3");
            assert_eq!(name.as_deref(), Some("Ana"));
            assert_eq!(note.as_deref(), Some("Con cariño"));
            assert!(!force);
        }
        _ => panic!("expected reserve command"),
    }
}

#[test]
fn cli_accepts_cancel_alias_for_release() {
    let cli = Cli::parse_from(["regalo", "cancel", "g1", "-y"]);
    assert!(matches!(cli.command, Commands::Release { yes: true, .. }));
}

#[test]
fn resolve_site_path_prefers_explicit_flag() {
    let path = PathBuf::from("/srv/boda/site.json");
    assert_eq!(resolve_site_path(Some(path.clone())), path);
}

#[test]
fn example_site_file_loads() {
    let site = parse_site_config(include_str!("../../../demos/site.example.json")).unwrap();
    let catalog = site.catalog().unwrap();
    assert_eq!(catalog.len(), 5);
    assert!(catalog.get("g1").unwrap().is_bank_transfer());
    assert_eq!(site.accounts.len(), 2);
}

#[test]
fn load_site_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let error = load_site(&dir.path().join("site.json")).unwrap_err();
    assert!(matches!(error, CliError::SiteNotFound(_)));
}

#[test]
fn affirmative_answers_accept_spanish_and_english() {
    for answer in ["y", "YES", "s", "Sí\n", " si "] {
        assert!(is_affirmative(answer), "{answer:?} should confirm");
    }
    for answer in ["", "n", "no", "maybe"] {
        assert!(!is_affirmative(answer), "{answer:?} should decline");
    }
}

#[test]
fn confirm_writes_prompt_and_reads_answer() {
    let mut input = Cursor::new("yes\n");
    let mut output = Vec::new();
    assert!(confirm("Release 'Cafetera'?", &mut input, &mut output).unwrap());
    assert_eq!(String::from_utf8(output).unwrap(), "Release 'Cafetera'? [y/N] ");
}

#[test]
fn format_price_drops_zero_cents() {
    assert_eq!(format_price(150.0, "USD"), "USD 150");
    assert_eq!(format_price(99.5, "UYU"), "UYU 99.50");
}

#[test]
fn format_gift_line_shows_reservation() {
    let mut status = GiftStatus {
        gift: gift("g3", "Cafetera", None),
        reservation: None,
    };
    assert_eq!(format_gift_line(&status), "g3 | Cafetera | USD 150 | available");

    status.reservation = Some(GiftReservation::new("Ana", Some("Con cariño")));
    assert_eq!(
        format_gift_line(&status),
        "g3 | Cafetera | USD 150 | reserved by Ana (\"Con cariño\")"
    );
}

#[test]
fn format_event_line_uses_gift_titles() {
    let catalog = catalog();
    assert_eq!(
        format_event_line(&catalog, &ChangeEvent::Inserted(row("g3", "Ana"))),
        "+ Cafetera reserved by Ana"
    );
    assert_eq!(
        format_event_line(&catalog, &ChangeEvent::Deleted(row("g9", ""))),
        "- g9 is available again"
    );

    assert_eq!(
        format_event_line(&catalog, &ChangeEvent::Updated(row("g2", "  "))),
        "~ Juego de sábanas now reserved by Invitado"
    );
    assert_eq!(
        event_to_item(&ChangeEvent::Inserted(row("g2", ""))).reserved_by.as_deref(),
        Some("Invitado")
    );

    let item = event_to_item(&ChangeEvent::Deleted(row("g3", "Ana")));
    assert_eq!(item.event, "delete");
    assert_eq!(item.reserved_by, None);
}

#[test]
fn deposit_reference_joins_gift_notes_and_guest() {
    let mut account = BankAccount {
        bank: "Banco Ejemplo".to_string(),
        holder: "Florencia Ejemplo".to_string(),
        currency: "UYU".to_string(),
        account_type: "Caja de Ahorro".to_string(),
        account_number: "0000001".to_string(),
        alias_or_iban: None,
        notes: Some("Regalo Boda Flo & Cica".to_string()),
    };
    let gift = gift("g1", "Mesa Comedor", Some(TRANSFER_GIFT_URL));
    assert_eq!(
        deposit_reference(&gift, &account, "Ana"),
        "Mesa Comedor · Regalo Boda Flo & Cica · Ana"
    );

    account.notes = Some("  ".to_string());
    assert_eq!(deposit_reference(&gift, &account, "Ana"), "Mesa Comedor · Ana");
}

#[test]
fn completions_name_the_binary() {
    let script = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(script.contains("regalo"));
}

#[tokio::test(flavor = "current_thread")]
async fn list_gifts_filters_available() {
    let store = store_with(MemoryBackend::new().with_rows([row("g1", "Ana")]));

    let all = list_gifts(&store, false).await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all[0].is_reserved());

    let available = list_gifts(&store, true).await.unwrap();
    let ids: Vec<_> = available.iter().map(|s| s.gift.id.to_string()).collect();
    assert_eq!(ids, vec!["g2", "g3"]);
}

#[tokio::test(flavor = "current_thread")]
async fn list_gifts_fails_when_state_is_unknown() {
    let backend = MemoryBackend::new().with_rows([row("g1", "Ana")]);
    backend.set_failure(Some("HTTP 503"));
    let store = store_with(backend);

    let error = list_gifts(&store, true).await.unwrap_err();
    assert!(matches!(
        error,
        CliError::Core(regalo_core::Error::ReservationStateUnknown(_))
    ));
}

#[tokio::test(flavor = "current_thread")]
async fn reserve_gift_rejects_unknown_and_blank_ids() {
    let store = store_with(MemoryBackend::new());

    let error = reserve_gift(&store, "g99", "Ana", None, false).await.unwrap_err();
    assert!(matches!(error, CliError::UnknownGift(id) if id == "g99"));

    let error = reserve_gift(&store, "   ", "Ana", None, false).await.unwrap_err();
    assert!(matches!(error, CliError::EmptyGiftId));
}

#[tokio::test(flavor = "current_thread")]
async fn reserve_gift_refuses_taken_gift_unless_forced() {
    let backend = MemoryBackend::new().with_rows([row("g3", "Luis")]);
    let store = store_with(backend.clone());

    let error = reserve_gift(&store, "g3", "Ana", None, false).await.unwrap_err();
    assert!(matches!(
        error,
        CliError::AlreadyReserved { ref reserved_by, .. } if reserved_by == "Luis"
    ));

    let (gift, reservation) = reserve_gift(&store, " g3 ", "Ana", Some("  "), true)
        .await
        .unwrap();
    assert_eq!(gift.title, "Cafetera");
    assert_eq!(reservation.reserved_by, "Ana");
    assert_eq!(reservation.note, None);
    assert_eq!(backend.row("g3").unwrap().reserved_by, "Ana");
}

#[tokio::test(flavor = "current_thread")]
async fn release_gift_respects_declined_confirmation() {
    let backend = MemoryBackend::new().with_rows([row("g2", "Ana")]);
    let store = store_with(backend.clone());

    let mut input = Cursor::new("n\n");
    let mut output = Vec::new();
    let released = release_gift(&store, "g2", false, &mut input, &mut output)
        .await
        .unwrap();
    assert!(released.is_none());
    assert!(backend.row("g2").is_some());
    assert!(String::from_utf8(output).unwrap().contains("reserved by Ana"));

    let mut input = Cursor::new("s\n");
    let mut output = Vec::new();
    let released = release_gift(&store, "g2", false, &mut input, &mut output)
        .await
        .unwrap();
    assert_eq!(released.map(|gift| gift.title).as_deref(), Some("Juego de sábanas"));
    assert!(backend.row("g2").is_none());
    assert!(!store.is_reserved("g2").await);
}

#[tokio::test(flavor = "current_thread")]
async fn release_gift_reports_free_gift() {
    let store = store_with(MemoryBackend::new());
    let mut input = Cursor::new("");
    let mut output = Vec::new();

    let error = release_gift(&store, "g1", true, &mut input, &mut output)
        .await
        .unwrap_err();
    assert!(matches!(error, CliError::NotReserved(title) if title == "Mesa Comedor"));
}

#[tokio::test(flavor = "current_thread")]
async fn release_gift_failure_keeps_reservation() {
    let backend = MemoryBackend::new().with_rows([row("g1", "Ana")]);
    let store = store_with(backend.clone());
    store.load().await.unwrap();
    backend.set_failure(Some("HTTP 500"));

    let mut input = Cursor::new("");
    let mut output = Vec::new();
    // The pre-release load fails too, so nothing is touched.
    let error = release_gift(&store, "g1", true, &mut input, &mut output)
        .await
        .unwrap_err();
    assert!(matches!(error, CliError::Core(_)));
    assert!(backend.row("g1").is_some());
}
