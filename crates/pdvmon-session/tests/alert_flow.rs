//! Inactivity alert flow through the session actor.
//!
//! Tests CAN use `.unwrap()` and `.expect()`.

mod common;

use pdvmon_core::{LogLevel, SlotId};
use pdvmon_session::{AlertDisposition, AlertScheduler, SessionConfig, SlotBoard};

use common::{layout, push, Harness};

fn slot(n: u8) -> SlotId {
    SlotId::new(n)
}

fn timeout_frame(address: &str, secs: &str) -> String {
    format!(r#"{{"type":"pdv_inativo_timeout","pdv_ip":"{address}","inactive_time":{secs}}}"#)
}

// ============================================================================
// Actor-level Flow
// ============================================================================

#[tokio::test]
async fn test_dismissing_exclusive_promotes_in_arrival_order() {
    let mut h = Harness::spawn();
    let mut control = h.connect().await;
    for (n, address) in [(1, "10.0.0.1"), (2, "10.0.0.2"), (3, "10.0.0.3")] {
        h.register(&mut control, n, address).await;
    }

    for address in ["10.0.0.2", "10.0.0.1", "10.0.0.3"] {
        push(&control, &timeout_frame(address, "60"));
    }
    h.wait_board(|b| b.slots.values().filter(|v| v.banner.is_some()).count() == 3)
        .await;

    let mut order = Vec::new();
    while let Some(current) = h.handle.snapshot().await.unwrap().exclusive {
        order.push(current.get());
        h.handle.dismiss_alert(current).await.unwrap();
    }
    assert_eq!(order, vec![2, 1, 3]);
    assert!(h.board.snapshot().slots.values().all(|v| v.banner.is_none()));
}

#[tokio::test]
async fn test_repeated_timeouts_are_suppressed() {
    let mut h = Harness::spawn();
    let mut control = h.connect().await;
    h.register(&mut control, 1, "10.0.0.5").await;

    push(&control, &timeout_frame("10.0.0.5", "90"));
    push(&control, &timeout_frame("10.0.0.5", "120"));
    push(
        &control,
        r#"{"type":"pdv_data","pdv_ip":"10.0.0.5","data":"sync"}"#,
    );
    h.wait_board(|b| b.slot(slot(1)).unwrap().log.iter().any(|e| e.text == "sync"))
        .await;

    let alerts = h
        .board
        .slot(slot(1))
        .unwrap()
        .log
        .iter()
        .filter(|e| e.level == LogLevel::Alert)
        .count();
    assert_eq!(alerts, 1);
    assert_eq!(h.handle.snapshot().await.unwrap().alerts.len(), 1);
}

#[tokio::test]
async fn test_reregistration_clears_alert() {
    let mut h = Harness::spawn_with(SessionConfig {
        layout: layout(2),
        ..Default::default()
    });
    let mut control = h.connect().await;
    h.register(&mut control, 1, "10.0.0.5").await;
    push(&control, &timeout_frame("10.0.0.5", "45.5"));
    h.wait_board(|b| b.exclusive == Some(slot(1))).await;
    assert_eq!(
        h.board.slot(slot(1)).unwrap().banner.as_deref(),
        Some("PDV 05 inactive for 45.5s")
    );

    h.register(&mut control, 1, "10.0.0.6").await;
    let state = h.board.snapshot();
    assert_eq!(state.exclusive, None);
    assert!(state.slot(slot(1)).unwrap().banner.is_none());
    assert!(h.handle.snapshot().await.unwrap().alerts.is_empty());
}

#[tokio::test]
async fn test_timeout_for_unregistered_terminal_is_dropped() {
    let mut h = Harness::spawn();
    let mut control = h.connect().await;
    h.register(&mut control, 1, "10.0.0.5").await;

    push(&control, &timeout_frame("10.0.0.77", "90"));
    push(
        &control,
        r#"{"type":"pdv_data","pdv_ip":"10.0.0.5","data":"after"}"#,
    );
    h.wait_board(|b| b.slot(slot(1)).unwrap().log.iter().any(|e| e.text == "after"))
        .await;

    let snapshot = h.handle.snapshot().await.unwrap();
    assert!(snapshot.alerts.is_empty());
    assert_eq!(snapshot.router.unresolved, 1);
}

// ============================================================================
// Scheduler Properties
// ============================================================================

#[test]
fn test_exclusive_grant_never_shared() {
    use pdvmon_core::{InactiveDuration, TerminalAddress};
    use pdvmon_session::Alert;

    let mut board = SlotBoard::new(layout(9));
    let mut scheduler = AlertScheduler::new();

    let mut x: u64 = 0x5eed;
    for step in 0..2_000u32 {
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        let n = (x % 9) as u8 + 1;
        let address = TerminalAddress::parse(&format!("10.0.1.{n}")).unwrap();

        if x % 4 == 0 {
            scheduler.clear(slot(n), &mut board);
        } else {
            let inactive = InactiveDuration::from_secs(u64::from(step % 300));
            let disposition = scheduler.add(Alert::new(slot(n), address, inactive), &mut board);
            if disposition == AlertDisposition::Exclusive {
                assert_eq!(scheduler.exclusive_slot(), Some(slot(n)));
            }
        }

        let views = scheduler.active();
        assert!(views.iter().filter(|v| v.exclusive).count() <= 1);
        assert_eq!(board.snapshot().exclusive, scheduler.exclusive_slot());
    }
}
