//! Behavior every backend must share, run once per backend.

use blocklist::{Action, ActionType, BlockData, BlocklistError, BlocklistExt, ContentKey};
use chrono::{Duration, TimeZone, Utc};

use crate::common::{Fixture, block_data, cid_pair};

pub async fn legacy_and_current_versions_agree(fx: Fixture) {
    let (v0, v1) = cid_pair(b"legacy reference");
    assert!(!fx.blocklist.contains(&v0).await.unwrap());
    assert!(!fx.blocklist.contains(&v1).await.unwrap());

    assert!(fx.blocklist.block(&v0, &block_data("a@example.com", "")).await.unwrap());
    assert!(fx.blocklist.contains(&v0).await.unwrap());
    assert!(fx.blocklist.contains(&v1).await.unwrap());

    // Blocking the other version is the same entry.
    assert!(!fx.blocklist.block(&v1, &block_data("b@example.com", "")).await.unwrap());

    let (w0, w1) = cid_pair(b"current reference");
    fx.blocklist.block(&w1, &BlockData::default()).await.unwrap();
    assert_eq!(
        fx.blocklist.contains(&w0).await.unwrap(),
        fx.blocklist.contains(&w1).await.unwrap()
    );
}

pub async fn block_is_idempotent(fx: Fixture) {
    let (_, id) = cid_pair(b"idempotent");
    let first = block_data("first@example.com", "court order");
    let second = block_data("second@example.com", "duplicate report");

    assert!(fx.blocklist.block(&id, &first).await.unwrap());
    assert!(!fx.blocklist.block(&id, &second).await.unwrap());

    let item = fx.blocklist.search(&id).await.unwrap();
    assert_eq!(item.user, "first@example.com");
    assert_eq!(item.reason, "court order");
    assert_eq!(item.content, first.content);
}

pub async fn unblock_then_reblock_is_fresh(fx: Fixture) {
    let (v0, v1) = cid_pair(b"reblock");
    fx.blocklist.block(&v1, &block_data("a@example.com", "one")).await.unwrap();

    fx.blocklist.unblock(&v0).await.unwrap();
    assert!(!fx.blocklist.contains(&v1).await.unwrap());

    assert!(fx.blocklist.block(&v1, &block_data("b@example.com", "two")).await.unwrap());
    let item = fx.blocklist.search(&v1).await.unwrap();
    assert_eq!(item.user, "b@example.com");
    assert_eq!(item.reason, "two");
}

pub async fn missing_entries_are_not_found(fx: Fixture) {
    let (_, id) = cid_pair(b"never blocked");
    assert!(matches!(
        fx.blocklist.unblock(&id).await,
        Err(BlocklistError::NotFound(_))
    ));
    assert!(matches!(
        fx.blocklist.search(&id).await,
        Err(BlocklistError::NotFound(_))
    ));
}

pub async fn purge_removes_payload_only(fx: Fixture) {
    let (v0, v1) = cid_pair(b"payload");
    let key = ContentKey::from(&v1).datastore_key();

    // Nothing stored yet: already purged.
    fx.blocklist.purge(&v1).await.unwrap();

    fx.content.put(&key, b"payload bytes").await.unwrap();
    fx.blocklist.block(&v1, &BlockData::default()).await.unwrap();
    fx.blocklist.purge(&v0).await.unwrap();

    assert!(!fx.content.has(&key).await.unwrap());
    assert!(fx.blocklist.contains(&v1).await.unwrap());
}

pub async fn logs_are_newest_first_and_capped(fx: Fixture) {
    let (_, id) = cid_pair(b"logged");
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

    for i in 0..5 {
        let typ = if i % 2 == 0 {
            ActionType::Block
        } else {
            ActionType::Unblock
        };
        let mut action = Action::new(typ, vec![id], format!("step {i}"), "ops@example.com");
        action.created_at = start + Duration::seconds(i);
        fx.blocklist.add_log(&action).await.unwrap();
    }

    let logs = fx.blocklist.get_logs(3).await.unwrap();
    assert_eq!(logs.len(), 3);
    assert_eq!(logs[0].reason, "step 4");
    assert_eq!(logs[2].reason, "step 2");
    assert!(logs.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    assert_eq!(fx.blocklist.get_logs(100).await.unwrap().len(), 5);
    assert!(fx.blocklist.get_logs(0).await.unwrap().is_empty());
}

pub async fn invalid_actions_leave_log_unchanged(fx: Fixture) {
    let (_, id) = cid_pair(b"invalid");
    fx.blocklist
        .add_log(&Action::new(ActionType::Block, vec![id], "", "a@example.com"))
        .await
        .unwrap();
    let before = fx.blocklist.get_logs(100).await.unwrap().len();

    assert!(matches!(
        "delete".parse::<ActionType>(),
        Err(BlocklistError::InvalidActionType(_))
    ));
    let empty = Action::new(ActionType::Unblock, Vec::new(), "", "a@example.com");
    assert!(matches!(
        fx.blocklist.add_log(&empty).await,
        Err(BlocklistError::EmptyAction)
    ));

    assert_eq!(fx.blocklist.get_logs(100).await.unwrap().len(), before);
}

pub async fn stored_unknown_action_type_fails_get_logs(fx: Fixture) {
    let (_, id) = cid_pair(b"unknown type");
    fx.blocklist
        .add_log(&Action::new(ActionType::Block, vec![id], "", "a@example.com"))
        .await
        .unwrap();
    assert_eq!(fx.blocklist.get_logs(100).await.unwrap().len(), 1);

    fx.seed_unknown_action_type(&id).await;
    assert!(matches!(
        fx.blocklist.get_logs(100).await,
        Err(BlocklistError::InvalidActionType(_) | BlocklistError::Serialization(_))
    ));
    assert!(matches!(
        fx.blocklist.get_logs(1).await,
        Err(BlocklistError::InvalidActionType(_) | BlocklistError::Serialization(_))
    ));
}

pub async fn dmca_scenario(fx: Fixture) {
    let (_, x) = cid_pair(b"infringing upload");
    let data = BlockData {
        content: vec!["https://gateway.example/ipfs/x".into()],
        reason: "DMCA".into(),
        user: "alice@example.com".into(),
    };

    fx.blocklist.block(&x, &data).await.unwrap();
    assert!(fx.blocklist.contains(&x).await.unwrap());

    let item = fx.blocklist.search(&x).await.unwrap();
    assert_eq!(item.hash, ContentKey::from(&x).to_string());
    assert_eq!(item.reason, "DMCA");
    assert_eq!(item.user, "alice@example.com");

    let action = Action::new(ActionType::Block, vec![x], "DMCA", "alice@example.com");
    fx.blocklist.add_log(&action).await.unwrap();
    assert_eq!(fx.blocklist.get_logs(1).await.unwrap(), vec![action]);
}

pub async fn block_and_log_records_changes(fx: Fixture) {
    let (_, existing) = cid_pair(b"already");
    let (_, fresh) = cid_pair(b"fresh");
    fx.blocklist.block(&existing, &BlockData::default()).await.unwrap();

    let data = block_data("mod@example.com", "abuse");
    let applied = fx
        .blocklist
        .block_and_log(&[existing, fresh], &data)
        .await
        .unwrap();
    assert_eq!(applied, vec![fresh]);

    let logs = fx.blocklist.get_logs(10).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].typ, ActionType::Block);
    assert_eq!(logs[0].ids, vec![fresh]);
    assert_eq!(logs[0].user, "mod@example.com");

    let (_, unknown) = cid_pair(b"unknown");
    let applied = fx
        .blocklist
        .unblock_and_log(&[existing, unknown], "appeal", "mod@example.com")
        .await
        .unwrap();
    assert_eq!(applied, vec![existing]);
    assert!(!fx.blocklist.contains(&existing).await.unwrap());

    let logs = fx.blocklist.get_logs(10).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().any(|a| a.typ == ActionType::Unblock && a.ids == vec![existing]));
}

pub async fn concurrent_blocks_create_one_entry(fx: Fixture) {
    let (v0, v1) = cid_pair(b"contended");

    let mut handles = Vec::new();
    for i in 0..8 {
        let blocklist = fx.blocklist.clone();
        let id = if i % 2 == 0 { v0 } else { v1 };
        handles.push(tokio::spawn(async move {
            blocklist
                .block(&id, &block_data(&format!("user{i}@example.com"), ""))
                .await
        }));
    }

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            created += 1;
        }
    }
    assert_eq!(created, 1);
    assert!(fx.blocklist.contains(&v0).await.unwrap());
}

macro_rules! contract_tests {
    ($backend:ident, $setup:expr) => {
        mod $backend {
            use crate::common::Fixture;
            use crate::contract;

            #[tokio::test]
            async fn legacy_and_current_versions_agree() {
                contract::legacy_and_current_versions_agree($setup.await).await;
            }

            #[tokio::test]
            async fn block_is_idempotent() {
                contract::block_is_idempotent($setup.await).await;
            }

            #[tokio::test]
            async fn unblock_then_reblock_is_fresh() {
                contract::unblock_then_reblock_is_fresh($setup.await).await;
            }

            #[tokio::test]
            async fn missing_entries_are_not_found() {
                contract::missing_entries_are_not_found($setup.await).await;
            }

            #[tokio::test]
            async fn purge_removes_payload_only() {
                contract::purge_removes_payload_only($setup.await).await;
            }

            #[tokio::test]
            async fn logs_are_newest_first_and_capped() {
                contract::logs_are_newest_first_and_capped($setup.await).await;
            }

            #[tokio::test]
            async fn invalid_actions_leave_log_unchanged() {
                contract::invalid_actions_leave_log_unchanged($setup.await).await;
            }

            #[tokio::test]
            async fn stored_unknown_action_type_fails_get_logs() {
                contract::stored_unknown_action_type_fails_get_logs($setup.await).await;
            }

            #[tokio::test]
            async fn dmca_scenario() {
                contract::dmca_scenario($setup.await).await;
            }

            #[tokio::test]
            async fn block_and_log_records_changes() {
                contract::block_and_log_records_changes($setup.await).await;
            }

            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn concurrent_blocks_create_one_entry() {
                contract::concurrent_blocks_create_one_entry($setup.await).await;
            }
        }
    };
}

contract_tests!(memory, Fixture::memory());
contract_tests!(filesystem, Fixture::filesystem());
contract_tests!(sqlite, Fixture::sqlite());
