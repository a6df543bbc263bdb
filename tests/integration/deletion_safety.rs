//! Removal of target accounts under source failures and policy.

use crate::common::builders::HarnessBuilder;
use crate::common::fixtures::{JELLYFIN_ID, PLEX_ID};
use crate::common::{account_names, usernames};
use seerr_sync::error::SourceError;
use seerr_sync::planner::DeletionSafety;
use seerr_sync::policy::PolicyOverride;
use seerr_sync::provenance::ProvenanceStore;

#[tokio::test]
async fn test_failed_source_blocks_all_deletions() {
    let harness = HarnessBuilder::new()
        .remove_missing(true)
        .target_accounts(["alice", "dave", "erin"])
        .build();
    harness.plex.set_users(PLEX_ID, ["alice"]).await;
    harness
        .jellyfin
        .fail_listing(JELLYFIN_ID, SourceError::unreachable("connection refused"))
        .await;

    let report = harness.orchestrator.run_pass_now().await.unwrap();

    assert!(report.plan.to_delete.is_empty());
    assert_eq!(report.plan.retained_unconfirmed, vec!["dave", "erin"]);
    assert!(report.deleted.is_empty());
    assert_eq!(
        harness.target.usernames().await,
        vec!["alice", "dave", "erin"]
    );
}

#[tokio::test]
async fn test_deletions_resume_once_sources_recover() {
    let harness = HarnessBuilder::new()
        .remove_missing(true)
        .target_accounts(["alice", "dave"])
        .build();
    harness.plex.set_users(PLEX_ID, ["alice"]).await;
    harness
        .jellyfin
        .fail_listing(JELLYFIN_ID, SourceError::unreachable("down"))
        .await;

    let first = harness.orchestrator.run_pass_now().await.unwrap();
    assert!(first.deleted.is_empty());

    harness.jellyfin.clear_failures().await;
    let second = harness.orchestrator.run_pass_now().await.unwrap();

    assert_eq!(account_names(&second.deleted), vec!["dave"]);
    assert_eq!(harness.target.usernames().await, vec!["alice"]);
}

#[tokio::test]
async fn test_immune_account_survives_cleanup() {
    let harness = HarnessBuilder::new()
        .remove_missing(true)
        .target_accounts(["Dave", "erin"])
        .policy(PolicyOverride::new("dave").immune())
        .build();

    let report = harness.orchestrator.run_pass_now().await.unwrap();

    assert!(report.source_failures.is_empty());
    assert_eq!(account_names(&report.plan.to_delete), vec!["erin"]);
    assert_eq!(report.plan.skipped_immune, vec!["dave"]);
    assert_eq!(harness.target.usernames().await, vec!["Dave"]);
}

#[tokio::test]
async fn test_missing_accounts_kept_without_remove_missing() {
    let harness = HarnessBuilder::new()
        .remove_missing(false)
        .target_accounts(["alice", "dave"])
        .build();
    harness.plex.set_users(PLEX_ID, ["alice"]).await;

    let report = harness.orchestrator.run_pass_now().await.unwrap();

    assert!(report.plan.to_delete.is_empty());
    assert_eq!(report.plan.retained_missing, vec!["dave"]);
    assert_eq!(harness.target.usernames().await, vec!["alice", "dave"]);
}

#[tokio::test]
async fn test_reported_blocked_account_is_not_deleted() {
    let harness = HarnessBuilder::new()
        .remove_missing(true)
        .target_accounts(["bob"])
        .policy(PolicyOverride::new("bob").blocked())
        .build();
    harness.plex.set_users(PLEX_ID, ["bob"]).await;

    let report = harness.orchestrator.run_pass_now().await.unwrap();

    assert!(report.plan.is_noop());
    assert_eq!(report.plan.skipped_blocked, vec!["bob"]);
    assert_eq!(harness.target.usernames().await, vec!["bob"]);
}

#[tokio::test]
async fn test_skip_unconfirmed_deletes_accounts_from_healthy_servers() {
    let harness = HarnessBuilder::new()
        .remove_missing(true)
        .deletion_safety(DeletionSafety::SkipUnconfirmed)
        .build();
    harness.plex.set_users(PLEX_ID, ["alice", "dave"]).await;
    harness.jellyfin.set_users(JELLYFIN_ID, ["carol", "erin"]).await;

    let first = harness.orchestrator.run_pass_now().await.unwrap();
    assert_eq!(first.created_count(), 4);
    assert_eq!(harness.provenance.len(), 4);

    // dave leaves Plex while Jellyfin goes down.
    harness.plex.set_users(PLEX_ID, ["alice"]).await;
    harness
        .jellyfin
        .fail_listing(JELLYFIN_ID, SourceError::unreachable("down"))
        .await;

    let second = harness.orchestrator.run_pass_now().await.unwrap();

    assert_eq!(account_names(&second.deleted), vec!["dave"]);
    let mut retained = second.plan.retained_unconfirmed.clone();
    retained.sort();
    assert_eq!(retained, vec!["carol", "erin"]);

    assert!(harness.provenance.known_servers("dave").is_none());
    assert!(
        harness
            .provenance
            .known_servers("erin")
            .unwrap()
            .contains(JELLYFIN_ID)
    );
}

#[tokio::test]
async fn test_skip_unconfirmed_keeps_accounts_with_unknown_provenance() {
    let harness = HarnessBuilder::new()
        .remove_missing(true)
        .deletion_safety(DeletionSafety::SkipUnconfirmed)
        .target_accounts(["zed"])
        .build();
    harness.plex.set_users(PLEX_ID, ["alice"]).await;
    harness
        .jellyfin
        .fail_listing(JELLYFIN_ID, SourceError::unreachable("down"))
        .await;

    let report = harness.orchestrator.run_pass_now().await.unwrap();

    assert!(report.plan.to_delete.is_empty());
    assert_eq!(report.plan.retained_unconfirmed, vec!["zed"]);
    assert_eq!(usernames(&report.plan.to_create), vec!["alice"]);
}

#[tokio::test]
async fn test_provenance_survives_failed_server() {
    let harness = HarnessBuilder::new()
        .remove_missing(true)
        .deletion_safety(DeletionSafety::SkipUnconfirmed)
        .build();
    harness.plex.set_users(PLEX_ID, ["alice"]).await;
    harness.jellyfin.set_users(JELLYFIN_ID, ["alice"]).await;
    harness.orchestrator.run_pass_now().await.unwrap();

    // Jellyfin down: alice is still seen on Plex, but Jellyfin's claim is kept.
    harness
        .jellyfin
        .fail_listing(JELLYFIN_ID, SourceError::unreachable("down"))
        .await;
    harness.orchestrator.run_pass_now().await.unwrap();

    let known = harness.provenance.known_servers("alice").unwrap();
    assert!(known.contains(PLEX_ID));
    assert!(known.contains(JELLYFIN_ID));

    // Plex drops alice while Jellyfin is still down: not provably gone.
    harness.plex.set_users(PLEX_ID, Vec::<String>::new()).await;
    let report = harness.orchestrator.run_pass_now().await.unwrap();

    assert!(report.deleted.is_empty());
    assert_eq!(report.plan.retained_unconfirmed, vec!["alice"]);
}

#[tokio::test]
async fn test_provenance_dropped_for_users_gone_everywhere() {
    let harness = HarnessBuilder::new()
        .remove_missing(false)
        .policy(PolicyOverride::new("bob").blocked())
        .build();
    harness.plex.set_users(PLEX_ID, ["alice", "bob", "carol"]).await;

    harness.orchestrator.run_pass_now().await.unwrap();
    assert!(harness.provenance.known_servers("bob").is_some());

    // bob was never created and carol stays in the target while unreported.
    harness.plex.set_users(PLEX_ID, ["alice"]).await;
    let report = harness.orchestrator.run_pass_now().await.unwrap();

    assert_eq!(report.plan.retained_missing, vec!["carol"]);
    assert!(harness.provenance.known_servers("bob").is_none());
    assert!(harness.provenance.known_servers("carol").is_some());
    assert!(harness.provenance.known_servers("alice").is_some());
    assert_eq!(harness.provenance.len(), 2);
}
