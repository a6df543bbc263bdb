//! Property tests for merging and planning.
//!
//! Usernames are drawn from a tiny alphabet in mixed case so that collisions
//! across sources and case variants are common.

use crate::common::builders::HarnessBuilder;
use crate::common::fixtures::{JELLYFIN_ID, PLEX_ID};
use proptest::prelude::*;
use seerr_sync::adapters::TargetAccount;
use seerr_sync::error::SourceError;
use seerr_sync::identity::{RawSourceUser, SourceBatch, SourceType, canonical_username, merge};
use seerr_sync::planner::{SourceFailure, plan};
use seerr_sync::policy::{InMemoryPolicyStore, PolicyOverride};
use std::collections::HashSet;

const SERVERS: [&str; 3] = ["plex-a", "jf-b", "emby-c"];

fn username_strategy() -> impl Strategy<Value = String> {
    "[abcABC]{1,3}"
}

fn batches_strategy() -> impl Strategy<Value = Vec<SourceBatch>> {
    prop::collection::vec(prop::collection::vec(username_strategy(), 0..8), 1..=3).prop_map(
        |lists| {
            lists
                .into_iter()
                .zip(SERVERS)
                .map(|(names, server)| {
                    let users = names
                        .into_iter()
                        .enumerate()
                        .map(|(i, name)| {
                            RawSourceUser::new(server, SourceType::Plex, name, i.to_string())
                        })
                        .collect();
                    SourceBatch::new(server, users)
                })
                .collect()
        },
    )
}

fn accounts(usernames: &[String]) -> Vec<TargetAccount> {
    usernames
        .iter()
        .enumerate()
        .map(|(i, name)| TargetAccount::new(name.clone(), i.to_string()))
        .collect()
}

fn policy_store(blocked: &[String], immune: &[String]) -> InMemoryPolicyStore {
    let store = InMemoryPolicyStore::new();
    for name in blocked {
        store.set(PolicyOverride::new(name).blocked());
    }
    for name in immune {
        // Keep any blocked flag already set for the same name.
        let mut policy = PolicyOverride::new(name).immune();
        policy.blocked = blocked.iter().any(|b| canonical_username(b) == policy.username);
        store.set(policy);
    }
    store
}

proptest! {
    #[test]
    fn test_merge_yields_one_user_per_canonical_name(batches in batches_strategy()) {
        let unified = merge(&batches);

        let expected: HashSet<String> = batches
            .iter()
            .flat_map(|batch| batch.users.iter())
            .map(|user| canonical_username(&user.username))
            .collect();
        let merged: HashSet<String> = unified.iter().map(|user| user.username.clone()).collect();

        prop_assert_eq!(unified.len(), merged.len());
        prop_assert_eq!(merged, expected);
        for user in &unified {
            prop_assert_eq!(canonical_username(&user.display_username), user.username.clone());
            prop_assert!(!user.source_servers.is_empty());
        }
    }

    #[test]
    fn test_plan_is_deterministic(
        batches in batches_strategy(),
        target in prop::collection::vec(username_strategy(), 0..8),
        blocked in prop::collection::vec(username_strategy(), 0..3),
        remove_missing in any::<bool>(),
    ) {
        let unified = merge(&batches);
        let target = accounts(&target);
        let policy = policy_store(&blocked, &[]);

        let first = plan(&unified, &target, &policy, &[], remove_missing);
        let second = plan(&unified, &target, &policy, &[], remove_missing);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_any_source_failure_prevents_deletion(
        batches in batches_strategy(),
        target in prop::collection::vec(username_strategy(), 0..8),
    ) {
        let unified = merge(&batches);
        let target = accounts(&target);
        let failures = vec![SourceFailure::new("offline", SourceError::unreachable("down"))];

        let result = plan(&unified, &target, &InMemoryPolicyStore::new(), &failures, true);
        prop_assert!(result.to_delete.is_empty());
    }

    #[test]
    fn test_policy_flags_are_honoured(
        batches in batches_strategy(),
        target in prop::collection::vec(username_strategy(), 0..8),
        blocked in prop::collection::vec(username_strategy(), 0..3),
        immune in prop::collection::vec(username_strategy(), 0..3),
    ) {
        let unified = merge(&batches);
        let target = accounts(&target);
        let policy = policy_store(&blocked, &immune);

        let result = plan(&unified, &target, &policy, &[], true);

        let blocked: HashSet<String> = blocked.iter().map(|b| canonical_username(b)).collect();
        let immune: HashSet<String> = immune.iter().map(|i| canonical_username(i)).collect();
        for user in &result.to_create {
            prop_assert!(!blocked.contains(&user.username));
        }
        for account in &result.to_delete {
            prop_assert!(!immune.contains(&canonical_username(&account.username)));
        }
    }

    #[test]
    fn test_applied_plan_converges(
        batches in batches_strategy(),
        target in prop::collection::vec(username_strategy(), 0..8),
        blocked in prop::collection::vec(username_strategy(), 0..3),
    ) {
        let unified = merge(&batches);
        let target = accounts(&target);
        let policy = policy_store(&blocked, &[]);

        let first = plan(&unified, &target, &policy, &[], true);

        let deleted: HashSet<&str> = first
            .to_delete
            .iter()
            .map(|account| account.native_id.as_str())
            .collect();
        let mut after: Vec<TargetAccount> = target
            .iter()
            .filter(|account| !deleted.contains(account.native_id.as_str()))
            .cloned()
            .collect();
        after.extend(
            first
                .to_create
                .iter()
                .map(|user| TargetAccount::new(user.display_username.clone(), format!("new-{}", user.username))),
        );

        let second = plan(&unified, &after, &policy, &[], true);
        prop_assert!(second.is_noop(), "second plan not empty: {:?}", second);
    }

    #[test]
    fn test_repeated_passes_are_idempotent(
        plex in prop::collection::vec(username_strategy(), 0..6),
        jellyfin in prop::collection::vec(username_strategy(), 0..6),
        target in prop::collection::vec(username_strategy(), 0..4),
    ) {
        tokio_test::block_on(async {
            let harness = HarnessBuilder::new()
                .remove_missing(true)
                .target_accounts(target)
                .build();
            harness.plex.set_users(PLEX_ID, plex).await;
            harness.jellyfin.set_users(JELLYFIN_ID, jellyfin).await;

            let first = harness.orchestrator.run_pass_now().await.unwrap();
            assert!(first.is_clean(), "first pass failures: {:?}", first.account_failures);

            let second = harness.orchestrator.run_pass_now().await.unwrap();
            assert!(second.plan.is_noop(), "second plan not empty: {:?}", second.plan);
        });
    }
}
