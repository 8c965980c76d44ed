// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{Harness, AGENT};
use dm_adapters::ServerCall;
use dm_core::{App, Category, CommandResult, Outcome, ResultEntry, Source, Version};

fn release(code: i64) -> Release {
    Release {
        version: Version::new(code),
        source: Source::Store {
            id: "agent".to_string(),
        },
    }
}

fn release_checks(h: &Harness) -> usize {
    h.server
        .calls()
        .iter()
        .filter(|c| **c == ServerCall::LatestRelease)
        .count()
}

#[tokio::test]
async fn sync_is_scheduled_once_per_interval() {
    let h = Harness::new();
    let mut maintenance = Maintenance::new();

    maintenance.run(&h.ctx, false).await;
    maintenance.run(&h.ctx, false).await;
    assert_eq!(h.ctx.queues.immediate.len(), 1);
    assert!(h.ctx.queues.contains(CommandKindTag::Sync));

    // still queued, so not duplicated
    h.clock.advance(h.ctx.config.sync_interval);
    maintenance.run(&h.ctx, false).await;
    assert_eq!(h.ctx.queues.immediate.len(), 1);

    h.ctx.queues.immediate.pop();
    h.clock.advance(h.ctx.config.sync_interval);
    maintenance.run(&h.ctx, false).await;
    assert_eq!(h.ctx.queues.immediate.len(), 1);
}

#[tokio::test]
async fn failed_submission_is_retried_next_run() {
    let h = Harness::new();
    let mut result = CommandResult::new();
    result.succeed();
    h.ctx.reporter.record(ResultEntry::for_command("c-1", &result));
    h.server.fail_submit(1);

    let mut maintenance = Maintenance::new();
    maintenance.run(&h.ctx, false).await;
    assert!(h.server.submitted().is_empty());
    assert_eq!(h.ctx.reporter.pending(), 1);

    maintenance.run(&h.ctx, false).await;
    assert_eq!(h.server.submitted().len(), 1);
    assert_eq!(h.ctx.reporter.pending(), 0);
}

#[tokio::test]
async fn newer_release_queues_a_self_update() {
    let h = Harness::new();
    h.server.set_release(Some(release(11)));

    Maintenance::new().run(&h.ctx, false).await;
    assert!(h.ctx.queues.contains(CommandKindTag::SelfUpdate));
}

#[tokio::test]
async fn current_release_is_ignored() {
    let h = Harness::new();
    h.server.set_release(Some(release(10)));

    Maintenance::new().run(&h.ctx, false).await;
    assert_eq!(release_checks(&h), 1);
    assert!(!h.ctx.queues.contains(CommandKindTag::SelfUpdate));
}

#[tokio::test]
async fn parked_update_suppresses_the_check() {
    let h = Harness::new();
    h.server.set_release(Some(release(11)));

    Maintenance::new().run(&h.ctx, true).await;
    assert_eq!(release_checks(&h), 0);
    assert!(!h.ctx.queues.contains(CommandKindTag::SelfUpdate));
}

#[tokio::test]
async fn update_check_runs_once_per_interval() {
    let h = Harness::new();
    let mut maintenance = Maintenance::new();

    maintenance.run(&h.ctx, false).await;
    maintenance.run(&h.ctx, false).await;
    assert_eq!(release_checks(&h), 1);

    h.clock.advance(h.ctx.config.self_update_interval);
    maintenance.run(&h.ctx, false).await;
    assert_eq!(release_checks(&h), 2);
}

#[tokio::test]
async fn installed_release_is_not_reinstalled() {
    let h = Harness::new();
    h.server.set_release(Some(release(11)));

    let mut agent = App::new(AGENT, Category::Agent).with_version(Version::new(11));
    agent.received(&h.clock);
    agent.processing_started(&h.clock).unwrap();
    agent.completed(Outcome::Completed, None, &h.clock).unwrap();
    h.ctx.store.insert(&agent).await.unwrap();

    Maintenance::new().run(&h.ctx, false).await;
    assert!(!h.ctx.queues.contains(CommandKindTag::SelfUpdate));
}

#[yare::parameterized(
    first_run = { None, 0, true },
    too_soon = { Some(5), 10, false },
    exactly_due = { Some(10), 10, true },
)]
fn due_after_interval(elapsed: Option<u64>, interval: u64, expected: bool) {
    let now = Instant::now() + Duration::from_secs(60);
    let last = elapsed.map(|secs| now - Duration::from_secs(secs));
    assert_eq!(is_due(last, Duration::from_secs(interval), now), expected);
}
