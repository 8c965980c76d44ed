// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{install, settle, Harness};
use dm_core::{Outcome, Step};
use std::time::Duration;

const PACKAGE: &str = "com.example.foo";

#[tokio::test]
async fn completion_wakes_the_waiting_command() {
    let h = Harness::new();
    let queued = h.accepted(install("act-1", PACKAGE, h.local_file("foo.pkg"))).await;
    h.ctx.background.hand_off(&h.ctx, queued);

    settle(|| h.ctx.background.state() == Some(HandlerState::Waiting)).await;
    let reference = h.installer.last_reference().unwrap();
    assert!(h.installer.complete(&reference, CompletionCode::Success));

    settle(|| h.ctx.background.state() == Some(HandlerState::Complete)).await;
    let app = h.store.app(PACKAGE).unwrap();
    assert_eq!(app.lifecycle.step(), Some(Step::Done(Outcome::Completed)));
    assert_eq!(h.ctx.queues.in_flight.count(), 0);
    assert_eq!(h.ctx.reporter.pending(), 1);
}

#[tokio::test]
async fn completed_handler_refuses_work() {
    let h = Harness::new();
    h.installer.set_immediate(Some(CompletionCode::Success));
    let queued = h.accepted(install("act-1", PACKAGE, h.local_file("foo.pkg"))).await;
    let handler = BackgroundHandler::spawn(Arc::clone(&h.ctx), queued);

    settle(|| handler.state() == HandlerState::Complete).await;
    let late = h.accepted(install("act-2", PACKAGE, h.local_file("foo.pkg"))).await;
    let returned = handler.enqueue(late).unwrap_err();
    assert_eq!(returned.command.id(), Some("act-2"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn enqueue_races_completion_without_losing_commands() {
    let h = Harness::new();
    let mut rejected = 0;
    let trials = 100;
    let per_trial = 4;

    for trial in 0..trials {
        let payload = |n: usize| install(&format!("act-{}-{}", trial, n), PACKAGE, h.local_file("x.pkg"));
        // never accepted, so each one fails fast on the handler and is reported
        let first = Queued {
            command: h.command(payload(0)),
            guard: h.ctx.queues.in_flight.acquire(),
        };
        let handler = BackgroundHandler::spawn(Arc::clone(&h.ctx), first);
        for n in 1..per_trial {
            if (trial + n) % 2 == 0 {
                tokio::task::yield_now().await;
            }
            let queued = Queued {
                command: h.command(payload(n)),
                guard: h.ctx.queues.in_flight.acquire(),
            };
            if handler.enqueue(queued).is_err() {
                rejected += 1;
            }
        }

        let mut waited = 0;
        while handler.state() != HandlerState::Complete {
            waited += 1;
            assert!(waited < 5_000, "handler never completed");
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    assert_eq!(h.ctx.reporter.pending() + rejected, trials * per_trial);
    assert_eq!(h.ctx.queues.in_flight.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn timeout_fails_the_action_and_late_wake_is_dropped() {
    let h = Harness::with_config(|c| c.completion_timeout = Some(Duration::from_secs(10)));
    let queued = h.accepted(install("act-1", PACKAGE, h.local_file("foo.pkg"))).await;
    h.ctx.background.hand_off(&h.ctx, queued);

    settle(|| h.ctx.background.state() == Some(HandlerState::Waiting)).await;
    tokio::time::sleep(Duration::from_secs(11)).await;
    settle(|| h.ctx.background.state() == Some(HandlerState::Complete)).await;

    let app = h.store.app(PACKAGE).unwrap();
    assert!(app.lifecycle.has_error());
    assert_eq!(app.reason.as_deref(), Some("timed out awaiting completion"));

    let reference = h.installer.last_reference().unwrap();
    assert!(!h.ctx.background.wake(reference, CompletionCode::Success));
    assert!(h.store.app(PACKAGE).unwrap().lifecycle.has_error());
}

#[tokio::test(start_paused = true)]
async fn late_wake_does_not_complete_the_next_command() {
    let h = Harness::with_config(|c| c.completion_timeout = Some(Duration::from_secs(10)));
    let first = h.accepted(install("act-1", PACKAGE, h.local_file("foo.pkg"))).await;
    let second = h
        .accepted(install("act-2", "com.example.bar", h.local_file("bar.pkg")))
        .await;
    h.ctx.background.hand_off(&h.ctx, first);
    h.ctx.background.hand_off(&h.ctx, second);

    settle(|| h.ctx.background.state() == Some(HandlerState::Waiting)).await;
    let timed_out = h.installer.last_reference().unwrap();
    tokio::time::sleep(Duration::from_secs(11)).await;
    settle(|| {
        h.installer.calls().len() == 2 && h.ctx.background.state() == Some(HandlerState::Waiting)
    })
    .await;
    let waiting = h.installer.last_reference().unwrap();
    assert_ne!(timed_out, waiting);

    assert!(!h.ctx.background.wake(timed_out, CompletionCode::Success));
    for _ in 0..100 {
        tokio::task::yield_now().await;
    }
    assert_eq!(h.ctx.background.state(), Some(HandlerState::Waiting));
    let bar = h.store.app("com.example.bar").unwrap();
    assert_eq!(bar.lifecycle.step(), Some(Step::Active));
    assert!(!bar.lifecycle.is_installed());

    assert!(h.ctx.background.wake(waiting, CompletionCode::Success));
    settle(|| h.ctx.background.state() == Some(HandlerState::Complete)).await;
    assert!(h.store.app("com.example.bar").unwrap().lifecycle.is_installed());
    assert!(h.store.app(PACKAGE).unwrap().lifecycle.has_error());
}

#[tokio::test(start_paused = true)]
async fn late_wake_is_dropped_by_a_replacement_handler() {
    let h = Harness::with_config(|c| c.completion_timeout = Some(Duration::from_secs(10)));
    let first = h.accepted(install("act-1", PACKAGE, h.local_file("foo.pkg"))).await;
    h.ctx.background.hand_off(&h.ctx, first);
    settle(|| h.ctx.background.state() == Some(HandlerState::Waiting)).await;
    let timed_out = h.installer.last_reference().unwrap();
    tokio::time::sleep(Duration::from_secs(11)).await;
    settle(|| h.ctx.background.state() == Some(HandlerState::Complete)).await;

    let second = h
        .accepted(install("act-2", "com.example.bar", h.local_file("bar.pkg")))
        .await;
    h.ctx.background.hand_off(&h.ctx, second);
    settle(|| {
        h.installer.calls().len() == 2 && h.ctx.background.state() == Some(HandlerState::Waiting)
    })
    .await;

    assert!(!h.ctx.background.wake(timed_out, CompletionCode::Success));
    assert_eq!(h.ctx.background.state(), Some(HandlerState::Waiting));
    assert!(!h
        .store
        .app("com.example.bar")
        .unwrap()
        .lifecycle
        .is_installed());
}

#[tokio::test]
async fn mismatched_reference_still_wakes() {
    let h = Harness::new();
    let queued = h.accepted(install("act-1", PACKAGE, h.local_file("foo.pkg"))).await;
    h.ctx.background.hand_off(&h.ctx, queued);

    settle(|| h.ctx.background.state() == Some(HandlerState::Waiting)).await;
    assert!(h
        .ctx
        .background
        .wake(ReferenceId::from("someone-else"), CompletionCode::Success));

    settle(|| h.ctx.background.state() == Some(HandlerState::Complete)).await;
    assert!(h.store.app(PACKAGE).unwrap().lifecycle.is_installed());
}

#[tokio::test]
async fn busy_installer_defers_the_command() {
    let h = Harness::new();
    h.installer.set_busy(1);
    let queued = h.accepted(install("act-1", PACKAGE, h.local_file("foo.pkg"))).await;
    h.ctx.background.hand_off(&h.ctx, queued);

    settle(|| h.ctx.queues.deferred.len() == 1).await;
    settle(|| h.ctx.background.state() == Some(HandlerState::Complete)).await;
    assert_eq!(h.ctx.queues.in_flight.count(), 1);
    assert!(h.ctx.events.recent().is_empty());
    assert_eq!(h.ctx.reporter.pending(), 0);
}

#[tokio::test]
async fn hand_off_replaces_a_completed_handler() {
    let h = Harness::new();
    h.installer.set_immediate(Some(CompletionCode::Success));

    let first = h.accepted(install("act-1", PACKAGE, h.local_file("foo.pkg"))).await;
    h.ctx.background.hand_off(&h.ctx, first);
    settle(|| h.ctx.background.state() == Some(HandlerState::Complete)).await;

    let second = h.accepted(install("act-2", PACKAGE, h.local_file("foo.pkg"))).await;
    h.ctx.background.hand_off(&h.ctx, second);
    settle(|| h.ctx.reporter.pending() == 2).await;
    assert_eq!(h.installer.calls().len(), 2);
}

#[test]
fn wake_without_handler_is_dropped() {
    let slot = HandlerSlot::default();
    assert!(!slot.wake(ReferenceId::from("r-1"), CompletionCode::Success));
    assert_eq!(slot.state(), None);
}
