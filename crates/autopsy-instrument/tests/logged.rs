//! Behaviour of the `#[logged]` attribute on sync and async functions

mod common;

use autopsy_instrument::logged;
use autopsy_traceback::{fault, frame, Fault, ResultExt};
use common::capture;
use futures::FutureExt;
use std::collections::HashMap;
use std::num::ParseIntError;
use std::panic::{self, AssertUnwindSafe};
use tracing::Level;

/// Adds two numbers.
#[logged]
fn add(a: i32, b: i32) -> i32 {
    a + b
}

#[logged(log_none_return = false)]
fn notify_quiet(user: &str) {
    let _ = user;
}

#[logged]
fn notify(user: &str) {
    let _ = user;
}

#[logged]
fn find(id: u32) -> Option<&'static str> {
    (id == 1).then_some("root")
}

#[logged]
fn parse(raw: &str) -> Result<u32, ParseIntError> {
    raw.parse()
}

#[logged(failure_level = "error", level = "info")]
fn read_port(raw: &str) -> anyhow::Result<u16> {
    let port: u16 = raw.trim().parse()?;
    if port == 0 {
        anyhow::bail!("port 0 is reserved");
    }
    Ok(port)
}

#[logged]
fn explode(n: u8) -> u8 {
    if n > 2 {
        panic!("boom {}", n);
    }
    n
}

#[logged(skip(token), name = "auth.check")]
fn check(user: &str, token: &str) -> bool {
    !user.is_empty() && token.len() > 3
}

#[logged]
async fn double(x: u64) -> u64 {
    tokio::task::yield_now().await;
    x * 2
}

#[logged(failure_level = "error")]
async fn lookup(id: u32) -> Result<String, Fault> {
    tokio::task::yield_now().await;
    let known = HashMap::from([(1_u32, "ada")]);
    known
        .get(&id)
        .map(|name| name.to_string())
        .ok_or_else(|| fault!(NotFound, "no user {}", id))
        .at(|| frame!(id))
}

#[logged]
async fn stall() -> u8 {
    std::future::pending::<()>().await;
    0
}

struct Counter {
    total: u32,
}

impl Counter {
    #[logged(level = "trace")]
    fn bump(&mut self, by: u32) -> u32 {
        self.total += by;
        self.total
    }
}

#[test]
fn test_add_scenario() {
    let (layer, subscriber) = capture();
    let result = tracing::subscriber::with_default(subscriber, || add(2, 3));

    assert_eq!(result, 5);
    let events = layer.events();
    assert_eq!(layer.messages(), vec!["add (2, 3)", "add returns 5"]);
    assert!(events.iter().all(|e| e.level == Level::DEBUG));
    assert!(events[0].call_id.is_some());
    assert_eq!(events[0].call_id, events[1].call_id);
}

#[test]
fn test_signature_preserved() {
    let as_pointer: fn(i32, i32) -> i32 = add;
    assert_eq!(as_pointer(1, 1), 2);
}

#[test]
fn test_none_return_suppressed_when_disabled() {
    let (layer, subscriber) = capture();
    tracing::subscriber::with_default(subscriber, || notify_quiet("ann"));
    assert_eq!(layer.messages(), vec!["notify_quiet (\"ann\",)"]);
}

#[test]
fn test_none_return_logged_by_default() {
    let (layer, subscriber) = capture();
    tracing::subscriber::with_default(subscriber, || {
        notify("ann");
        find(2);
    });
    assert_eq!(
        layer.messages(),
        vec![
            "notify (\"ann\",)",
            "notify returns ()",
            "find (2,)",
            "find returns None",
        ]
    );
}

#[test]
fn test_err_logged_and_returned_unchanged() {
    let (layer, subscriber) = capture();
    let result = tracing::subscriber::with_default(subscriber, || parse("x"));

    assert_eq!(result, "x".parse::<u32>());
    let events = layer.events();
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[1].message,
        "error in parse (\"x\",): ParseIntError { kind: InvalidDigit }"
    );
    assert_eq!(events[1].level, Level::DEBUG);
}

#[test]
fn test_question_mark_in_body() {
    let (layer, subscriber) = capture();
    let (ok, err) = tracing::subscriber::with_default(subscriber, || {
        (read_port(" 8080 "), read_port("0"))
    });

    assert_eq!(ok.unwrap(), 8080);
    assert_eq!(err.unwrap_err().to_string(), "port 0 is reserved");

    let events = layer.events();
    assert_eq!(events[1].message, "read_port returns 8080");
    assert_eq!(events[1].level, Level::INFO);
    assert_eq!(events[3].level, Level::ERROR);
    assert!(events[3].message.starts_with("error in read_port (\"0\",): "));
    assert_eq!(
        events.iter().filter(|e| e.message.starts_with("error in")).count(),
        1
    );
}

#[test]
fn test_panic_logged_once_and_resumed() {
    let (layer, subscriber) = capture();
    let outcome = tracing::subscriber::with_default(subscriber, || {
        panic::catch_unwind(|| explode(3))
    });

    let payload = outcome.unwrap_err();
    assert_eq!(payload.downcast_ref::<String>().unwrap(), "boom 3");
    assert_eq!(
        layer.messages(),
        vec!["explode (3,)", "error in explode (3,): panic(\"boom 3\")"]
    );
}

#[test]
fn test_skip_and_custom_name() {
    let (layer, subscriber) = capture();
    let allowed = tracing::subscriber::with_default(subscriber, || check("ann", "hunter2"));

    assert!(allowed);
    let messages = layer.messages();
    assert_eq!(messages[0], "auth.check (\"ann\", _)");
    assert!(!messages.iter().any(|m| m.contains("hunter2")));
}

#[test]
fn test_method_receiver_not_rendered() {
    let (layer, subscriber) = capture();
    let mut counter = Counter { total: 1 };
    let total = tracing::subscriber::with_default(subscriber, || counter.bump(2));

    assert_eq!(total, 3);
    assert_eq!(layer.messages(), vec!["bump (2,)", "bump returns 3"]);
    assert!(layer.events().iter().all(|e| e.level == Level::TRACE));
}

#[tokio::test]
async fn test_async_brackets_suspension() {
    let (layer, subscriber) = capture();
    let _guard = tracing::subscriber::set_default(subscriber);

    assert_eq!(double(21).await, 42);
    assert_eq!(layer.messages(), vec!["double (21,)", "double returns 42"]);
}

#[tokio::test]
async fn test_async_error_preserved() {
    let (layer, subscriber) = capture();
    let _guard = tracing::subscriber::set_default(subscriber);

    assert_eq!(lookup(1).await.unwrap(), "ada");

    let fault = lookup(9).await.unwrap_err();
    assert_eq!(fault.kind(), "NotFound");
    assert_eq!(fault.message(), "no user 9");
    assert_eq!(fault.frames().len(), 1);
    assert_eq!(fault.frames()[0].locals()[0].value, "9");

    let failures: Vec<_> = layer
        .events()
        .into_iter()
        .filter(|e| e.level == Level::ERROR)
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].message,
        "error in lookup (9,): NotFound(\"no user 9\")"
    );
}

#[tokio::test]
async fn test_concurrent_calls_keep_their_own_lines() {
    let (layer, subscriber) = capture();
    let _guard = tracing::subscriber::set_default(subscriber);

    let (a, b, c) = tokio::join!(double(1), double(2), double(3));
    assert_eq!((a, b, c), (2, 4, 6));

    let events = layer.events();
    assert_eq!(events.len(), 6);

    // Entries all happen before any exit: the calls really interleaved
    let first_exit = events
        .iter()
        .position(|e| e.message.contains("returns"))
        .unwrap();
    assert_eq!(first_exit, 3);

    for x in 1..=3_u64 {
        let entry = events
            .iter()
            .find(|e| e.message == format!("double ({},)", x))
            .unwrap();
        let exit = events
            .iter()
            .find(|e| e.message == format!("double returns {}", x * 2))
            .unwrap();
        assert_eq!(entry.call_id, exit.call_id);
    }
}

#[tokio::test]
async fn test_cancelled_call_logs_entry_only() {
    let (layer, subscriber) = capture();
    let _guard = tracing::subscriber::set_default(subscriber);

    assert!(stall().now_or_never().is_none());
    assert_eq!(layer.messages(), vec!["stall ()"]);
}

#[tokio::test]
async fn test_async_panic_resumed() {
    #[logged]
    async fn crash(reason: &'static str) -> u8 {
        tokio::task::yield_now().await;
        panic!("{}", reason);
    }

    let (layer, subscriber) = capture();
    let _guard = tracing::subscriber::set_default(subscriber);

    let outcome = AssertUnwindSafe(crash("disk on fire")).catch_unwind().await;
    let payload = outcome.unwrap_err();
    assert_eq!(payload.downcast_ref::<String>().unwrap(), "disk on fire");
    assert_eq!(
        layer.messages()[1],
        "error in crash (\"disk on fire\",): panic(\"disk on fire\")"
    );
}
