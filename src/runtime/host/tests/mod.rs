//! TickSource 单元测试
//!
//! 测试订阅注册表的分发顺序、增删语义和失败隔离

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::bail;

use crate::runtime::error::SchedulerError;
use crate::runtime::host::{HostHandle, SubscriptionId, TickHost, TickSource};
use crate::util::config::HostConfig;

fn recorder(
    log: &Rc<RefCell<Vec<&'static str>>>,
    name: &'static str,
) -> Box<dyn FnMut(f32) -> anyhow::Result<()>> {
    let log = log.clone();
    Box::new(move |_| {
        log.borrow_mut().push(name);
        Ok(())
    })
}

#[test]
fn test_dispatch_in_registration_order() {
    let source = TickSource::new();
    let host = source.handle();
    let log = Rc::new(RefCell::new(Vec::new()));

    host.subscribe(recorder(&log, "a")).unwrap();
    host.subscribe(recorder(&log, "b")).unwrap();
    host.subscribe(recorder(&log, "c")).unwrap();

    let report = source.tick(0.016).unwrap();
    assert_eq!(report.frame, 1);
    assert_eq!(report.dispatched, 3);
    assert!(report.is_clean());
    assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
}

#[test]
fn test_subscription_ids_are_not_reused() {
    let source = TickSource::new();
    let host = source.handle();

    let first = host.subscribe(Box::new(|_| Ok(()))).unwrap();
    assert!(host.unsubscribe(first));
    let second = host.subscribe(Box::new(|_| Ok(()))).unwrap();

    assert_ne!(first, second);
    assert!(!host.unsubscribe(first));
    assert_eq!(source.len(), 1);
}

#[test]
fn test_double_unsubscribe_is_noop() {
    let source = TickSource::new();
    let host = source.handle();
    let id = host.subscribe(Box::new(|_| Ok(()))).unwrap();

    assert!(host.unsubscribe(id));
    assert!(!host.unsubscribe(id));
    assert!(source.is_empty());
}

#[test]
fn test_subscribe_during_frame_starts_next_frame() {
    let source = TickSource::new();
    let host = source.handle();
    let calls = Rc::new(Cell::new(0));

    let spawned = Rc::new(Cell::new(false));
    {
        let host = host.clone();
        let calls = calls.clone();
        let spawned = spawned.clone();
        host.clone()
            .subscribe(Box::new(move |_| {
                if !spawned.replace(true) {
                    let calls = calls.clone();
                    host.subscribe(Box::new(move |_| {
                        calls.set(calls.get() + 1);
                        Ok(())
                    }))?;
                }
                Ok(())
            }))
            .unwrap();
    }

    let report = source.tick(0.1).unwrap();
    assert_eq!(report.dispatched, 1);
    assert_eq!(calls.get(), 0);
    assert_eq!(source.len(), 2);

    source.tick(0.1).unwrap();
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_unsubscribe_self_during_dispatch() {
    let source = TickSource::new();
    let host = source.handle();
    let own_id: Rc<Cell<Option<SubscriptionId>>> = Rc::new(Cell::new(None));
    let calls = Rc::new(Cell::new(0));

    let id = {
        let host = host.clone();
        let own_id = own_id.clone();
        let calls = calls.clone();
        host.clone()
            .subscribe(Box::new(move |_| {
                calls.set(calls.get() + 1);
                if let Some(id) = own_id.take() {
                    assert!(host.unsubscribe(id));
                }
                Ok(())
            }))
            .unwrap()
    };
    own_id.set(Some(id));

    source.tick(0.1).unwrap();
    assert!(source.is_empty());
    source.tick(0.1).unwrap();
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_removed_later_subscriber_is_skipped() {
    let source = TickSource::new();
    let host = source.handle();
    let log = Rc::new(RefCell::new(Vec::new()));
    let victim: Rc<Cell<Option<SubscriptionId>>> = Rc::new(Cell::new(None));

    {
        let host = host.clone();
        let victim = victim.clone();
        host.clone()
            .subscribe(Box::new(move |_| {
                if let Some(id) = victim.take() {
                    host.unsubscribe(id);
                }
                Ok(())
            }))
            .unwrap();
    }
    victim.set(Some(host.subscribe(recorder(&log, "victim")).unwrap()));

    let report = source.tick(0.1).unwrap();
    assert_eq!(report.dispatched, 1);
    assert!(log.borrow().is_empty());
}

#[test]
fn test_strict_tick_aborts_frame_on_failure() {
    let source = TickSource::new();
    let host = source.handle();
    let log = Rc::new(RefCell::new(Vec::new()));

    host.subscribe(recorder(&log, "before")).unwrap();
    host.subscribe(Box::new(|_: f32| -> anyhow::Result<()> { bail!("boom") })).unwrap();
    host.subscribe(recorder(&log, "after")).unwrap();

    let err = source.tick(0.1).unwrap_err();
    assert!(format!("{err:#}").contains("boom"));
    assert!(err.to_string().contains("frame 1"));
    assert_eq!(*log.borrow(), vec!["before"]);
    // The failing subscriber stays registered.
    assert_eq!(source.len(), 3);
}

#[test]
fn test_isolated_tick_collects_failures() {
    let source = TickSource::new();
    let host = source.handle();
    let log = Rc::new(RefCell::new(Vec::new()));

    host.subscribe(recorder(&log, "before")).unwrap();
    let failing = host.subscribe(Box::new(|_: f32| -> anyhow::Result<()> { bail!("boom") })).unwrap();
    host.subscribe(recorder(&log, "after")).unwrap();

    let report = source.tick_isolated(0.1).unwrap();
    assert_eq!(report.dispatched, 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].subscription, failing);
    assert_eq!(*log.borrow(), vec!["before", "after"]);
}

#[test]
fn test_reentrant_tick_rejected() {
    let source = Rc::new(TickSource::new());
    let host = source.handle();
    let observed = Rc::new(RefCell::new(None));

    {
        let weak = Rc::downgrade(&source);
        let observed = observed.clone();
        host.subscribe(Box::new(move |dt| {
            if let Some(source) = weak.upgrade() {
                let err = source.tick(dt).unwrap_err();
                *observed.borrow_mut() = err.downcast_ref::<SchedulerError>().cloned();
            }
            Ok(())
        }))
        .unwrap();
    }

    source.tick(0.1).unwrap();
    assert_eq!(*observed.borrow(), Some(SchedulerError::ReentrantTick(1)));
    // The guard resets once the outer frame completes.
    assert!(source.tick(0.1).is_ok());
}

#[test]
fn test_host_unavailable_after_drop() {
    let source = TickSource::new();
    let host: HostHandle = source.handle();
    assert!(host.is_alive());
    drop(source);

    assert!(!host.is_alive());
    let err = host.subscribe(Box::new(|_| Ok(()))).unwrap_err();
    assert_eq!(err, SchedulerError::HostUnavailable);
}

#[test]
fn test_delta_clamping() {
    let source = TickSource::with_config(HostConfig {
        max_delta: Some(0.25),
    });
    let host = source.handle();
    let seen = Rc::new(RefCell::new(Vec::new()));
    {
        let seen = seen.clone();
        host.subscribe(Box::new(move |dt| {
            seen.borrow_mut().push(dt);
            Ok(())
        }))
        .unwrap();
    }

    source.tick(1.0).unwrap();
    source.tick(0.1).unwrap();
    source.tick(-3.0).unwrap();
    source.tick(f32::NAN).unwrap();

    assert_eq!(*seen.borrow(), vec![0.25, 0.1, 0.0, 0.0]);
    assert_eq!(source.frame(), 4);
}
