//! Associated endpoints sharing a link with their master.
//!
//! The fixture mirrors a typical connection: the ptr side creates a `sender`
//! interface, ships the request over the master interface, and the binding
//! side binds it to a dedicated executor. All four executors live on the test
//! thread, so every hop can be stepped explicitly.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tether::{connect, AssociatedRequest, Endpoint, Executor, ReplyError, Responder};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

struct Fixture {
    connection_binding: Executor,
    connection_ptr: Executor,
    sender_binding: Executor,
    sender_ptr: Executor,

    connection_ptr_ep: Endpoint,
    connection_binding_ep: Endpoint,
    sender_ptr_ep: Endpoint,
    sender_binding_ep: Endpoint,
}

fn set_up() -> Fixture {
    init_tracing();
    let connection_binding = Executor::builder().name("connection-binding").build();
    let connection_ptr = Executor::builder().name("connection-ptr").build();
    let sender_binding = Executor::builder().name("sender-binding").build();
    let sender_ptr = Executor::builder().name("sender-ptr").build();

    let (connection_ptr_ep, connection_binding_ep) =
        connect(connection_ptr.runner(), connection_binding.runner());

    let bound: Arc<Mutex<Option<Endpoint>>> = Arc::new(Mutex::new(None));
    let slot = bound.clone();
    let sender_runner = sender_binding.runner();
    let quit_runner = connection_binding.runner();
    connection_binding_ep.set_handler(
        move |request: AssociatedRequest, responder: Responder<()>| {
            let endpoint = responder
                .pair()
                .bind_associated(request, sender_runner.clone())
                .expect("bind sender");
            *slot.lock().expect("lock") = Some(endpoint);
            quit_runner.quit().expect("quit on owner thread");
        },
    );

    let (sender_ptr_ep, request) = connection_ptr_ep
        .associate(sender_ptr.runner())
        .expect("associate sender");
    connection_ptr_ep.send(&request).expect("send request");
    connection_binding.run();

    let sender_binding_ep = bound
        .lock()
        .expect("lock")
        .take()
        .expect("sender bound by the connection handler");

    Fixture {
        connection_binding,
        connection_ptr,
        sender_binding,
        sender_ptr,
        connection_ptr_ep,
        connection_binding_ep,
        sender_ptr_ep,
        sender_binding_ep,
    }
}

/// Error handler that records the call and quits the given executor.
fn quitting_flag(executor: &Executor) -> (Arc<AtomicBool>, impl FnOnce() + Send + 'static) {
    let flag = Arc::new(AtomicBool::new(false));
    let set = flag.clone();
    let runner = executor.runner();
    (flag, move || {
        set.store(true, Ordering::SeqCst);
        runner.quit().expect("quit on owner thread");
    })
}

fn counting_flag() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    (count, move || {
        c.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn test_setup_leaves_no_work_queued() {
    let f = set_up();
    assert_eq!(f.connection_binding.pending_tasks(), 0);
    assert_eq!(f.connection_ptr.pending_tasks(), 0);
    assert_eq!(f.sender_binding.pending_tasks(), 0);
    assert_eq!(f.sender_ptr.pending_tasks(), 0);
    assert_eq!(f.sender_ptr_ep.interface_id(), f.sender_binding_ep.interface_id());
    assert!(f.sender_binding_ep.runner().same_executor(&f.sender_binding.runner()));
    assert_eq!(f.connection_ptr_ep.pair().associated_count(), 1);
    assert_eq!(f.connection_binding_ep.pair().associated_count(), 1);
}

#[test]
fn test_method_call_takes_two_hops_each_way() {
    let f = set_up();

    let echo_called = Arc::new(AtomicBool::new(false));
    let called = echo_called.clone();
    f.sender_binding_ep
        .set_handler(move |value: i32, responder: Responder<i32>| {
            assert_eq!(value, 1024);
            called.store(true, Ordering::SeqCst);
            responder.send(value);
        });

    let echo_replied = Arc::new(AtomicBool::new(false));
    let replied = echo_replied.clone();
    f.sender_ptr_ep
        .call(&1024, move |reply: Result<i32, ReplyError>| {
            assert_eq!(reply, Ok(1024));
            replied.store(true, Ordering::SeqCst);
        })
        .expect("call");

    // The request first arrives at the master executor, then is forwarded to
    // the associated endpoint's executor.
    f.connection_binding.run_one_task();
    assert!(!echo_called.load(Ordering::SeqCst));
    f.sender_binding.run_one_task();
    assert!(echo_called.load(Ordering::SeqCst));

    // Same path for the reply on the other side.
    f.connection_ptr.run_one_task();
    assert!(!echo_replied.load(Ordering::SeqCst));
    f.sender_ptr.run_one_task();
    assert!(echo_replied.load(Ordering::SeqCst));

    assert_eq!(f.connection_binding.pending_tasks(), 0);
    assert_eq!(f.connection_ptr.pending_tasks(), 0);
    assert_eq!(f.sender_binding.pending_tasks(), 0);
    assert_eq!(f.sender_ptr.pending_tasks(), 0);
}

#[test]
fn test_binding_connection_error() {
    let f = set_up();

    let (sender_impl_error, handler) = quitting_flag(&f.sender_binding);
    f.sender_binding_ep.set_connection_error_handler(handler);
    let (connection_impl_error, handler) = quitting_flag(&f.connection_binding);
    f.connection_binding_ep.set_connection_error_handler(handler);
    let (sender_ptr_error, handler) = quitting_flag(&f.sender_ptr);
    f.sender_ptr_ep.set_connection_error_handler(handler);

    let Fixture {
        connection_binding,
        connection_ptr: _connection_ptr,
        sender_binding,
        sender_ptr,
        connection_ptr_ep,
        connection_binding_ep: _connection_binding_ep,
        sender_ptr_ep: _sender_ptr_ep,
        sender_binding_ep: _sender_binding_ep,
    } = f;

    drop(connection_ptr_ep);

    sender_ptr.run();
    assert!(sender_ptr_error.load(Ordering::SeqCst));
    connection_binding.run();
    assert!(connection_impl_error.load(Ordering::SeqCst));
    sender_binding.run();
    assert!(sender_impl_error.load(Ordering::SeqCst));
}

#[test]
fn test_ptr_connection_error() {
    let f = set_up();

    let (sender_impl_error, handler) = quitting_flag(&f.sender_binding);
    f.sender_binding_ep.set_connection_error_handler(handler);
    let (connection_ptr_error, handler) = quitting_flag(&f.connection_ptr);
    f.connection_ptr_ep.set_connection_error_handler(handler);
    let (sender_ptr_error, handler) = quitting_flag(&f.sender_ptr);
    f.sender_ptr_ep.set_connection_error_handler(handler);

    f.connection_binding_ep.close();

    f.sender_binding.run();
    assert!(sender_impl_error.load(Ordering::SeqCst));
    f.connection_ptr.run();
    assert!(connection_ptr_error.load(Ordering::SeqCst));
    f.sender_ptr.run();
    assert!(sender_ptr_error.load(Ordering::SeqCst));

    assert!(f.connection_ptr_ep.pair().is_closed());
    assert!(f.connection_binding_ep.pair().is_closed());
}

#[test]
fn test_closing_sender_ptr_only_closes_its_counterpart() {
    let f = set_up();

    let (binding_errors, handler) = counting_flag();
    f.sender_binding_ep.set_connection_error_handler(handler);
    let (ptr_errors, handler) = counting_flag();
    f.sender_ptr_ep.set_connection_error_handler(handler);
    let (master_errors, handler) = counting_flag();
    f.connection_ptr_ep.set_connection_error_handler(handler);
    let (binding_master_errors, handler) = counting_flag();
    f.connection_binding_ep.set_connection_error_handler(handler);

    f.sender_ptr_ep.close();
    f.sender_ptr.run_until_idle();
    f.connection_binding.run_until_idle();
    f.sender_binding.run_until_idle();
    f.connection_ptr.run_until_idle();

    assert_eq!(ptr_errors.load(Ordering::SeqCst), 1);
    assert_eq!(binding_errors.load(Ordering::SeqCst), 1);
    assert_eq!(master_errors.load(Ordering::SeqCst), 0);
    assert_eq!(binding_master_errors.load(Ordering::SeqCst), 0);
    assert!(!f.connection_ptr_ep.is_closed());
    assert!(!f.connection_binding_ep.is_closed());
    assert_eq!(f.connection_ptr_ep.pair().associated_count(), 0);
    assert_eq!(f.connection_binding_ep.pair().associated_count(), 0);
}

#[test]
fn test_closing_sender_binding_only_closes_its_counterpart() {
    let f = set_up();

    let (ptr_errors, handler) = counting_flag();
    f.sender_ptr_ep.set_connection_error_handler(handler);
    let (master_errors, handler) = counting_flag();
    f.connection_ptr_ep.set_connection_error_handler(handler);

    f.sender_binding_ep.close();
    // Close notice, then the acknowledgement back to the binding side.
    f.connection_ptr.run_until_idle();
    f.sender_ptr.run_until_idle();
    f.connection_binding.run_until_idle();
    f.sender_binding.run_until_idle();

    assert_eq!(ptr_errors.load(Ordering::SeqCst), 1);
    assert_eq!(master_errors.load(Ordering::SeqCst), 0);
    assert!(f.sender_ptr_ep.is_closed());
    assert!(!f.connection_ptr_ep.is_closed());

    // The master interface still carries traffic.
    f.connection_binding_ep
        .set_handler(|value: u8, responder: Responder<u8>| responder.send(value));
    let replied = Arc::new(AtomicBool::new(false));
    let flag = replied.clone();
    f.connection_ptr_ep
        .call(&9u8, move |reply: Result<u8, ReplyError>| {
            assert_eq!(reply, Ok(9));
            flag.store(true, Ordering::SeqCst);
        })
        .expect("call");
    f.connection_binding.run_until_idle();
    f.connection_ptr.run_until_idle();
    assert!(replied.load(Ordering::SeqCst));
}

#[test]
fn test_calls_on_a_closed_associated_endpoint_fail() {
    let f = set_up();
    f.sender_ptr_ep.close();

    let result = f.sender_ptr_ep.call(&1, |_: Result<i32, ReplyError>| {});
    assert!(result.is_err());
    assert!(f.sender_ptr_ep.send(&1).is_err());
    assert!(!f.connection_ptr_ep.is_closed());
}

#[test]
fn test_associated_without_handler_answers_unhandled() {
    let f = set_up();

    let reply = Arc::new(Mutex::new(None));
    let slot = reply.clone();
    f.sender_ptr_ep
        .call(&5, move |r: Result<i32, ReplyError>| {
            *slot.lock().expect("lock") = Some(r);
        })
        .expect("call");

    f.connection_binding.run_until_idle();
    f.sender_binding.run_until_idle();
    f.connection_ptr.run_until_idle();
    f.sender_ptr.run_until_idle();

    assert_eq!(
        reply.lock().expect("lock").take(),
        Some(Err(ReplyError::Unhandled))
    );
}

#[test]
fn test_requests_before_binding_are_buffered_in_order() {
    init_tracing();
    let master_a = Executor::builder().name("master-a").build();
    let master_b = Executor::builder().name("master-b").build();
    let worker_a = Executor::builder().name("worker-a").build();
    let worker_b = Executor::builder().name("worker-b").build();
    let (left, right) = connect(master_a.runner(), master_b.runner());

    let (caller, request) = left.associate(worker_a.runner()).expect("associate");
    let replies = Arc::new(Mutex::new(Vec::new()));
    for n in 0..3i32 {
        let replies = replies.clone();
        caller
            .call(&n, move |reply: Result<i32, ReplyError>| {
                replies.lock().expect("lock").push(reply.expect("reply"));
            })
            .expect("call");
    }

    // Nothing is bound on the right yet: the requests wait on its master.
    assert_eq!(master_b.run_until_idle(), 3);
    assert_eq!(worker_b.pending_tasks(), 0);

    let callee = right
        .pair()
        .bind_associated(request, worker_b.runner())
        .expect("bind");
    callee.set_handler(|value: i32, responder: Responder<i32>| responder.send(value * 10));
    assert_eq!(worker_b.pending_tasks(), 3);

    assert_eq!(worker_b.run_until_idle(), 3);
    master_a.run_until_idle();
    worker_a.run_until_idle();
    assert_eq!(*replies.lock().expect("lock"), vec![0, 10, 20]);
}

#[test]
fn test_binding_after_peer_closed_tears_down_immediately() {
    init_tracing();
    let master_a = Executor::new();
    let master_b = Executor::new();
    let worker_b = Executor::new();
    let (left, right) = connect(master_a.runner(), master_b.runner());

    let (caller, request) = left.associate(master_a.runner()).expect("associate");
    drop(caller);
    master_b.run_until_idle();

    let callee = right
        .pair()
        .bind_associated(request, worker_b.runner())
        .expect("bind");
    let (errors, handler) = counting_flag();
    callee.set_connection_error_handler(handler);

    worker_b.run_until_idle();
    assert!(callee.is_closed());
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert!(!right.is_closed());
    assert_eq!(right.pair().associated_count(), 0);

    // Closing the callee sends nothing more to the peer.
    master_a.run_until_idle();
    drop(callee);
    assert_eq!(master_a.run_until_idle(), 0);
}

#[test]
fn test_several_associated_endpoints_are_independent() {
    init_tracing();
    let master_a = Executor::new();
    let master_b = Executor::new();
    let workers_a: Vec<Executor> = (0..3).map(|_| Executor::new()).collect();
    let workers_b: Vec<Executor> = (0..3).map(|_| Executor::new()).collect();
    let (left, right) = connect(master_a.runner(), master_b.runner());

    let mut callers = Vec::new();
    let mut callees = Vec::new();
    for (index, (wa, wb)) in workers_a.iter().zip(&workers_b).enumerate() {
        let (caller, request) = left.associate(wa.runner()).expect("associate");
        let callee = right
            .pair()
            .bind_associated(request, wb.runner())
            .expect("bind");
        let offset = index as i32 * 100;
        callee.set_handler(move |value: i32, responder: Responder<i32>| {
            responder.send(value + offset)
        });
        callers.push(caller);
        callees.push(callee);
    }
    assert_eq!(left.pair().associated_count(), 3);
    assert_eq!(right.pair().associated_count(), 3);

    let replies = Arc::new(Mutex::new(Vec::new()));
    for (index, caller) in callers.iter().enumerate() {
        let replies = replies.clone();
        caller
            .call(&1, move |reply: Result<i32, ReplyError>| {
                replies.lock().expect("lock").push((index, reply.expect("reply")));
            })
            .expect("call");
    }

    master_b.run_until_idle();
    for worker in &workers_b {
        assert_eq!(worker.run_until_idle(), 1);
    }
    master_a.run_until_idle();
    for worker in &workers_a {
        assert_eq!(worker.run_until_idle(), 1);
    }

    let mut replies = replies.lock().expect("lock").clone();
    replies.sort();
    assert_eq!(replies, vec![(0, 1), (1, 101), (2, 201)]);

    // Closing one pair leaves the others untouched.
    callers.remove(1);
    master_b.run_until_idle();
    workers_b[1].run_until_idle();
    assert!(callees[1].is_closed());
    assert!(!callees[0].is_closed());
    assert!(!callees[2].is_closed());
    assert_eq!(right.pair().associated_count(), 2);
}
