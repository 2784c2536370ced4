// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Dispatch-order and liveness tests for the worker pool.

use crossbeam_channel::unbounded;
use ember_tasks::{FnTask, Scheduler, Task};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn recorder(
    tx: crossbeam_channel::Sender<&'static str>,
    name: &'static str,
    work: Duration,
) -> Arc<dyn Task> {
    FnTask::once(name, move |_| {
        thread::sleep(work);
        tx.send(name).unwrap();
    })
}

#[test]
fn higher_priority_dispatches_first() {
    let scheduler = Scheduler::with_workers(1);
    let (tx, rx) = unbounded();

    // Occupy the single worker so the rest queue up together.
    let gate = recorder(tx.clone(), "gate", Duration::from_millis(100));
    scheduler.add(gate, 0).unwrap();
    thread::sleep(Duration::from_millis(30));

    scheduler
        .add(recorder(tx.clone(), "low", Duration::ZERO), 1)
        .unwrap();
    scheduler
        .add(recorder(tx.clone(), "high", Duration::ZERO), 10)
        .unwrap();
    scheduler
        .add(recorder(tx.clone(), "mid", Duration::ZERO), 5)
        .unwrap();

    let order: Vec<_> = (0..4)
        .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
        .collect();
    assert_eq!(order, vec!["gate", "high", "mid", "low"]);
    scheduler.shutdown();
}

#[test]
fn equal_priority_keeps_insertion_order() {
    let scheduler = Scheduler::with_workers(1);
    let (tx, rx) = unbounded();

    let gate = recorder(tx.clone(), "gate", Duration::from_millis(100));
    scheduler.add(gate, 0).unwrap();
    thread::sleep(Duration::from_millis(30));

    for name in ["first", "second", "third"] {
        scheduler.add(recorder(tx.clone(), name, Duration::ZERO), 3).unwrap();
    }

    let order: Vec<_> = (0..4)
        .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
        .collect();
    assert_eq!(order, vec!["gate", "first", "second", "third"]);
    scheduler.shutdown();
}

// A running task is never preempted; queued work runs when a worker frees up.
#[test]
fn running_task_finishes_before_later_arrivals() {
    let scheduler = Scheduler::with_workers(1);
    let (tx, rx) = unbounded();

    scheduler
        .add(recorder(tx.clone(), "a", Duration::from_millis(50)), 0)
        .unwrap();
    thread::sleep(Duration::from_millis(15));
    scheduler
        .add(recorder(tx.clone(), "b", Duration::ZERO), 10)
        .unwrap();
    scheduler
        .add(recorder(tx.clone(), "c", Duration::ZERO), 5)
        .unwrap();

    let order: Vec<_> = (0..3)
        .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
        .collect();
    assert_eq!(order, vec!["a", "b", "c"]);
    scheduler.shutdown();
}

#[test]
fn two_workers_drain_in_priority_order() {
    let scheduler = Scheduler::with_workers(2);
    let (tx, rx) = unbounded();

    scheduler
        .add(recorder(tx.clone(), "a", Duration::from_millis(80)), 0)
        .unwrap();
    thread::sleep(Duration::from_millis(15));
    scheduler
        .add(recorder(tx.clone(), "b", Duration::from_millis(80)), 10)
        .unwrap();
    scheduler
        .add(recorder(tx.clone(), "c", Duration::ZERO), 5)
        .unwrap();

    let order: Vec<_> = (0..3)
        .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
        .collect();
    // A and B overlap on the two workers; C waits for a free worker.
    assert_eq!(order.last(), Some(&"c"));
    assert!(order.contains(&"a") && order.contains(&"b"));
    scheduler.shutdown();
}

// Every queued task eventually runs, whatever the arrival order.
#[test]
fn all_queued_tasks_eventually_run() {
    let scheduler = Scheduler::with_workers(3);
    let (tx, rx) = unbounded();

    for i in 0..40 {
        let tx = tx.clone();
        let task: Arc<dyn Task> = FnTask::once("burst", move |_| {
            tx.send("burst").unwrap();
        });
        scheduler.add(task, i % 7).unwrap();
    }

    for _ in 0..40 {
        rx.recv_timeout(Duration::from_secs(5)).expect("a task was starved");
    }
    // The last worker still has to drop its entry after the send.
    thread::sleep(Duration::from_millis(100));
    assert_eq!(scheduler.task_count(), 0);
    scheduler.shutdown();
}
