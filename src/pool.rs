/*
* Licensed to Elasticsearch B.V. under one or more contributor
* license agreements. See the NOTICE file distributed with
* this work for additional information regarding copyright
* ownership. Elasticsearch B.V. licenses this file to you under
* the Apache License, Version 2.0 (the "License"); you may
* not use this file except in compliance with the License.
* You may obtain a copy of the License at
*
*  http://www.apache.org/licenses/LICENSE-2.0
*
* Unless required by applicable law or agreed to in writing,
* software distributed under the License is distributed on an
* "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
* KIND, either express or implied.  See the License for the
* specific language governing permissions and limitations
* under the License.
*/

//! A fixed-size worker pool with a bounded number of outstanding futures,
//! fanning work out over `crossbeam_channel` the way `goko`'s
//! `CoverTreeBuilder` fans layer construction out over its scratch
//! channels, except here the caller keeps an explicit handle to each task
//! instead of waiting on a single join-everything barrier.

use crate::errors::{FskaError, FskaResult};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::JoinHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A pool of `n_threads` long-lived worker threads pulling jobs off a
/// shared queue.
pub struct ThreadPool {
    job_sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawns `n_threads` workers (at least one).
    pub fn new(n_threads: usize) -> ThreadPool {
        let n_threads = n_threads.max(1);
        let (job_sender, job_receiver) = unbounded::<Job>();
        let mut workers = Vec::with_capacity(n_threads);
        for _ in 0..n_threads {
            let job_receiver: Receiver<Job> = job_receiver.clone();
            workers.push(std::thread::spawn(move || {
                for job in job_receiver.iter() {
                    job();
                }
            }));
        }
        ThreadPool {
            job_sender: Some(job_sender),
            workers,
        }
    }

    /// Submits `f` to run on a worker thread and returns a handle the
    /// caller can block on with `TaskHandle::get`.
    ///
    /// # Errors
    /// Returns `FskaError::PoolShutDown` if the pool has already been shut
    /// down (only possible once `Drop` has started, which never happens
    /// while a caller still holds `&ThreadPool`).
    pub fn submit<T, F>(&self, f: F) -> FskaResult<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let sender = self.job_sender.as_ref().ok_or(FskaError::PoolShutDown)?;
        let (result_tx, result_rx) = bounded(1);
        let job: Job = Box::new(move || {
            let outcome = catch_unwind(AssertUnwindSafe(f));
            // the receiving end only goes away if the handle itself was
            // dropped without being awaited, which is never a pool error.
            let _ = result_tx.send(outcome);
        });
        sender.send(job).map_err(|_| FskaError::PoolShutDown)?;
        Ok(TaskHandle { receiver: result_rx })
    }

    /// Number of worker threads in the pool.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        // Dropping the sender closes the channel once every clone (there
        // is only this one) goes away, which ends each worker's `for` loop.
        self.job_sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

/// A handle to a task submitted to a `ThreadPool`.
pub struct TaskHandle<T> {
    receiver: Receiver<std::thread::Result<T>>,
}

impl<T> TaskHandle<T> {
    /// Blocks until the task completes, returning its value.
    ///
    /// # Errors
    /// Returns `FskaError::TaskPanicked` if the task panicked, or
    /// `FskaError::PoolShutDown` if the pool was dropped before the task
    /// ran (which cannot happen while the pool that produced this handle
    /// is still alive).
    pub fn get(self) -> FskaResult<T> {
        match self.receiver.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_panic)) => Err(FskaError::TaskPanicked),
            Err(_) => Err(FskaError::PoolShutDown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_and_get_roundtrips_a_value() {
        let pool = ThreadPool::new(2);
        let handle = pool.submit(|| 2 + 2).unwrap();
        assert_eq!(handle.get().unwrap(), 4);
    }

    #[test]
    fn panicking_task_reports_task_panicked() {
        let pool = ThreadPool::new(1);
        let handle: TaskHandle<()> = pool.submit(|| panic!("boom")).unwrap();
        assert!(matches!(handle.get(), Err(FskaError::TaskPanicked)));
    }

    #[test]
    fn many_tasks_on_a_small_pool_all_complete() {
        let pool = ThreadPool::new(2);
        let handles: Vec<_> = (0..64)
            .map(|i| pool.submit(move || i * i).unwrap())
            .collect();
        let sum: i64 = handles.into_iter().map(|h| h.get().unwrap()).sum();
        let expected: i64 = (0..64).map(|i| i * i).sum();
        assert_eq!(sum, expected);
    }
}
