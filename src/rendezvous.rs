// Copyright 2018 Kyle Mayes
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

//! Single-producer, single-consumer blocking rendezvous channel.
//!
//! The channel has no buffer. A `produce` call offers its item and does not return until a
//! consumer has taken it, and a `consume` call does not return until an item is on offer.

use std::cell::{Cell};
use std::marker::{PhantomData};
use std::sync::{Arc};
use std::time::{Duration, Instant};

use log::trace;
use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::{ConsumeError, ProduceError};

//================================================
// Structs
//================================================

// Consumer ______________________________________

/// A consumer for a rendezvous channel.
///
/// A consumer can be sent to another thread but not shared between threads.
///
/// ```compile_fail
/// fn shared<T: Sync>(_: &T) { }
/// let (_producer, consumer) = handoff::rendezvous::channel::<i32>();
/// shared(&consumer);
/// ```
#[derive(Debug)]
pub struct Consumer<T>(Arc<Queue<T>>, PhantomData<Cell<()>>);

impl<T> Consumer<T> {
    //- Accessors --------------------------------

    /// Removes and returns the item on offer, blocking until one is offered.
    ///
    /// This method returns `Err` if the channel has no remaining producers.
    pub fn consume(&self) -> Result<T, ConsumeError> {
        self.0.consume(None)
    }

    /// Removes and returns the item on offer, blocking for at most `timeout`.
    ///
    /// This method returns `Err` if the channel has no remaining producers or if no item was
    /// offered in time.
    pub fn consume_timeout(&self, timeout: Duration) -> Result<T, ConsumeError> {
        self.0.consume(deadline(timeout))
    }

    /// Attempts to remove and return the item on offer without blocking.
    ///
    /// This method returns `Err` if no item is currently on offer.
    pub fn try_consume(&self) -> Result<T, ConsumeError> {
        self.0.try_consume()
    }

    /// Returns the maximum number of items the channel can contain.
    pub fn capacity(&self) -> usize {
        0
    }
}

impl<T> Drop for Consumer<T> {
    fn drop(&mut self) {
        self.0.disconnect(|state| state.consumer = false);
    }
}

// Producer ______________________________________

/// A producer for a rendezvous channel.
///
/// A producer can be sent to another thread but not shared between threads, so there is never
/// more than one offer in flight.
///
/// ```compile_fail
/// fn shared<T: Sync>(_: &T) { }
/// let (producer, _consumer) = handoff::rendezvous::channel::<i32>();
/// shared(&producer);
/// ```
#[derive(Debug)]
pub struct Producer<T>(Arc<Queue<T>>, PhantomData<Cell<()>>);

impl<T> Producer<T> {
    //- Accessors --------------------------------

    /// Offers the supplied item and blocks until a consumer takes it.
    ///
    /// This method returns `Err` if the channel has no remaining consumers.
    pub fn produce(&self, item: T) -> Result<(), ProduceError<T>> {
        self.0.produce(item, None)
    }

    /// Offers the supplied item and blocks for at most `timeout` until a consumer takes it.
    ///
    /// If no consumer takes the item in time, the offer is withdrawn and the item is returned
    /// in the error.
    pub fn produce_timeout(&self, item: T, timeout: Duration) -> Result<(), ProduceError<T>> {
        self.0.produce(item, deadline(timeout))
    }

    /// Returns the maximum number of items the channel can contain.
    pub fn capacity(&self) -> usize {
        0
    }
}

impl<T> Drop for Producer<T> {
    fn drop(&mut self) {
        self.0.disconnect(|state| state.producer = false);
    }
}

// State _________________________________________

#[derive(Debug)]
struct State<T> {
    slot: Option<T>,
    offered: u64,
    taken: u64,
    producer: bool,
    consumer: bool,
}

// Queue _________________________________________

#[derive(Debug)]
struct Queue<T> {
    state: Mutex<State<T>>,
    condvar: Condvar,
}

impl<T> Queue<T> {
    //- Constructors -----------------------------

    fn new() -> Arc<Self> {
        Arc::new(Queue {
            state: Mutex::new(State {
                slot: None,
                offered: 0,
                taken: 0,
                producer: true,
                consumer: true,
            }),
            condvar: Condvar::new(),
        })
    }

    //- Mutators ---------------------------------

    fn disconnect<F>(&self, f: F) where F: FnOnce(&mut State<T>) {
        let mut state = self.state.lock();
        f(&mut *state);
        trace!("rendezvous: disconnected (producer={}, consumer={})", state.producer, state.consumer);
        self.condvar.notify_all();
    }

    /// Blocks on the condition variable, returning whether the deadline passed.
    fn wait(&self, state: &mut MutexGuard<State<T>>, deadline: Option<Instant>) -> bool {
        match deadline {
            Some(deadline) => self.condvar.wait_until(state, deadline).timed_out(),
            None => { self.condvar.wait(state); false },
        }
    }

    //- Accessors --------------------------------

    fn produce(&self, item: T, deadline: Option<Instant>) -> Result<(), ProduceError<T>> {
        let mut state = self.state.lock();

        // Return an error if the consumer has been disconnected.
        if !state.consumer {
            return Err(ProduceError::Disconnected(item));
        }

        // Offer the item. The slot is vacant since `Producer` is not `Sync` and every offer that
        // is not taken is withdrawn before returning.
        state.slot = Some(item);
        state.offered += 1;
        let ticket = state.offered;
        self.condvar.notify_all();

        // Wait for the consumer to take the item, withdrawing it on disconnection or timeout.
        loop {
            if state.taken >= ticket {
                return Ok(());
            }

            if !state.consumer {
                return state.slot.take().map_or(Ok(()), |i| Err(ProduceError::Disconnected(i)));
            }

            if self.wait(&mut state, deadline) && state.taken < ticket {
                return state.slot.take().map_or(Ok(()), |i| Err(ProduceError::Timeout(i)));
            }
        }
    }

    fn consume(&self, deadline: Option<Instant>) -> Result<T, ConsumeError> {
        let mut state = self.state.lock();
        let mut expired = false;
        loop {
            if let Some(item) = self.take(&mut state) {
                return Ok(item);
            }

            if !state.producer {
                return Err(ConsumeError::Disconnected);
            } else if expired {
                return Err(ConsumeError::Timeout);
            }

            expired = self.wait(&mut state, deadline);
        }
    }

    fn try_consume(&self) -> Result<T, ConsumeError> {
        let mut state = self.state.lock();
        match self.take(&mut state) {
            Some(item) => Ok(item),
            None if !state.producer => Err(ConsumeError::Disconnected),
            None => Err(ConsumeError::Empty),
        }
    }

    fn take(&self, state: &mut State<T>) -> Option<T> {
        let item = state.slot.take()?;
        state.taken += 1;
        self.condvar.notify_all();
        Some(item)
    }
}

//================================================
// Functions
//================================================

fn deadline(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

/// Returns a producer and consumer for a rendezvous channel.
pub fn channel<T>() -> (Producer<T>, Consumer<T>) {
    let queue = Queue::new();
    (Producer(queue.clone(), PhantomData), Consumer(queue, PhantomData))
}

//================================================
// Tests
//================================================
