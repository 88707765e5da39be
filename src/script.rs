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

//! A paced producer and a counting consumer talking over a rendezvous channel.
//!
//! The producer sends `WORDS` in order `ROUNDS` times, pausing after every send, and then sends
//! `SENTINEL`. The consumer prints a fixed number of receives and then discards values until it
//! sees the sentinel.

use std::fmt;
use std::io::{self, Write};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use thiserror::Error;

use crate::{ConsumeError, ProduceError};
use crate::rendezvous::{self, Consumer, Producer};

/// The words sent by the producer in each round.
pub const WORDS: &[&str] = &["This", "is", "only", "a", "test", "..."];

/// The number of times the producer sends `WORDS`.
pub const ROUNDS: usize = 10;

/// The pause following each send.
pub const PAUSE: Duration = Duration::from_secs(1);

/// The value that ends the stream.
pub const SENTINEL: &str = "done";

//================================================
// Enums
//================================================

// Phase _________________________________________

/// The state of a consumer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Receiving and printing the fixed number of values.
    Receiving,
    /// Receiving and discarding values until the sentinel arrives.
    AwaitingSentinel,
    /// The sentinel has been received.
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Phase::Receiving => write!(formatter, "receiving"),
            Phase::AwaitingSentinel => write!(formatter, "awaiting the sentinel"),
            Phase::Done => write!(formatter, "done"),
        }
    }
}

// Wait __________________________________________

/// How long a consumer blocks on each receive.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Wait {
    /// Block until a value arrives or the producer is gone.
    Forever,
    /// Block for at most the supplied duration.
    Within(Duration),
}

impl Default for Wait {
    fn default() -> Self {
        Wait::Forever
    }
}

// ScriptError ___________________________________

/// Indicates the reason a script did not run to completion.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The producer could not hand off a message.
    #[error("failed to hand off message {index}: {source}")]
    Produce {
        /// The 0-based index of the message; the sentinel follows the last word.
        index: usize,
        /// The reason the channel rejected the message.
        source: ProduceError<String>,
    },
    /// The consumer could not receive a value.
    #[error("consumer stalled while {phase} after {received} receives: {source}")]
    Consume {
        /// The state of the consumer.
        phase: Phase,
        /// The number of values printed so far.
        received: usize,
        /// The reason the channel returned no value.
        source: ConsumeError,
    },
    /// A received value could not be written.
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
    /// The producer thread could not be started.
    #[error("failed to spawn the producer: {0}")]
    Spawn(#[source] io::Error),
}

//================================================
// Structs
//================================================

// Report ________________________________________

/// The outcome of a consumer that received the sentinel.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Report {
    /// The number of values printed.
    pub received: usize,
    /// The number of non-sentinel values discarded while awaiting the sentinel.
    pub discarded: usize,
    /// The time from the first receive to the sentinel.
    pub elapsed: Duration,
}

// Script ________________________________________

/// The parameters shared by a producer and a consumer.
#[derive(Clone, Debug)]
pub struct Script {
    words: Vec<String>,
    rounds: usize,
    pause: Duration,
    sentinel: String,
    receives: Option<usize>,
    wait: Wait,
}

impl Script {
    //- Constructors -----------------------------

    /// Constructs a new `Script` with the default words, rounds, pause, and sentinel.
    pub fn new() -> Self {
        Script {
            words: WORDS.iter().map(|w| w.to_string()).collect(),
            rounds: ROUNDS,
            pause: PAUSE,
            sentinel: SENTINEL.into(),
            receives: None,
            wait: Wait::default(),
        }
    }

    //- Builders ---------------------------------

    /// Sets the words sent in each round.
    pub fn words<I, S>(mut self, words: I) -> Self where I: IntoIterator<Item=S>, S: Into<String> {
        self.words = words.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the number of rounds.
    pub fn rounds(mut self, rounds: usize) -> Self {
        self.rounds = rounds;
        self
    }

    /// Sets the pause following each send.
    pub fn pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Sets the value that ends the stream.
    pub fn sentinel<S>(mut self, sentinel: S) -> Self where S: Into<String> {
        self.sentinel = sentinel.into();
        self
    }

    /// Sets the number of values the consumer prints before awaiting the sentinel.
    ///
    /// By default this is the number of values the producer sends.
    pub fn receives(mut self, receives: usize) -> Self {
        self.receives = Some(receives);
        self
    }

    /// Sets how long the consumer blocks on each receive.
    pub fn wait(mut self, wait: Wait) -> Self {
        self.wait = wait;
        self
    }

    //- Accessors --------------------------------

    /// Returns the number of values the producer sends before the sentinel.
    pub fn sends(&self) -> usize {
        self.words.len() * self.rounds
    }

    /// Returns the number of values the consumer prints before awaiting the sentinel.
    pub fn receive_count(&self) -> usize {
        self.receives.unwrap_or_else(|| self.sends())
    }

    /// Sends every word of every round and then the sentinel, returning the number of words sent.
    pub fn produce(&self, producer: &Producer<String>) -> Result<usize, ScriptError> {
        let mut index = 0;
        for round in 0..self.rounds {
            debug!("producer: starting round {}", round);
            for word in &self.words {
                send(producer, index, word.clone())?;
                index += 1;
                thread::sleep(self.pause);
            }
        }

        send(producer, index, self.sentinel.clone())?;
        info!("producer: sent {} values and the sentinel", index);
        Ok(index)
    }

    /// Runs `produce` on a new thread.
    pub fn spawn(
        &self, producer: Producer<String>
    ) -> io::Result<JoinHandle<Result<usize, ScriptError>>> {
        let script = self.clone();
        thread::Builder::new().name("producer".into()).spawn(move || script.produce(&producer))
    }

    /// Prints the fixed number of receives to `out` and then waits for the sentinel.
    pub fn consume<W>(&self, consumer: &Consumer<String>, out: &mut W) -> Result<Report, ScriptError>
        where W: Write
    {
        let receives = self.receive_count();
        let start = Instant::now();
        let mut phase = Phase::Receiving;
        let mut received = 0;
        let mut discarded = 0;
        loop {
            match phase {
                Phase::Receiving if received == receives => {
                    debug!("consumer: printed {} values, awaiting {:?}", received, self.sentinel);
                    phase = Phase::AwaitingSentinel;
                },
                Phase::Receiving => {
                    let value = self.receive(consumer, phase, received)?;
                    writeln!(out, "{} -- Here's the string: [{}]", received, value)?;
                    received += 1;
                },
                Phase::AwaitingSentinel => {
                    let value = self.receive(consumer, phase, received)?;
                    if value == self.sentinel {
                        phase = Phase::Done;
                    } else {
                        warn!("consumer: discarding {:?} while awaiting the sentinel", value);
                        discarded += 1;
                    }
                },
                Phase::Done => break,
            }
        }

        let elapsed = start.elapsed();
        info!("consumer: received the sentinel after {:?}", elapsed);
        Ok(Report { received: received, discarded: discarded, elapsed: elapsed })
    }

    /// Creates a channel, starts the producer, and consumes on the calling thread.
    ///
    /// The producer thread is not joined; the sentinel is its final send.
    pub fn run<W>(&self, out: &mut W) -> Result<Report, ScriptError> where W: Write {
        let (producer, consumer) = rendezvous::channel();
        let _producer = self.spawn(producer).map_err(ScriptError::Spawn)?;
        self.consume(&consumer, out)
    }

    /// Runs the script and returns the process exit status: `0` once the sentinel is received or
    /// `1`, after logging the error, if the script failed.
    pub fn status<W>(&self, out: &mut W) -> i32 where W: Write {
        match self.run(out) {
            Ok(report) => {
                info!("finished: {:?}", report);
                0
            },
            Err(err) => {
                error!("{}", err);
                1
            },
        }
    }

    fn receive(
        &self, consumer: &Consumer<String>, phase: Phase, received: usize
    ) -> Result<String, ScriptError> {
        let result = match self.wait {
            Wait::Forever => consumer.consume(),
            Wait::Within(timeout) => consumer.consume_timeout(timeout),
        };
        result.map_err(|source| ScriptError::Consume { phase: phase, received: received, source: source })
    }
}

impl Default for Script {
    fn default() -> Self {
        Script::new()
    }
}

//================================================
// Functions
//================================================

fn send(producer: &Producer<String>, index: usize, value: String) -> Result<(), ScriptError> {
    debug!("producer: sending {:?}", value);
    producer.produce(value).map_err(|source| ScriptError::Produce { index: index, source: source })
}

//================================================
// Tests
//================================================
