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

//! Blocking rendezvous channels and a paced producer/consumer script.

#![warn(missing_copy_implementations, missing_debug_implementations, missing_docs)]

use std::fmt;

use thiserror::Error;

pub mod rendezvous;
pub mod script;

//================================================
// Enums
//================================================

// ConsumeError __________________________________

/// Indicates the reason a `consume` operation could not return an item.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
pub enum ConsumeError {
    /// No item was on offer and the channel had no remaining producers.
    #[error("the channel was empty and had no remaining producers")]
    Disconnected,
    /// No item was on offer.
    #[error("the channel was empty")]
    Empty,
    /// No item was offered before the deadline.
    #[error("no item was offered before the deadline")]
    Timeout,
}

// ProduceError __________________________________

/// Indicates the reason a `produce` operation rejected an item.
#[derive(Copy, Clone, Error, PartialEq, Eq)]
pub enum ProduceError<T> {
    /// The channel had no remaining consumers.
    #[error("the channel had no remaining consumers")]
    Disconnected(T),
    /// No consumer accepted the item before the deadline.
    #[error("no consumer accepted the item before the deadline")]
    Timeout(T),
}

impl<T> ProduceError<T> {
    //- Consumers --------------------------------

    /// Returns the rejected item.
    pub fn item(self) -> T {
        match self { ProduceError::Disconnected(item) | ProduceError::Timeout(item) => item }
    }
}

impl<T> fmt::Debug for ProduceError<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ProduceError::Disconnected(_) => write!(formatter, "ProduceError::Disconnected(..)"),
            ProduceError::Timeout(_) => write!(formatter, "ProduceError::Timeout(..)"),
        }
    }
}

//================================================
// Tests
//================================================
