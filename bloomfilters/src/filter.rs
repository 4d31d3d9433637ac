// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::cell::RefCell;
use std::fmt;

use crate::error::Error;
use crate::hash::validate_digest;
use crate::hash::Digester;
use crate::hash::DigestSource;
use crate::hash::DoubleHash;
use crate::params::check_error_rate;
use crate::params::FilterParameters;

/// The operations every filter variant supports.
///
/// [`ScalableBloom`](crate::ScalableBloom) is written against this trait, so any implementation
/// can serve as its underlying filter.
///
/// Configuration setters never touch the current bit state: their effect is deferred until the
/// next [`reset`](Self::reset).
///
/// Filters are not synchronized. Checking mutates the digest state through interior
/// mutability, so a filter is `Send` but not `Sync`; wrap it in a `Mutex` to share it.
pub trait BloomFilter: fmt::Debug + Send {
    /// Inserts `item` and returns the filter for chaining.
    ///
    /// After insertion, `check(item)` always returns `true`. The item count grows by one on
    /// every call, including repeated items.
    fn add(&mut self, item: &[u8]) -> &mut dyn BloomFilter;

    /// Tests whether `item` is possibly in the set.
    ///
    /// Returns:
    /// - `true`: Item was **possibly** inserted (or false positive)
    /// - `false`: Item was **definitely not** inserted
    fn check(&self, item: &[u8]) -> bool;

    /// Tests and inserts an item in a single operation.
    ///
    /// Returns whether the item was possibly already in the set before insertion.
    fn check_and_add(&mut self, item: &[u8]) -> bool {
        let was_present = self.check(item);
        self.add(item);
        was_present
    }

    /// Returns the number of [`add`](Self::add) calls since the last reset.
    fn count(&self) -> u64;

    /// Returns whether nothing has been added since the last reset.
    fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Re-derives the sizing from the current configuration and clears all state.
    ///
    /// Bit storage is reallocated all-zero, the count returns to zero, and the digest source is
    /// reset (or replaced by one installed with [`set_hasher`](Self::set_hasher)).
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the filter untouched, if the configuration cannot be sized.
    fn reset(&mut self) -> Result<(), Error>;

    /// Installs a digest source, effective from the next [`reset`](Self::reset).
    ///
    /// # Errors
    ///
    /// Returns [`InvalidDigest`](crate::error::ErrorKind::InvalidDigest) if the digest is
    /// shorter than [`MIN_DIGEST_SIZE`](crate::hash::MIN_DIGEST_SIZE) bytes.
    fn set_hasher(&mut self, hasher: Box<dyn DigestSource>) -> Result<(), Error>;

    /// Sets the target error rate, effective from the next [`reset`](Self::reset).
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfig`](crate::error::ErrorKind::InvalidConfig) if `e` is not in
    /// `(0, 1)`.
    fn set_error_probability(&mut self, e: f64) -> Result<(), Error>;

    /// Returns the configured target error rate, including a value not yet applied by a reset.
    fn error_probability(&self) -> f64;

    /// Returns the observed fraction of bits set.
    fn fill_ratio(&self) -> f64;

    /// Returns the fill ratio predicted from the item count alone.
    fn estimated_fill_ratio(&self) -> f64;

    /// Writes a human-readable summary of the sizing and bit usage.
    fn write_stats(&self, w: &mut dyn fmt::Write) -> fmt::Result;

    /// Prints [`write_stats`](Self::write_stats) to stdout.
    fn print_stats(&self) {
        let mut stats = String::new();
        if self.write_stats(&mut stats).is_ok() {
            print!("{stats}");
        }
    }
}

/// Configuration, digest and counters shared by the array-backed filters.
#[derive(Debug, Clone)]
pub(crate) struct FilterState {
    /// Digest source and its scratch buffer, reset before every item
    digester: RefCell<Digester>,
    /// Digest source installed by the next reset
    pending_hasher: Option<Box<dyn DigestSource>>,
    /// Expected item count (n)
    capacity: u64,
    /// Target fill ratio (p)
    fill_ratio: f64,
    /// Target error rate (e), possibly not yet applied
    error_rate: f64,
    /// Sizing derived at the last reset
    params: FilterParameters,
    /// Number of items added (c)
    count: u64,
}

impl FilterState {
    pub(crate) fn new(
        capacity: u64,
        fill_ratio: f64,
        error_rate: f64,
        hasher: Box<dyn DigestSource>,
    ) -> Result<Self, Error> {
        validate_digest(&*hasher)?;
        let params = FilterParameters::derive(capacity, fill_ratio, error_rate)?;

        Ok(FilterState {
            digester: RefCell::new(Digester::new(hasher)),
            pending_hasher: None,
            capacity,
            fill_ratio,
            error_rate,
            params,
            count: 0,
        })
    }

    /// Sizes the filter from the current configuration without applying anything.
    pub(crate) fn derive(&self) -> Result<FilterParameters, Error> {
        FilterParameters::derive(self.capacity, self.fill_ratio, self.error_rate)
    }

    /// Adopts `params`, zeroes the count and brings the digest source to its initial state.
    pub(crate) fn commit(&mut self, params: FilterParameters) {
        self.params = params;
        self.count = 0;

        let digester = self.digester.get_mut();
        match self.pending_hasher.take() {
            Some(hasher) => *digester = Digester::new(hasher),
            None => digester.reset(),
        }
    }

    pub(crate) fn double_hash(&self, item: &[u8]) -> DoubleHash {
        self.digester.borrow_mut().double_hash(item)
    }

    pub(crate) fn set_hasher(&mut self, hasher: Box<dyn DigestSource>) -> Result<(), Error> {
        validate_digest(&*hasher)?;
        self.pending_hasher = Some(hasher);
        Ok(())
    }

    pub(crate) fn set_error_rate(&mut self, e: f64) -> Result<(), Error> {
        check_error_rate(e)?;
        self.error_rate = e;
        Ok(())
    }

    pub(crate) fn error_rate(&self) -> f64 {
        self.error_rate
    }

    pub(crate) fn params(&self) -> &FilterParameters {
        &self.params
    }

    pub(crate) fn count(&self) -> u64 {
        self.count
    }

    pub(crate) fn increment(&mut self) {
        self.count += 1;
    }

    pub(crate) fn write_header(&self, w: &mut dyn fmt::Write) -> fmt::Result {
        let params = &self.params;
        writeln!(
            w,
            "m = {}, n = {}, k = {}, s = {}, p = {}, e = {}",
            params.num_bits(),
            params.capacity(),
            params.num_hashes(),
            params.partition_size(),
            params.fill_ratio(),
            params.error_rate(),
        )?;
        writeln!(w, "Total items: {}", self.count)
    }
}
