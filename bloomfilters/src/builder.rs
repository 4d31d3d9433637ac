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

use crate::error::Error;
use crate::filter::FilterState;
use crate::hash::default_digest;
use crate::hash::DigestSource;
use crate::params::DEFAULT_ERROR_RATE;
use crate::params::DEFAULT_FILL_RATIO;
use crate::scalable::Constructor;
use crate::scalable::Underlying;
use crate::scalable::DEFAULT_TIGHTENING_RATIO;
use crate::PartitionedBloom;
use crate::ScalableBloom;
use crate::StandardBloom;

/// Builder for creating [`StandardBloom`], [`PartitionedBloom`] and [`ScalableBloom`]
/// instances.
///
/// Every setting starts at its default; nothing is validated until one of the `build_*`
/// methods runs.
///
/// # Examples
///
/// ```
/// # use bloomfilters::BloomFilter;
/// # use bloomfilters::BloomFilterBuilder;
/// # use bloomfilters::Underlying;
/// let mut filter = BloomFilterBuilder::new(10_000)
///     .error_rate(0.01)
///     .fill_ratio(0.5)
///     .underlying(Underlying::Standard)
///     .build_scalable()
///     .unwrap();
///
/// filter.add(b"apple");
/// assert!(filter.check(b"apple"));
/// ```
#[derive(Clone)]
pub struct BloomFilterBuilder {
    capacity: u64,
    fill_ratio: f64,
    error_rate: f64,
    tightening_ratio: f64,
    hasher: Option<Box<dyn DigestSource>>,
    underlying: Underlying,
    constructor: Option<Constructor>,
}

impl BloomFilterBuilder {
    /// Starts a builder for filters expected to hold `capacity` items.
    pub fn new(capacity: u64) -> Self {
        BloomFilterBuilder {
            capacity,
            fill_ratio: DEFAULT_FILL_RATIO,
            error_rate: DEFAULT_ERROR_RATE,
            tightening_ratio: DEFAULT_TIGHTENING_RATIO,
            hasher: None,
            underlying: Underlying::default(),
            constructor: None,
        }
    }

    /// Sets the target fill ratio `p` (default: 0.5).
    ///
    /// For scalable filters this is also the growth threshold.
    pub fn fill_ratio(mut self, p: f64) -> Self {
        self.fill_ratio = p;
        self
    }

    /// Sets the target error rate `e` (default: 0.001).
    ///
    /// For scalable filters this is the budget of the first generation.
    pub fn error_rate(mut self, e: f64) -> Self {
        self.error_rate = e;
        self
    }

    /// Sets the error tightening ratio `r` of scalable filters (default: 0.9).
    pub fn tightening_ratio(mut self, r: f64) -> Self {
        self.tightening_ratio = r;
        self
    }

    /// Sets the digest source (default: [`Fnv64`](crate::hash::Fnv64)).
    pub fn hasher(mut self, hasher: impl DigestSource + 'static) -> Self {
        self.hasher = Some(Box::new(hasher));
        self
    }

    /// Selects the variant scalable filters grow (default: [`Underlying::Partitioned`]).
    pub fn underlying(mut self, underlying: Underlying) -> Self {
        self.underlying = underlying;
        self.constructor = None;
        self
    }

    /// Sets a custom generation constructor for scalable filters, overriding
    /// [`underlying`](Self::underlying).
    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.constructor = Some(constructor);
        self
    }

    /// Builds a [`StandardBloom`].
    ///
    /// # Errors
    ///
    /// Returns an error if the capacity, fill ratio, error rate or digest source is invalid.
    pub fn build_standard(self) -> Result<StandardBloom, Error> {
        self.filter_state().map(StandardBloom::from_state)
    }

    /// Builds a [`PartitionedBloom`].
    ///
    /// # Errors
    ///
    /// Returns an error if the capacity, fill ratio, error rate or digest source is invalid.
    pub fn build_partitioned(self) -> Result<PartitionedBloom, Error> {
        self.filter_state().map(PartitionedBloom::from_state)
    }

    /// Builds a [`ScalableBloom`] with its first generation in place.
    ///
    /// # Errors
    ///
    /// Returns an error if any setting is invalid or the first generation cannot be built.
    pub fn build_scalable(self) -> Result<ScalableBloom, Error> {
        let constructor = self
            .constructor
            .unwrap_or_else(|| self.underlying.constructor(self.fill_ratio));
        ScalableBloom::from_parts(
            self.capacity,
            self.fill_ratio,
            self.error_rate,
            self.tightening_ratio,
            self.hasher,
            constructor,
        )
    }

    fn filter_state(self) -> Result<FilterState, Error> {
        let hasher = self.hasher.unwrap_or_else(default_digest);
        FilterState::new(self.capacity, self.fill_ratio, self.error_rate, hasher)
    }
}

impl std::fmt::Debug for BloomFilterBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BloomFilterBuilder")
            .field("capacity", &self.capacity)
            .field("fill_ratio", &self.fill_ratio)
            .field("error_rate", &self.error_rate)
            .field("tightening_ratio", &self.tightening_ratio)
            .field("hasher", &self.hasher)
            .field("underlying", &self.underlying)
            .field("custom_constructor", &self.constructor.is_some())
            .finish()
    }
}
