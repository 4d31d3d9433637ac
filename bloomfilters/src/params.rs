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

//! Sizing formulas shared by every filter variant.
//!
//! Given a capacity `n`, a target fill ratio `p` and a target error rate `e`:
//!
//! ```text
//! k = ceil(log2(1 / e))                              number of hash values
//! m = ceil(n / ((ln(p) * ln(1 - p)) / |ln(e)|))      total bits
//! s = ceil(m / k)                                    bits per partition
//! ```
//!
//! The formulas are undefined at the edges of their domains, so every function here rejects
//! `n = 0`, `p` or `e` outside the open interval `(0, 1)`, and results too large to allocate.

use crate::error::Error;

/// Default target fill ratio `p`.
pub const DEFAULT_FILL_RATIO: f64 = 0.5;
/// Default target error rate `e`.
pub const DEFAULT_ERROR_RATE: f64 = 0.001;

/// Smallest hash count a filter uses.
pub const MIN_NUM_HASHES: u32 = 1;
/// Largest hash count a filter accepts.
pub const MAX_NUM_HASHES: u32 = u16::MAX as u32;
/// Largest bit count a filter accepts.
pub const MAX_NUM_BITS: u64 = i32::MAX as u64 * 64;

/// Returns the number of hash values `k = ceil(log2(1/e))` for error rate `e`.
///
/// # Errors
///
/// Returns [`InvalidConfig`](crate::error::ErrorKind::InvalidConfig) if `e` is not in `(0, 1)`
/// or `k` would exceed [`MAX_NUM_HASHES`].
///
/// # Examples
///
/// ```
/// # use bloomfilters::params::num_hashes;
/// assert_eq!(num_hashes(0.001).unwrap(), 10); // log2(1000) ≈ 9.97
/// assert_eq!(num_hashes(0.01).unwrap(), 7); // log2(100) ≈ 6.64
/// assert!(num_hashes(1.0).is_err());
/// ```
pub fn num_hashes(e: f64) -> Result<u32, Error> {
    check_error_rate(e)?;

    let k = (1.0 / e).log2().ceil();
    if !(k <= f64::from(MAX_NUM_HASHES)) {
        return Err(Error::invalid_config(format!(
            "error rate requires more than {MAX_NUM_HASHES} hash values"
        ))
        .with_context("error_rate", e));
    }
    Ok((k as u32).max(MIN_NUM_HASHES))
}

/// Returns the total bit count `m` needed to hold `n` items at fill ratio `p` and error rate `e`.
///
/// # Errors
///
/// Returns [`InvalidConfig`](crate::error::ErrorKind::InvalidConfig) if any input is out of
/// range or `m` would exceed [`MAX_NUM_BITS`].
///
/// # Examples
///
/// ```
/// # use bloomfilters::params::num_bits;
/// assert_eq!(num_bits(1000, 0.5, 0.001).unwrap(), 14378);
/// assert!(num_bits(1000, 0.0, 0.001).is_err());
/// ```
pub fn num_bits(n: u64, p: f64, e: f64) -> Result<u64, Error> {
    check_capacity(n)?;
    check_fill_ratio(p)?;
    check_error_rate(e)?;

    let bits_per_item = (p.ln() * (1.0 - p).ln()) / e.ln().abs();
    let m = (n as f64 / bits_per_item).ceil();
    if !(m <= MAX_NUM_BITS as f64) {
        return Err(Error::invalid_config(format!(
            "filter would need more than {MAX_NUM_BITS} bits"
        ))
        .with_context("capacity", n)
        .with_context("fill_ratio", p)
        .with_context("error_rate", e));
    }
    Ok(m as u64)
}

/// Returns the partition width `s = ceil(m / k)`.
///
/// # Errors
///
/// Returns [`InvalidConfig`](crate::error::ErrorKind::InvalidConfig) if `m` or `k` is zero.
pub fn partition_size(m: u64, k: u32) -> Result<u64, Error> {
    if m == 0 {
        return Err(Error::out_of_range("num_bits", m));
    }
    if k == 0 {
        return Err(Error::out_of_range("num_hashes", k));
    }
    Ok(m.div_ceil(u64::from(k)))
}

pub(crate) fn check_capacity(n: u64) -> Result<(), Error> {
    if n == 0 {
        return Err(Error::out_of_range("capacity", n));
    }
    Ok(())
}

pub(crate) fn check_fill_ratio(p: f64) -> Result<(), Error> {
    if !(p > 0.0 && p < 1.0) {
        return Err(Error::out_of_range("fill_ratio", p));
    }
    Ok(())
}

pub(crate) fn check_error_rate(e: f64) -> Result<(), Error> {
    if !(e > 0.0 && e < 1.0) {
        return Err(Error::out_of_range("error_rate", e));
    }
    Ok(())
}

/// The configured and derived sizing of one filter.
///
/// A snapshot taken at the last reset: changing a filter's error rate afterwards does not
/// change these values until the filter is reset again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParameters {
    capacity: u64,
    fill_ratio: f64,
    error_rate: f64,
    num_hashes: u32,
    num_bits: u64,
    partition_size: u64,
}

impl FilterParameters {
    /// Validates `n`, `p` and `e` and derives `k`, `m` and `s` from them.
    ///
    /// `m` is raised to at least `k` so that every hash value has a bit to land on.
    ///
    /// # Examples
    ///
    /// ```
    /// # use bloomfilters::params::FilterParameters;
    /// let params = FilterParameters::derive(10, 0.5, 0.001).unwrap();
    /// assert_eq!(params.num_hashes(), 10);
    /// assert_eq!(params.num_bits(), 144);
    /// assert_eq!(params.partition_size(), 15);
    /// ```
    pub fn derive(capacity: u64, fill_ratio: f64, error_rate: f64) -> Result<Self, Error> {
        let num_hashes = num_hashes(error_rate)?;
        let num_bits = num_bits(capacity, fill_ratio, error_rate)?.max(u64::from(num_hashes));
        let partition_size = partition_size(num_bits, num_hashes)?;

        Ok(FilterParameters {
            capacity,
            fill_ratio,
            error_rate,
            num_hashes,
            num_bits,
            partition_size,
        })
    }

    /// Expected number of items `n`.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Target fill ratio `p`.
    pub fn fill_ratio(&self) -> f64 {
        self.fill_ratio
    }

    /// Target error rate `e`.
    pub fn error_rate(&self) -> f64 {
        self.error_rate
    }

    /// Number of hash values `k`.
    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Total bits `m`.
    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    /// Bits per partition `s`.
    pub fn partition_size(&self) -> u64 {
        self.partition_size
    }
}
