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

//! # Bloom filters for in-memory set membership
//!
//! A Bloom filter answers "possibly present" or "definitely absent" for set membership,
//! trading a bounded false positive rate for far less space than the set itself. Storage and
//! caching layers use them to skip expensive lookups for keys known not to exist.
//!
//! Three variants share one interface, [`BloomFilter`]:
//!
//! - [`StandardBloom`]: one bit array of `m` bits shared by all `k` hash values.
//! - [`PartitionedBloom`]: `k` bit arrays of `ceil(m / k)` bits, one per hash value.
//! - [`ScalableBloom`]: a growing chain of either of the above, each new generation with a
//!   tighter error budget, so the capacity need not be known up front.
//!
//! # Properties
//!
//! - **No false negatives**: If an item was added, `check()` will always return `true`
//! - **Possible false positives**: `check()` may return `true` for items never added, at a
//!   rate bounded by the configured error rate while the filter stays within capacity
//! - **One digest per item**: all `k` bit positions come from a single digest via double
//!   hashing (Kirsch-Mitzenmacher)
//!
//! # Usage
//!
//! ```rust
//! use bloomfilters::BloomFilter;
//! use bloomfilters::ScalableBloom;
//! use bloomfilters::StandardBloom;
//!
//! let mut filter = StandardBloom::new(1000).unwrap();
//! filter.add(b"alpha").add(b"beta").add(b"gamma");
//! assert!(filter.check(b"alpha"));
//! assert_eq!(filter.count(), 3);
//!
//! // Grows as needed while keeping the compound error rate bounded.
//! let mut filter = ScalableBloom::new(100).unwrap();
//! for i in 0..10_000 {
//!     filter.add(format!("key-{i}").as_bytes());
//! }
//! assert!(filter.check(b"key-42"));
//! ```
//!
//! # Configuration
//!
//! Filters are sized from a capacity `n`, a target fill ratio `p` (default 0.5) and a target
//! error rate `e` (default 0.001); see [`params`] for the formulas. Use
//! [`BloomFilterBuilder`] to set them up front, or the setters on [`BloomFilter`] followed by
//! [`BloomFilter::reset`]: setters never change a filter's current bits.
//!
//! # Concurrency
//!
//! Filters are single-threaded values. They are `Send` but not `Sync`; guard a shared filter
//! with a `Mutex`.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]

pub mod bitset;
pub mod error;
pub mod hash;
pub mod params;

mod builder;
mod filter;
mod partitioned;
mod scalable;
mod standard;

pub use self::builder::BloomFilterBuilder;
pub use self::filter::BloomFilter;
pub use self::partitioned::PartitionedBloom;
pub use self::scalable::Constructor;
pub use self::scalable::ScalableBloom;
pub use self::scalable::Underlying;
pub use self::scalable::DEFAULT_TIGHTENING_RATIO;
pub use self::standard::StandardBloom;
