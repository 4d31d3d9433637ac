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

use std::fmt;
use std::hash::Hasher;

use super::DigestSource;

/// Adapts any [`Hasher`] with a deterministic [`Default`] state into a [`DigestSource`].
///
/// The digest is the 8-byte big-endian form of [`Hasher::finish`]; `reset` replaces the hasher
/// with `H::default()`.
///
/// # Examples
///
/// ```
/// # use std::collections::hash_map::DefaultHasher;
/// # use bloomfilters::BloomFilter;
/// # use bloomfilters::StandardBloom;
/// # use bloomfilters::hash::StdHasher;
/// let mut filter = StandardBloom::new(100).unwrap();
/// filter.set_hasher(Box::new(StdHasher::<DefaultHasher>::new())).unwrap();
/// filter.reset().unwrap();
///
/// filter.add(b"apple");
/// assert!(filter.check(b"apple"));
/// ```
#[derive(Clone, Default)]
pub struct StdHasher<H> {
    hasher: H,
}

impl<H: Default> StdHasher<H> {
    /// Wraps a fresh `H::default()`.
    pub fn new() -> Self {
        StdHasher {
            hasher: H::default(),
        }
    }
}

impl<H> fmt::Debug for StdHasher<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdHasher")
            .field("hasher", &std::any::type_name::<H>())
            .finish()
    }
}

impl<H> DigestSource for StdHasher<H>
where
    H: Hasher + Default + Clone + Send + 'static,
{
    fn reset(&mut self) {
        self.hasher = H::default();
    }

    fn write(&mut self, bytes: &[u8]) {
        self.hasher.write(bytes);
    }

    fn size(&self) -> usize {
        8
    }

    fn sum(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.hasher.finish().to_be_bytes());
    }
}
