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

use digest::FixedOutput;
use digest::OutputSizeUser;
use digest::Reset;
use digest::Update;

use super::DigestSource;

/// Adapts a RustCrypto hash function (MD5, SHA-1, SHA-2, ...) into a [`DigestSource`].
///
/// The digest is the algorithm's full fixed-size output, so any function producing at least
/// eight bytes can drive a filter.
///
/// # Examples
///
/// ```
/// # use bloomfilters::BloomFilter;
/// # use bloomfilters::BloomFilterBuilder;
/// # use bloomfilters::hash::CryptoDigest;
/// let mut filter = BloomFilterBuilder::new(100)
///     .hasher(CryptoDigest::<sha1::Sha1>::new())
///     .build_partitioned()
///     .unwrap();
///
/// filter.add(b"apple");
/// assert!(filter.check(b"apple"));
/// ```
#[derive(Clone, Default)]
pub struct CryptoDigest<D> {
    hasher: D,
}

impl<D: Default> CryptoDigest<D> {
    /// Wraps a fresh `D::default()`.
    pub fn new() -> Self {
        CryptoDigest {
            hasher: D::default(),
        }
    }
}

impl<D> fmt::Debug for CryptoDigest<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoDigest")
            .field("hasher", &std::any::type_name::<D>())
            .finish()
    }
}

impl<D> DigestSource for CryptoDigest<D>
where
    D: Update + FixedOutput + Reset + Default + Clone + Send + 'static,
{
    fn reset(&mut self) {
        Reset::reset(&mut self.hasher);
    }

    fn write(&mut self, bytes: &[u8]) {
        Update::update(&mut self.hasher, bytes);
    }

    fn size(&self) -> usize {
        <D as OutputSizeUser>::output_size()
    }

    fn sum(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.hasher.clone().finalize_fixed());
    }
}
