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

use bloomfilters::hash::DigestSource;

/// A 4-byte digest, too narrow to split into two 32-bit halves.
#[derive(Debug, Clone, Default)]
pub struct NarrowDigest {
    state: u32,
}

impl DigestSource for NarrowDigest {
    fn reset(&mut self) {
        self.state = 0;
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state = self.state.rotate_left(5) ^ u32::from(b);
        }
    }

    fn size(&self) -> usize {
        4
    }

    fn sum(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.state.to_be_bytes());
    }
}
