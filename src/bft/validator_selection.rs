/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Deterministic choice of the primary validator of a (height, view).
//!
//! Every node must choose the same primary for every (height, view), so both modes below are
//! consensus-critical down to the bit:
//! 1. **Legacy**: the first byte of `h256(height as 8 big-endian bytes ‖ view as 4 big-endian
//!    bytes)`, modulo the number of validators. Biased toward the front of the list whenever the
//!    number of validators does not divide 256.
//! 2. **Uniform** (the `uniform_distribution` fork): the seed is the XOR of one [`fast_rand`] step
//!    over the height and one over the view, and one more step over the seed, modulo the number of
//!    validators, picks the index.

use crate::types::{crypto_primitives::h256, data_types::Address};

/// Get the primary validator of (`height`, `view`), or `None` if `validators` is empty.
pub fn primary_validator(
    validators: &[Address],
    height: u64,
    view: u32,
    uniform_distribution: bool,
) -> Option<&Address> {
    if validators.is_empty() {
        return None;
    }

    let index = if uniform_distribution {
        uniform_index(validators.len(), height, view)
    } else {
        legacy_index(validators.len(), height, view)
    };
    validators.get(index)
}

fn legacy_index(n: usize, height: u64, view: u32) -> usize {
    let mut seed = height.to_be_bytes().to_vec();
    seed.extend_from_slice(&view.to_be_bytes());
    h256(&seed).bytes()[0] as usize % n
}

fn uniform_index(n: usize, height: u64, view: u32) -> usize {
    let seed = fast_rand(height) ^ fast_rand(view as u64);
    (fast_rand(seed) % n as u64) as usize
}

/// One step of the "fast random" linear congruential generator: bits 16 to 30 of
/// `214013 * seed + 2531011`.
///
/// Only the low 31 bits of the product are kept, so wrapping arithmetic gives the same result as
/// arbitrary precision.
pub fn fast_rand(seed: u64) -> u64 {
    (seed.wrapping_mul(214013).wrapping_add(2531011) >> 16) & 0x7FFF
}
