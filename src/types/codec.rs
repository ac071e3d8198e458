/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Deterministic binary encoding of every type that crosses a node boundary or is persisted.
//!
//! The canonical encoding is [Borsh](borsh): fixed-width little-endian integers, `u32` length
//! prefixes for sequences, a one-byte tag for enums and options. For every type, encoding is
//! injective, and [`decode`] is its exact left inverse: it fails on truncated input *and* on
//! trailing bytes.

use std::fmt::{self, Display, Formatter};

use borsh::{BorshDeserialize, BorshSerialize};

/// Serialize `value` into its canonical encoding.
pub fn encode<T: BorshSerialize + ?Sized>(value: &T) -> Vec<u8> {
    let mut bytes = Vec::new();
    // Writing into a `Vec<u8>` cannot fail.
    let _ = value.serialize(&mut bytes);
    bytes
}

/// Deserialize a value of type `T` from exactly `bytes`.
pub fn decode<T: BorshDeserialize>(bytes: &[u8]) -> Result<T, DecodeError> {
    T::try_from_slice(bytes).map_err(DecodeError::Malformed)
}

/// Error when trying to decode bytes received from a peer or read from storage.
#[derive(Debug)]
pub enum DecodeError {
    /// The input was empty where at least a message code was expected.
    Empty,
    /// The leading message code byte is not one that this library knows.
    UnknownCode(u8),
    /// The message code is known but is not one that carries a consensus or sync body.
    UnsupportedCode(u8),
    /// The body was truncated, had trailing bytes, or contained an invalid value.
    Malformed(std::io::Error),
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Empty => write!(f, "empty input"),
            DecodeError::UnknownCode(code) => write!(f, "unknown message code {:#04x}", code),
            DecodeError::UnsupportedCode(code) => write!(f, "unsupported message code {:#04x}", code),
            DecodeError::Malformed(err) => write!(f, "malformed body: {}", err),
        }
    }
}

impl From<std::io::Error> for DecodeError {
    fn from(err: std::io::Error) -> Self {
        DecodeError::Malformed(err)
    }
}
