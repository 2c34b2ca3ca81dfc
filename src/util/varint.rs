//! Variable-length integer encoding utilities.
//!
//! 7 bits per byte with a continuation bit, used for lengths, doc numbers and
//! term frequencies in segment files.

use std::io::Read;

use byteorder::ReadBytesExt;

use crate::error::{GlaiveError, Result};

/// Encode a u64 value using variable-length encoding.
pub fn encode_u64(value: u64) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(10);
    let mut val = value;

    loop {
        let mut byte = (val & 0x7F) as u8;
        val >>= 7;

        if val != 0 {
            byte |= 0x80; // continuation bit
        }

        bytes.push(byte);

        if val == 0 {
            break;
        }
    }

    bytes
}

/// Decode a u64 value, returning it with the number of bytes consumed.
pub fn decode_u64(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut result = 0u64;
    let mut shift = 0;

    for (i, &byte) in bytes.iter().enumerate() {
        if shift >= 64 {
            return Err(GlaiveError::storage("VarInt overflow"));
        }

        result |= ((byte & 0x7F) as u64) << shift;

        if (byte & 0x80) == 0 {
            return Ok((result, i + 1));
        }

        shift += 7;
    }

    Err(GlaiveError::storage("Incomplete VarInt"))
}

/// Read a variable-length encoded u64, returning the value and its raw bytes.
pub fn read_u64_raw<R: Read>(reader: &mut R) -> Result<(u64, Vec<u8>)> {
    let mut bytes = Vec::with_capacity(4);
    loop {
        let byte = reader.read_u8()?;
        bytes.push(byte);
        if byte & 0x80 == 0 {
            break;
        }
        if bytes.len() > 10 {
            return Err(GlaiveError::storage("VarInt overflow"));
        }
    }

    let (value, _) = decode_u64(&bytes)?;
    Ok((value, bytes))
}
