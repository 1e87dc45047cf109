use serde::{Deserialize, Serialize};

use crate::lang::value::Number;
use crate::storage::StrRef;

/// A translated bytecode program.
///
/// `code` is the flat instruction stream: even positions hold the opcode
/// word, odd positions the operand word. The instruction count is therefore
/// half the written length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub code: Vec<u64>,
}

impl Program {
    pub fn new() -> Self {
        Program { code: Vec::new() }
    }

    pub fn instruction_count(&self) -> usize {
        self.code.len() / 2
    }

    /// The (opcode word, operand word) pair at instruction index `i`.
    pub fn instruction(&self, i: usize) -> Option<(u64, u64)> {
        let opcode = *self.code.get(i * 2)?;
        let operand = *self.code.get(i * 2 + 1)?;
        Some((opcode, operand))
    }
}

/// A self-contained compiled image: the code stream plus snapshots of the
/// pools its push instructions reference. Serialized with postcard for
/// compile-once / run-later workflows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub strings: Vec<u8>,
    pub literals: Vec<Number>,
    pub code: Vec<u64>,
}

impl Image {
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Image, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

/// Packs a string-pool reference into an operand word.
pub fn pack_str_ref(r: StrRef) -> u64 {
    (u64::from(r.offset) << 32) | u64::from(r.len)
}

/// Unpacks an operand word written by `pack_str_ref`.
pub fn unpack_str_ref(word: u64) -> StrRef {
    StrRef {
        offset: (word >> 32) as u32,
        len: (word & 0xffff_ffff) as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_ref_packing() {
        let r = StrRef {
            offset: 99_000,
            len: 17,
        };
        assert_eq!(unpack_str_ref(pack_str_ref(r)), r);
    }

    #[test]
    fn test_image_postcard_round_trip() {
        let image = Image {
            strings: b"foo".to_vec(),
            literals: vec![Number::Int(7), Number::Float(0.5)],
            code: vec![1, 0, 0, 0],
        };

        let bytes = image.to_bytes().unwrap();
        let back = Image::from_bytes(&bytes).unwrap();

        assert_eq!(back.strings, image.strings);
        assert_eq!(back.literals, image.literals);
        assert_eq!(back.code, image.code);
    }

    #[test]
    fn test_image_rejects_garbage() {
        assert!(Image::from_bytes(&[0xff, 0xff, 0xff, 0xff, 0xff]).is_err());
    }
}
