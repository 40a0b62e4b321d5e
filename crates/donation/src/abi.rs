//! # Contract Interface Description (ABI)
//!
//! Loads the contract interface from its JSON asset and provides the small
//! codec the binding needs: Keccak-256 function selectors, `uint256`
//! argument encoding, and word-oriented decoding of return data (static
//! words, dynamic strings, arrays of tuples).
//!
//! The description is validated at load time: an ABI without a `donate`
//! function is rejected before any call is attempted.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// Width of one ABI word in bytes.
const WORD: usize = 32;

// ════════════════════════════════════════════════════════════════════════════
// ERROR TYPE
// ════════════════════════════════════════════════════════════════════════════

/// Errors from ABI loading and coding.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AbiError {
    /// The ABI asset could not be read.
    #[error("failed to read abi asset: {0}")]
    Io(String),

    /// The asset is not a valid ABI JSON array.
    #[error("failed to parse abi: {0}")]
    Parse(String),

    /// A required function is absent from the description.
    #[error("abi has no function {0:?}")]
    MissingFunction(String),

    /// Argument count or type does not match the function's inputs.
    #[error("bad arguments for {function}: {message}")]
    BadArguments { function: String, message: String },

    /// Return data is truncated, misaligned, or out of range.
    #[error("abi decode error: {0}")]
    Decode(String),
}

// ════════════════════════════════════════════════════════════════════════════
// DESCRIPTION TYPES
// ════════════════════════════════════════════════════════════════════════════

/// One parameter in a function signature.
#[derive(Debug, Clone, Deserialize)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Present for tuple types.
    #[serde(default)]
    pub components: Vec<AbiParam>,
}

/// One entry of the ABI array (function, event, constructor, ...).
#[derive(Debug, Clone, Deserialize)]
struct AbiEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<AbiParam>,
    #[serde(default)]
    outputs: Vec<AbiParam>,
}

/// A callable function from the description.
#[derive(Debug, Clone)]
pub struct AbiFunction {
    pub name: String,
    pub inputs: Vec<AbiParam>,
    pub outputs: Vec<AbiParam>,
}

/// Parsed and validated contract interface.
#[derive(Debug, Clone)]
pub struct ContractAbi {
    functions: HashMap<String, AbiFunction>,
}

impl ContractAbi {
    /// Parse an ABI JSON array and validate that `donate` is present.
    pub fn from_json(raw: &str) -> Result<Self, AbiError> {
        let entries: Vec<AbiEntry> =
            serde_json::from_str(raw).map_err(|e| AbiError::Parse(e.to_string()))?;
        let functions = entries
            .into_iter()
            .filter(|e| e.kind == "function")
            .map(|e| {
                (
                    e.name.clone(),
                    AbiFunction {
                        name: e.name,
                        inputs: e.inputs,
                        outputs: e.outputs,
                    },
                )
            })
            .collect::<HashMap<_, _>>();

        if !functions.contains_key("donate") {
            return Err(AbiError::MissingFunction("donate".to_string()));
        }
        Ok(Self { functions })
    }

    /// Load the description from its JSON asset on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AbiError> {
        let raw = fs::read_to_string(path.as_ref()).map_err(|e| AbiError::Io(e.to_string()))?;
        Self::from_json(&raw)
    }

    /// Look up a function by name.
    pub fn function(&self, name: &str) -> Result<&AbiFunction, AbiError> {
        self.functions
            .get(name)
            .ok_or_else(|| AbiError::MissingFunction(name.to_string()))
    }

    /// 4-byte selector: Keccak-256 of the canonical signature.
    pub fn selector(&self, name: &str) -> Result<[u8; 4], AbiError> {
        let function = self.function(name)?;
        let signature = format!(
            "{}({})",
            function.name,
            function
                .inputs
                .iter()
                .map(canonical_type)
                .collect::<Vec<_>>()
                .join(",")
        );
        let digest = Keccak256::digest(signature.as_bytes());
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&digest[..4]);
        Ok(selector)
    }

    /// Calldata for `name` with unsigned-integer arguments.
    ///
    /// Covers the platform contract's whole surface: `donate()` takes no
    /// arguments and the view methods take a single `uint256` limit.
    pub fn encode_call_uints(&self, name: &str, args: &[u128]) -> Result<Vec<u8>, AbiError> {
        let function = self.function(name)?;
        if function.inputs.len() != args.len() {
            return Err(AbiError::BadArguments {
                function: name.to_string(),
                message: format!(
                    "expected {} arguments, got {}",
                    function.inputs.len(),
                    args.len()
                ),
            });
        }
        for input in &function.inputs {
            if !input.kind.starts_with("uint") {
                return Err(AbiError::BadArguments {
                    function: name.to_string(),
                    message: format!("unsupported argument type {:?}", input.kind),
                });
            }
        }

        let mut data = self.selector(name)?.to_vec();
        for arg in args {
            let mut word = [0u8; WORD];
            word[WORD - 16..].copy_from_slice(&arg.to_be_bytes());
            data.extend_from_slice(&word);
        }
        Ok(data)
    }
}

/// Canonical type string for a signature (tuples expand to components).
fn canonical_type(param: &AbiParam) -> String {
    if let Some(rest) = param.kind.strip_prefix("tuple") {
        let inner = param
            .components
            .iter()
            .map(canonical_type)
            .collect::<Vec<_>>()
            .join(",");
        format!("({}){}", inner, rest)
    } else {
        param.kind.clone()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// RETURN-DATA DECODER
// ════════════════════════════════════════════════════════════════════════════

/// Word-oriented view over ABI return data.
///
/// Slots are 32-byte words counted from the start of the view; dynamic data
/// is reached by taking a [`Decoder::tail`] at a decoded offset.
#[derive(Debug, Clone, Copy)]
pub struct Decoder<'a> {
    data: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn word(&self, slot: usize) -> Result<&'a [u8], AbiError> {
        let start = slot
            .checked_mul(WORD)
            .ok_or_else(|| AbiError::Decode("slot overflow".to_string()))?;
        let end = start + WORD;
        if end > self.data.len() {
            return Err(AbiError::Decode(format!(
                "truncated data: need word at byte {}, have {} bytes",
                start,
                self.data.len()
            )));
        }
        Ok(&self.data[start..end])
    }

    /// Unsigned integer that must fit in 128 bits.
    pub fn uint(&self, slot: usize) -> Result<u128, AbiError> {
        let word = self.word(slot)?;
        if word[..16].iter().any(|b| *b != 0) {
            return Err(AbiError::Decode(format!(
                "uint at slot {} exceeds 128 bits",
                slot
            )));
        }
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&word[16..]);
        Ok(u128::from_be_bytes(bytes))
    }

    /// Unsigned integer that must fit in 64 bits.
    pub fn uint64(&self, slot: usize) -> Result<u64, AbiError> {
        let value = self.uint(slot)?;
        u64::try_from(value)
            .map_err(|_| AbiError::Decode(format!("uint at slot {} exceeds 64 bits", slot)))
    }

    /// Right-aligned 20-byte address, rendered 0x-prefixed lowercase.
    pub fn address(&self, slot: usize) -> Result<String, AbiError> {
        let word = self.word(slot)?;
        if word[..12].iter().any(|b| *b != 0) {
            return Err(AbiError::Decode(format!(
                "address at slot {} has nonzero padding",
                slot
            )));
        }
        Ok(format!("0x{}", hex::encode(&word[12..])))
    }

    /// Byte offset stored at `slot` (for reaching dynamic data).
    pub fn offset(&self, slot: usize) -> Result<usize, AbiError> {
        let value = self.uint(slot)?;
        usize::try_from(value)
            .map_err(|_| AbiError::Decode(format!("offset at slot {} out of range", slot)))
    }

    /// Array length word at slot 0, validated against the data that follows.
    ///
    /// Every element occupies at least one word after the length (an offset
    /// word for dynamic elements, the value itself for static ones), so a
    /// claimed length beyond that bound is corrupt and must not drive an
    /// allocation.
    pub fn array_len(&self) -> Result<usize, AbiError> {
        let len = usize::try_from(self.uint(0)?)
            .map_err(|_| AbiError::Decode("array length out of range".to_string()))?;
        let available = self.data.len().saturating_sub(WORD) / WORD;
        if len > available {
            return Err(AbiError::Decode(format!(
                "array claims {} elements but only {} words follow",
                len, available
            )));
        }
        Ok(len)
    }

    /// Sub-view starting `byte_offset` bytes into this view.
    pub fn tail(&self, byte_offset: usize) -> Result<Decoder<'a>, AbiError> {
        if byte_offset > self.data.len() {
            return Err(AbiError::Decode(format!(
                "offset {} beyond data length {}",
                byte_offset,
                self.data.len()
            )));
        }
        Ok(Decoder {
            data: &self.data[byte_offset..],
        })
    }

    /// UTF-8 string whose length word sits at `byte_offset`.
    pub fn string_at(&self, byte_offset: usize) -> Result<String, AbiError> {
        let view = self.tail(byte_offset)?;
        let len = view.offset(0)?;
        let start = WORD;
        let end = start
            .checked_add(len)
            .ok_or_else(|| AbiError::Decode("string length overflow".to_string()))?;
        if end > view.data.len() {
            return Err(AbiError::Decode(format!(
                "truncated string: need {} bytes, have {}",
                len,
                view.data.len().saturating_sub(start)
            )));
        }
        String::from_utf8(view.data[start..end].to_vec())
            .map_err(|e| AbiError::Decode(format!("invalid utf-8 string: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_ABI: &str = r#"[
        { "type": "function", "name": "donate", "inputs": [], "outputs": [],
          "stateMutability": "payable" },
        { "type": "function", "name": "getRecentDonators",
          "inputs": [{ "name": "limit", "type": "uint256" }],
          "outputs": [], "stateMutability": "view" },
        { "type": "function", "name": "transfer",
          "inputs": [{ "name": "to", "type": "address" },
                     { "name": "value", "type": "uint256" }],
          "outputs": [], "stateMutability": "nonpayable" },
        { "type": "event", "name": "DonationReceived", "inputs": [] }
    ]"#;

    #[test]
    fn test_donate_must_be_present() {
        let without = r#"[{ "type": "function", "name": "withdraw", "inputs": [] }]"#;
        assert_eq!(
            ContractAbi::from_json(without).unwrap_err(),
            AbiError::MissingFunction("donate".to_string())
        );
        assert!(ContractAbi::from_json(MINIMAL_ABI).is_ok());
    }

    #[test]
    fn test_known_selectors() {
        let abi = ContractAbi::from_json(MINIMAL_ABI).unwrap();
        // keccak256("donate()")[..4]
        assert_eq!(abi.selector("donate").unwrap(), [0xed, 0x88, 0xc6, 0x8e]);
        // keccak256("transfer(address,uint256)")[..4], the ERC-20 selector.
        assert_eq!(abi.selector("transfer").unwrap(), [0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn test_encode_call_with_uint_argument() {
        let abi = ContractAbi::from_json(MINIMAL_ABI).unwrap();
        let data = abi.encode_call_uints("getRecentDonators", &[5]).unwrap();
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(&data[..4], &abi.selector("getRecentDonators").unwrap());
        assert_eq!(data[4..35], [0u8; 31]);
        assert_eq!(data[35], 5);
    }

    #[test]
    fn test_encode_call_checks_arity_and_types() {
        let abi = ContractAbi::from_json(MINIMAL_ABI).unwrap();
        assert!(matches!(
            abi.encode_call_uints("donate", &[1]),
            Err(AbiError::BadArguments { .. })
        ));
        // transfer takes an address, which this encoder does not cover.
        assert!(matches!(
            abi.encode_call_uints("transfer", &[1, 2]),
            Err(AbiError::BadArguments { .. })
        ));
        assert!(matches!(
            abi.encode_call_uints("missing", &[]),
            Err(AbiError::MissingFunction(_))
        ));
    }

    fn word_u64(value: u64) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[24..].copy_from_slice(&value.to_be_bytes());
        word
    }

    #[test]
    fn test_decoder_static_words() {
        let mut data = Vec::new();
        data.extend_from_slice(&word_u64(42));
        data.extend_from_slice(&word_u64(7));
        let decoder = Decoder::new(&data);
        assert_eq!(decoder.uint(0).unwrap(), 42);
        assert_eq!(decoder.uint64(1).unwrap(), 7);
        assert!(decoder.uint(2).is_err());
    }

    #[test]
    fn test_decoder_address_padding() {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&[0xab; 20]);
        let decoder_data = word.to_vec();
        let decoder = Decoder::new(&decoder_data);
        assert_eq!(
            decoder.address(0).unwrap(),
            format!("0x{}", "ab".repeat(20))
        );

        let mut dirty = word;
        dirty[0] = 1;
        let dirty_data = dirty.to_vec();
        assert!(Decoder::new(&dirty_data).address(0).is_err());
    }

    #[test]
    fn test_decoder_string() {
        // offset word -> 0x20, length 5, "hello" padded to a word.
        let mut data = Vec::new();
        data.extend_from_slice(&word_u64(0x20));
        data.extend_from_slice(&word_u64(5));
        let mut text = [0u8; 32];
        text[..5].copy_from_slice(b"hello");
        data.extend_from_slice(&text);

        let decoder = Decoder::new(&data);
        let offset = decoder.offset(0).unwrap();
        assert_eq!(decoder.string_at(offset).unwrap(), "hello");
    }

    #[test]
    fn test_decoder_rejects_oversized_array_length() {
        // Length word claims u64::MAX elements with nothing after it.
        let data = word_u64(u64::MAX).to_vec();
        let decoder = Decoder::new(&data);
        assert!(matches!(decoder.array_len(), Err(AbiError::Decode(_))));

        // Two elements with two offset words is consistent.
        let mut ok = Vec::new();
        ok.extend_from_slice(&word_u64(2));
        ok.extend_from_slice(&word_u64(0x40));
        ok.extend_from_slice(&word_u64(0x80));
        assert_eq!(Decoder::new(&ok).array_len().unwrap(), 2);
    }

    #[test]
    fn test_decoder_rejects_truncated_string() {
        let mut data = Vec::new();
        data.extend_from_slice(&word_u64(100)); // claims 100 bytes
        data.extend_from_slice(b"short");
        assert!(Decoder::new(&data).string_at(0).is_err());
    }
}
