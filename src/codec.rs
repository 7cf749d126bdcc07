//! Text codecs: streaming conversion between byte buffers and UTF-16 code
//! unit strings.
//!
//! Converters are stateful so a multi-byte sequence split across buffer
//! boundaries resumes on the next call. The registry is keyed by
//! case-sensitive name; a process-wide default registry holds the built-in
//! UTF-8 codec and is never mutated after initialization.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::error::{DebugInfo, ErrorInfo};

pub trait TextConverter {
    /// Decodes `buffer` into UTF-16 code units appended to `output`. A
    /// truncated trailing sequence is stashed internally and resumed by the
    /// next call.
    fn decode(&mut self, buffer: &[u8], output: &mut Vec<u16>) -> Result<(), ErrorInfo>;

    /// Encodes UTF-16 code units into bytes appended to `output`.
    fn encode(&mut self, buffer: &[u16], output: &mut Vec<u8>) -> Result<(), ErrorInfo>;

    /// Drops any stashed partial sequence.
    fn reset(&mut self);
}

/// A factory of converters for one encoding.
pub trait TextCodec: Send + Sync {
    fn create_converter(&self) -> Box<dyn TextConverter>;
}

#[derive(Default, Clone)]
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn TextCodec>>,
}

impl CodecRegistry {
    pub fn new() -> CodecRegistry {
        CodecRegistry::default()
    }

    /// A registry with the built-in codecs registered under their usual
    /// spelling variants.
    pub fn with_defaults() -> CodecRegistry {
        let mut registry = CodecRegistry::new();
        let utf8: Arc<dyn TextCodec> = Arc::new(Utf8Codec);
        for name in ["utf8", "utf-8", "UTF8", "UTF-8"] {
            registry.add(name, Arc::clone(&utf8));
        }
        registry
    }

    pub fn add(&mut self, name: impl Into<String>, codec: Arc<dyn TextCodec>) {
        self.codecs.insert(name.into(), codec);
    }

    /// Case-sensitive lookup.
    pub fn get(&self, name: &str) -> Option<Arc<dyn TextCodec>> {
        self.codecs.get(name).cloned()
    }

    pub fn get_default(&self) -> Option<Arc<dyn TextCodec>> {
        self.get("utf8")
    }
}

/// The process-wide default registry.
pub fn default_registry() -> &'static CodecRegistry {
    static REGISTRY: OnceLock<CodecRegistry> = OnceLock::new();
    REGISTRY.get_or_init(CodecRegistry::with_defaults)
}

struct Utf8Codec;

impl TextCodec for Utf8Codec {
    fn create_converter(&self) -> Box<dyn TextConverter> {
        Box::new(Utf8Converter::default())
    }
}

#[derive(Default)]
struct Utf8Converter {
    /// Holds a partial sequence from the end of the previous buffer.
    stash: [u8; 4],
    stash_len: usize,
}

fn sequence_length(head: u8) -> Option<usize> {
    if head & 0x80 == 0 {
        Some(1)
    } else if head & 0xe0 == 0xc0 {
        Some(2)
    } else if head & 0xf0 == 0xe0 {
        Some(3)
    } else if head & 0xf8 == 0xf0 {
        Some(4)
    } else {
        None
    }
}

fn invalid_sequence(offset: usize) -> ErrorInfo {
    ErrorInfo::custom(DebugInfo::default(), "Invalid UTF-8 byte sequence")
        .at_offset(offset as u64)
}

impl TextConverter for Utf8Converter {
    fn decode(&mut self, buffer: &[u8], output: &mut Vec<u16>) -> Result<(), ErrorInfo> {
        let mut offset = 0;
        while self.stash_len > 0 || offset < buffer.len() {
            let head = if self.stash_len > 0 {
                self.stash[0]
            } else {
                buffer[offset]
            };
            let Some(length) = sequence_length(head) else {
                return Err(invalid_sequence(offset));
            };

            // Not enough input for the whole sequence: stash and stop.
            if length > buffer.len() - offset + self.stash_len {
                let tail = buffer.len() - offset;
                self.stash[self.stash_len..self.stash_len + tail]
                    .copy_from_slice(&buffer[offset..]);
                self.stash_len += tail;
                break;
            }

            // Strip the leading length bits of the first byte.
            let mut code_point = u32::from(head) & ((1u32 << (8 - length as u32)) - 1);
            for i in 1..length {
                let byte = if i < self.stash_len {
                    self.stash[i]
                } else {
                    buffer[i - self.stash_len + offset]
                };
                if byte & 0xc0 != 0x80 {
                    return Err(invalid_sequence(offset + i));
                }
                code_point = (code_point << 6) | u32::from(byte & 0x3f);
            }

            if code_point <= 0xffff {
                // BMP code points map to one unit; an encoded surrogate
                // passes through as-is.
                output.push(code_point as u16);
            } else {
                let above = code_point - 0x10000;
                output.push(0xd800 | (above >> 10) as u16);
                output.push(0xdc00 | (above & 0x3ff) as u16);
            }

            offset += length - self.stash_len;
            self.stash_len = 0;
        }
        Ok(())
    }

    fn encode(&mut self, buffer: &[u16], output: &mut Vec<u8>) -> Result<(), ErrorInfo> {
        let mut i = 0;
        while i < buffer.len() {
            let unit = buffer[i];
            let code_point = if (0xd800..=0xdbff).contains(&unit)
                && i + 1 < buffer.len()
                && (0xdc00..=0xdfff).contains(&buffer[i + 1])
            {
                let hi = u32::from(unit & 0x3ff);
                let lo = u32::from(buffer[i + 1] & 0x3ff);
                i += 1;
                0x10000 + (hi << 10) + lo
            } else {
                // An unpaired surrogate encodes literally as 3 bytes.
                u32::from(unit)
            };
            i += 1;

            if code_point < 0x80 {
                output.push(code_point as u8);
            } else if code_point < 0x800 {
                output.push(0xc0 | (code_point >> 6) as u8);
                output.push(0x80 | (code_point & 0x3f) as u8);
            } else if code_point < 0x10000 {
                output.push(0xe0 | (code_point >> 12) as u8);
                output.push(0x80 | ((code_point >> 6) & 0x3f) as u8);
                output.push(0x80 | (code_point & 0x3f) as u8);
            } else {
                output.push(0xf0 | (code_point >> 18) as u8);
                output.push(0x80 | ((code_point >> 12) & 0x3f) as u8);
                output.push(0x80 | ((code_point >> 6) & 0x3f) as u8);
                output.push(0x80 | (code_point & 0x3f) as u8);
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.stash_len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(converter: &mut dyn TextConverter, bytes: &[u8]) -> Vec<u16> {
        let mut out = Vec::new();
        converter.decode(bytes, &mut out).expect("decode");
        out
    }

    fn utf8() -> Box<dyn TextConverter> {
        default_registry()
            .get_default()
            .expect("utf8 registered")
            .create_converter()
    }

    #[test]
    fn registry_aliases() {
        let registry = default_registry();
        for name in ["utf8", "utf-8", "UTF8", "UTF-8"] {
            assert!(registry.get(name).is_some(), "missing {name}");
        }
        assert!(registry.get("Utf8").is_none());
        assert!(registry.get("latin1").is_none());
    }

    #[test]
    fn decode_ascii_and_bmp() {
        let mut converter = utf8();
        assert_eq!(decode_all(converter.as_mut(), b"ab"), vec![0x61, 0x62]);
        // U+00E9 (two bytes), U+20AC (three bytes).
        assert_eq!(
            decode_all(converter.as_mut(), "\u{e9}\u{20ac}".as_bytes()),
            vec![0xe9, 0x20ac]
        );
        // U+FFFF is still a single unit.
        assert_eq!(
            decode_all(converter.as_mut(), "\u{ffff}".as_bytes()),
            vec![0xffff]
        );
    }

    #[test]
    fn decode_supplementary_to_surrogate_pair() {
        let mut converter = utf8();
        assert_eq!(
            decode_all(converter.as_mut(), "\u{10437}".as_bytes()),
            vec![0xd801, 0xdc37]
        );
    }

    #[test]
    fn decode_resumes_truncated_sequence() {
        let mut converter = utf8();
        let bytes = "\u{20ac}".as_bytes(); // e2 82 ac
        let mut out = Vec::new();
        converter.decode(&bytes[..1], &mut out).expect("first half");
        assert!(out.is_empty());
        converter.decode(&bytes[1..], &mut out).expect("second half");
        assert_eq!(out, vec![0x20ac]);
    }

    #[test]
    fn reset_drops_the_stash() {
        let mut converter = utf8();
        let mut out = Vec::new();
        converter.decode(&[0xe2], &mut out).expect("partial");
        converter.reset();
        converter.decode(b"a", &mut out).expect("fresh");
        assert_eq!(out, vec![0x61]);
    }

    #[test]
    fn decode_rejects_invalid_bytes() {
        let mut converter = utf8();
        let mut out = Vec::new();
        assert!(converter.decode(&[0xff], &mut out).is_err());

        let mut converter = utf8();
        // Lead byte promising a continuation that isn't one.
        assert!(converter.decode(&[0xc2, 0x20], &mut out).is_err());
    }

    #[test]
    fn encode_inverts_decode() {
        let text = "a\u{e9}\u{20ac}\u{10437}";
        let mut converter = utf8();
        let units = decode_all(converter.as_mut(), text.as_bytes());
        let mut bytes = Vec::new();
        converter.encode(&units, &mut bytes).expect("encode");
        assert_eq!(bytes, text.as_bytes());
    }

    #[test]
    fn encode_unpaired_surrogate_is_three_bytes() {
        let mut converter = utf8();
        let mut bytes = Vec::new();
        converter.encode(&[0xd800], &mut bytes).expect("encode");
        assert_eq!(bytes, vec![0xed, 0xa0, 0x80]);

        // And an encoded surrogate decodes back to the same unit.
        let mut converter = utf8();
        assert_eq!(decode_all(converter.as_mut(), &[0xed, 0xa0, 0x80]), vec![0xd800]);
    }

    #[test]
    fn surrogate_pair_combines_with_offset() {
        // d801 dc37 -> 0x10000 + (1 << 10) + 0x37 = U+10437.
        let mut converter = utf8();
        let mut bytes = Vec::new();
        converter.encode(&[0xd801, 0xdc37], &mut bytes).expect("encode");
        assert_eq!(bytes, "\u{10437}".as_bytes());
    }
}
