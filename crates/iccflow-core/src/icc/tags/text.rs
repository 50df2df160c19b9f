//! Text Tag Types
//!
//! ICC profiles can contain text in several formats:
//! - text: Simple ASCII text
//! - desc: Profile description (v2 format)
//! - mluc: Multi-localized Unicode (v4 format)
//!
//! Every decoder receives the whole tag, type header included, because
//! mluc string offsets are relative to the tag start.
//!
//! See ICC.1:2022 Sections 10.24 (text), 10.14 (desc), 10.15 (mluc)

use crate::icc::error::IccError;
use crate::icc::types::{Reader, TypeSignature, WriteBe};

/// Parse 'text' type (null-terminated ASCII)
pub fn parse_text(data: &[u8]) -> Result<String, IccError> {
    IccError::ensure("text", data, 8)?;
    Ok(ascii_until_nul(&data[8..]))
}

/// Parse 'desc' type (v2 profile description)
///
/// Only the ASCII part is read; the Unicode and ScriptCode parts are
/// unreliable in real profiles.
pub fn parse_desc(data: &[u8]) -> Result<String, IccError> {
    let mut r = Reader::at(data, 8, "desc")?;
    let ascii_count = r.u32()? as usize;
    let ascii = r.bytes(ascii_count)?;
    Ok(ascii_until_nul(ascii))
}

/// Parse 'mluc' type, returning `(locale, text)` records in stored order
pub fn parse_mluc_records(data: &[u8]) -> Result<Vec<(String, String)>, IccError> {
    let mut r = Reader::at(data, 8, "mluc")?;
    let record_count = r.u32()? as usize;
    let record_size = r.u32()? as usize;
    if record_size < 12 {
        return Err(IccError::CorruptedData(format!(
            "mluc record size {} too small",
            record_size
        )));
    }

    let mut records = Vec::with_capacity(record_count.min(64));
    for i in 0..record_count {
        let mut rec = Reader::at(data, 16 + i * record_size, "mluc record")?;
        let code = rec.bytes(4)?;
        let locale = format!(
            "{}{}-{}{}",
            code[0] as char, code[1] as char, code[2] as char, code[3] as char
        );
        let len = rec.u32()? as usize;
        let offset = rec.u32()? as usize;

        let mut s = Reader::at(data, offset, "mluc string")?;
        let utf16 = s.bytes(len)?;
        let text = decode_utf16be(utf16).ok_or_else(|| {
            IccError::CorruptedData(format!("mluc string for {} is not UTF-16", locale))
        })?;
        records.push((locale, text));
    }
    Ok(records)
}

/// Parse 'mluc' type, preferring the en-US record
pub fn parse_mluc(data: &[u8]) -> Result<String, IccError> {
    let records = parse_mluc_records(data)?;
    let text = records
        .iter()
        .find(|(locale, _)| locale == "en-US")
        .or_else(|| records.first())
        .map(|(_, text)| text.clone())
        .unwrap_or_default();
    Ok(text)
}

/// Write 'text' type
pub fn write_text(text: &str) -> Vec<u8> {
    let mut out = type_header(TypeSignature::TEXT);
    out.extend(text.chars().map(ascii_byte));
    out.put_u8(0);
    out
}

/// Write 'desc' type with empty Unicode and ScriptCode parts
pub fn write_desc(text: &str) -> Vec<u8> {
    let mut out = type_header(TypeSignature::DESC);
    out.put_u32(text.chars().count() as u32 + 1);
    out.extend(text.chars().map(ascii_byte));
    out.put_u8(0);
    // Unicode language code and count
    out.put_u32(0);
    out.put_u32(0);
    // ScriptCode code, count and its fixed 67-byte field
    out.put_u16(0);
    out.put_u8(0);
    out.extend_from_slice(&[0u8; 67]);
    out
}

/// Write 'mluc' type with a single en-US record
pub fn write_mluc(text: &str) -> Vec<u8> {
    let utf16: Vec<u16> = text.encode_utf16().collect();
    let mut out = type_header(TypeSignature::MLUC);
    out.put_u32(1);
    out.put_u32(12);
    out.extend_from_slice(b"enUS");
    out.put_u32(utf16.len() as u32 * 2);
    out.put_u32(28);
    for unit in utf16 {
        out.put_u16(unit);
    }
    out
}

pub(crate) fn type_header(sig: TypeSignature) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    out.put_sig(sig);
    out.put_u32(0);
    out
}

fn ascii_until_nul(data: &[u8]) -> String {
    data.iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as char)
        .collect()
}

fn ascii_byte(c: char) -> u8 {
    if c.is_ascii() { c as u8 } else { b'?' }
}

/// Decode UTF-16BE bytes to String
fn decode_utf16be(data: &[u8]) -> Option<String> {
    if data.len() % 2 != 0 {
        return None;
    }

    let utf16: Vec<u16> = data
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .take_while(|&c| c != 0)
        .collect();

    String::from_utf16(&utf16).ok()
}
