//! Named Color 2 Tag Type
//!
//! Layout after the 8-byte type header:
//! vendor flags, color count, device coordinate count, 32-byte prefix,
//! 32-byte suffix, then per color a 32-byte name, 3 PCS words and the
//! device coordinates.
//!
//! See ICC.1:2022 Section 10.17

use crate::context::Context;
use crate::error::{Error, Result};
use crate::icc::types::{Reader, TypeSignature, WriteBe};
use crate::named_color::NamedColorList;

use super::text::type_header;

const NAME_FIELD: usize = 32;

fn fixed_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as char)
        .collect()
}

fn put_fixed_string(out: &mut Vec<u8>, s: &str) {
    let mut field = [0u8; NAME_FIELD];
    for (slot, b) in field.iter_mut().zip(s.bytes().take(NAME_FIELD - 1)) {
        *slot = b;
    }
    out.extend_from_slice(&field);
}

/// Parse 'ncl2'
pub fn parse_ncl2(data: &[u8], ctx: Option<&Context>) -> Result<NamedColorList> {
    let mut r = Reader::at(data, 8, "ncl2")?;
    let _vendor_flags = r.u32()?;
    let count = r.u32()? as usize;
    let coords = r.u32()? as usize;
    let prefix = fixed_string(r.bytes(NAME_FIELD)?);
    let suffix = fixed_string(r.bytes(NAME_FIELD)?);

    let entry_size = NAME_FIELD + 6 + coords * 2;
    if count.saturating_mul(entry_size) > r.remaining() {
        return Err(Error::corrupt(format!(
            "ncl2 declares {} colors but holds {} bytes",
            count,
            r.remaining()
        )));
    }

    let mut list = NamedColorList::new(coords, &prefix, &suffix, ctx)
        .map_err(|e| Error::corrupt(e.to_string()))?;
    let mut colorants = vec![0u16; coords];
    for _ in 0..count {
        let name = fixed_string(r.bytes(NAME_FIELD)?);
        let pcs = [r.u16()?, r.u16()?, r.u16()?];
        for c in colorants.iter_mut() {
            *c = r.u16()?;
        }
        list.append(&name, pcs, &colorants)
            .map_err(|e| Error::corrupt(e.to_string()))?;
    }
    Ok(list)
}

/// Write 'ncl2'
pub fn write_ncl2(list: &NamedColorList) -> Vec<u8> {
    let mut out = type_header(TypeSignature::NAMED_COLOR2);
    out.put_u32(0);
    out.put_u32(list.len() as u32);
    out.put_u32(list.colorant_count() as u32);
    put_fixed_string(&mut out, list.prefix());
    put_fixed_string(&mut out, list.suffix());
    for color in list.iter() {
        put_fixed_string(&mut out, &color.name);
        for v in color.pcs {
            out.put_u16(v);
        }
        for &v in &color.colorants {
            out.put_u16(v);
        }
    }
    out
}
