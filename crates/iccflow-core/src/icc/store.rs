//! Tag directory and payload storage
//!
//! A [`TagStore`] keeps every tag as its raw bytes, type header included,
//! and decodes on first read. Entries that share one payload in the file
//! stay linked after parsing and are written back as shared payloads.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::trace;

use super::error::IccError;
use super::header::{HEADER_SIZE, IccHeader, ProfileVersion};
use super::tags::{self, TagValue, TagValueType};
use super::types::{Reader, TagSignature, TypeSignature, WriteBe};
use crate::context::{Context, report};
use crate::error::{Error, Result};

/// Directory entry size: signature, offset, size
const DIRECTORY_ENTRY: usize = 12;

/// One stored payload and its decoded form
struct TagPayload {
    type_sig: TypeSignature,
    bytes: Vec<u8>,
    decoded: OnceLock<Result<TagValue>>,
}

impl TagPayload {
    fn new(bytes: Vec<u8>) -> Result<Self> {
        let type_sig = tags::type_signature(&bytes)?;
        Ok(Self {
            type_sig,
            bytes,
            decoded: OnceLock::new(),
        })
    }

    fn decode(&self, sig: TagSignature, ctx: Option<&Context>) -> &Result<TagValue> {
        self.decoded.get_or_init(|| {
            let value = tags::decode(&self.bytes, ctx).map_err(|e| report(ctx, e));
            trace!(
                tag = %sig,
                type_sig = %self.type_sig,
                ok = value.is_ok(),
                "decoded tag"
            );
            value
        })
    }
}

impl fmt::Debug for TagPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagPayload")
            .field("type_sig", &self.type_sig)
            .field("len", &self.bytes.len())
            .field("decoded", &self.decoded.get().is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Owned(Arc<TagPayload>),
    /// Shares the payload of another entry, which is always owned
    Linked(TagSignature),
}

#[derive(Debug, Clone)]
struct TagEntry {
    sig: TagSignature,
    slot: Slot,
}

/// Ordered tag directory with lazily decoded payloads
///
/// Clones share payload storage; every mutation swaps in a new payload
/// rather than touching a shared one.
#[derive(Debug, Clone, Default)]
pub struct TagStore {
    entries: Vec<TagEntry>,
}

impl TagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the tag directory that follows the header in `data`
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut r = Reader::at(data, HEADER_SIZE, "tag directory")?;
        let count = r.u32()? as usize;
        let needed = count
            .checked_mul(DIRECTORY_ENTRY)
            .and_then(|n| n.checked_add(HEADER_SIZE + 4))
            .ok_or_else(|| Error::corrupt(format!("tag count {} overflows", count)))?;
        IccError::ensure("tag directory", data, needed)?;

        let mut store = Self::new();
        let mut spans: Vec<(u32, u32, TagSignature)> = Vec::with_capacity(count);
        for _ in 0..count {
            let sig = TagSignature(r.u32()?);
            let offset = r.u32()?;
            let size = r.u32()?;

            let end = (offset as usize).checked_add(size as usize);
            if !matches!(end, Some(end) if end <= data.len()) {
                return Err(IccError::TagOutOfBounds {
                    tag: sig,
                    offset,
                    size,
                    profile_size: data.len(),
                }
                .into());
            }
            if store.contains(sig) {
                return Err(IccError::DuplicateTag(sig).into());
            }

            let shared = spans
                .iter()
                .find(|(o, s, _)| *o == offset && *s == size)
                .map(|(_, _, owner)| *owner);
            let slot = match shared {
                Some(owner) => Slot::Linked(owner),
                None => {
                    let bytes = data[offset as usize..offset as usize + size as usize].to_vec();
                    spans.push((offset, size, sig));
                    Slot::Owned(Arc::new(TagPayload::new(bytes).map_err(|e| {
                        Error::corrupt(format!("tag '{}': {}", sig, e))
                    })?))
                }
            };
            store.entries.push(TagEntry { sig, slot });
        }
        Ok(store)
    }

    fn position(&self, sig: TagSignature) -> Option<usize> {
        self.entries.iter().position(|e| e.sig == sig)
    }

    fn payload(&self, sig: TagSignature) -> Option<&Arc<TagPayload>> {
        let entry = self.entries.iter().find(|e| e.sig == sig)?;
        match &entry.slot {
            Slot::Owned(payload) => Some(payload),
            Slot::Linked(target) => self.payload(*target),
        }
    }

    pub fn contains(&self, sig: TagSignature) -> bool {
        self.position(sig).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Signature of the entry at `index` in directory order
    pub fn tag_at(&self, index: usize) -> Option<TagSignature> {
        self.entries.get(index).map(|e| e.sig)
    }

    pub fn signatures(&self) -> impl Iterator<Item = TagSignature> + '_ {
        self.entries.iter().map(|e| e.sig)
    }

    /// The tag whose payload `sig` shares, if it is a link
    pub fn linked_to(&self, sig: TagSignature) -> Option<TagSignature> {
        match self.entries.iter().find(|e| e.sig == sig)?.slot {
            Slot::Linked(target) => Some(target),
            Slot::Owned(_) => None,
        }
    }

    /// Raw payload bytes, type header included
    pub fn get_raw(&self, sig: TagSignature) -> Option<&[u8]> {
        self.payload(sig).map(|p| p.bytes.as_slice())
    }

    /// Type signature stored in the payload
    pub fn tag_type(&self, sig: TagSignature) -> Option<TypeSignature> {
        self.payload(sig).map(|p| p.type_sig)
    }

    /// Decoded value of `sig`, or None when absent or of another type
    pub fn read<T: TagValueType>(&self, sig: TagSignature, ctx: Option<&Context>) -> Result<Option<T>> {
        let Some(payload) = self.payload(sig) else {
            return Ok(None);
        };
        match payload.decode(sig, ctx) {
            Ok(value) => Ok(T::from_tag_value(value)),
            Err(e) => Err(e.clone()),
        }
    }

    /// Store raw tag bytes, type header included, replacing any entry
    pub fn write_raw(&mut self, sig: TagSignature, bytes: Vec<u8>) -> Result<()> {
        let payload = Arc::new(TagPayload::new(bytes)?);
        match self.position(sig) {
            Some(i) => self.entries[i].slot = Slot::Owned(payload),
            None => self.entries.push(TagEntry {
                sig,
                slot: Slot::Owned(payload),
            }),
        }
        Ok(())
    }

    /// Encode `value` for a profile of `version` and store it
    pub fn write(
        &mut self,
        sig: TagSignature,
        value: &TagValue,
        version: ProfileVersion,
    ) -> Result<()> {
        let bytes = tags::encode(value, sig, version)?;
        self.write_raw(sig, bytes)
    }

    /// Make `sig` share the payload of `dest`
    ///
    /// Links to links resolve to the tag that owns the payload. Tags that
    /// linked to `sig` follow it to the new target.
    pub fn link(&mut self, sig: TagSignature, dest: TagSignature) -> Result<()> {
        let target = match self.entries.iter().find(|e| e.sig == dest) {
            None => return Err(Error::UnknownTag(dest)),
            Some(TagEntry {
                slot: Slot::Linked(target),
                ..
            }) => *target,
            Some(_) => dest,
        };
        if target == sig {
            return Err(Error::invalid(format!("cannot link '{}' to itself", sig)));
        }

        for entry in &mut self.entries {
            if matches!(entry.slot, Slot::Linked(t) if t == sig) {
                entry.slot = Slot::Linked(target);
            }
        }
        match self.position(sig) {
            Some(i) => self.entries[i].slot = Slot::Linked(target),
            None => self.entries.push(TagEntry {
                sig,
                slot: Slot::Linked(target),
            }),
        }
        Ok(())
    }

    /// Drop `sig`, returning whether it was present
    ///
    /// The first tag linked to it takes over the payload and the other
    /// links move to that tag.
    pub fn remove(&mut self, sig: TagSignature) -> bool {
        let Some(i) = self.position(sig) else {
            return false;
        };
        let removed = self.entries.remove(i);
        if let Slot::Owned(payload) = removed.slot {
            let mut heir: Option<TagSignature> = None;
            for entry in &mut self.entries {
                if !matches!(entry.slot, Slot::Linked(t) if t == sig) {
                    continue;
                }
                match heir {
                    None => {
                        entry.slot = Slot::Owned(Arc::clone(&payload));
                        heir = Some(entry.sig);
                    }
                    Some(owner) => entry.slot = Slot::Linked(owner),
                }
            }
        }
        true
    }

    /// Independent copy whose payloads are not shared
    pub fn deep_copy(&self) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|e| TagEntry {
                sig: e.sig,
                slot: match &e.slot {
                    Slot::Owned(p) => Slot::Owned(Arc::new(TagPayload {
                        type_sig: p.type_sig,
                        bytes: p.bytes.clone(),
                        decoded: OnceLock::new(),
                    })),
                    Slot::Linked(t) => Slot::Linked(*t),
                },
            })
            .collect();
        Self { entries }
    }

    /// Lay out header, directory and payloads
    ///
    /// Payloads start on 4-byte boundaries in directory order and linked
    /// entries repeat the offset and size of their target.
    pub fn serialize(&self, header: &IccHeader) -> Vec<u8> {
        let directory_end = HEADER_SIZE + 4 + self.entries.len() * DIRECTORY_ENTRY;
        let mut out = vec![0u8; HEADER_SIZE];
        out.put_u32(self.entries.len() as u32);
        out.resize(directory_end, 0);

        let mut placed: Vec<(TagSignature, u32, u32)> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            if let Slot::Owned(payload) = &entry.slot {
                out.pad4();
                let offset = out.len() as u32;
                out.extend_from_slice(&payload.bytes);
                placed.push((entry.sig, offset, payload.bytes.len() as u32));
            }
        }
        out.pad4();

        let mut directory = Vec::with_capacity(self.entries.len() * DIRECTORY_ENTRY);
        for entry in &self.entries {
            let owner = match entry.slot {
                Slot::Owned(_) => entry.sig,
                Slot::Linked(target) => target,
            };
            let (offset, size) = placed
                .iter()
                .find(|(s, _, _)| *s == owner)
                .map(|(_, o, s)| (*o, *s))
                .unwrap_or((0, 0));
            directory.put_u32(entry.sig.0);
            directory.put_u32(offset);
            directory.put_u32(size);
        }
        out[HEADER_SIZE + 4..directory_end].copy_from_slice(&directory);

        let total = out.len() as u32;
        out[..HEADER_SIZE].copy_from_slice(&header.to_bytes(total));
        out
    }
}

impl PartialEq for TagStore {
    /// Same signatures holding the same bytes, in any order
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .signatures()
                .all(|sig| self.get_raw(sig) == other.get_raw(sig))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Xyz;
    use crate::curve::ToneCurve;
    use crate::error::ErrorKind;
    use crate::icc::header::{ColorSpace, ProfileClass};

    fn header() -> IccHeader {
        IccHeader::new(ProfileClass::Display, ColorSpace::Rgb, ColorSpace::Xyz)
    }

    fn sample_store() -> TagStore {
        let mut store = TagStore::new();
        let curve = TagValue::Curve(ToneCurve::gamma(2.2, None).unwrap());
        store
            .write(TagSignature::RED_TRC, &curve, ProfileVersion::V4_3)
            .unwrap();
        store
            .link(TagSignature::GREEN_TRC, TagSignature::RED_TRC)
            .unwrap();
        store
            .write(
                TagSignature::MEDIA_WHITE,
                &TagValue::Xyz(Xyz::new(0.9642, 1.0, 0.8249)),
                ProfileVersion::V4_3,
            )
            .unwrap();
        store
    }

    #[test]
    fn test_serialize_then_parse() {
        let store = sample_store();
        let bytes = store.serialize(&header());
        assert_eq!(bytes.len() % 4, 0);
        assert_eq!(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize, bytes.len());

        let back = TagStore::parse(&bytes).unwrap();
        assert_eq!(back, store);
        assert_eq!(back.linked_to(TagSignature::GREEN_TRC), Some(TagSignature::RED_TRC));
        let order: Vec<_> = back.signatures().collect();
        assert_eq!(
            order,
            vec![TagSignature::RED_TRC, TagSignature::GREEN_TRC, TagSignature::MEDIA_WHITE]
        );
    }

    #[test]
    fn test_read_absent_and_mismatched() {
        let store = sample_store();
        assert!(store.read::<ToneCurve>(TagSignature::GRAY_TRC, None).unwrap().is_none());
        assert!(store.read::<Xyz>(TagSignature::RED_TRC, None).unwrap().is_none());
        let curve: ToneCurve = store.read(TagSignature::GREEN_TRC, None).unwrap().unwrap();
        assert!((curve.evaluate(0.5) - 0.5_f64.powf(2.2)).abs() < 1e-3);
    }

    #[test]
    fn test_corrupt_payload_is_error() {
        let mut store = TagStore::new();
        store
            .write_raw(TagSignature::MEDIA_WHITE, b"XYZ \0\0\0\0\0\0".to_vec())
            .unwrap();
        let err = store.read::<Xyz>(TagSignature::MEDIA_WHITE, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptData);
        // The cached failure is replayed
        assert!(store.read::<Xyz>(TagSignature::MEDIA_WHITE, None).is_err());
    }

    #[test]
    fn test_link_to_absent_tag() {
        let mut store = TagStore::new();
        let err = store
            .link(TagSignature::GREEN_TRC, TagSignature::RED_TRC)
            .unwrap_err();
        assert_eq!(err, Error::UnknownTag(TagSignature::RED_TRC));
        assert!(store.is_empty());
    }

    #[test]
    fn test_link_chain_resolves() {
        let mut store = sample_store();
        store
            .link(TagSignature::BLUE_TRC, TagSignature::GREEN_TRC)
            .unwrap();
        assert_eq!(store.linked_to(TagSignature::BLUE_TRC), Some(TagSignature::RED_TRC));
        assert!(store.link(TagSignature::RED_TRC, TagSignature::BLUE_TRC).is_err());
    }

    #[test]
    fn test_write_over_link_detaches() {
        let mut store = sample_store();
        let linear = TagValue::Curve(ToneCurve::gamma(1.0, None).unwrap());
        store
            .write(TagSignature::GREEN_TRC, &linear, ProfileVersion::V4_3)
            .unwrap();
        assert_eq!(store.linked_to(TagSignature::GREEN_TRC), None);
        assert_ne!(
            store.get_raw(TagSignature::GREEN_TRC),
            store.get_raw(TagSignature::RED_TRC)
        );
        assert_eq!(store.tag_at(1), Some(TagSignature::GREEN_TRC));
    }

    #[test]
    fn test_remove_hands_payload_to_link() {
        let mut store = sample_store();
        store
            .link(TagSignature::BLUE_TRC, TagSignature::RED_TRC)
            .unwrap();
        let red = store.get_raw(TagSignature::RED_TRC).unwrap().to_vec();

        assert!(store.remove(TagSignature::RED_TRC));
        assert!(!store.remove(TagSignature::RED_TRC));
        assert_eq!(store.get_raw(TagSignature::GREEN_TRC), Some(red.as_slice()));
        assert_eq!(store.linked_to(TagSignature::GREEN_TRC), None);
        assert_eq!(store.linked_to(TagSignature::BLUE_TRC), Some(TagSignature::GREEN_TRC));
    }

    #[test]
    fn test_parse_rejects_out_of_bounds() {
        let mut bytes = sample_store().serialize(&header());
        // Point the first entry past the end
        let len = bytes.len() as u32;
        bytes[136..140].copy_from_slice(&len.to_be_bytes());
        let err = TagStore::parse(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptData);
    }

    #[test]
    fn test_parse_rejects_duplicate() {
        let mut bytes = sample_store().serialize(&header());
        bytes[144..148].copy_from_slice(&TagSignature::RED_TRC.to_bytes());
        assert!(TagStore::parse(&bytes).is_err());
    }

    #[test]
    fn test_truncated_directory() {
        let mut bytes = vec![0u8; HEADER_SIZE];
        bytes.put_u32(5);
        assert!(TagStore::parse(&bytes).is_err());
    }
}
