//! ICC Color Profile handling
//!
//! A [`Profile`] is a header plus a [`TagStore`]. Profiles are parsed
//! from bytes, synthesized by the constructors in this module, edited tag
//! by tag and saved back to bytes.

mod builtin;

use crate::color::{D50, Xyz};
use crate::context::{Context, report};
use crate::error::{Error, Result};
use crate::handle::{Contextual, Duplicable};
use crate::icc::tags::{self, TagValue, TagValueType};
use crate::icc::types::{DateTimeNumber, WriteBe};
use crate::icc::{
    ColorSpace, IccHeader, ProfileClass, ProfileVersion, RenderingIntent, TagSignature, TagStore,
    TypeSignature,
};
use crate::math::Matrix3x3;

pub use builtin::INK_LIMIT_GRID;

/// Text entries readable through [`Profile::info`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoKind {
    Description,
    Manufacturer,
    Model,
    Copyright,
}

impl InfoKind {
    /// Tag that holds this entry
    pub fn tag(self) -> TagSignature {
        match self {
            Self::Description => TagSignature::PROFILE_DESC,
            Self::Manufacturer => TagSignature::DMND,
            Self::Model => TagSignature::DMDD,
            Self::Copyright => TagSignature::COPYRIGHT,
        }
    }
}

/// Which side of the connection space a table serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableDirection {
    /// Device to PCS (AToB tables)
    Input,
    /// PCS to device (BToA tables)
    Output,
}

impl TableDirection {
    /// The AToBn or BToAn tag for `intent`
    ///
    /// Absolute colorimetric shares the relative table.
    pub fn tag(self, intent: RenderingIntent) -> TagSignature {
        let n = match intent {
            RenderingIntent::Perceptual => 0,
            RenderingIntent::RelativeColorimetric | RenderingIntent::AbsoluteColorimetric => 1,
            RenderingIntent::Saturation => 2,
        };
        match (self, n) {
            (Self::Input, 0) => TagSignature::A2B0,
            (Self::Input, 1) => TagSignature::A2B1,
            (Self::Input, _) => TagSignature::A2B2,
            (Self::Output, 0) => TagSignature::B2A0,
            (Self::Output, 1) => TagSignature::B2A1,
            (Self::Output, _) => TagSignature::B2A2,
        }
    }
}

/// ICC Color Profile
///
/// Clones share tag payloads; editing a clone never changes the original.
/// [`Duplicable::duplicate`] also drops the shared decode caches.
#[derive(Debug, Clone)]
pub struct Profile {
    header: IccHeader,
    tags: TagStore,
    ctx: Option<Context>,
}

impl Profile {
    /// An empty v4.3 profile
    pub fn new(
        device_class: ProfileClass,
        color_space: ColorSpace,
        pcs: ColorSpace,
        ctx: Option<&Context>,
    ) -> Self {
        Self {
            header: IccHeader::new(device_class, color_space, pcs),
            tags: TagStore::new(),
            ctx: ctx.cloned(),
        }
    }

    /// Parse a profile from its serialized bytes
    ///
    /// Bytes past the size recorded in the header are ignored.
    pub fn parse(data: &[u8], ctx: Option<&Context>) -> Result<Self> {
        let header = IccHeader::parse(data).map_err(|e| report(ctx, e.into()))?;
        let end = if header.size == 0 {
            data.len()
        } else {
            header.size as usize
        };
        let tags = TagStore::parse(&data[..end]).map_err(|e| report(ctx, e))?;
        Ok(Self {
            header,
            tags,
            ctx: ctx.cloned(),
        })
    }

    /// Serialize header, tag directory and payloads
    pub fn save(&self) -> Vec<u8> {
        self.tags.serialize(&self.header)
    }

    pub fn header(&self) -> &IccHeader {
        &self.header
    }

    pub fn tags(&self) -> &TagStore {
        &self.tags
    }

    pub fn device_class(&self) -> ProfileClass {
        self.header.device_class
    }

    pub fn set_device_class(&mut self, class: ProfileClass) {
        self.header.device_class = class;
    }

    /// Data color space
    pub fn color_space(&self) -> ColorSpace {
        self.header.color_space
    }

    pub fn set_color_space(&mut self, space: ColorSpace) {
        self.header.color_space = space;
    }

    /// Profile connection space; the output space of a device link
    pub fn connection_space(&self) -> ColorSpace {
        self.header.pcs
    }

    pub fn set_connection_space(&mut self, space: ColorSpace) {
        self.header.pcs = space;
    }

    pub fn version(&self) -> ProfileVersion {
        self.header.version
    }

    /// Set the version recorded in the header
    ///
    /// Tags already stored keep their encoding; later writes use the
    /// encoding of the new version.
    pub fn set_version(&mut self, version: ProfileVersion) {
        self.header.version = version;
    }

    pub fn rendering_intent(&self) -> RenderingIntent {
        self.header.rendering_intent
    }

    pub fn set_rendering_intent(&mut self, intent: RenderingIntent) {
        self.header.rendering_intent = intent;
    }

    pub fn flags(&self) -> u32 {
        self.header.flags
    }

    pub fn set_flags(&mut self, flags: u32) {
        self.header.flags = flags;
    }

    pub fn manufacturer(&self) -> u32 {
        self.header.manufacturer
    }

    pub fn set_manufacturer(&mut self, manufacturer: u32) {
        self.header.manufacturer = manufacturer;
    }

    pub fn model(&self) -> u32 {
        self.header.model
    }

    pub fn set_model(&mut self, model: u32) {
        self.header.model = model;
    }

    pub fn creator(&self) -> u32 {
        self.header.creator
    }

    pub fn set_creator(&mut self, creator: u32) {
        self.header.creator = creator;
    }

    pub fn creation_date(&self) -> DateTimeNumber {
        self.header.creation_date
    }

    pub fn set_creation_date(&mut self, date: DateTimeNumber) {
        self.header.creation_date = date;
    }

    /// PCS illuminant recorded in the header
    pub fn illuminant(&self) -> Xyz {
        self.header.illuminant
    }

    // Tag access

    /// Raw bytes of a tag, type header included
    pub fn tag(&self, sig: TagSignature) -> Option<&[u8]> {
        self.tags.get_raw(sig)
    }

    /// Stored type of a tag
    pub fn tag_type(&self, sig: TagSignature) -> Option<TypeSignature> {
        self.tags.tag_type(sig)
    }

    /// Decoded tag
    ///
    /// `Ok(None)` if the tag is absent or holds a different type,
    /// `Err(CorruptData)` if its payload is malformed.
    pub fn read_tag<T: TagValueType>(&self, sig: TagSignature) -> Result<Option<T>> {
        self.tags.read(sig, self.ctx.as_ref())
    }

    /// Encode and store a tag, replacing any previous value
    pub fn write_tag(&mut self, sig: TagSignature, value: impl Into<TagValue>) -> Result<()> {
        let value = value.into();
        self.tags
            .write(sig, &value, self.header.version)
            .map_err(|e| report(self.ctx.as_ref(), e))
    }

    /// Store a payload of type `type_sig` without interpreting it
    ///
    /// `body` is the data after the 8-byte type header. A null type
    /// signature or a body too large for a tag directory entry is
    /// rejected.
    pub fn write_raw_tag(
        &mut self,
        sig: TagSignature,
        type_sig: TypeSignature,
        body: &[u8],
    ) -> Result<()> {
        let ctx = self.ctx.as_ref();
        if type_sig.to_bytes() == [0; 4] {
            return Err(report(
                ctx,
                Error::invalid(format!("raw tag '{}' needs a type signature", sig)),
            ));
        }
        if u32::try_from(body.len() + 8).is_err() {
            return Err(report(
                ctx,
                Error::invalid(format!("raw tag '{}' of {} bytes is too large", sig, body.len())),
            ));
        }
        let mut bytes = Vec::with_capacity(8 + body.len());
        bytes.put_sig(type_sig);
        bytes.put_u32(0);
        bytes.extend_from_slice(body);
        self.tags.write_raw(sig, bytes).map_err(|e| report(ctx, e))
    }

    /// Remove a tag; links to it keep their own copy of the payload
    pub fn remove_tag(&mut self, sig: TagSignature) -> bool {
        self.tags.remove(sig)
    }

    /// Make `sig` an alias of `dest`'s payload
    pub fn link(&mut self, sig: TagSignature, dest: TagSignature) -> Result<()> {
        self.tags
            .link(sig, dest)
            .map_err(|e| report(self.ctx.as_ref(), e))
    }

    /// The tag `sig` is linked to, if any
    pub fn linked_to(&self, sig: TagSignature) -> Option<TagSignature> {
        self.tags.linked_to(sig)
    }

    pub fn contains(&self, sig: TagSignature) -> bool {
        self.tags.contains(sig)
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    /// Signature at `index` in directory order
    pub fn tag_at(&self, index: usize) -> Option<TagSignature> {
        self.tags.tag_at(index)
    }

    pub fn signatures(&self) -> impl Iterator<Item = TagSignature> + '_ {
        self.tags.signatures()
    }

    // Convenience accessors

    /// Text of a description, manufacturer, model or copyright tag
    pub fn info(&self, kind: InfoKind) -> Option<String> {
        self.read_tag::<String>(kind.tag()).ok().flatten()
    }

    /// Text for a specific locale such as `"de-DE"`
    ///
    /// Falls back to [`info`](Self::info) when the tag is not localized or
    /// has no record for `locale`.
    pub fn info_localized(&self, kind: InfoKind, locale: &str) -> Option<String> {
        let localized = self
            .tag(kind.tag())
            .filter(|_| self.tag_type(kind.tag()) == Some(TypeSignature::MLUC))
            .and_then(|raw| tags::parse_mluc_records(raw).ok())
            .and_then(|records| {
                records
                    .into_iter()
                    .find(|(l, _)| l.eq_ignore_ascii_case(locale))
                    .map(|(_, text)| text)
            });
        localized.or_else(|| self.info(kind))
    }

    /// Media white point, D50 when the profile does not record one
    pub fn media_white_point(&self) -> Xyz {
        self.read_tag::<Xyz>(TagSignature::MEDIA_WHITE)
            .ok()
            .flatten()
            .unwrap_or(D50.xyz)
    }

    /// Media black point tag, if present
    pub fn media_black_point(&self) -> Option<Xyz> {
        self.read_tag::<Xyz>(TagSignature::MEDIA_BLACK).ok().flatten()
    }

    /// The 'chad' matrix adapting the device white to D50
    pub fn chromatic_adaptation(&self) -> Option<Matrix3x3> {
        self.read_tag::<Matrix3x3>(TagSignature::CHAD).ok().flatten()
    }

    /// True for gray profiles with a kTRC and RGB profiles with colorants
    /// and TRCs
    pub fn is_matrix_shaper(&self) -> bool {
        match self.header.color_space {
            ColorSpace::Gray => self.contains(TagSignature::GRAY_TRC),
            ColorSpace::Rgb => [
                TagSignature::RED_COLORANT,
                TagSignature::GREEN_COLORANT,
                TagSignature::BLUE_COLORANT,
                TagSignature::RED_TRC,
                TagSignature::GREEN_TRC,
                TagSignature::BLUE_TRC,
            ]
            .into_iter()
            .all(|sig| self.contains(sig)),
            _ => false,
        }
    }

    /// Whether `intent` has a dedicated table in `direction`
    ///
    /// Matrix-shaper profiles implement every intent. Device links and
    /// abstract profiles only carry AToB tables.
    pub fn is_intent_supported(&self, intent: RenderingIntent, direction: TableDirection) -> bool {
        if self.is_matrix_shaper() {
            return true;
        }
        let direction = match self.header.device_class {
            ProfileClass::DeviceLink | ProfileClass::Abstract => TableDirection::Input,
            _ => direction,
        };
        self.contains(direction.tag(intent))
    }

    pub(crate) fn ctx(&self) -> Option<&Context> {
        self.ctx.as_ref()
    }

    pub(crate) fn invalid(&self, msg: impl Into<String>) -> Error {
        report(self.ctx.as_ref(), Error::invalid(msg))
    }
}

impl PartialEq for Profile {
    /// Equal headers in the fields a transform depends on, and equal tags
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (&self.header, &other.header);
        a.device_class == b.device_class
            && a.color_space == b.color_space
            && a.pcs == b.pcs
            && a.version == b.version
            && a.rendering_intent == b.rendering_intent
            && a.flags == b.flags
            && self.tags == other.tags
    }
}

impl Duplicable for Profile {
    fn duplicate(&self) -> Self {
        Self {
            header: self.header.clone(),
            tags: self.tags.deep_copy(),
            ctx: self.ctx.clone(),
        }
    }
}

impl Contextual for Profile {
    fn context(&self) -> Option<&Context> {
        self.ctx.as_ref()
    }
}
