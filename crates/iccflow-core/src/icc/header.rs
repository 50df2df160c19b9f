//! ICC Profile Header
//!
//! The ICC profile header is exactly 128 bytes and contains basic profile information.
//! See ICC.1:2022 Section 7.2.

use super::error::IccError;
use super::types::{DateTimeNumber, XyzNumber};
use crate::color::{D50, Xyz};

/// Profile file signature - must be 'acsp' (0x61637370)
pub const PROFILE_SIGNATURE: u32 = 0x61637370;

/// Size of the fixed header
pub const HEADER_SIZE: usize = 128;

/// ICC Profile Header (128 bytes)
#[derive(Debug, Clone, PartialEq)]
pub struct IccHeader {
    /// Profile size in bytes, as read; recomputed on save
    pub size: u32,
    /// Preferred CMM type signature
    pub cmm_type: u32,
    /// Profile version (major.minor.patch)
    pub version: ProfileVersion,
    /// Device class (display, input, output, etc.)
    pub device_class: ProfileClass,
    /// Color space of data (RGB, CMYK, etc.)
    pub color_space: ColorSpace,
    /// Profile connection space (XYZ or Lab); output space for device links
    pub pcs: ColorSpace,
    /// Date and time profile was created
    pub creation_date: DateTimeNumber,
    /// Primary platform signature
    pub platform: u32,
    /// Profile flags
    pub flags: u32,
    /// Device manufacturer signature
    pub manufacturer: u32,
    /// Device model signature
    pub model: u32,
    /// Device attributes
    pub attributes: u64,
    /// Default rendering intent
    pub rendering_intent: RenderingIntent,
    /// PCS illuminant (D50 for every conforming profile)
    pub illuminant: Xyz,
    /// Profile creator signature
    pub creator: u32,
    /// Profile ID (MD5 hash, or zero)
    pub profile_id: [u8; 16],
}

impl IccHeader {
    /// A v4.3 header with the given class and spaces
    pub fn new(device_class: ProfileClass, color_space: ColorSpace, pcs: ColorSpace) -> Self {
        Self {
            size: 0,
            cmm_type: 0,
            version: ProfileVersion::V4_3,
            device_class,
            color_space,
            pcs,
            creation_date: DateTimeNumber::default(),
            platform: 0,
            flags: 0,
            manufacturer: 0,
            model: 0,
            attributes: 0,
            rendering_intent: RenderingIntent::Perceptual,
            illuminant: D50.xyz,
            creator: 0,
            profile_id: [0; 16],
        }
    }

    /// Parse header from bytes
    pub fn parse(data: &[u8]) -> Result<Self, IccError> {
        if data.len() < HEADER_SIZE {
            return Err(IccError::TooSmall {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }

        let be32 = |at: usize| u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);

        let signature = be32(36);
        if signature != PROFILE_SIGNATURE {
            return Err(IccError::InvalidSignature(signature));
        }

        let size = be32(0);
        if size as usize > data.len() {
            return Err(IccError::SizeMismatch {
                header_size: size,
                actual_size: data.len(),
            });
        }

        let version = ProfileVersion {
            major: data[8],
            minor: data[9] >> 4,
            patch: data[9] & 0x0F,
        };

        let mut profile_id = [0u8; 16];
        profile_id.copy_from_slice(&data[84..100]);

        Ok(Self {
            size,
            cmm_type: be32(4),
            version,
            device_class: ProfileClass::from_u32(be32(12))?,
            color_space: ColorSpace::from_u32(be32(16))?,
            pcs: ColorSpace::from_u32(be32(20))?,
            creation_date: DateTimeNumber::from_bytes(&data[24..36]).unwrap_or_default(),
            platform: be32(40),
            flags: be32(44),
            manufacturer: be32(48),
            model: be32(52),
            attributes: u64::from_be_bytes([
                data[56], data[57], data[58], data[59], data[60], data[61], data[62], data[63],
            ]),
            rendering_intent: RenderingIntent::from_u32(be32(64))?,
            illuminant: XyzNumber::from_bytes(&data[68..80])
                .map(|n| n.to_xyz())
                .unwrap_or(D50.xyz),
            creator: be32(80),
            profile_id,
        })
    }

    /// Encode the header for a profile of `total_size` bytes
    ///
    /// The profile ID is written as zero since payloads may have changed.
    pub fn to_bytes(&self, total_size: u32) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        let mut put32 = |at: usize, v: u32| out[at..at + 4].copy_from_slice(&v.to_be_bytes());

        put32(0, total_size);
        put32(4, self.cmm_type);
        put32(12, self.device_class.to_u32());
        put32(16, self.color_space.to_u32());
        put32(20, self.pcs.to_u32());
        put32(36, PROFILE_SIGNATURE);
        put32(40, self.platform);
        put32(44, self.flags);
        put32(48, self.manufacturer);
        put32(52, self.model);
        put32(64, self.rendering_intent.to_u32());
        put32(80, self.creator);

        out[8] = self.version.major;
        out[9] = (self.version.minor << 4) | (self.version.patch & 0x0F);
        out[24..36].copy_from_slice(&self.creation_date.to_bytes());
        out[56..64].copy_from_slice(&self.attributes.to_be_bytes());
        out[68..80].copy_from_slice(&XyzNumber::from_xyz(self.illuminant).to_bytes());
        out
    }
}

/// ICC Profile Version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ProfileVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl ProfileVersion {
    pub const V2_1: Self = Self {
        major: 2,
        minor: 1,
        patch: 0,
    };

    pub const V4_3: Self = Self {
        major: 4,
        minor: 3,
        patch: 0,
    };

    /// Build from a decimal version such as `4.3` or `2.1`
    pub fn from_f64(version: f64) -> Self {
        let major = version.trunc().clamp(0.0, 255.0) as u8;
        let rest = ((version - version.trunc()) * 100.0).round() as u32;
        Self {
            major,
            minor: ((rest / 10) & 0x0F) as u8,
            patch: ((rest % 10) & 0x0F) as u8,
        }
    }

    pub fn to_f64(self) -> f64 {
        self.major as f64 + self.minor as f64 / 10.0 + self.patch as f64 / 100.0
    }

    /// Check if version is at least the specified version
    pub fn at_least(&self, major: u8, minor: u8) -> bool {
        self.major > major || (self.major == major && self.minor >= minor)
    }

    pub fn is_v4(&self) -> bool {
        self.major >= 4
    }

    pub fn is_v2(&self) -> bool {
        self.major == 2
    }
}

/// ICC Profile Class (Device Class)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileClass {
    /// Input device (scanner, camera)
    Input,
    /// Display device (monitor)
    Display,
    /// Output device (printer)
    Output,
    /// Device link
    DeviceLink,
    /// Color space conversion
    ColorSpace,
    /// Abstract profile
    Abstract,
    /// Named color profile
    NamedColor,
}

impl ProfileClass {
    pub fn from_u32(val: u32) -> Result<Self, IccError> {
        match &val.to_be_bytes() {
            b"scnr" => Ok(Self::Input),
            b"mntr" => Ok(Self::Display),
            b"prtr" => Ok(Self::Output),
            b"link" => Ok(Self::DeviceLink),
            b"spac" => Ok(Self::ColorSpace),
            b"abst" => Ok(Self::Abstract),
            b"nmcl" => Ok(Self::NamedColor),
            _ => Err(IccError::InvalidProfileClass(val)),
        }
    }

    pub fn to_u32(&self) -> u32 {
        match self {
            Self::Input => u32::from_be_bytes(*b"scnr"),
            Self::Display => u32::from_be_bytes(*b"mntr"),
            Self::Output => u32::from_be_bytes(*b"prtr"),
            Self::DeviceLink => u32::from_be_bytes(*b"link"),
            Self::ColorSpace => u32::from_be_bytes(*b"spac"),
            Self::Abstract => u32::from_be_bytes(*b"abst"),
            Self::NamedColor => u32::from_be_bytes(*b"nmcl"),
        }
    }
}

/// ICC Color Space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    Xyz,
    Lab,
    Luv,
    YCbCr,
    Yxy,
    Rgb,
    Gray,
    Hsv,
    Hls,
    Cmyk,
    Cmy,
    /// Generic N-color spaces, 2 through 15 channels
    Color2,
    Color3,
    Color4,
    Color5,
    Color6,
    Color7,
    Color8,
    Color9,
    Color10,
    Color11,
    Color12,
    Color13,
    Color14,
    Color15,
}

const SPACE_CODES: [(ColorSpace, &[u8; 4]); 25] = [
    (ColorSpace::Xyz, b"XYZ "),
    (ColorSpace::Lab, b"Lab "),
    (ColorSpace::Luv, b"Luv "),
    (ColorSpace::YCbCr, b"YCbr"),
    (ColorSpace::Yxy, b"Yxy "),
    (ColorSpace::Rgb, b"RGB "),
    (ColorSpace::Gray, b"GRAY"),
    (ColorSpace::Hsv, b"HSV "),
    (ColorSpace::Hls, b"HLS "),
    (ColorSpace::Cmyk, b"CMYK"),
    (ColorSpace::Cmy, b"CMY "),
    (ColorSpace::Color2, b"2CLR"),
    (ColorSpace::Color3, b"3CLR"),
    (ColorSpace::Color4, b"4CLR"),
    (ColorSpace::Color5, b"5CLR"),
    (ColorSpace::Color6, b"6CLR"),
    (ColorSpace::Color7, b"7CLR"),
    (ColorSpace::Color8, b"8CLR"),
    (ColorSpace::Color9, b"9CLR"),
    (ColorSpace::Color10, b"ACLR"),
    (ColorSpace::Color11, b"BCLR"),
    (ColorSpace::Color12, b"CCLR"),
    (ColorSpace::Color13, b"DCLR"),
    (ColorSpace::Color14, b"ECLR"),
    (ColorSpace::Color15, b"FCLR"),
];

impl ColorSpace {
    pub fn from_u32(val: u32) -> Result<Self, IccError> {
        let bytes = val.to_be_bytes();
        SPACE_CODES
            .iter()
            .find(|(_, code)| **code == bytes)
            .map(|(space, _)| *space)
            .ok_or(IccError::InvalidColorSpace(val))
    }

    pub fn to_u32(&self) -> u32 {
        SPACE_CODES
            .iter()
            .find(|(space, _)| space == self)
            .map(|(_, code)| u32::from_be_bytes(**code))
            .unwrap_or(0)
    }

    /// Get number of channels for this color space
    pub fn channels(&self) -> usize {
        match self {
            Self::Gray => 1,
            Self::Color2 => 2,
            Self::Xyz
            | Self::Lab
            | Self::Luv
            | Self::YCbCr
            | Self::Yxy
            | Self::Rgb
            | Self::Hsv
            | Self::Hls
            | Self::Cmy
            | Self::Color3 => 3,
            Self::Cmyk | Self::Color4 => 4,
            Self::Color5 => 5,
            Self::Color6 => 6,
            Self::Color7 => 7,
            Self::Color8 => 8,
            Self::Color9 => 9,
            Self::Color10 => 10,
            Self::Color11 => 11,
            Self::Color12 => 12,
            Self::Color13 => 13,
            Self::Color14 => 14,
            Self::Color15 => 15,
        }
    }

    /// XYZ or Lab
    pub fn is_pcs(&self) -> bool {
        matches!(self, Self::Xyz | Self::Lab)
    }
}

/// ICC Rendering Intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderingIntent {
    /// Perceptual - best for photographs
    #[default]
    Perceptual,
    /// Relative colorimetric - preserves in-gamut colors
    RelativeColorimetric,
    /// Saturation - maintains saturation
    Saturation,
    /// Absolute colorimetric - preserves white point
    AbsoluteColorimetric,
}

impl RenderingIntent {
    pub fn from_u32(val: u32) -> Result<Self, IccError> {
        match val {
            0 => Ok(Self::Perceptual),
            1 => Ok(Self::RelativeColorimetric),
            2 => Ok(Self::Saturation),
            3 => Ok(Self::AbsoluteColorimetric),
            _ => Err(IccError::InvalidRenderingIntent(val)),
        }
    }

    pub fn to_u32(&self) -> u32 {
        match self {
            Self::Perceptual => 0,
            Self::RelativeColorimetric => 1,
            Self::Saturation => 2,
            Self::AbsoluteColorimetric => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_space_channels() {
        assert_eq!(ColorSpace::Gray.channels(), 1);
        assert_eq!(ColorSpace::Rgb.channels(), 3);
        assert_eq!(ColorSpace::Cmyk.channels(), 4);
        assert_eq!(ColorSpace::Color15.channels(), 15);
    }

    #[test]
    fn test_color_space_codes() {
        for (space, code) in SPACE_CODES {
            let val = u32::from_be_bytes(*code);
            assert_eq!(ColorSpace::from_u32(val).unwrap(), space);
            assert_eq!(space.to_u32(), val);
        }
        assert!(ColorSpace::from_u32(0).is_err());
    }

    #[test]
    fn test_profile_class_roundtrip() {
        for class in [
            ProfileClass::Input,
            ProfileClass::Display,
            ProfileClass::Output,
            ProfileClass::DeviceLink,
            ProfileClass::Abstract,
            ProfileClass::NamedColor,
        ] {
            let val = class.to_u32();
            let back = ProfileClass::from_u32(val).unwrap();
            assert_eq!(class, back);
        }
    }

    #[test]
    fn test_rendering_intent() {
        for i in 0..4 {
            let intent = RenderingIntent::from_u32(i).unwrap();
            assert_eq!(intent.to_u32(), i);
        }
        assert!(RenderingIntent::from_u32(4).is_err());
    }

    #[test]
    fn test_profile_version() {
        let v2 = ProfileVersion::from_f64(2.4);
        assert_eq!(
            v2,
            ProfileVersion {
                major: 2,
                minor: 4,
                patch: 0
            }
        );
        assert!(v2.is_v2());
        assert!(v2.at_least(2, 4));
        assert!(!v2.at_least(2, 5));

        let v4 = ProfileVersion::from_f64(4.3);
        assert_eq!(v4, ProfileVersion::V4_3);
        assert!((v4.to_f64() - 4.3).abs() < 1e-9);
    }

    #[test]
    fn test_header_roundtrip() {
        let mut header = IccHeader::new(ProfileClass::Output, ColorSpace::Cmyk, ColorSpace::Lab);
        header.rendering_intent = RenderingIntent::Saturation;
        header.manufacturer = u32::from_be_bytes(*b"APPL");

        let bytes = header.to_bytes(128);
        let parsed = IccHeader::parse(&bytes).unwrap();

        assert_eq!(parsed.size, 128);
        assert_eq!(parsed.device_class, ProfileClass::Output);
        assert_eq!(parsed.color_space, ColorSpace::Cmyk);
        assert_eq!(parsed.pcs, ColorSpace::Lab);
        assert_eq!(parsed.rendering_intent, RenderingIntent::Saturation);
        assert_eq!(parsed.version, ProfileVersion::V4_3);
        assert_eq!(parsed.manufacturer, header.manufacturer);
        assert!((parsed.illuminant.x - D50.xyz.x).abs() < 1e-4);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let header = IccHeader::new(ProfileClass::Display, ColorSpace::Rgb, ColorSpace::Xyz);
        let mut bytes = header.to_bytes(128);
        bytes[36] = b'x';
        assert!(matches!(
            IccHeader::parse(&bytes),
            Err(IccError::InvalidSignature(_))
        ));
        assert!(matches!(
            IccHeader::parse(&bytes[..64]),
            Err(IccError::TooSmall { .. })
        ));
    }
}
