//! Named color lists
//!
//! Spot color palettes as stored in 'ncl2' tags: each entry has a name,
//! a 16-bit PCS value and optional device colorants.

use crate::context::{Context, report};
use crate::error::{Error, Result};
use crate::handle::{Contextual, Duplicable};
use crate::pipeline::MAX_CHANNELS;

/// Longest name an 'ncl2' entry can hold, excluding the terminator
pub const MAX_NAME_LEN: usize = 31;

/// One entry of a [`NamedColorList`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedColor {
    pub name: String,
    /// PCS value in 16-bit ICC encoding
    pub pcs: [u16; 3],
    pub colorants: Vec<u16>,
}

/// Ordered list of named colors sharing a prefix, suffix and colorant count
#[derive(Debug, Clone)]
pub struct NamedColorList {
    colorant_count: usize,
    prefix: String,
    suffix: String,
    colors: Vec<NamedColor>,
    ctx: Option<Context>,
}

fn check_affix(what: &str, value: &str, ctx: Option<&Context>) -> Result<()> {
    if value.len() > MAX_NAME_LEN {
        return Err(report(
            ctx,
            Error::invalid(format!("{} longer than {} bytes", what, MAX_NAME_LEN)),
        ));
    }
    Ok(())
}

impl NamedColorList {
    pub fn new(
        colorant_count: usize,
        prefix: &str,
        suffix: &str,
        ctx: Option<&Context>,
    ) -> Result<Self> {
        if colorant_count > MAX_CHANNELS {
            return Err(report(
                ctx,
                Error::invalid(format!(
                    "named colors carry at most {} colorants, got {}",
                    MAX_CHANNELS, colorant_count
                )),
            ));
        }
        check_affix("prefix", prefix, ctx)?;
        check_affix("suffix", suffix, ctx)?;
        Ok(Self {
            colorant_count,
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            colors: Vec::new(),
            ctx: ctx.cloned(),
        })
    }

    /// Add a color at the end of the list
    pub fn append(&mut self, name: &str, pcs: [u16; 3], colorants: &[u16]) -> Result<()> {
        if colorants.len() != self.colorant_count {
            return Err(report(
                self.ctx.as_ref(),
                Error::invalid(format!(
                    "expected {} colorants for '{}', got {}",
                    self.colorant_count,
                    name,
                    colorants.len()
                )),
            ));
        }
        check_affix("color name", name, self.ctx.as_ref())?;
        self.colors.push(NamedColor {
            name: name.to_string(),
            pcs,
            colorants: colorants.to_vec(),
        });
        Ok(())
    }

    pub fn colorant_count(&self) -> usize {
        self.colorant_count
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&NamedColor> {
        self.colors.get(index)
    }

    /// Index of the first color called `name`, ignoring ASCII case
    pub fn find(&self, name: &str) -> Option<usize> {
        self.colors
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedColor> {
        self.colors.iter()
    }
}

impl PartialEq for NamedColorList {
    fn eq(&self, other: &Self) -> bool {
        self.colorant_count == other.colorant_count
            && self.prefix == other.prefix
            && self.suffix == other.suffix
            && self.colors == other.colors
    }
}

impl Duplicable for NamedColorList {
    fn duplicate(&self) -> Self {
        self.clone()
    }
}

impl Contextual for NamedColorList {
    fn context(&self) -> Option<&Context> {
        self.ctx.as_ref()
    }
}
