/*!
 * Request Resolver
 * Picks the effective requested mode out of an image's attribute channels
 */

use super::flags::FlagSet;
use crate::config::ControlChannels;
use crate::core::errors::PolicyError;
use crate::core::types::RawFlags;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Executable image being activated, with its raw attribute-carried flags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageParams {
    path: PathBuf,
    acl_flags: FlagSet,
    extattr_flags: FlagSet,
}

impl ImageParams {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Flags carried by the access-control-list channel (unvalidated)
    #[inline]
    #[must_use]
    pub fn with_acl_flags(mut self, raw: RawFlags) -> Self {
        self.acl_flags = FlagSet::from_raw(raw);
        self
    }

    /// Flags carried by the extended-attribute channel (unvalidated)
    #[inline]
    #[must_use]
    pub fn with_extattr_flags(mut self, raw: RawFlags) -> Self {
        self.extattr_flags = FlagSet::from_raw(raw);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn acl_flags(&self) -> FlagSet {
        self.acl_flags
    }

    pub fn extattr_flags(&self) -> FlagSet {
        self.extattr_flags
    }
}

/// Parses `path[:acl=<flags>][:extattr=<flags>]`, flags in hex (`0x` prefix)
/// or decimal
impl FromStr for ImageParams {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let path = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| PolicyError::Config(format!("missing image path in {:?}", s)))?;

        let mut image = ImageParams::new(path);
        for part in parts {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| PolicyError::Config(format!("expected key=value, got {:?}", part)))?;
            let raw = parse_flags(value)
                .ok_or_else(|| PolicyError::Config(format!("bad flag word {:?}", value)))?;
            image = match key {
                "acl" => image.with_acl_flags(raw),
                "extattr" => image.with_extattr_flags(raw),
                other => {
                    return Err(PolicyError::Config(format!("unknown channel {:?}", other)));
                }
            };
        }
        Ok(image)
    }
}

fn parse_flags(value: &str) -> Option<RawFlags> {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => RawFlags::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

/// Resolve the requested mode for an activation. Never fails: absent
/// metadata means no explicit request.
#[must_use]
pub fn requested_flags(image: &ImageParams, channels: &ControlChannels) -> FlagSet {
    let acl = image.acl_flags();
    let extattr = image.extattr_flags();

    match (channels.acl, channels.extattr) {
        (true, true) => {
            // PREFER_ACL alone already makes the ACL value non-empty
            if !acl.is_empty() {
                acl
            } else {
                extattr
            }
        }
        (true, false) => acl,
        (false, true) => extattr,
        (false, false) => FlagSet::empty(),
    }
}
