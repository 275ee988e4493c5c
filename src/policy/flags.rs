/*!
 * Mitigation Flag Codec
 *
 * Bit layout of the mitigation flag word and the enable/disable pairing.
 * Pairing is an explicit table over [`Mitigation`] instead of a positional
 * shift, so extending the layout cannot silently mispair bits.
 */

use crate::core::types::RawFlags;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Mitigation flag set, as requested by an image or committed to a process
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
    pub struct FlagSet: u32 {
        const PAGEEXEC = 0x0000_0001;
        const NOPAGEEXEC = 0x0000_0002;
        const MPROTECT = 0x0000_0004;
        const NOMPROTECT = 0x0000_0008;
        const SEGVGUARD = 0x0000_0010;
        const NOSEGVGUARD = 0x0000_0020;
        const ASLR = 0x0000_0040;
        const NOASLR = 0x0000_0080;
        const SHLIBRANDOM = 0x0000_0100;
        const NOSHLIBRANDOM = 0x0000_0200;
        const DISALLOWMAP32BIT = 0x0000_0400;
        const NODISALLOWMAP32BIT = 0x0000_0800;

        /// Sticky preference for ACL-sourced flags; same position in both channels
        const PREFER_ACL = 0x8000_0000;
    }
}

/// A single exploit mitigation with its own enable/disable request bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mitigation {
    PageExec,
    Mprotect,
    Segvguard,
    Aslr,
    ShlibRandom,
    DisallowMap32Bit,
}

impl Mitigation {
    /// Every defined mitigation; the pairing table is derived from this list
    pub const ALL: [Mitigation; 6] = [
        Mitigation::PageExec,
        Mitigation::Mprotect,
        Mitigation::Segvguard,
        Mitigation::Aslr,
        Mitigation::ShlibRandom,
        Mitigation::DisallowMap32Bit,
    ];

    #[inline]
    #[must_use]
    pub const fn enable(self) -> FlagSet {
        match self {
            Mitigation::PageExec => FlagSet::PAGEEXEC,
            Mitigation::Mprotect => FlagSet::MPROTECT,
            Mitigation::Segvguard => FlagSet::SEGVGUARD,
            Mitigation::Aslr => FlagSet::ASLR,
            Mitigation::ShlibRandom => FlagSet::SHLIBRANDOM,
            Mitigation::DisallowMap32Bit => FlagSet::DISALLOWMAP32BIT,
        }
    }

    #[inline]
    #[must_use]
    pub const fn disable(self) -> FlagSet {
        match self {
            Mitigation::PageExec => FlagSet::NOPAGEEXEC,
            Mitigation::Mprotect => FlagSet::NOMPROTECT,
            Mitigation::Segvguard => FlagSet::NOSEGVGUARD,
            Mitigation::Aslr => FlagSet::NOASLR,
            Mitigation::ShlibRandom => FlagSet::NOSHLIBRANDOM,
            Mitigation::DisallowMap32Bit => FlagSet::NODISALLOWMAP32BIT,
        }
    }

    /// Both bits of the pair
    #[inline]
    #[must_use]
    pub const fn pair(self) -> FlagSet {
        self.enable().union(self.disable())
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Mitigation::PageExec => "pageexec",
            Mitigation::Mprotect => "mprotect",
            Mitigation::Segvguard => "segvguard",
            Mitigation::Aslr => "aslr",
            Mitigation::ShlibRandom => "shlibrandom",
            Mitigation::DisallowMap32Bit => "disallow_map32bit",
        }
    }
}

impl std::fmt::Display for Mitigation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FlagSet {
    /// Every enable bit
    #[must_use]
    pub fn all_enabled() -> FlagSet {
        Mitigation::ALL
            .iter()
            .fold(FlagSet::empty(), |acc, m| acc | m.enable())
    }

    /// Every disable bit
    #[must_use]
    pub fn all_disabled() -> FlagSet {
        Mitigation::ALL
            .iter()
            .fold(FlagSet::empty(), |acc, m| acc | m.disable())
    }

    /// Wrap a raw word without dropping unknown bits
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: RawFlags) -> FlagSet {
        FlagSet::from_bits_retain(raw)
    }

    /// Whether a mitigation is in force under this policy.
    ///
    /// An explicit enable wins, an explicit disable turns it off, and a
    /// policy that says nothing about the mitigation leaves it on.
    #[must_use]
    pub fn is_active(self, mitigation: Mitigation) -> bool {
        if self.contains(mitigation.enable()) {
            return true;
        }
        !self.contains(mitigation.disable())
    }

    /// Mitigations whose enable and disable bits are both set
    #[must_use]
    pub fn conflicts(self) -> Vec<Mitigation> {
        Mitigation::ALL
            .iter()
            .copied()
            .filter(|m| self.contains(m.pair()))
            .collect()
    }
}

impl From<FlagSet> for RawFlags {
    fn from(flags: FlagSet) -> Self {
        flags.bits()
    }
}

/// True when every bit of `bits` is a defined mitigation or PREFER_ACL
#[inline]
#[must_use]
pub fn is_known(bits: FlagSet) -> bool {
    bits.bits() & !FlagSet::all().bits() == 0
}

/// True when some mitigation has both its enable and disable bit set
#[inline]
#[must_use]
pub fn has_conflict(bits: FlagSet) -> bool {
    Mitigation::ALL.iter().any(|m| bits.contains(m.pair()))
}
