//! Ledger eras a submitted transaction can be encoded under.

use std::fmt;

/// A post-Byron ledger era.
///
/// The discriminant is the hard-fork-combinator era index the node expects
/// in front of every submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum Era {
    Shelley = 1,
    Allegra = 2,
    Mary = 3,
    Alonzo = 4,
    Babbage = 5,
    Conway = 6,
}

impl Era {
    /// Every era, in hard-fork order.
    pub const ALL: [Era; 6] = [
        Era::Shelley,
        Era::Allegra,
        Era::Mary,
        Era::Alonzo,
        Era::Babbage,
        Era::Conway,
    ];

    /// Classification order. Newest first; the first era whose codec accepts
    /// the bytes wins, so bytes readable under several eras get the most
    /// recent tag the node can take.
    pub const DETECTION_ORDER: [Era; 6] = [
        Era::Conway,
        Era::Babbage,
        Era::Alonzo,
        Era::Mary,
        Era::Allegra,
        Era::Shelley,
    ];

    /// Most recent era known to this build.
    pub const LATEST: Era = Era::Conway;

    /// Hard-fork-combinator index used on the wire.
    pub const fn index(self) -> u16 {
        self as u16
    }

    /// Lowercase era name, as used in logs.
    pub const fn name(self) -> &'static str {
        match self {
            Era::Shelley => "shelley",
            Era::Allegra => "allegra",
            Era::Mary => "mary",
            Era::Alonzo => "alonzo",
            Era::Babbage => "babbage",
            Era::Conway => "conway",
        }
    }

    /// Looks up an era by its wire index.
    pub fn from_index(index: u16) -> Option<Era> {
        Era::ALL.into_iter().find(|era| era.index() == index)
    }

    /// Whether transactions of this era carry the `is_valid` flag (4-element envelope).
    pub(crate) const fn has_validity_flag(self) -> bool {
        matches!(self, Era::Alonzo | Era::Babbage | Era::Conway)
    }
}

impl fmt::Display for Era {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
