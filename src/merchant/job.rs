use std::fmt;
use std::ops::BitOr;

/// Bitmask of services a merchant may offer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MerchantJob(u8);

impl MerchantJob {
    pub const VEND: Self = Self(0x01);
    pub const BANK: Self = Self(0x02);
    pub const SKILLS: Self = Self(0x04);
    pub const SPELLS: Self = Self(0x08);
    pub const REPAIR: Self = Self(0x10);
    pub const POST: Self = Self(0x20);

    const NAMED: [(Self, &'static str); 6] = [
        (Self::VEND, "vend"),
        (Self::BANK, "bank"),
        (Self::SKILLS, "skills"),
        (Self::SPELLS, "spells"),
        (Self::REPAIR, "repair"),
        (Self::POST, "post"),
    ];

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any bit of `other` is set
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMED
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(job, _)| *job)
    }

    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMED
            .into_iter()
            .filter(move |(job, _)| self.contains(*job))
            .map(|(_, name)| name)
    }
}

impl BitOr for MerchantJob {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for MerchantJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("MerchantJob(none)");
        }
        let names: Vec<_> = self.names().collect();
        write!(f, "MerchantJob({})", names.join(" | "))
    }
}
