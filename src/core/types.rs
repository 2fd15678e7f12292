use serde::{Deserialize, Serialize};
use std::fmt;

/// Set of monotonic lifecycle flags recorded for one tracked instance
///
/// Flags are only ever inserted, never removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LifecycleFlags(u8);

impl LifecycleFlags {
    pub const CONSTRUCTED: Self = Self(1 << 0);
    pub const DISPOSED: Self = Self(1 << 1);
    pub const INNER_DISPOSED: Self = Self(1 << 2);
    pub const SUPPRESSED_FINALIZE: Self = Self(1 << 3);
    pub const FINALIZED: Self = Self(1 << 4);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Inserts `other`, returning true if any bit was newly set
    pub fn insert(&mut self, other: Self) -> bool {
        let before = self.0;
        self.0 |= other.0;
        before != self.0
    }
}

impl std::ops::BitOr for LifecycleFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A single step of a tracked instance's release protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transition {
    /// The instance registered itself
    Constructed,
    /// The public release entry point finished
    Disposed,
    /// The shared release routine finished
    InnerDisposed,
    /// Finalization was suppressed by an explicit release
    SuppressedFinalize,
    /// The finalizer (drop hook) ran
    Finalized,
}

impl Transition {
    pub const ALL: [Transition; 5] = [
        Transition::Constructed,
        Transition::Disposed,
        Transition::InnerDisposed,
        Transition::SuppressedFinalize,
        Transition::Finalized,
    ];

    pub fn flag(self) -> LifecycleFlags {
        match self {
            Transition::Constructed => LifecycleFlags::CONSTRUCTED,
            Transition::Disposed => LifecycleFlags::DISPOSED,
            Transition::InnerDisposed => LifecycleFlags::INNER_DISPOSED,
            Transition::SuppressedFinalize => LifecycleFlags::SUPPRESSED_FINALIZE,
            Transition::Finalized => LifecycleFlags::FINALIZED,
        }
    }

    /// Letter shown in the state code when the flag is set
    pub fn marker(self) -> char {
        match self {
            Transition::Constructed => 'C',
            Transition::Disposed => 'D',
            Transition::InnerDisposed => 'I',
            Transition::SuppressedFinalize => 'S',
            Transition::Finalized => 'F',
        }
    }

    /// Name used in transition log lines
    pub fn event_name(self) -> &'static str {
        match self {
            Transition::Constructed => "OnConstructed",
            Transition::Disposed => "OnDisposed",
            Transition::InnerDisposed => "OnInnerDisposed",
            Transition::SuppressedFinalize => "OnSuppressedFinalize",
            Transition::Finalized => "OnFinalized",
        }
    }
}

/// Fixed six-position state code: C D I S F followed by liveness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateCode {
    flags: LifecycleFlags,
    alive: bool,
}

impl StateCode {
    pub const PLACEHOLDER: char = '-';
    pub const ALIVE: char = 'A';
    pub const DEAD: char = 'D';

    pub fn new(flags: LifecycleFlags, alive: bool) -> Self {
        Self { flags, alive }
    }

    pub fn flags(&self) -> LifecycleFlags {
        self.flags
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }
}

impl fmt::Display for StateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use std::fmt::Write;

        for transition in Transition::ALL {
            let c = if self.flags.contains(transition.flag()) {
                transition.marker()
            } else {
                Self::PLACEHOLDER
            };
            f.write_char(c)?;
        }
        f.write_char(if self.alive { Self::ALIVE } else { Self::DEAD })
    }
}

/// Splits a fully qualified type name into `(category, type_name)`
///
/// Generic arguments stay attached to the type name, so
/// `app::cache::Slot<app::Key>` yields `("app::cache", "Slot<app::Key>")`.
/// Names that do not start with a path (tuples, arrays, slices, references,
/// trait objects) are kept whole with an empty category.
pub fn split_type_name(full: &str) -> (&str, &str) {
    let segment_end = full
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(full.len());
    if segment_end == 0 || !full[segment_end..].starts_with("::") {
        return ("", full);
    }

    let base_end = full.find('<').unwrap_or(full.len());
    match full[..base_end].rfind("::") {
        Some(i) => (&full[..i], &full[i + 2..]),
        None => ("", full),
    }
}
