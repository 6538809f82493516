//! The action record the engine searches over.
//!
//! Actions are domain-opaque: the engine only relies on the total order,
//! the capture/forcing flag bits, and the prior / static-score hints the
//! adapter fills in.

use std::cmp::Ordering;

use crate::fixed::Q;

/// `type_flags` bit 0: the action captures material (or the domain's
/// equivalent of a capture).
pub const FLAG_CAPTURE: u32 = 1 << 0;

/// `type_flags` bit 1: the action is forcing (check or equivalent).
pub const FLAG_FORCING: u32 = 1 << 1;

/// Compact move record.
///
/// Ordering and equality consider `(from, to, type_flags, payload)` only;
/// `action_id`, `prior`, and `static_score` are annotations. Within one
/// generated legal-action list, `action_id` runs 0..N-1 in list order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Action {
    /// Index within the generating state's legal-action list.
    pub action_id: u32,
    pub from: u32,
    pub to: u32,
    /// Bit 0 = capture, bit 1 = forcing; remaining bits domain-defined.
    pub type_flags: u32,
    /// Domain-defined payload (promotion piece, charge level, ...).
    pub payload: i32,
    /// Prior probability hint in [0, 1]; `ZERO` means "not provided".
    pub prior: Q,
    /// Static exchange estimate used for capture ordering.
    pub static_score: Q,
}

impl Action {
    pub fn new(from: u32, to: u32, type_flags: u32) -> Self {
        Self {
            from,
            to,
            type_flags,
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_capture(&self) -> bool {
        self.type_flags & FLAG_CAPTURE != 0
    }

    #[inline]
    pub fn is_forcing(&self) -> bool {
        self.type_flags & FLAG_FORCING != 0
    }

    /// A default-constructed action, used as the "no action" sentinel.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.from == 0 && self.to == 0 && self.type_flags == 0
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        self.from == other.from
            && self.to == other.to
            && self.type_flags == other.type_flags
            && self.payload == other.payload
    }
}

impl Eq for Action {}

impl PartialOrd for Action {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Action {
    fn cmp(&self, other: &Self) -> Ordering {
        self.from
            .cmp(&other.from)
            .then(self.to.cmp(&other.to))
            .then(self.type_flags.cmp(&other.type_flags))
            .then(self.payload.cmp(&other.payload))
    }
}
