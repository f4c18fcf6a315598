//! The composition table of Allen's interval algebra.
//!
//! `compose(r₁, r₂)` answers: if `X r₁ Y` and `Y r₂ Z`, which relations
//! may hold between `X` and `Z`? The full 13×13 table below is the one
//! tabulated in Allen (1983); `equals` acts as a two-sided identity.
//!
//! Composition lifts pointwise to relation sets, which is what the
//! path-consistency closure in the [solver](crate::Solver) consumes.

use crate::{Relation, RelationSet};

const BEFORE: Relation = Relation::Precedes { is_inverted: false };
const AFTER: Relation = Relation::Precedes { is_inverted: true };
const MEETS: Relation = Relation::Meets { is_inverted: false };
const MET_BY: Relation = Relation::Meets { is_inverted: true };
const OVERLAPS: Relation = Relation::Overlaps { is_inverted: false };
const OVERLAPPED_BY: Relation = Relation::Overlaps { is_inverted: true };
const STARTS: Relation = Relation::Starts { is_inverted: false };
const STARTED_BY: Relation = Relation::Starts { is_inverted: true };
const FINISHES: Relation = Relation::Finishes { is_inverted: false };
const FINISHED_BY: Relation = Relation::Finishes { is_inverted: true };
const DURING: Relation = Relation::Contains { is_inverted: true };
const CONTAINS: Relation = Relation::Contains { is_inverted: false };
const EQUALS: Relation = Relation::Equals;

// Singleton cells.
const B: RelationSet = RelationSet::singleton(BEFORE);
const BI: RelationSet = RelationSet::singleton(AFTER);
const M: RelationSet = RelationSet::singleton(MEETS);
const MI: RelationSet = RelationSet::singleton(MET_BY);
const O: RelationSet = RelationSet::singleton(OVERLAPS);
const OI: RelationSet = RelationSet::singleton(OVERLAPPED_BY);
const S: RelationSet = RelationSet::singleton(STARTS);
const SI: RelationSet = RelationSet::singleton(STARTED_BY);
const F: RelationSet = RelationSet::singleton(FINISHES);
const FI: RelationSet = RelationSet::singleton(FINISHED_BY);
const D: RelationSet = RelationSet::singleton(DURING);
const DI: RelationSet = RelationSet::singleton(CONTAINS);
const E: RelationSet = RelationSet::singleton(EQUALS);

// Recurring disjunctive cells.
const FULL: RelationSet = RelationSet::FULL;
const PMO: RelationSet = RelationSet::of(&[BEFORE, MEETS, OVERLAPS]);
const PMOFD: RelationSet = RelationSet::of(&[BEFORE, MEETS, OVERLAPS, FINISHED_BY, CONTAINS]);
const PMOSD: RelationSet = RelationSet::of(&[BEFORE, MEETS, OVERLAPS, STARTS, DURING]);
const OSD: RelationSet = RelationSet::of(&[OVERLAPS, STARTS, DURING]);
const OFD: RelationSet = RelationSet::of(&[OVERLAPS, FINISHED_BY, CONTAINS]);
const DSO: RelationSet = RelationSet::of(&[CONTAINS, STARTED_BY, OVERLAPPED_BY]);
const DSOMP: RelationSet =
    RelationSet::of(&[CONTAINS, STARTED_BY, OVERLAPPED_BY, MET_BY, AFTER]);
const DFO: RelationSet = RelationSet::of(&[DURING, FINISHES, OVERLAPPED_BY]);
const DFOMP: RelationSet = RelationSet::of(&[DURING, FINISHES, OVERLAPPED_BY, MET_BY, AFTER]);
const FEF: RelationSet = RelationSet::of(&[FINISHED_BY, EQUALS, FINISHES]);
const SES: RelationSet = RelationSet::of(&[STARTS, EQUALS, STARTED_BY]);
const OMP: RelationSet = RelationSet::of(&[OVERLAPPED_BY, MET_BY, AFTER]);
/// Every relation in which the operands share at least one time point.
const CONCUR: RelationSet = RelationSet::of(&[
    OVERLAPS,
    FINISHED_BY,
    CONTAINS,
    STARTS,
    EQUALS,
    STARTED_BY,
    DURING,
    FINISHES,
    OVERLAPPED_BY,
]);

/// `TABLE[r1.index()][r2.index()]` = possible relations of `X` to `Z`
/// given `X r1 Y` and `Y r2 Z`.
///
/// Rows and columns are in canonical index order:
/// `before, meets, overlaps, finished-by, contains, starts, equals,
/// started-by, during, finishes, overlapped-by, met-by, after`.
#[rustfmt::skip]
static TABLE: [[RelationSet; 13]; 13] = [
    // before
    [B,     B,   B,      B,     B,     B,   B,  B,     PMOSD, PMOSD, PMOSD,  PMOSD, FULL],
    // meets
    [B,     B,   B,      B,     B,     M,   M,  M,     OSD,   OSD,   OSD,    FEF,   DSOMP],
    // overlaps
    [B,     B,   PMO,    PMO,   PMOFD, O,   O,  OFD,   OSD,   OSD,   CONCUR, DSO,   DSOMP],
    // finished-by
    [B,     M,   O,      FI,    DI,    O,   FI, DI,    OSD,   FEF,   DSO,    DSO,   DSOMP],
    // contains
    [PMOFD, OFD, OFD,    DI,    DI,    OFD, DI, DI,    CONCUR, DSO,  DSO,    DSO,   DSOMP],
    // starts
    [B,     B,   PMO,    PMO,   PMOFD, S,   S,  SES,   D,     D,     DFO,    MI,    BI],
    // equals
    [B,     M,   O,      FI,    DI,    S,   E,  SI,    D,     F,     OI,     MI,    BI],
    // started-by
    [PMOFD, OFD, OFD,    DI,    DI,    SES, SI, SI,    DFO,   OI,    OI,     MI,    BI],
    // during
    [B,     B,   PMOSD,  PMOSD, FULL,  D,   D,  DFOMP, D,     D,     DFOMP,  BI,    BI],
    // finishes
    [B,     M,   OSD,    FEF,   DSOMP, D,   F,  OMP,   D,     F,     OMP,    BI,    BI],
    // overlapped-by
    [PMOFD, OFD, CONCUR, DSO,   DSOMP, DFO, OI, OMP,   DFO,   OI,    OMP,    BI,    BI],
    // met-by
    [PMOFD, SES, DFO,    MI,    BI,    DFO, MI, BI,    DFO,   MI,    BI,     BI,    BI],
    // after
    [FULL,  DFOMP, DFOMP, BI,   BI,    DFOMP, BI, BI,  DFOMP, BI,    BI,     BI,    BI],
];

impl Relation {
    /// Composes two relations: the set of relations that may hold
    /// between `X` and `Z` given `X self Y` and `Y other Z`.
    ///
    /// An empty table cell would be answered with the full set of
    /// thirteen: dropping possibilities would be unsound, so a partial
    /// table degrades to a conservative "anything".
    pub fn compose(self, other: Self) -> RelationSet {
        let cell = TABLE[self.index()][other.index()];
        if cell.is_empty() {
            RelationSet::FULL
        } else {
            cell
        }
    }
}

impl RelationSet {
    /// Pointwise lift of [`Relation::compose`]:
    /// `⋃ { compose(r₁, r₂) | r₁ ∈ self, r₂ ∈ other }`.
    pub fn compose(self, other: Self) -> Self {
        let mut composed = Self::EMPTY;
        for r1 in self.iter() {
            for r2 in other.iter() {
                composed = composed.union(r1.compose(r2));
            }
        }
        composed
    }
}
