use std::{cmp::Ordering, fmt, str::FromStr};

use crate::{TemporalError, TimeInterval, EPSILON};

/// A type describing the thirteen possible relations between two time
/// intervals (e.g. `s` and `t`).
///
/// The relations are comparable (via `Ord`) by the degree to which `s`
/// begins before `t` and then within that by the degree to which `s` ends
/// before `t`.
///
/// Six pairs of the relations are converses. For example, the converse of
/// "s precedes t" is "t is preceded by s"; whenever the first relation is
/// true, its converse is true also. The thirteenth, "s equals t", is its
/// own converse.
///
/// Each relation has a canonical textual tag used on the wire and in
/// provenance records: `before`, `after`, `meets`, `met-by`, `overlaps`,
/// `overlapped-by`, `during`, `contains`, `starts`, `started-by`,
/// `finishes`, `finished-by`, `equals`. [`Relation::from_str`] also
/// accepts underscore spellings and any casing.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Relation {
    /// `Precedes { is_inverted: false }` — tag `before`:
    ///
    /// ```plain
    /// s: ┌────────┐
    /// t:            └────────┘
    /// ```
    ///
    /// `Precedes { is_inverted: true }` — tag `after`:
    ///
    /// ```plain
    /// s:            ┌────────┐
    /// t: └────────┘
    /// ```
    Precedes {
        /// `true` iff the relation is inverted, otherwise `false`.
        ///
        /// - `false` => "s precedes t"
        /// - `true` => "s is preceded by t"
        is_inverted: bool,
    },
    /// `Meets { is_inverted: false }` — tag `meets`:
    ///
    /// ```plain
    /// s: ┌────────┐
    /// t:          └────────┘
    /// ```
    ///
    /// `Meets { is_inverted: true }` — tag `met-by`:
    ///
    /// ```plain
    /// s:          ┌────────┐
    /// t: └────────┘
    /// ```
    Meets {
        /// `true` iff the relation is inverted, otherwise `false`.
        ///
        /// - `false` => "s meets t"
        /// - `true` => "s is met by t"
        is_inverted: bool,
    },
    /// `Overlaps { is_inverted: false }` — tag `overlaps`:
    ///
    /// ```plain
    /// s: ┌────────┐
    /// t:      └────────┘
    /// ```
    ///
    /// `Overlaps { is_inverted: true }` — tag `overlapped-by`:
    ///
    /// ```plain
    /// s:      ┌────────┐
    /// t: └────────┘
    /// ```
    Overlaps {
        /// `true` iff the relation is inverted, otherwise `false`.
        ///
        /// - `false` => "s overlaps t"
        /// - `true` => "s is overlapped by t"
        is_inverted: bool,
    },
    /// `Finishes { is_inverted: false }` — tag `finishes`:
    ///
    /// ```plain
    /// s:         ┌────────┐
    /// t: └────────────────┘
    /// ```
    ///
    /// `Finishes { is_inverted: true }` — tag `finished-by`:
    ///
    /// ```plain
    /// s: ┌────────────────┐
    /// t:         └────────┘
    /// ```
    Finishes {
        /// `true` iff the relation is inverted, otherwise `false`.
        ///
        /// - `false` => "s finishes t"
        /// - `true` => "s is finished by t"
        is_inverted: bool,
    },
    /// `Contains { is_inverted: false }` — tag `contains`:
    ///
    /// ```plain
    /// s: ┌────────────────┐
    /// t:     └────────┘
    /// ```
    ///
    /// `Contains { is_inverted: true }` — tag `during`:
    ///
    /// ```plain
    /// s:     ┌────────┐
    /// t: └────────────────┘
    /// ```
    Contains {
        /// `true` iff the relation is inverted, otherwise `false`.
        ///
        /// - `false` => "s contains t"
        /// - `true` => "s is contained by t"
        is_inverted: bool,
    },
    /// `Starts { is_inverted: false }` — tag `starts`:
    ///
    /// ```plain
    /// s: ┌────────┐
    /// t: └────────────────┘
    /// ```
    ///
    /// `Starts { is_inverted: true }` — tag `started-by`:
    ///
    /// ```plain
    /// s: ┌────────────────┐
    /// t: └────────┘
    /// ```
    Starts {
        /// `true` iff the relation is inverted, otherwise `false`.
        ///
        /// - `false` => "s starts t"
        /// - `true` => "s is started by t"
        is_inverted: bool,
    },
    /// `Equals` — tag `equals`:
    ///
    /// ```plain
    /// s: ┌────────┐
    /// t: └────────┘
    /// ```
    Equals,
}

impl Relation {
    /// All thirteen relations, in canonical index order.
    pub const ALL: [Self; 13] = [
        Self::Precedes { is_inverted: false },
        Self::Meets { is_inverted: false },
        Self::Overlaps { is_inverted: false },
        Self::Finishes { is_inverted: true },
        Self::Contains { is_inverted: false },
        Self::Starts { is_inverted: false },
        Self::Equals,
        Self::Starts { is_inverted: true },
        Self::Contains { is_inverted: true },
        Self::Finishes { is_inverted: false },
        Self::Overlaps { is_inverted: true },
        Self::Meets { is_inverted: true },
        Self::Precedes { is_inverted: true },
    ];

    /// Position in the canonical order, `0..13`.
    ///
    /// The order sorts by the degree to which `s` begins before `t`, then
    /// by the degree to which `s` ends before `t`; it doubles as the bit
    /// position within a [`RelationSet`](crate::RelationSet).
    pub const fn index(&self) -> usize {
        match self {
            Self::Precedes { is_inverted: false } => 0,
            Self::Meets { is_inverted: false } => 1,
            Self::Overlaps { is_inverted: false } => 2,
            Self::Finishes { is_inverted: true } => 3,
            Self::Contains { is_inverted: false } => 4,
            Self::Starts { is_inverted: false } => 5,
            Self::Equals => 6,
            Self::Starts { is_inverted: true } => 7,
            Self::Contains { is_inverted: true } => 8,
            Self::Finishes { is_inverted: false } => 9,
            Self::Overlaps { is_inverted: true } => 10,
            Self::Meets { is_inverted: true } => 11,
            Self::Precedes { is_inverted: true } => 12,
        }
    }

    /// Looks a relation up by its canonical index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Returns the relation's converse.
    pub const fn as_converse(&self) -> Self {
        match self {
            Self::Precedes { is_inverted } => Self::Precedes {
                is_inverted: !*is_inverted,
            },
            Self::Meets { is_inverted } => Self::Meets {
                is_inverted: !*is_inverted,
            },
            Self::Overlaps { is_inverted } => Self::Overlaps {
                is_inverted: !*is_inverted,
            },
            Self::Finishes { is_inverted } => Self::Finishes {
                is_inverted: !*is_inverted,
            },
            Self::Contains { is_inverted } => Self::Contains {
                is_inverted: !*is_inverted,
            },
            Self::Starts { is_inverted } => Self::Starts {
                is_inverted: !*is_inverted,
            },
            Self::Equals => Self::Equals,
        }
    }

    /// Determines the relation holding between two complete intervals.
    ///
    /// Endpoints are compared with [`EPSILON`] tolerance, so e.g. an
    /// interval ending within ε of another's start *meets* it rather
    /// than preceding or overlapping it.
    ///
    /// Fails with [`TemporalError::IllFormedInterval`] when either
    /// operand is incomplete or not wider than ε (relations between
    /// degenerate intervals are undefined).
    pub fn try_from_intervals(
        s: &TimeInterval,
        t: &TimeInterval,
    ) -> Result<Self, TemporalError> {
        let (s_start, s_end) = complete_bounds(s)?;
        let (t_start, t_end) = complete_bounds(t)?;

        let bb = cmp_with_tolerance(s_start, t_start);
        let be = cmp_with_tolerance(s_start, t_end);
        let eb = cmp_with_tolerance(s_end, t_start);
        let ee = cmp_with_tolerance(s_end, t_end);

        Ok(Self::from_atomic_relations(bb, be, eb, ee))
    }

    /// Each of Allen’s relations can be reduced to a boolean combination
    /// of atomic endpoint relations. By computing each atomic relation
    /// only once, the overall classification is a single four-way match.
    ///
    /// See the following paper for more info:
    ///
    /// > Georgala, K., Sherif, M. A., & Ngonga Ngomo, A. C. (2016).
    /// > An efficient approach for the generation of Allen relations.
    /// > In ECAI 2016 (pp. 948-956). IOS Press.
    #[inline]
    fn from_atomic_relations(bb: Ordering, be: Ordering, eb: Ordering, ee: Ordering) -> Self {
        use Ordering::*;

        match (bb, be, eb, ee) {
            // bf(s,t):
            // = { EB1(s,t) }
            (_, _, Less, _) => Self::Precedes { is_inverted: false },
            // bfi(s,t):
            // = { BE−1 }
            // = ¬(BE1(s,t) ∨ BE0(s,t))
            (_, Greater, _, _) => Self::Precedes { is_inverted: true },
            // m(s,t):
            // = { EB0(s,t) }
            (_, _, Equal, _) => Self::Meets { is_inverted: false },
            // mi(s,t):
            // = { BE0(s,t) }
            (_, Equal, _, _) => Self::Meets { is_inverted: true },
            // f(s,t):
            // = { EE0(s,t) ∧ BB−1(s,t) }
            (Greater, _, _, Equal) => Self::Finishes { is_inverted: false },
            // fi(s,t):
            // = { BB1(s,t) ∧ EE0(s,t) }
            (Less, _, _, Equal) => Self::Finishes { is_inverted: true },
            // st(s,t):
            // = { BB0(s,t) ∧ EE1(s,t) }
            (Equal, _, _, Less) => Self::Starts { is_inverted: false },
            // sti(s,t):
            // = { BB0(s,t) ∧ EE−1(s,t) }
            (Equal, _, _, Greater) => Self::Starts { is_inverted: true },
            // di(s,t):
            // = { BB1(s,t) ∧ EE−1(s,t) }
            (Less, _, _, Greater) => Self::Contains { is_inverted: false },
            // d(s,t):
            // = { EE1(s,t) ∧ BB−1(s,t) }
            (Greater, _, _, Less) => Self::Contains { is_inverted: true },
            // eq(s,t):
            // = { BB0(s,t) ∧ EE0(s,t) }
            (Equal, _, _, Equal) => Self::Equals,
            // ov(s,t):
            // = { BB1(s,t) ∧ EB−1(s,t) ∧ EE1(s,t) }
            (Less, _, Greater, Less) => Self::Overlaps { is_inverted: false },
            // ovi(s,t):
            // = { BB−1(s,t) ∧ BE1(s,t) ∧ EE−1(s,t) }
            (Greater, Less, _, Greater) => Self::Overlaps { is_inverted: true },
        }
    }

    /// The canonical hyphenated tag, e.g. `met-by`.
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Precedes { is_inverted: false } => "before",
            Self::Precedes { is_inverted: true } => "after",
            Self::Meets { is_inverted: false } => "meets",
            Self::Meets { is_inverted: true } => "met-by",
            Self::Overlaps { is_inverted: false } => "overlaps",
            Self::Overlaps { is_inverted: true } => "overlapped-by",
            Self::Contains { is_inverted: false } => "contains",
            Self::Contains { is_inverted: true } => "during",
            Self::Starts { is_inverted: false } => "starts",
            Self::Starts { is_inverted: true } => "started-by",
            Self::Finishes { is_inverted: false } => "finishes",
            Self::Finishes { is_inverted: true } => "finished-by",
            Self::Equals => "equals",
        }
    }
}

fn complete_bounds(interval: &TimeInterval) -> Result<(f64, f64), TemporalError> {
    let (Some(start), Some(end)) = (interval.start, interval.end) else {
        return Err(TemporalError::IllFormedInterval {
            name: interval.name.clone(),
            detail: "interval is incomplete".to_owned(),
        });
    };

    if end - start <= EPSILON {
        return Err(TemporalError::IllFormedInterval {
            name: interval.name.clone(),
            detail: "interval is degenerate".to_owned(),
        });
    }

    Ok((start, end))
}

#[inline]
fn cmp_with_tolerance(lhs: f64, rhs: f64) -> Ordering {
    if (lhs - rhs).abs() <= EPSILON {
        Ordering::Equal
    } else if lhs < rhs {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

impl Ord for Relation {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.index().cmp(&other.index())
    }
}

impl PartialOrd for Relation {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Relation {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");

        Self::ALL
            .iter()
            .copied()
            .find(|relation| relation.tag() == normalized)
            .ok_or(TemporalError::ParseFailure { text: s.to_owned() })
    }
}
