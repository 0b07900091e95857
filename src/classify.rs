//! Pure classification functions: VM demand -> item class, PM load/contents -> PM class.
//!
//! Boundary comparisons are done by scaling (`3.0 * d` against `1.0`, etc.) rather
//! than comparing `d` directly against `1.0 / 3.0`, so the left-open/right-closed
//! boundary policy holds exactly at `d` = 1/3, 1/2, 2/3 even though those fractions
//! aren't exactly representable in `f64`.

/// Category of a single VM's current demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemClass {
    /// 0 < d <= 1/3
    T,
    /// 1/3 < d <= 1/2
    S,
    /// 1/2 < d <= 2/3
    L,
    /// 2/3 < d <= 1
    B,
}

impl std::fmt::Display for ItemClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ItemClass::T => "T",
            ItemClass::S => "S",
            ItemClass::L => "L",
            ItemClass::B => "B",
        };
        write!(f, "{s}")
    }
}

/// Classify a demand value in (0, 1]. Returns `None` for anything outside that
/// range (the caller is expected to have already rejected such demands at load
/// time via `SchedulerError::DemandOutOfRange`).
pub fn item_class(demand: f64) -> Option<ItemClass> {
    if demand <= 0.0 || demand > 1.0 {
        return None;
    }
    if 3.0 * demand <= 1.0 {
        Some(ItemClass::T)
    } else if 2.0 * demand <= 1.0 {
        Some(ItemClass::S)
    } else if 3.0 * demand <= 2.0 {
        Some(ItemClass::L)
    } else {
        Some(ItemClass::B)
    }
}

/// Category of a PM, derived from the multiset of item classes it hosts and its
/// total load. The "U" prefix marks under-full bins (gap > 1/3, i.e. load < 2/3)
/// that can still absorb a T-group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PmClass {
    B,
    L,
    Ullt,
    Lt,
    S,
    Ss,
    Ls,
    T,
    Ut,
}

impl PmClass {
    /// All classes tracked by the class index, in the priority order the
    /// classifier tests them.
    pub const ALL: [PmClass; 9] = [
        PmClass::B,
        PmClass::L,
        PmClass::Ullt,
        PmClass::Lt,
        PmClass::S,
        PmClass::Ss,
        PmClass::Ls,
        PmClass::T,
        PmClass::Ut,
    ];
}

impl std::fmt::Display for PmClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PmClass::B => "B",
            PmClass::L => "L",
            PmClass::Ullt => "ULLT",
            PmClass::Lt => "LT",
            PmClass::S => "S",
            PmClass::Ss => "SS",
            PmClass::Ls => "LS",
            PmClass::T => "T",
            PmClass::Ut => "UT",
        };
        write!(f, "{s}")
    }
}

/// Counts of each item class currently hosted by a PM.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemCounts {
    pub t: usize,
    pub s: usize,
    pub l: usize,
    pub b: usize,
}

impl ItemCounts {
    pub fn total(&self) -> usize {
        self.t + self.s + self.l + self.b
    }

    pub fn from_classes<'a>(classes: impl Iterator<Item = &'a ItemClass>) -> Self {
        let mut counts = ItemCounts::default();
        for c in classes {
            match c {
                ItemClass::T => counts.t += 1,
                ItemClass::S => counts.s += 1,
                ItemClass::L => counts.l += 1,
                ItemClass::B => counts.b += 1,
            }
        }
        counts
    }
}

/// Classify a PM given the item classes it hosts and its total load. Conditions
/// are tried in priority order; the first match wins. A configuration outside
/// the table (including the empty PM) returns `None`,
/// which drops the PM from the class index.
pub fn pm_class(counts: ItemCounts, total_load: f64) -> Option<PmClass> {
    let item_num = counts.total();
    let under_full = 3.0 * total_load < 2.0;

    if item_num == 1 && counts.b == 1 {
        return Some(PmClass::B);
    }
    if item_num == 1 && counts.l == 1 {
        return Some(if under_full { PmClass::Ullt } else { PmClass::L });
    }
    if counts.l == 1 && counts.t == item_num - 1 && counts.t >= 1 {
        return Some(if under_full { PmClass::Ullt } else { PmClass::Lt });
    }
    if item_num == 1 && counts.s == 1 {
        return Some(PmClass::S);
    }
    if item_num == 2 && counts.s == 2 {
        return Some(PmClass::Ss);
    }
    if item_num == 2 && counts.l == 1 && counts.s == 1 {
        return Some(PmClass::Ls);
    }
    if item_num >= 1 && counts.t == item_num {
        return Some(if under_full { PmClass::Ut } else { PmClass::T });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_class_boundaries() {
        assert_eq!(item_class(1.0 / 3.0), Some(ItemClass::T));
        assert_eq!(item_class(1.0 / 3.0 + 1e-9), Some(ItemClass::S));
        assert_eq!(item_class(0.5), Some(ItemClass::S));
        assert_eq!(item_class(0.5 + 1e-9), Some(ItemClass::L));
        assert_eq!(item_class(2.0 / 3.0), Some(ItemClass::L));
        assert_eq!(item_class(2.0 / 3.0 + 1e-9), Some(ItemClass::B));
        assert_eq!(item_class(1.0), Some(ItemClass::B));
    }

    #[test]
    fn item_class_out_of_range() {
        assert_eq!(item_class(0.0), None);
        assert_eq!(item_class(-0.1), None);
        assert_eq!(item_class(1.1), None);
    }

    #[test]
    fn pm_class_singletons() {
        assert_eq!(
            pm_class(ItemCounts { b: 1, ..Default::default() }, 0.9),
            Some(PmClass::B)
        );
        assert_eq!(
            pm_class(ItemCounts { l: 1, ..Default::default() }, 0.6),
            Some(PmClass::L)
        );
        assert_eq!(
            pm_class(ItemCounts { l: 1, ..Default::default() }, 0.55),
            Some(PmClass::Ullt)
        );
        assert_eq!(
            pm_class(ItemCounts { s: 1, ..Default::default() }, 0.4),
            Some(PmClass::S)
        );
    }

    #[test]
    fn pm_class_lt_and_ullt() {
        let counts = ItemCounts {
            l: 1,
            t: 2,
            ..Default::default()
        };
        assert_eq!(pm_class(counts, 0.7), Some(PmClass::Lt));
        assert_eq!(pm_class(counts, 0.6), Some(PmClass::Ullt));
    }

    #[test]
    fn pm_class_ss_ls_t_ut() {
        assert_eq!(
            pm_class(ItemCounts { s: 2, ..Default::default() }, 0.8),
            Some(PmClass::Ss)
        );
        assert_eq!(
            pm_class(
                ItemCounts {
                    l: 1,
                    s: 1,
                    ..Default::default()
                },
                0.9
            ),
            Some(PmClass::Ls)
        );
        assert_eq!(
            pm_class(ItemCounts { t: 3, ..Default::default() }, 0.9),
            Some(PmClass::T)
        );
        assert_eq!(
            pm_class(ItemCounts { t: 3, ..Default::default() }, 0.3),
            Some(PmClass::Ut)
        );
    }

    #[test]
    fn pm_class_empty_is_none() {
        assert_eq!(pm_class(ItemCounts::default(), 0.0), None);
    }
}
