//! Square symmetries and their action on peering direction slots.
//!
//! Direction slots are indexed 0..8 clockwise from the top. The dihedral
//! group of the square acts on them as fixed permutations: rotations map
//! slot `i` to `(i + 2k) mod 8`, reflections map `i` to `(2k - i) mod 8`.
//! Each [`SymmetryType`] names the orientations a tile's rules may be used
//! in during matching.

use serde::{Deserialize, Serialize};

/// One of the eight square symmetries, as a permutation of direction slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transform {
    Identity,
    RotateCw,
    Rotate180,
    RotateCcw,
    /// Reflection across the vertical axis (horizontal mirror).
    MirrorX,
    /// Reflection across the horizontal axis (vertical flip).
    MirrorY,
    /// Reflection across the top-right/bottom-left diagonal.
    MirrorDiag,
    /// Reflection across the top-left/bottom-right diagonal.
    MirrorAntiDiag,
}

impl Transform {
    pub const ALL: [Transform; 8] = [
        Transform::Identity,
        Transform::RotateCw,
        Transform::Rotate180,
        Transform::RotateCcw,
        Transform::MirrorX,
        Transform::MirrorY,
        Transform::MirrorDiag,
        Transform::MirrorAntiDiag,
    ];

    /// Apply the permutation to a direction slot (0..8, clockwise from top).
    pub fn apply_slot(self, slot: u8) -> u8 {
        debug_assert!(slot < 8);
        let i = slot as i32;
        let mapped = match self {
            Transform::Identity => i,
            Transform::RotateCw => i + 2,
            Transform::Rotate180 => i + 4,
            Transform::RotateCcw => i + 6,
            Transform::MirrorX => -i,
            Transform::MirrorDiag => 2 - i,
            Transform::MirrorY => 4 - i,
            Transform::MirrorAntiDiag => 6 - i,
        };
        mapped.rem_euclid(8) as u8
    }

    /// The transform that undoes this one.
    pub fn inverse(self) -> Transform {
        match self {
            Transform::RotateCw => Transform::RotateCcw,
            Transform::RotateCcw => Transform::RotateCw,
            // Rotations by 0 and 180 and all reflections are self-inverse
            other => other,
        }
    }
}

/// Which rotated/reflected orientations of a tile's peering rules are
/// valid during matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SymmetryType {
    #[default]
    None,
    /// The tile and its horizontal mirror.
    Mirror,
    /// The tile and its vertical flip.
    Flip,
    /// All four reflected forms.
    Reflect,
    RotateClockwise,
    RotateCounterClockwise,
    Rotate180,
    /// All four rotated forms.
    RotateAll,
    /// All rotated and reflected forms.
    All,
}

const ROTATIONS: [Transform; 4] = [
    Transform::Identity,
    Transform::RotateCw,
    Transform::Rotate180,
    Transform::RotateCcw,
];

impl SymmetryType {
    /// The orientations a tile's rules are tried in during matching.
    pub fn variants(self) -> &'static [Transform] {
        match self {
            SymmetryType::None => &[Transform::Identity],
            SymmetryType::Mirror => &[Transform::Identity, Transform::MirrorX],
            SymmetryType::Flip => &[Transform::Identity, Transform::MirrorY],
            SymmetryType::Reflect => &[
                Transform::Identity,
                Transform::MirrorX,
                Transform::MirrorY,
                Transform::Rotate180,
            ],
            SymmetryType::RotateClockwise => &[Transform::Identity, Transform::RotateCw],
            SymmetryType::RotateCounterClockwise => &[Transform::Identity, Transform::RotateCcw],
            SymmetryType::Rotate180 => &[Transform::Identity, Transform::Rotate180],
            SymmetryType::RotateAll => &ROTATIONS,
            SymmetryType::All => &Transform::ALL,
        }
    }

    /// The subgroup generated by [`Self::variants`]. Direction-set
    /// expansion uses this so that expanding twice equals expanding once.
    pub fn closure(self) -> &'static [Transform] {
        match self {
            SymmetryType::RotateClockwise
            | SymmetryType::RotateCounterClockwise
            | SymmetryType::RotateAll => &ROTATIONS,
            other => other.variants(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_cw_moves_top_to_right() {
        // slot 0 = top, slot 2 = right
        assert_eq!(Transform::RotateCw.apply_slot(0), 2);
        assert_eq!(Transform::RotateCw.apply_slot(6), 0);
    }

    #[test]
    fn test_mirror_x_fixes_vertical_axis() {
        assert_eq!(Transform::MirrorX.apply_slot(0), 0);
        assert_eq!(Transform::MirrorX.apply_slot(4), 4);
        // top-right <-> top-left
        assert_eq!(Transform::MirrorX.apply_slot(1), 7);
        assert_eq!(Transform::MirrorX.apply_slot(7), 1);
    }

    #[test]
    fn test_mirror_y_fixes_horizontal_axis() {
        assert_eq!(Transform::MirrorY.apply_slot(2), 2);
        assert_eq!(Transform::MirrorY.apply_slot(6), 6);
        assert_eq!(Transform::MirrorY.apply_slot(0), 4);
    }

    #[test]
    fn test_inverse_round_trips_every_slot() {
        for t in Transform::ALL {
            for slot in 0..8 {
                assert_eq!(t.inverse().apply_slot(t.apply_slot(slot)), slot);
            }
        }
    }

    #[test]
    fn test_closure_is_closed_under_composition() {
        let symmetries = [
            SymmetryType::None,
            SymmetryType::Mirror,
            SymmetryType::Flip,
            SymmetryType::Reflect,
            SymmetryType::RotateClockwise,
            SymmetryType::RotateCounterClockwise,
            SymmetryType::Rotate180,
            SymmetryType::RotateAll,
            SymmetryType::All,
        ];
        for sym in symmetries {
            let group = sym.closure();
            for &a in group {
                for &b in group {
                    // a∘b must act like some member of the group on all slots
                    let composed: Vec<u8> =
                        (0..8).map(|s| a.apply_slot(b.apply_slot(s))).collect();
                    assert!(
                        group.iter().any(|&c| {
                            (0..8).all(|s| c.apply_slot(s) == composed[s as usize])
                        }),
                        "{sym:?} closure not closed under {a:?}∘{b:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_variants_include_identity() {
        assert!(SymmetryType::All.variants().contains(&Transform::Identity));
        assert_eq!(SymmetryType::None.variants(), &[Transform::Identity]);
        assert_eq!(SymmetryType::All.variants().len(), 8);
    }
}
