use crate::grid::BinaryMask;
use serde::Serialize;

/// "Pinched waist" occupancy: two lobes joined through a notch, as left by
/// two presses whose footprints touched and merged into one blob.
pub const SPLIT_TEMPLATES: [[[bool; 3]; 3]; 2] = [
    [
        [true, true, false],
        [true, true, true],
        [false, true, true],
    ],
    [
        [false, true, true],
        [true, true, true],
        [true, true, false],
    ],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PatternMatch {
    /// Top-left corner of the matching 3x3 window.
    pub row: usize,
    pub col: usize,
    /// Index into `SPLIT_TEMPLATES`.
    pub template: usize,
}

fn window_matches(mask: &BinaryMask, row: usize, col: usize, template: &[[bool; 3]; 3]) -> bool {
    (0..3).all(|x| (0..3).all(|y| mask.get(row + x, col + y) == template[x][y]))
}

/// Every window position that matches a split template.
///
/// A window is tested against the templates in order and stops at the first
/// hit. Overlapping windows are reported independently.
pub fn find_split_patterns(mask: &BinaryMask) -> Vec<PatternMatch> {
    let (rows, cols) = mask.shape();
    let mut found = Vec::new();
    if rows < 3 || cols < 3 {
        return found;
    }

    for row in 0..rows - 2 {
        for col in 0..cols - 2 {
            if let Some(template) = SPLIT_TEMPLATES
                .iter()
                .position(|t| window_matches(mask, row, col, t))
            {
                found.push(PatternMatch { row, col, template });
            }
        }
    }
    found
}

/// Extra components to add to the connected-component count.
pub fn count_split_patterns(mask: &BinaryMask) -> usize {
    find_split_patterns(mask).len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_mask_has_no_patterns() {
        let m = BinaryMask::from_bits(&[[1u8, 1, 0], [1, 1, 1]]).unwrap();
        assert_eq!(count_split_patterns(&m), 0);
    }

    #[test]
    fn test_mirror_template_detected() {
        let m = BinaryMask::from_bits(&[
            [0u8, 0, 0, 0],
            [0, 0, 1, 1],
            [0, 1, 1, 1],
            [0, 1, 1, 0],
        ])
        .unwrap();
        let found = find_split_patterns(&m);
        assert_eq!(
            found,
            vec![PatternMatch {
                row: 1,
                col: 1,
                template: 1
            }]
        );
    }

    #[test]
    fn test_full_block_does_not_match() {
        let m = BinaryMask::filled(3, 3, true);
        assert_eq!(count_split_patterns(&m), 0);
    }
}
