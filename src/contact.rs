use crate::grid::{BinaryMask, LabelMatrix};
use crate::segmentation::{count_split_patterns, label};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// A touch covering at most this many cells is treated as fingertip-sized.
pub const CELLS_PER_POINT_TOUCH: usize = 4;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContactMode {
    NoContact,
    PointContact,
    FaceContact,
}

/// Segmentation summary for one mask.
#[derive(Debug, Clone, Serialize)]
pub struct ContactAnalysis {
    pub labels: LabelMatrix,
    pub active_cells: usize,
    pub components: usize,
    pub patterns: usize,
    pub mode: ContactMode,
}

impl ContactAnalysis {
    /// Connected components plus split-pattern hits; the mixture order.
    pub fn effective_components(&self) -> usize {
        self.components + self.patterns
    }
}

pub fn classify_mode(mask: &BinaryMask, components: usize, patterns: usize) -> ContactMode {
    let active = mask.active_count();
    if active == 0 {
        return ContactMode::NoContact;
    }
    let effective = components + patterns;
    if active <= CELLS_PER_POINT_TOUCH * effective {
        ContactMode::PointContact
    } else {
        ContactMode::FaceContact
    }
}

/// Labels the mask, counts split patterns and decides the contact mode.
/// An inactive mask skips labeling entirely.
pub fn analyze(mask: &BinaryMask) -> ContactAnalysis {
    if mask.is_inactive() {
        let (rows, cols) = mask.shape();
        return ContactAnalysis {
            labels: LabelMatrix::filled(rows, cols, 0),
            active_cells: 0,
            components: 0,
            patterns: 0,
            mode: ContactMode::NoContact,
        };
    }

    let active_cells = mask.active_count();
    let (labels, components) = label(mask);
    let patterns = count_split_patterns(mask);
    let mode = classify_mode(mask, components, patterns);

    ContactAnalysis {
        labels,
        active_cells,
        components,
        patterns,
        mode,
    }
}
