//! Board data extraction
//!
//! Flattens a loaded [`Board`] into the JSON summary the report generator
//! consumes: trace widths with their nets, via sizes, component placements
//! and the set of routed net names. Lengths are converted from internal
//! units to millimetres and rounded (3 decimals for copper dimensions,
//! 2 for positions).

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parser::board::{Board, BoardItem, BoardLoadError, Iu, IU_PER_MM};

const DIMENSION_DECIMALS: u32 = 3;
const POSITION_DECIMALS: u32 = 2;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Board file does not exist: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Summary file does not exist: {}", .0.display())]
    SummaryNotFound(PathBuf),
    #[error("Failed to load board: {0}")]
    Load(#[from] BoardLoadError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub width_mm: f64,
    pub net: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViaRecord {
    pub size_mm: f64,
    pub drill_mm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    #[serde(rename = "ref")]
    pub reference: String,
    pub value: String,
    pub x_mm: f64,
    pub y_mm: f64,
}

/// The only artifact passed from extraction to report generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardSummary {
    pub tracks: Vec<TrackRecord>,
    pub vias: Vec<ViaRecord>,
    pub components: Vec<ComponentRecord>,
    /// Unique, non-empty, sorted.
    pub nets: Vec<String>,
}

impl BoardSummary {
    pub fn from_board(board: &Board) -> Self {
        let mut summary = BoardSummary::default();
        let mut nets = BTreeSet::new();

        for item in board.tracks() {
            match item {
                BoardItem::Segment(_) | BoardItem::Arc(_) => {
                    let net = item.net_name();
                    summary.tracks.push(TrackRecord {
                        width_mm: iu_to_mm(item.width(), DIMENSION_DECIMALS),
                        net: net.to_string(),
                    });
                    if !net.is_empty() {
                        nets.insert(net.to_string());
                    }
                }
                BoardItem::Via(via) => {
                    summary.vias.push(ViaRecord {
                        size_mm: iu_to_mm(via.width, DIMENSION_DECIMALS),
                        drill_mm: iu_to_mm(via.drill, DIMENSION_DECIMALS),
                    });
                }
            }
        }

        for fp in board.footprints() {
            summary.components.push(ComponentRecord {
                reference: fp.reference.clone(),
                value: fp.value.clone(),
                x_mm: iu_to_mm(fp.position.x, POSITION_DECIMALS),
                y_mm: iu_to_mm(fp.position.y, POSITION_DECIMALS),
            });
        }

        summary.nets = nets.into_iter().collect();
        summary
    }

    /// Narrowest trace width, or `None` when the board has no traces.
    pub fn min_track_width_mm(&self) -> Option<f64> {
        self.tracks.iter().map(|t| t.width_mm).reduce(f64::min)
    }
}

/// Internal units to millimetres, rounded half away from zero.
pub fn iu_to_mm(value: Iu, decimals: u32) -> f64 {
    round_to(value as f64 / IU_PER_MM, decimals)
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Load a board and summarize it.
pub fn extract_board_summary(path: &Path) -> Result<BoardSummary, ExtractError> {
    if !path.exists() {
        return Err(ExtractError::NotFound(absolute(path)));
    }

    tracing::info!("Loading KiCad board: {}", path.display());
    let board = Board::load(path)?;
    let summary = BoardSummary::from_board(&board);

    tracing::info!(
        "Extracted {} tracks, {} vias, {} components, {} nets",
        summary.tracks.len(),
        summary.vias.len(),
        summary.components.len(),
        summary.nets.len()
    );

    Ok(summary)
}

/// Write the summary as pretty-printed UTF-8 JSON.
pub fn write_summary(summary: &BoardSummary, path: &Path) -> Result<(), ExtractError> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json)?;
    tracing::info!("Board summary written to {}", absolute(path).display());
    Ok(())
}

pub fn load_summary(path: &Path) -> Result<BoardSummary, ExtractError> {
    if !path.exists() {
        return Err(ExtractError::SummaryNotFound(absolute(path)));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub(crate) fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
