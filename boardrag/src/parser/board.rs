//! KiCad board loader
//!
//! Reads `.kicad_pcb` files (KiCad 6-9 S-expression format) into a
//! [`Board`]. The file stores lengths in millimetres; the loader converts
//! them to KiCad internal units (1 IU = 1 nm) so consumers see the same
//! integers the KiCad board model works with.
//!
//! Key format details:
//! - Nets are declared at top level as `(net <code> "<name>")`
//! - Copper tracks are `(segment ...)` and `(arc ...)`, vias are `(via ...)`
//! - Tracks reference nets by code; newer files may inline the name
//! - Footprints are `(footprint ...)` (`(module ...)` before KiCad 6)

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parser::sexp::{ParseError, SExp, SExpParser};

/// KiCad internal length unit (nanometres).
pub type Iu = i64;

/// Internal units per millimetre.
pub const IU_PER_MM: f64 = 1_000_000.0;

pub fn mm_to_iu(mm: f64) -> Iu {
    (mm * IU_PER_MM).round() as Iu
}

#[derive(Debug, Error)]
pub enum BoardLoadError {
    #[error("S-expression parse error: {0}")]
    SExpParse(#[from] ParseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid board format: {0}")]
    InvalidFormat(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: Iu,
    pub y: Iu,
}

impl Point {
    pub fn new(x: Iu, y: Iu) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetInfo {
    pub code: u32,
    pub name: String,
}

/// Straight copper track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSegment {
    pub start: Point,
    pub end: Point,
    pub width: Iu,
    pub layer: String,
    pub net_name: String,
}

/// Curved copper track through `mid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackArc {
    pub start: Point,
    pub mid: Point,
    pub end: Point,
    pub width: Iu,
    pub layer: String,
    pub net_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Via {
    pub position: Point,
    /// Pad diameter.
    pub width: Iu,
    pub drill: Iu,
    pub layers: (String, String),
    pub net_name: String,
}

/// Everything KiCad keeps in the board's track list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BoardItem {
    Segment(TrackSegment),
    Arc(TrackArc),
    Via(Via),
}

impl BoardItem {
    pub fn width(&self) -> Iu {
        match self {
            BoardItem::Segment(s) => s.width,
            BoardItem::Arc(a) => a.width,
            BoardItem::Via(v) => v.width,
        }
    }

    pub fn net_name(&self) -> &str {
        match self {
            BoardItem::Segment(s) => &s.net_name,
            BoardItem::Arc(a) => &a.net_name,
            BoardItem::Via(v) => &v.net_name,
        }
    }

    pub fn is_via(&self) -> bool {
        matches!(self, BoardItem::Via(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub reference: String,
    pub value: String,
    pub lib_id: String,
    pub layer: String,
    pub position: Point,
    /// Degrees.
    pub rotation: f64,
}

/// A loaded board.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Board {
    pub filename: String,
    pub version: Option<String>,
    nets: Vec<NetInfo>,
    tracks: Vec<BoardItem>,
    footprints: Vec<Footprint>,
}

impl Board {
    /// Load a `.kicad_pcb` file from disk.
    pub fn load(path: &Path) -> Result<Board, BoardLoadError> {
        let content = std::fs::read_to_string(path)?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        Self::parse_str(&content, filename)
    }

    /// Parse board text already in memory.
    pub fn parse_str(content: &str, filename: &str) -> Result<Board, BoardLoadError> {
        let root = SExpParser::new(content).parse()?;

        match root.tag() {
            Some("kicad_pcb") => {}
            Some(other) => {
                return Err(BoardLoadError::InvalidFormat(format!(
                    "Expected kicad_pcb, found {}",
                    other
                )))
            }
            None => {
                return Err(BoardLoadError::InvalidFormat(
                    "Expected kicad_pcb root".to_string(),
                ))
            }
        }

        let mut board = Board {
            filename: filename.to_string(),
            version: root.value_of("version").map(str::to_string),
            ..Default::default()
        };

        // Net table first: items may appear before the declarations they reference.
        for item in root.find_all("net") {
            match Self::parse_net(item) {
                Ok(net) => board.nets.push(net),
                Err(e) => tracing::warn!("Skipping net declaration: {}", e),
            }
        }

        for item in root.children() {
            let result = match item.tag() {
                Some("segment") => Self::parse_segment(item, &board.nets).map(BoardItem::Segment),
                Some("arc") => Self::parse_arc(item, &board.nets).map(BoardItem::Arc),
                Some("via") => Self::parse_via(item, &board.nets).map(BoardItem::Via),
                Some("footprint") | Some("module") => {
                    match Self::parse_footprint(item) {
                        Ok(fp) => board.footprints.push(fp),
                        Err(e) => tracing::warn!("Skipping footprint: {}", e),
                    }
                    continue;
                }
                _ => continue,
            };

            match result {
                Ok(track) => board.tracks.push(track),
                Err(e) => tracing::warn!("Skipping {}: {}", item.tag().unwrap_or("item"), e),
            }
        }

        tracing::debug!(
            "Loaded board {}: {} nets, {} track items, {} footprints",
            board.filename,
            board.nets.len(),
            board.tracks.len(),
            board.footprints.len()
        );

        Ok(board)
    }

    /// Tracks, arcs and vias in file order.
    pub fn tracks(&self) -> &[BoardItem] {
        &self.tracks
    }

    pub fn footprints(&self) -> &[Footprint] {
        &self.footprints
    }

    pub fn nets(&self) -> &[NetInfo] {
        &self.nets
    }

    pub fn net_name(&self, code: u32) -> Option<&str> {
        self.nets
            .iter()
            .find(|n| n.code == code)
            .map(|n| n.name.as_str())
    }

    fn parse_net(sexp: &SExp) -> Result<NetInfo, BoardLoadError> {
        let code = sexp
            .atom_at(1)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| BoardLoadError::MissingField("net code".to_string()))?;
        let name = sexp.atom_at(2).unwrap_or_default().to_string();
        Ok(NetInfo { code, name })
    }

    /// `(net 3)` is looked up in the net table; `(net "GND")` is taken as-is.
    fn resolve_net(sexp: &SExp, nets: &[NetInfo]) -> String {
        let Some(raw) = sexp.value_of("net") else {
            return String::new();
        };
        match raw.parse::<u32>() {
            Ok(code) => nets
                .iter()
                .find(|n| n.code == code)
                .map(|n| n.name.clone())
                .unwrap_or_default(),
            Err(_) => raw.to_string(),
        }
    }

    fn parse_segment(sexp: &SExp, nets: &[NetInfo]) -> Result<TrackSegment, BoardLoadError> {
        Ok(TrackSegment {
            start: Self::parse_point(sexp, "start")?,
            end: Self::parse_point(sexp, "end")?,
            width: Self::parse_length(sexp, "width")?,
            layer: sexp.value_of("layer").unwrap_or_default().to_string(),
            net_name: Self::resolve_net(sexp, nets),
        })
    }

    fn parse_arc(sexp: &SExp, nets: &[NetInfo]) -> Result<TrackArc, BoardLoadError> {
        Ok(TrackArc {
            start: Self::parse_point(sexp, "start")?,
            mid: Self::parse_point(sexp, "mid")?,
            end: Self::parse_point(sexp, "end")?,
            width: Self::parse_length(sexp, "width")?,
            layer: sexp.value_of("layer").unwrap_or_default().to_string(),
            net_name: Self::resolve_net(sexp, nets),
        })
    }

    fn parse_via(sexp: &SExp, nets: &[NetInfo]) -> Result<Via, BoardLoadError> {
        let layers = match sexp.find("layers") {
            Some(l) => (
                l.atom_at(1).unwrap_or("F.Cu").to_string(),
                l.atom_at(2).unwrap_or("B.Cu").to_string(),
            ),
            None => ("F.Cu".to_string(), "B.Cu".to_string()),
        };

        Ok(Via {
            position: Self::parse_point(sexp, "at")?,
            width: Self::parse_length(sexp, "size")?,
            drill: Self::parse_length(sexp, "drill")?,
            layers,
            net_name: Self::resolve_net(sexp, nets),
        })
    }

    fn parse_footprint(sexp: &SExp) -> Result<Footprint, BoardLoadError> {
        let at = sexp
            .find("at")
            .ok_or_else(|| BoardLoadError::MissingField("footprint at".to_string()))?;
        let position = Self::point_from(at, "at")?;
        let rotation = at.atom_at(3).and_then(|s| s.parse().ok()).unwrap_or(0.0);

        let mut reference = String::new();
        let mut value = String::new();

        // KiCad 8+
        for prop in sexp.find_all("property") {
            match (prop.atom_at(1), prop.atom_at(2)) {
                (Some("Reference"), Some(v)) => reference = v.to_string(),
                (Some("Value"), Some(v)) => value = v.to_string(),
                _ => {}
            }
        }

        // KiCad 6-7
        for text in sexp.find_all("fp_text") {
            match (text.atom_at(1), text.atom_at(2)) {
                (Some("reference"), Some(v)) if reference.is_empty() => reference = v.to_string(),
                (Some("value"), Some(v)) if value.is_empty() => value = v.to_string(),
                _ => {}
            }
        }

        Ok(Footprint {
            reference,
            value,
            lib_id: sexp.atom_at(1).unwrap_or_default().to_string(),
            layer: sexp.value_of("layer").unwrap_or("F.Cu").to_string(),
            position,
            rotation,
        })
    }

    fn parse_length(sexp: &SExp, key: &str) -> Result<Iu, BoardLoadError> {
        let raw = sexp
            .value_of(key)
            .ok_or_else(|| BoardLoadError::MissingField(key.to_string()))?;
        Self::parse_mm(raw, key)
    }

    fn parse_point(sexp: &SExp, key: &str) -> Result<Point, BoardLoadError> {
        let child = sexp
            .find(key)
            .ok_or_else(|| BoardLoadError::MissingField(key.to_string()))?;
        Self::point_from(child, key)
    }

    fn point_from(child: &SExp, key: &str) -> Result<Point, BoardLoadError> {
        match (child.atom_at(1), child.atom_at(2)) {
            (Some(x), Some(y)) => Ok(Point::new(Self::parse_mm(x, key)?, Self::parse_mm(y, key)?)),
            _ => Err(BoardLoadError::InvalidFormat(format!("Invalid '{}' format", key))),
        }
    }

    fn parse_mm(raw: &str, key: &str) -> Result<Iu, BoardLoadError> {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(mm_to_iu)
            .ok_or_else(|| BoardLoadError::InvalidFormat(format!("Invalid number for '{}': {}", key, raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOARD: &str = r#"(kicad_pcb (version 20240108) (generator "pcbnew")
  (net 0 "")
  (net 1 "GND")
  (net 2 "VBUS")
  (segment (start 0 0) (end 10 0) (width 0.25) (layer "F.Cu") (net 2))
  (arc (start 10 0) (mid 11 1) (end 12 0) (width 0.2) (layer "F.Cu") (net 1))
  (via (at 12 0) (size 0.6) (drill 0.3) (layers "F.Cu" "B.Cu") (net 1))
  (segment (start 0 5) (end 1 5) (width 0.15) (layer "B.Cu") (net "USB_D+"))
  (segment (start 0 5) (layer "B.Cu") (net 1))
  (footprint "Resistor_SMD:R_0603" (layer "B.Cu") (at 25.4 -3.2 180)
    (property "Reference" "R7")
    (property "Value" "4k7"))
)"#;

    #[test]
    fn test_mm_to_iu() {
        assert_eq!(mm_to_iu(0.25), 250_000);
        assert_eq!(mm_to_iu(0.1524), 152_400);
        assert_eq!(mm_to_iu(-3.2), -3_200_000);
    }

    #[test]
    fn test_tracks_keep_file_order_and_kind() {
        let board = Board::parse_str(BOARD, "t.kicad_pcb").unwrap();
        let kinds: Vec<_> = board
            .tracks()
            .iter()
            .map(|t| match t {
                BoardItem::Segment(_) => "segment",
                BoardItem::Arc(_) => "arc",
                BoardItem::Via(_) => "via",
            })
            .collect();
        // The incomplete segment is skipped.
        assert_eq!(kinds, vec!["segment", "arc", "via", "segment"]);
    }

    #[test]
    fn test_net_resolution() {
        let board = Board::parse_str(BOARD, "t.kicad_pcb").unwrap();
        let nets: Vec<_> = board.tracks().iter().map(BoardItem::net_name).collect();
        assert_eq!(nets, vec!["VBUS", "GND", "GND", "USB_D+"]);
        assert_eq!(board.net_name(0), Some(""));
        assert_eq!(board.nets().len(), 3);
    }

    #[test]
    fn test_via_dimensions() {
        let board = Board::parse_str(BOARD, "t.kicad_pcb").unwrap();
        let via = board
            .tracks()
            .iter()
            .find_map(|t| match t {
                BoardItem::Via(v) => Some(v),
                _ => None,
            })
            .unwrap();
        assert_eq!(via.width, 600_000);
        assert_eq!(via.drill, 300_000);
        assert_eq!(via.layers, ("F.Cu".to_string(), "B.Cu".to_string()));
    }

    #[test]
    fn test_footprint_properties() {
        let board = Board::parse_str(BOARD, "t.kicad_pcb").unwrap();
        let fp = &board.footprints()[0];
        assert_eq!(fp.reference, "R7");
        assert_eq!(fp.value, "4k7");
        assert_eq!(fp.position, Point::new(25_400_000, -3_200_000));
        assert_eq!(fp.rotation, 180.0);
        assert_eq!(fp.layer, "B.Cu");
    }

    #[test]
    fn test_rejects_other_roots() {
        let err = Board::parse_str("(kicad_sch (version 1))", "x").unwrap_err();
        assert!(matches!(err, BoardLoadError::InvalidFormat(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = Board::load(Path::new("no/such/board.kicad_pcb")).unwrap_err();
        assert!(matches!(err, BoardLoadError::Io(_)));
    }
}
