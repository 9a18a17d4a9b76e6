pub mod board;
pub mod sexp;

// Re-export for convenience
pub use board::{
    mm_to_iu, Board, BoardItem, BoardLoadError, Footprint, Iu, NetInfo, Point, TrackArc,
    TrackSegment, Via, IU_PER_MM,
};
pub use sexp::{ParseError, SExp, SExpParser};
