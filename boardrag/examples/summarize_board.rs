//! Summarize a board and print the query the reviewer would send.

use anyhow::Context;
use boardrag::ai::{design_query, DesignStats};
use std::path::Path;

fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/board.kicad_pcb".to_string());
    let path = Path::new(&path);

    let summary = boardrag::extract_board(path)
        .with_context(|| format!("summarizing {}", path.display()))?;

    println!("Board: {}", path.display());
    println!("  Traces:     {}", summary.tracks.len());
    println!("  Vias:       {}", summary.vias.len());
    println!("  Components: {}", summary.components.len());
    println!("  Nets:       {}", summary.nets.join(", "));

    if let Some(width) = summary.min_track_width_mm() {
        let narrowest: Vec<_> = summary
            .tracks
            .iter()
            .filter(|t| t.width_mm == width)
            .map(|t| if t.net.is_empty() { "<no net>" } else { t.net.as_str() })
            .collect();
        println!("  Narrowest:  {:.3} mm on {}", width, narrowest.join(", "));
    }

    println!("\nReview query:");
    println!("{}", design_query(&DesignStats::from_summary(&summary)).trim());
    Ok(())
}
