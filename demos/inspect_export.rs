//! Example showing how a single Signature export is classified.

use mooring_convert::{build_chunk, ExportLoader, JsonExportLoader};
use std::path::PathBuf;

fn main() -> Result<(), mooring_convert::Error> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("SIG1234_1.json"));

    let export = JsonExportLoader.load(&path)?;
    let chunk = build_chunk(&export)?;

    println!("═══════════════════════════════════════");
    println!("Signature Export: {}", path.display());
    println!("═══════════════════════════════════════");
    println!();

    for burst in &chunk.datasets {
        let ds = burst.dataset();
        println!("📊 {} ({} samples)", burst.kind(), ds.len());
        for (name, var) in ds.variables() {
            println!("    - {} {:?}", name, var.dims);
        }
        println!();
    }

    if !chunk.report.ignored.is_empty() {
        println!("💤 Ignored (burst type disabled): {}", chunk.report.ignored.len());
    }

    println!("⚠️  Not placed:");
    for field in &chunk.report.unclassified {
        println!("    - {}", field);
    }
    if chunk.report.unclassified.is_empty() {
        println!("    (none)");
    }

    Ok(())
}
