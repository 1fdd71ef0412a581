//! bgremove-tiles CLI
//!
//! Removes image backgrounds with rembg-style ONNX models, optionally in four
//! parallel tiles or over a whole directory.

#[cfg(feature = "cli")]
use bgremove_tiles::cli;

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    cli::main()
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
