//! Grab a few live-view frames
//!
//! Usage: `cargo run --example capture_preview [count] [output-dir]`

use std::path::PathBuf;

use gpbind::{Camera, Context, Result};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let count: usize = args.next().and_then(|n| n.parse().ok()).unwrap_or(5);
    let out_dir = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));

    let ctx = Context::from_env()?;
    let camera = Camera::open(&ctx)?;

    for index in 0..count {
        let path = out_dir.join(format!("preview_{:03}.jpg", index));
        match camera.capture_preview(Some(path.as_path())) {
            Ok(frame) => println!(
                "Frame {}: {} bytes, {} -> {}",
                index,
                frame.data()?.len(),
                frame.mime_type()?,
                path.display()
            ),
            Err(e) => {
                eprintln!("Preview failed: {}", e);
                break;
            }
        }
    }

    Ok(())
}
