//! Capture one image and download it
//!
//! Usage: `cargo run --example capture_image [output-path]`
//!
//! Without an output path the image is left on the card and its location is
//! printed.

use std::path::PathBuf;

use gpbind::{Camera, Context, Result};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let destination = std::env::args().nth(1).map(PathBuf::from);

    let ctx = Context::from_env()?;
    let camera = Camera::open(&ctx)?;
    println!("{}", camera.summary()?.lines().next().unwrap_or_default());

    match camera.capture_image(destination.as_deref())? {
        Some(location) => println!("Image stored on the camera at {}", location),
        None => {
            if let Some(path) = destination {
                println!("Image saved to {}", path.display());
            }
        }
    }

    Ok(())
}
