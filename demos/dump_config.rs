//! Dump every configuration setting of the attached camera
//!
//! Each line shows the dotted path, the current value and the label, with the
//! available choices underneath.

use gpbind::{Camera, Context, Result};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let ctx = Context::from_env()?;
    let camera = Camera::open(&ctx)?;

    for entry in camera.config_entries()? {
        let readonly = if entry.readonly { " [read-only]" } else { "" };
        println!("{}{}", entry, readonly);
    }

    Ok(())
}
