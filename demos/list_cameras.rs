//! Camera discovery example
//!
//! Prints the libgphoto2 version, the detected cameras and the abilities of
//! each one. Set `RUST_LOG=gpbind=debug` to see every native call.

use gpbind::{Context, Result};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let ctx = Context::from_env()?;
    println!("gpbind - Camera Discovery Example");
    println!("=================================");
    print!("libgphoto2 {}", ctx.library_version(false));
    println!();

    let cameras = ctx.autodetect()?.entries()?;
    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Found {} camera(s):", cameras.len());
    let abilities = ctx.abilities_list()?;
    for (index, (model, port)) in cameras.iter().enumerate() {
        println!("  [{}] {} on {}", index, model, port);
        match abilities.abilities_for_model(model) {
            Ok(abilities) => {
                for line in abilities.to_string().lines() {
                    println!("      {}", line);
                }
            }
            Err(e) => println!("      no driver entry: {}", e),
        }
    }

    Ok(())
}
