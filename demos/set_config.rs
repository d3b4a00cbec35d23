//! Change one configuration setting
//!
//! Usage: `cargo run --example set_config <name> <value>`
//!
//! `name` is the widget name, e.g. `iso` or `shutterspeed`. The value is
//! converted according to the widget type.

use gpbind::{Camera, Context, GphotoError, Result, WidgetType};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let (name, value) = match (args.next(), args.next()) {
        (Some(name), Some(value)) => (name, value),
        _ => {
            eprintln!("usage: set_config <name> <value>");
            return Ok(());
        }
    };

    let ctx = Context::from_env()?;
    let camera = Camera::open(&ctx)?;
    let config = camera.config()?;
    let widget = config.child_by_name(&name)?;

    let invalid = || GphotoError::InvalidArgument(format!("{} is not a valid value for {}", value, name));
    match widget.widget_type()? {
        WidgetType::Toggle | WidgetType::Date => {
            widget.set_value(value.parse::<i32>().map_err(|_| invalid())?)?
        }
        WidgetType::Range => widget.set_value(value.parse::<f32>().map_err(|_| invalid())?)?,
        _ => widget.set_value(value.as_str())?,
    }

    camera.set_config(&config)?;
    println!("{} = {}", name, widget.value()?);
    Ok(())
}
