//! Integration tests against the installed libgphoto2
//!
//! Tests that need the library skip when it cannot be loaded; tests that
//! need a camera also skip when none is detected or when
//! `GPBIND_SKIP_CAMERA_TESTS` is set.

use gpbind::{Camera, Context, GphotoError, Result, WidgetType};

fn skip_camera_tests() -> bool {
    std::env::var("GPBIND_SKIP_CAMERA_TESTS").is_ok()
}

fn library_context() -> Option<Context> {
    match Context::from_env() {
        Ok(ctx) => Some(ctx),
        Err(err) => {
            eprintln!("Skipping: libgphoto2 not available ({})", err);
            None
        }
    }
}

/// A context and the first detected camera, or `None` when the test
/// should be skipped.
fn camera_context() -> Option<(Context, String, String)> {
    if skip_camera_tests() {
        eprintln!("Skipping due to GPBIND_SKIP_CAMERA_TESTS");
        return None;
    }
    let ctx = library_context()?;
    let cameras = ctx.autodetect().ok()?.entries().ok()?;
    match cameras.into_iter().next() {
        Some((model, port)) => Some((ctx, model, port)),
        None => {
            eprintln!("Skipping: no camera detected");
            None
        }
    }
}

#[test]
fn test_library_version() {
    let Some(ctx) = library_context() else { return };
    let version = ctx.library_version(false);
    assert!(version.ends_with('\n'));
    assert!(version.contains('.'));
    println!("libgphoto2 version: {}", version.trim_end());

    let verbose = ctx.library_version(true);
    assert!(verbose.lines().count() >= version.lines().count());
}

#[test]
fn test_registries() -> Result<()> {
    let Some(ctx) = library_context() else { return Ok(()) };
    let abilities = ctx.abilities_list()?;
    assert!(abilities.count()? > 0);
    let first = abilities.abilities(0)?;
    let index = abilities.lookup_model(&first.model())?;
    assert_eq!(abilities.abilities(index)?.model(), first.model());

    let ports = ctx.port_info_list()?;
    for port in ports.ports()? {
        println!("{}", port);
    }
    Ok(())
}

#[test]
fn test_unknown_model() {
    let Some(ctx) = library_context() else { return };
    let err = ctx
        .abilities_list()
        .and_then(|list| list.lookup_model("No Such Camera 3000"))
        .unwrap_err();
    assert!(matches!(err, GphotoError::Gphoto { .. }));
}

#[test]
fn test_autodetect_does_not_fail() -> Result<()> {
    if skip_camera_tests() {
        eprintln!("Skipping autodetect due to GPBIND_SKIP_CAMERA_TESTS");
        return Ok(());
    }
    let Some(ctx) = library_context() else { return Ok(()) };
    let cameras = ctx.autodetect()?;
    println!("{}", cameras);
    Ok(())
}

#[test]
fn test_open_summary_and_config() -> Result<()> {
    let Some((ctx, model, port)) = camera_context() else { return Ok(()) };
    let camera = Camera::open_at(&ctx, &model, &port)?;
    assert!(!camera.summary()?.is_empty());

    let config = camera.config()?;
    assert_eq!(config.widget_type()?, WidgetType::Window);
    for path in camera.list_config()? {
        println!("{}", path);
    }
    Ok(())
}

#[test]
fn test_capture_to_file() -> Result<()> {
    let Some((ctx, model, port)) = camera_context() else { return Ok(()) };
    let camera = Camera::open_at(&ctx, &model, &port)?;
    if !camera
        .abilities()?
        .operations()
        .contains(gpbind::CameraOperations::CAPTURE_IMAGE)
    {
        eprintln!("Skipping: {} cannot capture", model);
        return Ok(());
    }

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("capture.jpg");
    assert_eq!(camera.capture_image(Some(target.as_path()))?, None);
    assert!(std::fs::metadata(&target).unwrap().len() > 0);
    Ok(())
}
