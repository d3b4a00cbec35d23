//! End-to-end behaviour against the in-memory backend: retries, capture,
//! configuration and detection, plus handle accounting.

use std::cell::Cell;
use std::rc::Rc;

use gpbind::mock::{MockBackend, MockWidget};
use gpbind::{sys, Camera, CameraFilePath, Config, Context, DeviceReleaser, GphotoError};

struct CountingReleaser(Rc<Cell<usize>>);

impl DeviceReleaser for CountingReleaser {
    fn release(&self) {
        self.0.set(self.0.get() + 1);
    }
}

fn quiet_config() -> Config {
    Config::default()
        .with_unmount_command(None)
        .with_unmount_settle(Default::default())
}

fn context(mock: MockBackend) -> (Rc<MockBackend>, Context) {
    let mock = Rc::new(mock);
    let ctx = Context::with_backend(mock.clone(), quiet_config()).unwrap();
    (mock, ctx)
}

fn context_with_releaser(
    mock: MockBackend,
    config: Config,
) -> (Rc<MockBackend>, Rc<Cell<usize>>, Context) {
    let mock = Rc::new(mock);
    let releases = Rc::new(Cell::new(0));
    let ctx = Context::with_releaser(
        mock.clone(),
        config,
        Box::new(CountingReleaser(releases.clone())),
    )
    .unwrap();
    (mock, releases, ctx)
}

#[test]
fn test_init_recovers_from_lock() {
    let (mock, releases, ctx) = context_with_releaser(
        MockBackend::new().with_init_results(&[sys::GP_ERROR_IO_LOCK]),
        quiet_config(),
    );
    let camera = Camera::open(&ctx).unwrap();
    assert!(camera.is_initialized());
    assert_eq!(releases.get(), 1);
    assert_eq!(mock.calls("camera_init"), 2);
}

#[test]
fn test_init_gives_up_when_still_locked() {
    let (mock, releases, ctx) = context_with_releaser(
        MockBackend::new().with_init_results(&[sys::GP_ERROR_IO_LOCK; 5]),
        quiet_config().with_retries(2),
    );
    let err = Camera::open(&ctx).unwrap_err();
    assert!(err.is_lock_error());
    assert_eq!(mock.calls("camera_init"), 3);
    assert_eq!(releases.get(), 2);

    drop(ctx);
    assert_eq!(mock.live_objects(), 0);
}

#[test]
fn test_init_other_error_not_retried() {
    let (mock, releases, ctx) = context_with_releaser(
        MockBackend::new().with_init_results(&[sys::GP_ERROR_MODEL_NOT_FOUND]),
        quiet_config(),
    );
    let err = Camera::open(&ctx).unwrap_err();
    assert_eq!(err.code(), Some(sys::GP_ERROR_MODEL_NOT_FOUND));
    assert_eq!(mock.calls("camera_init"), 1);
    assert_eq!(releases.get(), 0);
}

#[test]
fn test_capture_to_destination() {
    let (mock, ctx) = context(MockBackend::new().with_capture(
        "/store_00010001/DCIM/100CANON",
        "IMG_0042.JPG",
        b"\xff\xd8picture\xff\xd9",
    ));
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("shot.jpg");

    let camera = Camera::open(&ctx).unwrap();
    let location = camera.capture_image(Some(target.as_path())).unwrap();
    assert_eq!(location, None);
    assert_eq!(std::fs::read(&target).unwrap(), b"\xff\xd8picture\xff\xd9");

    drop(camera);
    drop(ctx);
    assert_eq!(mock.live_objects(), 0);
}

#[test]
fn test_capture_returns_location() {
    let (_mock, ctx) = context(MockBackend::new().with_capture(
        "/store_00010001/DCIM/100CANON",
        "IMG_0042.JPG",
        b"data",
    ));
    let camera = Camera::open(&ctx).unwrap();
    let location = camera.capture_image(None).unwrap();
    assert_eq!(
        location,
        Some(CameraFilePath::new("/store_00010001/DCIM/100CANON", "IMG_0042.JPG"))
    );
    let file = camera
        .file("/store_00010001/DCIM/100CANON", "IMG_0042.JPG", gpbind::FileType::Normal)
        .unwrap();
    assert_eq!(file.data().unwrap(), b"data");
    assert_eq!(file.mime_type().unwrap(), "image/jpeg");
}

#[test]
fn test_capture_retries_busy_camera() {
    let (mock, ctx) = context(
        MockBackend::new().with_capture_results(&[sys::GP_ERROR_CAMERA_BUSY]),
    );
    let camera = Camera::open(&ctx).unwrap();
    assert!(camera.capture_image(None).unwrap().is_some());
    assert_eq!(mock.calls("camera_capture"), 2);
}

#[test]
fn test_capture_fatal_error_not_retried() {
    let (mock, ctx) = context(
        MockBackend::new().with_capture_results(&[sys::GP_ERROR_NOT_SUPPORTED]),
    );
    let camera = Camera::open(&ctx).unwrap();
    let err = camera.capture_image(None).unwrap_err();
    assert_eq!(err.code(), Some(sys::GP_ERROR_NOT_SUPPORTED));
    assert_eq!(mock.calls("camera_capture"), 1);
}

#[test]
fn test_preview_saved_and_returned() {
    let (mock, ctx) = context(MockBackend::new().with_preview_data(b"frame"));
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("preview.jpg");

    let camera = Camera::open(&ctx).unwrap();
    let frame = camera.capture_preview(Some(target.as_path())).unwrap();
    assert_eq!(frame.data().unwrap(), b"frame");
    assert_eq!(std::fs::read(&target).unwrap(), b"frame");

    drop((frame, camera, ctx));
    assert_eq!(mock.live_objects(), 0);
}

#[test]
fn test_preview_failure_releases_file() {
    let (mock, ctx) = context(
        MockBackend::new().with_preview_results(&[sys::GP_ERROR_NOT_SUPPORTED]),
    );
    let camera = Camera::open(&ctx).unwrap();
    let live = mock.live_objects();
    assert!(camera.capture_preview(None).is_err());
    assert_eq!(mock.live_objects(), live);
}

#[test]
fn test_download_missing_file_leaks_nothing() {
    let (mock, ctx) = context(MockBackend::new());
    let camera = Camera::open(&ctx).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let live = mock.live_objects();

    let err = camera
        .download_file("/store_00010001/DCIM/100CANON", "IMG_9999.JPG", dir.path().join("x.jpg"))
        .unwrap_err();
    assert_eq!(err.code(), Some(sys::GP_ERROR_FILE_NOT_FOUND));
    assert_eq!(mock.live_objects(), live);
    assert!(!dir.path().join("x.jpg").exists());
}

#[test]
fn test_config_listing() {
    let template = MockWidget::window("main", "Camera and Driver Configuration")
        .child(MockWidget::text("iso", "ISO Speed", "400"))
        .child(MockWidget::text("shutter", "Shutter Speed", "1/250"));
    let (mock, ctx) = context(MockBackend::new().with_config(template));
    let camera = Camera::open(&ctx).unwrap();

    assert_eq!(camera.list_config().unwrap(), vec!["main.iso", "main.shutter"]);
    drop(camera);
    drop(ctx);
    assert_eq!(mock.live_objects(), 0);
    assert_eq!(mock.invalid_handle_uses(), 0);
}

#[test]
fn test_config_write_reaches_device() {
    let template = MockWidget::window("main", "Camera and Driver Configuration").child(
        MockWidget::section("capturesettings", "Capture Settings")
            .child(MockWidget::toggle("autofocus", "Autofocus", 0))
            .child(MockWidget::menu("aperture", "Aperture", "5.6", &["4", "5.6", "8"])),
    );
    let (mock, ctx) = context(MockBackend::new().with_config(template));
    let camera = Camera::open(&ctx).unwrap();

    let config = camera.config().unwrap();
    config.child_by_name("autofocus").unwrap().set_value(1).unwrap();
    config.child_by_name("aperture").unwrap().set_value("8").unwrap();
    camera.set_config(&config).unwrap();

    let tree = camera.config_tree().unwrap();
    let aperture = tree
        .lookup("main.capturesettings.aperture")
        .and_then(|node| node.entry())
        .unwrap();
    assert_eq!(aperture.value.as_text(), Some("8"));
    assert_eq!(aperture.choices, vec!["4", "5.6", "8"]);
    let autofocus = tree
        .lookup("main.capturesettings.autofocus")
        .and_then(|node| node.entry())
        .unwrap();
    assert_eq!(autofocus.value.as_int(), Some(1));
    assert!(mock.config().is_some());
}

#[test]
fn test_autodetect_native() {
    let (_mock, ctx) = context(
        MockBackend::new()
            .with_detected("Canon EOS 5D", "usb:001,004")
            .with_detected("Nikon D90", "usb:001,005"),
    );
    let cameras = ctx.autodetect().unwrap();
    assert_eq!(
        cameras.entries().unwrap(),
        vec![
            ("Canon EOS 5D".to_string(), "usb:001,004".to_string()),
            ("Nikon D90".to_string(), "usb:001,005".to_string()),
        ]
    );
}

#[test]
fn test_autodetect_fallback_drops_bare_usb() {
    let (mock, ctx) = context(
        MockBackend::new()
            .without_autodetect()
            .with_detected("Canon EOS 5D", "usb:")
            .with_detected("Canon EOS 5D", "usb:001,004"),
    );
    let cameras = ctx.autodetect().unwrap();
    assert_eq!(
        cameras.entries().unwrap(),
        vec![("Canon EOS 5D".to_string(), "usb:001,004".to_string())]
    );
    assert_eq!(mock.calls("abilities_list_detect"), 1);
}

#[test]
fn test_autodetect_fallback_keeps_single_bare_usb() {
    let (_mock, ctx) = context(
        MockBackend::new()
            .without_autodetect()
            .with_detected("Canon EOS 5D", "usb:"),
    );
    let cameras = ctx.autodetect().unwrap();
    assert_eq!(cameras.count().unwrap(), 1);
    assert_eq!(cameras.value(0).unwrap(), "usb:");
}

#[test]
fn test_not_implemented_is_distinct() {
    let (_mock, ctx) = context(MockBackend::new());
    let camera = Camera::open(&ctx).unwrap();
    let err = camera.wait_for_event(100).unwrap_err();
    assert!(matches!(err, GphotoError::NotImplemented { .. }));
    assert_eq!(err.code(), None);
}
