use std::env;
use std::path::{Path, PathBuf};

fn looks_like_gphoto2_include(dir: &Path) -> bool {
    dir.join("gphoto2/gphoto2.h").exists() && dir.join("gphoto2/gphoto2-camera.h").exists()
}

fn find_gphoto2_include() -> Option<PathBuf> {
    // 1) Explicit override
    if let Ok(dir) = env::var("GPHOTO2_INCLUDE_DIR") {
        let dir = PathBuf::from(dir);
        if looks_like_gphoto2_include(&dir) {
            return Some(dir);
        }
        panic!(
            "GPHOTO2_INCLUDE_DIR is set but does not contain gphoto2/gphoto2.h: {}",
            dir.display()
        );
    }

    // 2) Usual system prefixes
    ["/usr/include", "/usr/local/include", "/opt/homebrew/include", "/opt/local/include"]
        .iter()
        .map(PathBuf::from)
        .find(|dir| looks_like_gphoto2_include(dir))
}

fn main() {
    println!("cargo:rerun-if-changed=wrapper.h");
    println!("cargo:rerun-if-env-changed=GPHOTO2_INCLUDE_DIR");

    // The library itself is opened at runtime, nothing is linked here. Headers
    // are only needed to cross-check the hand-declared layouts in `sys`.
    if env::var("CARGO_FEATURE_SYSTEM_HEADERS").is_err() {
        return;
    }

    generate_layout_bindings();
}

#[cfg(feature = "system-headers")]
fn generate_layout_bindings() {
    let include_dir = find_gphoto2_include().unwrap_or_else(|| {
        panic!(
            "system-headers feature is enabled, but gphoto2 headers were not found.\n\
\
Tried (in order):\n\
  - GPHOTO2_INCLUDE_DIR environment variable\n\
  - /usr/include, /usr/local/include, /opt/homebrew/include, /opt/local/include\n\
\
Install the libgphoto2 development package or set GPHOTO2_INCLUDE_DIR."
        )
    });

    println!(
        "cargo:rerun-if-changed={}/gphoto2/gphoto2-camera.h",
        include_dir.display()
    );
    println!(
        "cargo:rerun-if-changed={}/gphoto2/gphoto2-abilities-list.h",
        include_dir.display()
    );

    let bindings = bindgen::Builder::default()
        .header("wrapper.h")
        .clang_arg(format!("-I{}", include_dir.display()))
        .parse_callbacks(Box::new(bindgen::CargoCallbacks::new()))
        .allowlist_type("CameraFilePath")
        .allowlist_type("CameraText")
        .allowlist_type("CameraAbilities")
        .allowlist_type("CameraWidgetType")
        .allowlist_type("GPPortType")
        .allowlist_type("CameraOperation")
        .allowlist_type("CameraFileOperation")
        .allowlist_type("CameraFolderOperation")
        .allowlist_type("CameraDriverStatus")
        .allowlist_type("CameraCaptureType")
        .allowlist_type("CameraFileType")
        .allowlist_var("GP_OK")
        .allowlist_var("GP_ERROR.*")
        .prepend_enum_name(false)
        .derive_default(false)
        .derive_debug(false)
        .layout_tests(false)
        .generate()
        .expect("Unable to generate bindings");

    let out_path = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    bindings
        .write_to_file(out_path.join("gphoto2_layout.rs"))
        .expect("Couldn't write bindings!");
}

#[cfg(not(feature = "system-headers"))]
fn generate_layout_bindings() {
    let _ = find_gphoto2_include;
}
