//! Build script for nidaqmx-sys.
//!
//! Emits link directives for the NI-DAQmx runtime when the `nidaqmx-sdk`
//! feature is enabled. Without the feature the crate only carries the
//! declarations, so the workspace builds on machines without the driver.

use std::env;
use std::path::Path;

fn main() {
    println!("cargo:rerun-if-env-changed=NIDAQMX_LIB_DIR");

    if env::var_os("CARGO_FEATURE_NIDAQMX_SDK").is_none() {
        return;
    }

    if let Ok(dir) = env::var("NIDAQMX_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", dir);
    } else {
        let lib_paths = [
            "/usr/lib/x86_64-linux-gnu",
            "/usr/local/lib",
            "/usr/lib",
            "C:\\Program Files (x86)\\National Instruments\\Shared\\ExternalCompilerSupport\\C\\lib64\\msvc",
        ];

        for path in lib_paths {
            if Path::new(path).join("libnidaqmx.so").exists()
                || Path::new(path).join("NIDAQmx.lib").exists()
            {
                println!("cargo:rustc-link-search=native={}", path);
                break;
            }
        }
    }

    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("windows") {
        println!("cargo:rustc-link-lib=NIDAQmx");
    } else {
        println!("cargo:rustc-link-lib=nidaqmx");
    }
}
