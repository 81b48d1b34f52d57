use std::env;
use std::path::PathBuf;

/// Point Windows users at a vcpkg FFmpeg install so `ffmpeg-sys-next` can
/// find the libraries the video source links against.
fn main() {
    for var in ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    if env::var("CARGO_CFG_TARGET_OS").unwrap_or_default() != "windows"
        || env::var_os("FFMPEG_DIR").is_some()
    {
        return;
    }

    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        println!(
            "cargo:warning=framepersist decodes video through FFmpeg; set FFMPEG_DIR (or VCPKG_ROOT) to locate it on Windows."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let candidate = PathBuf::from(vcpkg_root).join("installed").join(triplet);

    if candidate.exists() {
        println!(
            "cargo:warning=Found vcpkg FFmpeg at {0}; export FFMPEG_DIR={0} to skip discovery.",
            candidate.display(),
        );
    } else {
        println!(
            "cargo:warning=VCPKG_ROOT is set but {} does not contain an FFmpeg install.",
            candidate.display(),
        );
    }
}
