use std::env;
use std::path::PathBuf;

fn main() {
    // Get the target directory
    let out_dir = match env::var("OUT_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => return,
    };
    let target_dir = match out_dir.ancestors().nth(3) {
        Some(dir) => dir.to_path_buf(),
        None => return,
    };

    // For iOS/macOS targets, link against system frameworks
    let target = env::var("TARGET").unwrap_or_default();
    if target.contains("apple") {
        println!("cargo:rustc-link-lib=framework=Foundation");
        if target.contains("ios") {
            println!("cargo:rustc-link-lib=framework=UIKit");
        }
    }

    // Copy header file to target directory
    let header_src = "include/smart_compressor.h";
    let header_dst = target_dir.join("smart_compressor.h");

    if std::path::Path::new(header_src).exists() {
        if let Err(e) = std::fs::copy(header_src, &header_dst) {
            println!("cargo:warning=Failed to copy header file: {}", e);
        }
        println!("cargo:rerun-if-changed={}", header_src);
    }

    println!("cargo:rerun-if-changed=src/");
}
