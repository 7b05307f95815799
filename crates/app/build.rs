use std::{env, path::PathBuf};

fn main() {
    println!("cargo:rustc-check-cfg=cfg(render_stub)");
    println!("cargo:rerun-if-env-changed=GFX_RENDER_LIB_DIR");
    let target = env::var("TARGET").expect("TARGET missing");

    let (lib_name, system_libs): (&str, &[&str]) = if target.contains("apple-darwin") {
        (
            "render_x86_64",
            &["framework=Cocoa", "framework=AudioToolbox"],
        )
    } else if target.contains("linux") {
        ("render", &["X11", "asound"])
    } else {
        println!("cargo:warning=No prebuilt renderer for target {target}; using stub renderer");
        println!("cargo:rustc-cfg=render_stub");
        return;
    };

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let repo_root = manifest_dir.parent().unwrap().parent().unwrap();
    let lib_dir = env::var_os("GFX_RENDER_LIB_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| repo_root.join("lib"));
    println!("cargo:rerun-if-changed={}", lib_dir.display());

    let found = ["a", "so", "dylib"]
        .iter()
        .any(|ext| lib_dir.join(format!("lib{lib_name}.{ext}")).exists());
    if !found {
        println!(
            "cargo:warning=lib{lib_name} not found in {}; using stub renderer",
            lib_dir.display()
        );
        println!("cargo:rustc-cfg=render_stub");
        return;
    }

    println!("cargo:rustc-link-search=native={}", lib_dir.display());
    println!("cargo:rustc-link-lib={lib_name}");
    for lib in system_libs {
        println!("cargo:rustc-link-lib={lib}");
    }
}
