//! Builds the hardware model binding when the `verilated` feature is enabled.
//!
//! `csrc/tbsim_model.cpp` wraps a Verilator-generated top in the C ABI that
//! `src/sim/ffi.rs` declares. The model must already be verilated with
//! `--build`, so its output directory holds the generated header, the model
//! archive and `libverilated.a`. Inputs come from the environment:
//!
//! * `TBSIM_VERILATOR_OBJ_DIR` - Verilator output directory (required).
//! * `TBSIM_VERILATOR_TOP` - generated class name (default `VVerilatorTestCore`).
//! * `TBSIM_VERILATOR_TRACE` - `1` if the model was verilated with `--trace`.
//! * `VERILATOR_ROOT` - Verilator install; asked from `verilator --getenv` if unset.
//! * `CXX` - C++ compiler; otherwise the first of `c++`, `g++`, `clang++` on `PATH`.

use std::env;
use std::path::PathBuf;
use std::process::Command;

const DEFAULT_TOP: &str = "VVerilatorTestCore";
const WRAPPER: &str = "csrc/tbsim_model.cpp";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed={WRAPPER}");
    for var in [
        "TBSIM_VERILATOR_OBJ_DIR",
        "TBSIM_VERILATOR_TOP",
        "TBSIM_VERILATOR_TRACE",
        "VERILATOR_ROOT",
        "CXX",
        "AR",
    ] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    if env::var_os("CARGO_FEATURE_VERILATED").is_none() {
        return;
    }

    if let Err(e) = build_model() {
        panic!("hardware model build failed: {e}");
    }
}

fn build_model() -> Result<(), String> {
    let manifest = PathBuf::from(env::var("CARGO_MANIFEST_DIR").map_err(|e| e.to_string())?);
    let out_dir = PathBuf::from(env::var("OUT_DIR").map_err(|e| e.to_string())?);

    let obj_dir = env::var_os("TBSIM_VERILATOR_OBJ_DIR")
        .map(PathBuf::from)
        .ok_or("TBSIM_VERILATOR_OBJ_DIR is not set")?;
    let top = env::var("TBSIM_VERILATOR_TOP").unwrap_or_else(|_| DEFAULT_TOP.to_string());
    let header = obj_dir.join(format!("{top}.h"));
    if !header.is_file() {
        return Err(format!(
            "{} not found; verilate the model with --build first",
            header.display()
        ));
    }
    let traced = env::var("TBSIM_VERILATOR_TRACE").is_ok_and(|v| v == "1");
    let include = verilator_root()?.join("include");
    let cxx = find_cxx().ok_or("no C++ compiler found")?;

    let obj = out_dir.join("tbsim_model.o");
    run(
        Command::new(&cxx)
            .arg("-std=c++17")
            .arg("-O2")
            .arg("-fPIC")
            .arg(format!("-DTBSIM_TOP={top}"))
            .arg(format!("-DTBSIM_TOP_HEADER=\"{top}.h\""))
            .arg(format!("-DVM_TRACE={}", u8::from(traced)))
            .arg("-I")
            .arg(&obj_dir)
            .arg("-I")
            .arg(&include)
            .arg("-I")
            .arg(include.join("vltstd"))
            .arg("-c")
            .arg(manifest.join(WRAPPER))
            .arg("-o")
            .arg(&obj),
        "c++ (model wrapper)",
    )?;

    let ar = env::var("AR").unwrap_or_else(|_| "ar".to_string());
    run(
        Command::new(ar)
            .arg("crs")
            .arg(out_dir.join("libtbsim_model.a"))
            .arg(&obj),
        "ar",
    )?;

    println!("cargo:rustc-link-search=native={}", out_dir.display());
    println!("cargo:rustc-link-search=native={}", obj_dir.display());
    println!("cargo:rustc-link-lib=static=tbsim_model");
    // Verilator names the model archive without a `lib` prefix.
    println!("cargo:rustc-link-lib=static:+verbatim={top}__ALL.a");
    println!("cargo:rustc-link-lib=static=verilated");

    let cxx_runtime = match env::var("CARGO_CFG_TARGET_OS").as_deref() {
        Ok("macos" | "ios") => "c++",
        _ => "stdc++",
    };
    println!("cargo:rustc-link-lib=dylib={cxx_runtime}");
    Ok(())
}

fn verilator_root() -> Result<PathBuf, String> {
    if let Some(root) = env::var_os("VERILATOR_ROOT") {
        return Ok(PathBuf::from(root));
    }
    let verilator = which::which("verilator")
        .map_err(|_| "VERILATOR_ROOT is not set and verilator is not on PATH")?;
    let out = Command::new(verilator)
        .arg("--getenv")
        .arg("VERILATOR_ROOT")
        .output()
        .map_err(|e| e.to_string())?;
    let root = String::from_utf8_lossy(&out.stdout).trim().to_string();
    if !out.status.success() || root.is_empty() {
        return Err("verilator --getenv VERILATOR_ROOT returned nothing".to_string());
    }
    Ok(PathBuf::from(root))
}

fn find_cxx() -> Option<PathBuf> {
    if let Some(cxx) = env::var_os("CXX") {
        return Some(PathBuf::from(cxx));
    }
    ["c++", "g++", "clang++"]
        .into_iter()
        .find_map(|name| which::which(name).ok())
}

fn run(cmd: &mut Command, what: &str) -> Result<(), String> {
    let out = cmd.output().map_err(|e| format!("{what}: {e}"))?;
    if !out.status.success() {
        return Err(format!(
            "{} failed:\n{}\n{}",
            what,
            String::from_utf8_lossy(&out.stdout),
            String::from_utf8_lossy(&out.stderr)
        ));
    }
    Ok(())
}
