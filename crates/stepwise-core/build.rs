//! Build script for stepwise-core
//!
//! This script checks system requirements before compilation:
//! - Minimum Rust version (1.69.0, the oldest toolchain `nix` 0.29 builds with)
//! - Target platform (the ptrace backend exists for Linux on x86-64 only)
//!
//! The target is read from Cargo's `CARGO_CFG_*` variables, not from `cfg!`,
//! which would describe the host running the build script.

fn main()
{
    println!("cargo:rerun-if-changed=build.rs");

    check_rust_version();
    check_target();
}

fn check_rust_version()
{
    let (Ok(found), Ok(minimum)) = (rustc_version::version(), rustc_version::Version::parse("1.69.0")) else {
        // Some build environments hide rustc; don't fail over it.
        println!("cargo:warning=could not verify Rust version");
        return;
    };

    assert!(
        found >= minimum,
        "stepwise-core requires Rust {minimum} or newer, found {found}"
    );
}

fn check_target()
{
    let os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();

    if os != "linux" || arch != "x86_64" {
        println!(
            "cargo:warning=stepwise-core: no ptrace backend for {os}/{arch}; only the platform-agnostic engine will be \
             built"
        );
    }
}
