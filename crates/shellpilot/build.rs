// Build script for shellpilot - embeds version at compile time

fn main() {
    // Get version from environment (set by release CI) or Cargo.toml
    let version = std::env::var("SHELLPILOT_VERSION")
        .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=SHELLPILOT_VERSION={}", version);

    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-env-changed=SHELLPILOT_VERSION");
}
