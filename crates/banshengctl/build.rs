//! Embeds the release version shown by `banshengctl --version`

/// Release pipelines may pin the version; a blank override is ignored
fn release_version() -> String {
    match std::env::var("BANSHENG_VERSION") {
        Ok(pinned) if !pinned.trim().is_empty() => pinned.trim().to_string(),
        _ => env!("CARGO_PKG_VERSION").to_string(),
    }
}

fn main() {
    let version = release_version();
    let long_version = match std::env::var("PROFILE") {
        Ok(profile) if !profile.is_empty() => format!("{} ({} build)", version, profile),
        _ => version.clone(),
    };

    println!("cargo:rustc-env=BANSHENG_VERSION={}", version);
    println!("cargo:rustc-env=BANSHENG_LONG_VERSION={}", long_version);
    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-env-changed=BANSHENG_VERSION");
}
