fn main() {
    set_version();
}

/// Make the package version, with the short git hash when available,
/// visible to the build as `CFSPEED_VERSION`.
fn set_version() {
    use std::process::Command;

    let version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();

    let args = &["rev-parse", "--short=10", "HEAD"];
    let rev = Command::new("git")
        .args(args)
        .output()
        .map(|output| {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        })
        .unwrap_or_default();

    if rev.is_empty() {
        println!("cargo:rustc-env=CFSPEED_VERSION={}", version);
    } else {
        println!("cargo:rustc-env=CFSPEED_VERSION={} (rev {})", version, rev);
    }
}
