use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output();

    let package_version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let version = match output {
        Ok(o) if o.status.success() => {
            let git_output = String::from_utf8(o.stdout)
                .unwrap_or_default()
                .trim()
                .to_string();

            // Strip 'v' prefix if present (e.g., "v1.0.0" -> "1.0.0")
            let described = git_output.strip_prefix('v').unwrap_or(&git_output);
            if described.is_empty() {
                package_version
            } else {
                format!("{} ({})", package_version, described)
            }
        }
        _ => package_version,
    };

    println!("cargo:rustc-env=MODLOADER_VERSION={}", version);
}
