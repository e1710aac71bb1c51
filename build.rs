use std::process::Command;

fn main() {
    let built_at = chrono::Utc::now().format("%Y-%m-%d").to_string();
    println!("cargo:rustc-env=WATTGRID_BUILD_DATE={built_at}");

    let revision = git(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "unknown".into());
    println!("cargo:rustc-env=WATTGRID_GIT_HASH={revision}");

    println!("cargo:rerun-if-changed=.git/HEAD");
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}
