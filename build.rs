use std::process::Command;

fn git(args: &[&str]) -> Option<std::process::Output> {
    Command::new("git").args(args).output().ok()
}

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/");
    println!("cargo:rerun-if-changed=.git/refs/tags/");

    let git_hash = git(&["rev-parse", "--short", "HEAD"])
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map_or_else(|| "unknown".to_string(), |s| s.trim().to_string());

    // Release builds sit exactly on a v* tag
    let is_release =
        git(&["describe", "--exact-match", "--tags", "HEAD"]).is_some_and(|o| o.status.success());

    let is_dirty = git(&["status", "--porcelain"])
        .is_some_and(|output| output.status.success() && !output.stdout.is_empty());
    let dirty_suffix = if is_dirty { "-dirty" } else { "" };

    println!("cargo:rustc-env=TDD_GATE_GIT_HASH={git_hash}{dirty_suffix}");
    println!("cargo:rustc-env=TDD_GATE_IS_RELEASE={is_release}");
}
