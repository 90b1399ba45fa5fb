use std::env;
use std::process::Command;

/// Stdout of a successful `git` invocation, trimmed.
fn git(args: &[&str]) -> Option<String> {
    let out = Command::new("git").args(args).output().ok()?;
    out.status
        .success()
        .then(|| String::from_utf8_lossy(&out.stdout).trim().to_string())
}

fn main() {
    // Source tarballs have no .git; packagers can pin the commit instead.
    println!("cargo:rerun-if-env-changed=ENCLOSE_BUILD_COMMIT");
    let commit = env::var("ENCLOSE_BUILD_COMMIT").ok().unwrap_or_else(|| {
        match git(&["rev-parse", "--short", "HEAD"]) {
            Some(hash) if git(&["status", "--porcelain"]).is_some_and(|s| !s.is_empty()) => {
                format!("{hash}-dirty")
            }
            Some(hash) => hash,
            None => "unknown".into(),
        }
    });

    println!("cargo:rustc-env=ENCLOSE_BUILD_COMMIT={commit}");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
}
