use std::{env, fs, path::{Path, PathBuf}};

const SETTINGS_FILE: &str = "settings.json";

// Ship settings.json next to the binary so `cargo run` finds it.
fn main() {
    println!("cargo:rerun-if-changed={SETTINGS_FILE}");

    if !Path::new(SETTINGS_FILE).exists() {
        println!("cargo:warning={SETTINGS_FILE} not found, the server will need TODO_CHAT_SETTINGS");
        return;
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("cargo sets OUT_DIR"));
    let Some(profile_dir) = out_dir.ancestors().nth(3) else {
        println!("cargo:warning=unexpected OUT_DIR layout, {SETTINGS_FILE} not copied");
        return;
    };

    fs::copy(SETTINGS_FILE, profile_dir.join(SETTINGS_FILE))
        .unwrap_or_else(|e| panic!("failed to copy {SETTINGS_FILE}: {e}"));
}
