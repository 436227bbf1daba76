use std::env;

use anyhow::*;
use fs_extra::{copy_items, dir::CopyOptions};

fn main() -> Result<()> {
    // Re-run when any model asset in `content/` changes.
    println!("cargo:rerun-if-changed=content/*");

    // Native builds resolve asset locators against `$OUT_DIR/content`, so the
    // content directory is mirrored there on every build.
    let out_dir = env::var("OUT_DIR")?;

    let copy_options = CopyOptions::new().overwrite(true);
    copy_items(&["content/"], out_dir, &copy_options)?;

    Ok(())
}
