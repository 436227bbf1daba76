use std::path::{Component, Path, PathBuf};

use cfg_if::cfg_if;
use tracing::info;

use crate::content::LoadError;

/// The location model locators are resolved against.
///
/// Native builds read files from a directory, web builds fetch them relative to
/// the page origin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetBase {
    root: PathBuf,
}

impl AssetBase {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// The `content/` directory that `build.rs` mirrors into the build output,
    /// or the page origin itself on the web.
    pub fn bundled() -> Self {
        cfg_if! {
            if #[cfg(target_arch = "wasm32")] {
                Self::new("")
            } else {
                Self::new(Path::new(env!("OUT_DIR")).join("content"))
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `locator` against this base. Locators must be relative and may
    /// not climb out of the base with `..`.
    pub fn resolve(&self, locator: &str) -> Result<PathBuf, LoadError> {
        let relative = Path::new(locator);

        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

        if locator.is_empty() || escapes {
            return Err(LoadError::InvalidLocator(locator.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

/// Converts a load file path to a URL the page's HTTP server will recognize.
#[cfg(target_arch = "wasm32")]
fn format_url(path: &Path) -> Result<reqwest::Url, LoadError> {
    let invalid = || LoadError::InvalidLocator(path.display().to_string());

    let origin = web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .ok_or_else(invalid)?;
    let base_url = reqwest::Url::parse(&format!("{origin}/")).map_err(|_| invalid())?;
    let final_url = base_url
        .join(path.to_str().ok_or_else(invalid)?)
        .map_err(|_| invalid())?;

    info!("url for load file request: {final_url:?}");
    Ok(final_url)
}

/// Loads a file relative to `base` and returns it as a string.
pub async fn load_as_string(base: &AssetBase, locator: &str) -> Result<String, LoadError> {
    let bytes = load_as_binary(base, locator).await?;
    String::from_utf8(bytes).map_err(|e| LoadError::Malformed {
        locator: locator.to_string(),
        reason: e.to_string(),
    })
}

/// Loads a file relative to `base` and returns it as a vector of bytes.
pub async fn load_as_binary(base: &AssetBase, locator: &str) -> Result<Vec<u8>, LoadError> {
    let path = base.resolve(locator)?;
    info!("load file as binary: {path:?}");

    cfg_if! {
      if #[cfg(target_arch = "wasm32")] {
        let fetch_err = |e: reqwest::Error| LoadError::Fetch {
            locator: locator.to_string(),
            reason: e.to_string(),
        };
        let response = reqwest::get(format_url(&path)?)
            .await
            .and_then(|r| r.error_for_status())
            .map_err(fetch_err)?;
        Ok(response.bytes().await.map_err(fetch_err)?.to_vec())
      } else {
        std::fs::read(&path).map_err(|source| LoadError::Io {
            locator: locator.to_string(),
            source,
        })
      }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_locators_under_the_root() {
        let base = AssetBase::new("/srv/content");
        assert_eq!(
            PathBuf::from("/srv/content/models/jellyfish.glb"),
            base.resolve("models/jellyfish.glb").unwrap()
        );
        assert_eq!(
            PathBuf::from("/srv/content/./jellyfish.glb"),
            base.resolve("./jellyfish.glb").unwrap()
        );
    }

    #[test]
    fn rejects_locators_outside_the_root() {
        let base = AssetBase::new("/srv/content");

        for bad in ["", "../secret.glb", "models/../../x.glb", "/etc/passwd"] {
            assert!(
                matches!(base.resolve(bad), Err(LoadError::InvalidLocator(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let base = AssetBase::new(std::env::temp_dir().join("underwater-missing-assets"));
        let result = pollster::block_on(load_as_binary(&base, "nope.glb"));
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }

    #[test]
    fn bundled_content_contains_the_jellyfish() {
        let base = AssetBase::bundled();
        let bytes = pollster::block_on(load_as_binary(&base, "jellyfish.glb")).unwrap();
        assert_eq!(b"glTF", &bytes[0..4]);
    }
}
