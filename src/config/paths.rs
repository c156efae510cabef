// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Safe resolution of source urls against the configured file root.

use crate::errors::ConstructionError;
use std::path::{Component, Path, PathBuf};

/// Check that a source url stays inside the file root once resolved.
///
/// The url must be relative and must not contain parent-directory
/// components; the check is purely lexical so it can run at block
/// construction time, before any settings are available.
pub fn validate_source_url(url: &str) -> Result<(), ConstructionError> {
    let path = Path::new(url);
    if path.is_absolute() {
        return Err(ConstructionError::UnsafePath {
            url: url.to_string(),
        });
    }
    for component in path.components() {
        match component {
            Component::ParentDir | Component::Prefix(_) | Component::RootDir => {
                return Err(ConstructionError::UnsafePath {
                    url: url.to_string(),
                })
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }
    Ok(())
}

/// Resolve a previously validated url against the file root.
pub fn resolve_under_root(root: &Path, url: &str) -> PathBuf {
    root.join(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_urls_are_accepted() {
        assert!(validate_source_url("parcels.json").is_ok());
        assert!(validate_source_url("nested/dir/parcels.json").is_ok());
    }

    #[test]
    fn escaping_urls_are_rejected() {
        assert!(validate_source_url("/etc/passwd").is_err());
        assert!(validate_source_url("../outside.json").is_err());
        assert!(validate_source_url("nested/../../outside.json").is_err());
    }

    #[test]
    fn resolution_joins_the_root() {
        let resolved = resolve_under_root(Path::new("/data"), "parcels.json");
        assert_eq!(resolved, PathBuf::from("/data/parcels.json"));
    }
}
