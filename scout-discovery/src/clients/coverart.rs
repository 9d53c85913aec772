//! Cover Art Archive URLs

use crate::types::CoverArt;

pub const COVER_ART_ARCHIVE_URL: &str = "https://coverartarchive.org";

/// Builds release-group front cover URLs without touching the network
#[derive(Debug, Clone)]
pub struct CoverArtArchive {
    base_url: String,
}

impl Default for CoverArtArchive {
    fn default() -> Self {
        Self {
            base_url: COVER_ART_ARCHIVE_URL.to_string(),
        }
    }
}

impl CoverArt for CoverArtArchive {
    fn cover_url(&self, release_group_mbid: &str) -> Option<String> {
        if release_group_mbid.is_empty() {
            return None;
        }
        Some(format!(
            "{}/release-group/{}/front-250",
            self.base_url, release_group_mbid
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cover_url() {
        let archive = CoverArtArchive::default();
        assert_eq!(
            archive.cover_url("rg-1").as_deref(),
            Some("https://coverartarchive.org/release-group/rg-1/front-250")
        );
        assert!(archive.cover_url("").is_none());
    }
}
