//! Resolution of README and manifest asset references to raw GitHub URLs.

use url::Url;

use crate::error::{RegistryError, Result};

const GITHUB_HOST: &str = "github.com";
const USER_CONTENT_DOMAIN: &str = "githubusercontent.com";

/// An absolute http(s) URL on `github.com`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubUrl(Url);

impl GithubUrl {
    pub fn parse(input: &str) -> Option<Self> {
        let url = Url::parse(input.trim()).ok()?;
        (is_http(&url) && url.host_str() == Some(GITHUB_HOST)).then_some(Self(url))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The path segment after `{owner}/{repo}`, e.g. `blob` or `raw`.
    fn route(&self) -> Option<&str> {
        self.0.path_segments()?.nth(2)
    }
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// A classified asset reference. Classification tries each form in
/// declaration order and takes the first that matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRef {
    /// `https://github.com/{owner}/{repo}/blob/{ref}/{path}`
    GithubBlob(GithubUrl),
    /// `https://github.com/{owner}/{repo}/raw/{ref}/{path}`
    GithubRaw(GithubUrl),
    /// Any URL on a `githubusercontent.com` host.
    UserContent(Url),
    /// A path inside the repository named by the manifest homepage.
    Relative { homepage: GithubUrl, path: String },
}

impl AssetRef {
    pub fn classify(homepage: &str, reference: &str) -> Result<Self> {
        let reference = reference.trim();
        Self::github(reference)
            .or_else(|| Self::user_content(reference))
            .or_else(|| Self::relative(homepage, reference))
            .ok_or_else(|| RegistryError::InvalidAsset(reference.to_string()))
    }

    /// Classifies `reference` and returns its raw download URL.
    pub fn resolve(homepage: &str, reference: &str) -> Result<String> {
        Self::classify(homepage, reference).map(|asset| asset.to_raw_url())
    }

    fn github(reference: &str) -> Option<Self> {
        let url = GithubUrl::parse(reference)?;
        let route = url.route().unwrap_or_default().to_string();
        match route.as_str() {
            "blob" => Some(Self::GithubBlob(url)),
            "raw" => Some(Self::GithubRaw(url)),
            _ => None,
        }
    }

    fn user_content(reference: &str) -> Option<Self> {
        let url = Url::parse(reference).ok()?;
        let host = url.host_str()?;
        let on_user_content = host == USER_CONTENT_DOMAIN
            || host.ends_with(&format!(".{USER_CONTENT_DOMAIN}"));
        (is_http(&url) && on_user_content).then_some(Self::UserContent(url))
    }

    fn relative(homepage: &str, reference: &str) -> Option<Self> {
        if reference.starts_with("//") || Url::parse(reference).is_ok() {
            return None;
        }
        let path = reference.trim_start_matches("./").trim_start_matches('/');
        if path.is_empty() {
            return None;
        }
        Some(Self::Relative {
            homepage: GithubUrl::parse(homepage)?,
            path: path.to_string(),
        })
    }

    pub fn to_raw_url(&self) -> String {
        match self {
            Self::GithubBlob(url) => url.as_str().replacen("/blob/", "/raw/", 1),
            Self::GithubRaw(url) => url.as_str().to_string(),
            Self::UserContent(url) => url.to_string(),
            Self::Relative { homepage, path } => format!(
                "{}/raw/master/{path}",
                homepage.as_str().trim_end_matches('/')
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOMEPAGE: &str = "https://github.com/user/repo";

    #[test]
    fn test_blob_url_becomes_raw() {
        let url = AssetRef::resolve(
            HOMEPAGE,
            "https://github.com/user/repo/blob/master/path/to/asset.png",
        )
        .unwrap();
        assert_eq!(url, "https://github.com/user/repo/raw/master/path/to/asset.png");
    }

    #[test]
    fn test_raw_url_is_unchanged() {
        let raw = "https://github.com/user/repo/raw/master/path/to/asset.png";
        assert_eq!(AssetRef::resolve(HOMEPAGE, raw).unwrap(), raw);
    }

    #[test]
    fn test_user_content_is_unchanged() {
        let raw = "https://raw.githubusercontent.com/user/repo/master/asset.png";
        let asset = AssetRef::classify(HOMEPAGE, raw).unwrap();

        assert!(matches!(asset, AssetRef::UserContent(_)));
        assert_eq!(asset.to_raw_url(), raw);
    }

    #[test]
    fn test_relative_path() {
        for path in ["path/to/asset.png", "./path/to/asset.png", "/path/to/asset.png"] {
            assert_eq!(
                AssetRef::resolve(HOMEPAGE, path).unwrap(),
                "https://github.com/user/repo/raw/master/path/to/asset.png"
            );
        }
    }

    #[test]
    fn test_relative_path_needs_github_homepage() {
        let err = AssetRef::resolve("https://example.com", "path/to/asset.png").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidAsset(_)));
    }

    #[test]
    fn test_foreign_urls_are_rejected() {
        for reference in [
            "https://example.com/asset.png",
            "https://github.com/user/repo",
            "//cdn.example.com/asset.png",
            "data:image/png;base64,AAAA",
            "",
        ] {
            assert!(
                AssetRef::resolve(HOMEPAGE, reference).is_err(),
                "{reference} should be rejected"
            );
        }
    }
}
