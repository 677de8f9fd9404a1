//! Mirror selection and URL rewriting.
//!
//! The installer supports exactly two upstream origins: Mojang's own
//! infrastructure, used verbatim, and BMCLAPI, a community mirror that
//! requires rewriting specific hosts in URLs that originate from Mojang's
//! manifest/metadata documents.

const MOJANG_MANIFEST_URL: &str = "https://launchermeta.mojang.com/mc/game/version_manifest.json";
const BMCLAPI_MANIFEST_URL: &str = "https://bmclapi2.bangbang93.com/mc/game/version_manifest.json";

const MOJANG_ASSETS_BASE: &str = "https://resources.download.minecraft.net";
const BMCLAPI_ASSETS_BASE: &str = "https://bmclapi2.bangbang93.com/assets";

const META_HOST_MOJANG: &str = "piston-meta.mojang.com";
const META_HOST_BMCLAPI: &str = "bmclapi2.bangbang93.com";

const LIBRARIES_HOST_MOJANG: &str = "https://libraries.minecraft.net";
const LIBRARIES_HOST_BMCLAPI: &str = "https://bmclapi2.bangbang93.com/maven";

/// The download origins the installer knows about. `Mojang` and `Bmclapi`
/// are the only ones selectable from the CLI or from [`Mirror::from_str`];
/// `Custom` exists so callers embedding the installer (including its own
/// test suite) can point it at an arbitrary origin, such as a local stub
/// server, without the installer needing to know about a third upstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mirror {
    Mojang,
    Bmclapi,
    Custom { manifest_url: String, assets_base: String },
}

impl Mirror {
    /// Build a mirror pointed at the given manifest and assets base URLs,
    /// with no host rewriting applied to any URL read from its documents.
    pub fn custom(manifest_url: impl Into<String>, assets_base: impl Into<String>) -> Self {
        Mirror::Custom { manifest_url: manifest_url.into(), assets_base: assets_base.into() }
    }

    /// URL of the version manifest for this mirror.
    pub fn manifest_url(&self) -> &str {
        match self {
            Mirror::Mojang => MOJANG_MANIFEST_URL,
            Mirror::Bmclapi => BMCLAPI_MANIFEST_URL,
            Mirror::Custom { manifest_url, .. } => manifest_url,
        }
    }

    /// Base URL assets are fetched from (`<base>/<hash[:2]>/<hash>`).
    pub fn assets_base(&self) -> &str {
        match self {
            Mirror::Mojang => MOJANG_ASSETS_BASE,
            Mirror::Bmclapi => BMCLAPI_ASSETS_BASE,
            Mirror::Custom { assets_base, .. } => assets_base,
        }
    }

    /// Rewrite a URL taken verbatim from the upstream manifest/metadata
    /// document for this mirror. The Mojang and Custom mirrors leave URLs
    /// untouched; the BMCLAPI mirror substitutes the meta host and the
    /// libraries host. Idempotent: rewriting an already-rewritten URL is
    /// the identity.
    pub fn rewrite_url(&self, url: &str) -> String {
        match self {
            Mirror::Mojang | Mirror::Custom { .. } => url.to_string(),
            Mirror::Bmclapi => url
                .replace(META_HOST_MOJANG, META_HOST_BMCLAPI)
                .replace(LIBRARIES_HOST_MOJANG, LIBRARIES_HOST_BMCLAPI),
        }
    }
}

impl std::str::FromStr for Mirror {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mojang" => Ok(Mirror::Mojang),
            "bmclapi" => Ok(Mirror::Bmclapi),
            other => Err(format!("unknown mirror: {other}")),
        }
    }
}

impl std::fmt::Display for Mirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mirror::Mojang => write!(f, "Mojang"),
            Mirror::Bmclapi => write!(f, "BMCLAPI"),
            Mirror::Custom { manifest_url, .. } => write!(f, "Custom({manifest_url})"),
        }
    }
}
