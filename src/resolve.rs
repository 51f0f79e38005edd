//! Mapping of a package reference to a download URL and local name.
//!
//! Resolution is pure string construction. Unknown packages or versions are
//! only discovered later, when the host answers the request.

use std::fmt;

/// Prefix marking a fuzzy version spec, e.g. `~0.12` for the newest 0.12.x.
pub const FUZZY_MARKER: char = '~';

pub const LATEST: &str = "latest";

/// Version selector given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum VersionSpec {
    #[default]
    Latest,
    /// Newest release matching the prefix (marker stripped)
    Fuzzy(String),
    Exact(String),
}

impl VersionSpec {
    pub fn parse(spec: &str) -> Self {
        if spec == LATEST {
            VersionSpec::Latest
        } else if let Some(prefix) = spec.strip_prefix(FUZZY_MARKER) {
            VersionSpec::Fuzzy(prefix.to_string())
        } else {
            VersionSpec::Exact(spec.to_string())
        }
    }
}

impl fmt::Display for VersionSpec {
    /// Formats the spec as the user wrote it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpec::Latest => f.write_str(LATEST),
            VersionSpec::Fuzzy(prefix) => write!(f, "{FUZZY_MARKER}{prefix}"),
            VersionSpec::Exact(version) => f.write_str(version),
        }
    }
}

/// A package name plus version selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    pub name: String,
    pub version: VersionSpec,
}

impl PackageRef {
    /// Build a reference; a missing version means [`VersionSpec::Latest`].
    pub fn new(name: impl Into<String>, version: Option<&str>) -> Self {
        Self {
            name: name.into(),
            version: version.map(VersionSpec::parse).unwrap_or_default(),
        }
    }
}

/// Where to download from and what to call the result locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub download_url: String,
    pub output_name: String,
}

/// Resolve `package` against the archive host at `base_url`.
pub fn resolve(base_url: &str, package: &PackageRef) -> ResolvedTarget {
    let base = base_url.trim_end_matches('/');
    let name = &package.name;

    let (token, output_name) = match &package.version {
        VersionSpec::Latest => (LATEST.to_string(), format!("{name}-latest")),
        VersionSpec::Fuzzy(prefix) => (
            format!("{FUZZY_MARKER}{prefix}"),
            format!("{name}-{prefix}-latest"),
        ),
        VersionSpec::Exact(version) => (version.clone(), format!("{name}-{version}")),
    };

    ResolvedTarget {
        download_url: format!("{base}/{name}/{token}/download"),
        output_name,
    }
}
