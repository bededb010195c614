use std::fmt;

use super::module::{OBJECT_STORE, POSIX, PathModule, WINDOWS};

/// The concrete kind of a [`Path`](super::Path), fixed at construction.
///
/// The variant selects the path module used for naming operations and the
/// backend used for I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathVariant {
    Posix,
    Windows,
    ObjectStore,
}

impl PathVariant {
    pub fn module(self) -> &'static dyn PathModule {
        match self {
            PathVariant::Posix => &POSIX,
            PathVariant::Windows => &WINDOWS,
            PathVariant::ObjectStore => &OBJECT_STORE,
        }
    }

    pub fn is_local(self) -> bool {
        !matches!(self, PathVariant::ObjectStore)
    }
}

/// Object store flavour, recognised by URL prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scheme {
    Swift,
    S3,
}

impl Scheme {
    pub const ALL: [Scheme; 2] = [Scheme::Swift, Scheme::S3];

    pub fn prefix(self) -> &'static str {
        match self {
            Scheme::Swift => "swift://",
            Scheme::S3 => "s3://",
        }
    }

    /// Detects the scheme of a raw path string.
    pub fn from_path(raw: &str) -> Option<Scheme> {
        Scheme::ALL
            .into_iter()
            .find(|scheme| raw.starts_with(scheme.prefix()))
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Swift => write!(f, "swift"),
            Scheme::S3 => write!(f, "s3"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_from_path() {
        assert_eq!(Scheme::from_path("swift://AUTH_x/c"), Some(Scheme::Swift));
        assert_eq!(Scheme::from_path("s3://bucket"), Some(Scheme::S3));
        assert_eq!(Scheme::from_path("/tmp/s3://x"), None);
        assert_eq!(Scheme::from_path("S3://bucket"), None);
    }

    #[test]
    fn test_variant_modules() {
        assert_eq!(PathVariant::Posix.module().sep(), "/");
        assert_eq!(PathVariant::Windows.module().sep(), "\\");
        assert!(PathVariant::ObjectStore.module().isabs("s3://b"));
        assert!(!PathVariant::ObjectStore.is_local());
    }
}
