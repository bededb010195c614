use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Div};
use std::path::PathBuf;
use std::str::FromStr;

use arcstr::ArcStr;
use storage_base::{StorageError, StorageResult};

use super::factory::resolve_variant;
use super::module::PathModule;
use super::{PathVariant, Scheme};

/* 📖 # Why wrap a string instead of using std::path::PathBuf?

A Path here is text first: it may name an object in Swift or S3, which the OS path
types cannot represent, and it must behave identically on every host. The value is
an immutable shared string (ArcStr, so clones are cheap) plus the variant tag chosen
at construction. Every operation returns a new Path; nothing mutates in place.

Equality, ordering and hashing look at the text only. Combining two Paths, however,
checks that both use the same path module.
*/

/// Immutable path value for local files and object store objects.
///
/// # Examples
///
/// ```
/// use storage_utils::{Path, PathVariant};
///
/// let path = Path::posix("/tmp") / "a" / "b";
/// assert_eq!(path, "/tmp/a/b");
///
/// let object = Path::new("swift://AUTH_x/cont/obj").unwrap();
/// assert_eq!(object.variant(), PathVariant::ObjectStore);
/// ```
#[derive(Clone)]
pub struct Path {
    text: ArcStr,
    variant: PathVariant,
}

impl Path {
    /// Creates a path, choosing the variant from the string and the host.
    pub fn new(raw: impl AsRef<str>) -> StorageResult<Self> {
        let raw = raw.as_ref();
        Ok(Self::with_variant(raw, resolve_variant(raw)?))
    }

    pub fn with_variant(raw: impl AsRef<str>, variant: PathVariant) -> Self {
        Self {
            text: ArcStr::from(raw.as_ref()),
            variant,
        }
    }

    pub fn posix(raw: impl AsRef<str>) -> Self {
        Self::with_variant(raw, PathVariant::Posix)
    }

    pub fn windows(raw: impl AsRef<str>) -> Self {
        Self::with_variant(raw, PathVariant::Windows)
    }

    pub fn object_store(raw: impl AsRef<str>) -> Self {
        Self::with_variant(raw, PathVariant::ObjectStore)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn variant(&self) -> PathVariant {
        self.variant
    }

    pub fn module(&self) -> &'static dyn PathModule {
        self.variant.module()
    }

    /// The object store scheme, for object store paths.
    pub fn scheme(&self) -> Option<Scheme> {
        match self.variant {
            PathVariant::ObjectStore => Scheme::from_path(&self.text),
            _ => None,
        }
    }

    pub fn is_local(&self) -> bool {
        self.variant.is_local()
    }

    /// Name of the concrete path type, as shown by `Debug`.
    pub fn type_name(&self) -> &'static str {
        match (self.variant, self.scheme()) {
            (PathVariant::Posix, _) => "PosixPath",
            (PathVariant::Windows, _) => "WindowsPath",
            (PathVariant::ObjectStore, Some(Scheme::Swift)) => "SwiftPath",
            (PathVariant::ObjectStore, Some(Scheme::S3)) => "S3Path",
            (PathVariant::ObjectStore, None) => "ObjectStorePath",
        }
    }

    /// Converts to an OS path for use with `std::fs`.
    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(self.as_str())
    }

    fn rewrap(&self, text: impl AsRef<str>) -> Self {
        Self::with_variant(text, self.variant)
    }

    /// Fails if `other` uses a different path module than `self`.
    pub fn check_compatible(&self, other: &Path) -> StorageResult<()> {
        if self.variant != other.variant {
            return Err(Box::new(StorageError::incompatible_path(
                format!("{:?}", self),
                format!("{:?}", other),
            )));
        }
        Ok(())
    }

    /// Joins any number of components, adding separators where needed.
    pub fn join<I, S>(&self, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let module = self.module();
        let joined = parts
            .into_iter()
            .fold(self.as_str().to_string(), |acc, part| {
                module.join(&acc, part.as_ref())
            });
        self.rewrap(joined)
    }

    /// Joins another Path onto this one; both must share a path module.
    pub fn divide(&self, other: &Path) -> StorageResult<Self> {
        self.check_compatible(other)?;
        Ok(self.join([other.as_str()]))
    }

    /// Raw concatenation without inserting a separator.
    pub fn add(&self, suffix: &str) -> Self {
        self.rewrap(format!("{}{}", self.text, suffix))
    }

    /// Raw concatenation with another Path; both must share a path module.
    pub fn add_path(&self, other: &Path) -> StorageResult<Self> {
        self.check_compatible(other)?;
        Ok(self.add(other.as_str()))
    }

    pub fn dirname(&self) -> Self {
        self.rewrap(self.module().dirname(self.as_str()))
    }

    pub fn basename(&self) -> Self {
        self.rewrap(self.module().basename(self.as_str()))
    }

    pub fn parent(&self) -> Self {
        self.dirname()
    }

    pub fn name(&self) -> Self {
        self.basename()
    }

    /// Returns `(parent, name)`.
    pub fn splitpath(&self) -> (Self, String) {
        let (parent, child) = self.module().split(self.as_str());
        (self.rewrap(parent), child)
    }

    /// Returns `(stem, ext)` such that `stem + ext == self`.
    pub fn splitext(&self) -> (Self, String) {
        let (stem, ext) = self.module().splitext(self.as_str());
        (self.rewrap(stem), ext)
    }

    pub fn stripext(&self) -> Self {
        self.splitext().0
    }

    pub fn ext(&self) -> String {
        self.splitext().1
    }

    /// Returns `(drive, rest)`; the drive is empty on POSIX and object stores.
    pub fn splitdrive(&self) -> (Self, String) {
        let (drive, rest) = self.module().splitdrive(self.as_str());
        (self.rewrap(drive), rest)
    }

    pub fn normpath(&self) -> Self {
        self.rewrap(self.module().normpath(self.as_str()))
    }

    pub fn normcase(&self) -> Self {
        self.rewrap(self.module().normcase(self.as_str()))
    }

    pub fn abspath(&self) -> StorageResult<Self> {
        Ok(self.rewrap(self.module().abspath(self.as_str())?))
    }

    pub fn realpath(&self) -> StorageResult<Self> {
        Ok(self.rewrap(self.module().realpath(self.as_str())?))
    }

    pub fn expanduser(&self) -> Self {
        self.rewrap(self.module().expanduser(self.as_str()))
    }

    pub fn expandvars(&self) -> Self {
        self.rewrap(self.module().expandvars(self.as_str()))
    }

    /// Cleans up a path read from configuration: expands variables, then the
    /// home directory, then normalizes.
    pub fn expand(&self) -> Self {
        self.expandvars().expanduser().normpath()
    }

    pub fn isabs(&self) -> bool {
        self.module().isabs(self.as_str())
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Path {}

impl PartialEq<str> for Path {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Path {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl PartialEq<String> for Path {
    fn eq(&self, other: &String) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Hash for Path {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl PartialOrd for Path {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Path {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl Borrow<str> for Path {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for Path {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<std::path::Path> for Path {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(self.as_str())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.type_name(), self.as_str())
    }
}

impl FromStr for Path {
    type Err = Box<StorageError>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::new(s)
    }
}

impl Div<&str> for &Path {
    type Output = Path;

    fn div(self, rhs: &str) -> Path {
        self.join([rhs])
    }
}

impl Div<&str> for Path {
    type Output = Path;

    fn div(self, rhs: &str) -> Path {
        self.join([rhs])
    }
}

impl Add<&str> for &Path {
    type Output = Path;

    fn add(self, rhs: &str) -> Path {
        Path::add(self, rhs)
    }
}

impl Add<&str> for Path {
    type Output = Path;

    fn add(self, rhs: &str) -> Path {
        Path::add(&self, rhs)
    }
}
