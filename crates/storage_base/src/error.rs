use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::PathBuf;

use tracing_error::{SpanTrace, SpanTraceStatus};

/* 📖 # Why a custom error type and not use anyhow/eyre/thiserror etc?

- Callers need to branch on a small, fixed taxonomy (not found, incompatible path,
  not implemented, configuration) no matter which backend produced the error
- Span traces and context are attached uniformly without extra dependencies
- No dependencies to compile and integrate
 */

/// Error variants that can occur in storage operations.
///
/// The first four variants form the backend-independent taxonomy every path
/// variant reports through. The remaining ones carry native failures and
/// free-form messages.
#[derive(Debug)]
pub enum ErrorKind {
    /// The target path or object does not exist.
    NotFound {
        path: String,
        source: Option<io::Error>,
    },

    /// Two paths with different path modules were combined.
    IncompatiblePath { left: String, right: String },

    /// The operation has no meaning for this path variant.
    NotImplemented {
        operation: &'static str,
        path: String,
    },

    /// The environment or path string could not be resolved to a backend.
    Configuration { message: String },

    /// An object store path could not be parsed into a location.
    InvalidPath { path: String, reason: String },

    /// File system operation failed
    FileError {
        path: PathBuf,
        source: io::Error,
    },

    /// Catch-all for other errors with a message
    Message { message: String },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::NotFound { path, .. } => write!(f, "Not found: {}", path),
            ErrorKind::IncompatiblePath { left, right } => write!(
                f,
                "Incompatible path modules: cannot combine '{}' with '{}'",
                left, right
            ),
            ErrorKind::NotImplemented { operation, path } => {
                write!(f, "{} is not implemented for '{}'", operation, path)
            }
            ErrorKind::Configuration { message } => write!(f, "Configuration error: {}", message),
            ErrorKind::InvalidPath { path, reason } => {
                write!(f, "Invalid path '{}': {}", path, reason)
            }
            ErrorKind::FileError { path, source } => {
                write!(f, "File error at {}: {}", path.display(), source)
            }
            ErrorKind::Message { message } => write!(f, "{}", message),
        }
    }
}

/* 📖 # Why separate ErrorKind and StorageError?
ErrorKind holds the structural variants callers match on. StorageError wraps a kind
with the context stack, an optional cause and the span trace captured when the
error was created, so matching stays simple while diagnostics stay rich.
*/

/// Error type wrapping an [`ErrorKind`] with context, cause and span trace.
pub struct StorageError {
    kind: ErrorKind,
    context: Vec<String>,
    cause: Option<Box<StorageError>>,
    span_trace: SpanTrace,
}

impl StorageError {
    /// Creates a new error from an ErrorKind, capturing the current span trace.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: vec![],
            cause: None,
            span_trace: SpanTrace::capture(),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Message {
            message: message.into(),
        })
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound {
            path: path.into(),
            source: None,
        })
    }

    pub fn incompatible_path(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self::new(ErrorKind::IncompatiblePath {
            left: left.into(),
            right: right.into(),
        })
    }

    pub fn not_implemented(operation: &'static str, path: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotImplemented {
            operation,
            path: path.into(),
        })
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration {
            message: message.into(),
        })
    }

    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        })
    }

    /// Wraps a native I/O error.
    ///
    /// A native "not found" becomes [`ErrorKind::NotFound`] with the original
    /// error kept as its source, so callers see the same kind on every backend.
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Self::new(ErrorKind::NotFound {
                path: path.to_string_lossy().into_owned(),
                source: Some(source),
            })
        } else {
            Self::new(ErrorKind::FileError { path, source })
        }
    }

    /// Attaches context to an error.
    /// Context is displayed before the error message.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attaches context using lazy evaluation.
    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context.push(f());
        self
    }

    /// Records the error that led to this one.
    pub fn caused_by(mut self, cause: StorageError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Returns a reference to the underlying ErrorKind.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn get_context(&self) -> &[String] {
        &self.context
    }

    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, ErrorKind::NotFound { .. })
    }

    pub fn is_incompatible_path(&self) -> bool {
        matches!(self.kind, ErrorKind::IncompatiblePath { .. })
    }

    pub fn is_not_implemented(&self) -> bool {
        matches!(self.kind, ErrorKind::NotImplemented { .. })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self.kind, ErrorKind::Configuration { .. })
    }

    pub fn is_invalid_path(&self) -> bool {
        matches!(self.kind, ErrorKind::InvalidPath { .. })
    }

    /// Returns the innermost error in the chain.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: &str) -> fmt::Result {
        writeln!(f, "{}", self.kind)?;
        let total = self.context.len() + usize::from(self.cause.is_some());
        for (index, context) in self.context.iter().enumerate() {
            let branch = if index + 1 == total { "└─" } else { "├─" };
            writeln!(f, "{}{} {}", indent, branch, context)?;
        }
        if let Some(cause) = &self.cause {
            write!(f, "{}└─ cause: ", indent)?;
            cause.fmt_tree(f, &format!("{}   ", indent))?;
        }
        Ok(())
    }
}

impl From<ErrorKind> for StorageError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl StdError for StorageError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::FileError { source, .. } => Some(source),
            ErrorKind::NotFound {
                source: Some(source),
                ..
            } => Some(source),
            _ => self
                .cause
                .as_deref()
                .map(|cause| cause as &(dyn StdError + 'static)),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for context in &self.context {
            write!(f, "{}: ", context)?;
        }
        write!(f, "{}", self.kind)
    }
}

impl fmt::Debug for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, "")?;
        if self.span_trace.status() == SpanTraceStatus::CAPTURED {
            writeln!(f, "Trace: {}", self.span_trace)?;
        }
        Ok(())
    }
}

/* 📖 # Why use Box<StorageError> in the result type?

Boxing the error reduces the size of the result type, making it more efficient to return in the common case.

*/

/// Standard result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, Box<StorageError>>;

/// Extension trait for attaching context to Results.
pub trait ResultExt<T> {
    /// Attaches context to an error, consuming and re-wrapping it.
    fn context(self, context: impl Into<String>) -> StorageResult<T>;

    /// Attaches context using lazy evaluation.
    /// Context is only evaluated if the result is an error.
    fn with_context<F>(self, f: F) -> StorageResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for StorageResult<T> {
    fn context(self, context: impl Into<String>) -> StorageResult<T> {
        self.map_err(|err| Box::new(err.context(context)))
    }

    fn with_context<F>(self, f: F) -> StorageResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| Box::new(err.with_context(f)))
    }
}

/// Creates a boxed message error from a format string.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        Box::new($crate::StorageError::message(format!($($arg)*)))
    };
}

/// Returns early with a boxed message error.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::err!($($arg)*))
    };
}
