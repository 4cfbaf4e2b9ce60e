use automaton_compiler::BuildError;

/// An error that occurred while building a regex.
///
/// Only construction can fail. Once a [`Regex`](crate::Regex) exists, a
/// tier that cannot be built is never reported to the caller: the pattern
/// just keeps running in the tier below.
#[non_exhaustive]
#[derive(Clone, PartialEq, Eq)]
pub enum Error {
    /// The pattern does not parse.
    Syntax(String),
    /// The pattern parses but its NFA cannot be built, either because it
    /// uses an unsupported feature or because it is too big.
    Build(BuildError),
}

impl From<BuildError> for Error {
    fn from(err: BuildError) -> Error {
        match err {
            BuildError::Syntax(msg) => Error::Syntax(msg),
            err => Error::Build(err),
        }
    }
}

impl std::error::Error for Error {}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {
            Error::Syntax(ref err) => core::fmt::Display::fmt(err, f),
            Error::Build(ref err) => write!(f, "failed to build regex: {}", err),
        }
    }
}

// A syntax error message spans several lines and points at the pattern, so
// Debug shows it the way Display does.
impl core::fmt::Debug for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {
            Error::Syntax(ref err) => {
                let hr: String = core::iter::repeat('~').take(79).collect();
                writeln!(f, "Syntax(")?;
                writeln!(f, "{}", hr)?;
                writeln!(f, "{}", err)?;
                writeln!(f, "{}", hr)?;
                write!(f, ")")?;
                Ok(())
            }
            Error::Build(ref err) => f.debug_tuple("Build").field(err).finish(),
        }
    }
}
