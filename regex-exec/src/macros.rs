// Thin wrappers around the 'log' macros so that every call site compiles to
// nothing when the 'logging' feature is disabled.

macro_rules! trace {
    ($($tt:tt)*) => {
        #[cfg(feature = "logging")]
        {
            log::trace!($($tt)*)
        }
    }
}

macro_rules! debug {
    ($($tt:tt)*) => {
        #[cfg(feature = "logging")]
        {
            log::debug!($($tt)*)
        }
    }
}

macro_rules! error {
    ($($tt:tt)*) => {
        #[cfg(feature = "logging")]
        {
            log::error!($($tt)*)
        }
    }
}
