// Compiles to nothing without the 'logging' feature.

macro_rules! debug {
    ($($tt:tt)*) => {
        #[cfg(feature = "logging")]
        {
            log::debug!($($tt)*)
        }
    }
}
