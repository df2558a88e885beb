//! Logging shims. `defmt` on target, stdout under host unit tests, nothing otherwise.

#[collapse_debuginfo(yes)]
macro_rules! trace {
        ($($arg:tt)*) => {{
            #[cfg(feature = "defmt")]
            defmt::trace!($($arg)*);
        }}
    }
pub(crate) use trace;

#[collapse_debuginfo(yes)]
macro_rules! debug {
        ($($arg:tt)*) => {{
            #[cfg(feature = "defmt")]
            defmt::debug!($($arg)*);
            #[cfg(all(test, not(feature = "defmt")))]
            std::println!("[DEBUG] {}", format_args!($($arg)*));
        }}
    }
pub(crate) use debug;

#[collapse_debuginfo(yes)]
macro_rules! info {
        ($($arg:tt)*) => {{
            #[cfg(feature = "defmt")]
            defmt::info!($($arg)*);
            #[cfg(all(test, not(feature = "defmt")))]
            std::println!("[INFO] {}", format_args!($($arg)*));
        }}
    }
pub(crate) use info;

#[collapse_debuginfo(yes)]
macro_rules! warni {
        ($($arg:tt)*) => {{
            #[cfg(feature = "defmt")]
            defmt::warn!($($arg)*);
            #[cfg(all(test, not(feature = "defmt")))]
            std::println!("[WARN] {}", format_args!($($arg)*));
        }}
    }
pub(crate) use warni as warn;

#[collapse_debuginfo(yes)]
macro_rules! error {
        ($($arg:tt)*) => {{
            #[cfg(feature = "defmt")]
            defmt::error!($($arg)*);
            #[cfg(all(test, not(feature = "defmt")))]
            std::println!("[ERROR] {}", format_args!($($arg)*));
        }}
    }
pub(crate) use error;
