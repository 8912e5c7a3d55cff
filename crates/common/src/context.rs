//! Crate-local `.context()` plumbing shared by the workspace error types.

/// Error types that can be built from a plain message string.
///
/// Implementing this and invoking [`impl_context!`] in the same module gives
/// the crate `.context()` / `.with_context()` on `Result` and `Option`,
/// landing in the crate's own error type instead of a boxed one.
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;
}

/// Expands to a `Context` trait wired to the surrounding module's `Error`
/// and `Result`.
///
/// The module must define `Error: FromMessage` and
/// `type Result<T> = std::result::Result<T, Error>`:
///
/// ```ignore
/// impl confab_common::FromMessage for Error { /* ... */ }
/// pub type Result<T> = std::result::Result<T, Error>;
/// confab_common::impl_context!();
/// ```
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T> {
            fn context(self, message: impl Into<String>) -> Result<T>;
            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C;
        }

        impl<T, E> Context<T> for std::result::Result<T, E>
        where
            E: std::fmt::Display,
        {
            fn context(self, message: impl Into<String>) -> Result<T> {
                let message = message.into();
                self.with_context(move || message)
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.map_err(|cause| {
                    let prefixed = format!("{}: {cause}", f().into());
                    <Error as $crate::FromMessage>::from_message(prefixed)
                })
            }
        }

        impl<T> Context<T> for Option<T> {
            fn context(self, message: impl Into<String>) -> Result<T> {
                let message = message.into();
                self.with_context(move || message)
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(f().into()))
            }
        }
    };
}
