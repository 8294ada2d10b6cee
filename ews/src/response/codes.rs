use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::cursor::from_leaf_via_from_str;

macro_rules! service_errors {
    ($($(#[$attr:meta])* $variant:ident),+ $(,)?) => {
        /// Response code reported by the service
        ///
        /// Codes unknown to this crate are kept verbatim in `Other`.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
        pub enum ServiceError {
            $($(#[$attr])* $variant,)+
            Other(String),
        }

        impl ServiceError {
            pub fn as_str(&self) -> &str {
                match self {
                    $(ServiceError::$variant => stringify!($variant),)+
                    ServiceError::Other(code) => code,
                }
            }
        }

        impl ServiceError {
            pub fn from_code(code: &str) -> Self {
                match code.trim() {
                    $(stringify!($variant) => ServiceError::$variant,)+
                    other => ServiceError::Other(other.to_string()),
                }
            }
        }
    };
}

service_errors! {
    #[default]
    NoError,
    ErrorAccessDenied,
    ErrorBatchProcessingStopped,
    ErrorChangeKeyRequired,
    ErrorFolderNotFound,
    ErrorInternalServerError,
    ErrorInvalidChangeKey,
    ErrorInvalidIdMalformed,
    ErrorInvalidOperation,
    ErrorInvalidPropertyRequest,
    ErrorInvalidRequest,
    ErrorInvalidSyncStateData,
    ErrorIrresolvableConflict,
    ErrorItemNotFound,
    ErrorMailboxStoreUnavailable,
    ErrorNameResolutionNoResults,
    ErrorNonExistentMailbox,
    ErrorQuotaExceeded,
    ErrorSchemaValidation,
    ErrorServerBusy,
    ErrorSyncFolderNotFound,
    ErrorTimeoutExpired,
}

from_leaf_via_from_str!(ServiceError, "response code");

impl ServiceError {
    /// Message shown instead of the service text for some codes
    pub fn friendly_message(&self) -> Option<&'static str> {
        match self {
            ServiceError::ErrorIrresolvableConflict => Some(
                "The operation can't be performed because the item is out of date. Reload the item and try again.",
            ),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        *self == ServiceError::NoError
    }
}

impl FromStr for ServiceError {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ServiceError::from_code(s))
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
