use super::{ResponseClass, ServiceError, ServiceResponse};
use crate::config::DecoderConfig;
use crate::types::error::{EwsError, Result};

/// Per-operation decision on which error responses raise
///
/// The envelope itself never raises: an operation turns it into a result
/// with its own policy, e.g. a name resolution treating
/// `ErrorNameResolutionNoResults` as an empty answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorPolicy {
    tolerated: Vec<ServiceError>,
}

impl ErrorPolicy {
    /// Every error response raises
    pub fn strict() -> Self {
        Self::default()
    }

    /// Treat `code` as an empty result instead of a failure
    pub fn tolerate(mut self, code: ServiceError) -> Self {
        if !self.tolerated.contains(&code) {
            self.tolerated.push(code);
        }
        self
    }

    /// Policy tolerating the codes listed in the configuration
    pub fn from_config(config: &DecoderConfig) -> Self {
        config
            .tolerated_error_codes
            .iter()
            .fold(Self::strict(), |policy, code| {
                policy.tolerate(ServiceError::from_code(code))
            })
    }

    pub fn is_tolerated(&self, code: &ServiceError) -> bool {
        self.tolerated.contains(code)
    }
}

impl<T> ServiceResponse<T> {
    /// Apply an operation policy
    ///
    /// - success, or warning with a body: `Ok(Some(body))`
    /// - batch stopped, or a tolerated error: `Ok(None)`
    /// - any other error: `Err(EwsError::Response)` carrying the envelope
    pub fn into_result(self, policy: &ErrorPolicy) -> Result<Option<T>> {
        match self.envelope.class {
            ResponseClass::Error if policy.is_tolerated(&self.envelope.code) => Ok(None),
            ResponseClass::Error => Err(EwsError::Response(Box::new(self.envelope))),
            ResponseClass::Success | ResponseClass::Warning => Ok(self.body),
        }
    }

    /// Like `into_result`, with the default value standing for "no result"
    pub fn into_result_or_default(self, policy: &ErrorPolicy) -> Result<T>
    where
        T: Default,
    {
        Ok(self.into_result(policy)?.unwrap_or_default())
    }
}
