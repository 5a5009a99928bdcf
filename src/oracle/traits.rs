//! Vision oracle transport trait.

use crate::error::Result;
use crate::oracle::error::OracleError;
use crate::oracle::prompt::OracleRequest;

/// A hosted vision-classification service.
///
/// Implementations own the wire format, authentication and connection
/// handling. From the engine's point of view each call is a single fallible
/// request whose rate-limit failures are distinguishable from the rest.
pub trait VisionOracle: Send + Sync {
    /// Send one request and return the raw text of the answer.
    fn generate(&self, request: &OracleRequest) -> std::result::Result<String, OracleError>;

    /// List the model identifiers available to this account.
    fn list_models(&self) -> Result<Vec<String>>;

    /// Oracle name for logging.
    fn name(&self) -> &'static str;
}

impl<T: VisionOracle + ?Sized> VisionOracle for &T {
    fn generate(&self, request: &OracleRequest) -> std::result::Result<String, OracleError> {
        (**self).generate(request)
    }

    fn list_models(&self) -> Result<Vec<String>> {
        (**self).list_models()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
