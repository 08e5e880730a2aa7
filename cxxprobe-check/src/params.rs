//! Parametrized test cases

use crate::error::{CaseFailure, CheckError};
use cxxprobe_core::ParameterMapping;
use tracing::warn;

/// Run `case` once per parameter mapping.
///
/// Every case runs even after a failure; all failures are reported together,
/// each named by its parameters.
pub fn parametrize<I, F>(cases: I, mut case: F) -> Result<(), CheckError>
where
    I: IntoIterator<Item = ParameterMapping>,
    F: FnMut(&ParameterMapping) -> Result<(), CheckError>,
{
    let mut failures = Vec::new();
    for params in cases {
        if let Err(error) = case(&params) {
            warn!("Case {} failed", params);
            failures.push(CaseFailure { params, error });
        }
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(CheckError::Parametrized(failures))
    }
}
