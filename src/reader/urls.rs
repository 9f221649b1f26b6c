//! Small URL helpers used by the fallback chains.

use url::Url;

/// Resolves `input` against `base_url`, returning an absolute URL string.
///
/// Already-absolute inputs are returned canonicalized. Errors when neither
/// the input nor the base can produce an absolute URL; callers fall back to
/// the raw input in that case.
pub fn absolute_url(base_url: &str, input: &str) -> Result<String, url::ParseError> {
    match Url::parse(input) {
        Ok(absolute) => Ok(absolute.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse(base_url)?;
            Ok(base.join(input)?.to_string())
        }
        Err(err) => Err(err),
    }
}

/// Returns true when the value parses as an absolute URL on its own.
pub fn is_absolute_url(value: &str) -> bool {
    Url::parse(value).is_ok()
}
