use crate::error::CallError;
use crate::executor::AttemptResponse;

fn parse_retry_after(value: Option<&http::HeaderValue>) -> Option<u64> {
    // Only the integer-seconds form is honored; HTTP-date hints fall back
    // to the computed delay.
    value?.to_str().ok()?.trim().parse().ok()
}

impl AttemptResponse for reqwest::Response {
    fn status(&self) -> u16 {
        reqwest::Response::status(self).as_u16()
    }

    fn retry_after_secs(&self) -> Option<u64> {
        parse_retry_after(self.headers().get(reqwest::header::RETRY_AFTER))
    }
}

impl<B> AttemptResponse for http::Response<B> {
    fn status(&self) -> u16 {
        http::Response::status(self).as_u16()
    }

    fn retry_after_secs(&self) -> Option<u64> {
        parse_retry_after(self.headers().get(http::header::RETRY_AFTER))
    }
}

/// Map a reqwest error onto the transient/fatal split the retry layer
/// understands: timeouts and connection failures are worth retrying,
/// anything else is not.
pub fn classify_reqwest_error(err: reqwest::Error) -> CallError {
    if err.is_timeout() || err.is_connect() {
        CallError::transient_from(err)
    } else {
        CallError::fatal_from(err)
    }
}
