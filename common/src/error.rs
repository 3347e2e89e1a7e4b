// common/src/error.rs
use thiserror::Error;

/// Failures of the token codec
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Transport encoding is malformed (alphabet, length, canonical form)
    #[error("malformed token encoding: {0}")]
    Decode(String),
    /// Cipher output is unusable (alignment, padding, text, identifier shape)
    #[error("token decryption failed: {0}")]
    Crypto(String),
    #[error("invalid token key: {0}")]
    InvalidKey(String),
}

/// Why a session timestamp failed the local time-window check
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocalValidityError {
    #[error("session timestamp is missing")]
    MissingTimestamp,
    #[error("session timestamp is not a valid epoch second count: {0:?}")]
    InvalidTimestamp(String),
    #[error("session timestamp {issued_at} is ahead of the local clock {now}")]
    ClockSkew { issued_at: i64, now: i64 },
    #[error("session is {elapsed_minutes} minutes old, limit is {timeout_minutes}")]
    Expired {
        elapsed_minutes: i64,
        timeout_minutes: i64,
    },
}

/// Failures talking to the session store or the address store
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote store unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("remote store answered with status {0}")]
    Status(u16),
    #[error("remote store response could not be decoded: {0}")]
    Decode(String),
}

/// Failures of a single identifier resolution strategy, or of all of them
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The strategy had nothing to work with on this page load
    #[error("no input for this strategy")]
    NotProvided,
    /// The platform SDK never became ready or reported itself unavailable
    #[error("platform SDK unavailable: {0}")]
    Unavailable(String),
    #[error("identity rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("no strategy produced an identifier")]
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid user identifier")]
pub struct InvalidUserId;

/// Address form validation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("unsupported country code {0:?}")]
    UnsupportedCountry(String),
}

/// Why an address submission did not go through
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The page has not reached the form state (not initialized, expired, done)
    #[error("page is not accepting submissions")]
    NotReady,
    #[error("session expired")]
    SessionExpired,
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}
