//! # Error Sanitizer
//!
//! Maps raw failure payloads from the remote service to bounded, human strings.
//!
//! The remote service can leak implementation detail (SQL errors, schema and column
//! names) in its failure bodies. The rule table below is an allow-list: a raw message is
//! only shown verbatim when it matches no rule, is short, and carries no markup-like
//! characters. Everything else is replaced by a canned message.
//!
//! Rules are evaluated in order with case-insensitive substring matching; the first
//! match wins.

use crate::core::error::{ErrorPayload, RemoteError};

/// Maximum length (in characters, exclusive) of a message shown verbatim.
pub const PASS_THROUGH_MAX_CHARS: usize = 100;

/// Characters that disqualify a message from being shown verbatim.
const MARKUP_CHARS: [char; 5] = ['{', '}', '<', '>', ';'];

/// Technical fragments that must never reach the user.
pub const TECHNICAL_PATTERNS: &[&str] = &[
    "sql",
    "database",
    "invalid input",
    "syntax error",
    "unexpected",
    "fetch",
    "network",
    "cors",
    "table",
    "schema",
    "cache",
    "column",
    "relation",
    "row",
    "type",
    "procedure",
];

/// Fixed notice for a session closed by the inactivity timeout.
pub const SESSION_TIMEOUT_NOTICE: &str = "Your session expired due to inactivity. Please sign in again.";

/// What a raw message was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizedKind {
    CredentialsMismatch,
    SessionExpired,
    InsufficientBalance,
    DuplicateOperation,
    AlreadyRegistered,
    DailyLimitReached,
    InvalidTransferData,
    CheckInput,
    OperationFailed,
    /// Safe to show the raw message unchanged
    PassThrough,
    Unexpected,
}

impl SanitizedKind {
    /// Canned user-facing message; `None` for [`SanitizedKind::PassThrough`].
    pub fn message(self) -> Option<&'static str> {
        let message = match self {
            SanitizedKind::CredentialsMismatch => "Incorrect email or password.",
            SanitizedKind::SessionExpired => "Your session has expired. Please sign in again.",
            SanitizedKind::InsufficientBalance => "Insufficient balance for this operation.",
            SanitizedKind::DuplicateOperation => "This operation has already been processed.",
            SanitizedKind::AlreadyRegistered => "This email or document is already registered.",
            SanitizedKind::DailyLimitReached => "Daily limit reached.",
            SanitizedKind::InvalidTransferData => {
                "Invalid transfer details. Please review the amount and destination."
            }
            SanitizedKind::CheckInput => "Please check the information you entered.",
            SanitizedKind::OperationFailed => "Operation failed. Please try again.",
            SanitizedKind::Unexpected => "Something went wrong. Please try again later.",
            SanitizedKind::PassThrough => return None,
        };
        Some(message)
    }
}

enum Matcher {
    /// Any of the fragments
    Any(&'static [&'static str]),
    /// One fragment from each list
    Both(&'static [&'static str], &'static [&'static str]),
}

impl Matcher {
    fn matches(&self, haystack: &str) -> bool {
        match self {
            Matcher::Any(needles) => needles.iter().any(|n| haystack.contains(n)),
            Matcher::Both(left, right) => {
                left.iter().any(|n| haystack.contains(n)) && right.iter().any(|n| haystack.contains(n))
            }
        }
    }
}

const RULES: &[(Matcher, SanitizedKind)] = &[
    (
        Matcher::Any(&[
            "invalid credentials",
            "invalid login credentials",
            "user not found",
            "email not confirmed",
        ]),
        SanitizedKind::CredentialsMismatch,
    ),
    (
        Matcher::Any(&["token", "jwt", "auth", "unauthorized", "session expired"]),
        SanitizedKind::SessionExpired,
    ),
    (
        Matcher::Any(&["insufficient", "balance", "funds"]),
        SanitizedKind::InsufficientBalance,
    ),
    (
        Matcher::Any(&["duplicate", "already exists", "already processed"]),
        SanitizedKind::DuplicateOperation,
    ),
    (Matcher::Any(&["already registered"]), SanitizedKind::AlreadyRegistered),
    (Matcher::Any(&["limit", "exceeded"]), SanitizedKind::DailyLimitReached),
    (
        Matcher::Both(&["invalid"], &["deposit", "withdrawal"]),
        SanitizedKind::InvalidTransferData,
    ),
    (
        Matcher::Any(&["null value", "not-null", "required", "check constraint"]),
        SanitizedKind::CheckInput,
    ),
    (Matcher::Any(TECHNICAL_PATTERNS), SanitizedKind::OperationFailed),
];

/// Classify a raw message against the rule table.
pub fn classify(raw: &str) -> SanitizedKind {
    let lowered = raw.to_lowercase();

    if let Some((_, kind)) = RULES.iter().find(|(matcher, _)| matcher.matches(&lowered)) {
        return *kind;
    }

    let is_blank = raw.trim().is_empty();
    let is_short = raw.chars().count() < PASS_THROUGH_MAX_CHARS;
    let has_markup = raw.chars().any(|c| MARKUP_CHARS.contains(&c));

    if !is_blank && is_short && !has_markup {
        SanitizedKind::PassThrough
    } else {
        SanitizedKind::Unexpected
    }
}

/// Sanitize a raw message.
///
/// ```rust
/// use client::feedback::sanitizer::sanitize_message;
///
/// assert_eq!(
///     sanitize_message("invalid input syntax for type uuid"),
///     "Operation failed. Please try again."
/// );
/// assert_eq!(sanitize_message("Recipient not accepting transfers"), "Recipient not accepting transfers");
/// ```
pub fn sanitize_message(raw: &str) -> String {
    match classify(raw).message() {
        Some(canned) => canned.to_string(),
        None => raw.to_string(),
    }
}

/// Sanitize any error payload (string or structured) after normalizing it.
pub fn sanitize<E: ErrorPayload + ?Sized>(error: &E) -> String {
    let normalized: RemoteError = error.to_remote_error();
    sanitize_message(normalized.message())
}
