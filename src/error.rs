//! Structured error handling for shape-fusion
//!
//! Provides:
//! - Error codes for programmatic handling
//! - `FusionError`, the fatal outcomes of a fusion run
//! - Structured error responses (JSON-friendly) for the command line
//!
//! # Error Categories
//!
//! - 1xxx: input syntax (`ParseError`)
//! - 2xxx: logical contradictions found while fusing (`FusionError`)
//! - 5xxx: malformed input, such as a shapes graph without shapes
//! - 7xxx: configuration (`ConfigError`)
//! - 9xxx: internal limits
//!
//! # Example
//!
//! ```rust,ignore
//! use shape_fusion::{fuse, ErrorResponse};
//!
//! match fuse(store, &shapes) {
//!     Ok(outcome) => println!("{} aliases", outcome.aliases.len()),
//!     Err(err) => eprintln!("{}", ErrorResponse::from(&err).to_json()),
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::parser::ParseError;
use crate::term::Term;

// ============================================================================
// Error Codes
// ============================================================================

/// Unique error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Parse errors (1xxx)
    /// Generic parse error
    ParseError = 1000,
    /// Invalid Turtle syntax
    InvalidTurtleSyntax = 1001,
    /// Unexpected end of input
    UnexpectedEof = 1006,
    /// Prefix used without declaration
    UndefinedPrefix = 1007,

    // Fusion errors (2xxx)
    /// Outer fixpoint did not settle within the round budget
    FixpointNotReached = 2001,
    /// prp-asyp
    AsymmetryViolation = 2101,
    /// prp-irp
    IrreflexivityViolation = 2102,
    /// prp-pdw
    PropertyDisjointnessViolation = 2103,
    /// cls-com
    ClassComplementViolation = 2201,
    /// cax-dw
    ClassDisjointnessViolation = 2202,
    /// eq-diff1
    IdentityConflict = 2301,

    // Validation errors (5xxx)
    /// Malformed or missing shapes graph
    InputShapeError = 5001,

    // Config errors (7xxx)
    /// Generic configuration error
    ConfigError = 7000,
    /// Configuration file could not be read
    ConfigNotFound = 7001,
    /// Invalid configuration syntax
    InvalidConfigSyntax = 7002,
    /// Invalid configuration value
    InvalidConfigValue = 7004,

    // Internal errors (9xxx)
    /// Internal error
    InternalError = 9000,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get a short description of the error code
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::ParseError => "Parse error",
            ErrorCode::InvalidTurtleSyntax => "Invalid Turtle syntax",
            ErrorCode::UnexpectedEof => "Unexpected end of input",
            ErrorCode::UndefinedPrefix => "Undefined prefix",

            ErrorCode::FixpointNotReached => "Fixpoint not reached",
            ErrorCode::AsymmetryViolation => "Asymmetric property violation",
            ErrorCode::IrreflexivityViolation => "Irreflexive property violation",
            ErrorCode::PropertyDisjointnessViolation => "Disjoint property violation",
            ErrorCode::ClassComplementViolation => "Complement class violation",
            ErrorCode::ClassDisjointnessViolation => "Disjoint class violation",
            ErrorCode::IdentityConflict => "sameAs / differentFrom conflict",

            ErrorCode::InputShapeError => "Malformed shapes graph",

            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::ConfigNotFound => "Configuration file not found",
            ErrorCode::InvalidConfigSyntax => "Invalid configuration syntax",
            ErrorCode::InvalidConfigValue => "Invalid configuration value",

            ErrorCode::InternalError => "Internal error",
        }
    }

    /// Check if this code reports inconsistent input data
    pub fn is_contradiction(&self) -> bool {
        (2100..3000).contains(&self.code())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

// ============================================================================
// Fusion error
// ============================================================================

/// A fatal outcome of a fusion run
///
/// Every variant aborts the run; no partially fused store is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FusionError {
    #[error("Erroneous usage of asymmetric property {property} on {subject} and {object}")]
    AsymmetryViolation { property: Term, subject: Term, object: Term },

    #[error("Irreflexive property {property} used on {node}")]
    IrreflexivityViolation { property: Term, node: Term },

    #[error("Erroneous usage of disjoint properties {property} and {disjoint} on {subject} and {object}")]
    PropertyDisjointnessViolation { property: Term, disjoint: Term, subject: Term, object: Term },

    #[error("Violation of complementarity for classes {class} and {complement} on element {individual}")]
    ClassComplementViolation { class: Term, complement: Term, individual: Term },

    #[error("Disjoint classes {class} and {disjoint} have a common individual {individual}")]
    ClassDisjointnessViolation { class: Term, disjoint: Term, individual: Term },

    #[error("'sameAs' and 'differentFrom' cannot both hold between {left} and {right}")]
    IdentityConflict { left: Term, right: Term },

    #[error("Malformed shapes graph: {message}")]
    InputShapeError { message: String, shape: Option<Term> },

    #[error("No fixpoint after {rounds} rounds")]
    FixpointNotReached { rounds: usize },
}

impl FusionError {
    /// Shapes graph problem with no particular shape to blame
    pub fn input_shape(message: impl Into<String>) -> Self {
        FusionError::InputShapeError { message: message.into(), shape: None }
    }

    /// Shapes graph problem located on one shape node
    pub fn shape(shape: &Term, message: impl Into<String>) -> Self {
        FusionError::InputShapeError { message: message.into(), shape: Some(shape.clone()) }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            FusionError::AsymmetryViolation { .. } => ErrorCode::AsymmetryViolation,
            FusionError::IrreflexivityViolation { .. } => ErrorCode::IrreflexivityViolation,
            FusionError::PropertyDisjointnessViolation { .. } => ErrorCode::PropertyDisjointnessViolation,
            FusionError::ClassComplementViolation { .. } => ErrorCode::ClassComplementViolation,
            FusionError::ClassDisjointnessViolation { .. } => ErrorCode::ClassDisjointnessViolation,
            FusionError::IdentityConflict { .. } => ErrorCode::IdentityConflict,
            FusionError::InputShapeError { .. } => ErrorCode::InputShapeError,
            FusionError::FixpointNotReached { .. } => ErrorCode::FixpointNotReached,
        }
    }

    /// OWL 2 RL rule that detected the contradiction, if any
    pub fn rule(&self) -> Option<&'static str> {
        match self {
            FusionError::AsymmetryViolation { .. } => Some("prp-asyp"),
            FusionError::IrreflexivityViolation { .. } => Some("prp-irp"),
            FusionError::PropertyDisjointnessViolation { .. } => Some("prp-pdw"),
            FusionError::ClassComplementViolation { .. } => Some("cls-com"),
            FusionError::ClassDisjointnessViolation { .. } => Some("cax-dw"),
            FusionError::IdentityConflict { .. } => Some("eq-diff1"),
            FusionError::InputShapeError { .. } | FusionError::FixpointNotReached { .. } => None,
        }
    }

    /// The identifiers implicated in the failure
    pub fn terms(&self) -> Vec<&Term> {
        match self {
            FusionError::AsymmetryViolation { property, subject, object } => vec![property, subject, object],
            FusionError::IrreflexivityViolation { property, node } => vec![property, node],
            FusionError::PropertyDisjointnessViolation { property, disjoint, subject, object } => {
                vec![property, disjoint, subject, object]
            }
            FusionError::ClassComplementViolation { class, complement, individual } => {
                vec![class, complement, individual]
            }
            FusionError::ClassDisjointnessViolation { class, disjoint, individual } => {
                vec![class, disjoint, individual]
            }
            FusionError::IdentityConflict { left, right } => vec![left, right],
            FusionError::InputShapeError { shape, .. } => shape.iter().collect(),
            FusionError::FixpointNotReached { .. } => Vec::new(),
        }
    }

    fn hint(&self) -> Option<&'static str> {
        match self {
            FusionError::FixpointNotReached { .. } => Some("raise fusion.max_rounds or --max-rounds"),
            FusionError::InputShapeError { .. } => Some("every sh:property needs an IRI-valued sh:path"),
            e if e.code().is_contradiction() => {
                Some("the data graph is inconsistent under the implemented OWL 2 RL rules")
            }
            _ => None,
        }
    }
}

/// A Result type using FusionError
pub type FusionResult<T> = Result<T, FusionError>;

// ============================================================================
// Error response for command line output
// ============================================================================

/// Structured, serializable error report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error indicator
    pub error: bool,
    /// Error code (string form)
    pub code: String,
    /// Numeric error code
    pub code_num: u32,
    /// Violated rule, for contradictions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    /// Error message
    pub message: String,
    /// Implicated identifiers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub terms: Vec<String>,
    /// Hint for resolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorResponse {
    fn new(code: ErrorCode, message: String) -> Self {
        Self {
            error: true,
            code: format!("{:?}", code),
            code_num: code.code(),
            rule: None,
            message,
            terms: Vec::new(),
            hint: None,
        }
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"error":true,"message":"{}"}}"#, self.message)
        })
    }

    /// Convert to pretty-printed JSON
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_json())
    }
}

impl From<&FusionError> for ErrorResponse {
    fn from(err: &FusionError) -> Self {
        Self {
            rule: err.rule().map(str::to_string),
            terms: err.terms().into_iter().map(Term::to_string).collect(),
            hint: err.hint().map(str::to_string),
            ..Self::new(err.code(), err.to_string())
        }
    }
}

impl From<&ParseError> for ErrorResponse {
    fn from(err: &ParseError) -> Self {
        let code = match err {
            ParseError::Syntax { .. } => ErrorCode::InvalidTurtleSyntax,
            ParseError::UndefinedPrefix { .. } => ErrorCode::UndefinedPrefix,
            ParseError::UnexpectedEof => ErrorCode::UnexpectedEof,
        };
        Self::new(code, err.to_string())
    }
}

impl From<&ConfigError> for ErrorResponse {
    fn from(err: &ConfigError) -> Self {
        let code = match err {
            ConfigError::IoError(..) => ErrorCode::ConfigNotFound,
            ConfigError::ParseError(..) => ErrorCode::InvalidConfigSyntax,
            ConfigError::InvalidValue { .. } => ErrorCode::InvalidConfigValue,
            ConfigError::SerializeError(..) => ErrorCode::ConfigError,
        };
        Self::new(code, err.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ex(local: &str) -> Term {
        Term::uri(format!("http://example.org/{}", local))
    }

    #[test]
    fn test_error_display() {
        let err = FusionError::AsymmetryViolation {
            property: ex("p"),
            subject: ex("a"),
            object: ex("b"),
        };
        assert_eq!(
            err.to_string(),
            "Erroneous usage of asymmetric property <http://example.org/p> on <http://example.org/a> and <http://example.org/b>"
        );
    }

    #[test]
    fn test_error_rule_and_code() {
        let err = FusionError::ClassDisjointnessViolation {
            class: ex("A"),
            disjoint: ex("B"),
            individual: ex("x"),
        };
        assert_eq!(err.rule(), Some("cax-dw"));
        assert_eq!(err.code(), ErrorCode::ClassDisjointnessViolation);
        assert_eq!(err.code().code(), 2202);
        assert!(err.code().is_contradiction());
        assert_eq!(err.terms(), vec![&ex("A"), &ex("B"), &ex("x")]);
    }

    #[test]
    fn test_fixpoint_error_has_no_rule() {
        let err = FusionError::FixpointNotReached { rounds: 3 };
        assert_eq!(err.rule(), None);
        assert!(!err.code().is_contradiction());
        assert!(err.terms().is_empty());
    }

    #[test]
    fn test_error_response_from_fusion_error() {
        let err = FusionError::IdentityConflict { left: ex("a"), right: ex("b") };
        let response = ErrorResponse::from(&err);
        assert!(response.error);
        assert_eq!(response.code, "IdentityConflict");
        assert_eq!(response.code_num, 2301);
        assert_eq!(response.rule.as_deref(), Some("eq-diff1"));
        assert_eq!(response.terms, vec!["<http://example.org/a>", "<http://example.org/b>"]);
    }

    #[test]
    fn test_error_response_to_json() {
        let err = FusionError::shape(&ex("PersonShape"), "sh:property without sh:path");
        let json = ErrorResponse::from(&err).to_json();
        assert!(json.contains("\"code\":\"InputShapeError\""));
        assert!(json.contains("\"code_num\":5001"));
        assert!(!json.contains("\"rule\""));
    }

    #[test]
    fn test_error_response_from_parse_error() {
        let response = ErrorResponse::from(&ParseError::UnexpectedEof);
        assert_eq!(response.code_num, 1006);
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::IdentityConflict).unwrap();
        assert_eq!(json, "\"IDENTITY_CONFLICT\"");
    }
}
