use serde::Serialize;

use super::escalation::EscalationRequest;
use crate::open_cypher_parser::ast::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Direct,
    Escalate,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl Diagnostic {
    pub fn info(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Info,
            message: message.into(),
            position: None,
        }
    }

    pub fn warning(message: impl Into<String>, position: Option<Position>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
            position,
        }
    }

    pub fn error(message: impl Into<String>, position: Option<Position>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            position,
        }
    }
}

/// Advice for whoever executes the emitted query; never changes its meaning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionHint {
    pub name: String,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationResult {
    pub text: String,
    pub strategy: Strategy,
    pub confidence: f64,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation: Option<EscalationRequest>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<ExecutionHint>,
}

impl TranslationResult {
    pub fn direct(
        text: String,
        confidence: f64,
        diagnostics: Vec<Diagnostic>,
        hints: Vec<ExecutionHint>,
    ) -> Self {
        TranslationResult {
            text,
            strategy: Strategy::Direct,
            confidence,
            diagnostics,
            escalation: None,
            hints,
        }
    }

    pub fn escalated(request: EscalationRequest, diagnostics: Vec<Diagnostic>) -> Self {
        TranslationResult {
            text: String::new(),
            strategy: Strategy::Escalate,
            confidence: 0.0,
            diagnostics,
            escalation: Some(request),
            hints: Vec::new(),
        }
    }

    pub fn rejected(diagnostic: Diagnostic) -> Self {
        TranslationResult {
            text: String::new(),
            strategy: Strategy::Rejected,
            confidence: 0.0,
            diagnostics: vec![diagnostic],
            escalation: None,
            hints: Vec::new(),
        }
    }
}
