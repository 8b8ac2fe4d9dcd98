//! Error types for the runtime core

use std::sync::Arc;

use thiserror::Error;

use crate::value::{JsString, JsValue};

/// Source location carried by call frames and errors
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub file: Option<Arc<str>>,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: Option<&str>, line: u32, column: u32) -> Self {
        Self {
            file: file.map(Arc::from),
            line,
            column,
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{}:{}:{}", file, self.line, self.column)
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}

/// Stack frame for error traces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub function_name: Option<String>,
    pub location: Option<SourceLocation>,
}

impl std::fmt::Display for StackFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.function_name.as_deref().unwrap_or("<anonymous>");
        match &self.location {
            Some(location) => write!(f, "    at {} ({})", name, location),
            None => write!(f, "    at {} (<native>)", name),
        }
    }
}

/// Main error type for the runtime
#[derive(Debug, Error)]
pub enum JsError {
    /// Reported by an external compiler before any execution begins
    #[error("SyntaxError: {message} at {location}")]
    SyntaxError {
        message: String,
        location: SourceLocation,
        end_line: u32,
        end_column: u32,
    },

    #[error("TypeError: {message}{}{}", format_location(.location), format_stack(.stack))]
    TypeError {
        message: String,
        location: Option<SourceLocation>,
        stack: Vec<StackFrame>,
    },

    #[error("ReferenceError: undefined variable `{name}'{}{}", format_location(.location), format_stack(.stack))]
    ReferenceError {
        name: String,
        location: Option<SourceLocation>,
        stack: Vec<StackFrame>,
    },

    #[error("RangeError: {message}{}{}", format_location(.location), format_stack(.stack))]
    RangeError {
        message: String,
        location: Option<SourceLocation>,
        stack: Vec<StackFrame>,
    },

    #[error("Internal error: {0}")]
    Internal(String),

    /// A value raised by script-level `throw`
    #[error("Uncaught {}{}{}", describe_thrown(.value), format_location(.location), format_stack(.stack))]
    ThrownValue {
        value: JsValue,
        location: Option<SourceLocation>,
        stack: Vec<StackFrame>,
    },

    /// A failure inside host code, wrapped so host error types never cross the boundary
    #[error("HostError: {message}")]
    Host {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

fn format_stack(stack: &[StackFrame]) -> String {
    if stack.is_empty() {
        return String::new();
    }
    let frames = stack
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    format!("\n{}", frames)
}

fn format_location(location: &Option<SourceLocation>) -> String {
    match location {
        Some(loc) => format!(" at {}", loc),
        None => String::new(),
    }
}

fn describe_thrown(value: &JsValue) -> String {
    match value {
        JsValue::String(s) => s.to_string(),
        JsValue::Object(obj) => format!("[object {}]", obj.class_name()),
        other => format!("{:?}", other),
    }
}

impl JsError {
    pub fn syntax_error(
        message: impl Into<String>,
        file: Option<&str>,
        begin: (u32, u32),
        end: (u32, u32),
    ) -> Self {
        JsError::SyntaxError {
            message: message.into(),
            location: SourceLocation::new(file, begin.0, begin.1),
            end_line: end.0,
            end_column: end.1,
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        JsError::TypeError {
            message: message.into(),
            location: None,
            stack: Vec::new(),
        }
    }

    pub fn reference_error(name: impl Into<String>) -> Self {
        JsError::ReferenceError {
            name: name.into(),
            location: None,
            stack: Vec::new(),
        }
    }

    pub fn range_error(message: impl Into<String>) -> Self {
        JsError::RangeError {
            message: message.into(),
            location: None,
            stack: Vec::new(),
        }
    }

    pub fn stack_overflow() -> Self {
        Self::range_error("stack overflow")
    }

    pub fn not_a_function(name: impl std::fmt::Display) -> Self {
        Self::type_error(format!("{} is not a function", name))
    }

    pub fn not_a_constructor(name: impl std::fmt::Display) -> Self {
        Self::type_error(format!("{} is not a constructor", name))
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        JsError::Internal(message.into())
    }

    /// Wrap a script-level thrown value
    pub fn thrown(value: JsValue) -> Self {
        JsError::ThrownValue {
            value,
            location: None,
            stack: Vec::new(),
        }
    }

    pub fn host(message: impl Into<String>) -> Self {
        JsError::Host {
            message: message.into(),
            source: None,
        }
    }

    pub fn host_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        JsError::Host {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Parse errors abort a script load; everything else can be caught by script code.
    pub fn is_catchable(&self) -> bool {
        !matches!(self, JsError::SyntaxError { .. })
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            JsError::SyntaxError { location, .. } => Some(location),
            JsError::TypeError { location, .. }
            | JsError::ReferenceError { location, .. }
            | JsError::RangeError { location, .. }
            | JsError::ThrownValue { location, .. } => location.as_ref(),
            JsError::Internal(_) | JsError::Host { .. } => None,
        }
    }

    pub fn stack(&self) -> &[StackFrame] {
        match self {
            JsError::TypeError { stack, .. }
            | JsError::ReferenceError { stack, .. }
            | JsError::RangeError { stack, .. }
            | JsError::ThrownValue { stack, .. } => stack,
            _ => &[],
        }
    }

    /// Record the innermost source position, keeping one that is already set.
    pub fn at(mut self, loc: Option<&SourceLocation>) -> Self {
        let Some(loc) = loc else {
            return self;
        };
        if let JsError::TypeError { location, .. }
        | JsError::ReferenceError { location, .. }
        | JsError::RangeError { location, .. }
        | JsError::ThrownValue { location, .. } = &mut self
        {
            if location.is_none() {
                *location = Some(loc.clone());
            }
        }
        self
    }

    /// Append a frame while the error unwinds through `Call::invoke`.
    pub fn with_frame(mut self, frame: StackFrame) -> Self {
        if let JsError::TypeError { stack, .. }
        | JsError::ReferenceError { stack, .. }
        | JsError::RangeError { stack, .. }
        | JsError::ThrownValue { stack, .. } = &mut self
        {
            stack.push(frame);
        }
        self
    }

    /// The value script code sees when it catches this error
    pub fn to_value(&self) -> JsValue {
        let text = match self {
            JsError::ThrownValue { value, .. } => return value.clone(),
            JsError::TypeError { message, .. } => format!("TypeError: {}", message),
            JsError::ReferenceError { name, .. } => {
                format!("ReferenceError: undefined variable `{}'", name)
            }
            JsError::RangeError { message, .. } => format!("RangeError: {}", message),
            JsError::SyntaxError { message, .. } => format!("SyntaxError: {}", message),
            JsError::Internal(msg) => format!("InternalError: {}", msg),
            JsError::Host { message, .. } => format!("HostError: {}", message),
        };
        JsValue::String(JsString::from(text))
    }
}
