use std::fmt;

/// How bad a parse defect is. Nothing here is ever fatal; `Error` means the
/// offending construct was dropped, `Warning` means it was kept in degraded
/// form (bad token, unknown unit, and the like).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// One recorded parse or cascade defect, attached to the stylesheet that
/// produced it. `offset` is a byte position into the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub offset: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(offset: u32, message: impl Into<String>) -> Self {
        let message = message.into();
        log::debug!("css warning at byte {offset}: {message}");
        Self {
            severity: Severity::Warning,
            offset,
            message,
        }
    }

    pub fn error(offset: u32, message: impl Into<String>) -> Self {
        let message = message.into();
        log::debug!("css error at byte {offset}: {message}");
        Self {
            severity: Severity::Error,
            offset,
            message,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{kind} at byte {}: {}", self.offset, self.message)
    }
}
