//! Non-fatal diagnostics. `spec.md` §6 calls for unknown attributes to be
//! warnings rather than errors; this is the only warning class the core
//! itself produces (downstream collaborators may add their own).

use crate::tokenizer::tokens::Span;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    UnknownAttribute,
}

#[derive(Debug, Clone)]
pub struct CompilerWarning {
    pub kind: WarningKind,
    pub module_name: String,
    pub display_path: PathBuf,
    pub span: Span,
    pub message: String,
}

impl CompilerWarning {
    pub fn unknown_attribute(
        module_name: impl Into<String>,
        display_path: PathBuf,
        span: Span,
        attr_name: &str,
    ) -> Self {
        Self {
            kind: WarningKind::UnknownAttribute,
            module_name: module_name.into(),
            display_path,
            span,
            message: format!("unknown attribute '@{attr_name}' (ignored)"),
        }
    }

    pub fn format_line(&self) -> String {
        format!(
            "warning: [{}] {}:{}:{}: {}",
            self.module_name,
            self.display_path.display(),
            self.span.start.line,
            self.span.start.col,
            self.message
        )
    }
}
