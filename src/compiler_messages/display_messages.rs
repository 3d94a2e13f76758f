//! Console rendering of `CompilerMessages`, grounded on the teacher's
//! `compiler_messages::display_messages` (same colourised-console shape,
//! via the same `saying` crate), trimmed to the seven `ErrorKind`s this
//! frontend actually reports.

use crate::compiler_messages::compiler_errors::{CompileError, CompilerMessages, ErrorKind};
use crate::compiler_messages::compiler_warnings::CompilerWarning;
use saying::say;
use std::fs;

pub fn print_compiler_messages(messages: &CompilerMessages) {
    for error in &messages.errors {
        print_formatted_error(error);
    }
    for warning in &messages.warnings {
        print_formatted_warning(warning);
    }

    if messages.has_errors() {
        say!(Red { format!("\n{} error(s)", messages.error_count()) });
    }
}

pub fn print_formatted_error(e: &CompileError) {
    say!(Red { e.kind.label() }, Dark Magenta { format!(" {}:{}:{}", e.display_path.display(), e.span.start.line, e.span.start.col) });
    say!(e.message.clone());

    if let Ok(contents) = fs::read_to_string(&e.display_path) {
        let line_number = e.span.start.line as usize;
        if let Some(line) = contents.lines().nth(line_number.saturating_sub(1)) {
            println!("{line}");
            let pad = e.span.start.col.saturating_sub(1) as usize;
            let underline_len = (e.span.end.col.saturating_sub(e.span.start.col)).max(1) as usize;
            print!("{}", " ".repeat(pad));
            say!(Red { "^".repeat(underline_len) });
        }
    }
}

pub fn print_formatted_warning(w: &CompilerWarning) {
    say!(Yellow "warning", Dark Magenta { format!(" {}:{}:{}", w.display_path.display(), w.span.start.line, w.span.start.col) });
    say!(w.message.clone());
}
