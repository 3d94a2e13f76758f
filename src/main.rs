//! Minimal CLI driver: runs one source file (or directory module) through
//! every pipeline phase and reports diagnostics, exercising `bryc::pipeline`
//! end-to-end without reimplementing a real build system, linker, or
//! SDK-discovery layer (`spec.md` §6, out of scope for this port).
//!
//! Grounded on the teacher's `main.rs` command/flag shape (a tiny `enum
//! Command`, `env::args` parsed by hand), trimmed to the single "compile a
//! module" command this frontend has, and on `display_messages.rs` for
//! reporting rather than the teacher's own `colour`-based printing (this
//! crate's dependency stack carries `saying`, not `colour`).

use bryc::compiler_messages::{print_compiler_messages, CompilerMessages};
use bryc::pipeline::Pipeline;
use bryc::settings::Config;
use bryc::target::PlatformDescriptor;
use bryc::types::TypeContext;
use saying::say;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

struct Flags {
    show_ast: bool,
    show_hir: bool,
}

fn parse_args(args: &[String]) -> Result<(PathBuf, Flags), String> {
    let mut entry = None;
    let mut flags = Flags { show_ast: false, show_hir: false };
    for arg in args {
        match arg.as_str() {
            "--show-ast" => flags.show_ast = true,
            "--show-hir" => flags.show_hir = true,
            other if !other.starts_with('-') => entry = Some(PathBuf::from(other)),
            other => return Err(format!("unrecognized flag '{other}'")),
        }
    }
    let entry = entry.ok_or_else(|| "missing entry file or directory".to_string())?;
    Ok((entry, flags))
}

fn print_help() {
    println!("bryc — Berry-style compiler frontend");
    println!("usage: bryc <entry.bry|entry-dir> [--show-ast] [--show-hir]");
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        print_help();
        return ExitCode::FAILURE;
    }

    let (entry, flags) = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            say!(Red { e });
            print_help();
            return ExitCode::FAILURE;
        }
    };

    let import_roots = entry.parent().map(|p| vec![p.to_path_buf()]).unwrap_or_default();
    let platform = PlatformDescriptor::host();
    let config = Config::new(entry, platform).with_import_roots(import_roots);
    let mut pipeline = Pipeline::new(config);
    let mut messages = CompilerMessages::new();

    let (mut modules, root) = pipeline.load_modules(&mut messages);
    if root.is_none() {
        print_compiler_messages(&messages);
        return ExitCode::FAILURE;
    }

    pipeline.sort_declarations(&mut modules, &mut messages);

    if flags.show_ast {
        for module in &modules {
            say!(Dark Cyan { format!("module {} ({} decl(s))", module.name, module.sorted_decls.len()) });
        }
    }

    let (mut tctx, primitives) = TypeContext::new(&pipeline.config.platform);
    let checked = pipeline.check_all_modules(&mut modules, &mut tctx, &primitives, &mut messages);

    if flags.show_hir {
        for (module, checked_mod) in modules.iter().zip(checked.iter()) {
            if let Some(checked_mod) = checked_mod {
                say!(Dark Cyan { format!("module {}: {} checked decl(s)", module.name, checked_mod.decls.len()) });
            }
        }
    }

    let summary = pipeline.evaluate_comptime_all(&checked);
    say!(Dark Yellow { format!("comptime: {} folded, {} residual", summary.folded, summary.residual) });

    print_compiler_messages(&messages);
    if messages.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
