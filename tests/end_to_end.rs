//! End-to-end pipeline test (`spec.md` §8's "End-to-end" testable
//! property): a small multi-module program goes in as source text and
//! comes out with no diagnostics and a fully type-checked, constant-folded
//! HIR.

use bryc::pipeline::Pipeline;
use bryc::settings::Config;
use bryc::target::PlatformDescriptor;
use bryc::types::TypeContext;
use std::io::Write;

fn write_file(dir: &std::path::Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn compiles_a_small_program_without_errors() {
    let dir = tempfile::tempdir().unwrap();
    let entry = write_file(
        dir.path(),
        "main.bry",
        "func main(): i32 {\n    let x: i32 = 1 + 2;\n    return x;\n}\n",
    );
    let platform = PlatformDescriptor::new("linux", "x64", bryc::target::WordSize::Bits64);
    let config = Config::new(entry, platform).with_import_roots(vec![dir.path().to_path_buf()]);
    let mut pipeline = Pipeline::new(config);
    let mut messages = bryc::compiler_messages::CompilerMessages::new();

    let (mut modules, root) = pipeline.load_modules(&mut messages);
    assert!(root.is_some());
    assert!(!messages.has_errors());

    pipeline.sort_declarations(&mut modules, &mut messages);
    assert!(!messages.has_errors());

    let (mut tctx, primitives) = TypeContext::new(&pipeline.config.platform);
    let checked = pipeline.check_all_modules(&mut modules, &mut tctx, &primitives, &mut messages);

    assert!(!messages.has_errors(), "unexpected diagnostics: {:?}", messages.errors);
    assert_eq!(checked.len(), 1);
    assert!(checked[0].is_some());
}

#[test]
fn checks_dependency_module_before_dependent() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "leaf.bry", "pub const ANSWER: i32 = 41 + 1;\n");
    let entry = write_file(
        dir.path(),
        "main.bry",
        "import leaf;\nfunc main(): i32 {\n    return leaf.ANSWER;\n}\n",
    );
    let platform = PlatformDescriptor::new("linux", "x64", bryc::target::WordSize::Bits64);
    let config = Config::new(entry, platform).with_import_roots(vec![dir.path().to_path_buf()]);
    let mut pipeline = Pipeline::new(config);
    let mut messages = bryc::compiler_messages::CompilerMessages::new();

    let (mut modules, root) = pipeline.load_modules(&mut messages);
    assert!(root.is_some());

    pipeline.sort_declarations(&mut modules, &mut messages);
    let (mut tctx, primitives) = TypeContext::new(&pipeline.config.platform);
    let checked = pipeline.check_all_modules(&mut modules, &mut tctx, &primitives, &mut messages);

    assert!(!messages.has_errors(), "unexpected diagnostics: {:?}", messages.errors);
    let summary = pipeline.evaluate_comptime_all(&checked);
    assert!(summary.folded >= 1);
}

#[test]
fn reports_a_type_error_without_aborting_the_whole_file() {
    let dir = tempfile::tempdir().unwrap();
    let entry = write_file(
        dir.path(),
        "main.bry",
        "func main(): i32 {\n    let x: i32 = true;\n    return 0;\n}\n",
    );
    let platform = PlatformDescriptor::new("linux", "x64", bryc::target::WordSize::Bits64);
    let config = Config::new(entry, platform).with_import_roots(vec![dir.path().to_path_buf()]);
    let mut pipeline = Pipeline::new(config);
    let mut messages = bryc::compiler_messages::CompilerMessages::new();

    let (mut modules, root) = pipeline.load_modules(&mut messages);
    assert!(root.is_some());

    pipeline.sort_declarations(&mut modules, &mut messages);
    let (mut tctx, primitives) = TypeContext::new(&pipeline.config.platform);
    let checked = pipeline.check_all_modules(&mut modules, &mut tctx, &primitives, &mut messages);

    // A type error is recoverable at expression granularity (`spec.md` §7):
    // the declaration still produces HIR, just with one reported mismatch.
    assert!(messages.has_errors());
    assert!(checked[0].is_some());
}
