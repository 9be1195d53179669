//! The command-line driver: load sources, run the front-end pipeline, and
//! print what it found.

use ast::Top;
use diagnostics::Reporter;
use parser::cst::{node, Cst, CstElement};
use span::{FileName, SourceFile, SourceMap};
use std::{io::Read, process::ExitCode};

mod cli;

pub fn main() -> ExitCode {
    let options = cli::arguments();

    if !options.color {
        colored::control::set_override(false);
    }

    let mut map = SourceMap::default();
    let reporter = Reporter::new();
    let mut top = Top::default();
    let mut indices = Vec::new();

    for path in &options.files {
        match span::load(&mut map, path.clone()) {
            Ok((index, lossy)) => {
                if lossy {
                    let at = map.file(index).span();
                    reporter.warning(
                        span::Span::empty(at.start),
                        format!("file '{}' is not valid UTF-8; offending bytes were replaced", path.display()),
                    );
                }
                indices.push(index);
            }
            Err(error) => {
                eprintln!("wake: cannot read '{}': {error}", path.display());
                return ExitCode::FAILURE;
            }
        }
    }

    if let Some(name) = &options.stdin {
        let mut content = String::new();
        if let Err(error) = std::io::stdin().read_to_string(&mut content) {
            eprintln!("wake: cannot read standard input: {error}");
            return ExitCode::FAILURE;
        }
        indices.push(map.add(FileName::Virtual(name.clone()), content));
    }

    for &index in &indices {
        let cst = parser::parse(map.file_mut(index), &reporter);

        if options.dump_cst {
            dump_cst(&cst, map.file(index));
        }

        lowerer::lower(&cst, map.file(index), &map, &mut top, &reporter);
    }

    if options.dump_ast {
        dump_top(&top);
    }

    for diagnostic in reporter.diagnostics() {
        eprintln!("{}", diagnostic.format(&map));
    }

    if reporter.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn dump_cst(cst: &Cst, file: &SourceFile) {
    fn walk(element: CstElement<'_>, file: &SourceFile, depth: usize) {
        let mut child = element.first_child_node();
        while !child.empty() {
            println!(
                "{:depth$}{} {}",
                "",
                node::name(child.id()),
                child.location(file),
                depth = depth * 2,
            );
            walk(child, file, depth + 1);
            child.next_sibling_node();
        }
    }

    println!("=== {} ===", file.name());
    walk(cst.root(), file, 0);
}

fn dump_top(top: &Top) {
    for (name, package) in &top.packages {
        println!("package {name}");
        for file in &package.files {
            for (def, value) in &file.content.defs {
                println!("  def {def}");
                print!("{}", indented(&value.body.display().to_string(), 4));
            }
            for (topic, values) in &file.content.publishes {
                for value in values {
                    println!("  publish {topic}");
                    print!("{}", indented(&value.body.display().to_string(), 4));
                }
            }
        }
    }
}

fn indented(text: &str, by: usize) -> String {
    let mut out = String::new();
    for line in text.lines() {
        out.push_str(&" ".repeat(by));
        out.push_str(line);
        out.push('\n');
    }
    out
}
