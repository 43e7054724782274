//! Line-oriented front end over a [`Session`].
//!
//! Everything here reads from a `BufRead` and writes to a `Write` so the
//! binary can hand over stdin/stdout and tests can use in-memory buffers.

use std::io::{self, BufRead, Write};

use clap::ValueEnum;

use crate::bytecode::disasm::disassemble;
use crate::error::Error;
use crate::frontend::lexer::Lexer;
use crate::frontend::parser::Parser;
use crate::frontend::token_dumper::TokenDumper;
use crate::runtime::session::Session;

pub const PROMPT: &str = ">> ";
pub const QUIT: &str = "quit";

/// How far down the pipeline an input is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Mode {
    /// Read-eval-print loop
    #[default]
    Repl,
    /// Dump tokens
    Lexer,
    /// Print the syntax tree
    Parser,
    /// Disassemble the compiled code
    Compiler,
    /// Run and print the value left on the stack
    Vm,
}

#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub color: bool,
    pub pretty: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            color: true,
            pretty: false,
        }
    }
}

pub fn banner(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "vmlite {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(out, "Type '{}' to exit.", QUIT)
}

/// Reads lines until `quit` or end of input, evaluating each one.
///
/// Blank lines are skipped. Errors are reported to `out` and the loop goes on.
pub fn run_loop(session: &mut Session, input: impl BufRead, out: &mut impl Write) -> io::Result<()> {
    let mut lines = input.lines();
    loop {
        write!(out, "{}", PROMPT)?;
        out.flush()?;

        let Some(line) = lines.next() else {
            writeln!(out)?;
            return Ok(());
        };
        let line = line?;

        if line.trim().is_empty() {
            continue;
        }
        // only the bare word ends the loop
        if line == QUIT {
            return Ok(());
        }

        if let Err(e) = session.eval(&line, out) {
            report(&e, out)?;
        }
    }
}

/// Takes one input through the pipeline as far as `mode` says.
pub fn run_once(
    mode: Mode,
    session: &mut Session,
    source: &str,
    options: Options,
    out: &mut impl Write,
) -> io::Result<()> {
    match mode {
        Mode::Lexer => {
            let tokens = match Lexer::new(source).tokenize() {
                Ok(tokens) => tokens,
                Err(e) => return report(&Error::Lex(e), out),
            };
            let mut dumper = TokenDumper::new();
            if !options.color {
                dumper = dumper.no_color();
            }
            if options.pretty {
                dumper = dumper.pretty();
            }
            dumper.dump(&tokens, out)
        }

        Mode::Parser => {
            let tokens = match Lexer::new(source).tokenize() {
                Ok(tokens) => tokens,
                Err(e) => return report(&Error::Lex(e), out),
            };
            let (program, errors) = Parser::new(tokens).parse_recovering();
            writeln!(out, "{}", program)?;
            if !errors.is_empty() {
                let diagnostics = errors.into_iter().map(Into::into).collect();
                report(&Error::Diagnostics(diagnostics), out)?;
            }
            Ok(())
        }

        Mode::Compiler => {
            let unit = match session.compile(source) {
                Ok(unit) => unit,
                Err(e) => return report(&e, out),
            };
            match disassemble(&unit) {
                Ok(text) => write!(out, "{}", text)?,
                Err(e) => writeln!(out, "{}", e)?,
            }
            writeln!(out, "constants:")?;
            for (i, value) in unit.constants.iter().enumerate() {
                writeln!(out, "  {:04}  {:?}", i, value.to_string())?;
            }
            writeln!(out, "names:")?;
            for (slot, name) in unit.names.names().iter().enumerate() {
                let category = u32::try_from(slot).map(|s| unit.names.category(s));
                match category {
                    Ok(category) => writeln!(out, "  {:04}  {} ({})", slot, name, category)?,
                    Err(_) => writeln!(out, "  {:04}  {}", slot, name)?,
                }
            }
            Ok(())
        }

        Mode::Vm => match session.eval(source, out) {
            Ok(Some(top)) => writeln!(out, "{}", top),
            Ok(None) => Ok(()),
            Err(e) => report(&e, out),
        },

        Mode::Repl => match session.eval(source, out) {
            Ok(_) => Ok(()),
            Err(e) => report(&e, out),
        },
    }
}

/// Writes an error the way the loop shows it: a header, then one line per
/// collected diagnostic.
pub fn report(error: &Error, out: &mut impl Write) -> io::Result<()> {
    match error {
        Error::Diagnostics(diagnostics) => {
            writeln!(out, "Woops! {}:", error)?;
            for d in diagnostics {
                writeln!(out, "\t{}", d)?;
            }
            Ok(())
        }
        other => writeln!(out, "{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_output(lines: &str) -> String {
        let mut session = Session::new();
        let mut out = Vec::new();
        run_loop(&mut session, lines.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn once(mode: Mode, source: &str) -> String {
        let mut session = Session::new();
        let mut out = Vec::new();
        let options = Options {
            color: false,
            pretty: true,
        };
        run_once(mode, &mut session, source, options, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_loop_skips_blank_lines_and_quits() {
        let output = session_output("\n   \nprint 1\nquit\nprint 2\n");
        assert_eq!(output, ">> >> >> 1\n>> ");
    }

    #[test]
    fn test_padded_quit_is_evaluated() {
        let output = session_output("  quit  \nprint 1\nquit\n");
        assert!(output.contains("\tcompile error: 1:3: variable not defined: quit\n"));
        assert!(output.ends_with("1\n>> "));
    }

    #[test]
    fn test_loop_ends_at_eof() {
        let output = session_output("var x = 2");
        assert_eq!(output, ">> >> \n");
    }

    #[test]
    fn test_loop_reports_and_continues() {
        let output = session_output("print y\nprint 3\n");
        assert!(output.contains("Woops! 1 error(s) found:\n"));
        assert!(output.contains("\tcompile error: 1:7: variable not defined: y\n"));
        assert!(output.contains("3\n"));
    }

    #[test]
    fn test_lexer_mode() {
        let output = once(Mode::Lexer, "print 1");
        assert_eq!(
            output,
            "[01:01] PRINT    print\n[01:07] NUMBER   1\n[01:08] EOF      EOF\n"
        );
    }

    #[test]
    fn test_parser_mode() {
        assert_eq!(once(Mode::Parser, "var x = 1 + 2 * 3"), "var x = (1 + (2 * 3))\n");
    }

    #[test]
    fn test_compiler_mode_lists_tables() {
        let output = once(Mode::Compiler, r#"var s = "hi""#);
        assert!(output.contains("PUSHS"));
        assert!(output.contains("constants:\n  0000  \"hi\"\n"));
        assert!(output.contains("names:\n  0000  s (string)\n"));
    }

    #[test]
    fn test_vm_mode_prints_top_of_stack() {
        assert_eq!(once(Mode::Vm, "(1 + 2) * 3"), "9\n");
        assert_eq!(once(Mode::Vm, "print 1"), "1\n");
    }

    #[test]
    fn test_lex_error_reported() {
        let output = once(Mode::Vm, "1 # 2");
        assert_eq!(output, "lexer error: 1:3: unexpected character: '#'\n");
    }
}
