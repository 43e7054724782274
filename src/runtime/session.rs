use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bytecode::compile::Compiler;
use crate::bytecode::ir::{Category, CompiledUnit, ConstantPool, NameTable};
use crate::error::{Diagnostic, Error, Result};
use crate::frontend::lexer::Lexer;
use crate::frontend::parser::Parser;
use crate::lang::value::Value;
use crate::runtime::slots::GlobalSlots;
use crate::runtime::vm::{Vm, VmConfig};

/// State carried from one interactive input to the next.
///
/// Each cycle compiles against the current name table and constant pool.
/// Only a clean compile is committed back; a failed one leaves the session
/// exactly as it was.
pub struct Session {
    names: NameTable,
    constants: ConstantPool,
    slots: GlobalSlots,
    vm: Vm,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Session {
            names: NameTable::new(),
            constants: ConstantPool::new(),
            slots: GlobalSlots::new(config.slot_capacity),
            vm: Vm::with_config(config),
        }
    }

    /// Compiles `source` against the session tables without committing.
    ///
    /// Syntax errors do not stop compilation of what did parse; the returned
    /// diagnostics list syntax errors first, then compile errors.
    pub fn compile(&self, source: &str) -> Result<CompiledUnit> {
        let tokens = Lexer::new(source).tokenize()?;
        let (program, syntax_errors) = Parser::new(tokens).parse_recovering();

        let compilation =
            Compiler::with_snapshot(self.names.clone(), self.constants.clone()).compile(&program);

        let diagnostics: Vec<Diagnostic> = syntax_errors
            .into_iter()
            .map(Diagnostic::from)
            .chain(compilation.errors.into_iter().map(Diagnostic::from))
            .collect();

        if !diagnostics.is_empty() {
            return Err(Error::Diagnostics(diagnostics));
        }
        Ok(compilation.unit)
    }

    /// Commits the unit's tables and runs its code.
    ///
    /// A unit rejected by the stack check commits nothing. A runtime error
    /// does not roll back the tables or any stored globals, but the recorded
    /// slot categories are brought back in line with the values the slots
    /// actually hold, since stores after the failure point never ran.
    pub fn execute(&mut self, unit: CompiledUnit, out: &mut impl Write) -> Result<Option<Value>> {
        self.vm.check(&unit)?;

        let result = self.vm.run(&unit, &mut self.slots, out);

        debug!(
            names = unit.names.len(),
            constants = unit.constants.len(),
            "committing session tables"
        );
        self.names = unit.names;
        self.constants = unit.constants;

        if result.is_err() {
            self.reconcile_categories();
        }

        Ok(result?)
    }

    fn reconcile_categories(&mut self) {
        for slot in 0..self.names.len() {
            let Ok(slot) = u32::try_from(slot) else {
                break;
            };
            let held = self.slots.get(slot).unwrap_or_default();
            self.names.set_category(slot, Category::of_value(&held));
        }
    }

    /// Compiles and, if that succeeds, executes one input.
    pub fn eval(&mut self, source: &str, out: &mut impl Write) -> Result<Option<Value>> {
        let unit = self.compile(source)?;
        self.execute(unit, out)
    }

    pub fn names(&self) -> &NameTable {
        &self.names
    }

    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    pub fn slots(&self) -> &GlobalSlots {
        &self.slots
    }

    /// Current value of a global, if the name was ever declared.
    pub fn global(&self, name: &str) -> Option<Value> {
        let slot = self.names.resolve(name)?;
        self.slots.get(slot)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            names: self.names.clone(),
            constants: self.constants.clone(),
            slots: self.slots.clone(),
        }
    }

    /// Replaces the session tables and globals with `snapshot`.
    ///
    /// The slots keep this session's configured capacity, not the one saved
    /// in the image. An image holding more slots than that is rejected.
    pub fn restore(&mut self, snapshot: Snapshot) -> Result<()> {
        let capacity = self.slots.capacity();
        let mut slots = snapshot.slots;
        slots
            .set_capacity(capacity)
            .map_err(|held| Error::ImageCapacity {
                slots: held,
                capacity,
            })?;

        self.names = snapshot.names;
        self.constants = snapshot.constants;
        self.slots = slots;
        Ok(())
    }
}

/// Serializable copy of a session's persistent state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub names: NameTable,
    pub constants: ConstantPool,
    pub slots: GlobalSlots,
}

impl Snapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(postcard::to_allocvec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(postcard::from_bytes(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::compile_error::CompileError;
    use crate::runtime::runtime_error::RuntimeError;

    fn eval(session: &mut Session, source: &str) -> (Result<Option<Value>>, String) {
        let mut out = Vec::new();
        let result = session.eval(source, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_globals_survive_between_inputs() {
        let mut session = Session::new();
        let (result, _) = eval(&mut session, "var x = 5");
        assert!(result.is_ok());

        let (result, output) = eval(&mut session, "print x");
        assert!(matches!(result, Ok(None)));
        assert_eq!(output, "5\n");
    }

    #[test]
    fn test_failed_compile_commits_nothing() {
        let mut session = Session::new();
        eval(&mut session, r#"var a = "one""#).0.unwrap();

        let (result, output) = eval(&mut session, r#"var b = "two" print nope"#);
        match result {
            Err(Error::Diagnostics(d)) => {
                assert_eq!(d.len(), 1);
                assert!(matches!(
                    d[0],
                    Diagnostic::Compile(CompileError::UndefinedVariable { .. })
                ));
            }
            other => panic!("expected diagnostics, got {:?}", other),
        }
        assert_eq!(output, "");
        assert_eq!(session.names().names(), &["a".to_string()]);
        assert_eq!(session.constants().len(), 1);
        assert_eq!(session.global("b"), None);
    }

    #[test]
    fn test_syntax_errors_come_first() {
        let session = Session::new();
        let err = session.compile("print (1 + true").unwrap_err();
        let Error::Diagnostics(d) = err else {
            panic!("expected diagnostics");
        };
        assert_eq!(d.len(), 2);
        assert!(matches!(d[0], Diagnostic::Syntax(_)));
        assert!(matches!(d[1], Diagnostic::Compile(_)));
    }

    #[test]
    fn test_lex_error_is_fatal() {
        let session = Session::new();
        assert!(matches!(session.compile("1 @ 2"), Err(Error::Lex(_))));
    }

    #[test]
    fn test_runtime_error_keeps_tables() {
        let mut session = Session::new();
        let (result, _) = eval(&mut session, "var x = 1 var y = x / 0");
        assert!(matches!(
            result,
            Err(Error::Runtime(RuntimeError::DivisionByZero { .. }))
        ));
        assert_eq!(session.global("x"), Some(Value::Number(1.0)));
        assert_eq!(session.global("y"), Some(Value::Empty));

        let (_, output) = eval(&mut session, "print y");
        assert_eq!(output, "nil\n");
    }

    #[test]
    fn test_aborted_run_resyncs_slot_categories() {
        let mut session = Session::new();
        eval(&mut session, r#"var x = "s""#).0.unwrap();

        let (result, _) = eval(&mut session, "var x = 1 / 0");
        assert!(result.is_err());
        assert_eq!(session.global("x"), Some(Value::Str("s".to_string())));
        assert_eq!(session.names().category(0), Category::String);

        let (result, output) = eval(&mut session, r#"print x + "t""#);
        assert!(result.is_ok());
        assert_eq!(output, "st\n");

        let err = session.compile("print x + 1").unwrap_err();
        assert!(matches!(err, Error::Diagnostics(_)));
    }

    #[test]
    fn test_never_stored_slot_becomes_unknown() {
        let mut session = Session::new();
        let (result, _) = eval(&mut session, "var a = 1 / 0 var b = true");
        assert!(result.is_err());
        assert_eq!(session.names().category(0), Category::Unknown);
        assert_eq!(session.names().category(1), Category::Unknown);
    }

    #[test]
    fn test_rejected_unit_commits_nothing() {
        let config = VmConfig {
            stack_capacity: 2,
            ..VmConfig::default()
        };
        let mut session = Session::with_config(config);
        let (result, output) = eval(&mut session, r#"var s = "a" 1 2 3"#);
        assert!(matches!(
            result,
            Err(Error::Runtime(RuntimeError::StackCheck(_)))
        ));
        assert_eq!(output, "");
        assert!(session.names().is_empty());
        assert!(session.constants().is_empty());
    }

    #[test]
    fn test_restore_keeps_configured_capacity() {
        let mut source = Session::new();
        eval(&mut source, "var a = 1 var b = 2 var c = 3").0.unwrap();
        let snapshot = source.snapshot();

        let config = VmConfig {
            slot_capacity: 8,
            ..VmConfig::default()
        };
        let mut restored = Session::with_config(config.clone());
        restored.restore(snapshot.clone()).unwrap();
        assert_eq!(restored.slots().capacity(), 8);
        assert_eq!(restored.global("c"), Some(Value::Number(3.0)));

        let mut small = Session::with_config(VmConfig {
            slot_capacity: 2,
            ..config
        });
        assert!(matches!(
            small.restore(snapshot),
            Err(Error::ImageCapacity {
                slots: 3,
                capacity: 2
            })
        ));
        assert!(small.names().is_empty());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut session = Session::new();
        eval(&mut session, r#"var greeting = "hello" var n = 3"#).0.unwrap();

        let bytes = session.snapshot().to_bytes().unwrap();
        let snapshot = Snapshot::from_bytes(&bytes).unwrap();

        let mut restored = Session::new();
        restored.restore(snapshot).unwrap();
        let (result, output) = eval(&mut restored, r#"print greeting + " world" print n * 2"#);
        assert!(result.is_ok());
        assert_eq!(output, "hello world\n6\n");
    }

    #[test]
    fn test_corrupt_image() {
        assert!(matches!(
            Snapshot::from_bytes(&[0xFF, 0xFF, 0xFF]),
            Err(Error::Image(_))
        ));
    }
}
