use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::assemble::{assemble, UnitHeader};
use crate::cache::{Evaluator, MemoryEvaluator};
use crate::parse::{DslParser, Parser};
use crate::target::CompilationTarget;
use crate::{identifier, Context, Error, Executor};

/// Turns rule text into shared [`Executor`]s, compiling each distinct
/// (target variant, rule) pair at most once.
///
/// # Example
///
/// ```
/// use rulekit::{ArrayTarget, Compiler, Context, Operators, Parameters, Record};
///
/// let compiler = Compiler::in_memory();
/// let exec = compiler
///     .compile("age > 18", &ArrayTarget::new(), &mut Context::new())
///     .unwrap();
///
/// let adult = Record::new().set("age", 30_i64);
/// assert!(exec.execute(&adult, &Operators::new(), &Parameters::new()).unwrap());
/// ```
pub struct Compiler {
    parser: Box<dyn Parser>,
    evaluator: Box<dyn Evaluator>,
    registry: RwLock<HashMap<String, Arc<Executor>>>,
}

/// Builder for a [`Compiler`] with custom collaborators.
///
/// Defaults to [`DslParser`] and a [`MemoryEvaluator`].
pub struct CompilerBuilder {
    parser: Box<dyn Parser>,
    evaluator: Box<dyn Evaluator>,
}

impl CompilerBuilder {
    #[must_use]
    pub fn parser(mut self, parser: impl Parser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    /// Use another store. Pass an `Arc` to keep a handle on it.
    #[must_use]
    pub fn evaluator(mut self, evaluator: impl Evaluator + 'static) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    #[must_use]
    pub fn build(self) -> Compiler {
        Compiler {
            parser: self.parser,
            evaluator: self.evaluator,
            registry: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for CompilerBuilder {
    fn default() -> Self {
        Self {
            parser: Box::new(DslParser),
            evaluator: Box::new(MemoryEvaluator::new()),
        }
    }
}

impl Compiler {
    #[must_use]
    pub fn builder() -> CompilerBuilder {
        CompilerBuilder::default()
    }

    /// A compiler whose units live only as long as it does.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::builder().build()
    }

    /// A compiler that keeps units in `cache_dir`, shared with later processes.
    #[cfg(feature = "file-cache")]
    #[must_use]
    pub fn create(cache_dir: impl Into<std::path::PathBuf>) -> Self {
        Self::builder()
            .evaluator(crate::FileEvaluator::new(cache_dir))
            .build()
    }

    /// Compile `rule` for `target`, or return the executor already compiled
    /// for the same pair.
    ///
    /// Before anything else, the rule's identifier, executor name and path are
    /// written into `ctx`, so the target sees them while compiling.
    ///
    /// # Errors
    ///
    /// - [`Error::Syntax`] if the rule does not parse.
    /// - [`Error::Target`] if the target cannot express the rule.
    /// - [`Error::Assembly`] if the generated code cannot be written out.
    /// - [`Error::Evaluation`] if the store fails or the unit does not load.
    /// - [`Error::IdentifierConflict`] if the identifier is taken by another
    ///   (variant, rule) pair.
    pub fn compile(
        &self,
        rule: &str,
        target: &dyn CompilationTarget,
        ctx: &mut Context,
    ) -> Result<Arc<Executor>, Error> {
        let variant = target.variant();
        let id = identifier::derive(variant, rule);
        let name = identifier::executor_name(&id);
        let path = identifier::executor_path(&id);
        ctx.identify(id.clone(), name.clone(), path.clone());

        if let Some(executor) = self.loaded(&id) {
            tracing::debug!(identifier = %id, target = variant, "executor already loaded");
            check_owner(&executor, variant, rule)?;
            return Ok(executor);
        }

        let ctx: &Context = ctx;
        let header = UnitHeader {
            identifier: &id,
            name: &name,
            path: &path,
            variant,
            rule,
        };
        let compile = || -> Result<String, Error> {
            tracing::debug!(identifier = %id, target = variant, "compiling rule");
            let ast = self.parser.parse(rule)?;
            let code = target.compile(&ast, ctx)?;
            let source = assemble(&header, &code)?;
            // Never hand the store a unit that will not load
            Executor::load(&source)?;
            Ok(source)
        };
        let source = self.evaluator.evaluate(&id, &compile)?;

        let executor = Executor::load(&source)?;
        check_owner(&executor, variant, rule)?;

        let mut registry = self.registry.write();
        let executor = match registry.entry(id) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                tracing::info!(identifier = %entry.key(), target = variant, "executor registered");
                Arc::clone(entry.insert(Arc::new(executor)))
            }
        };
        Ok(executor)
    }

    /// The identifier `rule` would be compiled under for `target`.
    #[must_use]
    pub fn identifier(&self, rule: &str, target: &dyn CompilationTarget) -> String {
        identifier::derive(target.variant(), rule)
    }

    #[must_use]
    pub fn is_loaded(&self, identifier: &str) -> bool {
        self.registry.read().contains_key(identifier)
    }

    /// The executor registered under `identifier`, if this compiler loaded one.
    #[must_use]
    pub fn loaded(&self, identifier: &str) -> Option<Arc<Executor>> {
        self.registry.read().get(identifier).cloned()
    }

    /// Number of loaded executors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("loaded", &self.len())
            .finish_non_exhaustive()
    }
}

fn check_owner(executor: &Executor, variant: &str, rule: &str) -> Result<(), Error> {
    if executor.variant() == variant && executor.rule() == rule {
        return Ok(());
    }
    Err(Error::IdentifierConflict {
        identifier: executor.identifier().to_owned(),
        existing_variant: executor.variant().to_owned(),
        existing_rule: executor.rule().to_owned(),
        variant: variant.to_owned(),
        rule: rule.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::target::{GeneratedCode, TargetError};
    use crate::{ArrayTarget, Expr, Operators, Parameters, Record};

    /// Store that ignores the identifier and always hands back one fixed text.
    struct Fixed(String);

    impl Evaluator for Fixed {
        fn evaluate(
            &self,
            _identifier: &str,
            _compile: &dyn Fn() -> Result<String, Error>,
        ) -> Result<String, Error> {
            Ok(self.0.clone())
        }
    }

    struct Counting {
        calls: AtomicUsize,
    }

    impl CompilationTarget for Counting {
        fn variant(&self) -> &'static str {
            "counting"
        }

        fn compile(&self, _ast: &Expr, ctx: &Context) -> Result<GeneratedCode, TargetError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(ctx.rule_identifier().is_some());
            Ok(GeneratedCode::new("true"))
        }
    }

    #[test]
    fn context_receives_names() {
        let compiler = Compiler::in_memory();
        let mut ctx = Context::new();
        let exec = compiler
            .compile("age > 18", &ArrayTarget::new(), &mut ctx)
            .unwrap();
        assert_eq!(ctx.rule_identifier(), Some(exec.identifier()));
        assert_eq!(ctx.executor_name(), Some(exec.name()));
        assert_eq!(ctx.executor_path(), Some(exec.path()));
    }

    #[test]
    fn second_compile_is_a_registry_hit() {
        let compiler = Compiler::in_memory();
        let target = Counting {
            calls: AtomicUsize::new(0),
        };
        let a = compiler.compile("x", &target, &mut Context::new()).unwrap();
        let b = compiler.compile("x", &target, &mut Context::new()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(target.calls.load(Ordering::SeqCst), 1);
        assert_eq!(compiler.len(), 1);
        assert!(compiler.is_loaded(a.identifier()));
    }

    #[test]
    fn foreign_unit_is_a_conflict() {
        let other = Compiler::in_memory();
        let foreign = other
            .compile("age > 99", &ArrayTarget::new(), &mut Context::new())
            .unwrap();

        let compiler = Compiler::builder()
            .evaluator(Fixed(foreign.source().to_owned()))
            .build();
        let err = compiler
            .compile("age > 18", &ArrayTarget::new(), &mut Context::new())
            .unwrap_err();
        assert!(
            matches!(&err, Error::IdentifierConflict { existing_rule, rule, .. }
                if existing_rule == "age > 99" && rule == "age > 18"),
            "{err}"
        );
        assert!(compiler.is_empty());
    }

    #[test]
    fn unloadable_store_text_is_an_evaluation_error() {
        let compiler = Compiler::builder()
            .evaluator(Fixed("not a unit".to_owned()))
            .build();
        let err = compiler
            .compile("x = 1", &ArrayTarget::new(), &mut Context::new())
            .unwrap_err();
        assert!(matches!(err, Error::Evaluation(_)), "{err}");
    }

    #[test]
    fn compiled_executor_runs() {
        let compiler = Compiler::default();
        let exec = compiler
            .compile(
                "name like 'A%' and tags in ['x', 'y']",
                &ArrayTarget::new(),
                &mut Context::new(),
            )
            .unwrap();
        let ops = Operators::new();
        let params = Parameters::new();
        let hit = Record::new().set("name", "Alice").set("tags", "y");
        let miss = Record::new().set("name", "Bob").set("tags", "y");
        assert!(exec.execute(&hit, &ops, &params).unwrap());
        assert!(!exec.execute(&miss, &ops, &params).unwrap());
    }
}
