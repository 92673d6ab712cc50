//! A tree-walking interpreter for the Monkey programming language:
//! lexer → Pratt parser → AST → recursive evaluator, with a tagged object
//! model and lexically-scoped, closure-capturing environments.
//!
//! Collaborators (REPL, file runner) consume the core through two entry
//! points: [`parser::parse`] turns source text into a [`ast::Program`] plus a
//! list of syntax errors, and [`evaluator::eval`] walks that program against
//! an [`environment::Env`].

pub mod ast;
pub mod builtins;
pub mod environment;
pub mod evaluator;
pub mod lexer;
pub mod object;
pub mod parser;
pub mod token;

pub use environment::{Env, Environment};
pub use evaluator::{eval, Evaluator};
pub use object::Object;
pub use parser::{parse, ParseError};
