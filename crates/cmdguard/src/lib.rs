// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! A reduced shell-command-line grammar for validating remediation
//! operation strings before a kernel ever executes them against a
//! managed system.
//!
//! The grammar accepts exactly one [`ast::SimpleCommand`]: a program name
//! plus arguments. There is no pipeline, redirection, subshell, glob, or
//! control-operator production — a remediation action's `operation` and
//! `rollback_operation` are not a shell script, they are a single call.
//! `$variable` references are the only indirection, resolved against a
//! caller-supplied binding map at validation time.

mod ast;
mod error;
mod lexer;
mod parser;
mod span;
mod token;
pub mod validation;
pub mod validator;

pub use ast::{QuoteStyle, SimpleCommand, Word, WordPart};
pub use error::LexerError;
pub use parser::{ParseError, Parser};
pub use span::{context_snippet, diagnostic_context, Span};
pub use validation::ValidationError;
pub use validator::{validate, validate_with_config, ValidatorConfig};

#[cfg(test)]
mod lib_tests {
    use super::*;
    use std::collections::HashMap;

    #[yare::parameterized(
        plain = {"systemctl restart nginx"},
        with_var = {"rm -rf $TARGET_DIR"},
        quoted = {"cp \"a b.conf\" /etc/app.conf"},
    )]
    fn parses_and_validates(input: &str) {
        let cmd = SimpleCommand::parse(input).unwrap();
        let bindings = HashMap::from([("TARGET_DIR".to_string(), "/var/cache/app".to_string())]);
        assert!(validate(&cmd, &bindings).is_ok());
    }

    #[test]
    fn rejects_path_traversal() {
        let cmd = SimpleCommand::parse("cat ../../etc/shadow").unwrap();
        let err = validate(&cmd, &HashMap::new()).unwrap_err();
        assert!(err.iter().any(|e| matches!(e, ValidationError::PathTraversal { .. })));
    }
}
