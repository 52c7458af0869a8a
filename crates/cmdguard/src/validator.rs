// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Semantic validation for parsed remediation commands.

use std::collections::HashMap;

use super::ast::SimpleCommand;
pub use crate::validation::ValidationError;

#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Maximum argument count; 0 = unlimited.
    pub max_args: usize,
    /// Program names this validator accepts; empty = any non-empty name.
    pub allowed_programs: Vec<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self { max_args: 32, allowed_programs: Vec::new() }
    }
}

pub fn validate(cmd: &SimpleCommand, bindings: &HashMap<String, String>) -> Result<(), Vec<ValidationError>> {
    validate_with_config(cmd, bindings, &ValidatorConfig::default())
}

pub fn validate_with_config(
    cmd: &SimpleCommand,
    bindings: &HashMap<String, String>,
    config: &ValidatorConfig,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let Some(program) = cmd.program.render(bindings) else {
        errors.push(first_unbound(cmd, bindings));
        return Err(errors);
    };

    if program.is_empty() {
        errors.push(ValidationError::EmptyCommand { span: cmd.span });
    }
    if program.contains("..") {
        errors.push(ValidationError::PathTraversal { span: cmd.program.span });
    }
    if !config.allowed_programs.is_empty() && !config.allowed_programs.iter().any(|p| p == &program) {
        errors.push(ValidationError::ProgramNotAllowed { program: program.clone(), span: cmd.program.span });
    }
    if config.max_args > 0 && cmd.args.len() > config.max_args {
        errors.push(ValidationError::TooManyArguments {
            count: cmd.args.len(),
            max: config.max_args,
            span: cmd.span,
        });
    }
    for arg in &cmd.args {
        if arg.render(bindings).is_none() {
            errors.push(first_unbound_in(arg, bindings));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn first_unbound(cmd: &SimpleCommand, bindings: &HashMap<String, String>) -> ValidationError {
    first_unbound_in(&cmd.program, bindings)
}

fn first_unbound_in(word: &super::ast::Word, bindings: &HashMap<String, String>) -> ValidationError {
    for part in &word.parts {
        if let super::ast::WordPart::Variable { name } = part {
            if !bindings.contains_key(name) {
                return ValidationError::UnboundVariable { name: name.clone(), span: word.span };
            }
        }
    }
    ValidationError::EmptyCommand { span: word.span }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
