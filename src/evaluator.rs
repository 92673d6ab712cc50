use crate::ast::{
    BlockStatement, Expression, InfixOperator, PrefixOperator, Program, Statement,
};
use crate::builtins;
use crate::environment::{Env, Environment};
use crate::object::{Function, HashPair, MonkeyHash, Object};
use tracing::{debug, instrument};

/// Nested function applications beyond this yield a `stack exhausted` error
/// value instead of blowing the host stack.
const MAX_CALL_DEPTH: usize = 512;

/// Evaluates a parsed program against an environment. Returns `None` when the
/// unit produced no value (e.g. it ends with a `let` statement); a
/// semantically-failing evaluation returns `Some(Object::Error(..))`.
#[instrument(skip(program, env))]
pub fn eval(program: &Program, env: &Env) -> Option<Object> {
    Evaluator::new().eval_program(program, env)
}

pub struct Evaluator {
    call_depth: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Evaluator { call_depth: 0 }
    }

    pub fn eval_program(&mut self, program: &Program, env: &Env) -> Option<Object> {
        let mut result = None;
        for statement in &program.statements {
            result = self.eval_statement(statement, env);
            match result {
                // A top-level return short-circuits the rest of the program.
                Some(Object::ReturnValue(value)) => return Some(*value),
                Some(Object::Error(_)) => return result,
                _ => {}
            }
        }
        result
    }

    // `let` is the one statement with no value of its own; everything else
    // evaluates to something.
    fn eval_statement(&mut self, statement: &Statement, env: &Env) -> Option<Object> {
        match statement {
            Statement::Let { name, value } => {
                let value = self.eval_expression(value, env);
                if is_error(&value) {
                    return Some(value);
                }
                env.borrow_mut().set(name.clone(), value);
                None
            }
            Statement::Return(value) => {
                let value = self.eval_expression(value, env);
                if is_error(&value) {
                    return Some(value);
                }
                Some(Object::ReturnValue(Box::new(value)))
            }
            Statement::Expression(expression) => Some(self.eval_expression(expression, env)),
        }
    }

    // Unlike the program, a block leaves ReturnValue wrapped so it can unwind
    // through enclosing blocks up to the function-call boundary.
    fn eval_block(&mut self, block: &BlockStatement, env: &Env) -> Option<Object> {
        let mut result = None;
        for statement in &block.statements {
            result = self.eval_statement(statement, env);
            if matches!(
                result,
                Some(Object::ReturnValue(_)) | Some(Object::Error(_))
            ) {
                return result;
            }
        }
        result
    }

    fn eval_expression(&mut self, expression: &Expression, env: &Env) -> Object {
        match expression {
            Expression::Identifier(name) => eval_identifier(name, env),
            Expression::IntegerLiteral(value) => Object::Integer(*value),
            Expression::StringLiteral(value) => Object::Str(value.clone()),
            Expression::Boolean(value) => Object::Boolean(*value),
            Expression::Prefix { operator, right } => {
                let right = self.eval_expression(right, env);
                if is_error(&right) {
                    return right;
                }
                eval_prefix_expression(*operator, right)
            }
            Expression::Infix {
                left,
                operator,
                right,
            } => {
                let left = self.eval_expression(left, env);
                if is_error(&left) {
                    return left;
                }
                let right = self.eval_expression(right, env);
                if is_error(&right) {
                    return right;
                }
                eval_infix_expression(*operator, left, right)
            }
            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                let condition = self.eval_expression(condition, env);
                if is_error(&condition) {
                    return condition;
                }
                if condition.is_truthy() {
                    self.eval_block(consequence, env).unwrap_or(Object::Null)
                } else if let Some(alternative) = alternative {
                    self.eval_block(alternative, env).unwrap_or(Object::Null)
                } else {
                    Object::Null
                }
            }
            // Capturing the current environment by shared reference is what
            // makes closures work.
            Expression::FunctionLiteral { parameters, body } => Object::Function(Function {
                parameters: parameters.clone(),
                body: body.clone(),
                env: Env::clone(env),
            }),
            Expression::Call {
                function,
                arguments,
            } => {
                let function = self.eval_expression(function, env);
                if is_error(&function) {
                    return function;
                }
                let args = match self.eval_expressions(arguments, env) {
                    Ok(args) => args,
                    Err(error) => return error,
                };
                self.apply_function(function, args)
            }
            Expression::ArrayLiteral(elements) => {
                match self.eval_expressions(elements, env) {
                    Ok(elements) => Object::Array(elements),
                    Err(error) => error,
                }
            }
            Expression::Index { left, index } => {
                let left = self.eval_expression(left, env);
                if is_error(&left) {
                    return left;
                }
                let index = self.eval_expression(index, env);
                if is_error(&index) {
                    return index;
                }
                eval_index_expression(left, index)
            }
            Expression::HashLiteral(pairs) => self.eval_hash_literal(pairs, env),
        }
    }

    // Left-to-right; the first error short-circuits the rest of the list.
    fn eval_expressions(
        &mut self,
        expressions: &[Expression],
        env: &Env,
    ) -> Result<Vec<Object>, Object> {
        let mut result = Vec::with_capacity(expressions.len());
        for expression in expressions {
            let evaluated = self.eval_expression(expression, env);
            if is_error(&evaluated) {
                return Err(evaluated);
            }
            result.push(evaluated);
        }
        Ok(result)
    }

    fn eval_hash_literal(&mut self, pairs: &[(Expression, Expression)], env: &Env) -> Object {
        let mut hash = MonkeyHash::new();
        for (key_expression, value_expression) in pairs {
            let key = self.eval_expression(key_expression, env);
            if is_error(&key) {
                return key;
            }
            let hash_key = match key.hash_key() {
                Some(hash_key) => hash_key,
                None => {
                    return Object::Error(format!(
                        "unusable as hash key: {}",
                        key.object_type()
                    ))
                }
            };
            let value = self.eval_expression(value_expression, env);
            if is_error(&value) {
                return value;
            }
            hash.insert(hash_key, HashPair { key, value });
        }
        Object::Hash(hash)
    }

    fn apply_function(&mut self, function: Object, args: Vec<Object>) -> Object {
        match function {
            Object::Function(function) => {
                if self.call_depth >= MAX_CALL_DEPTH {
                    return Object::Error("stack exhausted: maximum call depth reached".to_owned());
                }
                self.call_depth += 1;
                debug!(depth = self.call_depth, "applying function");

                // Arguments bind in a fresh frame over the *captured*
                // environment, not the caller's: lexical scoping.
                let call_env = Environment::new_enclosed(&function.env);
                for (parameter, arg) in function.parameters.iter().zip(args) {
                    call_env.borrow_mut().set(parameter.clone(), arg);
                }
                let evaluated = self.eval_block(&function.body, &call_env);
                self.call_depth -= 1;
                unwrap_return_value(evaluated)
            }
            Object::Builtin(function) => function(&args),
            other => Object::Error(format!("not a function: {}", other.object_type())),
        }
    }
}

fn eval_identifier(name: &str, env: &Env) -> Object {
    if let Some(value) = env.borrow().get(name) {
        return value;
    }
    if let Some(builtin) = builtins::lookup(name) {
        return builtin;
    }
    Object::Error(format!("identifier not found: {}", name))
}

fn eval_prefix_expression(operator: PrefixOperator, right: Object) -> Object {
    match operator {
        PrefixOperator::Bang => Object::Boolean(!right.is_truthy()),
        PrefixOperator::Minus => match right {
            // Negating i64::MIN has no i64 result.
            Object::Integer(value) => match value.checked_neg() {
                Some(value) => Object::Integer(value),
                None => Object::Error("integer overflow: -INTEGER".to_owned()),
            },
            other => Object::Error(format!("unknown operator: -{}", other.object_type())),
        },
    }
}

fn eval_infix_expression(operator: InfixOperator, left: Object, right: Object) -> Object {
    if left.object_type() != right.object_type() {
        return Object::Error(format!(
            "type mismatch: {} {} {}",
            left.object_type(),
            operator,
            right.object_type()
        ));
    }
    match (&left, &right) {
        (Object::Integer(l), Object::Integer(r)) => {
            eval_integer_infix_expression(operator, *l, *r)
        }
        (Object::Str(l), Object::Str(r)) => match operator {
            InfixOperator::Plus => Object::Str(format!("{}{}", l, r)),
            _ => Object::Error(format!(
                "unknown operator: STRING {} STRING",
                operator
            )),
        },
        _ => match operator {
            // Same-type comparison by content equality, no coercion.
            InfixOperator::Eq => Object::Boolean(left == right),
            InfixOperator::NotEq => Object::Boolean(left != right),
            _ => Object::Error(format!(
                "unknown operator: {} {} {}",
                left.object_type(),
                operator,
                right.object_type()
            )),
        },
    }
}

// Arithmetic is checked: wrapping past the i64 range is an error value,
// never a host fault, same as division by zero.
fn eval_integer_infix_expression(operator: InfixOperator, left: i64, right: i64) -> Object {
    match operator {
        InfixOperator::Plus => integer_or_overflow(left.checked_add(right), operator),
        InfixOperator::Minus => integer_or_overflow(left.checked_sub(right), operator),
        InfixOperator::Asterisk => integer_or_overflow(left.checked_mul(right), operator),
        InfixOperator::Slash => {
            if right == 0 {
                return Object::Error("division by zero: INTEGER / INTEGER".to_owned());
            }
            // i64::MIN / -1 is the one remaining overflowing division.
            integer_or_overflow(floor_div(left, right), operator)
        }
        InfixOperator::Lt => Object::Boolean(left < right),
        InfixOperator::Gt => Object::Boolean(left > right),
        InfixOperator::Eq => Object::Boolean(left == right),
        InfixOperator::NotEq => Object::Boolean(left != right),
    }
}

fn integer_or_overflow(value: Option<i64>, operator: InfixOperator) -> Object {
    match value {
        Some(value) => Object::Integer(value),
        None => Object::Error(format!(
            "integer overflow: INTEGER {} INTEGER",
            operator
        )),
    }
}

// Division rounds toward negative infinity, not toward zero like the
// host's `/`.
fn floor_div(left: i64, right: i64) -> Option<i64> {
    let quotient = left.checked_div(right)?;
    if left % right != 0 && (left < 0) != (right < 0) {
        Some(quotient - 1)
    } else {
        Some(quotient)
    }
}

fn eval_index_expression(left: Object, index: Object) -> Object {
    match (left, index) {
        (Object::Array(elements), Object::Integer(index)) => {
            // Out-of-range indexing yields null, never an error.
            if index < 0 || index as usize >= elements.len() {
                return Object::Null;
            }
            elements[index as usize].clone()
        }
        (Object::Hash(hash), index) => match index.hash_key() {
            Some(hash_key) => hash
                .get(&hash_key)
                .map(|pair| pair.value.clone())
                .unwrap_or(Object::Null),
            None => Object::Error(format!("unusable as hash key: {}", index.object_type())),
        },
        (left, _) => Object::Error(format!(
            "index operator not supported: {}",
            left.object_type()
        )),
    }
}

fn unwrap_return_value(evaluated: Option<Object>) -> Object {
    match evaluated {
        Some(Object::ReturnValue(value)) => *value,
        Some(other) => other,
        None => Object::Null,
    }
}

fn is_error(object: &Object) -> bool {
    matches!(object, Object::Error(_))
}
