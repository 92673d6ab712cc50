use crate::ast::BlockStatement;
use crate::environment::Env;
use std::fmt;
use std::rc::Rc;

/// Host function backing a builtin. Receives already-evaluated arguments and
/// returns a value or an `Error` value; it never touches the environment.
pub type BuiltinFunction = fn(&[Object]) -> Object;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Integer,
    Boolean,
    String,
    Null,
    ReturnValue,
    Error,
    Function,
    Builtin,
    Array,
    Hash,
}

impl fmt::Display for ObjectType {
    // These tags appear verbatim in runtime error messages.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectType::Integer => "INTEGER",
            ObjectType::Boolean => "BOOLEAN",
            ObjectType::String => "STRING",
            ObjectType::Null => "NULL",
            ObjectType::ReturnValue => "RETURN_VALUE",
            ObjectType::Error => "ERROR",
            ObjectType::Function => "FUNCTION",
            ObjectType::Builtin => "BUILTIN",
            ObjectType::Array => "ARRAY",
            ObjectType::Hash => "HASH",
        };
        write!(f, "{}", name)
    }
}

/// Structural identity of a hashable value: type tag plus a 64-bit content
/// hash. Two values index the same hash slot iff their keys are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashKey {
    pub kind: ObjectType,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
    pub key: Object,
    pub value: Object,
}

/// Ordered hash map: pairs keep the order their keys were first inserted,
/// and re-inserting an existing key overwrites the value in place.
#[derive(Debug, Clone, Default)]
pub struct MonkeyHash {
    pairs: Vec<(HashKey, HashPair)>,
}

// Insertion order is an iteration detail, not part of a hash's identity:
// two hashes are equal when they hold the same key→value pairs.
impl PartialEq for MonkeyHash {
    fn eq(&self, other: &Self) -> bool {
        self.pairs.len() == other.pairs.len()
            && self
                .pairs
                .iter()
                .all(|(key, pair)| other.get(key) == Some(pair))
    }
}

impl MonkeyHash {
    pub fn new() -> Self {
        MonkeyHash::default()
    }

    pub fn insert(&mut self, key: HashKey, pair: HashPair) {
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = pair,
            None => self.pairs.push((key, pair)),
        }
    }

    pub fn get(&self, key: &HashKey) -> Option<&HashPair> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, p)| p)
    }

    pub fn contains_key(&self, key: &HashKey) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(HashKey, HashPair)> {
        self.pairs.iter()
    }
}

/// A closure: parameters, body, and the environment captured by shared
/// reference at the definition site.
#[derive(Debug, Clone)]
pub struct Function {
    pub parameters: Vec<String>,
    pub body: BlockStatement,
    pub env: Env,
}

#[derive(Debug, Clone)]
pub enum Object {
    Integer(i64),
    Boolean(bool),
    Str(String),
    Null,
    Array(Vec<Object>),
    Hash(MonkeyHash),
    Function(Function),
    Builtin(BuiltinFunction),
    /// Internal control signal for `return`; unwrapped at the nearest
    /// function-call or program boundary, never observable by user code.
    ReturnValue(Box<Object>),
    /// A first-class evaluation failure, not a host error.
    Error(String),
}

impl Object {
    pub fn object_type(&self) -> ObjectType {
        match self {
            Object::Integer(_) => ObjectType::Integer,
            Object::Boolean(_) => ObjectType::Boolean,
            Object::Str(_) => ObjectType::String,
            Object::Null => ObjectType::Null,
            Object::Array(_) => ObjectType::Array,
            Object::Hash(_) => ObjectType::Hash,
            Object::Function(_) => ObjectType::Function,
            Object::Builtin(_) => ObjectType::Builtin,
            Object::ReturnValue(_) => ObjectType::ReturnValue,
            Object::Error(_) => ObjectType::Error,
        }
    }

    /// Only `null` and `false` are falsy; `0` and `""` are truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Object::Null | Object::Boolean(false))
    }

    /// Structural hash for use as a hash-map key. Returns `None` for types
    /// that cannot be keys; the use site turns that into an error value.
    pub fn hash_key(&self) -> Option<HashKey> {
        let key = match self {
            Object::Integer(value) => HashKey {
                kind: ObjectType::Integer,
                value: *value as u64,
            },
            Object::Boolean(value) => HashKey {
                kind: ObjectType::Boolean,
                value: u64::from(*value),
            },
            // Content-based, so equal strings collide regardless of identity.
            Object::Str(value) => HashKey {
                kind: ObjectType::String,
                value: fnv1a(value.as_bytes()),
            },
            _ => return None,
        };
        Some(key)
    }
}

// Equality is structural for data values. Functions compare by identity of
// their captured frame (field-wise comparison could chase a reference cycle
// through the environment), builtins by host function pointer.
impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Object::Integer(l), Object::Integer(r)) => l == r,
            (Object::Boolean(l), Object::Boolean(r)) => l == r,
            (Object::Str(l), Object::Str(r)) => l == r,
            (Object::Null, Object::Null) => true,
            (Object::Array(l), Object::Array(r)) => l == r,
            (Object::Hash(l), Object::Hash(r)) => l == r,
            (Object::Function(l), Object::Function(r)) => {
                Rc::ptr_eq(&l.env, &r.env)
                    && l.parameters == r.parameters
                    && l.body == r.body
            }
            (Object::Builtin(l), Object::Builtin(r)) => l == r,
            (Object::ReturnValue(l), Object::ReturnValue(r)) => l == r,
            (Object::Error(l), Object::Error(r)) => l == r,
            _ => false,
        }
    }
}

impl fmt::Display for Object {
    // The canonical `inspect` rendering per type.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Integer(value) => write!(f, "{}", value),
            Object::Boolean(value) => write!(f, "{}", value),
            Object::Str(value) => write!(f, "{}", value),
            Object::Null => write!(f, "null"),
            Object::Array(elements) => {
                let elements: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
                write!(f, "[{}]", elements.join(", "))
            }
            Object::Hash(hash) => {
                let pairs: Vec<String> = hash
                    .iter()
                    .map(|(_, pair)| format!("{}: {}", pair.key, pair.value))
                    .collect();
                write!(f, "{{{}}}", pairs.join(", "))
            }
            Object::Function(function) => write!(
                f,
                "fn({}){{ {} }}",
                function.parameters.join(", "),
                function.body
            ),
            Object::Builtin(_) => write!(f, "builtin function"),
            Object::ReturnValue(value) => write!(f, "{}", value),
            Object::Error(message) => write!(f, "ERROR: {}", message),
        }
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
