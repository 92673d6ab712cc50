use crate::object::{BuiltinFunction, Object, ObjectType};
use phf::phf_map;

/// Fixed name→function table consulted by the evaluator when an identifier is
/// not bound anywhere in the environment chain. Built at compile time, never
/// mutated.
static BUILTINS: phf::Map<&'static str, BuiltinFunction> = phf_map! {
    "len" => run_len,
    "first" => run_first,
    "last" => run_last,
    "rest" => run_rest,
    "push" => run_push,
    "puts" => run_puts,
    "sort" => run_sort,
    "contains" => run_contains,
    "keys" => run_keys,
    "values" => run_values,
    "read_file" => run_read_file,
};

pub fn lookup(name: &str) -> Option<Object> {
    BUILTINS.get(name).map(|function| Object::Builtin(*function))
}

fn new_error(message: String) -> Object {
    Object::Error(message)
}

fn wrong_argument_count(got: usize, want: usize) -> Object {
    new_error(format!(
        "wrong number of arguments. got={}, want={}",
        got, want
    ))
}

fn run_len(args: &[Object]) -> Object {
    let [arg] = args else {
        return wrong_argument_count(args.len(), 1);
    };
    match arg {
        Object::Str(value) => Object::Integer(value.chars().count() as i64),
        Object::Array(elements) => Object::Integer(elements.len() as i64),
        Object::Hash(hash) => Object::Integer(hash.len() as i64),
        other => new_error(format!(
            "argument to 'len' not supported, got {}",
            other.object_type()
        )),
    }
}

fn run_first(args: &[Object]) -> Object {
    let [arg] = args else {
        return wrong_argument_count(args.len(), 1);
    };
    let Object::Array(elements) = arg else {
        return new_error(format!(
            "argument to 'first' must be ARRAY, got {}",
            arg.object_type()
        ));
    };
    elements.first().cloned().unwrap_or(Object::Null)
}

fn run_last(args: &[Object]) -> Object {
    let [arg] = args else {
        return wrong_argument_count(args.len(), 1);
    };
    let Object::Array(elements) = arg else {
        return new_error(format!(
            "argument to 'last' must be ARRAY, got {}",
            arg.object_type()
        ));
    };
    elements.last().cloned().unwrap_or(Object::Null)
}

fn run_rest(args: &[Object]) -> Object {
    let [arg] = args else {
        return wrong_argument_count(args.len(), 1);
    };
    let Object::Array(elements) = arg else {
        return new_error(format!(
            "argument to 'rest' must be ARRAY, got {}",
            arg.object_type()
        ));
    };
    if elements.is_empty() {
        return Object::Null;
    }
    Object::Array(elements[1..].to_vec())
}

// Non-destructive: the argument array is left untouched.
fn run_push(args: &[Object]) -> Object {
    let [arr, value] = args else {
        return wrong_argument_count(args.len(), 2);
    };
    let Object::Array(elements) = arr else {
        return new_error(format!(
            "argument to 'push' must be ARRAY, got {}",
            arr.object_type()
        ));
    };
    let mut elements = elements.clone();
    elements.push(value.clone());
    Object::Array(elements)
}

fn run_puts(args: &[Object]) -> Object {
    for arg in args {
        println!("{}", arg);
    }
    Object::Null
}

fn run_sort(args: &[Object]) -> Object {
    let [arg] = args else {
        return wrong_argument_count(args.len(), 1);
    };
    let Object::Array(elements) = arg else {
        return new_error(format!(
            "argument to 'sort' must be ARRAY, got {}",
            arg.object_type()
        ));
    };
    if elements.is_empty() {
        return Object::Array(Vec::new());
    }

    let first_type = elements[0].object_type();
    if elements.iter().any(|e| e.object_type() != first_type) {
        let types: Vec<String> = elements
            .iter()
            .map(|e| e.object_type().to_string())
            .collect();
        return new_error(format!(
            "argument to 'sort' must be ARRAY with a single type, got [{}]",
            types.join(", ")
        ));
    }

    match first_type {
        ObjectType::Integer => {
            let mut values: Vec<i64> = elements
                .iter()
                .filter_map(|e| match e {
                    Object::Integer(v) => Some(*v),
                    _ => None,
                })
                .collect();
            values.sort_unstable();
            Object::Array(values.into_iter().map(Object::Integer).collect())
        }
        ObjectType::String => {
            let mut values: Vec<String> = elements
                .iter()
                .filter_map(|e| match e {
                    Object::Str(v) => Some(v.clone()),
                    _ => None,
                })
                .collect();
            values.sort_unstable();
            Object::Array(values.into_iter().map(Object::Str).collect())
        }
        ObjectType::Boolean => {
            let mut values: Vec<bool> = elements
                .iter()
                .filter_map(|e| match e {
                    Object::Boolean(v) => Some(*v),
                    _ => None,
                })
                .collect();
            values.sort_unstable();
            Object::Array(values.into_iter().map(Object::Boolean).collect())
        }
        other => new_error(format!(
            "sorting ARRAYs containing {} is not supported",
            other
        )),
    }
}

fn run_contains(args: &[Object]) -> Object {
    let [hash, key] = args else {
        return wrong_argument_count(args.len(), 2);
    };
    let Object::Hash(hash) = hash else {
        return new_error(format!(
            "argument to 'contains' must be HASH, got {}",
            hash.object_type()
        ));
    };
    match key.hash_key() {
        Some(hash_key) => Object::Boolean(hash.contains_key(&hash_key)),
        None => new_error(format!("unusable as hash key: {}", key.object_type())),
    }
}

fn run_keys(args: &[Object]) -> Object {
    let [arg] = args else {
        return wrong_argument_count(args.len(), 1);
    };
    let Object::Hash(hash) = arg else {
        return new_error(format!(
            "argument to 'keys' must be HASH, got {}",
            arg.object_type()
        ));
    };
    Object::Array(hash.iter().map(|(_, pair)| pair.key.clone()).collect())
}

fn run_values(args: &[Object]) -> Object {
    let [arg] = args else {
        return wrong_argument_count(args.len(), 1);
    };
    let Object::Hash(hash) = arg else {
        return new_error(format!(
            "argument to 'values' must be HASH, got {}",
            arg.object_type()
        ));
    };
    Object::Array(hash.iter().map(|(_, pair)| pair.value.clone()).collect())
}

fn run_read_file(args: &[Object]) -> Object {
    let [arg] = args else {
        return wrong_argument_count(args.len(), 1);
    };
    let Object::Str(path) = arg else {
        return new_error(format!(
            "argument to 'read_file' must be STRING, got {}",
            arg.object_type()
        ));
    };
    match std::fs::read_to_string(path) {
        Ok(content) => Object::Str(content),
        Err(why) => match why.kind() {
            std::io::ErrorKind::NotFound => {
                new_error(format!("file {} does not exist", path))
            }
            std::io::ErrorKind::PermissionDenied => {
                new_error(format!("permission denied to read file {}", path))
            }
            std::io::ErrorKind::InvalidData => new_error(
                "file contains invalid characters for the specified encoding".to_owned(),
            ),
            _ => new_error(format!("could not read file {}: {}", path, why)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{HashPair, MonkeyHash};

    fn call(name: &str, args: &[Object]) -> Object {
        match lookup(name) {
            Some(Object::Builtin(function)) => function(args),
            other => panic!("expected builtin {}, got {:?}", name, other),
        }
    }

    fn int_array(values: &[i64]) -> Object {
        Object::Array(values.iter().copied().map(Object::Integer).collect())
    }

    fn sample_hash() -> Object {
        let mut hash = MonkeyHash::new();
        for value in [1, 2] {
            let key = Object::Integer(value);
            hash.insert(
                key.hash_key().unwrap(),
                HashPair {
                    key: key.clone(),
                    value: Object::Integer(value * 10),
                },
            );
        }
        Object::Hash(hash)
    }

    #[test]
    fn test_len() {
        assert_eq!(call("len", &[Object::Str("".to_owned())]), Object::Integer(0));
        assert_eq!(
            call("len", &[Object::Str("hello world".to_owned())]),
            Object::Integer(11)
        );
        assert_eq!(call("len", &[int_array(&[1, 2, 3])]), Object::Integer(3));
        assert_eq!(call("len", &[sample_hash()]), Object::Integer(2));
        assert_eq!(
            call("len", &[Object::Integer(1)]),
            Object::Error("argument to 'len' not supported, got INTEGER".to_owned())
        );
        assert_eq!(
            call(
                "len",
                &[Object::Str("one".to_owned()), Object::Str("two".to_owned())]
            ),
            Object::Error("wrong number of arguments. got=2, want=1".to_owned())
        );
    }

    #[test]
    fn test_first_last_rest() {
        assert_eq!(call("first", &[int_array(&[1, 2, 3])]), Object::Integer(1));
        assert_eq!(call("first", &[int_array(&[])]), Object::Null);
        assert_eq!(
            call("first", &[Object::Integer(1)]),
            Object::Error("argument to 'first' must be ARRAY, got INTEGER".to_owned())
        );

        assert_eq!(call("last", &[int_array(&[1, 2, 3])]), Object::Integer(3));
        assert_eq!(call("last", &[int_array(&[])]), Object::Null);

        assert_eq!(call("rest", &[int_array(&[1, 2, 3])]), int_array(&[2, 3]));
        assert_eq!(call("rest", &[int_array(&[1])]), int_array(&[]));
        assert_eq!(call("rest", &[int_array(&[])]), Object::Null);
    }

    #[test]
    fn test_push_leaves_original_untouched() {
        let original = int_array(&[1, 2]);
        let pushed = call("push", &[original.clone(), Object::Integer(3)]);
        assert_eq!(pushed, int_array(&[1, 2, 3]));
        assert_eq!(original, int_array(&[1, 2]));
    }

    #[test]
    fn test_push_errors() {
        assert_eq!(
            call("push", &[int_array(&[])]),
            Object::Error("wrong number of arguments. got=1, want=2".to_owned())
        );
        assert_eq!(
            call("push", &[Object::Integer(1), Object::Integer(1)]),
            Object::Error("argument to 'push' must be ARRAY, got INTEGER".to_owned())
        );
    }

    #[test]
    fn test_sort() {
        assert_eq!(call("sort", &[int_array(&[])]), int_array(&[]));
        assert_eq!(call("sort", &[int_array(&[3, 1, 2])]), int_array(&[1, 2, 3]));
        assert_eq!(
            call(
                "sort",
                &[Object::Array(vec![
                    Object::Str("b".to_owned()),
                    Object::Str("a".to_owned()),
                ])]
            ),
            Object::Array(vec![
                Object::Str("a".to_owned()),
                Object::Str("b".to_owned()),
            ])
        );
        assert_eq!(
            call(
                "sort",
                &[Object::Array(vec![Object::Integer(1), Object::Boolean(true)])]
            ),
            Object::Error(
                "argument to 'sort' must be ARRAY with a single type, got [INTEGER, BOOLEAN]"
                    .to_owned()
            )
        );
        assert_eq!(
            call("sort", &[Object::Integer(1)]),
            Object::Error("argument to 'sort' must be ARRAY, got INTEGER".to_owned())
        );
    }

    #[test]
    fn test_contains() {
        assert_eq!(
            call("contains", &[sample_hash(), Object::Integer(1)]),
            Object::Boolean(true)
        );
        assert_eq!(
            call("contains", &[sample_hash(), Object::Integer(9)]),
            Object::Boolean(false)
        );
        assert_eq!(
            call("contains", &[sample_hash(), Object::Array(Vec::new())]),
            Object::Error("unusable as hash key: ARRAY".to_owned())
        );
        assert_eq!(
            call("contains", &[Object::Integer(1), Object::Integer(1)]),
            Object::Error("argument to 'contains' must be HASH, got INTEGER".to_owned())
        );
    }

    #[test]
    fn test_keys_and_values_preserve_insertion_order() {
        assert_eq!(call("keys", &[sample_hash()]), int_array(&[1, 2]));
        assert_eq!(call("values", &[sample_hash()]), int_array(&[10, 20]));
        assert_eq!(
            call("keys", &[Object::Integer(1)]),
            Object::Error("argument to 'keys' must be HASH, got INTEGER".to_owned())
        );
    }

    #[test]
    fn test_read_file_missing_path() {
        assert_eq!(
            call(
                "read_file",
                &[Object::Str("does_not_exist.monkey".to_owned())]
            ),
            Object::Error("file does_not_exist.monkey does not exist".to_owned())
        );
        assert_eq!(
            call("read_file", &[Object::Integer(1)]),
            Object::Error("argument to 'read_file' must be STRING, got INTEGER".to_owned())
        );
    }

    #[test]
    fn test_unknown_name_is_not_a_builtin() {
        assert!(lookup("nope").is_none());
    }
}
