/// Cypher to KQL Function Registry
///
/// Maps Cypher scalar function names to KQL equivalents with optional argument
/// transformations. Lookup is case-insensitive. `id`, `labels` and `length`
/// over graph variables need binding information and are handled by the
/// expression translator before the registry is consulted.
use std::collections::HashMap;

/// How the KQL call is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallStyle {
    /// `name(arg, ...)`
    Call,
    /// `arg0 name arg1`, wrapped in parentheses
    Infix,
}

/// Function mapping entry
#[derive(Clone)]
pub struct FunctionMapping {
    /// Cypher function name as documented
    pub cypher_name: &'static str,
    pub kql_name: &'static str,
    /// Accepted argument counts, inclusive
    pub arity: (usize, usize),
    pub style: CallStyle,
    /// Takes rendered KQL args, returns transformed KQL args
    pub arg_transform: Option<fn(&[String]) -> Vec<String>>,
}

impl FunctionMapping {
    /// Render a call with already-translated arguments.
    pub fn render(&self, args: &[String]) -> String {
        let args = match self.arg_transform {
            Some(transform) => transform(args),
            None => args.to_vec(),
        };
        match self.style {
            CallStyle::Infix if args.len() == 2 => {
                format!("({} {} {})", args[0], self.kql_name, args[1])
            }
            _ => format!("{}({})", self.kql_name, args.join(", ")),
        }
    }

    pub fn accepts(&self, arg_count: usize) -> bool {
        arg_count >= self.arity.0 && arg_count <= self.arity.1
    }
}

/// Get function mapping for a Cypher function name
pub fn get_function_mapping(cypher_fn: &str) -> Option<FunctionMapping> {
    let fn_lower = cypher_fn.to_lowercase();
    FUNCTION_MAPPINGS.get(fn_lower.as_str()).cloned()
}

/// Names in the table, sorted, for error messages.
pub fn supported_functions() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = FUNCTION_MAPPINGS.values().map(|m| m.cypher_name).collect();
    names.sort_unstable();
    names.dedup();
    names
}

fn call(cypher_name: &'static str, kql_name: &'static str, arity: (usize, usize)) -> FunctionMapping {
    FunctionMapping {
        cypher_name,
        kql_name,
        arity,
        style: CallStyle::Call,
        arg_transform: None,
    }
}

// Static function mapping table
lazy_static::lazy_static! {
    static ref FUNCTION_MAPPINGS: HashMap<&'static str, FunctionMapping> = {
        let mut m = HashMap::new();

        // ===== STRING FUNCTIONS =====

        m.insert("toupper", call("toUpper", "toupper", (1, 1)));
        m.insert("upper", call("upper", "toupper", (1, 1)));
        m.insert("tolower", call("toLower", "tolower", (1, 1)));
        m.insert("lower", call("lower", "tolower", (1, 1)));

        // size() of a string; list literals are special-cased by the caller
        m.insert("size", call("size", "strlen", (1, 1)));
        m.insert("length", call("length", "strlen", (1, 1)));

        // contains(a, b) -> (a contains_cs b)
        m.insert("contains", FunctionMapping {
            cypher_name: "contains",
            kql_name: "contains_cs",
            arity: (2, 2),
            style: CallStyle::Infix,
            arg_transform: None,
        });

        // trim() -> trim(@"\s+", arg)
        m.insert("trim", FunctionMapping {
            cypher_name: "trim",
            kql_name: "trim",
            arity: (1, 1),
            style: CallStyle::Call,
            arg_transform: Some(|args| vec![r#"@"\s+""#.to_string(), args[0].clone()]),
        });
        m.insert("ltrim", FunctionMapping {
            cypher_name: "ltrim",
            kql_name: "trim_start",
            arity: (1, 1),
            style: CallStyle::Call,
            arg_transform: Some(|args| vec![r#"@"\s+""#.to_string(), args[0].clone()]),
        });
        m.insert("rtrim", FunctionMapping {
            cypher_name: "rtrim",
            kql_name: "trim_end",
            arity: (1, 1),
            style: CallStyle::Call,
            arg_transform: Some(|args| vec![r#"@"\s+""#.to_string(), args[0].clone()]),
        });

        // Both sides are 0-indexed
        m.insert("substring", call("substring", "substring", (2, 3)));

        // left(str, n) -> substring(str, 0, n)
        m.insert("left", FunctionMapping {
            cypher_name: "left",
            kql_name: "substring",
            arity: (2, 2),
            style: CallStyle::Call,
            arg_transform: Some(|args| vec![args[0].clone(), "0".to_string(), args[1].clone()]),
        });

        // right(str, n) -> substring(str, max_of(strlen(str) - n, 0))
        m.insert("right", FunctionMapping {
            cypher_name: "right",
            kql_name: "substring",
            arity: (2, 2),
            style: CallStyle::Call,
            arg_transform: Some(|args| {
                vec![
                    args[0].clone(),
                    format!("max_of(strlen({}) - {}, 0)", args[0], args[1]),
                ]
            }),
        });

        // replace(str, find, repl) -> replace_string(str, find, repl)
        m.insert("replace", call("replace", "replace_string", (3, 3)));

        // split(str, delim) -> split(str, delim)
        m.insert("split", call("split", "split", (2, 2)));

        m.insert("reverse", call("reverse", "reverse", (1, 1)));

        // ===== TYPE CONVERSION =====

        m.insert("tostring", call("toString", "tostring", (1, 1)));
        m.insert("tointeger", call("toInteger", "tolong", (1, 1)));
        m.insert("tofloat", call("toFloat", "todouble", (1, 1)));
        m.insert("toboolean", call("toBoolean", "tobool", (1, 1)));

        // ===== MATH FUNCTIONS =====

        m.insert("abs", call("abs", "abs", (1, 1)));
        m.insert("ceil", call("ceil", "ceiling", (1, 1)));
        m.insert("floor", call("floor", "floor", (1, 1)));
        m.insert("round", call("round", "round", (1, 2)));
        m.insert("sqrt", call("sqrt", "sqrt", (1, 1)));

        // ===== OTHER =====

        m.insert("coalesce", call("coalesce", "coalesce", (1, 64)));

        m
    };
}
