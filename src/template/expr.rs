//! Expression macros: `#Eq`, `#Not`, `#And`, `#Or`, `#Contains`, `#Replace`.
//!
//! Arguments are comma-separated and whitespace-trimmed; literal commas inside
//! an argument are not supported. Because macros nest, the innermost
//! occurrences (those whose argument list holds no further parentheses) are
//! replaced first and passes repeat until a full pass changes nothing, so
//! `#Not(#Eq(A, B))` resolves regardless of nesting depth. Truth is the
//! literal string `True`/`False`.

use regex::Regex;
use std::sync::OnceLock;

/// Matches an innermost `#Name(args)` occurrence: the argument list may not
/// contain parentheses, which is exactly what makes it innermost.
fn macro_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#(\w+)\s*\(([^()]*)\)").expect("macro regex"))
}

/// Resolve all expression macros in the text to fixed point. Tokens that are
/// not in the macro set are left untouched.
pub fn resolve_macros(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let mut changed = false;
        let next = macro_regex()
            .replace_all(&current, |caps: &regex::Captures<'_>| {
                let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
                let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                let args_str = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
                match evaluate(name, args_str) {
                    Some(result) if result != whole => {
                        changed = true;
                        result
                    }
                    Some(result) => result,
                    None => whole.to_string(),
                }
            })
            .into_owned();
        current = next;
        if !changed {
            return current;
        }
    }
}

fn is_true(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

fn truth(value: bool) -> String {
    if value { "True".to_string() } else { "False".to_string() }
}

/// Evaluate one macro. `None` means the name is not in the macro set and the
/// token must be left as-is. Under-supplied macros evaluate to `False` by
/// convention, except `#Replace` which returns its first (or an empty)
/// argument unmodified.
fn evaluate(name: &str, args_str: &str) -> Option<String> {
    let args: Vec<&str> = args_str.split(',').map(str::trim).collect();
    let result = match name.to_ascii_lowercase().as_str() {
        "eq" => {
            if args.len() < 2 {
                truth(false)
            } else {
                truth(args[0] == args[1])
            }
        }
        "not" => match args.first() {
            Some(arg) => truth(!is_true(arg)),
            None => truth(false),
        },
        "and" => truth(!args.is_empty() && args.iter().all(|a| is_true(a))),
        "or" => truth(args.iter().any(|a| is_true(a))),
        "contains" => {
            if args.len() < 2 {
                truth(false)
            } else {
                truth(args[0].contains(args[1]))
            }
        }
        "replace" => {
            if args.len() < 3 {
                args.first().copied().unwrap_or_default().to_string()
            } else {
                args[0].replace(args[1], args[2])
            }
        }
        _ => return None,
    };
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eq() {
        assert_eq!(resolve_macros("#Eq(Spade, Spade)"), "True");
        assert_eq!(resolve_macros("#Eq(Spade, Heart)"), "False");
        assert_eq!(resolve_macros("#Eq(only)"), "False");
    }

    #[test]
    fn test_not_nested_fixed_point() {
        assert_eq!(resolve_macros("#Not(#Eq(Spade,Spade))"), "False");
        assert_eq!(resolve_macros("#Not(#Eq(Spade,Heart))"), "True");
    }

    #[test]
    fn test_and_or() {
        assert_eq!(resolve_macros("#And(True,True,False)"), "False");
        assert_eq!(resolve_macros("#And(True, true)"), "True");
        assert_eq!(resolve_macros("#Or(False, False)"), "False");
        assert_eq!(resolve_macros("#Or(False, True)"), "True");
    }

    #[test]
    fn test_contains() {
        assert_eq!(resolve_macros("#Contains(Spade, pad)"), "True");
        assert_eq!(resolve_macros("#Contains(Spade, club)"), "False");
    }

    #[test]
    fn test_replace() {
        assert_eq!(resolve_macros("#Replace(a_b_c, _, -)"), "a-b-c");
        // Under-supplied: first argument unmodified
        assert_eq!(resolve_macros("#Replace(a_b_c, _)"), "a_b_c");
    }

    #[test]
    fn test_deep_nesting() {
        assert_eq!(resolve_macros("#And(#Not(#Eq(a,b)), #Or(False, #Eq(x,x)))"), "True");
    }

    #[test]
    fn test_unknown_macro_untouched() {
        assert_eq!(resolve_macros("#Custom(a, b)"), "#Custom(a, b)");
    }

    #[test]
    fn test_case_insensitive_names() {
        assert_eq!(resolve_macros("#eq(a, a)"), "True");
        assert_eq!(resolve_macros("#NOT(False)"), "True");
    }

    #[test]
    fn test_surrounding_text_preserved() {
        assert_eq!(resolve_macros("x = #Eq(1, 1);"), "x = True;");
    }
}
