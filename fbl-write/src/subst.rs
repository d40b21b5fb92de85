//! Placeholder substitution in typemap code.
//!
//! Substitution is a pure function of the template and the replacement list. At each `$` the longest token from
//! the list that matches is replaced, so `$1_ltype` is never mistaken for `$1` followed by `_ltype`. Tokens that
//! are not in the list are left alone.

pub fn substitute<K: AsRef<str>, V: AsRef<str>>(template: &str, replacements: &[(K, V)]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        result.push_str(&rest[..pos]);
        rest = &rest[pos..];

        let longest = replacements
            .iter()
            .map(|(token, value)| (token.as_ref(), value.as_ref()))
            .filter(|(token, _)| !token.is_empty() && rest.starts_with(token))
            .max_by_key(|(token, _)| token.len());

        match longest {
            Some((token, value)) => {
                result.push_str(value);
                rest = &rest[token.len()..];
            }
            None => {
                result.push('$');
                rest = &rest[1..];
            }
        }
    }

    result.push_str(rest);
    result
}
