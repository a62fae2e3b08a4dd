use std::borrow::Cow;

use crate::error::SpecifierError;

/// A specifier split into its path, `?query` and `#fragment` parts.
///
/// `#` can be escaped as `\0#` to be kept as a literal character in the path
/// instead of starting a fragment -- enhanced-resolve tries both
/// interpretations of an unescaped `#` when neither parse produces a
/// resolvable file, see [crate::ResolverGeneric::load_parse].
///
/// <https://github.com/webpack/enhanced-resolve#escaping>
#[derive(Debug, Clone)]
pub struct Specifier<'s> {
    path: Cow<'s, str>,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl<'s> Specifier<'s> {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn parse(specifier: &'s str) -> Result<Self, SpecifierError> {
        if specifier.is_empty() {
            return Err(SpecifierError::Empty(specifier.to_string()));
        }

        // Fast path: nothing to split off.
        if !specifier.contains(['?', '#', '\0']) {
            return Ok(Self { path: Cow::Borrowed(specifier), query: None, fragment: None });
        }

        let mut path = String::new();
        let mut chars = specifier.char_indices().peekable();
        let mut rest_start = None;
        while let Some((i, c)) = chars.next() {
            if c == '\0' {
                if let Some(&(_, '#')) = chars.peek() {
                    path.push('#');
                    chars.next();
                    continue;
                }
            }
            if c == '?' || c == '#' {
                rest_start = Some(i);
                break;
            }
            path.push(c);
        }

        let mut query = None;
        let mut fragment = None;
        if let Some(start) = rest_start {
            let rest = &specifier[start..];
            if let Some(fragment_index) = rest.find('#') {
                if rest.starts_with('?') {
                    query = Some(rest[..fragment_index].to_string());
                }
                fragment = Some(rest[fragment_index..].to_string());
            } else if rest.starts_with('?') {
                query = Some(rest.to_string());
            }
        }

        Ok(Self { path: Cow::Owned(path), query, fragment })
    }
}

#[cfg(test)]
mod tests {
    use super::Specifier;

    #[test]
    fn plain() {
        let s = Specifier::parse("./foo").unwrap();
        assert_eq!(s.path(), "./foo");
        assert_eq!(s.query, None);
        assert_eq!(s.fragment, None);
    }

    #[test]
    fn query_and_fragment() {
        let s = Specifier::parse("./foo?bar#baz").unwrap();
        assert_eq!(s.path(), "./foo");
        assert_eq!(s.query.as_deref(), Some("?bar"));
        assert_eq!(s.fragment.as_deref(), Some("#baz"));
    }

    #[test]
    fn escaped_hash_stays_in_path() {
        let s = Specifier::parse("./foo\\0#thing").unwrap();
        // only a real NUL byte escapes, not a literal backslash-zero
        assert_eq!(s.fragment.as_deref(), Some("#thing"));
        let s = Specifier::parse("./foo\0#thing").unwrap();
        assert_eq!(s.path(), "./foo#thing");
        assert_eq!(s.fragment, None);
    }

    #[test]
    fn empty_is_error() {
        assert!(Specifier::parse("").is_err());
    }
}
