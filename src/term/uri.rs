//! IRI representation and relative reference resolution

use std::fmt;

/// An absolute IRI
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uri {
    value: String,
}

impl Uri {
    pub fn new(value: String) -> Self {
        Uri { value }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Everything up to and including the last `#` or `/`
    pub fn namespace(&self) -> &str {
        match self.value.rfind(|c: char| c == '#' || c == '/') {
            Some(pos) => &self.value[..=pos],
            None => &self.value,
        }
    }

    /// Resolve a reference found in a document whose base is `self`
    ///
    /// Handles absolute references, fragments, absolute paths and relative
    /// paths with `.` and `..` segments. Query strings are kept verbatim.
    pub fn resolve(&self, reference: &str) -> Uri {
        if is_absolute(reference) {
            return Uri::new(reference.to_string());
        }
        if reference.is_empty() {
            return Uri::new(self.without_fragment().to_string());
        }
        if reference.starts_with('#') {
            return Uri::new(format!("{}{}", self.without_fragment(), reference));
        }

        let (origin, base_path) = self.split_origin();
        let path = if reference.starts_with('/') {
            reference.to_string()
        } else {
            let directory = match base_path.rfind('/') {
                Some(pos) => &base_path[..=pos],
                None => "/",
            };
            format!("{}{}", directory, reference)
        };
        Uri::new(format!("{}{}", origin, remove_dot_segments(&path)))
    }

    fn without_fragment(&self) -> &str {
        match self.value.find('#') {
            Some(pos) => &self.value[..pos],
            None => &self.value,
        }
    }

    /// Split into `scheme://authority` and the path (fragment dropped)
    fn split_origin(&self) -> (&str, &str) {
        let value = self.without_fragment();
        let authority_start = match value.find("://") {
            Some(pos) => pos + 3,
            None => return match value.find(':') {
                Some(pos) => (&value[..=pos], &value[pos + 1..]),
                None => ("", value),
            },
        };
        match value[authority_start..].find('/') {
            Some(pos) => value.split_at(authority_start + pos),
            None => (value, ""),
        }
    }
}

fn remove_dot_segments(path: &str) -> String {
    let (path, query) = match path.find('?') {
        Some(pos) => path.split_at(pos),
        None => (path, ""),
    };

    let mut segments: Vec<&str> = Vec::new();
    let parts: Vec<&str> = path.split('/').collect();
    for (i, segment) in parts.iter().enumerate() {
        let last = i + 1 == parts.len();
        match *segment {
            "." => {
                if last {
                    segments.push("");
                }
            }
            ".." => {
                if segments.len() > 1 {
                    segments.pop();
                }
                if last {
                    segments.push("");
                }
            }
            other => segments.push(other),
        }
    }
    format!("{}{}", segments.join("/"), query)
}

/// Check for a scheme prefix (`scheme:`)
pub fn is_absolute(value: &str) -> bool {
    match value.find(':') {
        Some(pos) if pos > 0 => value[..pos]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.'),
        _ => false,
    }
}

impl fmt::Debug for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.value)
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.value)
    }
}
