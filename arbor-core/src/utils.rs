//! Utility functions shared by the container crates
//!
//! Naming conventions, delimiter tokenizing and resource path arithmetic.

/// Naming convention utilities for bean names
pub mod naming {
    /// Converts a PascalCase type name to camelCase for bean naming.
    ///
    /// This is the default bean naming strategy for configuration classes,
    /// where `UserService` becomes `userService`. A name that starts with two
    /// upper-case letters is kept as-is (`URLService` stays `URLService`).
    ///
    /// # Examples
    ///
    /// ```
    /// use arbor_core::utils::naming::to_camel_case;
    ///
    /// assert_eq!(to_camel_case("UserService"), "userService");
    /// assert_eq!(to_camel_case("URLService"), "URLService");
    /// assert_eq!(to_camel_case("A"), "a");
    /// assert_eq!(to_camel_case(""), "");
    /// ```
    pub fn to_camel_case(s: &str) -> String {
        let mut chars = s.chars();
        match chars.next() {
            None => String::new(),
            Some(first) => {
                if first.is_uppercase() && chars.clone().next().is_some_and(char::is_uppercase) {
                    return s.to_string();
                }
                let mut result = String::with_capacity(s.len());
                result.extend(first.to_lowercase());
                result.push_str(chars.as_str());
                result
            }
        }
    }

    /// Returns the last path segment of a type or class name.
    ///
    /// ```
    /// use arbor_core::utils::naming::short_name;
    ///
    /// assert_eq!(short_name("app::config::AppConfig"), "AppConfig");
    /// assert_eq!(short_name("com.example.User"), "User");
    /// assert_eq!(short_name("User"), "User");
    /// ```
    pub fn short_name(s: &str) -> &str {
        let tail = s.rsplit("::").next().unwrap_or(s);
        tail.rsplit('.').next().unwrap_or(tail)
    }
}

/// String helpers for multi-value attributes
pub mod strings {
    /// 多值属性的分隔符（profile、name、depends-on 等）
    pub const MULTI_VALUE_DELIMITERS: &str = ",; \t\n";

    /// 是否包含非空白字符
    pub fn has_text(s: &str) -> bool {
        s.chars().any(|c| !c.is_whitespace())
    }

    /// Splits `s` on any of the given delimiter characters, trims each token
    /// and drops the empty ones.
    ///
    /// ```
    /// use arbor_core::utils::strings::tokenize;
    ///
    /// assert_eq!(tokenize("dev, test;;prod", ",; "), vec!["dev", "test", "prod"]);
    /// assert!(tokenize("  ", ",; ").is_empty());
    /// ```
    pub fn tokenize(s: &str, delimiters: &str) -> Vec<String> {
        s.split(|c: char| delimiters.contains(c))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Resource path arithmetic
pub mod paths {
    const FOLDER_SEPARATOR: char = '/';

    /// Applies a relative path to a base path, replacing the last segment of
    /// the base.
    ///
    /// ```
    /// use arbor_core::utils::paths::apply_relative_path;
    ///
    /// assert_eq!(apply_relative_path("a/root.xml", "child.xml"), "a/child.xml");
    /// assert_eq!(apply_relative_path("a/root.xml", "/child.xml"), "a/child.xml");
    /// assert_eq!(apply_relative_path("root.xml", "child.xml"), "child.xml");
    /// ```
    pub fn apply_relative_path(path: &str, relative_path: &str) -> String {
        match path.rfind(FOLDER_SEPARATOR) {
            Some(separator_index) => {
                let mut new_path = path[..separator_index].to_string();
                if !relative_path.starts_with(FOLDER_SEPARATOR) {
                    new_path.push(FOLDER_SEPARATOR);
                }
                new_path.push_str(relative_path);
                new_path
            }
            None => relative_path.to_string(),
        }
    }

    /// Normalizes a path: backslashes become slashes, `.` segments are
    /// dropped and `..` segments consume their predecessor where possible.
    /// A `scheme:` prefix and a leading slash are preserved.
    ///
    /// ```
    /// use arbor_core::utils::paths::clean_path;
    ///
    /// assert_eq!(clean_path("a/./b/../c.xml"), "a/c.xml");
    /// assert_eq!(clean_path("/a//b.xml"), "/a/b.xml");
    /// assert_eq!(clean_path("../a/b.xml"), "../a/b.xml");
    /// assert_eq!(clean_path("file:a\\b\\..\\c.xml"), "file:a/c.xml");
    /// ```
    pub fn clean_path(path: &str) -> String {
        let normalized = path.replace('\\', "/");

        let (prefix, rest) = match normalized.find(':') {
            Some(index) if !normalized[..index].contains(FOLDER_SEPARATOR) => {
                normalized.split_at(index + 1)
            }
            _ => ("", normalized.as_str()),
        };

        let absolute = rest.starts_with(FOLDER_SEPARATOR);
        let mut segments: Vec<&str> = Vec::new();
        for segment in rest.split(FOLDER_SEPARATOR) {
            match segment {
                "" | "." => {}
                ".." => match segments.last() {
                    Some(&last) if last != ".." => {
                        segments.pop();
                    }
                    _ if absolute => {}
                    _ => segments.push(".."),
                },
                other => segments.push(other),
            }
        }

        let mut cleaned = String::with_capacity(normalized.len());
        cleaned.push_str(prefix);
        if absolute {
            cleaned.push(FOLDER_SEPARATOR);
        }
        cleaned.push_str(&segments.join("/"));
        cleaned
    }

    /// 路径的最后一段
    pub fn filename(path: &str) -> Option<&str> {
        path.rsplit(FOLDER_SEPARATOR)
            .next()
            .filter(|name| !name.is_empty())
    }
}
