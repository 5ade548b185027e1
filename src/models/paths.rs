//! Helpers for schema and module identifiers
//!
//! Identifiers are absolute, `/`-separated paths relative to the input root,
//! e.g. module `/customers` and schema `/customers/Customer.yaml`.

/// Module identifier of a schema (its directory)
pub fn module_id(schema_id: &str) -> &str {
    match schema_id.rfind('/') {
        Some(0) => "/",
        Some(index) => &schema_id[..index],
        None => "",
    }
}

/// File name of a schema without its extension
pub fn schema_name(schema_id: &str) -> &str {
    let base = module_name(schema_id);
    match base.rfind('.') {
        Some(index) if index > 0 => &base[..index],
        _ => base,
    }
}

/// Last path segment of an identifier
pub fn module_name(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

/// Resolve a reference path against the directory of `from_id`
///
/// Absolute references (`/m/S.yaml`) are only normalized. Returns `None`
/// when the path climbs above the input root.
pub fn resolve_relative_id(from_id: &str, relative: &str) -> Option<String> {
    let joined = if relative.starts_with('/') {
        relative.to_string()
    } else {
        format!("{}/{}", module_id(from_id), relative)
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    Some(format!("/{}", segments.join("/")))
}

/// Relative link from a directory to another identifier
///
/// Mirrors `path.relative` semantics and always starts with `./` or `../`.
pub fn relative_link(from_dir: &str, to_id: &str) -> String {
    let from: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = to_id.split('/').filter(|s| !s.is_empty()).collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = vec![".."; from.len() - common];
    parts.extend(to[common..].iter().copied());

    let relative = parts.join("/");
    if relative.starts_with("..") {
        relative
    } else {
        format!("./{}", relative)
    }
}

/// Turn a name into a type name: drop non-alphanumerics, capitalize the first letter
pub fn clean_name(name: &str) -> String {
    let cleaned: String = name.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    let mut chars = cleaned.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_id() {
        assert_eq!(module_id("/customers/Customer.yaml"), "/customers");
        assert_eq!(module_id("/a/b/C.yaml"), "/a/b");
        assert_eq!(module_id("/Root.yaml"), "/");
    }

    #[test]
    fn test_schema_name() {
        assert_eq!(schema_name("/customers/Customer.yaml"), "Customer");
        assert_eq!(schema_name("/customers/Customer.v2.yaml"), "Customer.v2");
        assert_eq!(module_name("/customers"), "customers");
    }

    #[test]
    fn test_resolve_relative_id() {
        assert_eq!(
            resolve_relative_id("/a/A.yaml", "B.yaml").as_deref(),
            Some("/a/B.yaml")
        );
        assert_eq!(
            resolve_relative_id("/a/A.yaml", "./B.yaml").as_deref(),
            Some("/a/B.yaml")
        );
        assert_eq!(
            resolve_relative_id("/a/A.yaml", "../b/B.yaml").as_deref(),
            Some("/b/B.yaml")
        );
        assert_eq!(
            resolve_relative_id("/a/A.yaml", "/b/B.yaml").as_deref(),
            Some("/b/B.yaml")
        );
        assert_eq!(resolve_relative_id("/a/A.yaml", "../../B.yaml"), None);
    }

    #[test]
    fn test_relative_link() {
        assert_eq!(relative_link("/a", "/a/B.yaml"), "./B.yaml");
        assert_eq!(relative_link("/a", "/b/C.yaml"), "../b/C.yaml");
        assert_eq!(relative_link("/", "/a"), "./a");
        assert_eq!(relative_link("/a/b", "/c/D.yaml"), "../../c/D.yaml");
    }

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("sub-object"), "Subobject");
        assert_eq!(clean_name("address_line"), "Addressline");
        assert_eq!(clean_name("status"), "Status");
        assert_eq!(clean_name("--"), "");
    }
}
