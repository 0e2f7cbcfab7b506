//! Attribute ↔ column naming for `underscored` models.

/// Convert a single identifier from camelCase to snake_case.
/// e.g. "displayName" -> "display_name", "createdAt" -> "created_at"
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::to_snake_case;

    #[test]
    fn snake_case() {
        assert_eq!(to_snake_case("displayName"), "display_name");
        assert_eq!(to_snake_case("deletedAt"), "deleted_at");
        assert_eq!(to_snake_case("email"), "email");
        assert_eq!(to_snake_case("owner_Id"), "owner_id");
    }
}
