/// Category names are used verbatim in lookup keys and notification titles,
/// so the accepted alphabet is deliberately narrow.
pub fn validate_category_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("Category name is required.");
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err("Category name can only contain letters, numbers or hyphens.");
    }
    Ok(())
}

/// Parse a `#RRGGBB` color into its 24-bit value.
pub fn parse_hex_color(color: &str) -> Result<u32, &'static str> {
    let digits = color
        .strip_prefix('#')
        .filter(|d| d.len() == 6)
        .ok_or("Invalid color format.")?;
    u32::from_str_radix(digits, 16).map_err(|_| "Invalid color format.")
}
