use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;
use validator::ValidationError;

lazy_static! {
    // Allows:
    // - ASCII Alphanumeric characters (a-z, A-Z, 0-9)
    // - Common symbols used in company and project names (&@!-+)
    // - Parentheses ()
    // - Underscore and dot for technical names (_.)
    // - Spaces (will be trimmed)
    static ref ALPHANUMERIC_WITH_SYMBOLS: Regex = Regex::new(r"^[a-zA-Z0-9\s&@!()\-+._]+$").unwrap();
    static ref HEX_COLOR: Regex = Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap();
}

pub fn validate_alphanumeric_with_symbols(value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if !ALPHANUMERIC_WITH_SYMBOLS.is_match(trimmed) {
        return Err(
            ValidationError::new("invalid_characters").with_message(Cow::Borrowed(
                "Only ASCII alphanumeric characters and &@!()-_+. are allowed",
            )),
        );
    }
    Ok(())
}

pub fn validate_hex_color(value: &str) -> Result<(), ValidationError> {
    if !HEX_COLOR.is_match(value) {
        return Err(ValidationError::new("hex_color")
            .with_message(Cow::Borrowed("Color must be a #rrggbb hex value")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names_with_symbols() {
        let valid_names = vec![
            // Basic alphanumeric
            "MyStudio123",
            "UPPERCASE",
            "lowercase",
            "12345",
            // With spaces (will be trimmed)
            "My Studio",
            "  Trimmed Space  ",
            "Multiple   Spaces   Here",
            // With special characters
            "Studio & Partners",
            "Reel.io",
            "Launch (Beta)",
            "Studio-Name",
            "Cut+Color",
            "My_Project",
            "Studio.com",
            "Launch@2024",
            "Render!",
            // Complex combinations
            "My Studio & Partners (2024)",
            "Reel.io - Beta Release",
            "Project_Name@Version2.0",
            "My-Amazing.Project_v1",
        ];

        for name in valid_names {
            assert!(
                validate_alphanumeric_with_symbols(name).is_ok(),
                "Should accept valid name: {}",
                name
            );
        }
    }

    #[test]
    fn test_invalid_names_with_symbols() {
        let invalid_names = vec![
            // Invalid special characters
            "Studio$Name",
            "Project#Tag",
            "Name*Star",
            "Studio\\Division",
            "Project/Name",
            "Studio%20",
            "Name^Power",
            "Studio=Product",
            "Project{Dev}",
            // Empty or whitespace only
            "",
            "   ",
            "\t",
            "\n",
            // Unicode characters
            "Studio™",
            "Café",
            "Studio•Name",
            "Project→Future",
        ];

        for name in invalid_names {
            assert!(
                validate_alphanumeric_with_symbols(name).is_err(),
                "Should reject invalid name: {}",
                name
            );
        }
    }

    #[test]
    fn test_hex_colors() {
        let valid_colors = vec!["#000000", "#ffffff", "#FF8800", "#a1B2c3"];
        for color in valid_colors {
            assert!(
                validate_hex_color(color).is_ok(),
                "Should accept valid color: {}",
                color
            );
        }

        let invalid_colors = vec![
            "000000", "#fff", "#ffffffff", "#ggg000", "red", "", "# 00000", "#00000g",
        ];
        for color in invalid_colors {
            assert!(
                validate_hex_color(color).is_err(),
                "Should reject invalid color: {}",
                color
            );
        }
    }
}
