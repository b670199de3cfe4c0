//! Number format types

/// Number format for cell display
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum NumberFormat {
    /// General format (default)
    #[default]
    General,

    /// Built-in format by ID
    BuiltIn(u32),

    /// Custom format string
    Custom(String),
}

impl NumberFormat {
    /// 0 - General
    pub const ID_GENERAL: u32 = 0;
    /// 1 - 0
    pub const ID_NUMBER_INT: u32 = 1;
    /// 2 - 0.00
    pub const ID_NUMBER_DEC2: u32 = 2;
    /// 14 - mm-dd-yy
    pub const ID_DATE_SHORT: u32 = 14;
    /// 22 - m/d/yy h:mm
    pub const ID_DATETIME: u32 = 22;
    /// 49 - @
    pub const ID_TEXT: u32 = 49;

    /// First numFmtId available for custom formats in a styles part
    pub const FIRST_CUSTOM_ID: u32 = 164;

    /// Day-first date format used for collection dates
    pub const DAY_MONTH_YEAR: &'static str = "dd/mm/yyyy";

    /// Create a number format from a format string
    ///
    /// Strings that match a built-in format resolve to that built-in ID.
    pub fn from_string<S: Into<String>>(format: S) -> Self {
        let format = format.into();
        match Self::builtin_id(&format) {
            Some(0) => NumberFormat::General,
            Some(id) => NumberFormat::BuiltIn(id),
            None => NumberFormat::Custom(format),
        }
    }

    /// Create a built-in format by ID
    pub fn from_id(id: u32) -> Self {
        if id == Self::ID_GENERAL {
            NumberFormat::General
        } else {
            NumberFormat::BuiltIn(id)
        }
    }

    /// Day-first date (dd/mm/yyyy)
    pub fn date_dmy() -> Self {
        NumberFormat::Custom(Self::DAY_MONTH_YEAR.to_string())
    }

    /// Text format (@)
    pub fn text() -> Self {
        NumberFormat::BuiltIn(Self::ID_TEXT)
    }

    /// Get the format string
    pub fn format_string(&self) -> &str {
        match self {
            NumberFormat::General => "General",
            NumberFormat::BuiltIn(id) => Self::builtin_format_string(*id),
            NumberFormat::Custom(s) => s,
        }
    }

    /// Built-in ID for this format, if it has one
    pub fn id(&self) -> Option<u32> {
        match self {
            NumberFormat::General => Some(Self::ID_GENERAL),
            NumberFormat::BuiltIn(id) => Some(*id),
            NumberFormat::Custom(_) => None,
        }
    }

    fn builtin_format_string(id: u32) -> &'static str {
        match id {
            1 => "0",
            2 => "0.00",
            3 => "#,##0",
            4 => "#,##0.00",
            9 => "0%",
            10 => "0.00%",
            11 => "0.00E+00",
            14 => "mm-dd-yy",
            15 => "d-mmm-yy",
            16 => "d-mmm",
            17 => "mmm-yy",
            18 => "h:mm AM/PM",
            19 => "h:mm:ss AM/PM",
            20 => "h:mm",
            21 => "h:mm:ss",
            22 => "m/d/yy h:mm",
            49 => "@",
            _ => "General",
        }
    }

    fn builtin_id(format: &str) -> Option<u32> {
        let id = match format {
            "General" => 0,
            "0" => 1,
            "0.00" => 2,
            "#,##0" => 3,
            "#,##0.00" => 4,
            "0%" => 9,
            "0.00%" => 10,
            "0.00E+00" => 11,
            "mm-dd-yy" => 14,
            "d-mmm-yy" => 15,
            "d-mmm" => 16,
            "mmm-yy" => 17,
            "h:mm AM/PM" => 18,
            "h:mm:ss AM/PM" => 19,
            "h:mm" => 20,
            "h:mm:ss" => 21,
            "m/d/yy h:mm" => 22,
            "@" => 49,
            _ => return None,
        };
        Some(id)
    }

    /// Check if this is a date/time format
    pub fn is_date_format(&self) -> bool {
        match self {
            NumberFormat::BuiltIn(id) => matches!(id, 14..=22),
            NumberFormat::Custom(s) => {
                // Simple heuristic: date/time placeholders outside quoted literals
                let lower = s.to_lowercase();
                (lower.contains('y') || lower.contains('d') || lower.contains('h'))
                    && !lower.contains('"')
            }
            NumberFormat::General => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_string_resolves_builtins() {
        assert_eq!(NumberFormat::from_string("General"), NumberFormat::General);
        assert_eq!(NumberFormat::from_string("0.00"), NumberFormat::BuiltIn(2));
        assert_eq!(
            NumberFormat::from_string("dd/mm/yyyy"),
            NumberFormat::Custom("dd/mm/yyyy".into())
        );
    }

    #[test]
    fn test_format_string() {
        assert_eq!(NumberFormat::date_dmy().format_string(), "dd/mm/yyyy");
        assert_eq!(NumberFormat::text().format_string(), "@");
        assert_eq!(NumberFormat::from_id(14).format_string(), "mm-dd-yy");
    }

    #[test]
    fn test_is_date_format() {
        assert!(NumberFormat::date_dmy().is_date_format());
        assert!(NumberFormat::BuiltIn(14).is_date_format());
        assert!(!NumberFormat::BuiltIn(2).is_date_format());
        assert!(!NumberFormat::General.is_date_format());
    }
}
