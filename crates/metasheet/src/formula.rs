//! Formula text builders
//!
//! Each builder returns the exact formula string, leading `=` included.
//! Nothing here evaluates a formula.

/// Quote a sheet name for use in a reference when it needs it
pub fn quote_sheet(sheet: &str) -> String {
    let plain = !sheet.is_empty() && sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        sheet.to_string()
    } else {
        format!("'{}'", sheet.replace('\'', "''"))
    }
}

/// Absolute reference like `$F$22` (row is 0-based)
pub fn abs_ref(col: &str, row: u32) -> String {
    format!("${}${}", col, row + 1)
}

/// Absolute reference into another sheet, like `Sample!$F$22`
pub fn sheet_ref(sheet: &str, col: &str, row: u32) -> String {
    format!("{}!{}", quote_sheet(sheet), abs_ref(col, row))
}

/// Whole-column range like `'Index List'!$A:$B`
pub fn column_range(sheet: &str, first: &str, last: &str) -> String {
    format!("{}!${}:${}", quote_sheet(sheet), first, last)
}

/// `=ref`
pub fn passthrough(reference: &str) -> String {
    format!("={}", reference)
}

/// `=a&"sep"&b`
pub fn concat(left: &str, separator: &str, right: &str) -> String {
    format!("={}&\"{}\"&{}", left, separator.replace('"', "\"\""), right)
}

/// `=VLOOKUP(key,range,col,FALSE)`
pub fn vlookup(key: &str, range: &str, column: u32) -> String {
    format!("=VLOOKUP({},{},{},FALSE)", key, range, column)
}

/// Reverse lookup that yields `""` when the key is absent
pub fn index_match(result_range: &str, key: &str, key_range: &str) -> String {
    format!(
        "=IFERROR(INDEX({},MATCH({},{},0)),\"\")",
        result_range, key, key_range
    )
}

/// Reverse the first `width` characters of a cell
///
/// Built from single-character `MID` extractions in descending position.
pub fn reverse(reference: &str, width: u32) -> String {
    let parts: Vec<String> = (1..=width)
        .rev()
        .map(|pos| format!("MID({},{},1)", reference, pos))
        .collect();
    format!("={}", parts.join("&"))
}

/// Substitution steps of the base complement
///
/// The placeholder digits keep a base from being mapped twice, so the
/// order matters.
pub const COMPLEMENT_STEPS: [(&str, &str); 8] = [
    ("A", "1"),
    ("C", "2"),
    ("G", "3"),
    ("T", "4"),
    ("1", "T"),
    ("2", "G"),
    ("3", "C"),
    ("4", "A"),
];

/// Base complement of a cell as a chained `SUBSTITUTE`
pub fn complement(reference: &str) -> String {
    let expr = COMPLEMENT_STEPS
        .iter()
        .fold(reference.to_string(), |inner, (from, to)| {
            format!("SUBSTITUTE({},\"{}\",\"{}\")", inner, from, to)
        });
    format!("={}", expr)
}

/// One branch of the classification chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassRule {
    /// Accepted prefixes of the first cell
    pub first: &'static [&'static str],
    /// Accepted prefixes of the second cell; empty means unchecked
    pub second: &'static [&'static str],
    /// Result when the rule matches
    pub label: &'static str,
}

/// Sample classification rules, first match wins
pub const SAMPLE_CLASS_RULES: [ClassRule; 7] = [
    ClassRule { first: &["GS", "GT"], second: &["B", "S"], label: "WGS" },
    ClassRule { first: &["GS", "GT"], second: &["T", "F"], label: "WGS-FFPE" },
    ClassRule { first: &["EX", "ES"], second: &["B", "S"], label: "WES" },
    ClassRule { first: &["EX", "ES"], second: &["T", "F"], label: "WES-FFPE" },
    ClassRule { first: &["N"], second: &["P"], label: "NIPT" },
    ClassRule { first: &["R"], second: &[], label: "RNA" },
    ClassRule { first: &["P"], second: &[], label: "PANEL" },
];

fn prefix_test(reference: &str, prefixes: &[&str]) -> String {
    let mut tests: Vec<String> = prefixes
        .iter()
        .map(|p| format!("LEFT({},{})=\"{}\"", reference, p.chars().count(), p))
        .collect();
    if tests.len() == 1 {
        tests.remove(0)
    } else {
        format!("OR({})", tests.join(","))
    }
}

/// Nested `IF` chain over `rules`, falling back to `first` itself
pub fn classify(first: &str, second: &str, rules: &[ClassRule]) -> String {
    let mut expr = first.to_string();
    for rule in rules.iter().rev() {
        let mut condition = prefix_test(first, rule.first);
        if !rule.second.is_empty() {
            condition = format!("AND({},{})", condition, prefix_test(second, rule.second));
        }
        expr = format!("IF({},\"{}\",{})", condition, rule.label, expr);
    }
    format!("={}", expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quote_sheet() {
        assert_eq!(quote_sheet("Sample"), "Sample");
        assert_eq!(quote_sheet("SampleImport"), "SampleImport");
        assert_eq!(quote_sheet("Index List"), "'Index List'");
        assert_eq!(quote_sheet("Index i7"), "'Index i7'");
        assert_eq!(quote_sheet("Bob's"), "'Bob''s'");
    }

    #[test]
    fn test_references() {
        assert_eq!(abs_ref("F", 21), "$F$22");
        assert_eq!(sheet_ref("Sample", "B", 21), "Sample!$B$22");
        assert_eq!(sheet_ref("Aviti Manifest", "A", 15), "'Aviti Manifest'!$A$16");
        assert_eq!(column_range("Index List", "A", "B"), "'Index List'!$A:$B");
    }

    #[test]
    fn test_lookup_builders() {
        assert_eq!(
            vlookup("$F$22", &column_range("Index List", "A", "B"), 2),
            "=VLOOKUP($F$22,'Index List'!$A:$B,2,FALSE)"
        );
        assert_eq!(
            index_match(
                &column_range("Index i7", "A", "A"),
                "Sample!$F$22",
                &column_range("Index i7", "B", "B")
            ),
            "=IFERROR(INDEX('Index i7'!$A:$A,MATCH(Sample!$F$22,'Index i7'!$B:$B,0)),\"\")"
        );
        assert_eq!(
            concat("Sample!$B$22", "_", "Sample!$C$22"),
            "=Sample!$B$22&\"_\"&Sample!$C$22"
        );
        assert_eq!(passthrough("Sample!$F$22"), "=Sample!$F$22");
    }

    #[test]
    fn test_reverse() {
        assert_eq!(reverse("$E$16", 3), "=MID($E$16,3,1)&MID($E$16,2,1)&MID($E$16,1,1)");
        let full = reverse("$C$24", 30);
        assert!(full.starts_with("=MID($C$24,30,1)&MID($C$24,29,1)&"));
        assert!(full.ends_with("&MID($C$24,1,1)"));
        assert_eq!(full.matches("MID(").count(), 30);
    }

    #[test]
    fn test_complement_order() {
        assert_eq!(
            complement("X"),
            "=SUBSTITUTE(SUBSTITUTE(SUBSTITUTE(SUBSTITUTE(SUBSTITUTE(SUBSTITUTE(SUBSTITUTE(SUBSTITUTE(\
             X,\"A\",\"1\"),\"C\",\"2\"),\"G\",\"3\"),\"T\",\"4\"),\"1\",\"T\"),\"2\",\"G\"),\"3\",\"C\"),\"4\",\"A\")"
        );
    }

    #[test]
    fn test_classify_small_chain() {
        let rules = [
            ClassRule { first: &["GS", "GT"], second: &["B"], label: "WGS" },
            ClassRule { first: &["R"], second: &[], label: "RNA" },
        ];
        assert_eq!(
            classify("X", "Y", &rules),
            "=IF(AND(OR(LEFT(X,2)=\"GS\",LEFT(X,2)=\"GT\"),LEFT(Y,1)=\"B\"),\"WGS\",IF(LEFT(X,1)=\"R\",\"RNA\",X))"
        );
    }

    #[test]
    fn test_classify_priority_order() {
        let formula = classify("Sample!$C$22", "Sample!$E$22", &SAMPLE_CLASS_RULES);
        let labels = ["\"WGS\"", "\"WGS-FFPE\"", "\"WES\"", "\"WES-FFPE\"", "\"NIPT\"", "\"RNA\"", "\"PANEL\""];
        let positions: Vec<usize> = labels.iter().map(|l| formula.find(l).unwrap()).collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
        assert!(formula.starts_with("=IF(AND(OR(LEFT(Sample!$C$22,2)=\"GS\""));
        assert!(formula.ends_with(",Sample!$C$22)))))))"));
    }
}
