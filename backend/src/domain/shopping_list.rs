//! Shopping-list aggregation and rendering.
//!
//! Ingredient rows of every recipe in a user's cart are grouped by
//! `(name, measurement_unit)` and their amounts summed. Rendering sorts
//! groups alphabetically by name, then unit, so the downloaded document
//! is deterministic regardless of how the rows were produced.

/// One aggregated ingredient group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListLine {
    pub name: String,
    pub measurement_unit: String,
    /// Summed amount across all cart recipes; i64 because sums may exceed
    /// the per-link bound.
    pub total: i64,
}

/// Render aggregated lines as the downloadable plain-text document.
///
/// Output format is one `{name} - {total} ({unit})` line per group,
/// newline-joined, with no trailing newline.
pub fn render(mut lines: Vec<ShoppingListLine>) -> String {
    lines.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.measurement_unit.cmp(&b.measurement_unit))
    });
    lines
        .iter()
        .map(|line| {
            format!(
                "{} - {} ({})",
                line.name, line.total, line.measurement_unit
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn line(name: &str, unit: &str, total: i64) -> ShoppingListLine {
        ShoppingListLine {
            name: name.to_owned(),
            measurement_unit: unit.to_owned(),
            total,
        }
    }

    #[rstest]
    fn renders_sorted_lines() {
        let text = render(vec![
            line("salt", "g", 10),
            line("flour", "g", 300),
            line("milk", "ml", 500),
        ]);
        assert_eq!(text, "flour - 300 (g)\nmilk - 500 (ml)\nsalt - 10 (g)");
    }

    #[rstest]
    fn same_name_sorts_by_unit() {
        let text = render(vec![line("sugar", "tbsp", 2), line("sugar", "g", 100)]);
        assert_eq!(text, "sugar - 100 (g)\nsugar - 2 (tbsp)");
    }

    #[rstest]
    fn empty_cart_renders_empty_document() {
        assert_eq!(render(vec![]), "");
    }
}
