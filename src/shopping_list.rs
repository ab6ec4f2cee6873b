//! Shopping-list export: cart ingredient rows summed per (name, unit).

use std::collections::HashMap;

pub const HEADER: &str = "Shopping list:";
pub const FILENAME: &str = "shopping_list.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Groups by (name, unit), keeping the order each pair was first seen.
pub fn aggregate(lines: Vec<CartLine>) -> Vec<CartLine> {
    let mut totals: Vec<CartLine> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for line in lines {
        let key = (line.name.clone(), line.measurement_unit.clone());
        match index.get(&key) {
            Some(&position) => {
                let total = &mut totals[position].amount;
                *total = total.saturating_add(line.amount);
            }
            None => {
                index.insert(key, totals.len());
                totals.push(line);
            }
        }
    }

    totals
}

pub fn render(lines: Vec<CartLine>) -> String {
    let mut document = format!("{HEADER}\n");
    for line in aggregate(lines) {
        document.push_str(&format!(
            "• {} ({}) - {}\n",
            line.name, line.measurement_unit, line.amount
        ));
    }
    document
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, unit: &str, amount: i64) -> CartLine {
        CartLine {
            name: name.into(),
            measurement_unit: unit.into(),
            amount,
        }
    }

    #[test]
    fn sums_amounts_of_the_same_ingredient() {
        let document = render(vec![line("Salt", "g", 5), line("Salt", "g", 3)]);
        assert_eq!(document, "Shopping list:\n• Salt (g) - 8\n");
    }

    #[test]
    fn keeps_first_seen_order() {
        let document = render(vec![
            line("Water", "ml", 200),
            line("Flour", "g", 100),
            line("Water", "ml", 50),
            line("Apple", "pcs", 2),
        ]);
        assert_eq!(
            document,
            "Shopping list:\n• Water (ml) - 250\n• Flour (g) - 100\n• Apple (pcs) - 2\n"
        );
    }

    #[test]
    fn large_totals_do_not_overflow() {
        let totals = aggregate(vec![line("Salt", "g", i64::MAX), line("Salt", "g", i64::MAX)]);
        assert_eq!(totals[0].amount, i64::MAX);

        let max = i32::MAX as i64;
        let document = render(vec![line("Salt", "g", max), line("Salt", "g", max)]);
        assert_eq!(document, format!("Shopping list:\n• Salt (g) - {}\n", 2 * max));
    }

    #[test]
    fn different_units_stay_separate() {
        let totals = aggregate(vec![line("Sugar", "g", 10), line("Sugar", "tbsp", 1)]);
        assert_eq!(totals.len(), 2);
    }

    #[test]
    fn empty_cart_renders_header_only() {
        assert_eq!(render(Vec::new()), "Shopping list:\n");
    }
}
