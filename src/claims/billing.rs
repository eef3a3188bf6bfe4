use anyhow::{Context, Result};

use crate::data::{BillingLine, BillingTable};

/// Lines for a diagnosis; diagnoses missing from the table (or listed with no
/// items) get a general consultation plus a general lab test.
pub fn get_billing_items_for_diagnosis(diagnosis: &str, table: &BillingTable) -> Vec<BillingLine> {
    match table.get(diagnosis) {
        Some(lines) if !lines.is_empty() => lines.clone(),
        _ => fallback_lines(),
    }
}

pub fn fallback_lines() -> Vec<BillingLine> {
    vec![
        BillingLine::new("Consultation", "General Consultation", "1", "1000", "1000"),
        BillingLine::new("Lab Test", "General Lab Test", "1", "500", "500"),
    ]
}

/// Sum of each line's `total` field. Quantity and unit price are not checked.
pub fn total_amount(lines: &[BillingLine]) -> Result<f64> {
    lines.iter().try_fold(0.0, |acc, line| {
        let value: f64 = line
            .total
            .trim()
            .parse()
            .with_context(|| format!("Invalid total {:?} for item {:?}", line.total, line.item))?;
        Ok(acc + value)
    })
}

pub fn format_total(amount: f64) -> String {
    format!("Rs {:.2}", amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> BillingTable {
        let mut t = BillingTable::new();
        t.insert(
            "Flu".into(),
            vec![BillingLine::new("Consult", "GP visit", "1", "800", "800")],
        );
        t.insert("Empty".into(), Vec::new());
        t
    }

    #[test]
    fn known_diagnosis_uses_table() {
        let lines = get_billing_items_for_diagnosis("Flu", &table());
        assert_eq!(lines, vec![BillingLine::new("Consult", "GP visit", "1", "800", "800")]);
    }

    #[test]
    fn unknown_diagnosis_gets_exact_fallback() {
        for diagnosis in ["Migraine", "", "flu", "Empty"] {
            let lines = get_billing_items_for_diagnosis(diagnosis, &table());
            assert_eq!(lines.len(), 2);
            assert_eq!(lines[0].cells(), ["Consultation", "General Consultation", "1", "1000", "1000"]);
            assert_eq!(lines[1].cells(), ["Lab Test", "General Lab Test", "1", "500", "500"]);
        }
    }

    #[test]
    fn total_sums_line_totals_only() {
        let lines = vec![
            BillingLine::new("A", "", "2", "100", "150.5"),
            BillingLine::new("B", "", "1", "10", "49.25"),
        ];
        let total = total_amount(&lines).unwrap();
        assert_eq!(format_total(total), "Rs 199.75");
    }

    #[test]
    fn fallback_total() {
        assert_eq!(format_total(total_amount(&fallback_lines()).unwrap()), "Rs 1500.00");
    }

    #[test]
    fn unparseable_total_is_an_error() {
        let lines = vec![BillingLine::new("A", "", "1", "1", "n/a")];
        assert!(total_amount(&lines).is_err());
    }
}
