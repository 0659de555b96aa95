//! Attribute normalisation for product records.
//!
//! Free-text ingredient statements, amount strings, and EAN codes arrive in
//! whatever shape the upstream catalogue produced. Everything here is lossy by
//! intent: input that cannot be read yields `None` or is passed through, and
//! never an error.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::product::Ingredient;

pub const EAN_LENGTH: usize = 14;

/// Reads an amount such as `20`, `4,6`, `0.4 %` or `13%`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim().trim_end_matches('%').trim();
    if trimmed.is_empty() {
        return None;
    }

    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
}

/// Splits an ingredient statement into named entries with optional amounts.
///
/// `"Ingredienser: vatten, socker (20%), salt"` becomes
/// `[vatten, socker (20.0), salt]`.
pub fn parse_ingredient_statement(statement: &str) -> Vec<Ingredient> {
    let body = match statement.split_once(':') {
        Some((_, rest)) => rest,
        None => statement,
    };

    split_top_level(body)
        .into_iter()
        .filter_map(|part| {
            let (name, amount) = split_amount(&part);
            let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
            (!name.is_empty()).then(|| Ingredient::new(name, amount))
        })
        .collect()
}

/// Left-pads a purely numeric EAN to `length` digits after dropping leading
/// zeros. Non-numeric input is returned unchanged.
pub fn normalize_ean(raw: &str, length: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
        return raw.to_owned();
    }

    let significant = trimmed.trim_start_matches('0');
    let significant = if significant.is_empty() { "0" } else { significant };
    format!("{significant:0>length$}")
}

fn split_top_level(body: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for ch in body.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_owned());
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() {
        parts.push(current.trim().to_owned());
    }

    parts.into_iter().filter(|part| !part.is_empty()).collect()
}

fn split_amount(part: &str) -> (String, Option<f64>) {
    let patterns = IngredientPatterns::get();
    let amount = patterns
        .parenthetical
        .captures(part)
        .and_then(|group| group.get(1))
        .and_then(|content| patterns.quantity.captures(content.as_str()))
        .and_then(|quantity| parse_amount(quantity[1].trim_end_matches([',', '.'])));

    match amount {
        Some(amount) => {
            (patterns.parenthetical.replace_all(part, "").trim().to_owned(), Some(amount))
        }
        None => (part.to_owned(), None),
    }
}

static INGREDIENT_PATTERNS: OnceLock<IngredientPatterns> = OnceLock::new();

struct IngredientPatterns {
    /// A parenthesised group with any leading whitespace; group 1 is its content.
    parenthetical: Regex,
    /// First number in a group, e.g. `4,6` in `4,6 %`.
    quantity: Regex,
}

impl IngredientPatterns {
    fn get() -> &'static Self {
        INGREDIENT_PATTERNS.get_or_init(|| Self {
            parenthetical: Regex::new(r"\s*\(([^)]+)\)")
                .expect("parenthetical regex must compile"),
            quantity: Regex::new(r"(\d+[,.]?\d*)\s*%?").expect("quantity regex must compile"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_ean, parse_amount, parse_ingredient_statement};

    fn pairs(statement: &str) -> Vec<(String, Option<f64>)> {
        parse_ingredient_statement(statement)
            .into_iter()
            .map(|ingredient| (ingredient.name, ingredient.amount))
            .collect()
    }

    #[test]
    fn statement_with_percentages_and_plain_entries() {
        assert_eq!(
            pairs("Vatten, socker (20%), salt"),
            vec![
                ("Vatten".to_string(), None),
                ("socker".to_string(), Some(20.0)),
                ("salt".to_string(), None),
            ]
        );
    }

    #[test]
    fn decimal_comma_and_label_prefix() {
        assert_eq!(
            pairs("Ingredienser: kokosflingor (4,6%), mjölk"),
            vec![("kokosflingor".to_string(), Some(4.6)), ("mjölk".to_string(), None)]
        );
    }

    #[test]
    fn commas_inside_parentheses_do_not_split() {
        assert_eq!(
            pairs("choklad (socker, kakaosmör), taurin (0,4 %)"),
            vec![
                ("choklad (socker, kakaosmör)".to_string(), None),
                ("taurin".to_string(), Some(0.4)),
            ]
        );
    }

    #[test]
    fn every_parenthetical_is_dropped_once_an_amount_is_found() {
        assert_eq!(
            pairs("apelsinjuice (12 %) (från koncentrat), vatten (ca 3.5%), arom (naturlig)"),
            vec![
                ("apelsinjuice".to_string(), Some(12.0)),
                ("vatten".to_string(), Some(3.5)),
                ("arom (naturlig)".to_string(), None),
            ]
        );
    }

    #[test]
    fn trailing_separator_after_digits_is_ignored() {
        assert_eq!(pairs("salt (2,)"), vec![("salt".to_string(), Some(2.0))]);
        assert_eq!(pairs("unclosed (5%"), vec![("unclosed (5%".to_string(), None)]);
    }

    #[test]
    fn empty_statement_yields_nothing() {
        assert!(parse_ingredient_statement("").is_empty());
        assert!(parse_ingredient_statement("Ingredients: , ,").is_empty());
    }

    #[test]
    fn amounts_parse_leniently() {
        assert_eq!(parse_amount("13%"), Some(13.0));
        assert_eq!(parse_amount(" 0,4 % "), Some(0.4));
        assert_eq!(parse_amount("n/a"), None);
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("-2"), None);
    }

    #[test]
    fn ean_normalisation_pads_numeric_codes() {
        assert_eq!(normalize_ean("12345", 14), "00000000012345");
        assert_eq!(normalize_ean("07310350118342", 14), "07310350118342");
        assert_eq!(normalize_ean("7310350118342", 14), "07310350118342");
        assert_eq!(normalize_ean("123456789012", 13), "0123456789012");
        assert_eq!(normalize_ean("ABC-1", 14), "ABC-1");
    }
}
