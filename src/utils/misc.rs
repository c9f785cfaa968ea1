use lazy_static::lazy_static;
use rand::{thread_rng, Rng};
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref PLACEHOLDER_RE: Regex = Regex::new(r"\{\{(\w+)\}\}").unwrap();
}

/// Generate OTP of a given length
pub fn generate_otp(len: u32) -> String {
    let mut rng = thread_rng();
    (0..len)
        .map(|_| {
            let n = rng.gen_range(0..10);
            char::from_digit(n, 10).unwrap_or('0')
        })
        .collect()
}

/// replace placeholder variables from the template text
/// placeholders are of patters {{variable}}, unknown ones are kept as is
pub fn replace_placeholders(template: &str, values: &HashMap<String, String>) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |cap: &regex::Captures| match values.get(&cap[1]) {
            Some(val) => val.to_owned(),
            None => cap[0].to_owned(),
        })
        .into_owned()
}

/// Normalize a phone number into its last 10 digits.
/// Non digit chars, a trunk `0` and the `91` country prefix are stripped.
pub fn normalize_phone(phone: &str) -> Option<String> {
    let mut digits: String = phone.chars().filter(|ch| ch.is_ascii_digit()).collect();
    if digits.len() == 11 && digits.starts_with('0') {
        digits.remove(0);
    }
    if digits.len() == 12 && digits.starts_with("91") {
        digits.drain(..2);
    }
    if digits.len() < 10 {
        return None;
    }
    Some(digits[digits.len() - 10..].to_owned())
}

/// Format an amount as rupees with indian digit grouping, eg: ₹1,23,456.50
pub fn format_currency(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let paise = (amount.abs() * 100.0).round() as u64;
    let whole = (paise / 100).to_string();
    let fraction = paise % 100;
    let grouped = if whole.len() <= 3 {
        whole
    } else {
        let (head, last3) = whole.split_at(whole.len() - 3);
        let mut groups: Vec<&str> = Vec::new();
        let mut end = head.len();
        while end > 0 {
            let start = end.saturating_sub(2);
            groups.push(&head[start..end]);
            end = start;
        }
        groups.reverse();
        format!("{},{}", groups.join(","), last3)
    };
    format!("{sign}₹{grouped}.{fraction:02}")
}
