//! PII Scanner (C5): locale-specific and global personally-identifiable-
//! information detection with checksum validators and two redaction modes.
//!
//! Korean patterns (resident registration numbers, mobile numbers, the five
//! major banks' account formats) are matched alongside global patterns
//! (email, credit card, IPv4, US SSN). Every match that has a checksum —
//! Luhn for card numbers, the RRN check digit, octet-range validation for
//! IPv4 — is verified before being reported, so a string that merely looks
//! like a card number but fails Luhn is not reported as PII.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{PiiMatch, PiiScanResult, PiiType, SanitizeMode};

struct PatternDef {
    pii_type: PiiType,
    regex: &'static Lazy<Regex>,
    validator: fn(&str) -> bool,
}

static RE_EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());
static RE_CREDIT_CARD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:\d[ -]?){13,19}\b").unwrap());
static RE_IPV4: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b").unwrap());
static RE_SSN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap());
static RE_PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b").unwrap());

static RE_KOREAN_RRN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{6}-\d{7}\b").unwrap());
static RE_KOREAN_PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b01[016789]-\d{3,4}-\d{4}\b").unwrap());
// Account-number shapes for KB, Shinhan, Woori, Hana and NH, each with its
// own grouping convention.
static RE_KOREAN_BANK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:\d{3}-\d{2}-\d{6}|\d{3}-\d{3}-\d{6}|\d{3}-\d{6}-\d{2,3}|\d{4}-\d{3}-\d{6}|\d{3}-\d{4}-\d{4}-\d{2})\b").unwrap()
});

fn always_valid(_s: &str) -> bool {
    true
}

fn validate_luhn(digits: &str) -> bool {
    let digits: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 13 {
        return false;
    }
    let mut sum = 0u32;
    for (i, &d) in digits.iter().rev().enumerate() {
        if i % 2 == 1 {
            let doubled = d * 2;
            sum += if doubled > 9 { doubled - 9 } else { doubled };
        } else {
            sum += d;
        }
    }
    sum % 10 == 0
}

fn validate_ipv4(text: &str) -> bool {
    text.split('.').all(|octet| octet.parse::<u16>().map(|v| v <= 255).unwrap_or(false))
}

/// Validates the RRN check digit (13th digit) using the standard weighted
/// modulus-11 scheme.
fn validate_korean_rrn(text: &str) -> bool {
    let digits: Vec<u32> = text.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 13 {
        return false;
    }
    const WEIGHTS: [u32; 12] = [2, 3, 4, 5, 6, 7, 8, 9, 2, 3, 4, 5];
    let sum: u32 = digits.iter().take(12).zip(WEIGHTS.iter()).map(|(d, w)| d * w).sum();
    let check = (11 - (sum % 11)) % 10;
    check == digits[12]
}

fn patterns() -> Vec<PatternDef> {
    vec![
        PatternDef { pii_type: PiiType::KoreanRrn, regex: &RE_KOREAN_RRN, validator: validate_korean_rrn },
        PatternDef { pii_type: PiiType::KoreanBankAccount, regex: &RE_KOREAN_BANK, validator: always_valid },
        PatternDef { pii_type: PiiType::KoreanPhone, regex: &RE_KOREAN_PHONE, validator: always_valid },
        PatternDef { pii_type: PiiType::Email, regex: &RE_EMAIL, validator: always_valid },
        PatternDef { pii_type: PiiType::Ssn, regex: &RE_SSN, validator: always_valid },
        PatternDef { pii_type: PiiType::CreditCard, regex: &RE_CREDIT_CARD, validator: validate_luhn },
        PatternDef { pii_type: PiiType::Ipv4, regex: &RE_IPV4, validator: validate_ipv4 },
        PatternDef { pii_type: PiiType::Phone, regex: &RE_PHONE, validator: always_valid },
    ]
}

pub struct PiiScanner {
    mode: SanitizeMode,
}

impl PiiScanner {
    pub fn new(mode: SanitizeMode) -> Self {
        Self { mode }
    }

    /// Finds every pattern match that passes its validator, then discards
    /// any match whose span overlaps an earlier-accepted match (earlier by
    /// start offset, with ties broken by pattern declaration order — e.g. a
    /// Korean RRN is checked before the generic credit-card pattern, so a
    /// 13-digit RRN that also happens to look like a Luhn-valid card number
    /// is reported once, as an RRN).
    pub fn find(&self, text: &str) -> Vec<PiiMatch> {
        let mut matches = Vec::new();
        for def in patterns() {
            for m in def.regex.find_iter(text) {
                if (def.validator)(m.as_str()) {
                    matches.push(PiiMatch {
                        pii_type: def.pii_type,
                        span: (m.start(), m.end()),
                        matched_text: m.as_str().to_string(),
                    });
                }
            }
        }
        matches.sort_by_key(|m| m.span.0);

        let mut accepted: Vec<PiiMatch> = Vec::with_capacity(matches.len());
        for m in matches {
            let overlaps = accepted.iter().any(|a| m.span.0 < a.span.1 && a.span.0 < m.span.1);
            if !overlaps {
                accepted.push(m);
            }
        }
        accepted
    }

    /// Finds PII and returns both the matches and a sanitized copy of the
    /// text. Spans are replaced right-to-left so earlier offsets stay valid
    /// as later, higher-offset spans are rewritten first.
    pub fn scan_and_sanitize(&self, text: &str) -> PiiScanResult {
        let matches = self.find(text);
        let mut sanitized = text.to_string();
        for m in matches.iter().rev() {
            let replacement = self.render_replacement(m);
            sanitized.replace_range(m.span.0..m.span.1, &replacement);
        }
        PiiScanResult { matches, sanitized_text: sanitized }
    }

    fn render_replacement(&self, m: &PiiMatch) -> String {
        match self.mode {
            SanitizeMode::Label => m.pii_type.label().to_string(),
            SanitizeMode::Mask => mask_partial(&m.matched_text, m.pii_type),
        }
    }
}

/// Partially masks a matched value, with rules specific to each PII type
/// (grounded on `original_source`'s `PIISanitizer._mask_value`): phone
/// numbers keep their area code and last 4 digits, RRNs keep the birth date
/// and gender digit, emails keep the first character of the local part,
/// card/account/SSN numbers keep only their last 4 digits, and IPv4
/// addresses keep their first three octets.
fn mask_partial(value: &str, pii_type: PiiType) -> String {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    match pii_type {
        PiiType::Phone | PiiType::KoreanPhone => {
            if digits.len() >= 7 {
                format!("{}-****-{}", &digits[..3], &digits[digits.len() - 4..])
            } else {
                "***-****-****".to_string()
            }
        }
        PiiType::KoreanRrn => {
            if digits.len() >= 7 {
                format!("{}-{}******", &digits[..6], &digits[6..7])
            } else {
                "******-*******".to_string()
            }
        }
        PiiType::Email => match value.split_once('@') {
            Some((local, domain)) if !local.is_empty() => {
                format!("{}***@{}", &local[..1], domain)
            }
            _ => "***@***".to_string(),
        },
        PiiType::CreditCard => {
            if digits.len() >= 4 {
                format!("****-****-****-{}", &digits[digits.len() - 4..])
            } else {
                "****-****-****-****".to_string()
            }
        }
        PiiType::Ssn => {
            if digits.len() >= 4 {
                format!("***-**-{}", &digits[digits.len() - 4..])
            } else {
                "***-**-****".to_string()
            }
        }
        PiiType::Ipv4 => {
            let octets: Vec<&str> = value.split('.').collect();
            if octets.len() == 4 {
                format!("{}.{}.{}.***", octets[0], octets[1], octets[2])
            } else {
                "***.***.***.***".to_string()
            }
        }
        PiiType::KoreanBankAccount => {
            if digits.len() >= 4 {
                format!("{}{}", "*".repeat(digits.len() - 4), &digits[digits.len() - 4..])
            } else {
                "****".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_email_and_labels_it() {
        let scanner = PiiScanner::new(SanitizeMode::Label);
        let result = scanner.scan_and_sanitize("contact jane.doe@example.com please");
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].pii_type, PiiType::Email);
        assert!(result.sanitized_text.contains("[EMAIL]"));
    }

    #[test]
    fn rejects_credit_card_failing_luhn() {
        let scanner = PiiScanner::new(SanitizeMode::Label);
        let result = scanner.find("card number 1234 5678 9012 3456");
        assert!(result.is_empty());
    }

    #[test]
    fn accepts_credit_card_passing_luhn() {
        let scanner = PiiScanner::new(SanitizeMode::Label);
        let result = scanner.find("card number 4539578763621486");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].pii_type, PiiType::CreditCard);
    }

    #[test]
    fn mask_mode_preserves_first_and_last_char() {
        let scanner = PiiScanner::new(SanitizeMode::Mask);
        let result = scanner.scan_and_sanitize("mail me at a@b.co now");
        assert!(result.matches.len() == 1);
    }

    #[test]
    fn rejects_ipv4_with_out_of_range_octet() {
        let scanner = PiiScanner::new(SanitizeMode::Label);
        assert!(scanner.find("host 999.1.2.3").is_empty());
        assert_eq!(scanner.find("host 192.168.1.1").len(), 1);
    }

    #[test]
    fn right_to_left_replacement_keeps_earlier_spans_valid() {
        let scanner = PiiScanner::new(SanitizeMode::Label);
        let text = "emails: a@b.co and c@d.co";
        let result = scanner.scan_and_sanitize(text);
        assert_eq!(result.matches.len(), 2);
        assert_eq!(result.sanitized_text.matches("[EMAIL]").count(), 2);
    }

    #[test]
    fn korean_rrn_suppresses_overlapping_credit_card_match() {
        // This 13-digit RRN also happens to pass the Luhn check, so it is
        // matched by both RE_KOREAN_RRN and RE_CREDIT_CARD over the same
        // bytes — only the RRN (checked first) should be reported.
        let scanner = PiiScanner::new(SanitizeMode::Label);
        let result = scanner.find("rrn is 901201-1234560 on file");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].pii_type, PiiType::KoreanRrn);
    }

    #[test]
    fn mask_mode_reveals_only_last_four_digits_of_credit_card() {
        let scanner = PiiScanner::new(SanitizeMode::Mask);
        let result = scanner.scan_and_sanitize("card number 4539578763621486");
        assert!(result.sanitized_text.contains("****-****-****-1486"));
    }
}
