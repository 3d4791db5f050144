//! Text transforms shared by every emitter. All of them work on bytes the way
//! the generated languages do, so results are reproducible for any input.

/// Splits `input` on any character contained in `delimiters`. Empty tokens are
/// kept, so `"a..b"` split on `"."` yields `["a", "", "b"]` and an empty input
/// yields a single empty token.
pub fn tokenize(input: &str, delimiters: &str) -> Vec<String> {
    input
        .split(|c: char| delimiters.contains(c))
        .map(str::to_string)
        .collect()
}

pub fn capitalize_first_letter(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

pub fn lowercase_first_letter(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// `get_payment_status` -> `GetPaymentStatus`
pub fn lower_underscore_to_upper_camel(s: &str) -> String {
    tokenize(s, "_")
        .iter()
        .map(|token| capitalize_first_letter(token))
        .collect()
}

/// `card_number` -> `cardNumber`
pub fn lower_camel(s: &str) -> String {
    lowercase_first_letter(&lower_underscore_to_upper_camel(s))
}

/// Removes `suffix` from the end of `s` when present.
pub fn strip_suffix<'a>(s: &'a str, suffix: &str) -> (&'a str, bool) {
    match s.strip_suffix(suffix) {
        Some(stripped) => (stripped, true),
        None => (s, false),
    }
}

pub fn strip_proto(filename: &str) -> &str {
    match strip_suffix(filename, ".protodevel") {
        (stripped, true) => stripped,
        _ => strip_suffix(filename, ".proto").0,
    }
}

/// `dir/payment_api.proto` -> `dir/PaymentApi`, or `PaymentApi` without the
/// package path.
pub fn file_name_in_upper_camel(filename: &str, include_package_path: bool) -> String {
    let tokens = tokenize(strip_proto(filename), "/");
    let (last, dirs) = match tokens.split_last() {
        Some(split) => split,
        None => return String::new(),
    };

    let mut result = String::new();
    if include_package_path {
        for dir in dirs {
            result.push_str(dir);
            result.push('/');
        }
    }
    result.push_str(&lower_underscore_to_upper_camel(last));

    result
}

/// Turns an arbitrary path into a C identifier. Alphanumeric bytes are kept,
/// every other byte becomes `_` followed by its two lowercase hex digits.
pub fn filename_identifier(filename: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    let mut result = String::with_capacity(filename.len());
    for byte in filename.bytes() {
        if byte.is_ascii_alphanumeric() {
            result.push(byte as char);
        } else {
            result.push('_');
            result.push(HEX[(byte >> 4) as usize] as char);
            result.push(HEX[(byte & 0xf) as usize] as char);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_keeps_empty_tokens() {
        assert_eq!(tokenize("a.b.c", "."), vec!["a", "b", "c"]);
        assert_eq!(tokenize("a..b", "."), vec!["a", "", "b"]);
        assert_eq!(tokenize("", ","), vec![""]);
        assert_eq!(tokenize("k=v,x", ",="), vec!["k", "v", "x"]);
        assert_eq!(tokenize(",", ","), vec!["", ""]);
    }

    #[test]
    fn camel_case() {
        assert_eq!(
            lower_underscore_to_upper_camel("get_payment_status"),
            "GetPaymentStatus"
        );
        assert_eq!(lower_underscore_to_upper_camel("_x"), "X");
        assert_eq!(lower_underscore_to_upper_camel(""), "");
        assert_eq!(lower_camel("card_number"), "cardNumber");
        assert_eq!(lower_camel("Amount"), "amount");
    }

    #[test]
    fn first_letter_flips_round_trip() {
        for word in ["Charge", "charge", "x", "ÉCU", "9lives"] {
            let lowered = lowercase_first_letter(word);
            let raised = capitalize_first_letter(&lowered);
            assert_eq!(
                lowercase_first_letter(&raised),
                lowered,
                "round trip of {word}"
            );
        }
        assert_eq!(capitalize_first_letter(""), "");
        assert_eq!(capitalize_first_letter("charge"), "Charge");
        assert_eq!(lowercase_first_letter("ChargeProgress"), "chargeProgress");
    }

    #[test]
    fn camel_is_stable_under_retokenizing() {
        let camel = lower_underscore_to_upper_camel("get_payment_status");
        assert_eq!(lower_underscore_to_upper_camel(&camel), camel);
    }

    #[test]
    fn strips_proto_suffixes() {
        assert_eq!(strip_proto("a/b.proto"), "a/b");
        assert_eq!(strip_proto("a/b.protodevel"), "a/b");
        assert_eq!(strip_proto("a/b.txt"), "a/b.txt");
        assert_eq!(strip_suffix("abc", "bc"), ("a", true));
        assert_eq!(strip_suffix("abc", "abcd"), ("abc", false));
    }

    #[test]
    fn upper_camel_file_names() {
        assert_eq!(
            file_name_in_upper_camel("dotdashpay/api/payment_api.proto", true),
            "dotdashpay/api/PaymentApi"
        );
        assert_eq!(
            file_name_in_upper_camel("dotdashpay/api/payment_api.proto", false),
            "PaymentApi"
        );
        assert_eq!(file_name_in_upper_camel("payment.proto", true), "Payment");
    }

    #[test]
    fn filename_identifiers_are_c_identifiers() {
        assert_eq!(filename_identifier("a/b.proto"), "a_2fb_2eproto");
        assert_eq!(filename_identifier("é"), "_c3_a9");

        let inputs = ["a/b.proto", "a_b.proto", "a.b.proto", "a-b.proto", "ab.proto"];
        let identifiers: Vec<_> = inputs.iter().map(|s| filename_identifier(s)).collect();

        for identifier in &identifiers {
            assert!(identifier
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_'));
        }

        let unique: std::collections::BTreeSet<_> = identifiers.iter().collect();
        assert_eq!(unique.len(), inputs.len());
    }
}
