use std::collections::HashMap;

use fluent_templates::{
    fluent_bundle::{FluentArgs, FluentValue},
    static_loader, Loader,
};
use once_cell::sync::Lazy;
use unic_langid::LanguageIdentifier;

static_loader! {
    static LOCALES = {
        locales: "./locales",
        fallback_language: "fr",
    };
}

/// Supported languages (code, human-readable name).
pub static SUPPORTED_LANGS: &[(&str, &str)] = &[
    ("fr", "Français"),
    ("en", "English"),
    ("es", "Español"),
    ("it", "Italiano"),
    ("de", "Deutsch"),
];

/// Default language identifier used as a fallback.
static DEFAULT_LANG: Lazy<LanguageIdentifier> = Lazy::new(|| "fr".parse().unwrap());

/// Normalizes a language code into a LanguageIdentifier (falls back to default).
pub fn lang_from_code(code: &str) -> LanguageIdentifier {
    let normalized = code.split('-').next().unwrap_or(code).to_lowercase();
    normalized.parse().unwrap_or_else(|_| DEFAULT_LANG.clone())
}

/// Returns a localized string for the given key.
///
/// Fallback chain: requested language → French → the key itself verbatim.
/// Never errors, never renders empty; shop pages always get something to
/// display.
pub fn t(lang: &LanguageIdentifier, key: &str) -> String {
    LOCALES
        .lookup(lang, key)
        .unwrap_or_else(|| LOCALES.lookup(&DEFAULT_LANG, key).unwrap_or_else(|| key.to_string()))
}

/// Returns a localized string with arguments for interpolation.
pub fn t_args(lang: &LanguageIdentifier, key: &str, args: &FluentArgs) -> String {
    let args_map: HashMap<String, FluentValue> =
        args.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();

    LOCALES.lookup_with_args(lang, key, &args_map).unwrap_or_else(|| {
        LOCALES
            .lookup_with_args(&DEFAULT_LANG, key, &args_map)
            .unwrap_or_else(|| key.to_string())
    })
}

/// Finds a human-friendly name for a language code.
pub fn language_name(code: &str) -> &str {
    SUPPORTED_LANGS
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
        .unwrap_or("Unknown")
}

/// Checks if a language code is supported by the shop.
/// Returns the normalized language code if supported, None otherwise.
pub fn is_language_supported(code: &str) -> Option<&'static str> {
    // Normalize the code (e.g., "fr-FR" -> "fr", "en-US" -> "en")
    let normalized = code.split('-').next().unwrap_or(code).to_lowercase();

    SUPPORTED_LANGS
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(&normalized))
        .map(|(c, _)| *c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_known_translation() {
        let fr = lang_from_code("fr");
        let en = lang_from_code("en");

        assert_eq!(t(&fr, "shop_vote"), "Voter");
        assert_eq!(t(&en, "shop_vote"), "Vote");
    }

    #[test]
    fn falls_back_to_french_for_missing_key() {
        let de = lang_from_code("de");
        let fr = lang_from_code("fr");

        // This key is intentionally absent from the German locale.
        assert_eq!(t(&de, "admin_saved_local"), t(&fr, "admin_saved_local"));
    }

    #[test]
    fn returns_raw_key_when_unknown_everywhere() {
        let de = lang_from_code("de");
        assert_eq!(t(&de, "nonexistent_key"), "nonexistent_key");
    }

    #[test]
    fn variant_codes_normalize() {
        assert_eq!(is_language_supported("fr-FR"), Some("fr"));
        assert_eq!(is_language_supported("EN"), Some("en"));
        assert_eq!(is_language_supported("it-IT"), Some("it"));
        assert_eq!(is_language_supported("pt"), None);
    }

    #[test]
    fn language_names() {
        assert_eq!(language_name("fr"), "Français");
        assert_eq!(language_name("xx"), "Unknown");
    }
}
