//! Locale-derived DOS country, keyboard, and codepage settings.
//!
//! The emulated machine renders and sorts text according to its configured
//! country/codepage, so the defaults follow the host locale with a fixed
//! US-English fallback when it is unknown.

/// DOS-side locale settings for the `[dosbox]` descriptor section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosLocale {
    pub country: &'static str,
    pub keyboard: &'static str,
    pub codepage: &'static str,
}

const FALLBACK: DosLocale = DosLocale {
    country: "1",
    keyboard: "us",
    codepage: "437",
};

/// (locale tag, country code, keyboard layout, codepage)
const LOCALE_TABLE: &[(&str, DosLocale)] = &[
    ("ru_RU", DosLocale { country: "7", keyboard: "ru", codepage: "866" }),
    ("en_US", DosLocale { country: "1", keyboard: "us", codepage: "437" }),
    ("en_GB", DosLocale { country: "44", keyboard: "uk", codepage: "850" }),
    ("de_DE", DosLocale { country: "49", keyboard: "de", codepage: "850" }),
    ("fr_FR", DosLocale { country: "33", keyboard: "fr", codepage: "850" }),
    ("es_ES", DosLocale { country: "34", keyboard: "es", codepage: "850" }),
    ("it_IT", DosLocale { country: "39", keyboard: "it", codepage: "850" }),
    ("pt_BR", DosLocale { country: "55", keyboard: "br", codepage: "850" }),
    ("ja_JP", DosLocale { country: "81", keyboard: "jp", codepage: "932" }),
    ("zh_CN", DosLocale { country: "86", keyboard: "cn", codepage: "936" }),
    ("ko_KR", DosLocale { country: "82", keyboard: "kr", codepage: "949" }),
];

/// Resolve DOS locale settings for a host locale tag such as `de_DE.UTF-8`.
///
/// Exact tag match wins, then the first table entry sharing the language
/// prefix, then the US-English fallback.
pub fn dos_locale_for(tag: Option<&str>) -> DosLocale {
    let Some(tag) = tag else { return FALLBACK };

    // "de_DE.UTF-8@euro" -> "de_DE"
    let tag = tag.split(['.', '@']).next().unwrap_or(tag);
    if tag.is_empty() {
        return FALLBACK;
    }

    if let Some((_, locale)) = LOCALE_TABLE.iter().find(|(key, _)| *key == tag) {
        return *locale;
    }

    let lang = tag.split('_').next().unwrap_or(tag);
    if let Some((_, locale)) = LOCALE_TABLE
        .iter()
        .find(|(key, _)| key.split('_').next() == Some(lang))
    {
        return *locale;
    }

    FALLBACK
}

/// Snapshot the host locale tag from the usual environment variables.
pub fn system_locale_tag() -> Option<String> {
    ["LC_ALL", "LC_CTYPE", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.is_empty() && value != "C" && value != "POSIX")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let locale = dos_locale_for(Some("ru_RU"));
        assert_eq!(locale.country, "7");
        assert_eq!(locale.keyboard, "ru");
        assert_eq!(locale.codepage, "866");
    }

    #[test]
    fn test_encoding_suffix_stripped() {
        let locale = dos_locale_for(Some("de_DE.UTF-8"));
        assert_eq!(locale.keyboard, "de");
        assert_eq!(locale.codepage, "850");
    }

    #[test]
    fn test_language_prefix_match() {
        // No en_AU entry; first "en" row wins.
        let locale = dos_locale_for(Some("en_AU"));
        assert_eq!(locale.country, "1");
        assert_eq!(locale.keyboard, "us");
    }

    #[test]
    fn test_unknown_falls_back_to_us() {
        assert_eq!(dos_locale_for(Some("xx_XX")), FALLBACK);
        assert_eq!(dos_locale_for(None), FALLBACK);
        assert_eq!(dos_locale_for(Some("")), FALLBACK);
    }
}
