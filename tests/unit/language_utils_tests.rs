/*!
 * Tests for ISO language code utilities
 */

use yadtwai::language_utils::{
    LanguageCodeType, get_language_name, language_codes_match, normalize_to_part2t, prompt_language_name,
    validate_language_code,
};

#[test]
fn test_validateLanguageCode_withEachCodeKind_shouldClassify() {
    assert_eq!(validate_language_code("en").unwrap(), LanguageCodeType::Part1);
    assert_eq!(validate_language_code("ZH").unwrap(), LanguageCodeType::Part1);
    assert_eq!(validate_language_code("zho").unwrap(), LanguageCodeType::Part2T);
    assert_eq!(validate_language_code("chi").unwrap(), LanguageCodeType::Part2B);
}

#[test]
fn test_validateLanguageCode_withInvalidCodes_shouldFail() {
    assert!(validate_language_code("").is_err());
    assert!(validate_language_code("x").is_err());
    assert!(validate_language_code("xx").is_err());
    assert!(validate_language_code("english").is_err());
}

#[test]
fn test_normalizeToPart2t_shouldConvertAllForms() {
    assert_eq!(normalize_to_part2t("en").unwrap(), "eng");
    assert_eq!(normalize_to_part2t("fre").unwrap(), "fra");
    assert_eq!(normalize_to_part2t(" deu ").unwrap(), "deu");
}

#[test]
fn test_languageCodesMatch_acrossForms_shouldMatch() {
    assert!(language_codes_match("zh", "chi"));
    assert!(language_codes_match("de", "ger"));
    assert!(!language_codes_match("en", "zh"));
    assert!(!language_codes_match("en", "nope"));
}

#[test]
fn test_promptLanguageName_shouldFallBackToCode() {
    assert_eq!(get_language_name("fr").unwrap(), "French");
    assert_eq!(prompt_language_name("zh"), "Chinese");
    assert_eq!(prompt_language_name(" klingon "), "klingon");
}
