//! `[environment]` validation.

use regex::Regex;
use std::sync::LazyLock;

use super::helpers::validate_no_nul;
use crate::schema::BridgeConfig;

static LANGUAGE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{1,8})*$").unwrap());

pub(super) fn validate_environment(errors: &mut Vec<String>, config: &BridgeConfig) {
    let environment = &config.environment;

    for (field, value) in environment.text_fields() {
        validate_no_nul(errors, &format!("environment.{field}"), value);
    }

    let language = &environment.language;
    if !language.is_empty() && !LANGUAGE_TAG_RE.is_match(language) {
        errors.push(format!(
            "environment.language = {language:?} is not a language tag"
        ));
    }
}
