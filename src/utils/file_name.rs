use crate::types::{Languages, Metadata};

const MAX_NAME_CHARS: usize = 40;
const FALLBACK_NAME: &str = "survey";

/// File name (without extension) for a downloaded questionnaire:
/// `<name>[-<language>][-v<version>]`.
///
/// The name falls back to a fixed placeholder and is cut to 40 characters
/// with a trailing `...`. The language suffix only appears for
/// single-language documents.
pub fn export_file_name(metadata: &Metadata, languages: &Languages) -> String {
    let name = metadata
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(FALLBACK_NAME);

    let mut file_name = if name.chars().count() > MAX_NAME_CHARS {
        let truncated: String = name.chars().take(MAX_NAME_CHARS).collect();
        format!("{truncated}...")
    } else {
        name.to_string()
    };

    if languages.is_empty() {
        if let Some(language) = metadata.language.as_deref().filter(|l| !l.is_empty()) {
            file_name.push('-');
            file_name.push_str(language);
        }
    }
    if let Some(version) = metadata.version.as_deref().filter(|v| !v.is_empty()) {
        file_name.push_str("-v");
        file_name.push_str(version);
    }
    file_name
}
