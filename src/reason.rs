const OPEN_PROXY: &str =
    "[[m:Special:MyLanguage/NOP|Open proxy]]: See the [[m:WM:OP/H|help page]] if you are affected";
const WEBHOST: &str =
    "[[m:Special:MyLanguage/NOP|Open proxy/Webhost]]: See the [[m:WM:OP/H|help page]] if you are affected";

/// Expand shorthand reasons (`proxy`, `lta`, `spam`, `spambot`,
/// `webhost <note>`) into their canonical text. Anything else is returned as is.
pub fn expand(raw: &str) -> String {
    match raw {
        "proxy" => OPEN_PROXY.to_string(),
        "lta" => "Long term abuse".to_string(),
        "spambot" => "Cross-wiki spam: spambot".to_string(),
        "spam" => "Cross-wiki spam".to_string(),
        "webhost" => WEBHOST.to_string(),
        _ => match raw.strip_prefix("webhost ") {
            Some(note) if !note.trim().is_empty() => format!("{WEBHOST}: {}", note.trim()),
            Some(_) => WEBHOST.to_string(),
            None => raw.to_string(),
        },
    }
}
