use std::sync::LazyLock;

use regex::Regex;

static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold pattern"));
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*(.*?)\*").expect("italic pattern"));
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`(.*?)`").expect("code pattern"));

/// Render assistant text as HTML markup.
///
/// Passes run in a fixed order, each over the previous output: bold, italic,
/// inline code, then line breaks. Spans are the shortest match and never
/// cross a newline. Input is trusted to be plain text and is not escaped.
pub fn format_markdown(text: &str) -> String {
    let formatted = BOLD.replace_all(text, "<strong>${1}</strong>");
    let formatted = ITALIC.replace_all(&formatted, "<em>${1}</em>");
    let formatted = INLINE_CODE.replace_all(&formatted, r#"<code class="inline-code">${1}</code>"#);
    formatted.replace('\n', "<br>")
}
