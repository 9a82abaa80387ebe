use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt::Write;

const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'.').remove(b'-').remove(b'_');

const HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Photo Gallery</title>
    <style>
        body { font-family: Arial, sans-serif; max-width: 1200px; margin: 0 auto; padding: 20px; background-color: #f5f5f5; }
        h1 { color: #333; text-align: center; }
        .gallery { display: flex; flex-wrap: wrap; justify-content: center; }
        .item { display: inline-block; margin: 20px; text-align: center; }
        .item img { border: 2px solid #ddd; border-radius: 8px; }
    </style>
</head>
<body>
    <h1>My Photo Gallery</h1>
    <p style="text-align: center; color: #666;">Browse through our collection of beautiful images</p>
    <div class="gallery">
"#;

const TAIL: &str = "    </div>
</body>
</html>
";

pub fn render_index(images: &[String]) -> String {
    let mut html = String::from(HEAD);
    for name in images {
        let href = utf8_percent_encode(name, QUERY_VALUE);
        let caption = escape_html(name);
        let _ = write!(
            html,
            "        <div class=\"item\">\n            <img src=\"/image?file={href}\" width=\"200\" alt=\"{caption}\"/>\n            <p>{caption}</p>\n        </div>\n"
        );
    }
    html.push_str(TAIL);
    html
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
