/// Strips tags from an HTML page, dropping `<script>` and `<style>` bodies.
pub fn strip_html_tags(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    let mut in_script = false;
    let mut in_style = false;

    let chars: Vec<char> = html.chars().collect();
    let lower: Vec<char> = chars.iter().map(|c| c.to_ascii_lowercase()).collect();

    let starts_with = |i: usize, pattern: &str| -> bool {
        let len = pattern.chars().count();
        i + len <= lower.len() && lower[i..i + len].iter().copied().eq(pattern.chars())
    };

    let mut i = 0;
    while i < chars.len() {
        if !in_script && !in_style {
            if starts_with(i, "<script") {
                in_script = true;
            } else if starts_with(i, "<style") {
                in_style = true;
            }
        }

        if in_script {
            if starts_with(i, "</script>") {
                in_script = false;
                i += "</script>".len();
            } else {
                i += 1;
            }
            continue;
        }
        if in_style {
            if starts_with(i, "</style>") {
                in_style = false;
                i += "</style>".len();
            } else {
                i += 1;
            }
            continue;
        }

        let c = chars[i];
        if c == '<' {
            in_tag = true;
        } else if c == '>' {
            in_tag = false;
            result.push(' ');
        } else if !in_tag {
            result.push(c);
        }

        i += 1;
    }

    decode_common_entities(&result)
}

fn decode_common_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}
