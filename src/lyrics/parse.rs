use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static LRC_TIMESTAMP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\d{1,2}:\d{2}(?:[.:]\d{1,3})?\]").unwrap());

// ID tags such as [ar:Artist] or [length:03:12]
static LRC_ID_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[[a-zA-Z]+:[^\]]*\]$").unwrap());

static BR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").unwrap());

const LYRICS_CONTAINER_ATTR: &str = r#"data-lyrics-container="true""#;
const EXCLUDED_ATTR: &str = r#"data-exclude-from-selection="true""#;

/// Turn time-synced LRC text into plain lyrics: timestamps and ID tags are
/// dropped, as are lines left empty.
pub fn strip_lrc_timestamps(synced: &str) -> String {
    let mut out = Vec::new();
    for line in synced.lines() {
        let line = line.trim();
        if LRC_ID_TAG_RE.is_match(line) {
            continue;
        }
        let text = LRC_TIMESTAMP_RE.replace_all(line, "");
        let text = text.trim();
        if !text.is_empty() {
            out.push(text.to_string());
        }
    }
    out.join("\n")
}

/// Extract the lyrics from a Genius song page.
///
/// Genius splits the lyrics over several `data-lyrics-container` divs; their
/// text is joined in page order. Returns `None` when the page has no lyrics.
pub fn extract_genius_lyrics(html: &str) -> Option<String> {
    let mut parts = Vec::new();
    let mut cursor = 0;

    while let Some(rel) = html[cursor..].find(LYRICS_CONTAINER_ATTR) {
        let attr_at = cursor + rel;
        cursor = attr_at + LYRICS_CONTAINER_ATTR.len();
        let Some(open_at) = enclosing_div_open(html, attr_at) else {
            continue;
        };
        let Some(end) = matching_div_end(html, open_at) else {
            break;
        };

        let inner = div_inner(&html[open_at..end]);
        let text = html_to_text(&remove_excluded(inner));
        let text = text.trim();
        if !text.is_empty() {
            parts.push(text.to_string());
        }
        cursor = cursor.max(end);
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}

/// Start of the `<div` tag that carries the attribute at `attr_at`, or
/// `None` when the attribute sits on some other tag.
fn enclosing_div_open(html: &str, attr_at: usize) -> Option<usize> {
    let open_at = html[..attr_at].rfind("<div")?;
    if html[open_at..attr_at].contains('>') {
        None
    } else {
        Some(open_at)
    }
}

/// Byte offset just past the `</div>` closing the div opened at `open_at`.
fn matching_div_end(html: &str, open_at: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut pos = open_at;
    loop {
        let next_open = html[pos..].find("<div").map(|i| pos + i);
        let next_close = html[pos..].find("</div>").map(|i| pos + i)?;
        match next_open {
            Some(o) if o < next_close => {
                depth += 1;
                pos = o + "<div".len();
            }
            _ => {
                depth = depth.saturating_sub(1);
                pos = next_close + "</div>".len();
                if depth == 0 {
                    return Some(pos);
                }
            }
        }
    }
}

/// Content between the opening tag and the final `</div>` of an element.
fn div_inner(element: &str) -> &str {
    let start = element.find('>').map(|i| i + 1).unwrap_or(0);
    let end = element.len().saturating_sub("</div>".len()).max(start);
    &element[start..end]
}

/// Drop nested blocks Genius marks as not part of the lyrics (contributor
/// headers and the like).
fn remove_excluded(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    let mut copied = 0;
    let mut cursor = 0;
    while let Some(rel) = fragment[cursor..].find(EXCLUDED_ATTR) {
        let attr_at = cursor + rel;
        cursor = attr_at + EXCLUDED_ATTR.len();
        let Some(open_at) = enclosing_div_open(fragment, attr_at) else {
            continue;
        };
        let Some(end) = matching_div_end(fragment, open_at) else {
            break;
        };
        out.push_str(&fragment[copied..open_at]);
        copied = end;
        cursor = cursor.max(end);
    }
    out.push_str(&fragment[copied..]);
    out
}

fn html_to_text(fragment: &str) -> String {
    let with_breaks = BR_RE.replace_all(fragment, "\n");
    let without_tags = TAG_RE.replace_all(&with_breaks, "");
    decode_entities(&without_tags)
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    _ => None,
                }
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_timestamps_and_id_tags() {
        let lrc = "[ar:Ariana Grande]\n[ti:Into You]\n[00:12.34]I'm so into you\n[00:15.00]\n[00:16.50][01:02.00]But I'm a good girl";
        assert_eq!(
            strip_lrc_timestamps(lrc),
            "I'm so into you\nBut I'm a good girl"
        );
    }

    #[test]
    fn plain_text_passes_through_lrc_stripping() {
        assert_eq!(strip_lrc_timestamps("line one\n\nline two"), "line one\nline two");
    }

    #[test]
    fn extracts_text_from_lyrics_containers() {
        let html = r#"<html><body>
            <div class="header">Not lyrics</div>
            <div data-lyrics-container="true" class="Lyrics__Container">[Verse 1]<br/>I'm so into you<br><a href="/x"><span class="ref">But I'm a good girl</span></a></div>
            <div class="ad"><div>ad</div></div>
            <div data-lyrics-container="true">Tom &amp; Jerry&#39;s <i>song</i></div>
            </body></html>"#;

        let lyrics = extract_genius_lyrics(html).expect("lyrics present");

        assert_eq!(
            lyrics,
            "[Verse 1]\nI'm so into you\nBut I'm a good girl\nTom & Jerry's song"
        );
    }

    #[test]
    fn skips_excluded_blocks_inside_containers() {
        let html = r#"<div data-lyrics-container="true"><div data-exclude-from-selection="true"><div>12 Contributors</div></div>First line<br/>Second line</div>"#;

        assert_eq!(
            extract_genius_lyrics(html).as_deref(),
            Some("First line\nSecond line")
        );
    }

    #[test]
    fn container_attribute_on_other_tags_is_skipped() {
        let html = r#"<div>header</div><section data-lyrics-container="true">Line</section><div data-lyrics-container="true">Real line</div>"#;

        assert_eq!(extract_genius_lyrics(html).as_deref(), Some("Real line"));
        assert_eq!(
            extract_genius_lyrics(r#"<div>header</div><section data-lyrics-container="true">Line</section>"#),
            None
        );
    }

    #[test]
    fn excluded_attribute_on_other_tags_is_kept() {
        let html = r#"<div data-lyrics-container="true"><div>Intro</div><br/><span data-exclude-from-selection="true">Second</span></div>"#;

        assert_eq!(extract_genius_lyrics(html).as_deref(), Some("Intro\nSecond"));
    }

    #[test]
    fn page_without_containers_has_no_lyrics() {
        assert_eq!(extract_genius_lyrics("<div>Nothing here</div>"), None);
        assert_eq!(
            extract_genius_lyrics(r#"<div data-lyrics-container="true">  </div>"#),
            None
        );
    }

    #[test]
    fn decodes_numeric_and_named_entities() {
        assert_eq!(decode_entities("&#x27;a&#8217;b&lt;c&gt;&unknown;"), "'a\u{2019}b<c>&unknown;");
    }
}
