use std::fmt::Write;

use stickerdb_storage::StickerView;

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Sticker grid for `GET /`. `views` are rendered in the order given.
pub fn render_index(views: &[StickerView]) -> String {
    let mut cards = String::new();
    for view in views {
        let name = escape_html(&view.name);
        let href = escape_html(&urlencoding::encode(&view.file));
        let artist = escape_html(&view.artist);
        let program = escape_html(&view.program);
        let _ = write!(
            cards,
            r#"
      <li class="sticker" data-artist="{artist}" data-program="{program}">
        <a href="/stickers/{href}"><img src="/stickers/{href}" alt="{name}" loading="lazy"></a>
        <div class="name">{name}</div>
        <div class="meta">artist: {artist}</div>
        <div class="meta">program: {program}</div>
      </li>"#
        );
    }

    let empty = if views.is_empty() {
        r#"<p class="empty">No stickers yet.</p>"#
    } else {
        ""
    };

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Sticker DB</title>
  <style>
    body {{ font-family: system-ui, sans-serif; margin: 2rem; background: #f8f9fa; color: #222; }}
    h1 {{ margin-bottom: 0.25rem; }}
    .count {{ color: #666; margin-top: 0; }}
    .grid {{ list-style: none; padding: 0; display: grid; grid-template-columns: repeat(auto-fill, minmax(160px, 1fr)); gap: 1rem; }}
    .sticker {{ background: #fff; border: 1px solid #dee2e6; border-radius: 8px; padding: 0.75rem; text-align: center; }}
    .sticker img {{ max-width: 100%; height: 120px; object-fit: contain; }}
    .name {{ font-weight: bold; margin-top: 0.5rem; word-break: break-word; }}
    .meta {{ color: #666; font-size: 0.85em; }}
  </style>
</head>
<body>
  <h1>Sticker DB</h1>
  <p class="count">{count} stickers</p>
  {empty}
  <ul class="grid">{cards}
  </ul>
</body>
</html>
"#,
        count = views.len(),
    )
}
