// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed HTML body for notification and notice emails.

use chrono::Datelike;
use serde_json::Value;

/// Whether a details value has anything worth rendering.
fn has_details(details: &Value) -> bool {
    match details {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::String(s) => !s.is_empty(),
        Value::Null | Value::Bool(_) | Value::Number(_) => false,
    }
}

pub(crate) fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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

/// Render the email body: greeting, message, and a pretty-printed details
/// block when `details` is non-empty.
pub fn render(username: &str, message: &str, details: Option<&Value>) -> String {
    let details_block = details
        .filter(|d| has_details(d))
        .map(|d| {
            let pretty = serde_json::to_string_pretty(d).unwrap_or_else(|_| d.to_string());
            format!(
                r#"
                <div style="padding:16px 24px 16px 24px">
                  <div style="background-color:#fbfafa;border:1px dashed black;border-radius:5px;font-weight:normal;padding:16px 24px 16px 24px;white-space:pre-wrap;font-family:monospace">{}</div>
                </div>"#,
                escape_html(&pretty)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!doctype html>
<html>
  <body>
    <div style="background-color:#fbfafa;color:#000000;font-family:'Helvetica Neue', Arial, sans-serif;font-size:16px;line-height:1.5;margin:0;padding:32px 0;width:100%">
      <table align="center" width="100%" style="margin:0 auto;max-width:600px;background-color:#FFFFFF;border-radius:5px" role="presentation" cellspacing="0" cellpadding="0" border="0">
        <tbody>
          <tr style="width:100%">
            <td>
              <div style="background-color:#fbfafa;padding:16px 24px 16px 24px">
                <h1 style="font-weight:bold;text-align:center;margin:0;font-size:32px;padding:16px 24px 16px 24px">🔔 Notify</h1>
              </div>
              <div style="border:1px dashed black;border-radius:5px;padding:16px 24px 16px 24px">
                <div style="font-weight:normal;padding:16px 24px 16px 24px">Hello {username},</div>
                <div style="font-weight:normal;padding:16px 24px 16px 24px">{message}</div>{details_block}
              </div>
              <div style="background-color:#fbfafa;padding:16px 24px 16px 24px">
                <p style="text-align:center">Copyright © {year}. Notify</p>
              </div>
            </td>
          </tr>
        </tbody>
      </table>
    </div>
  </body>
</html>"#,
        username = escape_html(username),
        message = escape_html(message),
        year = chrono::Utc::now().year(),
    )
}
