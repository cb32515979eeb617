//! The report form page.

use ticket_report_core::LocationType;

/// Values to show in the form fields.
#[derive(Debug, Default, Clone)]
pub struct FormValues<'a> {
    pub work_item_id: &'a str,
    pub client_name: &'a str,
    pub location: Option<LocationType>,
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn checked(values: &FormValues<'_>, location: LocationType) -> &'static str {
    if values.location == Some(location) { " checked" } else { "" }
}

/// Renders the form, with an optional message above it.
pub fn render(message: Option<&str>, values: &FormValues<'_>) -> String {
    let message = message
        .map(|message| format!(r#"<p class="message">{}</p>"#, escape_html(message)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Ticket Status Report</title>
<style>
body {{ font-family: sans-serif; max-width: 32rem; margin: 2rem auto; }}
label {{ display: block; margin-top: 1rem; }}
.message {{ padding: 0.5rem; background: #fdecea; border: 1px solid #f5c2c0; }}
</style>
</head>
<body>
<h1>Ticket Status Report</h1>
{message}
<form method="post" action="/">
<label>Work item ID <input type="text" name="work_item_id" value="{work_item_id}" required></label>
<label>Client name <input type="text" name="client_name" value="{client_name}" required></label>
<fieldset>
<legend>Location</legend>
<label><input type="radio" name="location" value="onsite"{onsite}> Onsite</label>
<label><input type="radio" name="location" value="offsite"{offsite}> Offsite/Remote</label>
</fieldset>
<button type="submit">Generate report</button>
</form>
</body>
</html>
"#,
        message = message,
        work_item_id = escape_html(values.work_item_id),
        client_name = escape_html(values.client_name),
        onsite = checked(values, LocationType::Onsite),
        offsite = checked(values, LocationType::Offsite),
    )
}
