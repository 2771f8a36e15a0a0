//! Server-rendered HTML for a [`ViewState`].

use std::fmt::Write;

use medbills_core::models::DATE_FORMAT;
use medbills_core::report::format_amount;
use medbills_core::{Notice, NoticeLevel, ViewState};

const STYLE: &str = "body{font-family:sans-serif;margin:0;display:flex}\
aside{width:260px;padding:1rem;background:#f4f4f6;min-height:100vh}\
main{flex:1;padding:1rem 2rem}\
table{border-collapse:collapse;width:100%}td,th{border:1px solid #ccc;padding:4px 8px;text-align:left}\
.notice{padding:.5rem 1rem;margin:.25rem 0;border-radius:4px}\
.success{background:#e3f6e5}.info{background:#e4eefb}.warning{background:#fff4d6}.error{background:#fde2e1}\
form.inline{display:inline}label{display:block;margin-top:.5rem}";

/// Minimal HTML escaping for text and attribute values.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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

pub fn render(view: &ViewState) -> String {
    let body = if view.logged_in {
        dashboard(view)
    } else {
        login_page(&view.notices)
    };

    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
<title>Medical Bill Manager</title><style>{STYLE}</style></head><body>{body}</body></html>"
    )
}

fn notices(list: &[Notice]) -> String {
    list.iter()
        .map(|n| {
            let class = match n.level {
                NoticeLevel::Success => "success",
                NoticeLevel::Info => "info",
                NoticeLevel::Warning => "warning",
                NoticeLevel::Error => "error",
            };
            format!("<div class=\"notice {class}\">{}</div>", escape(&n.message))
        })
        .collect()
}

fn login_page(list: &[Notice]) -> String {
    format!(
        "<main><h1>Login</h1>{}\
<form method=\"post\" action=\"/login\">\
<label>Username <input name=\"username\" autocomplete=\"username\"></label>\
<label>Password <input name=\"password\" type=\"password\" autocomplete=\"current-password\"></label>\
<button type=\"submit\">Login</button></form></main>",
        notices(list)
    )
}

fn dashboard(view: &ViewState) -> String {
    let mut html = String::new();

    // Sidebar: doctors
    html.push_str("<aside><h2>Manage Doctors</h2>");
    html.push_str(
        "<form method=\"post\" action=\"/doctors\">\
<label>Add New Doctor <input name=\"name\"></label><button type=\"submit\">Add Doctor</button></form><ul>",
    );
    for doctor in &view.doctors {
        let _ = write!(
            html,
            "<li>{} <form class=\"inline\" method=\"post\" action=\"/doctors/{}/delete\">\
<button type=\"submit\">Delete</button></form></li>",
            escape(&doctor.name),
            escape(doctor.id.as_str())
        );
    }
    html.push_str(
        "</ul><form method=\"post\" action=\"/logout\"><button type=\"submit\">Logout</button></form></aside>",
    );

    html.push_str("<main><h1>Medical Bill Manager</h1>");
    html.push_str(&notices(&view.notices));

    // Scan
    html.push_str("<h2>Add a New Bill</h2>");
    if view.extraction_enabled {
        html.push_str(
            "<form method=\"post\" action=\"/bills/scan\" enctype=\"multipart/form-data\">\
<label>Upload a bill image <input type=\"file\" name=\"image\" accept=\"image/jpeg,image/png\"></label>\
<button type=\"submit\">Scan Bill with AI</button></form>",
        );
    } else {
        html.push_str("<p>Bill scanning is disabled.</p>");
    }

    // Entry form
    let form = &view.form;
    let date = form
        .bill_date
        .map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default();
    let _ = write!(
        html,
        "<form method=\"post\" action=\"/bills\">\
<label>Name of Vendor <input name=\"vendor_name\" value=\"{}\"></label>\
<label>Bill No. <input name=\"bill_no\" value=\"{}\"></label>\
<label>Bill Date <input type=\"date\" name=\"bill_date\" value=\"{}\"></label>\
<label>Bill Amount <input type=\"number\" min=\"0\" step=\"0.01\" name=\"bill_amount\" value=\"{:.2}\"></label>\
<label>Doctor <select name=\"doctor_name\"><option value=\"\"></option>",
        escape(&form.vendor_name),
        escape(&form.bill_no),
        date,
        form.bill_amount
    );
    let selected = form.doctor_name.as_deref();
    let mut seen = false;
    for doctor in &view.doctors {
        let is_selected = selected == Some(doctor.name.as_str());
        seen |= is_selected;
        let _ = write!(
            html,
            "<option{}>{}</option>",
            if is_selected { " selected" } else { "" },
            escape(&doctor.name)
        );
    }
    if let (Some(name), false) = (selected, seen) {
        let _ = write!(html, "<option selected>{}</option>", escape(name));
    }
    html.push_str(
        "</select></label>\
<button type=\"submit\" name=\"intent\" value=\"save\">Save Bill</button>\
<button type=\"submit\" name=\"intent\" value=\"clear\">Clear Form</button></form>",
    );

    // Bills
    html.push_str("<h2>All Bills</h2>");
    if !view.bills.is_empty() {
        html.push_str(
            "<table><tr><th>Vendor</th><th>Bill No.</th><th>Bill Date</th><th>Amount</th><th>Doctor</th><th></th></tr>",
        );
        for bill in &view.bills {
            let _ = write!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
<td><form class=\"inline\" method=\"post\" action=\"/bills/{}/delete\" title=\"{}\">\
<button type=\"submit\">Delete</button></form></td></tr>",
                escape(&bill.vendor_name),
                escape(bill.bill_no.as_deref().unwrap_or("")),
                bill.bill_date.format(DATE_FORMAT),
                format_amount(bill.bill_amount),
                escape(bill.doctor_name.as_deref().unwrap_or("")),
                escape(bill.id.as_str()),
                escape(&bill.label())
            );
        }
        html.push_str("</table>");
    }

    // Report
    let _ = write!(
        html,
        "<h2>Generate Report</h2><form method=\"get\" action=\"/report\">\
<label>Start date <input type=\"date\" name=\"start\" value=\"{}\"></label>\
<label>End date <input type=\"date\" name=\"end\" value=\"{}\"></label>\
<button type=\"submit\">Generate PDF Report</button></form></main>",
        view.report_range.start().format(DATE_FORMAT),
        view.report_range.end().format(DATE_FORMAT)
    );

    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use medbills_core::models::{Doctor, NewBill, PendingFormState, RecordId};
    use medbills_core::report::DateRange;

    fn view(logged_in: bool) -> ViewState {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        ViewState {
            logged_in,
            notices: vec![Notice::new(NoticeLevel::Warning, "<b>careful</b>")],
            doctors: vec![Doctor {
                id: RecordId::new("d1"),
                name: "Rao & Sons".into(),
            }],
            bills: vec![NewBill::new("Acme", None, today, 42.5, None).into_bill(RecordId::new("b1"))],
            form: PendingFormState::new(today),
            report_range: DateRange::last_days(today, 30),
            extraction_enabled: false,
            download: None,
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("<a href=\"x\">'&'</a>"), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn test_login_page() {
        let html = render(&view(false));
        assert!(html.contains("action=\"/login\""));
        assert!(!html.contains("Acme"));
        assert!(html.contains("&lt;b&gt;careful&lt;/b&gt;"));
    }

    #[test]
    fn test_dashboard() {
        let html = render(&view(true));
        assert!(html.contains("Rao &amp; Sons"));
        assert!(html.contains("$42.50"));
        assert!(html.contains("/bills/b1/delete"));
        assert!(html.contains("value=\"2024-02-14\""));
        assert!(html.contains("Bill scanning is disabled."));
    }
}
