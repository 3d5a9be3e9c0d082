//! Email Template Engine
//!
//! Handlebars-based rendering for the portal's outbound mail.

use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Email template definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub id: String,
    pub name: String,
    pub description: String,
    pub subject_template: String,
    pub body_html_template: String,
    pub body_text_template: String,
}

/// Template rendering result
#[derive(Debug, Clone)]
pub struct RenderedEmail {
    pub subject: String,
    pub body_html: String,
    pub body_text: String,
}

/// Template engine
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
    templates: HashMap<String, EmailTemplate>,
}

const HTML_STYLE: &str = "body{font-family:Arial,sans-serif;line-height:1.6;color:#333;}.header{background:#1d4ed8;color:white;padding:20px;}.content{padding:20px;}.footer{background:#f3f4f6;padding:20px;font-size:12px;}";

impl TemplateEngine {
    pub fn new() -> Self {
        let mut engine = Self {
            handlebars: Handlebars::new(),
            templates: HashMap::new(),
        };

        engine.register_builtin_templates();

        engine
    }

    /// Register the portal's built-in templates
    fn register_builtin_templates(&mut self) {
        let new_lead = EmailTemplate {
            id: "new_lead".to_string(),
            name: "New Lead Notification".to_string(),
            description: "Tells an agency a lead was entered on their behalf".to_string(),
            subject_template: "New lead: {{student_name}}".to_string(),
            body_html_template: format!(
                r#"<!DOCTYPE html>
<html>
<head><style>{HTML_STYLE}</style></head>
<body>
<div class="header"><h2>New Lead</h2></div>
<div class="content">
<p>Dear {{{{agency_name}}}},</p>
<p>A new lead has been added to your agency on the AB Partner Portal:</p>
<ul>
<li>Student: {{{{student_name}}}} ({{{{student_email}}}})</li>
{{{{#if destination_country}}}}<li>Destination: {{{{destination_country}}}}</li>{{{{/if}}}}
{{{{#if course_interest}}}}<li>Course interest: {{{{course_interest}}}}</li>{{{{/if}}}}
</ul>
<p>Sign in to the portal to follow up.</p>
</div>
<div class="footer">This is an automated message from the AB Partner Portal.</div>
</body>
</html>
"#
            ),
            body_text_template: r#"New Lead

Dear {{agency_name}},

A new lead has been added to your agency on the AB Partner Portal:

- Student: {{student_name}} ({{student_email}})
{{#if destination_country}}- Destination: {{destination_country}}
{{/if}}{{#if course_interest}}- Course interest: {{course_interest}}
{{/if}}
Sign in to the portal to follow up.

---
This is an automated message from the AB Partner Portal.
"#
            .to_string(),
        };
        self.templates.insert(new_lead.id.clone(), new_lead);

        let quotation_sent = EmailTemplate {
            id: "quotation_sent".to_string(),
            name: "Quotation".to_string(),
            description: "Sends a priced quotation to the student".to_string(),
            subject_template: "Your quotation {{quote_number}}".to_string(),
            body_html_template: format!(
                r#"<!DOCTYPE html>
<html>
<head><style>{HTML_STYLE}</style></head>
<body>
<div class="header"><h2>Quotation {{{{quote_number}}}}</h2></div>
<div class="content">
<p>Dear {{{{student_name}}}},</p>
<p>Please find your quotation below:</p>
<ul>
<li>Institution: {{{{institution}}}}</li>
<li>Course: {{{{course_name}}}}</li>
<li>Total: {{{{total}}}} {{{{currency}}}}</li>
{{{{#if valid_until}}}}<li>Valid until: {{{{valid_until}}}}</li>{{{{/if}}}}
</ul>
<p>Reply to your agent with any questions.</p>
</div>
<div class="footer">This is an automated message from the AB Partner Portal.</div>
</body>
</html>
"#
            ),
            body_text_template: r#"Quotation {{quote_number}}

Dear {{student_name}},

Please find your quotation below:

- Institution: {{institution}}
- Course: {{course_name}}
- Total: {{total}} {{currency}}
{{#if valid_until}}- Valid until: {{valid_until}}
{{/if}}
Reply to your agent with any questions.

---
This is an automated message from the AB Partner Portal.
"#
            .to_string(),
        };
        self.templates.insert(quotation_sent.id.clone(), quotation_sent);

        let payment_confirmed = EmailTemplate {
            id: "payment_confirmed".to_string(),
            name: "Payment Confirmation".to_string(),
            description: "Receipt confirmation sent to the student".to_string(),
            subject_template: "Payment received - {{receipt_number}}".to_string(),
            body_html_template: format!(
                r#"<!DOCTYPE html>
<html>
<head><style>{HTML_STYLE}</style></head>
<body>
<div class="header"><h2>Payment Received</h2></div>
<div class="content">
<p>Dear {{{{student_name}}}},</p>
<p>We have confirmed your payment:</p>
<ul>
<li>Receipt: {{{{receipt_number}}}}</li>
<li>Amount: {{{{amount}}}} {{{{currency}}}}</li>
<li>Method: {{{{method}}}}</li>
</ul>
<p>Keep this email for your records.</p>
</div>
<div class="footer">This is an automated message from the AB Partner Portal.</div>
</body>
</html>
"#
            ),
            body_text_template: r#"Payment Received

Dear {{student_name}},

We have confirmed your payment:

- Receipt: {{receipt_number}}
- Amount: {{amount}} {{currency}}
- Method: {{method}}

Keep this email for your records.

---
This is an automated message from the AB Partner Portal.
"#
            .to_string(),
        };
        self.templates
            .insert(payment_confirmed.id.clone(), payment_confirmed);

        let profile_activated = EmailTemplate {
            id: "profile_activated".to_string(),
            name: "Account Activated".to_string(),
            description: "Welcome mail once an admin activates a profile".to_string(),
            subject_template: "Your AB Partner Portal account is active".to_string(),
            body_html_template: format!(
                r#"<!DOCTYPE html>
<html>
<head><style>{HTML_STYLE}</style></head>
<body>
<div class="header"><h2>Welcome to the AB Partner Portal</h2></div>
<div class="content">
<p>Dear {{{{name}}}},</p>
<p>Your {{{{role}}}} account ({{{{email}}}}) has been activated. You can now sign in and start working with your leads, quotations and resources.</p>
</div>
<div class="footer">This is an automated message from the AB Partner Portal.</div>
</body>
</html>
"#
            ),
            body_text_template: r#"Welcome to the AB Partner Portal

Dear {{name}},

Your {{role}} account ({{email}}) has been activated. You can now sign in
and start working with your leads, quotations and resources.

---
This is an automated message from the AB Partner Portal.
"#
            .to_string(),
        };
        self.templates
            .insert(profile_activated.id.clone(), profile_activated);
    }

    /// Get template by ID
    pub fn get_template(&self, template_id: &str) -> Option<&EmailTemplate> {
        self.templates.get(template_id)
    }

    /// Render template with variables
    pub fn render(&self, template_id: &str, variables: &serde_json::Value) -> Result<RenderedEmail> {
        let template = self
            .templates
            .get(template_id)
            .context("Template not found")?;

        let subject = self
            .handlebars
            .render_template(&template.subject_template, variables)
            .context("Failed to render subject")?;

        let body_html = self
            .handlebars
            .render_template(&template.body_html_template, variables)
            .context("Failed to render HTML body")?;

        let body_text = self
            .handlebars
            .render_template(&template.body_text_template, variables)
            .context("Failed to render text body")?;

        Ok(RenderedEmail {
            subject,
            body_html,
            body_text,
        })
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builtin_templates_are_registered() {
        let engine = TemplateEngine::new();
        for id in ["new_lead", "quotation_sent", "payment_confirmed", "profile_activated"] {
            assert!(engine.get_template(id).is_some(), "missing template {}", id);
        }
    }

    #[test]
    fn quotation_template_renders_optional_validity() {
        let engine = TemplateEngine::new();
        let with_validity = engine
            .render(
                "quotation_sent",
                &json!({
                    "student_name": "Asha Rao",
                    "quote_number": "Q-20260824-AB12CD",
                    "institution": "Unseen University",
                    "course_name": "BSc Thaumatology",
                    "total": "23500.00",
                    "currency": "AUD",
                    "valid_until": "2026-09-30",
                }),
            )
            .unwrap();

        assert_eq!(with_validity.subject, "Your quotation Q-20260824-AB12CD");
        assert!(with_validity.body_text.contains("Valid until: 2026-09-30"));
        assert!(with_validity.body_html.contains("23500.00 AUD"));

        let without_validity = engine
            .render(
                "quotation_sent",
                &json!({
                    "student_name": "Asha Rao",
                    "quote_number": "Q-20260824-AB12CD",
                    "institution": "Unseen University",
                    "course_name": "BSc Thaumatology",
                    "total": "23500.00",
                    "currency": "AUD",
                    "valid_until": null,
                }),
            )
            .unwrap();
        assert!(!without_validity.body_text.contains("Valid until"));
    }

    #[test]
    fn unknown_template_errors() {
        let engine = TemplateEngine::new();
        assert!(engine.render("no_such_template", &json!({})).is_err());
    }
}
