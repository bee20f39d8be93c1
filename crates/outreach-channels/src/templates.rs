//! Email templates and personalisation.
//!
//! A template is plain text whose first `Subject:` line is the subject and
//! everything after it the body. Placeholders use `{key}` anywhere and
//! `[KEY]` in the body:
//!
//! | key | value |
//! |---|---|
//! | `first_name` | first word of the contact name, or "there" |
//! | `name` | contact name |
//! | `recipient_title` | contact title, or "your role" |
//! | `company`, `job_title` | from the campaign |
//! | `YOUR_NAME`, `YOUR_EMAIL`, `YOUR_LINKEDIN` | owner profile |
//! | `SKILL_1` .. `SKILL_3` | owner skills, or "Key skill N" |

use std::path::Path;

use outreach_core::error::{OutreachError, Result};
use outreach_core::traits::{RenderContext, TemplateRenderer};
use outreach_core::types::{EmailKind, RenderedEmail};

const INITIAL_FILE: &str = "initial_email.txt";
const FOLLOWUP_FILE: &str = "followup_email.txt";

const BUILTIN_INITIAL: &str = "Subject: Referral for the {job_title} role at {company}

Hi {first_name},

I came across your profile while looking into the {job_title} opening at {company}, and as {recipient_title} you would know the team far better than a job posting does.

A little about me:
- {SKILL_1}
- {SKILL_2}
- {SKILL_3}

Would you be open to referring me, or pointing me to the right person? Happy to send my resume or set up a short call.

Thanks for your time,
{YOUR_NAME}
{YOUR_EMAIL}
{YOUR_LINKEDIN}
";

const BUILTIN_FOLLOWUP: &str = "Subject: Re: Referral for the {job_title} role at {company}

Hi {first_name},

Just bumping my earlier note about the {job_title} role at {company} in case it got buried. Any pointer would mean a lot.

Best,
{YOUR_NAME}
{YOUR_EMAIL}
";

/// Renders the initial and follow-up templates.
#[derive(Debug, Clone)]
pub struct FileTemplateRenderer {
    initial: String,
    followup: String,
}

impl FileTemplateRenderer {
    pub fn builtin() -> Self {
        Self {
            initial: BUILTIN_INITIAL.to_string(),
            followup: BUILTIN_FOLLOWUP.to_string(),
        }
    }

    /// Load `initial_email.txt` and `followup_email.txt` from `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let load = |name: &str| {
            let path = dir.join(name);
            std::fs::read_to_string(&path).map_err(|e| {
                OutreachError::Config(format!("Template not found: {}: {e}", path.display()))
            })
        };
        Ok(Self {
            initial: load(INITIAL_FILE)?,
            followup: load(FOLLOWUP_FILE)?,
        })
    }

    /// Builtin templates unless a directory is configured.
    pub fn from_config(dir: Option<&Path>) -> Result<Self> {
        match dir {
            Some(dir) => Self::from_dir(dir),
            None => Ok(Self::builtin()),
        }
    }

    fn template(&self, kind: EmailKind) -> &str {
        match kind {
            EmailKind::Initial => &self.initial,
            EmailKind::Followup => &self.followup,
        }
    }
}

/// Split a template into subject and body.
fn split_subject(template: &str) -> (String, String) {
    let mut lines = template.lines();
    let mut subject = String::new();
    for line in lines.by_ref() {
        if let Some(rest) = line.strip_prefix("Subject:") {
            subject = rest.trim().to_string();
            break;
        }
    }
    let body = lines.collect::<Vec<_>>().join("\n").trim().to_string();
    (subject, body)
}

fn replacements(ctx: &RenderContext<'_>) -> Vec<(String, String)> {
    let contact = ctx.contact;
    let owner = ctx.owner;
    let title = contact.title.trim();
    let mut pairs = vec![
        ("first_name".to_string(), contact.first_name().to_string()),
        ("name".to_string(), contact.name.trim().to_string()),
        (
            "recipient_title".to_string(),
            if title.is_empty() { "your role" } else { title }.to_string(),
        ),
        ("company".to_string(), ctx.campaign.company.clone()),
        ("job_title".to_string(), ctx.campaign.job_title.clone()),
        ("YOUR_NAME".to_string(), owner.name.clone()),
        ("YOUR_EMAIL".to_string(), owner.email.clone()),
        ("YOUR_LINKEDIN".to_string(), owner.linkedin.clone()),
    ];
    for i in 0..3 {
        let skill = owner
            .skills
            .get(i)
            .filter(|s| !s.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| format!("Key skill {}", i + 1));
        pairs.push((format!("SKILL_{}", i + 1), skill));
    }
    pairs
}

/// Expand placeholders in one pass over `template`, so substituted values
/// are never expanded again. Unknown placeholders are left as written.
fn substitute(template: &str, values: &[(String, String)], brackets: bool) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find(|c: char| c == '{' || (brackets && c == '[')) {
        out.push_str(&rest[..start]);
        let close = if rest[start..].starts_with('{') { '}' } else { ']' };
        let tail = &rest[start + 1..];
        let value = tail
            .find(close)
            .map(|end| &tail[..end])
            .and_then(|key| values.iter().find(|(k, _)| k == key).map(|(_, v)| (key, v)));
        match value {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len() + 1..];
            }
            None => {
                out.push_str(&rest[start..start + 1]);
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

impl TemplateRenderer for FileTemplateRenderer {
    fn render(&self, kind: EmailKind, ctx: RenderContext<'_>) -> Result<RenderedEmail> {
        if ctx.contact.email_address.trim().is_empty() {
            return Err(OutreachError::validation(format!(
                "contact {} has no email address",
                ctx.contact.id
            )));
        }
        if ctx.owner.name.trim().is_empty() {
            return Err(OutreachError::validation(format!(
                "owner '{}' has no name; set a profile first",
                ctx.owner.owner_user_id
            )));
        }

        let (subject, body) = split_subject(self.template(kind));
        let values = replacements(&ctx);
        let subject = substitute(&subject, &values, false);
        let body = substitute(&body, &values, true);

        if subject.trim().is_empty() {
            return Err(OutreachError::validation(format!(
                "{kind} template has an empty subject"
            )));
        }
        Ok(RenderedEmail { subject, body })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use outreach_core::types::{Campaign, CampaignStatus, Contact, OwnerProfile};

    use super::*;

    fn fixtures() -> (Contact, Campaign, OwnerProfile) {
        let contact = Contact {
            id: 7,
            campaign_id: 1,
            name: "Ada Lovelace".into(),
            email_address: "ada@acme.io".into(),
            title: "Staff Engineer".into(),
            company: "Acme".into(),
            linkedin_url: None,
            source_id: None,
            created_at: Utc::now(),
        };
        let campaign = Campaign {
            id: 1,
            owner_user_id: "me".into(),
            company: "Acme".into(),
            job_title: "Backend Engineer".into(),
            job_description: None,
            created_at: Utc::now(),
            status: CampaignStatus::Active,
        };
        let owner = OwnerProfile {
            owner_user_id: "me".into(),
            name: "Sam Sender".into(),
            email: "sam@example.com".into(),
            linkedin: "linkedin.com/in/sam".into(),
            skills: vec!["Rust services".into()],
        };
        (contact, campaign, owner)
    }

    fn render(renderer: &FileTemplateRenderer, kind: EmailKind) -> Result<RenderedEmail> {
        let (contact, campaign, owner) = fixtures();
        renderer.render(
            kind,
            RenderContext {
                contact: &contact,
                campaign: &campaign,
                owner: &owner,
            },
        )
    }

    #[test]
    fn test_builtin_initial_personalised() {
        let email = render(&FileTemplateRenderer::builtin(), EmailKind::Initial).unwrap();
        assert_eq!(email.subject, "Referral for the Backend Engineer role at Acme");
        assert!(email.body.starts_with("Hi Ada,"));
        assert!(email.body.contains("as Staff Engineer"));
        assert!(email.body.contains("- Rust services"));
        assert!(email.body.contains("- Key skill 2"));
        assert!(email.body.contains("Sam Sender"));
        assert!(!email.body.contains('{'));
    }

    #[test]
    fn test_builtin_followup_subject() {
        let email = render(&FileTemplateRenderer::builtin(), EmailKind::Followup).unwrap();
        assert!(email.subject.starts_with("Re: "));
    }

    #[test]
    fn test_bracket_placeholders_in_body_only() {
        let renderer = FileTemplateRenderer {
            initial: "Subject: Hello [YOUR_NAME]\nFrom [YOUR_NAME] to {name}".into(),
            followup: String::new(),
        };
        let email = render(&renderer, EmailKind::Initial).unwrap();
        assert_eq!(email.subject, "Hello [YOUR_NAME]");
        assert_eq!(email.body, "From Sam Sender to Ada Lovelace");
    }

    #[test]
    fn test_substituted_values_are_not_expanded_again() {
        let (mut contact, campaign, owner) = fixtures();
        contact.name = "{YOUR_EMAIL} [SKILL_1]".into();
        let renderer = FileTemplateRenderer {
            initial: "Subject: For {name}\nDear {name}, from {YOUR_NAME} [unknown] {nope}".into(),
            followup: String::new(),
        };
        let email = renderer
            .render(
                EmailKind::Initial,
                RenderContext {
                    contact: &contact,
                    campaign: &campaign,
                    owner: &owner,
                },
            )
            .unwrap();
        assert_eq!(email.subject, "For {YOUR_EMAIL} [SKILL_1]");
        assert_eq!(
            email.body,
            "Dear {YOUR_EMAIL} [SKILL_1], from Sam Sender [unknown] {nope}"
        );
        assert!(!email.body.contains("sam@example.com"));
    }

    #[test]
    fn test_missing_subject_is_validation_error() {
        let renderer = FileTemplateRenderer {
            initial: "No subject here".into(),
            followup: String::new(),
        };
        let err = render(&renderer, EmailKind::Initial).unwrap_err();
        assert!(matches!(err, OutreachError::Validation(_)));
    }

    #[test]
    fn test_missing_owner_name_is_validation_error() {
        let (contact, campaign, mut owner) = fixtures();
        owner.name.clear();
        let err = FileTemplateRenderer::builtin()
            .render(
                EmailKind::Initial,
                RenderContext {
                    contact: &contact,
                    campaign: &campaign,
                    owner: &owner,
                },
            )
            .unwrap_err();
        assert!(err.is_per_contact());
    }

    #[test]
    fn test_from_dir() {
        let dir = std::env::temp_dir().join("outreach-templates-test");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(INITIAL_FILE), "Subject: Hi {first_name}\nBody").unwrap();
        std::fs::write(dir.join(FOLLOWUP_FILE), "Subject: Again\nBody 2").unwrap();
        let renderer = FileTemplateRenderer::from_config(Some(&dir)).unwrap();
        assert_eq!(render(&renderer, EmailKind::Initial).unwrap().subject, "Hi Ada");
        std::fs::remove_dir_all(&dir).ok();

        assert!(FileTemplateRenderer::from_dir(&dir).is_err());
    }
}
