//! Contact and newsletter forms.
//!
//! Neither form talks to a server. Submission disables the submit control,
//! waits a simulated network delay, reports the result with a toast and
//! re-enables the control.

use crate::config::TimingConfig;
use crate::dom::{Document, Dom, NodeId};
use crate::notify::{NoticeKind, Notifier};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info};

pub const CONTACT_FORM_CLASS: &str = "contact-form";
pub const NEWSLETTER_FORM_CLASS: &str = "newsletter-form";
const BOUND_ATTR: &str = "data-bound";

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_re().is_match(email.trim())
}

/// Values the contact form submits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactFields {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactFields {
    pub fn new(name: &str, email: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            message: message.to_string(),
        }
    }

    fn problem(&self) -> Option<&'static str> {
        if [&self.name, &self.email, &self.message]
            .iter()
            .any(|f| f.trim().is_empty())
        {
            return Some("Preencha todos os campos obrigatórios.");
        }
        if !is_valid_email(&self.email) {
            return Some("Por favor, insira um e-mail válido");
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Sent,
    /// Validation failed; the reason was shown as an error toast.
    Rejected(String),
    /// The form is not on the current page.
    Unavailable,
}

/// The busy/idle labels of a form's submit control.
struct SubmitLabels {
    busy: &'static str,
    idle: &'static str,
}

const CONTACT_LABELS: SubmitLabels = SubmitLabels {
    busy: "Enviando...",
    idle: "Enviar Mensagem",
};

const NEWSLETTER_LABELS: SubmitLabels = SubmitLabels {
    busy: "Inscrevendo...",
    idle: "Inscrever",
};

fn submit_button(doc: &Document, form: NodeId) -> Option<NodeId> {
    doc.find(form, |el| {
        el.tag == "button" && el.attrs.get("type").map(String::as_str) == Some("submit")
    })
}

fn set_busy(doc: &mut Document, form: NodeId, labels: &SubmitLabels, busy: bool) {
    let Some(button) = submit_button(doc, form) else {
        return;
    };
    if busy {
        doc.set_attr(button, "disabled", "");
        doc.set_text(button, labels.busy);
    } else {
        doc.remove_attr(button, "disabled");
        doc.set_text(button, labels.idle);
    }
}

/// Clear every input and textarea inside `form`.
fn reset(doc: &mut Document, form: NodeId) {
    for field in doc.find_all(form, |el| el.tag == "input" || el.tag == "textarea") {
        let is_textarea = doc.element(field).is_some_and(|el| el.tag == "textarea");
        if is_textarea {
            doc.set_text(field, "");
        } else {
            doc.remove_attr(field, "value");
        }
    }
}

#[derive(Debug, Clone)]
pub struct Forms {
    dom: Dom,
    notifier: Notifier,
    timing: TimingConfig,
}

impl Forms {
    pub fn new(dom: Dom, notifier: Notifier, timing: TimingConfig) -> Self {
        Self {
            dom,
            notifier,
            timing,
        }
    }

    fn form(&self, class: &str) -> Option<NodeId> {
        self.dom.read(|doc| doc.by_class(class).into_iter().next())
    }

    /// Mark the contact form of the current page as wired.
    pub fn bind_contact(&self) -> bool {
        let Some(form) = self.form(CONTACT_FORM_CLASS) else {
            debug!("no contact form on this page");
            return false;
        };
        self.dom.write(|doc| doc.set_attr(form, BOUND_ATTR, "contact"));
        true
    }

    pub fn contact_bound(&self) -> bool {
        self.form(CONTACT_FORM_CLASS)
            .is_some_and(|form| self.dom.read(|doc| doc.attr(form, BOUND_ATTR).is_some()))
    }

    pub async fn submit_contact(&self, fields: &ContactFields) -> SubmitOutcome {
        let Some(form) = self.form(CONTACT_FORM_CLASS).filter(|_| self.contact_bound()) else {
            return SubmitOutcome::Unavailable;
        };
        self.dom.write(|doc| set_busy(doc, form, &CONTACT_LABELS, true));

        tokio::time::sleep(self.timing.contact_delay()).await;

        let outcome = match fields.problem() {
            Some(problem) => {
                self.notifier.show(problem, NoticeKind::Error);
                SubmitOutcome::Rejected(problem.to_string())
            }
            None => {
                info!(email = %fields.email, "contact message sent");
                self.notifier
                    .show("✅ Mensagem enviada com sucesso!", NoticeKind::Success);
                self.dom.write(|doc| reset(doc, form));
                SubmitOutcome::Sent
            }
        };
        self.dom.write(|doc| set_busy(doc, form, &CONTACT_LABELS, false));
        outcome
    }

    /// An invalid address is rejected at once, without the delay.
    pub async fn submit_newsletter(&self, email: &str) -> SubmitOutcome {
        let Some(form) = self.form(NEWSLETTER_FORM_CLASS) else {
            return SubmitOutcome::Unavailable;
        };
        if !is_valid_email(email) {
            let problem = "Por favor, insira um e-mail válido";
            self.notifier.show(problem, NoticeKind::Error);
            return SubmitOutcome::Rejected(problem.to_string());
        }

        self.dom.write(|doc| set_busy(doc, form, &NEWSLETTER_LABELS, true));
        tokio::time::sleep(self.timing.newsletter_delay()).await;

        info!(email, "newsletter subscription");
        self.notifier
            .show("✅ Inscrição realizada com sucesso!", NoticeKind::Success);
        self.dom.write(|doc| {
            reset(doc, form);
            set_busy(doc, form, &NEWSLETTER_LABELS, false);
        });
        SubmitOutcome::Sent
    }
}
