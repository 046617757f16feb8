//! CAS 1.0 plain-text `/validate` responses.

/// CAS 1.0 responder: `yes\n<user>\n` or `no\n`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cas10;

impl Cas10 {
    pub fn render_validate_success(&self, username: &str) -> String {
        format!("yes\n{username}\n")
    }

    pub fn render_validate_failure(&self) -> String {
        "no\n".to_string()
    }
}
