/// Represents ways to locate an element inside the booking widget.
///
/// The widget renders everything as text-labelled controls, so exact-text
/// matching is the primary strategy; `TextContains` covers labels with
/// trailing counts ("Afternoon: 4 available") and the date strip's
/// dual-month range headers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Exact rendered text.
    Text(String),
    /// Substring of the rendered text.
    TextContains(String),
    /// Select by role and optional accessible name (e.g. button "Continue").
    Role { role: String, name: Option<String> },
    /// CSS selector, passed through to the page.
    Css(String),
    /// Every condition must hold on the same element.
    And(Vec<Selector>),
    /// Represents an invalid selector string, with a reason.
    Invalid(String),
}

impl Selector {
    pub fn text(text: impl Into<String>) -> Self {
        Selector::Text(text.into())
    }

    pub fn text_contains(text: impl Into<String>) -> Self {
        Selector::TextContains(text.into())
    }

    pub fn role(role: impl Into<String>, name: Option<&str>) -> Self {
        Selector::Role {
            role: role.into(),
            name: name.map(str::to_string),
        }
    }

    pub fn css(css: impl Into<String>) -> Self {
        Selector::Css(css.into())
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        // role|name is the preferred precise format (e.g. "button|Continue")
        if s.contains('|') {
            let parts: Vec<&str> = s.split('|').collect();
            if parts.len() >= 2 {
                let role_part = parts[0].trim();
                let name_part = parts[1].trim();

                let role = role_part
                    .strip_prefix("role:")
                    .unwrap_or(role_part)
                    .to_string();
                let name = name_part
                    .strip_prefix("name:")
                    .unwrap_or(name_part)
                    .to_string();

                return Selector::Role {
                    role,
                    name: Some(name),
                };
            }
        }

        match s {
            _ if s.starts_with("role:") => Selector::Role {
                role: s[5..].to_string(),
                name: None,
            },
            // Common widget roles default to Role selectors rather than text
            "button" | "link" | "textbox" | "checkbox" | "dialog" => Selector::Role {
                role: s.to_string(),
                name: None,
            },
            _ if s.starts_with("text*:") => Selector::TextContains(s[6..].to_string()),
            _ if s.starts_with("text:") => Selector::Text(s[5..].to_string()),
            _ if s.starts_with("css:") => Selector::Css(s[4..].to_string()),
            _ if s.starts_with('.') || s.starts_with('#') => Selector::Css(s.to_string()),
            _ => Selector::Invalid(format!(
                "Unknown selector format: \"{s}\". Use prefixes like 'role:', 'text:', 'text*:', or 'css:' to specify the selector type."
            )),
        }
    }
}
