//! WhatsApp deep-link composition for a selected contact.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters left unescaped by JavaScript's `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Template tokens replaced by the visitor name.
const NAME_TOKENS: [&str; 2] = ["{name}", "{nome}"];

const WA_BASE: &str = "https://wa.me/";

/// Renders the outbound message.
///
/// Name tokens are replaced only when a non-blank visitor name is supplied;
/// otherwise the template is returned unchanged.
#[must_use]
pub fn render_message(template: &str, visitor_name: Option<&str>) -> String {
    let Some(name) = visitor_name.map(str::trim).filter(|n| !n.is_empty()) else {
        return template.to_string();
    };
    NAME_TOKENS
        .iter()
        .fold(template.to_string(), |msg, token| msg.replace(token, name))
}

/// Builds `https://wa.me/<digits>?text=<message>` for the contact phone.
///
/// Non-digit characters are stripped from the phone. The `text` parameter
/// is omitted when the template is absent or blank.
#[must_use]
pub fn whatsapp_url(phone: &str, template: Option<&str>, visitor_name: Option<&str>) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    match template.filter(|t| !t.trim().is_empty()) {
        Some(template) => {
            let message = render_message(template, visitor_name);
            format!(
                "{WA_BASE}{digits}?text={}",
                utf8_percent_encode(&message, COMPONENT)
            )
        }
        None => format!("{WA_BASE}{digits}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_name_token() {
        assert_eq!(render_message("Oi, sou {name}!", Some("Ana")), "Oi, sou Ana!");
        assert_eq!(render_message("Oi, sou {nome}!", Some("Ana")), "Oi, sou Ana!");
    }

    #[test]
    fn keeps_template_without_name() {
        assert_eq!(render_message("Oi, sou {name}!", None), "Oi, sou {name}!");
        assert_eq!(render_message("Oi, sou {name}!", Some("  ")), "Oi, sou {name}!");
    }

    #[test]
    fn url_strips_phone_and_encodes_text() {
        let url = whatsapp_url("+55 (11) 1111-2222", Some("Olá {name} & cia"), Some("Bia"));
        assert_eq!(
            url,
            "https://wa.me/551111112222?text=Ol%C3%A1%20Bia%20%26%20cia"
        );
    }

    #[test]
    fn url_without_template() {
        assert_eq!(whatsapp_url("+551111", None, None), "https://wa.me/551111");
        assert_eq!(whatsapp_url("+551111", Some("  "), None), "https://wa.me/551111");
    }
}
