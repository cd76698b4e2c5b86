//! Request line and headers sent once per connection attempt

use serde::{Deserialize, Serialize};

/// Header line terminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// Bare line feed, accepted by most servers
    #[default]
    Lf,
    /// Carriage return + line feed, strict HTTP/1.1
    Crlf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }
}

/// Filler byte the body is made of
pub const BODY_FILLER: u8 = b'A';

/// Build the request head for a body of `content_length` bytes
pub fn request_head(
    host: &str,
    path: &str,
    user_agent: Option<&str>,
    content_length: usize,
    line_ending: LineEnding,
) -> String {
    let eol = line_ending.as_str();
    let mut head = format!("POST {} HTTP/1.1{}", path, eol);
    head.push_str(&format!("Host: {}{}", host, eol));
    head.push_str(&format!("Content-Type: application/x-www-form-urlencoded{}", eol));
    if let Some(user_agent) = user_agent.filter(|ua| !ua.is_empty()) {
        head.push_str(&format!("User-Agent: {}{}", user_agent, eol));
    }
    head.push_str(&format!("Content-Length: {}{}", content_length, eol));
    head.push_str(eol);

    head
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_head() {
        let head = request_head("target.test", "/login", Some("probe/1.0"), 4096, LineEnding::Lf);
        assert_eq!(
            head,
            "POST /login HTTP/1.1\n\
             Host: target.test\n\
             Content-Type: application/x-www-form-urlencoded\n\
             User-Agent: probe/1.0\n\
             Content-Length: 4096\n\
             \n"
        );
    }

    #[test]
    fn test_empty_user_agent_is_omitted() {
        let head = request_head("target.test", "/", Some(""), 10, LineEnding::Lf);
        assert!(!head.contains("User-Agent"));

        let head = request_head("target.test", "/", None, 10, LineEnding::Lf);
        assert!(!head.contains("User-Agent"));
    }

    #[test]
    fn test_crlf_head() {
        let head = request_head("target.test", "/", None, 0, LineEnding::Crlf);
        assert!(head.starts_with("POST / HTTP/1.1\r\nHost: target.test\r\n"));
        assert!(head.ends_with("Content-Length: 0\r\n\r\n"));
        assert_eq!(head.matches('\n').count(), head.matches("\r\n").count());
    }
}
