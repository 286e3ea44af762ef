//! Text output formatting with colors.

use commune_fetch::{Delivery, RequestCompleted, ResponseBody, ResponseEnvelope};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Formats a request result. Verbose mode adds headers and verdicts.
    pub fn format_delivery(
        &self,
        delivery: &Delivery,
        event: Option<&RequestCompleted>,
        verbose: bool,
    ) -> String {
        let mut lines = Vec::new();

        match delivery {
            Ok(response) => {
                lines.push(self.status_line(response, event));
                if verbose {
                    lines.extend(self.header_lines(response));
                }
                let body = self.format_body(&response.body);
                if !body.is_empty() {
                    lines.push(String::new());
                    lines.push(body);
                }
            }
            Err(failure) => {
                lines.push(self.red(&format!("Error: {}", failure.error)));
                if let Some(response) = &failure.response {
                    lines.push(self.status_line(response, event));
                    if verbose {
                        lines.extend(self.header_lines(response));
                        lines.push(String::new());
                        lines.push(self.format_body(&response.body));
                    }
                }
            }
        }

        if verbose {
            if let Some(event) = event {
                lines.extend(self.verdict_lines(event));
            }
        }

        lines.join("\n")
    }

    /// Formats a status line: `200 OK https://... (12 ms)`.
    pub fn status_line(&self, response: &ResponseEnvelope, event: Option<&RequestCompleted>) -> String {
        let status = format!("{} {}", response.status, response.status_message);
        let status = if response.status >= 400 {
            self.red(&status)
        } else if response.is_redirect() {
            self.yellow(&status)
        } else {
            self.green(&status)
        };

        let timing = event
            .map(|e| format!(" {}", self.dim(&format!("({} ms)", e.duration.as_millis()))))
            .unwrap_or_default();

        format!("{} {}{}", self.bold(&status), response.url, timing)
    }

    /// Formats a body for display.
    pub fn format_body(&self, body: &ResponseBody) -> String {
        match body {
            ResponseBody::Json(Some(value)) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            ResponseBody::Json(None) => self.dim("(no JSON payload)"),
            ResponseBody::Text(text) => text.clone(),
            ResponseBody::Bytes(bytes) => self.dim(&format!("({} bytes)", bytes.len())),
        }
    }

    fn header_lines(&self, response: &ResponseEnvelope) -> Vec<String> {
        response
            .headers
            .iter()
            .map(|(name, value)| {
                let value = value.to_str().unwrap_or("<binary>");
                self.dim(&format!("{name}: {value}"))
            })
            .collect()
    }

    fn verdict_lines(&self, event: &RequestCompleted) -> Vec<String> {
        let verdicts = &event.diagnostics.verdicts;
        let checks = [
            ("http", &verdicts.http_error),
            ("community", &verdicts.community_error),
            ("trade", &verdicts.trade_error),
            ("json", &verdicts.json_error),
        ];

        let mut lines = vec![String::new(), self.bold(&format!("Request #{}", event.request_id))];
        for (name, verdict) in checks {
            let verdict = match verdict {
                Some(error) => self.red(&error.to_string()),
                None => self.dim("-"),
            };
            lines.push(format!("  {name:<10} {verdict}"));
        }
        lines
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }
}
