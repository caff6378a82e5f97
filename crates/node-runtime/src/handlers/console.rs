//! # Line Console
//!
//! Local operator transport: one JSON array per line, answered with one JSON
//! response per line.
//!
//! ```text
//! ["account", "create-account", "abc"]
//! ["account", "submit-form", "pothole", "1 Main St", "hole", "large", "<pubkey>", "abc"]
//! ["admin", "resolve-form", "<formId>", "<pubkey>", "<privkey>"]
//! ```
//!
//! The first element selects the endpoint, the second the command; the rest
//! are the command's positional arguments.

use cr_02_form_pipeline::{CommandHandler, CommandResponse};
use shared_types::ResultCode;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::container::{AccountPipeline, AdminPipeline};

/// Routes console lines to the account or admin endpoint.
#[derive(Clone)]
pub struct Console {
    account: CommandHandler<AccountPipeline>,
    admin: CommandHandler<AdminPipeline>,
}

impl Console {
    pub fn new(
        account: CommandHandler<AccountPipeline>,
        admin: CommandHandler<AdminPipeline>,
    ) -> Self {
        Self { account, admin }
    }

    /// Serve lines until end of input or shutdown. Returns the number of
    /// lines answered.
    pub async fn serve<R, W>(
        &self,
        reader: R,
        mut writer: W,
        mut shutdown: watch::Receiver<bool>,
    ) -> std::io::Result<u64>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        let mut answered = 0;
        info!("Console accepting commands");

        loop {
            let line = tokio::select! {
                line = lines.next_line() => line?,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            };
            let Some(line) = line else {
                debug!("Console input closed");
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let response = self.handle_line(&line).await;
            writer.write_all(render(&response).as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
            answered += 1;
        }

        info!(answered, "Console stopped");
        Ok(answered)
    }

    /// Answer one console line.
    pub async fn handle_line(&self, line: &str) -> CommandResponse {
        let words: Vec<String> = match serde_json::from_str(line) {
            Ok(words) => words,
            Err(e) => {
                warn!(error = %e, "Console line is not a JSON string array");
                return error(ResultCode::MalformedPayload, format!("Malformed line: {e}"));
            }
        };
        let [endpoint, command, args @ ..] = words.as_slice() else {
            return error(
                ResultCode::MalformedPayload,
                "Expected [endpoint, command, args...]".to_string(),
            );
        };

        match endpoint.as_str() {
            "account" => self.account.handle_args(command, args).await,
            "admin" => self.admin.handle_args(command, args).await,
            other => error(ResultCode::UnknownRequest, format!("Unknown endpoint: {other}")),
        }
    }
}

fn error(code: ResultCode, message: String) -> CommandResponse {
    CommandResponse::Error { code, message }
}

fn render(response: &CommandResponse) -> String {
    response.to_json().unwrap_or_else(|e| {
        warn!(error = %e, "Response could not be encoded");
        format!(r#"{{"status":"error","code":"EncodingError","message":"{e}"}}"#)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::SubsystemContainer;
    use tokio::io::BufReader;

    fn console() -> Console {
        let container = SubsystemContainer::new_for_testing();
        Console::new(container.account.clone(), container.admin.clone())
    }

    #[tokio::test]
    async fn test_routes_by_endpoint() {
        let console = console();
        let response = console
            .handle_line(r#"["account", "create-account", "abc"]"#)
            .await;
        assert!(matches!(response, CommandResponse::Keys { .. }));

        let response = console
            .handle_line(r#"["admin", "resolve-form", "F1", "ab", "x"]"#)
            .await;
        assert_eq!(response.code(), ResultCode::IdentityNotFound);

        let response = console.handle_line(r#"["mayor", "create-account", "abc"]"#).await;
        assert_eq!(response.code(), ResultCode::UnknownRequest);
    }

    #[tokio::test]
    async fn test_malformed_lines() {
        let console = console();
        for line in ["not json", r#"{"command":"x"}"#, r#"["account"]"#] {
            let response = console.handle_line(line).await;
            assert_eq!(response.code(), ResultCode::MalformedPayload, "{line}");
        }
    }

    #[tokio::test]
    async fn test_serve_answers_each_line() {
        let console = console();
        let input = "[\"account\", \"create-account\", \"abc\"]\n\n[\"account\", \"find-form\"]\n";
        let mut output = Vec::new();
        let (_tx, rx) = watch::channel(false);

        let answered = console
            .serve(BufReader::new(input.as_bytes()), &mut output, rx)
            .await
            .unwrap();

        assert_eq!(answered, 2);
        let output = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(r#""status":"keys""#));
        assert!(lines[1].contains(r#""code":"MalformedPayload""#));
    }
}
