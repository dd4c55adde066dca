mod message;
pub use message::*;

use crate::application_port::*;
use crate::domain_model::SessionId;
use crate::settings::Command;
use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

const RESEND: &str = "resend";

/// Runs one console command. Returns whether it succeeded.
pub async fn run<R, W>(command: Command, auth: &dyn AuthService, input: R, mut output: W) -> Result<bool>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match command {
        Command::Login { email, ip } => login(auth, email, ip, input, &mut output).await,
        Command::Domains => {
            let options = auth.login_options();
            write_line(
                &mut output,
                &format!("Allowed email domains: {}", options.email_domain_glob),
            )
            .await?;
            if let Some(message) = options.login_message {
                write_line(&mut output, &message).await?;
            }
            Ok(true)
        }
        Command::Session { id } => match auth.session(&SessionId(id)).await {
            Ok(Some(session)) => {
                write_line(&mut output, &serde_json::to_string_pretty(&session)?).await?;
                Ok(true)
            }
            Ok(None) => {
                write_line(&mut output, "Session not found or expired.").await?;
                Ok(false)
            }
            Err(e) => {
                write_line(&mut output, &user_message(&e)).await?;
                Ok(false)
            }
        },
    }
}

async fn login<R, W>(
    auth: &dyn AuthService,
    email: String,
    ip: Option<String>,
    input: R,
    output: &mut W,
) -> Result<bool>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let request = GenerateOtpInput {
        email: email.clone(),
        requester_ip: ip.clone(),
    };
    if !request_code(auth, request, output).await? {
        return Ok(false);
    }

    let mut lines = input.lines();
    loop {
        write_text(output, "Enter OTP (or 'resend'): ").await?;
        let Some(line) = lines.next_line().await? else {
            write_line(output, "").await?;
            write_line(output, "No OTP entered.").await?;
            return Ok(false);
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case(RESEND) {
            let request = GenerateOtpInput {
                email: email.clone(),
                requester_ip: ip.clone(),
            };
            if !request_code(auth, request, output).await? {
                return Ok(false);
            }
            continue;
        }

        let request = VerifyOtpInput {
            email: email.clone(),
            otp: line.to_string(),
        };
        match auth.verify_otp(request).await {
            Ok(session) => {
                write_line(
                    output,
                    &format!(
                        "Logged in as {}. Session {} expires at {}.",
                        session.user.email,
                        session.id,
                        session.expires_at.to_rfc3339()
                    ),
                )
                .await?;
                return Ok(true);
            }
            Err(e) => {
                write_line(output, &user_message(&e)).await?;
                if ends_login(&e) {
                    return Ok(false);
                }
            }
        }
    }
}

/// Returns false when the error ends the login.
async fn request_code<W>(auth: &dyn AuthService, request: GenerateOtpInput, output: &mut W) -> Result<bool>
where
    W: AsyncWrite + Unpin,
{
    match auth.generate_otp(request).await {
        Ok(_) => {
            write_line(output, OTP_SENT).await?;
            Ok(true)
        }
        Err(e) => {
            write_line(output, &user_message(&e)).await?;
            Ok(!ends_login(&e))
        }
    }
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}

async fn write_text<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.flush().await?;
    Ok(())
}
