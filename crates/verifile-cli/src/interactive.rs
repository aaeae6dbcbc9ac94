//! Line-oriented front-end for the upload wizard.

use crate::{format_file_size, load_file_draft};
use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::Path;
use verifile_client::{VerificationBackend, Wizard};
use verifile_core::models::WizardStep;
use verifile_core::validation::format_size_limit;

/// Run the wizard until the user quits or input ends.
pub async fn run_wizard<B, R, W>(wizard: &mut Wizard<B>, input: &mut R, out: &mut W) -> Result<()>
where
    B: VerificationBackend,
    R: BufRead,
    W: Write,
{
    loop {
        let keep_going = match wizard.step() {
            WizardStep::Intake => intake(wizard, input, out).await?,
            WizardStep::Verify => verify(wizard, input, out).await?,
            WizardStep::Success => success(wizard, input, out)?,
        };
        if !keep_going {
            return Ok(());
        }
    }
}

async fn intake<B, R, W>(wizard: &mut Wizard<B>, input: &mut R, out: &mut W) -> Result<bool>
where
    B: VerificationBackend,
    R: BufRead,
    W: Write,
{
    writeln!(out, "\nStep 1: Email and file")?;

    let Some(email) = prompt(input, out, "Email address: ")? else {
        return Ok(false);
    };
    wizard.set_email(email);

    let label = format!(
        "File to upload (max {}): ",
        format_size_limit(wizard.max_file_size_bytes())
    );
    let Some(path) = prompt(input, out, &label)? else {
        return Ok(false);
    };
    match load_file_draft(Path::new(&path), wizard.max_file_size_bytes()) {
        Ok(file) => {
            let summary = format!("Selected: {} ({})", file.name, format_file_size(file.size));
            if wizard.select_file(file).is_ok() {
                writeln!(out, "{}", summary)?;
            }
        }
        Err(err) => {
            writeln!(out, "Error: {:#}", err)?;
            wizard.clear_file();
            return Ok(true);
        }
    }

    if wizard.error().is_none() {
        writeln!(out, "Sending OTP...")?;
        wizard.submit_intake().await;
    }
    report(wizard, out)?;
    Ok(true)
}

async fn verify<B, R, W>(wizard: &mut Wizard<B>, input: &mut R, out: &mut W) -> Result<bool>
where
    B: VerificationBackend,
    R: BufRead,
    W: Write,
{
    writeln!(out, "\nStep 2: Verify your email")?;
    writeln!(
        out,
        "We've sent a 6-digit verification code to: {}",
        wizard.draft().email
    )?;
    writeln!(
        out,
        "The code will expire in {} minutes",
        wizard.expiry_minutes()
    )?;

    let Some(line) = prompt(input, out, "Enter OTP ([r]esend, [c]ancel): ")? else {
        return Ok(false);
    };

    match line.as_str() {
        "r" | "resend" => {
            wizard.resend_otp().await;
        }
        "c" | "cancel" => {
            wizard.cancel();
            writeln!(out, "Cancelled")?;
            return Ok(true);
        }
        code => {
            wizard.enter_otp(code);
            if wizard.can_submit_otp() {
                writeln!(out, "Verifying...")?;
                wizard.submit_otp().await;
            } else {
                writeln!(out, "Error: Please enter a valid 6-digit OTP")?;
            }
        }
    }

    report(wizard, out)?;
    Ok(true)
}

fn success<B, R, W>(wizard: &mut Wizard<B>, input: &mut R, out: &mut W) -> Result<bool>
where
    B: VerificationBackend,
    R: BufRead,
    W: Write,
{
    writeln!(out, "\nStep 3: Done")?;
    if let Some(result) = wizard.upload_result() {
        writeln!(
            out,
            "Uploaded {} ({})",
            result.file_name,
            format_file_size(result.file_size_bytes)
        )?;
    }

    let answer = prompt(input, out, "Upload another file? [y/N]: ")?;
    if matches!(answer.as_deref(), Some("y") | Some("yes")) {
        wizard.reset();
        Ok(true)
    } else {
        Ok(false)
    }
}

fn report<B: VerificationBackend, W: Write>(wizard: &Wizard<B>, out: &mut W) -> Result<()> {
    if let Some(message) = wizard.message() {
        writeln!(out, "{}", message)?;
    }
    if let Some(error) = wizard.error() {
        writeln!(out, "Error: {}", error)?;
    }
    Ok(())
}

/// Print `label` and read one trimmed line. `None` at end of input.
fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, label: &str) -> Result<Option<String>> {
    write!(out, "{}", label)?;
    out.flush().context("Failed to flush output")?;

    let mut line = String::new();
    let read = input.read_line(&mut line).context("Failed to read input")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;
    use verifile_client::SimulatedBackend;

    #[tokio::test]
    async fn scripted_session_reaches_success() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, vec![1u8; 2048]).unwrap();

        let script = format!("a@b.com\n{}\n12x3456\nn\n", path.display());
        let mut input = Cursor::new(script.into_bytes());
        let mut out = Vec::new();
        let mut wizard = Wizard::new(SimulatedBackend::with_delay(Duration::ZERO));

        run_wizard(&mut wizard, &mut input, &mut out).await.unwrap();

        let transcript = String::from_utf8(out).unwrap();
        assert!(transcript.contains("Selected: photo.png (2.00 KB)"));
        assert!(transcript.contains("File \"photo.png\" uploaded successfully!"));
        assert_eq!(wizard.step(), WizardStep::Success);
    }

    #[tokio::test]
    async fn bad_email_loops_back_to_intake() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"x").unwrap();

        let script = format!("nope\n{}\n", path.display());
        let mut input = Cursor::new(script.into_bytes());
        let mut out = Vec::new();
        let mut wizard = Wizard::new(SimulatedBackend::with_delay(Duration::ZERO));

        run_wizard(&mut wizard, &mut input, &mut out).await.unwrap();

        let transcript = String::from_utf8(out).unwrap();
        assert!(transcript.contains("Error: Please enter a valid email address"));
        assert_eq!(wizard.step(), WizardStep::Intake);
    }

    #[tokio::test]
    async fn cancel_from_verify() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"x").unwrap();

        let script = format!("a@b.com\n{}\nc\n", path.display());
        let mut input = Cursor::new(script.into_bytes());
        let mut out = Vec::new();
        let mut wizard = Wizard::new(SimulatedBackend::with_delay(Duration::ZERO));

        run_wizard(&mut wizard, &mut input, &mut out).await.unwrap();

        assert_eq!(wizard.step(), WizardStep::Intake);
        assert!(wizard.draft().is_empty());
    }
}
