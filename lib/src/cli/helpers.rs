// Copyright (c) 2022-2023 The MobileCoin Foundation

use async_trait::async_trait;
use log::debug;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use zeroize::Zeroizing;

use satochip_nostr::{PinPrompt, PinRequest};

/// [PinPrompt] using a PIN provided via arguments, falling back to reading
/// lines from `input` (stdin by default)
pub struct CliPrompt<R = BufReader<Stdin>> {
    pin: Option<Zeroizing<String>>,
    interactive: bool,
    /// Shared across prompts so buffered input is not lost between entries
    input: Lines<R>,
}

impl CliPrompt {
    pub fn new(pin: Option<String>, interactive: bool) -> Self {
        Self::with_input(pin, interactive, BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin + Send> CliPrompt<R> {
    pub fn with_input(pin: Option<String>, interactive: bool, input: R) -> Self {
        Self {
            pin: pin.map(Zeroizing::new),
            interactive,
            input: input.lines(),
        }
    }

    async fn read_line(&mut self, req: PinRequest) -> Option<Zeroizing<String>> {
        let msg = match req {
            PinRequest::Initial => "Enter PIN: ".to_string(),
            PinRequest::InvalidFormat(e) => format!("{e}, enter PIN: "),
            PinRequest::WrongPin => "Wrong PIN, enter PIN: ".to_string(),
        };

        let mut stderr = tokio::io::stderr();
        stderr.write_all(msg.as_bytes()).await.ok()?;
        stderr.flush().await.ok()?;

        // EOF or empty input declines the prompt
        let line = Zeroizing::new(self.input.next_line().await.ok()??);
        let pin = line.trim_end_matches(|c: char| c == '\r');
        if pin.is_empty() {
            return None;
        }

        Some(Zeroizing::new(pin.to_string()))
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> PinPrompt for CliPrompt<R> {
    async fn request_pin(&mut self, req: PinRequest) -> Option<Zeroizing<String>> {
        debug!("PIN requested ({req})");

        // Use the provided PIN once
        if let Some(p) = self.pin.take() {
            return Some(p);
        }

        match self.interactive {
            true => self.read_line(req).await,
            false => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn reentry_reads_following_lines() {
        let mut p = CliPrompt::with_input(None, true, &b"0000\r\n1234\n"[..]);

        let a = p.request_pin(PinRequest::Initial).await;
        assert_eq!(a.as_deref().map(String::as_str), Some("0000"));

        let b = p.request_pin(PinRequest::WrongPin).await;
        assert_eq!(b.as_deref().map(String::as_str), Some("1234"));

        assert!(p.request_pin(PinRequest::WrongPin).await.is_none());
    }

    #[tokio::test]
    async fn provided_pin_used_once() {
        let mut p = CliPrompt::with_input(Some("1234".to_string()), true, &b"5678\n\n9999\n"[..]);

        let a = p.request_pin(PinRequest::Initial).await;
        assert_eq!(a.as_deref().map(String::as_str), Some("1234"));

        let b = p.request_pin(PinRequest::WrongPin).await;
        assert_eq!(b.as_deref().map(String::as_str), Some("5678"));

        // Empty line declines
        assert!(p.request_pin(PinRequest::WrongPin).await.is_none());
    }

    #[tokio::test]
    async fn non_interactive_declines() {
        let mut p = CliPrompt::with_input(None, false, &b"1234\n"[..]);

        assert!(p.request_pin(PinRequest::Initial).await.is_none());
    }
}
